//! Untagged IO value slots and their flag bytes.
//!
//! A value is 32 raw bits. What they mean (bool, int, uint, float, time)
//! is recorded separately in the slot's [`IoFlags`], together with the
//! wiring state of inputs: whether the slot reads from another block's
//! output, whether that read is inverted, and which numeric conversion
//! the read needs.

use core::fmt;

/// One 32-bit IO slot. Reinterpretation between views is bit-preserving.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IoValue(u32);

impl IoValue {
    pub const ZERO: Self = Self(0);

    pub const fn from_u32(v: u32) -> Self {
        Self(v)
    }

    pub const fn from_i32(v: i32) -> Self {
        Self(v as u32)
    }

    pub fn from_f32(v: f32) -> Self {
        Self(v.to_bits())
    }

    pub const fn from_bool(v: bool) -> Self {
        Self(v as u32)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn as_i32(self) -> i32 {
        self.0 as i32
    }

    pub fn as_f32(self) -> f32 {
        f32::from_bits(self.0)
    }

    pub const fn as_bool(self) -> bool {
        self.0 != 0
    }

    pub const fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    pub const fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }
}

impl fmt::Debug for IoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IoValue({:#010x})", self.0)
    }
}

/// Declared semantic type of an IO slot (flag bits 0-2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IoType {
    Bool = 0,
    Int = 1,
    Uint = 2,
    Float = 3,
    /// Milliseconds, stored as u32.
    Time = 4,
}

impl IoType {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Bool),
            1 => Some(Self::Int),
            2 => Some(Self::Uint),
            3 => Some(Self::Float),
            4 => Some(Self::Time),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "BOOL",
            Self::Int => "INT",
            Self::Uint => "UINT",
            Self::Float => "FLOAT",
            Self::Time => "TIME",
        }
    }

    /// Types whose bits are read as an unsigned integer.
    fn is_unsigned_view(self) -> bool {
        matches!(self, Self::Bool | Self::Uint | Self::Time)
    }
}

/// Conversion applied when reading a wired input (flag bits 6-7).
///
/// The kind names the representation of the *source* value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    None,
    Unsigned,
    Signed,
    Float,
}

impl Conversion {
    const fn bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Unsigned => IoFlags::CONV_B0,
            Self::Signed => IoFlags::CONV_B1,
            Self::Float => IoFlags::CONV_B0 | IoFlags::CONV_B1,
        }
    }

    const fn from_bits(bits: u8) -> Self {
        match bits & IoFlags::CONV_MASK {
            IoFlags::CONV_B0 => Self::Unsigned,
            IoFlags::CONV_B1 => Self::Signed,
            IoFlags::CONV_MASK => Self::Float,
            _ => Self::None,
        }
    }
}

/// Per-slot flag byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IoFlags(u8);

impl IoFlags {
    pub const TYPE_MASK: u8 = 0x07;
    pub const REF: u8 = 1 << 4;
    pub const REF_INVERT: u8 = 1 << 5;
    const CONV_B0: u8 = 1 << 6;
    const CONV_B1: u8 = 1 << 7;
    pub const CONV_MASK: u8 = Self::CONV_B0 | Self::CONV_B1;

    pub const fn new(io_type: IoType) -> Self {
        Self(io_type as u8)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn io_type(self) -> IoType {
        // only ever written through IoType
        IoType::from_bits(self.0 & Self::TYPE_MASK).unwrap_or(IoType::Uint)
    }

    pub fn set_io_type(&mut self, io_type: IoType) {
        self.0 = (self.0 & !Self::TYPE_MASK) | io_type as u8;
    }

    pub const fn is_ref(self) -> bool {
        self.0 & Self::REF != 0
    }

    pub const fn is_inverted(self) -> bool {
        self.0 & Self::REF_INVERT != 0
    }

    pub const fn conversion(self) -> Conversion {
        Conversion::from_bits(self.0)
    }

    pub fn set_conversion(&mut self, conversion: Conversion) {
        self.0 = (self.0 & !Self::CONV_MASK) | conversion.bits();
    }

    /// Mark as wired. Inversion is only kept for bool inputs.
    pub fn set_ref(&mut self, conversion: Conversion, inverted: bool) {
        self.0 |= Self::REF;
        self.set_conversion(conversion);
        if inverted && self.io_type() == IoType::Bool {
            self.0 |= Self::REF_INVERT;
        } else {
            self.0 &= !Self::REF_INVERT;
        }
    }

    pub fn clear_ref(&mut self) {
        self.0 &= !(Self::REF | Self::REF_INVERT | Self::CONV_MASK);
    }
}

impl fmt::Debug for IoFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoFlags")
            .field("type", &self.io_type())
            .field("ref", &self.is_ref())
            .field("inverted", &self.is_inverted())
            .field("conversion", &self.conversion())
            .finish()
    }
}

/// Conversion an input of type `input` needs to read a `source` output.
pub fn conversion_for(input: IoType, source: IoType) -> Conversion {
    match input {
        IoType::Bool | IoType::Uint | IoType::Time => match source {
            IoType::Float => Conversion::Float,
            IoType::Int => Conversion::Signed,
            _ => Conversion::None,
        },
        IoType::Int => match source {
            IoType::Float => Conversion::Float,
            IoType::Int => Conversion::None,
            _ => Conversion::Unsigned,
        },
        IoType::Float => match source {
            IoType::Int => Conversion::Signed,
            IoType::Float => Conversion::None,
            _ => Conversion::Unsigned,
        },
    }
}

/// Convert a source value into the view of an `input`-typed slot.
pub fn convert(value: IoValue, input: IoType, conversion: Conversion) -> IoValue {
    match (conversion, input) {
        (Conversion::None, _) => value,
        (Conversion::Float, t) if t.is_unsigned_view() => IoValue::from_u32(value.as_f32() as u32),
        (Conversion::Signed, t) if t.is_unsigned_view() => IoValue::from_u32(value.as_i32() as u32),
        (Conversion::Unsigned, IoType::Float) => IoValue::from_f32(value.as_u32() as f32),
        (Conversion::Signed, IoType::Float) => IoValue::from_f32(value.as_i32() as f32),
        (Conversion::Float, IoType::Int) => IoValue::from_i32(value.as_f32() as i32),
        (Conversion::Unsigned, IoType::Int) => IoValue::from_i32(value.as_u32() as i32),
        _ => value,
    }
}

/// Full read path of a wired input: conversion, then optional inversion.
pub fn resolve(value: IoValue, flags: IoFlags) -> IoValue {
    let converted = convert(value, flags.io_type(), flags.conversion());
    if flags.is_inverted() {
        IoValue::from_bool(!converted.as_bool())
    } else {
        converted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wired(input: IoType, source: IoType, inverted: bool) -> IoFlags {
        let mut flags = IoFlags::new(input);
        flags.set_ref(conversion_for(input, source), inverted);
        flags
    }

    #[test]
    fn float_into_int_truncates() {
        let flags = wired(IoType::Int, IoType::Float, false);
        assert_eq!(flags.conversion(), Conversion::Float);
        assert_eq!(resolve(IoValue::from_f32(3.75), flags).as_i32(), 3);
        assert_eq!(resolve(IoValue::from_f32(-3.75), flags).as_i32(), -3);
    }

    #[test]
    fn uint_into_float_widens() {
        let flags = wired(IoType::Float, IoType::Uint, false);
        assert_eq!(flags.conversion(), Conversion::Unsigned);
        let v = resolve(IoValue::from_u32(0xFFFF_FFFF), flags).as_f32();
        assert_eq!(v, 4294967295.0);
    }

    #[test]
    fn int_into_float_keeps_sign() {
        let flags = wired(IoType::Float, IoType::Int, false);
        assert_eq!(resolve(IoValue::from_i32(-7), flags).as_f32(), -7.0);
    }

    #[test]
    fn float_into_uint_saturates() {
        let flags = wired(IoType::Uint, IoType::Float, false);
        assert_eq!(resolve(IoValue::from_f32(-1.5), flags).as_u32(), 0);
        assert_eq!(resolve(IoValue::from_f32(f32::NAN), flags).as_u32(), 0);
        assert_eq!(resolve(IoValue::from_f32(12.9), flags).as_u32(), 12);
    }

    #[test]
    fn matching_types_need_no_conversion() {
        for t in [IoType::Int, IoType::Float] {
            assert_eq!(conversion_for(t, t), Conversion::None);
        }
        assert_eq!(conversion_for(IoType::Uint, IoType::Bool), Conversion::None);
        assert_eq!(conversion_for(IoType::Time, IoType::Uint), Conversion::None);
        assert_eq!(conversion_for(IoType::Int, IoType::Time), Conversion::Unsigned);
        assert_eq!(conversion_for(IoType::Float, IoType::Bool), Conversion::Unsigned);
    }

    #[test]
    fn inversion_applies_after_conversion() {
        let flags = wired(IoType::Bool, IoType::Bool, true);
        assert!(flags.is_inverted());
        assert!(!resolve(IoValue::from_bool(true), flags).as_bool());
        assert!(resolve(IoValue::from_bool(false), flags).as_bool());

        let from_float = wired(IoType::Bool, IoType::Float, true);
        // 0.4 truncates to 0, then inverts
        assert!(resolve(IoValue::from_f32(0.4), from_float).as_bool());
        assert!(!resolve(IoValue::from_f32(2.0), from_float).as_bool());
    }

    #[test]
    fn inversion_ignored_for_non_bool_inputs() {
        let flags = wired(IoType::Uint, IoType::Uint, true);
        assert!(!flags.is_inverted());
        assert_eq!(resolve(IoValue::from_u32(5), flags).as_u32(), 5);
    }

    #[test]
    fn flag_bits_layout() {
        let mut flags = IoFlags::new(IoType::Time);
        assert_eq!(flags.bits(), 4);
        flags.set_ref(Conversion::Float, false);
        assert_eq!(flags.bits(), 0x04 | 0x10 | 0xC0);
        flags.clear_ref();
        assert_eq!(flags.bits(), 4);
        flags.set_io_type(IoType::Float);
        assert_eq!(flags.io_type(), IoType::Float);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn wired(input: IoType, source: IoType, inverted: bool) -> IoFlags {
        let mut flags = IoFlags::new(input);
        flags.set_ref(conversion_for(input, source), inverted);
        flags
    }

    fn any_type() -> impl Strategy<Value = IoType> {
        (0u8..5).prop_map(|b| IoType::from_bits(b).unwrap())
    }

    proptest! {
        #[test]
        fn same_type_reads_are_identity(t in any_type(), raw in any::<u32>()) {
            let mut flags = IoFlags::new(t);
            flags.set_ref(conversion_for(t, t), false);
            prop_assert_eq!(resolve(IoValue::from_u32(raw), flags), IoValue::from_u32(raw));
        }

        #[test]
        fn int_float_int_round_trip_small(v in -16_777_216i32..16_777_216) {
            let to_float = wired(IoType::Float, IoType::Int, false);
            let back = wired(IoType::Int, IoType::Float, false);
            let f = resolve(IoValue::from_i32(v), to_float);
            prop_assert_eq!(resolve(f, back).as_i32(), v);
        }

        #[test]
        fn inverted_bool_is_zero_or_one(source in any_type(), raw in any::<u32>()) {
            let mut flags = IoFlags::new(IoType::Bool);
            flags.set_ref(conversion_for(IoType::Bool, source), true);
            let out = resolve(IoValue::from_u32(raw), flags).as_u32();
            prop_assert!(out == 0 || out == 1);
        }
    }
}
