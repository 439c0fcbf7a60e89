use core::fmt;
use core::num::NonZeroU32;

const SLOT_BITS: u32 = 16;
const GENERATION_BITS: u32 = 12;
const KIND_SHIFT: u32 = SLOT_BITS + GENERATION_BITS;

const SLOT_MASK: u32 = (1 << SLOT_BITS) - 1;
const GENERATION_MASK: u32 = (1 << GENERATION_BITS) - 1;

/// Largest slot index a handle can address.
pub const MAX_SLOT: u32 = SLOT_MASK - 1;

/// Kind of entity a handle refers to. Stored in the top four bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntityKind {
    Controller = 1,
    Task = 2,
    Circuit = 3,
    Function = 4,
}

impl EntityKind {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            1 => Some(Self::Controller),
            2 => Some(Self::Task),
            3 => Some(Self::Circuit),
            4 => Some(Self::Function),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Controller => "controller",
            Self::Task => "task",
            Self::Circuit => "circuit",
            Self::Function => "function",
        }
    }
}

/// Opaque entity identity used both in memory and on the wire.
///
/// Layout of the raw value:
/// - bits 28..32: entity kind
/// - bits 16..28: slot generation
/// - bits 0..16: slot index + 1
///
/// The slot field is never zero, so a valid handle is never 0 and
/// `Option<Handle>` is the same size as `Handle`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(NonZeroU32);

impl Handle {
    /// Build a handle. `slot` must not exceed [`MAX_SLOT`]; the generation
    /// is truncated to 12 bits.
    pub fn new(kind: EntityKind, slot: u32, generation: u32) -> Self {
        debug_assert!(slot <= MAX_SLOT);
        let raw = ((kind as u32) << KIND_SHIFT)
            | ((generation & GENERATION_MASK) << SLOT_BITS)
            | ((slot & SLOT_MASK) + 1);
        // kind is nonzero, so raw is nonzero
        Self(NonZeroU32::new(raw).expect("entity kind bits are nonzero"))
    }

    /// Decode a raw wire value. Returns `None` for 0, unknown kinds or an
    /// empty slot field.
    pub fn from_raw(raw: u32) -> Option<Self> {
        EntityKind::from_bits(raw >> KIND_SHIFT)?;
        if raw & SLOT_MASK == 0 {
            return None;
        }
        NonZeroU32::new(raw).map(Self)
    }

    pub fn raw(self) -> u32 {
        self.0.get()
    }

    pub fn kind(self) -> EntityKind {
        EntityKind::from_bits(self.raw() >> KIND_SHIFT).expect("validated at construction")
    }

    pub fn slot(self) -> u32 {
        (self.raw() & SLOT_MASK) - 1
    }

    pub fn generation(self) -> u32 {
        (self.raw() >> SLOT_BITS) & GENERATION_MASK
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}v{}",
            self.kind().name(),
            self.slot(),
            self.generation()
        )
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.raw())
    }
}

/// Raw wire encoding of an optional handle (0 for none).
pub fn raw_or_zero(handle: Option<Handle>) -> u32 {
    handle.map_or(0, Handle::raw)
}

/// A handle statically known to refer to one entity kind.
pub trait EntityId: Copy + Eq + fmt::Debug {
    const KIND: EntityKind;

    /// Wrap a handle if its kind matches.
    fn from_handle(handle: Handle) -> Option<Self>;

    fn handle(self) -> Handle;

    fn from_raw(raw: u32) -> Option<Self> {
        Handle::from_raw(raw).and_then(Self::from_handle)
    }

    fn raw(self) -> u32 {
        self.handle().raw()
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Handle);

        impl EntityId for $name {
            const KIND: EntityKind = EntityKind::$kind;

            fn from_handle(handle: Handle) -> Option<Self> {
                (handle.kind() == Self::KIND).then_some(Self(handle))
            }

            fn handle(self) -> Handle {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(&self.0, f)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

entity_id!(
    /// Identity of a cyclic task registered with the controller.
    TaskId => Task
);
entity_id!(
    /// Identity of a circuit in the runtime graph.
    CircuitId => Circuit
);
entity_id!(
    /// Identity of a function block in the runtime graph.
    FunctionId => Function
);

/// Fixed handle of the (single) controller.
pub const CONTROLLER_HANDLE_RAW: u32 = ((EntityKind::Controller as u32) << KIND_SHIFT) | 1;

pub fn controller_handle() -> Handle {
    Handle::new(EntityKind::Controller, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_round_trip_fields() {
        for (slot, generation) in [(0_u32, 0_u32), (1, 7), (42, 4095), (MAX_SLOT, 1)] {
            let h = Handle::new(EntityKind::Function, slot, generation);
            assert_eq!(h.slot(), slot);
            assert_eq!(h.generation(), generation);
            assert_eq!(h.kind(), EntityKind::Function);
            assert_eq!(Handle::from_raw(h.raw()), Some(h));
        }
    }

    #[test]
    fn option_handle_is_small() {
        assert_eq!(
            core::mem::size_of::<Handle>(),
            core::mem::size_of::<Option<Handle>>()
        );
    }

    #[test]
    fn invalid_raw_values_rejected() {
        assert_eq!(Handle::from_raw(0), None);
        // unknown kind
        assert_eq!(Handle::from_raw(0xF000_0001), None);
        // empty slot field
        assert_eq!(Handle::from_raw(0x4000_0000), None);
        // kind 10 is unassigned
        assert_eq!(Handle::from_raw(0xA000_1234), None);
    }

    #[test]
    fn typed_ids_check_kind() {
        let h = Handle::new(EntityKind::Circuit, 3, 1);
        assert!(CircuitId::from_handle(h).is_some());
        assert!(TaskId::from_handle(h).is_none());
        assert!(FunctionId::from_raw(h.raw()).is_none());
    }

    #[test]
    fn controller_handle_constant_matches() {
        assert_eq!(controller_handle().raw(), CONTROLLER_HANDLE_RAW);
        assert_eq!(controller_handle().kind(), EntityKind::Controller);
    }
}
