//! Boolean logic: gates, latches and edge detectors.

use c32_blocks::{BlockLogic, FunctionBlock, FunctionLibrary, IoInit, IoValue};

use crate::{LIB_ID_LOGIC, build, variadic};

pub const AND: u8 = 0;
pub const OR: u8 = 1;
pub const XOR: u8 = 2;
pub const NOT: u8 = 3;
pub const RS: u8 = 4;
pub const SR: u8 = 5;
pub const RISING_EDGE: u8 = 6;
pub const FALLING_EDGE: u8 = 7;

pub const NAMES: &[&str] = &[
    "AND",
    "OR",
    "XOR",
    "NOT",
    "RS",
    "SR",
    "Rising edge",
    "Falling edge",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
    /// True when exactly one input is true.
    Xor,
    Not,
    /// Inputs `[reset, set]`, reset dominant.
    Rs,
    /// Inputs `[set, reset]`, set dominant.
    Sr,
    RisingEdge { prev: bool },
    FallingEdge { prev: bool },
}

impl BlockLogic for Logic {
    fn name(&self) -> &'static str {
        let id = match self {
            Self::And => AND,
            Self::Or => OR,
            Self::Xor => XOR,
            Self::Not => NOT,
            Self::Rs => RS,
            Self::Sr => SR,
            Self::RisingEdge { .. } => RISING_EDGE,
            Self::FallingEdge { .. } => FALLING_EDGE,
        };
        NAMES[id as usize]
    }

    fn run(&mut self, inputs: &[IoValue], outputs: &mut [IoValue], _dt_ms: u32) {
        let out = &mut outputs[0];
        match self {
            Self::And => *out = IoValue::from_bool(inputs.iter().all(|v| v.as_bool())),
            Self::Or => *out = IoValue::from_bool(inputs.iter().any(|v| v.as_bool())),
            Self::Xor => {
                let count = inputs.iter().filter(|v| v.as_bool()).count();
                *out = IoValue::from_bool(count == 1);
            }
            Self::Not => *out = IoValue::from_bool(!inputs[0].as_bool()),
            Self::Rs => {
                if inputs[0].as_bool() {
                    *out = IoValue::from_bool(false);
                } else if inputs[1].as_bool() {
                    *out = IoValue::from_bool(true);
                }
            }
            Self::Sr => {
                if inputs[0].as_bool() {
                    *out = IoValue::from_bool(true);
                } else if inputs[1].as_bool() {
                    *out = IoValue::from_bool(false);
                }
            }
            Self::RisingEdge { prev } => {
                let input = inputs[0].as_bool();
                *out = IoValue::from_bool(input && !*prev);
                *prev = input;
            }
            Self::FallingEdge { prev } => {
                let input = inputs[0].as_bool();
                *out = IoValue::from_bool(!input && *prev);
                *prev = input;
            }
        }
    }
}

pub struct Library;

impl FunctionLibrary for Library {
    fn id(&self) -> u8 {
        LIB_ID_LOGIC
    }

    fn name(&self) -> &'static str {
        "Logic"
    }

    fn function_names(&self) -> &'static [&'static str] {
        NAMES
    }

    fn create(&self, function: u8, inputs: u8, _outputs: u8) -> Option<FunctionBlock> {
        let (ins, out, logic) = match function {
            AND => (vec![IoInit::bool(true); variadic(inputs)], true, Logic::And),
            OR => (vec![IoInit::bool(false); variadic(inputs)], false, Logic::Or),
            XOR => (vec![IoInit::bool(false); variadic(inputs)], false, Logic::Xor),
            NOT => (vec![IoInit::bool(false)], true, Logic::Not),
            RS => (vec![IoInit::bool(false); 2], false, Logic::Rs),
            SR => (vec![IoInit::bool(false); 2], false, Logic::Sr),
            RISING_EDGE => (
                vec![IoInit::bool(false)],
                false,
                Logic::RisingEdge { prev: false },
            ),
            FALLING_EDGE => (
                vec![IoInit::bool(true)],
                false,
                Logic::FallingEdge { prev: true },
            ),
            _ => return None,
        };
        build(LIB_ID_LOGIC, function, &ins, &[IoInit::bool(out)], logic)
    }
}
