//! Unsigned 32-bit integer math. Arithmetic wraps on overflow.

use c32_blocks::{BlockLogic, FunctionBlock, FunctionLibrary, IoInit, IoValue};

use crate::{LIB_ID_MATH_UINT, build, variadic};

pub const ADD: u8 = 0;
pub const SUB: u8 = 1;
pub const MUL: u8 = 2;
pub const DIV: u8 = 3;

pub const NAMES: &[&str] = &["ADD", "SUB", "MUL", "DIV"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UintMath(u8);

impl BlockLogic for UintMath {
    fn name(&self) -> &'static str {
        NAMES[self.0 as usize]
    }

    fn run(&mut self, inputs: &[IoValue], outputs: &mut [IoValue], _dt_ms: u32) {
        let values = inputs.iter().map(|v| v.as_u32());
        let a = inputs[0].as_u32();
        let result = match self.0 {
            ADD => values.fold(0u32, u32::wrapping_add),
            SUB => a.wrapping_sub(inputs[1].as_u32()),
            MUL => values.fold(1u32, u32::wrapping_mul),
            DIV => match a.checked_div(inputs[1].as_u32()) {
                Some(q) => q,
                None => return,
            },
            _ => return,
        };
        outputs[0] = IoValue::from_u32(result);
    }
}

pub struct Library;

impl FunctionLibrary for Library {
    fn id(&self) -> u8 {
        LIB_ID_MATH_UINT
    }

    fn name(&self) -> &'static str {
        "Math Uint"
    }

    fn function_names(&self) -> &'static [&'static str] {
        NAMES
    }

    fn create(&self, function: u8, inputs: u8, _outputs: u8) -> Option<FunctionBlock> {
        let u = IoInit::uint;
        let (ins, out) = match function {
            ADD => (vec![u(0); variadic(inputs)], 0),
            MUL => (vec![u(1); variadic(inputs)], 1),
            SUB => (vec![u(0), u(0)], 0),
            DIV => (vec![u(0), u(1)], 0),
            _ => return None,
        };
        build(LIB_ID_MATH_UINT, function, &ins, &[u(out)], UintMath(function))
    }
}
