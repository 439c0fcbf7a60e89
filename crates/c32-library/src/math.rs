//! Single-precision float math.

use c32_blocks::{BlockLogic, FunctionBlock, FunctionLibrary, IoInit, IoValue};

use crate::{LIB_ID_MATH, build, variadic};

pub const ADD: u8 = 0;
pub const SUB: u8 = 1;
pub const MUL: u8 = 2;
pub const DIV: u8 = 3;
pub const ABS: u8 = 4;
pub const SIN: u8 = 5;
pub const COS: u8 = 6;
pub const POW: u8 = 7;
pub const SQRT: u8 = 8;

pub const NAMES: &[&str] = &["ADD", "SUB", "MUL", "DIV", "ABS", "SIN", "COS", "POW", "SQRT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatMath(u8);

impl BlockLogic for FloatMath {
    fn name(&self) -> &'static str {
        NAMES[self.0 as usize]
    }

    fn run(&mut self, inputs: &[IoValue], outputs: &mut [IoValue], _dt_ms: u32) {
        let a = inputs[0].as_f32();
        let result: f32 = match self.0 {
            ADD => inputs.iter().map(|v| v.as_f32()).sum(),
            SUB => a - inputs[1].as_f32(),
            MUL => inputs.iter().map(|v| v.as_f32()).product(),
            DIV => {
                let b = inputs[1].as_f32();
                if b == 0.0 {
                    return;
                }
                a / b
            }
            ABS => a.abs(),
            SIN => a.sin(),
            COS => a.cos(),
            POW => a.powf(inputs[1].as_f32()),
            SQRT => a.sqrt(),
            _ => return,
        };
        outputs[0] = IoValue::from_f32(result);
    }
}

pub struct Library;

impl FunctionLibrary for Library {
    fn id(&self) -> u8 {
        LIB_ID_MATH
    }

    fn name(&self) -> &'static str {
        "Math"
    }

    fn function_names(&self) -> &'static [&'static str] {
        NAMES
    }

    fn create(&self, function: u8, inputs: u8, _outputs: u8) -> Option<FunctionBlock> {
        let f = IoInit::float;
        let (ins, out) = match function {
            ADD => (vec![f(0.0); variadic(inputs)], 0.0),
            MUL => (vec![f(1.0); variadic(inputs)], 1.0),
            SUB => (vec![f(0.0), f(0.0)], 0.0),
            DIV => (vec![f(0.0), f(1.0)], 0.0),
            POW => (vec![f(1.0), f(1.0)], 1.0),
            ABS | SIN | COS => (vec![f(0.0)], 0.0),
            SQRT => (vec![f(1.0)], 1.0),
            _ => return None,
        };
        build(LIB_ID_MATH, function, &ins, &[f(out)], FloatMath(function))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::run_with;

    fn fv(v: f32) -> IoValue {
        IoValue::from_f32(v)
    }

    #[test]
    fn div_by_zero_keeps_previous_output() {
        let mut div = Library.create(DIV, 0, 0).unwrap();
        assert_eq!(run_with(&mut div, &[fv(10.0), fv(4.0)], 0).as_f32(), 2.5);
        assert_eq!(run_with(&mut div, &[fv(10.0), fv(0.0)], 0).as_f32(), 2.5);
    }

    #[test]
    fn variadic_add_and_mul() {
        let mut add = Library.create(ADD, 4, 0).unwrap();
        assert_eq!(add.num_inputs(), 4);
        let sum = run_with(&mut add, &[fv(1.0), fv(2.0), fv(3.0), fv(4.5)], 0);
        assert_eq!(sum.as_f32(), 10.5);

        let mut mul = Library.create(MUL, 3, 0).unwrap();
        let product = run_with(&mut mul, &[fv(2.0), fv(-3.0), fv(0.5)], 0);
        assert_eq!(product.as_f32(), -3.0);
    }

    #[test]
    fn unary_functions() {
        let mut sin = Library.create(SIN, 0, 0).unwrap();
        assert_eq!(run_with(&mut sin, &[fv(0.5)], 0).as_f32(), 0.5f32.sin());

        let mut abs = Library.create(ABS, 0, 0).unwrap();
        assert_eq!(run_with(&mut abs, &[fv(-2.0)], 0).as_f32(), 2.0);

        let mut sqrt = Library.create(SQRT, 0, 0).unwrap();
        assert_eq!(run_with(&mut sqrt, &[fv(9.0)], 0).as_f32(), 3.0);

        let mut pow = Library.create(POW, 0, 0).unwrap();
        assert_eq!(run_with(&mut pow, &[fv(2.0), fv(10.0)], 0).as_f32(), 1024.0);
    }
}
