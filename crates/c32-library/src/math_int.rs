//! Signed 32-bit integer math. Arithmetic wraps on overflow.

use c32_blocks::{BlockLogic, FunctionBlock, FunctionLibrary, IoInit, IoValue};

use crate::{LIB_ID_MATH_INT, build, variadic};

pub const ADD: u8 = 0;
pub const SUB: u8 = 1;
pub const MUL: u8 = 2;
pub const DIV: u8 = 3;
pub const ABS: u8 = 4;

pub const NAMES: &[&str] = &["ADD", "SUB", "MUL", "DIV", "ABS"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntMath(u8);

impl BlockLogic for IntMath {
    fn name(&self) -> &'static str {
        NAMES[self.0 as usize]
    }

    fn run(&mut self, inputs: &[IoValue], outputs: &mut [IoValue], _dt_ms: u32) {
        let values = inputs.iter().map(|v| v.as_i32());
        let a = inputs[0].as_i32();
        let result = match self.0 {
            ADD => values.fold(0i32, i32::wrapping_add),
            SUB => a.wrapping_sub(inputs[1].as_i32()),
            MUL => values.fold(1i32, i32::wrapping_mul),
            // zero divisor and MIN / -1 leave the output alone
            DIV => match a.checked_div(inputs[1].as_i32()) {
                Some(q) => q,
                None => return,
            },
            ABS => a.wrapping_abs(),
            _ => return,
        };
        outputs[0] = IoValue::from_i32(result);
    }
}

pub struct Library;

impl FunctionLibrary for Library {
    fn id(&self) -> u8 {
        LIB_ID_MATH_INT
    }

    fn name(&self) -> &'static str {
        "Math Int"
    }

    fn function_names(&self) -> &'static [&'static str] {
        NAMES
    }

    fn create(&self, function: u8, inputs: u8, _outputs: u8) -> Option<FunctionBlock> {
        let i = IoInit::int;
        let (ins, out) = match function {
            ADD => (vec![i(0); variadic(inputs)], 0),
            MUL => (vec![i(1); variadic(inputs)], 1),
            SUB => (vec![i(0), i(0)], 0),
            DIV => (vec![i(0), i(1)], 0),
            ABS => (vec![i(0)], 0),
            _ => return None,
        };
        build(LIB_ID_MATH_INT, function, &ins, &[i(out)], IntMath(function))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::run_with;

    fn iv(v: i32) -> IoValue {
        IoValue::from_i32(v)
    }

    #[test]
    fn div_keeps_output_on_undefined_quotient() {
        let mut div = Library.create(DIV, 0, 0).unwrap();
        assert_eq!(run_with(&mut div, &[iv(-9), iv(2)], 0).as_i32(), -4);
        assert_eq!(run_with(&mut div, &[iv(10), iv(0)], 0).as_i32(), -4);
        assert_eq!(run_with(&mut div, &[iv(i32::MIN), iv(-1)], 0).as_i32(), -4);
    }

    #[test]
    fn arithmetic_wraps() {
        let mut add = Library.create(ADD, 2, 0).unwrap();
        assert_eq!(run_with(&mut add, &[iv(i32::MAX), iv(1)], 0).as_i32(), i32::MIN);

        let mut abs = Library.create(ABS, 0, 0).unwrap();
        assert_eq!(run_with(&mut abs, &[iv(-5)], 0).as_i32(), 5);
        assert_eq!(run_with(&mut abs, &[iv(i32::MIN)], 0).as_i32(), i32::MIN);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::testing::run_with;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn sub_then_add_restores(a in any::<i32>(), b in any::<i32>()) {
            let mut sub = Library.create(SUB, 0, 0).unwrap();
            let mut add = Library.create(ADD, 2, 0).unwrap();
            let diff = run_with(&mut sub, &[IoValue::from_i32(a), IoValue::from_i32(b)], 0);
            let back = run_with(&mut add, &[diff, IoValue::from_i32(b)], 0);
            prop_assert_eq!(back.as_i32(), a);
        }
    }
}
