//! c32-library: the standard function catalog.
//!
//! Library ids follow the controller firmware numbering:
//! - 1 logic
//! - 2 float math
//! - 3 signed integer math
//! - 4 unsigned integer math
//! - 5 timers

pub mod logic;
pub mod math;
pub mod math_int;
pub mod math_uint;
pub mod timers;

use c32_blocks::{BlockLogic, BlockResult, FunctionBlock, FunctionFactory, IoInit, opcode};

pub const LIB_ID_LOGIC: u8 = 1;
pub const LIB_ID_MATH: u8 = 2;
pub const LIB_ID_MATH_INT: u8 = 3;
pub const LIB_ID_MATH_UINT: u8 = 4;
pub const LIB_ID_TIMERS: u8 = 5;

/// Factory with every standard library registered.
pub fn standard_factory() -> BlockResult<FunctionFactory> {
    let mut factory = FunctionFactory::new();
    factory.register(Box::new(logic::Library))?;
    factory.register(Box::new(math::Library))?;
    factory.register(Box::new(math_int::Library))?;
    factory.register(Box::new(math_uint::Library))?;
    factory.register(Box::new(timers::Library))?;
    Ok(factory)
}

/// Variable-arity functions take at least two inputs.
pub(crate) fn variadic(requested: u8) -> usize {
    requested.max(2) as usize
}

pub(crate) fn build(
    library: u8,
    function: u8,
    inputs: &[IoInit],
    outputs: &[IoInit],
    logic: impl BlockLogic + 'static,
) -> Option<FunctionBlock> {
    FunctionBlock::new(opcode(library, function), inputs, outputs, Box::new(logic)).ok()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_factory_registers_all_libraries() {
        let factory = standard_factory().unwrap();
        let ids: Vec<u8> = factory.libraries().map(|lib| lib.id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn every_named_function_can_be_created() {
        let factory = standard_factory().unwrap();
        for lib in factory.libraries() {
            for (func, name) in lib.function_names().iter().enumerate() {
                let block = factory
                    .create_instance(lib.id(), func as u8, 0, 0)
                    .unwrap_or_else(|| panic!("{} {name} missing", lib.name()));
                assert_eq!(block.opcode(), opcode(lib.id(), func as u8));
                assert_eq!(block.name(), *name);
            }
            let past_end = lib.function_names().len() as u8;
            assert!(factory.create_instance(lib.id(), past_end, 0, 0).is_none());
        }
    }
}
