//! Circuit: an ordered list of member functions plus output references.

use c32_blocks::{CIRCUIT_OPCODE, IoValue, Opcode, OutputRef};
use c32_core::FunctionId;

/// Insert before `index` when `0 <= index < len`, otherwise append.
pub fn insert_at<T>(list: &mut Vec<T>, item: T, index: i32) {
    match usize::try_from(index) {
        Ok(i) if i < list.len() => list.insert(i, item),
        _ => list.push(item),
    }
}

/// Composite block. Members run in list order, so a function must come
/// after every member it reads from. After the run each wired circuit
/// output copies the value of its referenced member output.
#[derive(Debug, Clone)]
pub struct Circuit {
    num_inputs: u8,
    num_outputs: u8,
    /// Inputs then outputs.
    values: Vec<IoValue>,
    output_refs: Vec<Option<OutputRef>>,
    functions: Vec<FunctionId>,
}

impl Circuit {
    pub fn new(num_inputs: u8, num_outputs: u8) -> Self {
        Self {
            num_inputs,
            num_outputs,
            values: vec![IoValue::ZERO; num_inputs as usize + num_outputs as usize],
            output_refs: vec![None; num_outputs as usize],
            functions: Vec::new(),
        }
    }

    pub fn opcode(&self) -> Opcode {
        CIRCUIT_OPCODE
    }

    pub fn num_inputs(&self) -> u8 {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> u8 {
        self.num_outputs
    }

    pub fn values(&self) -> &[IoValue] {
        &self.values
    }

    pub fn output_value(&self, output: usize) -> Option<IoValue> {
        self.values.get(self.num_inputs as usize + output).copied()
    }

    pub fn output_refs(&self) -> &[Option<OutputRef>] {
        &self.output_refs
    }

    pub fn functions(&self) -> &[FunctionId] {
        &self.functions
    }

    pub fn contains(&self, function: FunctionId) -> bool {
        self.functions.contains(&function)
    }

    pub(crate) fn insert_function(&mut self, function: FunctionId, index: i32) {
        insert_at(&mut self.functions, function, index);
    }

    pub(crate) fn remove_function(&mut self, function: FunctionId) -> bool {
        match self.functions.iter().position(|&f| f == function) {
            Some(pos) => {
                self.functions.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Replace the reference of `output`, returning the previous one.
    pub(crate) fn set_output_ref(
        &mut self,
        output: usize,
        source: Option<OutputRef>,
    ) -> Option<OutputRef> {
        core::mem::replace(&mut self.output_refs[output], source)
    }

    pub(crate) fn set_output_value(&mut self, output: usize, value: IoValue) {
        let index = self.num_inputs as usize + output;
        self.values[index] = value;
    }
}
