//! Demo circuit: `100 * sin(n / 10)` driven by an integer accumulator.
//!
//! ```text
//! ADD(1, self) -> DIV(_, 10) -> SIN -> MUL(_, 100) -> circuit output 0
//! ```

use c32_blocks::{FunctionFactory, IoValue, OutputRef};
use c32_core::{CircuitId, FunctionId, TaskId};
use c32_library::{LIB_ID_MATH, LIB_ID_MATH_INT, math, math_int};
use c32_runtime::Controller;

use crate::error::{AppError, AppResult};

/// Ids of everything the demo created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SineCircuit {
    pub task: TaskId,
    pub circuit: CircuitId,
    pub counter: FunctionId,
    pub scale: FunctionId,
    pub sine: FunctionId,
    pub gain: FunctionId,
}

fn create(
    controller: &mut Controller,
    factory: &FunctionFactory,
    library: u8,
    function: u8,
    inputs: u8,
) -> AppResult<FunctionId> {
    let block = factory
        .create_instance(library, function, inputs, 1)
        .ok_or(AppError::UnknownFunction { library, function })?;
    Ok(controller.graph_mut().add_function(block)?)
}

/// Build the demo on a new task with the given interval and start it.
pub fn sine_circuit(
    controller: &mut Controller,
    factory: &FunctionFactory,
    interval_ms: u32,
) -> AppResult<SineCircuit> {
    let counter = create(controller, factory, LIB_ID_MATH_INT, math_int::ADD, 2)?;
    let scale = create(controller, factory, LIB_ID_MATH, math::DIV, 2)?;
    let sine = create(controller, factory, LIB_ID_MATH, math::SIN, 1)?;
    let gain = create(controller, factory, LIB_ID_MATH, math::MUL, 2)?;

    let graph = controller.graph_mut();
    let circuit = graph.create_circuit(0, 1)?;
    graph.set_io_value(counter, 0, IoValue::from_i32(1))?;
    graph.connect_input(counter, 1, OutputRef::new(counter, 0), false)?;
    graph.connect_input(scale, 0, OutputRef::new(counter, 0), false)?;
    graph.set_io_value(scale, 1, IoValue::from_f32(10.0))?;
    graph.connect_input(sine, 0, OutputRef::new(scale, 0), false)?;
    graph.connect_input(gain, 0, OutputRef::new(sine, 0), false)?;
    graph.set_io_value(gain, 1, IoValue::from_f32(100.0))?;
    for function in [counter, scale, sine, gain] {
        graph.circuit_add_function(circuit, function, -1)?;
    }
    graph.circuit_connect_output(circuit, 0, Some(OutputRef::new(gain, 0)))?;

    let task = controller.create_task(interval_ms, 0)?;
    controller.task_add_circuit(task, circuit, -1)?;
    controller.start_task(task)?;

    Ok(SineCircuit {
        task,
        circuit,
        counter,
        scale,
        sine,
        gain,
    })
}

impl SineCircuit {
    /// Current circuit output.
    pub fn output(&self, controller: &Controller) -> Option<f32> {
        let circuit = controller.graph().circuit(self.circuit)?;
        circuit.output_value(0).map(IoValue::as_f32)
    }
}
