//! Info payloads: snapshots of an entity's counters and wiring.

use c32_core::{CircuitId, EntityId, FunctionId, TaskId, raw_or_zero};
use c32_runtime::Controller;

use crate::codec::Frame;

pub fn controller_info(controller: &Controller, frame: &mut Frame) {
    let probe = controller.probe();
    frame
        .put_u32(controller.handle().raw())
        .put_u32(probe.free_memory_bytes())
        .put_u32(probe.cpu_frequency_mhz())
        .put_i32(probe.signal_strength_dbm())
        .put_u32(controller.uptime_s())
        .put_u32(controller.tick_count());

    let tasks = controller.task_ids();
    frame.put_u32(tasks.len() as u32);
    for task in tasks {
        frame.put_u32(task.raw());
    }
    let circuits: Vec<CircuitId> = controller.graph().circuit_ids().collect();
    frame.put_u32(circuits.len() as u32);
    for circuit in circuits {
        frame.put_u32(circuit.raw());
    }
}

/// Returns false when the task does not exist.
pub fn task_info(controller: &Controller, id: TaskId, frame: &mut Frame) -> bool {
    let Some(task) = controller.task(id) else {
        return false;
    };
    let stats = task.stats();
    frame
        .put_u32(id.raw())
        .put_u32(task.interval_ms())
        .put_u32(task.offset_ms())
        .put_u32(stats.run_count)
        .put_u32(stats.last_cpu_us)
        .put_f32(stats.avg_cpu_us())
        .put_u32(stats.last_interval_ms)
        .put_f32(stats.avg_interval_ms())
        .put_u32(stats.drift_us)
        .put_u32(u32::from(task.is_running()))
        .put_u32(task.circuits().len() as u32);
    for circuit in task.circuits() {
        frame.put_u32(circuit.raw());
    }
    true
}

pub fn circuit_info(controller: &Controller, id: CircuitId, frame: &mut Frame) -> bool {
    let Some(circuit) = controller.graph().circuit(id) else {
        return false;
    };
    frame
        .put_u32(id.raw())
        .put_u32(u32::from(circuit.num_inputs()))
        .put_u32(u32::from(circuit.num_outputs()))
        .put_u32(circuit.functions().len() as u32);
    for function in circuit.functions() {
        frame.put_u32(function.raw());
    }
    for output in circuit.output_refs() {
        frame
            .put_u32(raw_or_zero(output.map(|r| r.function.handle())))
            .put_u32(output.map_or(0, |r| u32::from(r.output)));
    }
    for value in circuit.values() {
        frame.put_u32(value.as_u32());
    }
    true
}

pub fn function_info(controller: &Controller, id: FunctionId, frame: &mut Frame) -> bool {
    let graph = controller.graph();
    let Some(block) = graph.function(id) else {
        return false;
    };
    frame
        .put_u32(id.raw())
        .put_u8(block.num_inputs())
        .put_u8(block.num_outputs())
        .put_u16(block.opcode())
        .put_u32(block.flags())
        .put_u32(raw_or_zero(graph.owner(id).map(CircuitId::handle)));
    for value in block.values() {
        frame.put_u32(value.as_u32());
    }
    for flags in block.io_flags() {
        frame.put_u8(flags.bits());
    }
    for source in block.sources() {
        frame
            .put_u32(raw_or_zero(source.map(|r| r.function.handle())))
            .put_u32(source.map_or(0, |r| u32::from(r.output)));
    }
    let name = block.name().as_bytes();
    frame.put_u32(name.len() as u32).put_bytes(name);
    true
}
