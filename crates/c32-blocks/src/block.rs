//! Function block: fixed-arity IO storage around a pluggable `run`.
//!
//! Inputs and outputs share one value array (inputs first) with a parallel
//! flag array. A wired input keeps its source as an [`OutputRef`] beside
//! the value array; the runtime graph resolves it to a live value before
//! each update.

use core::fmt;

use c32_core::FunctionId;

use crate::error::{BlockError, BlockResult};
use crate::io::{IoFlags, IoType, IoValue, conversion_for, resolve};
use crate::monitor::MonitoringSink;

/// `library_id << 8 | function_id`.
pub type Opcode = u16;

/// Opcode reported by circuits.
pub const CIRCUIT_OPCODE: Opcode = 0;

/// Function flag: monitoring armed.
pub const FUNC_FLAG_MONITORING: u32 = 1 << 0;

pub const fn opcode(library: u8, function: u8) -> Opcode {
    ((library as u16) << 8) | function as u16
}

pub const fn opcode_parts(opcode: Opcode) -> (u8, u8) {
    ((opcode >> 8) as u8, opcode as u8)
}

/// Declared type and initial value of one IO slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoInit {
    pub io_type: IoType,
    pub value: IoValue,
}

impl IoInit {
    pub const fn new(io_type: IoType, value: IoValue) -> Self {
        Self { io_type, value }
    }

    pub const fn bool(v: bool) -> Self {
        Self::new(IoType::Bool, IoValue::from_bool(v))
    }

    pub const fn int(v: i32) -> Self {
        Self::new(IoType::Int, IoValue::from_i32(v))
    }

    pub const fn uint(v: u32) -> Self {
        Self::new(IoType::Uint, IoValue::from_u32(v))
    }

    pub fn float(v: f32) -> Self {
        Self::new(IoType::Float, IoValue::from_f32(v))
    }

    pub const fn time(ms: u32) -> Self {
        Self::new(IoType::Time, IoValue::from_u32(ms))
    }
}

/// A specific output slot of a specific function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputRef {
    pub function: FunctionId,
    pub output: u8,
}

impl OutputRef {
    pub const fn new(function: FunctionId, output: u8) -> Self {
        Self { function, output }
    }
}

/// Behaviour of one kind of function block.
///
/// `run` must be computation only: bounded in time, no blocking, no I/O.
/// `dt_ms` is the owning task's nominal interval.
pub trait BlockLogic: Send {
    fn name(&self) -> &'static str;

    fn run(&mut self, inputs: &[IoValue], outputs: &mut [IoValue], dt_ms: u32);
}

pub struct FunctionBlock {
    opcode: Opcode,
    num_inputs: u8,
    num_outputs: u8,
    values: Vec<IoValue>,
    io_flags: Vec<IoFlags>,
    sources: Vec<Option<OutputRef>>,
    // inversion asked for at connect; only applied while the input is BOOL
    invert: Vec<bool>,
    flags: u32,
    monitoring: Option<Vec<IoValue>>,
    monitor_once: bool,
    logic: Box<dyn BlockLogic>,
}

impl FunctionBlock {
    pub fn new(
        opcode: Opcode,
        inputs: &[IoInit],
        outputs: &[IoInit],
        logic: Box<dyn BlockLogic>,
    ) -> BlockResult<Self> {
        let num_inputs = u8::try_from(inputs.len()).map_err(|_| BlockError::InvalidArg {
            what: "more than 255 inputs",
        })?;
        let num_outputs = u8::try_from(outputs.len()).map_err(|_| BlockError::InvalidArg {
            what: "more than 255 outputs",
        })?;
        let slots = inputs.iter().chain(outputs);
        Ok(Self {
            opcode,
            num_inputs,
            num_outputs,
            values: slots.clone().map(|s| s.value).collect(),
            io_flags: slots.map(|s| IoFlags::new(s.io_type)).collect(),
            sources: vec![None; inputs.len()],
            invert: vec![false; inputs.len()],
            flags: 0,
            monitoring: None,
            monitor_once: false,
            logic,
        })
    }

    pub fn name(&self) -> &'static str {
        self.logic.name()
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn num_inputs(&self) -> u8 {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> u8 {
        self.num_outputs
    }

    pub fn io_count(&self) -> usize {
        self.values.len()
    }

    /// Inputs then outputs.
    pub fn values(&self) -> &[IoValue] {
        &self.values
    }

    pub fn io_flags(&self) -> &[IoFlags] {
        &self.io_flags
    }

    /// Per-input wiring, `None` for literal inputs.
    pub fn sources(&self) -> &[Option<OutputRef>] {
        &self.sources
    }

    pub fn input_source(&self, input: usize) -> Option<OutputRef> {
        self.sources.get(input).copied().flatten()
    }

    pub fn output_value(&self, output: usize) -> Option<IoValue> {
        self.values.get(self.num_inputs as usize + output).copied()
    }

    pub fn output_type(&self, output: usize) -> Option<IoType> {
        self.io_flags
            .get(self.num_inputs as usize + output)
            .map(|f| f.io_type())
    }

    pub fn input_type(&self, input: usize) -> Option<IoType> {
        self.io_flags[..self.num_inputs as usize]
            .get(input)
            .map(|f| f.io_type())
    }

    fn check_input(&self, input: usize) -> BlockResult<usize> {
        if input < self.num_inputs as usize {
            Ok(input)
        } else {
            Err(BlockError::IndexOob {
                what: "input",
                index: input,
                len: self.num_inputs as usize,
            })
        }
    }

    fn check_io(&self, index: usize) -> BlockResult<usize> {
        if index < self.values.len() {
            Ok(index)
        } else {
            Err(BlockError::IndexOob {
                what: "io",
                index,
                len: self.values.len(),
            })
        }
    }

    fn resolved_input(&self, input: usize, lookup: &impl Fn(OutputRef) -> Option<IoValue>) -> IoValue {
        let flags = self.io_flags[input];
        match self.sources[input] {
            Some(source) if flags.is_ref() => match lookup(source) {
                Some(raw) => resolve(raw, flags),
                // cached value from the last resolve
                None => self.values[input],
            },
            _ => self.values[input],
        }
    }

    /// Current value of one input, following its wiring through `lookup`.
    pub fn read_input(
        &self,
        input: usize,
        lookup: impl Fn(OutputRef) -> Option<IoValue>,
    ) -> BlockResult<IoValue> {
        let input = self.check_input(input)?;
        Ok(self.resolved_input(input, &lookup))
    }

    /// Resolve every input into `out` (cleared first).
    pub fn resolve_inputs(
        &self,
        lookup: impl Fn(OutputRef) -> Option<IoValue>,
        out: &mut Vec<IoValue>,
    ) {
        out.clear();
        out.extend((0..self.num_inputs as usize).map(|i| self.resolved_input(i, &lookup)));
    }

    /// Run the block on already resolved inputs and refresh the monitoring
    /// snapshot if armed.
    pub fn update(&mut self, inputs: &[IoValue], dt_ms: u32) {
        let n = self.num_inputs as usize;
        debug_assert_eq!(inputs.len(), n);
        self.values[..n].copy_from_slice(&inputs[..n]);
        let (ins, outs) = self.values.split_at_mut(n);
        self.logic.run(ins, outs, dt_ms);
        if let Some(snapshot) = self.monitoring.as_mut() {
            snapshot.copy_from_slice(&self.values);
        }
    }

    /// Wire `input` to read `source`, whose declared type is `source_type`.
    pub fn connect_input(
        &mut self,
        input: usize,
        source: OutputRef,
        source_type: IoType,
        inverted: bool,
    ) -> BlockResult<Option<OutputRef>> {
        let input = self.check_input(input)?;
        let flags = &mut self.io_flags[input];
        flags.set_ref(conversion_for(flags.io_type(), source_type), inverted);
        self.invert[input] = inverted;
        Ok(self.sources[input].replace(source))
    }

    /// Unwire `input`, keeping `frozen` as its literal value. Returns the
    /// previous source, if any.
    pub fn disconnect_input(
        &mut self,
        input: usize,
        frozen: IoValue,
    ) -> BlockResult<Option<OutputRef>> {
        let input = self.check_input(input)?;
        let previous = self.sources[input].take();
        self.invert[input] = false;
        if previous.is_some() {
            self.io_flags[input].clear_ref();
            self.values[input] = frozen;
        }
        Ok(previous)
    }

    /// Recompute the conversion of a wired input after a type change on
    /// either end of the edge.
    pub fn refresh_conversion(&mut self, input: usize, source_type: IoType) -> BlockResult<()> {
        let input = self.check_input(input)?;
        let flags = &mut self.io_flags[input];
        if flags.is_ref() {
            flags.set_ref(conversion_for(flags.io_type(), source_type), self.invert[input]);
        }
        Ok(())
    }

    /// Write a literal into any IO slot. Connected inputs refuse.
    pub fn set_io_value(&mut self, index: usize, value: IoValue) -> BlockResult<()> {
        let index = self.check_io(index)?;
        if index < self.num_inputs as usize && self.sources[index].is_some() {
            return Err(BlockError::InputConnected { index });
        }
        self.values[index] = value;
        Ok(())
    }

    /// Change the declared type of an IO slot. Callers owning the wiring
    /// must refresh the conversions of edges touching it.
    pub fn set_io_type(&mut self, index: usize, io_type: IoType) -> BlockResult<()> {
        let index = self.check_io(index)?;
        self.io_flags[index].set_io_type(io_type);
        Ok(())
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn set_flags(&mut self, flags: u32) {
        let was = self.flags & FUNC_FLAG_MONITORING != 0;
        let now = flags & FUNC_FLAG_MONITORING != 0;
        self.flags = flags;
        match (was, now) {
            (false, true) => self.enable_monitoring(false),
            (true, false) => self.disable_monitoring(),
            _ => {}
        }
    }

    pub fn set_flag(&mut self, flag: u32) {
        self.set_flags(self.flags | flag);
    }

    pub fn clear_flag(&mut self, flag: u32) {
        self.set_flags(self.flags & !flag);
    }

    pub fn enable_monitoring(&mut self, once: bool) {
        self.monitor_once = once;
        self.flags |= FUNC_FLAG_MONITORING;
        if self.monitoring.is_none() {
            self.monitoring = Some(vec![IoValue::ZERO; self.values.len()]);
        }
    }

    pub fn disable_monitoring(&mut self) {
        self.flags &= !FUNC_FLAG_MONITORING;
        self.monitoring = None;
        self.monitor_once = false;
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring.is_some()
    }

    pub fn monitoring_values(&self) -> Option<&[IoValue]> {
        self.monitoring.as_deref()
    }

    /// Hand the snapshot to `sink`. One-shot monitoring disarms afterwards.
    pub fn report_monitoring<S>(&mut self, id: FunctionId, sink: &mut S) -> bool
    where
        S: MonitoringSink + ?Sized,
    {
        let Some(snapshot) = self.monitoring.as_deref() else {
            return false;
        };
        sink.report(id, snapshot);
        if self.monitor_once {
            self.disable_monitoring();
        }
        true
    }

    /// IO value array as little-endian bytes.
    pub fn value_bytes(&self) -> Vec<u8> {
        self.values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    pub fn read_value_bytes(&self, offset: usize, size: usize) -> BlockResult<Vec<u8>> {
        let bytes = self.value_bytes();
        let end = byte_range_end(offset, size, bytes.len())?;
        Ok(bytes[offset..end].to_vec())
    }

    pub fn write_value_bytes(&mut self, offset: usize, data: &[u8]) -> BlockResult<()> {
        let mut bytes = self.value_bytes();
        let end = byte_range_end(offset, data.len(), bytes.len())?;
        bytes[offset..end].copy_from_slice(data);
        for (value, chunk) in self.values.iter_mut().zip(bytes.chunks_exact(4)) {
            *value = IoValue::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(())
    }
}

fn byte_range_end(offset: usize, size: usize, len: usize) -> BlockResult<usize> {
    offset
        .checked_add(size)
        .filter(|&end| end <= len)
        .ok_or(BlockError::ByteRange { offset, size, len })
}

impl fmt::Debug for FunctionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionBlock")
            .field("name", &self.name())
            .field("opcode", &format_args!("{:#06x}", self.opcode))
            .field("num_inputs", &self.num_inputs)
            .field("num_outputs", &self.num_outputs)
            .field("values", &self.values)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::RecordingSink;
    use c32_core::{EntityKind, EntityId, Handle};

    struct Sum;

    impl BlockLogic for Sum {
        fn name(&self) -> &'static str {
            "SUM"
        }

        fn run(&mut self, inputs: &[IoValue], outputs: &mut [IoValue], _dt_ms: u32) {
            let total: i32 = inputs.iter().map(|v| v.as_i32()).sum();
            outputs[0] = IoValue::from_i32(total);
        }
    }

    fn sum_block() -> FunctionBlock {
        FunctionBlock::new(
            opcode(3, 0),
            &[IoInit::int(2), IoInit::int(3)],
            &[IoInit::int(0)],
            Box::new(Sum),
        )
        .unwrap()
    }

    fn fid(slot: u32) -> FunctionId {
        FunctionId::from_handle(Handle::new(EntityKind::Function, slot, 0)).unwrap()
    }

    #[test]
    fn update_runs_on_literals() {
        let mut block = sum_block();
        let mut inputs = Vec::new();
        block.resolve_inputs(|_| None, &mut inputs);
        block.update(&inputs, 100);
        assert_eq!(block.output_value(0), Some(IoValue::from_i32(5)));
        assert_eq!(block.name(), "SUM");
        assert_eq!(opcode_parts(block.opcode()), (3, 0));
    }

    #[test]
    fn connect_then_disconnect_freezes_live_value() {
        let mut block = sum_block();
        let source = OutputRef::new(fid(7), 0);
        block
            .connect_input(0, source, IoType::Float, false)
            .unwrap();
        assert!(block.io_flags()[0].is_ref());

        let live = |r: OutputRef| (r == source).then(|| IoValue::from_f32(3.75));
        let frozen = block.read_input(0, live).unwrap();
        assert_eq!(frozen.as_i32(), 3);

        let previous = block.disconnect_input(0, frozen).unwrap();
        assert_eq!(previous, Some(source));
        assert!(!block.io_flags()[0].is_ref());
        assert_eq!(block.io_flags()[0].bits(), IoType::Int as u8);
        assert_eq!(block.read_input(0, |_| None).unwrap().as_i32(), 3);
    }

    #[test]
    fn connected_input_refuses_literal_writes() {
        let mut block = sum_block();
        block
            .connect_input(1, OutputRef::new(fid(1), 0), IoType::Int, false)
            .unwrap();
        assert_eq!(
            block.set_io_value(1, IoValue::from_i32(9)),
            Err(BlockError::InputConnected { index: 1 })
        );
        assert!(block.set_io_value(2, IoValue::from_i32(9)).is_ok());
        assert!(block.set_io_value(3, IoValue::ZERO).is_err());
    }

    #[test]
    fn one_shot_monitoring_disarms_after_report() {
        let mut block = sum_block();
        block.enable_monitoring(true);
        assert_eq!(block.flags() & FUNC_FLAG_MONITORING, FUNC_FLAG_MONITORING);
        block.update(&[IoValue::from_i32(1), IoValue::from_i32(1)], 10);

        let mut sink = RecordingSink::default();
        sink.begin(c32_core::TaskId::from_handle(Handle::new(EntityKind::Task, 0, 0)).unwrap(), 1);
        assert!(block.report_monitoring(fid(0), &mut sink));
        sink.finish();

        assert_eq!(sink.batches.len(), 1);
        let (_, items) = &sink.batches[0];
        assert_eq!(items[0].1[2], IoValue::from_i32(2));
        assert!(!block.is_monitoring());
        assert_eq!(block.flags(), 0);
    }

    #[test]
    fn monitoring_flag_toggles_snapshot() {
        let mut block = sum_block();
        block.set_flag(FUNC_FLAG_MONITORING);
        assert!(block.is_monitoring());
        block.clear_flag(FUNC_FLAG_MONITORING);
        assert!(block.monitoring_values().is_none());
    }

    #[test]
    fn byte_access_is_scoped() {
        let mut block = sum_block();
        assert_eq!(block.value_bytes().len(), 12);
        block.write_value_bytes(8, &7i32.to_le_bytes()).unwrap();
        assert_eq!(block.output_value(0), Some(IoValue::from_i32(7)));
        assert_eq!(block.read_value_bytes(0, 4).unwrap(), 2i32.to_le_bytes());
        assert!(block.read_value_bytes(10, 4).is_err());
        assert!(block.write_value_bytes(usize::MAX, &[1]).is_err());
    }

    #[test]
    fn rejects_too_many_inputs() {
        let inputs = vec![IoInit::bool(false); 256];
        assert!(FunctionBlock::new(1, &inputs, &[], Box::new(Sum)).is_err());
    }
}
