//! Wiring graph: every function and circuit, plus the reverse edges that
//! let removal repair consumers without scanning.
//!
//! Each function records who reads its outputs: other functions' inputs
//! and circuit outputs. Removing a function from a circuit walks that list,
//! freezing every consumer input at its last live value and nulling every
//! circuit output reference, before the function leaves the circuit.

use c32_blocks::{FunctionBlock, IoType, IoValue, MonitoringSink, OutputRef};
use c32_core::{Arena, CircuitId, FunctionId};

use crate::circuit::Circuit;
use crate::error::{RuntimeError, RuntimeResult};

/// Something that reads a function output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Consumer {
    Input { function: FunctionId, input: u8 },
    CircuitOutput { circuit: CircuitId, output: u8 },
}

/// Reverse edge stored on the source function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Output index on the source function.
    pub output: u8,
    pub consumer: Consumer,
}

#[derive(Debug)]
struct FunctionNode {
    block: FunctionBlock,
    owner: Option<CircuitId>,
    consumers: Vec<Edge>,
}

#[derive(Debug, Default)]
pub struct Graph {
    functions: Arena<FunctionId, FunctionNode>,
    circuits: Arena<CircuitId, Circuit>,
    scratch: Vec<IoValue>,
}

fn lookup(functions: &Arena<FunctionId, FunctionNode>, source: OutputRef) -> Option<IoValue> {
    functions
        .get(source.function)?
        .block
        .output_value(source.output as usize)
}

fn update_node(
    functions: &mut Arena<FunctionId, FunctionNode>,
    scratch: &mut Vec<IoValue>,
    id: FunctionId,
    dt_ms: u32,
) -> RuntimeResult<()> {
    let node = functions
        .get(id)
        .ok_or(RuntimeError::UnknownFunction { id })?;
    node.block.resolve_inputs(|r| lookup(functions, r), scratch);
    if let Some(node) = functions.get_mut(id) {
        node.block.update(scratch, dt_ms);
    }
    Ok(())
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------

    pub fn function(&self, id: FunctionId) -> Option<&FunctionBlock> {
        self.functions.get(id).map(|n| &n.block)
    }

    pub fn circuit(&self, id: CircuitId) -> Option<&Circuit> {
        self.circuits.get(id)
    }

    pub fn contains_function(&self, id: FunctionId) -> bool {
        self.functions.contains(id)
    }

    pub fn contains_circuit(&self, id: CircuitId) -> bool {
        self.circuits.contains(id)
    }

    /// Circuit owning `id`, if any.
    pub fn owner(&self, id: FunctionId) -> Option<CircuitId> {
        self.functions.get(id).and_then(|n| n.owner)
    }

    /// Reverse edges out of `id`.
    pub fn consumers(&self, id: FunctionId) -> &[Edge] {
        match self.functions.get(id) {
            Some(node) => &node.consumers,
            None => &[],
        }
    }

    pub fn function_ids(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.functions.ids()
    }

    pub fn circuit_ids(&self) -> impl Iterator<Item = CircuitId> + '_ {
        self.circuits.ids()
    }

    pub fn output_value(&self, source: OutputRef) -> Option<IoValue> {
        lookup(&self.functions, source)
    }

    fn node(&self, id: FunctionId) -> RuntimeResult<&FunctionNode> {
        self.functions
            .get(id)
            .ok_or(RuntimeError::UnknownFunction { id })
    }

    fn node_mut(&mut self, id: FunctionId) -> RuntimeResult<&mut FunctionNode> {
        self.functions
            .get_mut(id)
            .ok_or(RuntimeError::UnknownFunction { id })
    }

    fn circuit_ref(&self, id: CircuitId) -> RuntimeResult<&Circuit> {
        self.circuits
            .get(id)
            .ok_or(RuntimeError::UnknownCircuit { id })
    }

    fn circuit_mut(&mut self, id: CircuitId) -> RuntimeResult<&mut Circuit> {
        self.circuits
            .get_mut(id)
            .ok_or(RuntimeError::UnknownCircuit { id })
    }

    fn source_output_type(&self, source: OutputRef) -> RuntimeResult<IoType> {
        let node = self.node(source.function)?;
        node.block
            .output_type(source.output as usize)
            .ok_or(RuntimeError::IndexOob {
                what: "source output",
                index: source.output as usize,
                len: node.block.num_outputs() as usize,
            })
    }

    fn add_edge(&mut self, source: OutputRef, consumer: Consumer) {
        if let Some(node) = self.functions.get_mut(source.function) {
            node.consumers.push(Edge {
                output: source.output,
                consumer,
            });
        }
    }

    fn remove_edge(&mut self, source: OutputRef, consumer: Consumer) {
        if let Some(node) = self.functions.get_mut(source.function) {
            let edge = Edge {
                output: source.output,
                consumer,
            };
            if let Some(pos) = node.consumers.iter().position(|e| *e == edge) {
                node.consumers.swap_remove(pos);
            }
        }
    }

    // ---------------------------------------------------------------
    // Functions
    // ---------------------------------------------------------------

    /// Register a detached function.
    pub fn add_function(&mut self, block: FunctionBlock) -> RuntimeResult<FunctionId> {
        let id = self.functions.insert(FunctionNode {
            block,
            owner: None,
            consumers: Vec::new(),
        })?;
        Ok(id)
    }

    /// Remove a function: leave its circuit, repair everything reading
    /// it, then drop its own input edges.
    pub fn delete_function(&mut self, id: FunctionId) -> RuntimeResult<FunctionBlock> {
        let owner = self.node(id)?.owner;
        match owner {
            Some(owner) => self.circuit_remove_function(owner, id)?,
            None => self.repair_consumers(id),
        }
        let sources: Vec<(usize, OutputRef)> = self
            .node(id)?
            .block
            .sources()
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|s| (i, s)))
            .collect();
        for (input, source) in sources {
            self.remove_edge(
                source,
                Consumer::Input {
                    function: id,
                    input: input as u8,
                },
            );
        }
        let node = self
            .functions
            .remove(id)
            .ok_or(RuntimeError::UnknownFunction { id })?;
        Ok(node.block)
    }

    /// Cut every edge reading `id`. Consumer inputs keep their last live
    /// value as a literal; circuit outputs keep their last copied value.
    fn repair_consumers(&mut self, id: FunctionId) {
        let edges = match self.functions.get_mut(id) {
            Some(node) => core::mem::take(&mut node.consumers),
            None => return,
        };
        for edge in edges {
            match edge.consumer {
                Consumer::Input { function, input } => {
                    let input = input as usize;
                    let Some(node) = self.functions.get(function) else {
                        continue;
                    };
                    let frozen = node
                        .block
                        .read_input(input, |r| lookup(&self.functions, r))
                        .unwrap_or_default();
                    if let Some(node) = self.functions.get_mut(function) {
                        let _ = node.block.disconnect_input(input, frozen);
                    }
                }
                Consumer::CircuitOutput { circuit, output } => {
                    if let Some(circuit) = self.circuits.get_mut(circuit) {
                        circuit.set_output_ref(output as usize, None);
                    }
                }
            }
        }
    }

    /// Wire `input` of `function` to a source output.
    pub fn connect_input(
        &mut self,
        function: FunctionId,
        input: u8,
        source: OutputRef,
        inverted: bool,
    ) -> RuntimeResult<()> {
        let source_type = self.source_output_type(source)?;
        let node = self.node_mut(function)?;
        let previous = node
            .block
            .connect_input(input as usize, source, source_type, inverted)?;
        let consumer = Consumer::Input { function, input };
        if let Some(previous) = previous {
            self.remove_edge(previous, consumer);
        }
        self.add_edge(source, consumer);
        Ok(())
    }

    /// Unwire `input`, freezing its current value. Literal inputs are left
    /// untouched.
    pub fn disconnect_input(&mut self, function: FunctionId, input: u8) -> RuntimeResult<()> {
        let frozen = self.read_input(function, input)?;
        let previous = self
            .node_mut(function)?
            .block
            .disconnect_input(input as usize, frozen)?;
        if let Some(previous) = previous {
            self.remove_edge(previous, Consumer::Input { function, input });
        }
        Ok(())
    }

    /// Live value of an input, following its wiring.
    pub fn read_input(&self, function: FunctionId, input: u8) -> RuntimeResult<IoValue> {
        let node = self.node(function)?;
        Ok(node
            .block
            .read_input(input as usize, |r| lookup(&self.functions, r))?)
    }

    pub fn set_io_value(
        &mut self,
        function: FunctionId,
        index: u8,
        value: IoValue,
    ) -> RuntimeResult<()> {
        self.node_mut(function)?
            .block
            .set_io_value(index as usize, value)?;
        Ok(())
    }

    /// Change a slot's declared type and refresh the conversion of every
    /// edge touching it.
    pub fn set_io_type(
        &mut self,
        function: FunctionId,
        index: u8,
        io_type: IoType,
    ) -> RuntimeResult<()> {
        let index = index as usize;
        let node = self.node_mut(function)?;
        node.block.set_io_type(index, io_type)?;
        let num_inputs = node.block.num_inputs() as usize;

        if index < num_inputs {
            if let Some(source) = node.block.input_source(index) {
                let source_type = self.source_output_type(source)?;
                self.node_mut(function)?
                    .block
                    .refresh_conversion(index, source_type)?;
            }
            return Ok(());
        }

        let output = (index - num_inputs) as u8;
        let readers: Vec<(FunctionId, u8)> = node
            .consumers
            .iter()
            .filter(|e| e.output == output)
            .filter_map(|e| match e.consumer {
                Consumer::Input { function, input } => Some((function, input)),
                Consumer::CircuitOutput { .. } => None,
            })
            .collect();
        for (reader, input) in readers {
            if let Some(node) = self.functions.get_mut(reader) {
                node.block.refresh_conversion(input as usize, io_type)?;
            }
        }
        Ok(())
    }

    /// Run one function on its current inputs.
    pub fn update_function(&mut self, id: FunctionId, dt_ms: u32) -> RuntimeResult<()> {
        update_node(&mut self.functions, &mut self.scratch, id, dt_ms)
    }

    // Per-function flag and monitoring access. Wiring stays behind the
    // graph API so the reverse edges cannot go stale.

    pub fn set_function_flags(&mut self, id: FunctionId, flags: u32) -> RuntimeResult<()> {
        self.node_mut(id)?.block.set_flags(flags);
        Ok(())
    }

    pub fn set_function_flag(&mut self, id: FunctionId, flag: u32) -> RuntimeResult<()> {
        self.node_mut(id)?.block.set_flag(flag);
        Ok(())
    }

    pub fn clear_function_flag(&mut self, id: FunctionId, flag: u32) -> RuntimeResult<()> {
        self.node_mut(id)?.block.clear_flag(flag);
        Ok(())
    }

    pub fn enable_monitoring(&mut self, id: FunctionId, once: bool) -> RuntimeResult<()> {
        self.node_mut(id)?.block.enable_monitoring(once);
        Ok(())
    }

    pub fn disable_monitoring(&mut self, id: FunctionId) -> RuntimeResult<()> {
        self.node_mut(id)?.block.disable_monitoring();
        Ok(())
    }

    pub fn read_value_bytes(
        &self,
        id: FunctionId,
        offset: usize,
        size: usize,
    ) -> RuntimeResult<Vec<u8>> {
        Ok(self.node(id)?.block.read_value_bytes(offset, size)?)
    }

    pub fn write_value_bytes(
        &mut self,
        id: FunctionId,
        offset: usize,
        bytes: &[u8],
    ) -> RuntimeResult<()> {
        self.node_mut(id)?
            .block
            .write_value_bytes(offset, bytes)?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Circuits
    // ---------------------------------------------------------------

    pub fn create_circuit(&mut self, inputs: u8, outputs: u8) -> RuntimeResult<CircuitId> {
        Ok(self.circuits.insert(Circuit::new(inputs, outputs))?)
    }

    /// Delete a circuit and every member function, with full repair.
    pub fn delete_circuit(&mut self, id: CircuitId) -> RuntimeResult<()> {
        let members = self.circuit_ref(id)?.functions().to_vec();
        for function in members {
            self.delete_function(function)?;
        }
        self.circuits.remove(id);
        Ok(())
    }

    /// Add a detached function to a circuit at `index` (append when out
    /// of range).
    pub fn circuit_add_function(
        &mut self,
        circuit: CircuitId,
        function: FunctionId,
        index: i32,
    ) -> RuntimeResult<()> {
        self.circuit_ref(circuit)?;
        let node = self.node_mut(function)?;
        if let Some(owner) = node.owner {
            return Err(RuntimeError::AlreadyOwned { function, owner });
        }
        node.owner = Some(circuit);
        self.circuit_mut(circuit)?.insert_function(function, index);
        Ok(())
    }

    /// Take a function out of a circuit. Everything reading its outputs
    /// is repaired first; the function itself stays registered, detached.
    pub fn circuit_remove_function(
        &mut self,
        circuit: CircuitId,
        function: FunctionId,
    ) -> RuntimeResult<()> {
        if !self.circuit_ref(circuit)?.contains(function) {
            return Err(RuntimeError::NotMember { function, circuit });
        }
        self.repair_consumers(function);
        self.circuit_mut(circuit)?.remove_function(function);
        self.node_mut(function)?.owner = None;
        Ok(())
    }

    pub fn circuit_reorder_function(
        &mut self,
        circuit: CircuitId,
        function: FunctionId,
        index: i32,
    ) -> RuntimeResult<()> {
        let c = self.circuit_mut(circuit)?;
        if !c.remove_function(function) {
            return Err(RuntimeError::NotMember { function, circuit });
        }
        c.insert_function(function, index);
        Ok(())
    }

    /// Point a circuit output at a member's output, or clear it with `None`.
    pub fn circuit_connect_output(
        &mut self,
        circuit: CircuitId,
        output: u8,
        source: Option<OutputRef>,
    ) -> RuntimeResult<()> {
        let c = self.circuit_ref(circuit)?;
        if output >= c.num_outputs() {
            return Err(RuntimeError::IndexOob {
                what: "circuit output",
                index: output as usize,
                len: c.num_outputs() as usize,
            });
        }
        if let Some(source) = source {
            if !c.contains(source.function) {
                return Err(RuntimeError::NotMember {
                    function: source.function,
                    circuit,
                });
            }
            self.source_output_type(source)?;
        }

        let consumer = Consumer::CircuitOutput { circuit, output };
        let previous = self
            .circuit_mut(circuit)?
            .set_output_ref(output as usize, source);
        if let Some(previous) = previous {
            self.remove_edge(previous, consumer);
        }
        if let Some(source) = source {
            self.add_edge(source, consumer);
        }
        Ok(())
    }

    /// Update every member in order, then copy referenced outputs.
    pub fn run_circuit(&mut self, id: CircuitId, dt_ms: u32) -> RuntimeResult<()> {
        let Self {
            functions,
            circuits,
            scratch,
        } = self;
        let circuit = circuits
            .get_mut(id)
            .ok_or(RuntimeError::UnknownCircuit { id })?;
        for &function in circuit.functions() {
            update_node(functions, scratch, function, dt_ms)?;
        }
        for output in 0..circuit.num_outputs() as usize {
            let value = circuit.output_refs()[output].and_then(|r| lookup(functions, r));
            if let Some(value) = value {
                circuit.set_output_value(output, value);
            }
        }
        Ok(())
    }

    /// Number of members with monitoring armed.
    pub fn monitored_count(&self, id: CircuitId) -> usize {
        self.circuits.get(id).map_or(0, |c| {
            c.functions()
                .iter()
                .filter(|&&f| self.function(f).is_some_and(|b| b.is_monitoring()))
                .count()
        })
    }

    /// Report every armed member to `sink`.
    pub fn collect_monitoring<S>(&mut self, id: CircuitId, sink: &mut S) -> RuntimeResult<()>
    where
        S: MonitoringSink + ?Sized,
    {
        let Self {
            functions,
            circuits,
            ..
        } = self;
        let circuit = circuits.get(id).ok_or(RuntimeError::UnknownCircuit { id })?;
        for &function in circuit.functions() {
            if let Some(node) = functions.get_mut(function) {
                node.block.report_monitoring(function, &mut *sink);
            }
        }
        Ok(())
    }
}
