//! Cyclic task: drift-correcting periodic execution of circuits.
//!
//! Schedule points sit on a grid anchored at time 0: `k * interval +
//! offset`. Starting aligns to that grid, so two tasks with the same
//! interval and offset fire together no matter when each was started.
//! A late tick fires once and skips every missed point; missed runs are
//! not replayed.

use c32_blocks::MonitoringSink;
use c32_core::{CircuitId, Clock, TaskId};
use tracing::{debug, info};

use crate::circuit::insert_at;
use crate::command::{CommandAck, CommandQueue, CommandTicket, QueuedCommand, TaskCommand};
use crate::error::{RuntimeError, RuntimeResult};
use crate::graph::Graph;

/// Value returned by [`CyclicTask::tick`] when the task is stopped.
pub const NEVER: u64 = u64::MAX;

/// Runtime statistics of one task.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaskStats {
    pub run_count: u32,
    pub last_cpu_us: u32,
    pub cumulative_cpu_us: u64,
    pub last_interval_ms: u32,
    pub cumulative_interval_ms: u64,
    /// Runs that measured an interval (every run but the first after start).
    pub interval_samples: u32,
    /// Lateness of the latest firing.
    pub drift_us: u32,
}

impl TaskStats {
    pub fn avg_cpu_us(&self) -> f32 {
        if self.run_count == 0 {
            return 0.0;
        }
        self.cumulative_cpu_us as f32 / self.run_count as f32
    }

    pub fn avg_interval_ms(&self) -> f32 {
        if self.interval_samples == 0 {
            return 0.0;
        }
        self.cumulative_interval_ms as f32 / self.interval_samples as f32
    }
}

/// Everything a task touches while ticking.
pub struct TickContext<'a> {
    pub id: TaskId,
    pub clock: &'a dyn Clock,
    pub graph: &'a mut Graph,
    pub acks: &'a mut Vec<CommandAck>,
}

#[derive(Debug)]
pub struct CyclicTask {
    interval_ms: u32,
    offset_ms: u32,
    base_us: u64,
    running: bool,
    prev_run_us: Option<u64>,
    circuits: Vec<CircuitId>,
    stats: TaskStats,
    commands: CommandQueue,
}

impl CyclicTask {
    pub fn new(interval_ms: u32, offset_ms: u32, queue_capacity: usize) -> RuntimeResult<Self> {
        if interval_ms == 0 {
            return Err(RuntimeError::InvalidArg {
                what: "task interval must be positive",
            });
        }
        Ok(Self {
            interval_ms,
            offset_ms,
            base_us: 0,
            running: false,
            prev_run_us: None,
            circuits: Vec::new(),
            stats: TaskStats::default(),
            commands: CommandQueue::new(queue_capacity),
        })
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn offset_ms(&self) -> u32 {
        self.offset_ms
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn circuits(&self) -> &[CircuitId] {
        &self.circuits
    }

    pub fn stats(&self) -> &TaskStats {
        &self.stats
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    fn interval_us(&self) -> u64 {
        u64::from(self.interval_ms) * 1000
    }

    /// Absolute time of the next scheduled run.
    pub fn next_update_us(&self) -> u64 {
        self.base_us + u64::from(self.offset_ms) * 1000
    }

    /// Align to the schedule grid so the next run is not in the past.
    pub fn start(&mut self, now_us: u64) {
        let interval = self.interval_us();
        self.base_us = now_us / interval * interval;
        let next = self.next_update_us();
        if next < now_us {
            self.base_us += (now_us - next).div_ceil(interval) * interval;
        }
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.prev_run_us = None;
    }

    /// Change the interval. A running task re-aligns to the new grid.
    pub fn set_interval(&mut self, interval_ms: u32, now_us: u64) -> RuntimeResult<()> {
        if interval_ms == 0 {
            return Err(RuntimeError::InvalidArg {
                what: "task interval must be positive",
            });
        }
        self.interval_ms = interval_ms;
        if self.running {
            self.start(now_us);
        }
        Ok(())
    }

    /// Change the phase offset. A running task re-aligns.
    pub fn set_offset(&mut self, offset_ms: u32, now_us: u64) {
        self.offset_ms = offset_ms;
        if self.running {
            self.start(now_us);
        }
    }

    /// Schedule a circuit. Each circuit appears at most once per task.
    pub fn add_circuit(&mut self, circuit: CircuitId, index: i32) -> bool {
        if self.circuits.contains(&circuit) {
            return false;
        }
        insert_at(&mut self.circuits, circuit, index);
        true
    }

    pub fn remove_circuit(&mut self, circuit: CircuitId) -> bool {
        match self.circuits.iter().position(|&c| c == circuit) {
            Some(pos) => {
                self.circuits.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Queue a command for the next tick.
    pub fn enqueue(&mut self, command: QueuedCommand) -> Result<(), QueuedCommand> {
        self.commands.push(command)
    }

    /// Fail every pending command (task being deleted).
    pub fn fail_pending(&mut self, id: TaskId, acks: &mut Vec<CommandAck>) {
        while let Some(queued) = self.commands.pop() {
            acks.push(CommandAck {
                ticket: queued.ticket,
                task: id,
                success: false,
            });
        }
    }

    fn apply(&mut self, id: TaskId, command: TaskCommand, now_us: u64, graph: &Graph) -> bool {
        let was_running = self.running;
        let ok = match command {
            TaskCommand::Start => {
                self.start(now_us);
                true
            }
            TaskCommand::Stop => {
                self.stop();
                true
            }
            TaskCommand::SetInterval(ms) => self.set_interval(ms, now_us).is_ok(),
            TaskCommand::SetOffset(ms) => {
                self.set_offset(ms, now_us);
                true
            }
            TaskCommand::AddCircuit { circuit, index } => {
                graph.contains_circuit(circuit) && self.add_circuit(circuit, index)
            }
            TaskCommand::RemoveCircuit(circuit) => self.remove_circuit(circuit),
        };
        match (was_running, self.running) {
            (false, true) => info!(task = %id, interval_ms = self.interval_ms, "task started"),
            (true, false) => info!(task = %id, "task stopped"),
            _ => {}
        }
        debug!(task = %id, ?command, ok, "task command applied");
        ok
    }

    fn drain_commands(&mut self, ctx: &mut TickContext<'_>) {
        while let Some(QueuedCommand { command, ticket }) = self.commands.pop() {
            let now = ctx.clock.now_us();
            let success = self.apply(ctx.id, command, now, ctx.graph);
            ctx.acks.push(ack(ticket, ctx.id, success));
        }
    }

    /// Apply queued commands, then run if due. Returns the next wakeup
    /// time, or [`NEVER`] when stopped.
    pub fn tick<S>(&mut self, mut ctx: TickContext<'_>, sink: Option<&mut S>) -> u64
    where
        S: MonitoringSink + ?Sized,
    {
        self.drain_commands(&mut ctx);
        if !self.running {
            return NEVER;
        }
        let now = ctx.clock.now_us();
        let next = self.next_update_us();
        if now >= next {
            let late = now - next;
            self.stats.drift_us = u32::try_from(late).unwrap_or(u32::MAX);
            let interval = self.interval_us();
            self.base_us += (late / interval + 1) * interval;
            self.update(now, &mut ctx, sink);
        }
        self.next_update_us()
    }

    fn update<S>(&mut self, now: u64, ctx: &mut TickContext<'_>, sink: Option<&mut S>)
    where
        S: MonitoringSink + ?Sized,
    {
        if let Some(prev) = self.prev_run_us {
            let interval_ms = u32::try_from((now - prev) / 1000).unwrap_or(u32::MAX);
            self.stats.last_interval_ms = interval_ms;
            self.stats.cumulative_interval_ms += u64::from(interval_ms);
            self.stats.interval_samples += 1;
        }
        self.prev_run_us = Some(now);
        self.stats.run_count = self.stats.run_count.wrapping_add(1);

        let cpu_start = ctx.clock.now_us();
        for &circuit in &self.circuits {
            // membership is purged before a circuit is deleted
            let _ = ctx.graph.run_circuit(circuit, self.interval_ms);
        }
        let cpu = ctx.clock.now_us().saturating_sub(cpu_start);
        self.stats.last_cpu_us = u32::try_from(cpu).unwrap_or(u32::MAX);
        self.stats.cumulative_cpu_us += cpu;

        if let Some(sink) = sink {
            let armed: usize = self
                .circuits
                .iter()
                .map(|&c| ctx.graph.monitored_count(c))
                .sum();
            if armed > 0 {
                sink.begin(ctx.id, armed);
                for &circuit in &self.circuits {
                    let _ = ctx.graph.collect_monitoring(circuit, &mut *sink);
                }
                sink.finish();
            }
        }
    }
}

pub(crate) fn ack(ticket: CommandTicket, task: TaskId, success: bool) -> CommandAck {
    CommandAck {
        ticket,
        task,
        success,
    }
}
