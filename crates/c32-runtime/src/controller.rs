//! Controller: the task registry and the outer scheduling step.
//!
//! Owns the wiring graph, every cyclic task, the clock and the system
//! probe. One [`Controller::tick`] advances each task once; the caller
//! sleeps for [`Controller::sleep_duration`] between ticks.

use core::time::Duration;

use c32_blocks::MonitoringSink;
use c32_core::{Arena, CircuitId, Clock, Handle, SystemProbe, TaskId, controller_handle};
use tracing::{debug, info, warn};

use crate::command::{CommandAck, CommandTicket, QueuedCommand, TaskCommand};
use crate::config::SchedulerConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::graph::Graph;
use crate::task::{CyclicTask, NEVER, TickContext, ack};

pub struct Controller {
    clock: Box<dyn Clock>,
    probe: Box<dyn SystemProbe>,
    config: SchedulerConfig,
    graph: Graph,
    tasks: Arena<TaskId, CyclicTask>,
    /// Registration order; ticks follow it.
    task_order: Vec<TaskId>,
    tick_count: u32,
    acks: Vec<CommandAck>,
    start_us: u64,
}

impl Controller {
    pub fn new(clock: Box<dyn Clock>, probe: Box<dyn SystemProbe>, config: SchedulerConfig) -> Self {
        let start_us = clock.now_us();
        Self {
            clock,
            probe,
            config,
            graph: Graph::new(),
            tasks: Arena::new(),
            task_order: Vec::new(),
            tick_count: 0,
            acks: Vec::new(),
            start_us,
        }
    }

    pub fn handle(&self) -> Handle {
        controller_handle()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn now_us(&self) -> u64 {
        self.clock.now_us()
    }

    pub fn uptime_s(&self) -> u32 {
        let elapsed = self.clock.now_us().saturating_sub(self.start_us) / 1_000_000;
        u32::try_from(elapsed).unwrap_or(u32::MAX)
    }

    pub fn tick_count(&self) -> u32 {
        self.tick_count
    }

    pub fn probe(&self) -> &dyn SystemProbe {
        self.probe.as_ref()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Direct graph access. Edits made here land between ticks, never
    /// during a circuit run.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    // ---------------------------------------------------------------
    // Tasks
    // ---------------------------------------------------------------

    pub fn create_task(&mut self, interval_ms: u32, offset_ms: u32) -> RuntimeResult<TaskId> {
        let task = CyclicTask::new(interval_ms, offset_ms, self.config.command_queue_capacity)?;
        let id = self.tasks.insert(task)?;
        self.task_order.push(id);
        debug!(task = %id, interval_ms, offset_ms, "task created");
        Ok(id)
    }

    /// Remove a task. Its pending commands are acknowledged as failed.
    pub fn delete_task(&mut self, id: TaskId) -> RuntimeResult<()> {
        let mut task = self
            .tasks
            .remove(id)
            .ok_or(RuntimeError::UnknownTask { id })?;
        task.fail_pending(id, &mut self.acks);
        self.task_order.retain(|&t| t != id);
        debug!(task = %id, "task deleted");
        Ok(())
    }

    pub fn task(&self, id: TaskId) -> Option<&CyclicTask> {
        self.tasks.get(id)
    }

    pub fn task_ids(&self) -> &[TaskId] {
        &self.task_order
    }

    /// Queue a command for the task's next tick. A full queue acknowledges
    /// the command as failed right away.
    pub fn enqueue(
        &mut self,
        id: TaskId,
        command: TaskCommand,
        ticket: CommandTicket,
    ) -> RuntimeResult<()> {
        let task = self
            .tasks
            .get_mut(id)
            .ok_or(RuntimeError::UnknownTask { id })?;
        if task.enqueue(QueuedCommand { command, ticket }).is_err() {
            warn!(task = %id, ?command, "task command queue full, command rejected");
            self.acks.push(ack(ticket, id, false));
        }
        Ok(())
    }

    pub fn start_task(&mut self, id: TaskId) -> RuntimeResult<()> {
        self.enqueue(id, TaskCommand::Start, CommandTicket::default())
    }

    pub fn stop_task(&mut self, id: TaskId) -> RuntimeResult<()> {
        self.enqueue(id, TaskCommand::Stop, CommandTicket::default())
    }

    pub fn task_add_circuit(&mut self, id: TaskId, circuit: CircuitId, index: i32) -> RuntimeResult<()> {
        self.enqueue(
            id,
            TaskCommand::AddCircuit { circuit, index },
            CommandTicket::default(),
        )
    }

    /// Delete a circuit after taking it out of every task.
    pub fn delete_circuit(&mut self, id: CircuitId) -> RuntimeResult<()> {
        if !self.graph.contains_circuit(id) {
            return Err(RuntimeError::UnknownCircuit { id });
        }
        for &task in &self.task_order {
            if let Some(task) = self.tasks.get_mut(task) {
                task.remove_circuit(id);
            }
        }
        self.graph.delete_circuit(id)
    }

    // ---------------------------------------------------------------
    // Scheduling
    // ---------------------------------------------------------------

    /// Advance every task once. Returns the earliest next wakeup in
    /// absolute microseconds, or `u64::MAX` when no task is running.
    pub fn tick(&mut self, mut sink: Option<&mut dyn MonitoringSink>) -> u64 {
        self.tick_count = self.tick_count.wrapping_add(1);
        let Self {
            clock,
            graph,
            tasks,
            task_order,
            acks,
            ..
        } = self;
        let mut next = NEVER;
        for &id in task_order.iter() {
            let Some(task) = tasks.get_mut(id) else {
                continue;
            };
            let ctx = TickContext {
                id,
                clock: clock.as_ref(),
                graph: &mut *graph,
                acks: &mut *acks,
            };
            next = next.min(task.tick(ctx, sink.as_deref_mut()));
        }
        next
    }

    /// Sleep before the next tick, clamped to the configured bounds.
    pub fn sleep_duration(&self, next_us: u64) -> Duration {
        let min = self.config.min_sleep();
        let max = self.config.max_sleep();
        if next_us == NEVER {
            return max;
        }
        let wait = Duration::from_micros(next_us.saturating_sub(self.clock.now_us()));
        wait.max(min).min(max)
    }

    /// Take every acknowledgement produced since the last call.
    pub fn drain_acks(&mut self) -> Vec<CommandAck> {
        core::mem::take(&mut self.acks)
    }

    /// Log the running tasks. Used when the engine shuts down.
    pub fn log_summary(&self) {
        for (id, task) in self.tasks.iter() {
            let stats = task.stats();
            info!(
                task = %id,
                runs = stats.run_count,
                avg_cpu_us = stats.avg_cpu_us(),
                avg_interval_ms = stats.avg_interval_ms(),
                "task summary"
            );
        }
    }
}

impl core::fmt::Debug for Controller {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("config", &self.config)
            .field("tasks", &self.task_order)
            .field("tick_count", &self.tick_count)
            .finish_non_exhaustive()
    }
}
