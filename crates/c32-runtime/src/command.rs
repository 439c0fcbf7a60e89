//! Deferred task commands.
//!
//! Structural edits to a task are queued and applied at the start of the
//! task's own tick, never while its circuits are running. Each applied
//! command produces exactly one [`CommandAck`].

use c32_core::{CircuitId, TaskId};
use rtrb::{Consumer, Producer, PushError, RingBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCommand {
    Start,
    Stop,
    SetInterval(u32),
    SetOffset(u32),
    AddCircuit { circuit: CircuitId, index: i32 },
    RemoveCircuit(CircuitId),
}

/// Identifies the request a command came from. Opaque to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandTicket {
    pub message_type: u32,
    pub request_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedCommand {
    pub command: TaskCommand,
    pub ticket: CommandTicket,
}

/// Outcome of one queued command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandAck {
    pub ticket: CommandTicket,
    pub task: TaskId,
    pub success: bool,
}

/// Bounded SPSC queue of pending commands.
pub struct CommandQueue {
    producer: Producer<QueuedCommand>,
    consumer: Consumer<QueuedCommand>,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = RingBuffer::new(capacity);
        Self { producer, consumer }
    }

    /// Queue a command, handing it back when the queue is full.
    pub fn push(&mut self, command: QueuedCommand) -> Result<(), QueuedCommand> {
        match self.producer.push(command) {
            Ok(()) => Ok(()),
            Err(PushError::Full(command)) => Err(command),
        }
    }

    pub fn pop(&mut self) -> Option<QueuedCommand> {
        self.consumer.pop().ok()
    }

    pub fn len(&self) -> usize {
        self.consumer.slots()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }
}

impl core::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandQueue")
            .field("len", &self.len())
            .finish()
    }
}
