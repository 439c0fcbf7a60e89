//! Request dispatcher bound to one controller.
//!
//! The transport side owns a [`LinkInbox`] and pushes whole messages into
//! a bounded SPSC ring; the scheduler loop drains it with
//! [`Link::process`] between ticks. Requests never block the transport
//! and never run concurrently with a circuit.
//!
//! Failure policy:
//! - short, oversized or undecodable messages are dropped without a
//!   response;
//! - a target that is zero, of the wrong kind or stale is dropped with a
//!   warning and no side effect;
//! - a well-formed request that fails is answered with `result = 0`.

use c32_blocks::{FunctionFactory, IoType, IoValue, MonitoringSink, OutputRef};
use c32_core::{
    CONTROLLER_HANDLE_RAW, CircuitId, Clock, EntityId, EntityKind, FunctionId, TaskId,
};
use c32_runtime::{CommandTicket, Controller, TaskCommand};
use rtrb::{Consumer, Producer, PushError, RingBuffer};
use tracing::{debug, info, warn};

use crate::codec::{Frame, REQUEST_HEADER_LEN, Reader, RequestHeader, ResponseHeader};
use crate::collection::MonitoringCollector;
use crate::config::LinkConfig;
use crate::error::{LinkError, LinkResult};
use crate::info;
use crate::protocol::{MessageType, Target};

/// Outbound byte sink. Each call carries exactly one message.
pub trait Transport {
    fn send_bytes(&mut self, bytes: &[u8]);
}

/// Transport that keeps every sent message. Used by tests.
#[derive(Debug, Default, Clone)]
pub struct BufferTransport {
    pub sent: Vec<Vec<u8>>,
}

impl Transport for BufferTransport {
    fn send_bytes(&mut self, bytes: &[u8]) {
        self.sent.push(bytes.to_vec());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Connected,
    Disconnected,
    Data(Vec<u8>),
}

/// Transport-side producer of inbound events.
pub struct LinkInbox {
    producer: Producer<Inbound>,
    max_message_len: usize,
}

impl LinkInbox {
    pub fn connected(&mut self) -> bool {
        self.push(Inbound::Connected)
    }

    pub fn disconnected(&mut self) -> bool {
        self.push(Inbound::Disconnected)
    }

    /// Queue one received message. Messages shorter than a request header
    /// or longer than the configured maximum are dropped.
    pub fn on_data(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() < REQUEST_HEADER_LEN || bytes.len() > self.max_message_len {
            return false;
        }
        self.push(Inbound::Data(bytes.to_vec()))
    }

    fn push(&mut self, item: Inbound) -> bool {
        match self.producer.push(item) {
            Ok(()) => true,
            Err(PushError::Full(_)) => {
                warn!("link inbound queue full, message dropped");
                false
            }
        }
    }
}

impl core::fmt::Debug for LinkInbox {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LinkInbox")
            .field("free", &self.producer.slots())
            .finish()
    }
}

/// Entity a request was validated against.
#[derive(Debug, Clone, Copy)]
enum Addressed {
    Nothing,
    Controller,
    Task(TaskId),
    Circuit(CircuitId),
    Function(FunctionId),
}

pub struct Link<T: Transport> {
    transport: T,
    factory: FunctionFactory,
    clock: Box<dyn Clock>,
    consumer: Consumer<Inbound>,
    inbox: Option<LinkInbox>,
    connected: bool,
    collector: MonitoringCollector,
    dropped: u64,
}

impl<T: Transport> Link<T> {
    pub fn new(transport: T, factory: FunctionFactory, clock: Box<dyn Clock>, config: LinkConfig) -> Self {
        let (producer, consumer) = RingBuffer::new(config.inbound_capacity);
        Self {
            transport,
            factory,
            clock,
            consumer,
            inbox: Some(LinkInbox {
                producer,
                max_message_len: config.max_message_len,
            }),
            connected: false,
            collector: MonitoringCollector::new(),
            dropped: 0,
        }
    }

    /// Hand out the transport side. Available once.
    pub fn take_inbox(&mut self) -> Option<LinkInbox> {
        self.inbox.take()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn factory(&self) -> &FunctionFactory {
        &self.factory
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Requests dropped without a response since creation.
    pub fn dropped_requests(&self) -> u64 {
        self.dropped
    }

    /// Monitoring sink for the next controller tick; none while
    /// disconnected, so collection is skipped.
    pub fn monitoring_sink(&mut self) -> Option<&mut dyn MonitoringSink> {
        if self.connected {
            Some(self)
        } else {
            None
        }
    }

    fn timestamp_ms(&self) -> u32 {
        // wraps after ~49 days, like the client expects
        (self.clock.now_us() / 1000) as u32
    }

    fn send(&mut self, frame: &Frame) {
        if self.connected {
            self.transport.send_bytes(frame.as_bytes());
        }
    }

    /// Drain and dispatch every queued inbound event.
    pub fn process(&mut self, controller: &mut Controller) {
        while let Ok(item) = self.consumer.pop() {
            match item {
                Inbound::Connected => {
                    self.connected = true;
                    info!("link connected");
                    let ping = Frame::response(MessageType::Ping.as_u32(), 0, true, self.timestamp_ms());
                    self.send(&ping);
                }
                Inbound::Disconnected => {
                    self.connected = false;
                    info!("link disconnected");
                }
                Inbound::Data(bytes) => self.handle_message(controller, &bytes),
            }
        }
    }

    /// Dispatch one request and send its response, if any.
    pub fn handle_message(&mut self, controller: &mut Controller, bytes: &[u8]) {
        match self.dispatch(controller, bytes) {
            Ok(Some(frame)) => self.send(&frame),
            Ok(None) => {}
            Err(err) => {
                self.dropped += 1;
                warn!(%err, "request dropped");
            }
        }
    }

    /// Answer every task command applied since the last call.
    pub fn flush_acks(&mut self, controller: &mut Controller) {
        let ts = self.timestamp_ms();
        for ack in controller.drain_acks() {
            // commands issued locally carry the default ticket
            if ack.ticket == CommandTicket::default() {
                continue;
            }
            let frame = Frame::response(ack.ticket.message_type, ack.ticket.request_id, ack.success, ts);
            self.send(&frame);
        }
    }

    fn validate(&self, controller: &Controller, msg: MessageType, target: u32) -> LinkResult<Addressed> {
        let invalid = LinkError::InvalidTarget {
            msg_type: msg.name(),
            target,
        };
        let addressed = match msg.target() {
            Target::None => Some(Addressed::Nothing),
            Target::Outbound => {
                return Err(LinkError::NotARequest {
                    msg_type: msg.name(),
                });
            }
            Target::Entity(EntityKind::Controller) => {
                (target == CONTROLLER_HANDLE_RAW).then_some(Addressed::Controller)
            }
            Target::Entity(EntityKind::Task) => TaskId::from_raw(target)
                .filter(|&id| controller.task(id).is_some())
                .map(Addressed::Task),
            Target::Entity(EntityKind::Circuit) => CircuitId::from_raw(target)
                .filter(|&id| controller.graph().contains_circuit(id))
                .map(Addressed::Circuit),
            Target::Entity(EntityKind::Function) => FunctionId::from_raw(target)
                .filter(|&id| controller.graph().contains_function(id))
                .map(Addressed::Function),
        };
        addressed.ok_or(invalid)
    }

    fn dispatch(&mut self, controller: &mut Controller, bytes: &[u8]) -> LinkResult<Option<Frame>> {
        let (header, payload) = RequestHeader::decode(bytes)?;
        let msg = MessageType::from_u32(header.msg_type).ok_or(LinkError::UnknownMessage {
            msg_type: header.msg_type,
        })?;
        let addressed = self.validate(controller, msg, header.target)?;
        debug!(%msg, request_id = header.request_id, target = header.target, "request");

        let mut r = Reader::new(payload);
        let ts = self.timestamp_ms();
        let ack = |ok: bool| Frame::response(header.msg_type, header.request_id, ok, ts);
        let ticket = CommandTicket {
            message_type: header.msg_type,
            request_id: header.request_id,
        };

        use Addressed as A;
        use MessageType as M;
        let reply = match (msg, addressed) {
            (M::Ping, _) => ack(true),

            // -- info ---------------------------------------------------
            (M::ControllerInfo, _) => {
                let mut frame = ack(true);
                info::controller_info(controller, &mut frame);
                frame
            }
            (M::TaskInfo, A::Task(id)) => {
                let mut frame = ack(true);
                info::task_info(controller, id, &mut frame);
                frame
            }
            (M::CircuitInfo, A::Circuit(id)) => {
                let mut frame = ack(true);
                info::circuit_info(controller, id, &mut frame);
                frame
            }
            (M::FunctionInfo, A::Function(id)) => {
                let mut frame = ack(true);
                info::function_info(controller, id, &mut frame);
                frame
            }

            // -- controller ---------------------------------------------
            (M::CreateTask, A::Controller) => {
                let interval_ms = r.u32("interval")?;
                let offset_ms = r.u32("offset")?;
                created(ack, controller.create_task(interval_ms, offset_ms).map(|id| id.raw()).ok())
            }
            (M::CreateCircuit, A::Controller) => {
                let inputs = narrow(r.u32("inputs")?);
                let outputs = narrow(r.u32("outputs")?);
                let id = match (inputs, outputs) {
                    (Some(i), Some(o)) => controller.graph_mut().create_circuit(i, o).ok(),
                    _ => None,
                };
                created(ack, id.map(|id| id.raw()))
            }
            (M::CreateFunction, A::Controller) => {
                let library = narrow(r.u32("library")?);
                let function = narrow(r.u32("function")?);
                let inputs = narrow(r.u32("inputs")?);
                let outputs = narrow(r.u32("outputs")?);
                let block = match (library, function, inputs, outputs) {
                    (Some(l), Some(f), Some(i), Some(o)) => self.factory.create_instance(l, f, i, o),
                    _ => None,
                };
                let id = block.and_then(|b| controller.graph_mut().add_function(b).ok());
                created(ack, id.map(|id| id.raw()))
            }

            // -- task ---------------------------------------------------
            (M::DeleteTask, A::Task(id)) => ack(controller.delete_task(id).is_ok()),
            (M::TaskStart, A::Task(id)) => return defer(controller, id, TaskCommand::Start, ticket, ack),
            (M::TaskStop, A::Task(id)) => return defer(controller, id, TaskCommand::Stop, ticket, ack),
            (M::TaskSetInterval, A::Task(id)) => {
                let ms = r.u32("interval")?;
                return defer(controller, id, TaskCommand::SetInterval(ms), ticket, ack);
            }
            (M::TaskSetOffset, A::Task(id)) => {
                let ms = r.u32("offset")?;
                return defer(controller, id, TaskCommand::SetOffset(ms), ticket, ack);
            }
            (M::TaskAddCircuit, A::Task(id)) => {
                let circuit = CircuitId::from_raw(r.u32("circuit")?);
                let index = r.i32("index")?;
                match circuit {
                    Some(circuit) => {
                        let command = TaskCommand::AddCircuit { circuit, index };
                        return defer(controller, id, command, ticket, ack);
                    }
                    None => ack(false),
                }
            }
            (M::TaskRemoveCircuit, A::Task(id)) => match CircuitId::from_raw(r.u32("circuit")?) {
                Some(circuit) => {
                    return defer(controller, id, TaskCommand::RemoveCircuit(circuit), ticket, ack);
                }
                None => ack(false),
            },

            // -- circuit ------------------------------------------------
            (M::DeleteCircuit, A::Circuit(id)) => ack(controller.delete_circuit(id).is_ok()),
            (M::CircuitAddFunction, A::Circuit(id)) => {
                let function = FunctionId::from_raw(r.u32("function")?);
                let index = r.i32("index")?;
                let ok = function.is_some_and(|f| {
                    controller.graph_mut().circuit_add_function(id, f, index).is_ok()
                });
                ack(ok)
            }
            (M::CircuitRemoveFunction, A::Circuit(id)) => {
                let function = FunctionId::from_raw(r.u32("function")?);
                let ok = function.is_some_and(|f| {
                    controller.graph_mut().circuit_remove_function(id, f).is_ok()
                });
                ack(ok)
            }
            (M::CircuitReorderFunction, A::Circuit(id)) => {
                let function = FunctionId::from_raw(r.u32("function")?);
                let index = r.i32("index")?;
                let ok = function.is_some_and(|f| {
                    controller.graph_mut().circuit_reorder_function(id, f, index).is_ok()
                });
                ack(ok)
            }
            (M::CircuitConnectOutput, A::Circuit(id)) => {
                let output = narrow(r.u32("output")?);
                let function = r.u32("function")?;
                let function_output = narrow(r.u32("function output")?);
                let source = match (function, function_output) {
                    (0, _) => Some(None),
                    (raw, Some(out)) => FunctionId::from_raw(raw).map(|f| Some(OutputRef::new(f, out))),
                    _ => None,
                };
                let ok = match (output, source) {
                    (Some(output), Some(source)) => controller
                        .graph_mut()
                        .circuit_connect_output(id, output, source)
                        .is_ok(),
                    _ => false,
                };
                ack(ok)
            }

            // -- function -----------------------------------------------
            (M::DeleteFunction, A::Function(id)) => ack(controller.graph_mut().delete_function(id).is_ok()),
            (M::GetMemData, A::Function(id)) => {
                let offset = r.u32("offset")? as usize;
                let size = r.u32("size")? as usize;
                match controller.graph().read_value_bytes(id, offset, size) {
                    Ok(data) => {
                        let mut frame = ack(true);
                        frame.put_bytes(&data);
                        frame
                    }
                    Err(_) => ack(false),
                }
            }
            (M::SetMemData, A::Function(id)) => {
                let offset = r.u32("offset")? as usize;
                let data = r.rest();
                ack(controller.graph_mut().write_value_bytes(id, offset, data).is_ok())
            }
            (M::MonitoringEnable, A::Function(id)) => {
                let once = r.u32("once")? != 0;
                ack(controller.graph_mut().enable_monitoring(id, once).is_ok())
            }
            (M::MonitoringDisable, A::Function(id)) => {
                ack(controller.graph_mut().disable_monitoring(id).is_ok())
            }
            (M::FunctionSetIoValue, A::Function(id)) => {
                let index = narrow(r.u32("io index")?);
                let value = IoValue::from_u32(r.u32("value")?);
                let ok = index.is_some_and(|i| controller.graph_mut().set_io_value(id, i, value).is_ok());
                ack(ok)
            }
            (M::FunctionSetIoFlag, A::Function(id)) => {
                let index = narrow(r.u32("io index")?);
                let io_type = narrow(r.u32("io type")?).and_then(IoType::from_bits);
                let ok = match (index, io_type) {
                    (Some(i), Some(t)) => controller.graph_mut().set_io_type(id, i, t).is_ok(),
                    _ => false,
                };
                ack(ok)
            }
            (M::FunctionConnectInput, A::Function(id)) => {
                let input = narrow(r.u32("input")?);
                let source = FunctionId::from_raw(r.u32("source")?);
                let source_output = narrow(r.u32("source output")?);
                let inverted = r.u32("inverted")? != 0;
                let ok = match (input, source, source_output) {
                    (Some(input), Some(source), Some(out)) => controller
                        .graph_mut()
                        .connect_input(id, input, OutputRef::new(source, out), inverted)
                        .is_ok(),
                    _ => false,
                };
                ack(ok)
            }
            (M::FunctionDisconnectInput, A::Function(id)) => {
                let input = narrow(r.u32("input")?);
                let ok = input.is_some_and(|i| controller.graph_mut().disconnect_input(id, i).is_ok());
                ack(ok)
            }
            (M::FunctionSetFlags, A::Function(id)) => {
                let flags = r.u32("flags")?;
                ack(controller.graph_mut().set_function_flags(id, flags).is_ok())
            }
            (M::FunctionSetFlag, A::Function(id)) => {
                let flag = r.u32("flag")?;
                ack(controller.graph_mut().set_function_flag(id, flag).is_ok())
            }
            (M::FunctionClearFlag, A::Function(id)) => {
                let flag = r.u32("flag")?;
                ack(controller.graph_mut().clear_function_flag(id, flag).is_ok())
            }

            _ => {
                return Err(LinkError::InvalidTarget {
                    msg_type: msg.name(),
                    target: header.target,
                });
            }
        };
        if !reply_success(&reply) {
            debug!(%msg, request_id = header.request_id, "request failed");
        }
        Ok(Some(reply))
    }
}

impl<T: Transport> MonitoringSink for Link<T> {
    fn begin(&mut self, _task: TaskId, max_items: usize) {
        self.collector.begin(max_items);
    }

    fn report(&mut self, function: FunctionId, values: &[IoValue]) {
        let ts = self.timestamp_ms();
        if let Some(frame) = self.collector.add(function, values, ts) {
            self.send(&frame);
        }
    }

    fn finish(&mut self) {
        let ts = self.timestamp_ms();
        if let Some(frame) = self.collector.finish(ts) {
            self.send(&frame);
        }
    }
}

impl<T: Transport + core::fmt::Debug> core::fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Link")
            .field("transport", &self.transport)
            .field("connected", &self.connected)
            .field("dropped", &self.dropped)
            .finish_non_exhaustive()
    }
}

fn narrow(v: u32) -> Option<u8> {
    u8::try_from(v).ok()
}

fn created(ack: impl Fn(bool) -> Frame, handle: Option<u32>) -> Frame {
    match handle {
        Some(handle) => {
            let mut frame = ack(true);
            frame.put_u32(handle);
            frame
        }
        None => ack(false),
    }
}

/// Queue a task command; the response is sent when the task applies it.
fn defer(
    controller: &mut Controller,
    task: TaskId,
    command: TaskCommand,
    ticket: CommandTicket,
    ack: impl Fn(bool) -> Frame,
) -> LinkResult<Option<Frame>> {
    match controller.enqueue(task, command, ticket) {
        Ok(()) => Ok(None),
        Err(_) => Ok(Some(ack(false))),
    }
}

fn reply_success(frame: &Frame) -> bool {
    ResponseHeader::decode(frame.as_bytes()).is_ok_and(|(header, _)| header.success())
}
