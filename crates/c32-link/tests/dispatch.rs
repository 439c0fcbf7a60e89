//! Request dispatch over an in-memory transport.

use c32_core::{CONTROLLER_HANDLE_RAW, ManualClock, StaticProbe, SystemConfig};
use c32_link::{
    BufferTransport, Link, LinkConfig, LinkInbox, MessageType, Reader, RequestHeader,
    ResponseHeader, decode_report, payload,
};
use c32_library::{LIB_ID_MATH, LIB_ID_MATH_INT, math, math_int};
use c32_runtime::{Controller, SchedulerConfig};

struct Rig {
    clock: ManualClock,
    controller: Controller,
    link: Link<BufferTransport>,
    inbox: LinkInbox,
    next_request: u32,
}

impl Rig {
    fn new() -> Self {
        Self::with_config(LinkConfig::default())
    }

    fn with_config(config: LinkConfig) -> Self {
        let clock = ManualClock::new(0);
        let controller = Controller::new(
            Box::new(clock.clone()),
            Box::new(StaticProbe::new(SystemConfig {
                free_memory_bytes: 123_456,
                ..SystemConfig::default()
            })),
            SchedulerConfig::default(),
        );
        let mut link = Link::new(
            BufferTransport::default(),
            c32_library::standard_factory().unwrap(),
            Box::new(clock.clone()),
            config,
        );
        let mut inbox = link.take_inbox().unwrap();
        inbox.connected();
        let mut rig = Self {
            clock,
            controller,
            link,
            inbox,
            next_request: 1,
        };
        rig.pump();
        rig.take_sent();
        rig
    }

    fn pump(&mut self) {
        self.link.process(&mut self.controller);
    }

    fn tick(&mut self) {
        self.controller.tick(self.link.monitoring_sink());
        self.link.flush_acks(&mut self.controller);
    }

    fn take_sent(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.link.transport_mut().sent)
    }

    /// Send one request and return every message sent in response.
    fn request(&mut self, msg: MessageType, target: u32, words: &[u32]) -> Vec<Vec<u8>> {
        let header = RequestHeader {
            msg_type: msg.as_u32(),
            request_id: self.next_request,
            target,
        };
        self.next_request += 1;
        assert!(self.inbox.on_data(&header.encode(&payload(words))));
        self.pump();
        self.take_sent()
    }

    /// Request expecting exactly one successful reply; returns its payload.
    fn ok(&mut self, msg: MessageType, target: u32, words: &[u32]) -> Vec<u8> {
        let sent = self.request(msg, target, words);
        assert_eq!(sent.len(), 1, "{msg} should get one response");
        let (header, rest) = ResponseHeader::decode(&sent[0]).unwrap();
        assert_eq!(header.msg_type, msg.as_u32());
        assert_eq!(header.request_id, self.next_request - 1);
        assert!(header.success(), "{msg} failed");
        rest.to_vec()
    }

    fn create(&mut self, msg: MessageType, words: &[u32]) -> u32 {
        let rest = self.ok(msg, CONTROLLER_HANDLE_RAW, words);
        Reader::new(&rest).u32("handle").unwrap()
    }
}

fn result_of(frame: &[u8]) -> (u32, bool) {
    let (header, _) = ResponseHeader::decode(frame).unwrap();
    (header.request_id, header.success())
}

#[test]
fn connect_sends_unsolicited_ping() {
    let clock = ManualClock::new(0);
    let mut controller = Controller::new(
        Box::new(clock.clone()),
        Box::new(StaticProbe::default()),
        SchedulerConfig::default(),
    );
    let mut link = Link::new(
        BufferTransport::default(),
        c32_library::standard_factory().unwrap(),
        Box::new(clock),
        LinkConfig::default(),
    );
    let mut inbox = link.take_inbox().unwrap();
    assert!(link.take_inbox().is_none());

    inbox.connected();
    link.process(&mut controller);
    assert!(link.is_connected());
    let sent = &link.transport().sent;
    assert_eq!(sent.len(), 1);
    let (header, rest) = ResponseHeader::decode(&sent[0]).unwrap();
    assert_eq!(header.msg_type, 0);
    assert_eq!(header.request_id, 0);
    assert!(rest.is_empty());
}

#[test]
fn ping_and_controller_info_ignore_target() {
    let mut rig = Rig::new();
    assert!(rig.ok(MessageType::Ping, 0, &[]).is_empty());

    rig.controller.create_task(100, 0).unwrap();
    let info = rig.ok(MessageType::ControllerInfo, 0xDEAD_BEEF, &[]);
    let mut r = Reader::new(&info);
    assert_eq!(r.u32("handle").unwrap(), CONTROLLER_HANDLE_RAW);
    assert_eq!(r.u32("free").unwrap(), 123_456);
    assert_eq!(r.u32("cpu").unwrap(), 240);
    assert_eq!(r.i32("signal").unwrap(), 0);
    r.u32("uptime").unwrap();
    r.u32("ticks").unwrap();
    assert_eq!(r.u32("task count").unwrap(), 1);
}

#[test]
fn invalid_targets_get_no_response_and_no_side_effect() {
    let mut rig = Rig::new();
    let task = rig.create(MessageType::CreateTask, &[100, 0]);

    // zero, wrong kind, unknown slot
    assert!(rig.request(MessageType::TaskStart, 0, &[]).is_empty());
    assert!(rig.request(MessageType::CircuitInfo, task, &[]).is_empty());
    assert!(rig.request(MessageType::TaskInfo, task + 1, &[]).is_empty());
    assert!(rig.request(MessageType::CreateTask, task, &[10, 0]).is_empty());
    assert_eq!(rig.link.dropped_requests(), 4);
    assert_eq!(rig.controller.task_ids().len(), 1);

    // stale handle after delete
    let ack = rig.request(MessageType::DeleteTask, task, &[]);
    assert!(result_of(&ack[0]).1);
    assert!(rig.request(MessageType::TaskInfo, task, &[]).is_empty());
}

#[test]
fn malformed_and_outbound_only_messages_are_dropped() {
    let mut rig = Rig::new();
    assert!(!rig.inbox.on_data(&[0; 11]));

    // unknown type
    let header = RequestHeader {
        msg_type: 99,
        request_id: 5,
        target: 0,
    };
    rig.inbox.on_data(&header.encode(&[]));
    rig.pump();
    assert!(rig.take_sent().is_empty());

    // a report is never a request
    assert!(rig.request(MessageType::MonitoringReport, 0, &[]).is_empty());

    // valid target, short payload
    let task = rig.create(MessageType::CreateTask, &[100, 0]);
    assert!(rig.request(MessageType::TaskSetInterval, task, &[]).is_empty());
}

#[test]
fn oversized_messages_and_full_inbox_are_dropped() {
    let mut rig = Rig::with_config(LinkConfig {
        inbound_capacity: 2,
        max_message_len: 16,
    });
    let ping = RequestHeader {
        msg_type: 0,
        request_id: 1,
        target: 0,
    };
    assert!(!rig.inbox.on_data(&ping.encode(&[0; 8])));
    assert!(rig.inbox.on_data(&ping.encode(&[])));
    assert!(rig.inbox.on_data(&ping.encode(&[])));
    assert!(!rig.inbox.on_data(&ping.encode(&[])));
    rig.pump();
    assert_eq!(rig.take_sent().len(), 2);
}

#[test]
fn task_commands_are_acked_when_applied() {
    let mut rig = Rig::new();
    let task = rig.create(MessageType::CreateTask, &[100, 0]);
    let circuit = rig.create(MessageType::CreateCircuit, &[0, 1]);

    assert!(rig.request(MessageType::TaskAddCircuit, task, &[circuit, u32::MAX]).is_empty());
    assert!(rig.request(MessageType::TaskSetInterval, task, &[0]).is_empty());
    assert!(rig.request(MessageType::TaskStart, task, &[]).is_empty());

    rig.tick();
    let acks: Vec<(u32, bool)> = rig.take_sent().iter().map(|f| result_of(f)).collect();
    assert_eq!(acks.len(), 3);
    assert!(acks[0].1);
    assert!(!acks[1].1, "zero interval is rejected");
    assert!(acks[2].1);

    let info = rig.ok(MessageType::TaskInfo, task, &[]);
    let mut r = Reader::new(&info);
    assert_eq!(r.u32("handle").unwrap(), task);
    assert_eq!(r.u32("interval").unwrap(), 100);
    assert_eq!(r.u32("offset").unwrap(), 0);
    assert_eq!(r.u32("runs").unwrap(), 1);
    r.u32("last cpu").unwrap();
    r.f32("avg cpu").unwrap();
    r.u32("last interval").unwrap();
    r.f32("avg interval").unwrap();
    r.u32("drift").unwrap();
    assert_eq!(r.u32("running").unwrap(), 1);
    assert_eq!(r.u32("circuit count").unwrap(), 1);
    assert_eq!(r.u32("circuit").unwrap(), circuit);
}

#[test]
fn wiring_over_the_link_runs_and_reports() {
    let mut rig = Rig::new();
    let task = rig.create(MessageType::CreateTask, &[10, 0]);
    let circuit = rig.create(MessageType::CreateCircuit, &[0, 1]);
    let acc = rig.create(
        MessageType::CreateFunction,
        &[LIB_ID_MATH_INT as u32, math_int::ADD as u32, 2, 1],
    );
    let neg = rig.create(
        MessageType::CreateFunction,
        &[LIB_ID_MATH as u32, math::SUB as u32, 2, 1],
    );

    rig.ok(MessageType::FunctionSetIoValue, acc, &[0, 1]);
    rig.ok(MessageType::FunctionConnectInput, acc, &[1, acc, 0, 0]);
    rig.ok(MessageType::FunctionConnectInput, neg, &[1, acc, 0, 0]);
    rig.ok(MessageType::CircuitAddFunction, circuit, &[acc, u32::MAX]);
    rig.ok(MessageType::CircuitAddFunction, circuit, &[neg, u32::MAX]);
    rig.ok(MessageType::CircuitConnectOutput, circuit, &[0, neg, 0]);
    rig.ok(MessageType::MonitoringEnable, acc, &[0]);
    rig.ok(MessageType::MonitoringEnable, neg, &[1]);

    // a second circuit cannot take an owned function
    let other = rig.create(MessageType::CreateCircuit, &[0, 0]);
    let refused = rig.request(MessageType::CircuitAddFunction, other, &[acc, 0]);
    assert!(!result_of(&refused[0]).1);

    // a connected input refuses literal writes
    let refused = rig.request(MessageType::FunctionSetIoValue, acc, &[1, 5]);
    assert!(!result_of(&refused[0]).1);

    rig.request(MessageType::TaskAddCircuit, task, &[circuit, u32::MAX]);
    rig.request(MessageType::TaskStart, task, &[]);
    rig.tick();

    let sent = rig.take_sent();
    // monitoring report comes before the acks flushed after the tick
    assert_eq!(sent.len(), 3);
    let (header, body) = ResponseHeader::decode(&sent[0]).unwrap();
    assert_eq!(header.msg_type, MessageType::MonitoringReport.as_u32());
    let items = decode_report(body).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].function, acc);
    assert_eq!(items[0].values.len(), 3);
    assert_eq!(items[0].values[2].as_i32(), 1);
    assert_eq!(items[1].function, neg);
    assert_eq!(items[1].values[2].as_f32(), -1.0);

    // one-shot monitoring drops out
    rig.clock.advance_ms(10);
    rig.tick();
    let sent = rig.take_sent();
    assert_eq!(sent.len(), 1);
    let (_, body) = ResponseHeader::decode(&sent[0]).unwrap();
    let items = decode_report(body).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].values[2].as_i32(), 2);

    // circuit info shows the output reference and the copied value
    let info = rig.ok(MessageType::CircuitInfo, circuit, &[]);
    let mut r = Reader::new(&info);
    assert_eq!(r.u32("handle").unwrap(), circuit);
    assert_eq!(r.u32("inputs").unwrap(), 0);
    assert_eq!(r.u32("outputs").unwrap(), 1);
    assert_eq!(r.u32("function count").unwrap(), 2);
    assert_eq!(r.u32("f0").unwrap(), acc);
    assert_eq!(r.u32("f1").unwrap(), neg);
    assert_eq!(r.u32("out fn").unwrap(), neg);
    assert_eq!(r.u32("out idx").unwrap(), 0);
    assert_eq!(r.f32("out value").unwrap(), -2.0);
}

#[test]
fn function_info_and_raw_data_access() {
    let mut rig = Rig::new();
    let add = rig.create(
        MessageType::CreateFunction,
        &[LIB_ID_MATH as u32, math::ADD as u32, 2, 1],
    );
    rig.ok(MessageType::SetMemData, add, &[4, 2.5f32.to_bits()]);
    let data = rig.ok(MessageType::GetMemData, add, &[4, 4]);
    assert_eq!(data, 2.5f32.to_le_bytes());

    let refused = rig.request(MessageType::GetMemData, add, &[8, 8]);
    assert!(!result_of(&refused[0]).1);

    let info = rig.ok(MessageType::FunctionInfo, add, &[]);
    let mut r = Reader::new(&info);
    assert_eq!(r.u32("handle").unwrap(), add);
    assert_eq!(r.u8("inputs").unwrap(), 2);
    assert_eq!(r.u8("outputs").unwrap(), 1);
    assert_eq!(r.u16("opcode").unwrap(), 0x0200);
    assert_eq!(r.u32("flags").unwrap(), 0);
    assert_eq!(r.u32("owner").unwrap(), 0);
    r.bytes(3 * 4, "values").unwrap();
    assert_eq!(r.bytes(3, "io flags").unwrap(), &[3, 3, 3]);
    r.bytes(2 * 8, "sources").unwrap();
    assert_eq!(r.u32("name len").unwrap(), 3);
    assert_eq!(r.rest(), b"ADD");
}

#[test]
fn unknown_catalog_entry_fails_creation() {
    let mut rig = Rig::new();
    let sent = rig.request(MessageType::CreateFunction, CONTROLLER_HANDLE_RAW, &[9, 0, 2, 1]);
    assert_eq!(sent.len(), 1);
    let (header, rest) = ResponseHeader::decode(&sent[0]).unwrap();
    assert!(!header.success());
    assert!(rest.is_empty());
}

#[test]
fn disconnected_link_sends_nothing() {
    let mut rig = Rig::new();
    rig.inbox.disconnected();
    rig.pump();
    assert!(!rig.link.is_connected());
    assert!(rig.request(MessageType::Ping, 0, &[]).is_empty());
    assert!(rig.link.monitoring_sink().is_none());
}

#[test]
fn inbox_feeds_the_link_from_another_thread() {
    let clock = ManualClock::new(0);
    let mut controller = Controller::new(
        Box::new(clock.clone()),
        Box::new(StaticProbe::new(SystemConfig::default())),
        SchedulerConfig::default(),
    );
    let mut link = Link::new(
        BufferTransport::default(),
        c32_library::standard_factory().unwrap(),
        Box::new(clock),
        LinkConfig::default(),
    );
    let mut inbox = link.take_inbox().unwrap();

    let producer = std::thread::spawn(move || {
        let ping = RequestHeader {
            msg_type: MessageType::Ping.as_u32(),
            request_id: 5,
            target: 0,
        };
        inbox.connected() && inbox.on_data(&ping.encode(&[]))
    });
    assert!(producer.join().unwrap());

    link.process(&mut controller);
    let sent = &link.transport().sent;
    assert_eq!(sent.len(), 2);
    let (hello, _) = ResponseHeader::decode(&sent[0]).unwrap();
    assert_eq!(hello.request_id, 0);
    let (reply, _) = ResponseHeader::decode(&sent[1]).unwrap();
    assert_eq!(reply.msg_type, MessageType::Ping.as_u32());
    assert_eq!(reply.request_id, 5);
}
