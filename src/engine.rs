//! The probe loop: send one echo request, wait for its reply with a bounded
//! deadline, report, signal the watchdog when healthy, pace, repeat.

use std::net::Ipv4Addr;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use crate::error::ProbeError;
use crate::event_handler::ProbeEventHandler;
use crate::heartbeat::Heartbeat;
use crate::ping::{
    build_echo_request, parse_echo_reply, Datagram, DestinationUnreachable, EchoReply, IcmpApi, IcmpResult, IcmpType,
};
use crate::settings::ProbeSettings;
use crate::watchdog::Liveness;

/// Result of one send/wait cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Reply { reply: EchoReply, rtt: Duration },
    Timeout,
    HostUnreachable { addr: Ipv4Addr, reason: Result<DestinationUnreachable, u8> },
    UnexpectedReply { addr: Ipv4Addr, icmp_type: u8, code: u8 },
}

/// Why the probe loop ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The watchdog stopped running, the probe is considered stalled.
    LivenessLost,
    /// Operator interrupt.
    Interrupted,
    /// The requested number of cycles was sent.
    Completed,
}

/// State of one probe session. The sequence counter belongs to the session,
/// so independent sessions never share numbering.
#[derive(Debug, Clone)]
pub struct PingSession {
    host: String,
    target: Ipv4Addr,
    identifier: u16,
    sequence: u16,
    alive: bool,
}

impl PingSession {
    pub fn new(host: impl Into<String>, target: Ipv4Addr, identifier: u16) -> Self {
        PingSession {
            host: host.into(),
            target,
            identifier,
            sequence: 0,
            alive: false,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn target(&self) -> Ipv4Addr {
        self.target
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    /// Sequence number of the most recent request, 0 before the first.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Whether the most recent cycle received its reply.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Build the next echo request. Sequence numbers start at 1 and go back
    /// to 1 after 65535.
    pub fn next_request(&mut self, payload: &[u8]) -> (u16, Vec<u8>) {
        self.sequence = self.sequence.checked_add(1).unwrap_or(1);
        (self.sequence, build_echo_request(self.sequence, self.identifier, payload))
    }

    fn owns(&self, identifier: u16, sequence: u16) -> bool {
        identifier == self.identifier && sequence == self.sequence
    }
}

/// Identifier for echo requests of this process.
pub fn process_identifier() -> u16 {
    std::process::id() as u16
}

pub struct PingEngine<A: IcmpApi, H: Heartbeat> {
    session: PingSession,
    api: A,
    heartbeat: H,
    settings: ProbeSettings,
}

impl<A: IcmpApi, H: Heartbeat> PingEngine<A, H> {
    pub fn new(session: PingSession, api: A, heartbeat: H, settings: ProbeSettings) -> Self {
        PingEngine {
            session,
            api,
            heartbeat,
            settings,
        }
    }

    pub fn session(&self) -> &PingSession {
        &self.session
    }

    /// Give back the transport and heartbeat sender.
    pub fn into_parts(self) -> (A, H) {
        (self.api, self.heartbeat)
    }

    /// Run cycles until the watchdog stops, the operator interrupts or the
    /// configured count is reached.
    pub fn run<L: Liveness + ?Sized, E: ProbeEventHandler + ?Sized>(
        &mut self,
        watchdog: &L,
        cancel: &Receiver<()>,
        handler: &mut E,
    ) -> Result<ProbeOutcome, ProbeError> {
        handler
            .on_start(self.session.host(), self.session.target(), self.settings.payload.len())
            .map_err(ProbeError::Output)?;

        let mut cycles = 0u32;
        let count = self.settings.count;
        let count_reached = |cycles: u32| count.is_some_and(|count| cycles >= count);
        let outcome = loop {
            if count_reached(cycles) {
                break ProbeOutcome::Completed;
            }
            match cancel.try_recv() {
                Ok(()) => break ProbeOutcome::Interrupted,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }
            if !watchdog.is_alive() {
                break ProbeOutcome::LivenessLost;
            }

            self.run_cycle(handler)?;
            cycles += 1;
            // no pause after the last cycle
            if count_reached(cycles) {
                break ProbeOutcome::Completed;
            }

            if self.pace(cancel) {
                break ProbeOutcome::Interrupted;
            }
        };

        log::debug!("probe loop ended after {} cycles: {:?}", cycles, outcome);
        handler.on_finished(outcome).map_err(ProbeError::Output)?;
        Ok(outcome)
    }

    /// Wait one interval. Returns true when an interrupt arrived meanwhile.
    fn pace(&self, cancel: &Receiver<()>) -> bool {
        match cancel.recv_timeout(self.settings.interval) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                // nobody can interrupt any more, keep the cadence anyway
                std::thread::sleep(self.settings.interval);
                false
            }
        }
    }

    /// One SEND, WAIT_REPLY, REPORT cycle. Network conditions end up in the
    /// returned outcome; only a failed send is an error.
    pub fn run_cycle<E: ProbeEventHandler + ?Sized>(&mut self, handler: &mut E) -> Result<CycleOutcome, ProbeError> {
        let (sequence, packet) = self.session.next_request(&self.settings.payload);
        let sent_at = Instant::now();
        self.api.send(&packet).map_err(ProbeError::Transmission)?;
        handler.on_sent(sequence, packet.len()).map_err(ProbeError::Output)?;

        let outcome = self.wait_reply(sent_at)?;

        self.session.alive = matches!(outcome, CycleOutcome::Reply { .. });
        if self.session.alive {
            if let Err(err) = self.heartbeat.signal() {
                // the watchdog notices the silence on its own
                log::warn!("failed to signal watchdog: {}", err);
            }
        }
        handler.on_outcome(sequence, &outcome).map_err(ProbeError::Output)?;
        Ok(outcome)
    }

    fn wait_reply(&mut self, sent_at: Instant) -> Result<CycleOutcome, ProbeError> {
        let deadline = sent_at + self.settings.timeout;
        loop {
            let time_left = deadline.saturating_duration_since(Instant::now());
            match self.api.recv(time_left).map_err(ProbeError::Receive)? {
                IcmpResult::Timeout => return Ok(CycleOutcome::Timeout),
                IcmpResult::Interrupted => {}
                IcmpResult::Datagram(datagram) => {
                    if let Some(outcome) = self.classify(datagram, sent_at) {
                        return Ok(outcome);
                    }
                }
            }
            if Instant::now() >= deadline {
                return Ok(CycleOutcome::Timeout);
            }
        }
    }

    /// Decide what a received datagram means for the outstanding request.
    /// `None` means it is unrelated and the wait continues.
    fn classify(&self, datagram: Datagram, sent_at: Instant) -> Option<CycleOutcome> {
        let reply = match parse_echo_reply(&datagram.data, datagram.addr) {
            Ok(reply) => reply,
            Err(err) => {
                log::warn!(
                    "discarding malformed datagram from {}: {} [{}]",
                    datagram.addr,
                    err,
                    hex::encode(&datagram.data)
                );
                return None;
            }
        };

        match &reply.icmp_type {
            IcmpType::EchoReply => {
                if !self.session.owns(reply.identifier, reply.sequence) {
                    log::debug!(
                        "ignoring echo reply id={} seq={} from {}, waiting for seq={}",
                        reply.identifier,
                        reply.sequence,
                        reply.addr,
                        self.session.sequence()
                    );
                    return None;
                }
                if !reply.checksum_valid() {
                    log::warn!("discarding echo reply seq={} with bad checksum", reply.sequence);
                    return None;
                }
                let rtt = datagram.time.saturating_duration_since(sent_at);
                Some(CycleOutcome::Reply { reply, rtt })
            }
            // our own request looped back on a raw socket
            IcmpType::EchoRequest => None,
            _ if self.quotes_foreign_request(&reply) => {
                log::debug!("ignoring ICMP type {} from {} for another request", reply.icmp_type.as_u8(), reply.addr);
                None
            }
            IcmpType::DestinationUnreachable(reason) => {
                log::debug!("destination unreachable from {}", reply.addr);
                Some(CycleOutcome::HostUnreachable {
                    addr: reply.addr,
                    reason: reason.clone(),
                })
            }
            IcmpType::Other(icmp_type) => Some(CycleOutcome::UnexpectedReply {
                addr: reply.addr,
                icmp_type: *icmp_type,
                code: reply.code,
            }),
        }
    }

    /// ICMP errors quote the IP header and first 8 bytes of the datagram that
    /// caused them. True when that quote is an echo request of someone else.
    fn quotes_foreign_request(&self, reply: &EchoReply) -> bool {
        match parse_echo_reply(&reply.payload, reply.addr) {
            Ok(quoted) => {
                quoted.icmp_type != IcmpType::EchoRequest || !self.session.owns(quoted.identifier, quoted.sequence)
            }
            // too little quoted to tell, attribute it to the outstanding request
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ping::tests::{echo_reply_message, ipv4_datagram};
    use crate::ping::{checksum, ICMP_DESTINATION_UNREACHABLE, ICMP_ECHO_REPLY};
    use crate::heartbeat::HeartbeatSender;
    use crate::watchdog::{LivenessOutcome, WatchdogMonitor};
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::net::SocketAddr;
    use std::sync::mpsc;

    /// How the scripted network answers one request.
    #[derive(Clone, Copy)]
    enum Answer {
        Reply,
        CorruptReply,
        Silence,
        Unreachable,
        StrayThenReply,
        Garbage,
        TimeExceeded,
        ForeignUnreachable,
        FailSend,
    }

    struct ScriptedApi {
        script: VecDeque<Answer>,
        pending: VecDeque<IcmpResult>,
        sent: Vec<Vec<u8>>,
    }

    impl ScriptedApi {
        fn new(script: &[Answer]) -> Self {
            ScriptedApi {
                script: script.iter().copied().collect(),
                pending: VecDeque::new(),
                sent: Vec::new(),
            }
        }

        fn deliver(&mut self, icmp: &[u8]) {
            self.pending.push_back(IcmpResult::Datagram(Datagram {
                addr: Ipv4Addr::LOCALHOST,
                data: ipv4_datagram(5, 64, icmp),
                time: Instant::now() + Duration::from_millis(2),
            }));
        }

        fn error_quoting(&mut self, icmp_type: u8, code: u8, request: &[u8]) {
            let mut message = vec![icmp_type, code, 0, 0, 0, 0, 0, 0];
            message.extend_from_slice(&ipv4_datagram(5, 64, &request[..8]));
            let sum = checksum(&message);
            message[2..4].copy_from_slice(&sum.to_be_bytes());
            self.deliver(&message);
        }
    }

    fn header_fields(packet: &[u8]) -> (u16, u16) {
        (u16::from_be_bytes([packet[4], packet[5]]), u16::from_be_bytes([packet[6], packet[7]]))
    }

    impl IcmpApi for ScriptedApi {
        fn send(&mut self, packet: &[u8]) -> Result<(), std::io::Error> {
            let answer = self.script.pop_front().unwrap_or(Answer::Silence);
            if let Answer::FailSend = answer {
                return Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "sendto"));
            }
            self.sent.push(packet.to_vec());
            let (identifier, sequence) = header_fields(packet);
            let payload = &packet[8..];
            match answer {
                Answer::Reply => self.deliver(&echo_reply_message(identifier, sequence, payload)),
                Answer::CorruptReply => {
                    let mut message = echo_reply_message(identifier, sequence, payload);
                    let last = message.len() - 1;
                    message[last] ^= 0x01;
                    self.deliver(&message);
                }
                Answer::StrayThenReply => {
                    self.deliver(&echo_reply_message(identifier, sequence.wrapping_sub(1), payload));
                    self.deliver(&echo_reply_message(identifier.wrapping_add(1), sequence, payload));
                    self.deliver(packet);
                    self.deliver(&echo_reply_message(identifier, sequence, payload));
                }
                Answer::Unreachable => self.error_quoting(ICMP_DESTINATION_UNREACHABLE, 1, packet),
                Answer::TimeExceeded => self.error_quoting(11, 0, packet),
                Answer::ForeignUnreachable => {
                    let foreign = build_echo_request(sequence, identifier.wrapping_add(7), payload);
                    self.error_quoting(ICMP_DESTINATION_UNREACHABLE, 1, &foreign);
                }
                Answer::Garbage => self.pending.push_back(IcmpResult::Datagram(Datagram {
                    addr: Ipv4Addr::LOCALHOST,
                    data: vec![0x45, 0, 0],
                    time: Instant::now(),
                })),
                Answer::Silence | Answer::FailSend => {}
            }
            Ok(())
        }

        fn recv(&mut self, _timeout: Duration) -> Result<IcmpResult, std::io::Error> {
            Ok(self.pending.pop_front().unwrap_or(IcmpResult::Timeout))
        }
    }

    #[derive(Default)]
    struct CountingHeartbeat {
        signals: u32,
    }

    impl Heartbeat for CountingHeartbeat {
        fn signal(&mut self) -> std::io::Result<()> {
            self.signals += 1;
            Ok(())
        }
    }

    /// Reports alive for a fixed number of checks.
    struct AliveFor(Cell<u32>);

    impl Liveness for AliveFor {
        fn is_alive(&self) -> bool {
            let left = self.0.get();
            self.0.set(left.saturating_sub(1));
            left > 0
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ProbeEventHandler for Recorder {
        fn on_start(&mut self, host: &str, addr: Ipv4Addr, payload_length: usize) -> std::io::Result<()> {
            self.events.push(format!("start {} {} {}", host, addr, payload_length));
            Ok(())
        }

        fn on_sent(&mut self, sequence: u16, length: usize) -> std::io::Result<()> {
            self.events.push(format!("sent {} {}", sequence, length));
            Ok(())
        }

        fn on_outcome(&mut self, sequence: u16, outcome: &CycleOutcome) -> std::io::Result<()> {
            let name = match outcome {
                CycleOutcome::Reply { .. } => "reply",
                CycleOutcome::Timeout => "timeout",
                CycleOutcome::HostUnreachable { .. } => "unreachable",
                CycleOutcome::UnexpectedReply { .. } => "unexpected",
            };
            self.events.push(format!("{} {}", name, sequence));
            Ok(())
        }

        fn on_finished(&mut self, outcome: ProbeOutcome) -> std::io::Result<()> {
            self.events.push(format!("finished {:?}", outcome));
            Ok(())
        }
    }

    fn fast_settings(count: Option<u32>) -> ProbeSettings {
        ProbeSettings {
            interval: Duration::from_millis(1),
            timeout: Duration::from_millis(20),
            count,
            ..ProbeSettings::default()
        }
    }

    fn engine(script: &[Answer], count: Option<u32>) -> PingEngine<ScriptedApi, CountingHeartbeat> {
        PingEngine::new(
            PingSession::new("localhost", Ipv4Addr::LOCALHOST, 0x1234),
            ScriptedApi::new(script),
            CountingHeartbeat::default(),
            fast_settings(count),
        )
    }

    #[test]
    fn sequence_numbers_count_up_from_one() {
        let mut session = PingSession::new("localhost", Ipv4Addr::LOCALHOST, 9);
        let sequences: Vec<u16> = (0..5).map(|_| session.next_request(b"x").0).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
        let (sequence, packet) = session.next_request(b"x");
        assert_eq!(header_fields(&packet), (9, sequence));
    }

    #[test]
    fn sequence_skips_zero_after_wrapping() {
        let mut session = PingSession::new("localhost", Ipv4Addr::LOCALHOST, 9);
        session.sequence = u16::MAX - 1;
        assert_eq!(session.next_request(b"x").0, u16::MAX);
        assert_eq!(session.next_request(b"x").0, 1);
        assert_eq!(session.next_request(b"x").0, 2);
    }

    #[test]
    fn sessions_do_not_share_counters() {
        let mut first = PingSession::new("a", Ipv4Addr::LOCALHOST, 1);
        let mut second = PingSession::new("b", Ipv4Addr::LOCALHOST, 2);
        first.next_request(b"");
        first.next_request(b"");
        assert_eq!(second.next_request(b"").0, 1);
        assert_eq!(first.sequence(), 2);
    }

    #[test]
    fn matched_reply_signals_watchdog_once() {
        let mut engine = engine(&[Answer::Reply], None);
        let mut recorder = Recorder::default();
        let outcome = engine.run_cycle(&mut recorder).unwrap();
        match outcome {
            CycleOutcome::Reply { reply, rtt } => {
                assert_eq!(reply.sequence, 1);
                assert_eq!(reply.ttl, 64);
                assert_eq!(reply.payload.len(), 11);
                assert!(rtt >= Duration::from_millis(2));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(engine.session().is_alive());
        let (api, heartbeat) = engine.into_parts();
        assert_eq!(heartbeat.signals, 1);
        assert_eq!(api.sent.len(), 1);
        assert_eq!(recorder.events, vec!["sent 1 19", "reply 1"]);
    }

    #[test]
    fn timeout_sends_no_heartbeat() {
        let mut engine = engine(&[Answer::Reply, Answer::Silence], None);
        let mut recorder = Recorder::default();
        engine.run_cycle(&mut recorder).unwrap();
        assert_eq!(engine.run_cycle(&mut recorder).unwrap(), CycleOutcome::Timeout);
        assert!(!engine.session().is_alive());
        assert_eq!(engine.into_parts().1.signals, 1);
    }

    #[test]
    fn stray_replies_and_looped_requests_are_skipped() {
        let mut engine = engine(&[Answer::StrayThenReply], None);
        let outcome = engine.run_cycle(&mut Recorder::default()).unwrap();
        assert!(matches!(outcome, CycleOutcome::Reply { ref reply, .. } if reply.sequence == 1 && reply.identifier == 0x1234));
        assert_eq!(engine.into_parts().1.signals, 1);
    }

    #[test]
    fn destination_unreachable_is_reported_without_heartbeat() {
        let mut engine = engine(&[Answer::Unreachable], None);
        let outcome = engine.run_cycle(&mut Recorder::default()).unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::HostUnreachable {
                addr: Ipv4Addr::LOCALHOST,
                reason: Ok(DestinationUnreachable::HostUnreachable),
            }
        );
        assert!(!engine.session().is_alive());
        assert_eq!(engine.into_parts().1.signals, 0);
    }

    #[test]
    fn other_icmp_types_are_unexpected() {
        let mut engine = engine(&[Answer::TimeExceeded], None);
        let outcome = engine.run_cycle(&mut Recorder::default()).unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::UnexpectedReply {
                addr: Ipv4Addr::LOCALHOST,
                icmp_type: 11,
                code: 0,
            }
        );
    }

    #[test]
    fn errors_for_other_requests_are_ignored() {
        let mut engine = engine(&[Answer::ForeignUnreachable], None);
        assert_eq!(engine.run_cycle(&mut Recorder::default()).unwrap(), CycleOutcome::Timeout);
    }

    #[test]
    fn reply_with_bad_checksum_is_discarded() {
        let mut engine = engine(&[Answer::CorruptReply], None);
        assert_eq!(engine.run_cycle(&mut Recorder::default()).unwrap(), CycleOutcome::Timeout);
        assert!(!engine.session().is_alive());
        assert_eq!(engine.into_parts().1.signals, 0);
    }

    #[test]
    fn malformed_datagram_is_not_fatal() {
        let mut engine = engine(&[Answer::Garbage, Answer::Reply], None);
        let mut recorder = Recorder::default();
        assert_eq!(engine.run_cycle(&mut recorder).unwrap(), CycleOutcome::Timeout);
        assert!(matches!(engine.run_cycle(&mut recorder).unwrap(), CycleOutcome::Reply { .. }));
    }

    #[test]
    fn failed_send_aborts() {
        let mut engine = engine(&[Answer::Reply, Answer::FailSend], None);
        let (_tx, rx) = mpsc::channel();
        let result = engine.run(&AliveFor(Cell::new(100)), &rx, &mut Recorder::default());
        assert!(matches!(result, Err(ProbeError::Transmission(_))));
    }

    #[test]
    fn silent_target_never_signals() {
        let mut engine = engine(&[], None);
        let (_tx, rx) = mpsc::channel();
        let mut recorder = Recorder::default();
        let outcome = engine.run(&AliveFor(Cell::new(12)), &rx, &mut recorder).unwrap();
        assert_eq!(outcome, ProbeOutcome::LivenessLost);
        assert_eq!(engine.session().sequence(), 12);
        assert_eq!(engine.into_parts().1.signals, 0);
        assert_eq!(recorder.events.last().unwrap(), "finished LivenessLost");
    }

    #[test]
    fn reply_every_other_cycle_signals_every_other_cycle() {
        let script: Vec<Answer> = (0..10)
            .map(|cycle| if cycle % 2 == 0 { Answer::Reply } else { Answer::Silence })
            .collect();
        let mut engine = engine(&script, Some(10));
        let (_tx, rx) = mpsc::channel();
        let outcome = engine.run(&AliveFor(Cell::new(100)), &rx, &mut Recorder::default()).unwrap();
        assert_eq!(outcome, ProbeOutcome::Completed);
        let (api, heartbeat) = engine.into_parts();
        assert_eq!(api.sent.len(), 10);
        assert_eq!(heartbeat.signals, 5);
    }

    #[test]
    fn sent_requests_carry_consecutive_sequences() {
        let mut engine = engine(&[Answer::Reply; 4], Some(4));
        let (_tx, rx) = mpsc::channel();
        engine.run(&AliveFor(Cell::new(100)), &rx, &mut Recorder::default()).unwrap();
        let (api, _) = engine.into_parts();
        let sequences: Vec<u16> = api.sent.iter().map(|packet| header_fields(packet).1).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4]);
        assert!(api.sent.iter().all(|packet| checksum(packet) == 0 && packet[0] != ICMP_ECHO_REPLY));
    }

    #[test]
    fn silent_target_trips_real_watchdog() {
        let monitor = WatchdogMonitor::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).unwrap();
        let addr = monitor.local_addr();
        let watchdog = monitor.spawn(3, Duration::from_millis(10)).unwrap();
        let mut engine = PingEngine::new(
            PingSession::new("localhost", Ipv4Addr::LOCALHOST, 0x4321),
            ScriptedApi::new(&[Answer::Reply, Answer::Reply]),
            HeartbeatSender::connect(addr).unwrap(),
            fast_settings(None),
        );
        let (_tx, rx) = mpsc::channel();
        let outcome = engine.run(&watchdog, &rx, &mut Recorder::default()).unwrap();
        assert_eq!(outcome, ProbeOutcome::LivenessLost);
        assert!(engine.session().sequence() >= 3);
        assert_eq!(watchdog.shutdown().unwrap(), LivenessOutcome::LivenessLost);
    }

    #[test]
    fn zero_count_sends_nothing() {
        let mut engine = engine(&[Answer::Reply], Some(0));
        let (_tx, rx) = mpsc::channel();
        let mut recorder = Recorder::default();
        let outcome = engine.run(&AliveFor(Cell::new(100)), &rx, &mut recorder).unwrap();
        assert_eq!(outcome, ProbeOutcome::Completed);
        assert_eq!(recorder.events, vec!["start localhost 127.0.0.1 11", "finished Completed"]);
        assert!(engine.into_parts().0.sent.is_empty());
    }

    #[test]
    fn pending_interrupt_stops_before_sending() {
        let mut engine = engine(&[], None);
        let (tx, rx) = mpsc::channel();
        tx.send(()).unwrap();
        let mut recorder = Recorder::default();
        let outcome = engine.run(&AliveFor(Cell::new(100)), &rx, &mut recorder).unwrap();
        assert_eq!(outcome, ProbeOutcome::Interrupted);
        assert_eq!(recorder.events, vec!["start localhost 127.0.0.1 11", "finished Interrupted"]);
        assert!(engine.into_parts().0.sent.is_empty());
    }

    #[test]
    fn interrupt_cuts_pacing_short() {
        let mut engine = PingEngine::new(
            PingSession::new("localhost", Ipv4Addr::LOCALHOST, 1),
            ScriptedApi::new(&[Answer::Reply]),
            CountingHeartbeat::default(),
            ProbeSettings {
                interval: Duration::from_secs(60),
                timeout: Duration::from_millis(10),
                ..ProbeSettings::default()
            },
        );
        let (tx, rx) = mpsc::channel();
        let interrupter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            tx.send(()).unwrap();
        });
        let started = Instant::now();
        let outcome = engine.run(&AliveFor(Cell::new(100)), &rx, &mut Recorder::default()).unwrap();
        interrupter.join().unwrap();
        assert_eq!(outcome, ProbeOutcome::Interrupted);
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
