use std::net::Ipv4Addr;

use crate::engine::{CycleOutcome, ProbeOutcome};

/// Receives the events of a probe session, one call per step of the cycle.
pub trait ProbeEventHandler {
    fn on_start(&mut self, host: &str, addr: Ipv4Addr, payload_length: usize) -> std::io::Result<()>;

    fn on_sent(&mut self, sequence: u16, length: usize) -> std::io::Result<()>;

    fn on_outcome(&mut self, sequence: u16, outcome: &CycleOutcome) -> std::io::Result<()>;

    fn on_finished(&mut self, outcome: ProbeOutcome) -> std::io::Result<()>;
}

/// Forwards every event to both handlers, left first.
impl<A: ProbeEventHandler, B: ProbeEventHandler> ProbeEventHandler for (A, B) {
    fn on_start(&mut self, host: &str, addr: Ipv4Addr, payload_length: usize) -> std::io::Result<()> {
        self.0.on_start(host, addr, payload_length)?;
        self.1.on_start(host, addr, payload_length)
    }

    fn on_sent(&mut self, sequence: u16, length: usize) -> std::io::Result<()> {
        self.0.on_sent(sequence, length)?;
        self.1.on_sent(sequence, length)
    }

    fn on_outcome(&mut self, sequence: u16, outcome: &CycleOutcome) -> std::io::Result<()> {
        self.0.on_outcome(sequence, outcome)?;
        self.1.on_outcome(sequence, outcome)
    }

    fn on_finished(&mut self, outcome: ProbeOutcome) -> std::io::Result<()> {
        self.0.on_finished(outcome)?;
        self.1.on_finished(outcome)
    }
}
