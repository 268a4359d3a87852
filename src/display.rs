use std::io::Write;
use std::net::Ipv4Addr;

use crate::engine::{CycleOutcome, ProbeOutcome};
use crate::event_handler::ProbeEventHandler;
use crate::ping::unreachable_to_string;

/// Classic ping output, one line per cycle.
pub struct ClassicDisplay<W: Write> {
    out: W,
    host: String,
}

impl<W: Write> ClassicDisplay<W> {
    pub fn new(out: W) -> Self {
        ClassicDisplay {
            out,
            host: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl ClassicDisplay<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

fn milliseconds(duration: std::time::Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

impl<W: Write> ProbeEventHandler for ClassicDisplay<W> {
    fn on_start(&mut self, host: &str, addr: Ipv4Addr, payload_length: usize) -> std::io::Result<()> {
        self.host = host.to_owned();
        writeln!(self.out, "PING {} ({}) {} data bytes", host, addr, payload_length)?;
        self.out.flush()
    }

    fn on_sent(&mut self, _sequence: u16, _length: usize) -> std::io::Result<()> {
        Ok(())
    }

    fn on_outcome(&mut self, _sequence: u16, outcome: &CycleOutcome) -> std::io::Result<()> {
        match outcome {
            CycleOutcome::Reply { reply, rtt } => writeln!(
                self.out,
                "{} bytes from {} icmp_seq={} ttl={} time={:.3} ms",
                reply.payload.len(),
                reply.addr,
                reply.sequence,
                reply.ttl,
                milliseconds(*rtt)
            )?,
            CycleOutcome::Timeout => writeln!(self.out, "Request timed out")?,
            CycleOutcome::HostUnreachable { addr, reason } => {
                log::info!("{} reports {}", addr, unreachable_to_string(reason));
                writeln!(self.out, "Host {} unreachable", self.host)?
            }
            CycleOutcome::UnexpectedReply { addr, icmp_type, code } => writeln!(
                self.out,
                "Unexpected ICMP type {} code {} from {}",
                icmp_type, code, addr
            )?,
        }
        self.out.flush()
    }

    fn on_finished(&mut self, outcome: ProbeOutcome) -> std::io::Result<()> {
        match outcome {
            ProbeOutcome::LivenessLost => writeln!(self.out, "server {} cannot be reached.", self.host)?,
            ProbeOutcome::Interrupted => writeln!(self.out, "Ping stopped, closing program")?,
            ProbeOutcome::Completed => {}
        }
        self.out.flush()
    }
}
