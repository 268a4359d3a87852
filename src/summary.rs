use std::fmt::Write;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use serde_derive::Serialize;
use serde_with::{serde_as, DurationSecondsWithFrac};

use crate::engine::{CycleOutcome, ProbeOutcome};
use crate::event_handler::ProbeEventHandler;

/// Session statistics, collected from the probe events.
#[serde_as]
#[derive(Serialize, Debug, Default, Clone)]
pub struct Summary {
    pub packets_transmitted: u64,
    pub packets_received: u64,
    /// Destination unreachable and other unexpected ICMP answers
    pub errors: u64,
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64>>")]
    pub minimum_rtt: Option<Duration>,
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64>>")]
    pub maximum_rtt: Option<Duration>,
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64>>")]
    pub average_rtt: Option<Duration>,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub total_time: Duration,
    #[serde(skip)]
    started: Option<Instant>,
    #[serde(skip)]
    rtt_sum: Duration,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_rtt(&mut self, rtt: Duration) {
        self.packets_received += 1;
        self.rtt_sum += rtt;
        self.minimum_rtt = Some(self.minimum_rtt.map_or(rtt, |min| min.min(rtt)));
        self.maximum_rtt = Some(self.maximum_rtt.map_or(rtt, |max| max.max(rtt)));
        let average = self.rtt_sum.as_nanos() / u128::from(self.packets_received);
        self.average_rtt = Some(Duration::from_nanos(u64::try_from(average).unwrap_or(u64::MAX)));
    }

    pub fn packet_loss(&self) -> Option<f64> {
        (self.packets_transmitted > 0)
            .then(|| 100.0 - (self.packets_received as f64 / self.packets_transmitted as f64 * 100.0))
    }

    pub fn as_text(&self) -> Result<String, std::fmt::Error> {
        let mut result = String::new();
        write!(
            &mut result,
            "{} packets transmitted, {} packets received",
            self.packets_transmitted, self.packets_received
        )?;
        if let Some(loss) = self.packet_loss() {
            write!(&mut result, ", {:.1}% packet loss", loss)?;
        }
        if self.errors > 0 {
            write!(&mut result, ", {} errors", self.errors)?;
        }
        write!(&mut result, ", time {:?}", self.total_time)?;
        if let (Some(min), Some(avg), Some(max)) = (self.minimum_rtt, self.average_rtt, self.maximum_rtt) {
            write!(&mut result, "\nround-trip min/avg/max = {:?}/{:?}/{:?}", min, avg, max)?;
        }
        writeln!(result)?;
        Ok(result)
    }

    pub fn as_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn as_csv(&self) -> Result<String, std::fmt::Error> {
        let nanos = |rtt: Option<Duration>| rtt.map_or(String::new(), |d| d.as_nanos().to_string());
        let mut result = String::new();
        write!(
            &mut result,
            "{},{},{},{},{},{},{}",
            self.packets_transmitted,
            self.packets_received,
            self.errors,
            nanos(self.minimum_rtt),
            nanos(self.average_rtt),
            nanos(self.maximum_rtt),
            self.total_time.as_nanos()
        )?;
        Ok(result)
    }
}

impl ProbeEventHandler for Summary {
    fn on_start(&mut self, _host: &str, _addr: Ipv4Addr, _payload_length: usize) -> std::io::Result<()> {
        self.started = Some(Instant::now());
        Ok(())
    }

    fn on_sent(&mut self, _sequence: u16, _length: usize) -> std::io::Result<()> {
        self.packets_transmitted += 1;
        Ok(())
    }

    fn on_outcome(&mut self, _sequence: u16, outcome: &CycleOutcome) -> std::io::Result<()> {
        match outcome {
            CycleOutcome::Reply { rtt, .. } => self.record_rtt(*rtt),
            CycleOutcome::Timeout => {}
            CycleOutcome::HostUnreachable { .. } | CycleOutcome::UnexpectedReply { .. } => self.errors += 1,
        }
        Ok(())
    }

    fn on_finished(&mut self, _outcome: ProbeOutcome) -> std::io::Result<()> {
        if let Some(started) = self.started {
            self.total_time = started.elapsed();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ping::tests::{echo_reply_message, ipv4_datagram};
    use crate::ping::parse_echo_reply;

    fn reply(sequence: u16, rtt_ms: u64) -> CycleOutcome {
        let datagram = ipv4_datagram(5, 64, &echo_reply_message(1, sequence, b"Hello world"));
        CycleOutcome::Reply {
            reply: parse_echo_reply(&datagram, Ipv4Addr::LOCALHOST).unwrap(),
            rtt: Duration::from_millis(rtt_ms),
        }
    }

    fn collect(outcomes: &[CycleOutcome]) -> Summary {
        let mut summary = Summary::new();
        summary.on_start("localhost", Ipv4Addr::LOCALHOST, 11).unwrap();
        for (index, outcome) in outcomes.iter().enumerate() {
            let sequence = index as u16 + 1;
            summary.on_sent(sequence, 19).unwrap();
            summary.on_outcome(sequence, outcome).unwrap();
        }
        summary.on_finished(ProbeOutcome::Completed).unwrap();
        summary
    }

    #[test]
    fn statistics_over_mixed_outcomes() {
        let summary = collect(&[
            reply(1, 10),
            CycleOutcome::Timeout,
            reply(3, 30),
            CycleOutcome::UnexpectedReply {
                addr: Ipv4Addr::LOCALHOST,
                icmp_type: 11,
                code: 0,
            },
        ]);
        assert_eq!(summary.packets_transmitted, 4);
        assert_eq!(summary.packets_received, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.minimum_rtt, Some(Duration::from_millis(10)));
        assert_eq!(summary.maximum_rtt, Some(Duration::from_millis(30)));
        assert_eq!(summary.average_rtt, Some(Duration::from_millis(20)));
        assert_eq!(summary.packet_loss(), Some(50.0));
    }

    #[test]
    fn average_survives_more_than_u32_replies() {
        let mut summary = Summary::new();
        summary.packets_received = u64::from(u32::MAX);
        summary.rtt_sum = Duration::from_nanos(u64::from(u32::MAX) * 10);
        summary.record_rtt(Duration::from_nanos(10));
        assert_eq!(summary.packets_received, 1 << 32);
        assert_eq!(summary.average_rtt, Some(Duration::from_nanos(10)));
    }

    #[test]
    fn text_without_replies_has_no_rtt_line() {
        let summary = collect(&[CycleOutcome::Timeout, CycleOutcome::Timeout]);
        let text = summary.as_text().unwrap();
        assert!(text.starts_with("2 packets transmitted, 0 packets received, 100.0% packet loss, time "));
        assert!(!text.contains("round-trip"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn text_with_replies() {
        let text = collect(&[reply(1, 4)]).as_text().unwrap();
        assert!(text.contains("0.0% packet loss"));
        assert!(text.contains("\nround-trip min/avg/max = 4ms/4ms/4ms\n"));
    }

    #[test]
    fn json_uses_fractional_seconds() {
        let json: serde_json::Value = serde_json::from_str(&collect(&[reply(1, 250)]).as_json().unwrap()).unwrap();
        assert_eq!(json["packets_transmitted"], 1);
        assert_eq!(json["packets_received"], 1);
        assert_eq!(json["minimum_rtt"], 0.25);
        assert!(json["total_time"].is_f64());
        assert!(json.get("started").is_none());

        let json: serde_json::Value = serde_json::from_str(&Summary::new().as_json().unwrap()).unwrap();
        assert!(json["average_rtt"].is_null());
    }

    #[test]
    fn csv_leaves_missing_rtts_empty() {
        let mut summary = collect(&[reply(1, 1), reply(2, 3)]);
        summary.total_time = Duration::from_secs(2);
        assert_eq!(summary.as_csv().unwrap(), "2,2,0,1000000,2000000,3000000,2000000000");

        let mut summary = Summary::new();
        summary.packets_transmitted = 3;
        assert_eq!(summary.as_csv().unwrap(), "3,0,0,,,,0");
    }
}
