use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::args::Args;
use crate::watchdog::{DEFAULT_BUDGET, DEFAULT_TICK, DEFAULT_WATCHDOG_PORT};

pub const DEFAULT_PAYLOAD: &[u8] = b"Hello world";

/// Runtime parameters of the probe loop.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Pause after every cycle
    pub interval: Duration,
    /// Deadline for the reply, counted from the send
    pub timeout: Duration,
    pub count: Option<u32>,
    pub payload: Vec<u8>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        ProbeSettings {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(1),
            count: None,
            payload: DEFAULT_PAYLOAD.to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatchdogSettings {
    pub addr: SocketAddr,
    pub budget: u32,
    pub tick: Duration,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        WatchdogSettings {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_WATCHDOG_PORT)),
            budget: DEFAULT_BUDGET,
            tick: DEFAULT_TICK,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub probe: ProbeSettings,
    pub watchdog: WatchdogSettings,
}

impl From<&Args> for Settings {
    fn from(args: &Args) -> Self {
        Settings {
            probe: ProbeSettings {
                interval: args.interval,
                timeout: args.timeout,
                count: args.count,
                payload: args.payload.as_bytes().to_vec(),
            },
            watchdog: WatchdogSettings {
                addr: SocketAddr::from((Ipv4Addr::LOCALHOST, args.watchdog_port)),
                budget: args.watchdog_budget,
                tick: args.watchdog_tick,
            },
        }
    }
}
