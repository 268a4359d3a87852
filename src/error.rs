//! Error types for the probe, the packet codec and the watchdog.
//!
//! Only [`ProbeError`] terminates the program. [`ParseError`] describes a single
//! malformed datagram and is absorbed into the cycle's report, and
//! [`WatchdogError`] ends the watchdog thread, which the probe then observes as
//! a lost liveness signal.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to create socket: {0}")]
    SocketCreation(#[source] std::io::Error),

    #[error("Failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No IPv4 address found for {0}")]
    NoIpv4Address(String),

    #[error("Failed to send packet: {0}")]
    Transmission(#[source] std::io::Error),

    #[error("Failed to receive packet: {0}")]
    Receive(#[source] std::io::Error),

    #[error("Failed to write output: {0}")]
    Output(#[source] std::io::Error),

    #[error("Failed to connect to watchdog: {0}")]
    Heartbeat(#[source] std::io::Error),

    #[error("Failed to install interrupt handler: {0}")]
    Interrupt(#[from] ctrlc::Error),

    #[error(transparent)]
    Watchdog(#[from] WatchdogError),
}

/// Reasons a received datagram can not be decoded as IPv4 + ICMP.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("datagram of {length} bytes is shorter than the {required} bytes required")]
    Truncated { length: usize, required: usize },

    #[error("invalid IP header length field {0}")]
    InvalidHeaderLength(u8),

    #[error("IP protocol {0} is not ICMP")]
    NotIcmp(u8),
}

#[derive(Error, Debug)]
pub enum WatchdogError {
    #[error("Failed to listen for heartbeats on {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to accept heartbeat connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error("Heartbeat channel failed: {0}")]
    Channel(#[source] std::io::Error),

    #[error("Failed to start watchdog thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Watchdog thread panicked")]
    Panicked,
}
