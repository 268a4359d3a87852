//! The one-directional TCP stream the probe uses to tell the watchdog it is
//! still making progress. Only the presence of bytes matters.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};

/// Token written for every healthy probe cycle.
pub const HEARTBEAT_TOKEN: &[u8; 4] = b"ping";

/// Anything that can carry a liveness signal to the watchdog.
pub trait Heartbeat {
    fn signal(&mut self) -> std::io::Result<()>;
}

/// Probe side of the heartbeat channel.
pub struct HeartbeatSender {
    stream: TcpStream,
}

impl HeartbeatSender {
    pub fn connect(addr: SocketAddr) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(HeartbeatSender { stream })
    }
}

impl Heartbeat for HeartbeatSender {
    fn signal(&mut self) -> std::io::Result<()> {
        self.stream.write_all(HEARTBEAT_TOKEN)
    }
}

/// Something the watchdog can check for a signal once per tick.
pub trait SignalSource {
    /// Returns whether any signal arrived since the last check, without
    /// blocking.
    fn poll_signal(&mut self) -> std::io::Result<bool>;
}

/// Watchdog side of the heartbeat channel.
pub struct HeartbeatChannel {
    stream: TcpStream,
    peer: SocketAddr,
}

impl HeartbeatChannel {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> std::io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(HeartbeatChannel { stream, peer })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl SignalSource for HeartbeatChannel {
    fn poll_signal(&mut self) -> std::io::Result<bool> {
        let mut buf = [0u8; 64];
        let mut signalled = false;
        // drain everything queued since the last tick
        loop {
            match self.stream.read(&mut buf) {
                // peer closed, which looks like silence from here on
                Ok(0) => return Ok(signalled),
                Ok(_) => signalled = true,
                Err(err) => {
                    return match err.kind() {
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted => Ok(signalled),
                        std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted => {
                            log::debug!("heartbeat peer {} went away: {}", self.peer, err);
                            Ok(signalled)
                        }
                        _ => Err(err),
                    }
                }
            }
        }
    }
}
