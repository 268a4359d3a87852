//! Heartbeat watchdog.
//!
//! The watchdog runs on its own thread, accepts a single heartbeat connection
//! and counts down once per tick. Any signal on the channel restores the full
//! budget; when the countdown reaches zero the probe is declared stalled and
//! the thread ends with [`LivenessOutcome::LivenessLost`]. The probe only
//! ever observes whether the thread is still running.

use std::net::{SocketAddr, TcpListener};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::WatchdogError;
use crate::heartbeat::{HeartbeatChannel, SignalSource};

pub const DEFAULT_WATCHDOG_PORT: u16 = 3000;
pub const DEFAULT_BUDGET: u32 = 10;
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessOutcome {
    /// No heartbeat arrived within the budget.
    LivenessLost,
    /// The watchdog was shut down before it fired.
    Cancelled,
}

/// Answers the probe's "is the watchdog still running" question.
pub trait Liveness {
    fn is_alive(&self) -> bool;
}

/// Countdown of silent ticks.
#[derive(Debug, Clone)]
pub struct WatchdogState {
    budget: u32,
    remaining: u32,
}

impl WatchdogState {
    pub fn new(budget: u32) -> Self {
        let budget = budget.max(1);
        WatchdogState {
            budget,
            remaining: budget,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Advance by one tick. Returns `Some(LivenessLost)` once the countdown
    /// is exhausted; the state stays terminal after that.
    pub fn on_tick(&mut self, signalled: bool) -> Option<LivenessOutcome> {
        if self.remaining == 0 {
            return Some(LivenessOutcome::LivenessLost);
        }
        if signalled {
            self.remaining = self.budget;
        } else {
            self.remaining -= 1;
        }
        (self.remaining == 0).then_some(LivenessOutcome::LivenessLost)
    }
}

/// Waits one tick on the shutdown channel. Returns true when shutdown was
/// requested or the owner is gone.
fn wait_tick(shutdown: &Receiver<()>, tick: Duration) -> bool {
    match shutdown.recv_timeout(tick) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        Err(RecvTimeoutError::Timeout) => false,
    }
}

/// Count down until the budget of silent ticks is used up or shutdown is
/// requested.
pub fn run_timeout_loop<S: SignalSource>(
    channel: &mut S,
    budget: u32,
    tick: Duration,
    shutdown: &Receiver<()>,
) -> Result<LivenessOutcome, WatchdogError> {
    let mut state = WatchdogState::new(budget);
    loop {
        if wait_tick(shutdown, tick) {
            return Ok(LivenessOutcome::Cancelled);
        }
        let signalled = channel.poll_signal().map_err(WatchdogError::Channel)?;
        if signalled {
            log::trace!("heartbeat received, countdown reset to {}", budget);
        }
        if let Some(outcome) = state.on_tick(signalled) {
            return Ok(outcome);
        }
        if !signalled {
            log::debug!("no heartbeat, {} ticks left", state.remaining());
        }
    }
}

pub struct WatchdogMonitor {
    listener: TcpListener,
    addr: SocketAddr,
}

impl WatchdogMonitor {
    pub fn bind(addr: SocketAddr) -> Result<Self, WatchdogError> {
        let bind_error = |source| WatchdogError::Bind { addr, source };
        let listener = TcpListener::bind(addr).map_err(bind_error)?;
        let addr = listener.local_addr().map_err(bind_error)?;
        Ok(WatchdogMonitor { listener, addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Block until the single heartbeat connection arrives. Returns `None`
    /// when shutdown is requested first.
    pub fn accept(&self, tick: Duration, shutdown: &Receiver<()>) -> Result<Option<HeartbeatChannel>, WatchdogError> {
        self.listener.set_nonblocking(true).map_err(WatchdogError::Accept)?;
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    return HeartbeatChannel::new(stream, peer).map(Some).map_err(WatchdogError::Accept);
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    // poll for the connection at a finer grain than the countdown
                    if wait_tick(shutdown, tick.min(Duration::from_millis(50))) {
                        return Ok(None);
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(err) => return Err(WatchdogError::Accept(err)),
            }
        }
    }

    /// Run accept and the countdown on a dedicated thread.
    pub fn spawn(self, budget: u32, tick: Duration) -> Result<WatchdogHandle, WatchdogError> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel();
        let thread = std::thread::Builder::new()
            .name("watchdog".to_owned())
            .spawn(move || self.run(budget, tick, &shutdown_rx))
            .map_err(WatchdogError::Spawn)?;
        Ok(WatchdogHandle {
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    fn run(self, budget: u32, tick: Duration, shutdown: &Receiver<()>) -> Result<LivenessOutcome, WatchdogError> {
        log::info!("watchdog listening on {}", self.addr);
        let mut channel = match self.accept(tick, shutdown)? {
            Some(channel) => channel,
            None => return Ok(LivenessOutcome::Cancelled),
        };
        // a single connection for the lifetime of the watchdog
        drop(self.listener);
        log::info!("probe connected from {}", channel.peer());

        let outcome = run_timeout_loop(&mut channel, budget, tick, shutdown)?;
        if outcome == LivenessOutcome::LivenessLost {
            log::warn!("no heartbeat for {} ticks, probe declared stalled", budget);
        }
        Ok(outcome)
    }
}

/// Owner side of a running watchdog thread.
pub struct WatchdogHandle {
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<Result<LivenessOutcome, WatchdogError>>>,
}

impl WatchdogHandle {
    /// Stop the watchdog and collect its outcome. A watchdog that already
    /// fired reports `LivenessLost`.
    pub fn shutdown(mut self) -> Result<LivenessOutcome, WatchdogError> {
        if let Some(shutdown) = self.shutdown.take() {
            // the thread may already be gone
            let _ = shutdown.send(());
        }
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| WatchdogError::Panicked)?,
            None => Ok(LivenessOutcome::Cancelled),
        }
    }
}

impl Liveness for WatchdogHandle {
    fn is_alive(&self) -> bool {
        self.thread.as_ref().is_some_and(|thread| !thread.is_finished())
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
