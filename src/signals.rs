use crate::errors::*;
use crate::supervisor::{SignalEvent, SignalSource};
use nix::sys::signal::{SigSet, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};
use std::os::unix::io::{AsRawFd, RawFd};
use tracing::debug;

/// Signals the supervisor is registered for
pub const SUPERVISED_SIGNALS: [Signal; 4] = [
    Signal::SIGCHLD,
    Signal::SIGCONT,
    Signal::SIGHUP,
    Signal::SIGTERM,
];

/// Blocks [`SUPERVISED_SIGNALS`] on the calling thread and delivers them as
/// blocking reads from a signalfd.
///
/// Create it before spawning the child so an early `SIGCHLD` is not lost.
/// `std::process::Command` clears the signal mask in the child it starts.
#[derive(Debug)]
pub struct SignalChannel {
    fd: SignalFd,
}

impl SignalChannel {
    /// Block the supervised signals on this thread and open the signalfd
    pub fn new() -> Result<Self, GuardError> {
        let mut mask = SigSet::empty();
        for sig in SUPERVISED_SIGNALS.iter() {
            mask.add(*sig);
        }
        mask.thread_block()?;
        let fd = SignalFd::with_flags(&mask, SfdFlags::SFD_CLOEXEC)?;
        debug!(fd = fd.as_raw_fd(), "signal channel ready");
        Ok(SignalChannel { fd })
    }

    /// Block until the next signal arrives
    pub fn read_signal(&mut self) -> Result<SignalEvent, GuardError> {
        match self.fd.read_signal()? {
            Some(info) => Ok(SignalEvent::from(&info)),
            None => Err((ErrorKind::SysError, "signalfd read returned no signal").into()),
        }
    }
}

impl AsRawFd for SignalChannel {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl SignalSource for SignalChannel {
    fn next_event(&mut self) -> Result<SignalEvent, GuardError> {
        self.read_signal()
    }
}
