//! Signal-driven supervision of a single child process.
//!
//! Signals are never handled asynchronously. They are blocked and read one
//! record at a time from a [`SignalSource`], so everything here runs on the
//! ordinary call stack.

use crate::errors::*;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, info};

/// What the caller should do after a signal was handled
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Keep supervising
    Continue,
    /// Stop supervising and exit the process with this status
    Exit(i32),
}

/// One delivered signal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalEvent {
    /// Raw signal number, kept raw so unexpected numbers can be reported
    pub signo: i32,
    /// Reporting process, only present for `SIGCHLD`
    pub pid: Option<Pid>,
}

impl SignalEvent {
    /// A signal that carries no reporting process
    pub fn new(signal: Signal) -> Self {
        SignalEvent {
            signo: signal as i32,
            pid: None,
        }
    }

    /// A `SIGCHLD` reported by `pid`
    pub fn child(pid: Pid) -> Self {
        SignalEvent {
            signo: Signal::SIGCHLD as i32,
            pid: Some(pid),
        }
    }
}

impl From<&libc::signalfd_siginfo> for SignalEvent {
    fn from(info: &libc::signalfd_siginfo) -> Self {
        let signo = info.ssi_signo as i32;
        let pid = if signo == libc::SIGCHLD {
            Some(Pid::from_raw(info.ssi_pid as libc::pid_t))
        } else {
            None
        };
        SignalEvent { signo, pid }
    }
}

/// Last known state of a supervised child
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildStatus {
    /// Running, or continued after a stop
    Running,
    /// Stopped by job control
    Stopped,
    /// Exited with this code
    Exited(i32),
    /// Killed by this signal
    Signaled(Signal),
}

impl ChildStatus {
    /// Status the supervisor should exit with once the child is gone.
    ///
    /// A child killed by a signal maps to `128 + signo`, as shells report it,
    /// rather than the raw signal number a plain `si_status` would give. Code
    /// that compared against the bare signal number must add 128.
    pub fn exit_code(&self) -> Option<i32> {
        match *self {
            ChildStatus::Exited(code) => Some(code),
            ChildStatus::Signaled(sig) => Some(128 + sig as i32),
            ChildStatus::Running | ChildStatus::Stopped => None,
        }
    }
}

/// The operations the supervisor needs on the child it owns
pub trait Child {
    /// Process id of the child
    fn pid(&self) -> Pid;

    /// Send the child a continue
    fn resume(&mut self) -> Result<(), GuardError>;

    /// Block until a status change is available and record it
    fn wait(&mut self) -> Result<(), GuardError>;

    /// Deliver `signal` to the child
    fn signal(&mut self, signal: Signal) -> Result<(), GuardError>;

    /// Status recorded by the last [`wait`](Child::wait)
    fn status(&self) -> ChildStatus;

    /// `true` once the child has exited or was killed
    fn terminated(&self) -> bool {
        self.status().exit_code().is_some()
    }

    /// `true` unless the child is stopped or gone
    fn running(&self) -> bool {
        self.status() == ChildStatus::Running
    }

    /// Exit status to report, see [`ChildStatus::exit_code`]
    fn exit_status(&self) -> Option<i32> {
        self.status().exit_code()
    }
}

/// Job control over the supervisor's own process
pub trait JobControl {
    /// Stop the calling process until something sends it `SIGCONT`
    fn suspend_self(&mut self) -> Result<(), GuardError>;
}

/// Stops the real process with `SIGSTOP`
#[derive(Default, Clone, Copy, Debug)]
pub struct ProcessJobControl;

impl JobControl for ProcessJobControl {
    fn suspend_self(&mut self) -> Result<(), GuardError> {
        signal::raise(Signal::SIGSTOP)?;
        Ok(())
    }
}

/// A blocking stream of signal events
pub trait SignalSource {
    /// Block until the next event is available
    fn next_event(&mut self) -> Result<SignalEvent, GuardError>;
}

/// Translates signal events into [`Outcome`]s for one child.
///
/// Handles `SIGCONT`, `SIGCHLD`, `SIGHUP` and `SIGTERM`; anything else is a
/// registration bug and is reported as [`ErrorKind::UnexpectedSignal`].
#[derive(Default, Debug)]
pub struct Supervisor<J: JobControl = ProcessJobControl> {
    job_control: J,
}

impl Supervisor<ProcessJobControl> {
    /// A supervisor that stops the real process when the child stops
    pub fn new() -> Self {
        Supervisor::default()
    }
}

impl<J: JobControl> Supervisor<J> {
    /// A supervisor using `job_control` to suspend itself
    pub fn with_job_control(job_control: J) -> Self {
        Supervisor { job_control }
    }

    /// The job control capability in use
    pub fn job_control(&self) -> &J {
        &self.job_control
    }

    /// Handle one signal event for `child`
    pub fn handle_signal<C: Child>(
        &mut self,
        event: &SignalEvent,
        child: &mut C,
    ) -> Result<Outcome, GuardError> {
        let signal = Signal::try_from(event.signo).map_err(|_| unknown_signal(event.signo))?;
        debug!(?signal, pid = ?event.pid, "handling signal");

        match signal {
            Signal::SIGCONT => {
                child.resume()?;
                Ok(Outcome::Continue)
            }
            Signal::SIGCHLD => {
                // SIGCHLD coalesces: the event only says which child to look at.
                if event.pid != Some(child.pid()) {
                    return Err(GuardError::new(
                        ErrorKind::ChildIdentity,
                        format!(
                            "SIGCHLD from {:?}, supervising {}",
                            event.pid,
                            child.pid()
                        ),
                    ));
                }
                child.wait()?;
                debug!(status = ?child.status(), "child status refreshed");

                if let Some(code) = child.exit_status() {
                    info!(code, "child terminated");
                    return Ok(Outcome::Exit(code));
                }
                if !child.running() {
                    // Stop with the child so the shell sees both frozen.
                    self.job_control.suspend_self()?;
                }
                Ok(Outcome::Continue)
            }
            Signal::SIGHUP | Signal::SIGTERM => {
                child.signal(Signal::SIGHUP)?;
                info!(?signal, "hangup relayed to child");
                Ok(Outcome::Exit(0))
            }
            _ => Err(unknown_signal(event.signo)),
        }
    }

    /// Feed events from `source` into [`handle_signal`](Self::handle_signal)
    /// until one of them asks to exit, and return that status.
    pub fn run<S: SignalSource, C: Child>(
        &mut self,
        source: &mut S,
        child: &mut C,
    ) -> Result<i32, GuardError> {
        loop {
            let event = source.next_event()?;
            if let Outcome::Exit(status) = self.handle_signal(&event, child)? {
                return Ok(status);
            }
        }
    }
}

fn unknown_signal(signo: i32) -> GuardError {
    GuardError::new(ErrorKind::UnexpectedSignal, format!("unknown signal {}", signo))
}
