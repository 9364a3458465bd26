use crate::errors::*;
use crate::supervisor::{Child, ChildStatus};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tracing::{debug, warn};

/// A child process of the caller, identified by pid.
///
/// The process is created elsewhere; this only observes, resumes and
/// signals it, and reaps it through [`Child::wait`].
#[derive(Debug)]
pub struct ChildProcess {
    pid: Pid,
    status: ChildStatus,
}

impl ChildProcess {
    /// Adopt a running child of the calling process
    pub fn new(pid: Pid) -> Self {
        ChildProcess {
            pid,
            status: ChildStatus::Running,
        }
    }
}

impl From<&std::process::Child> for ChildProcess {
    fn from(child: &std::process::Child) -> Self {
        ChildProcess::new(Pid::from_raw(child.id() as libc::pid_t))
    }
}

impl Child for ChildProcess {
    fn pid(&self) -> Pid {
        self.pid
    }

    fn resume(&mut self) -> Result<(), GuardError> {
        self.signal(Signal::SIGCONT)?;
        if self.status == ChildStatus::Stopped {
            self.status = ChildStatus::Running;
        }
        Ok(())
    }

    fn wait(&mut self) -> Result<(), GuardError> {
        if self.terminated() {
            return Err((ErrorKind::SysError, "wait on a reaped child").into());
        }
        let flags = WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
        let status = loop {
            match waitpid(self.pid, Some(flags)) {
                Ok(status) => break status,
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(GuardError::nix(ErrorKind::SysError, e)),
            }
        };
        self.status = match status {
            WaitStatus::Exited(_, code) => ChildStatus::Exited(code),
            WaitStatus::Signaled(_, sig, _) => ChildStatus::Signaled(sig),
            WaitStatus::Stopped(_, _) => ChildStatus::Stopped,
            WaitStatus::Continued(_) => ChildStatus::Running,
            other => {
                debug!(?other, "ignoring wait status");
                self.status
            }
        };
        Ok(())
    }

    fn signal(&mut self, sig: Signal) -> Result<(), GuardError> {
        // Once reaped, the pid may belong to an unrelated process.
        if self.terminated() {
            warn!(pid = %self.pid, ?sig, "not signalling reaped child");
            return Ok(());
        }
        signal::kill(self.pid, sig)?;
        Ok(())
    }

    fn status(&self) -> ChildStatus {
        self.status
    }
}
