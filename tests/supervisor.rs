//! Signal handling tests against a scripted child.
//!
//! Nothing here stops or signals a real process.

use privguard::reexports::nix::sys::signal::Signal;
use privguard::reexports::nix::unistd::Pid;
use privguard::*;
use std::collections::VecDeque;

#[derive(Default)]
struct ScriptedChild {
    status: Option<ChildStatus>,
    next_status: Option<ChildStatus>,
    resumes: usize,
    waits: usize,
    signals: Vec<Signal>,
}

impl ScriptedChild {
    fn after_wait(status: ChildStatus) -> Self {
        ScriptedChild {
            next_status: Some(status),
            ..Default::default()
        }
    }

    fn untouched(&self) -> bool {
        self.resumes == 0 && self.waits == 0 && self.signals.is_empty()
    }
}

impl Child for ScriptedChild {
    fn pid(&self) -> Pid {
        Pid::from_raw(4242)
    }

    fn resume(&mut self) -> Result<(), GuardError> {
        self.resumes += 1;
        Ok(())
    }

    fn wait(&mut self) -> Result<(), GuardError> {
        self.waits += 1;
        if let Some(next) = self.next_status.take() {
            self.status = Some(next);
        }
        Ok(())
    }

    fn signal(&mut self, signal: Signal) -> Result<(), GuardError> {
        self.signals.push(signal);
        Ok(())
    }

    fn status(&self) -> ChildStatus {
        self.status.unwrap_or(ChildStatus::Running)
    }
}

#[derive(Default)]
struct CountingJobControl {
    suspends: usize,
}

impl JobControl for CountingJobControl {
    fn suspend_self(&mut self) -> Result<(), GuardError> {
        self.suspends += 1;
        Ok(())
    }
}

struct Replay(VecDeque<SignalEvent>);

impl SignalSource for Replay {
    fn next_event(&mut self) -> Result<SignalEvent, GuardError> {
        Ok(self
            .0
            .pop_front()
            .expect("supervisor asked for more events than scripted"))
    }
}

fn supervisor() -> Supervisor<CountingJobControl> {
    Supervisor::with_job_control(CountingJobControl::default())
}

#[test]
fn child_exit_code_is_propagated() {
    let mut child = ScriptedChild::after_wait(ChildStatus::Exited(7));
    let mut sup = supervisor();
    let outcome = sup
        .handle_signal(&SignalEvent::child(Pid::from_raw(4242)), &mut child)
        .unwrap();
    assert_eq!(outcome, Outcome::Exit(7));
    assert_eq!(child.waits, 1);
    assert_eq!(sup.job_control().suspends, 0);
}

#[test]
fn child_killed_by_signal_exits_with_shell_convention() {
    let mut child = ScriptedChild::after_wait(ChildStatus::Signaled(Signal::SIGTERM));
    let outcome = supervisor()
        .handle_signal(&SignalEvent::child(Pid::from_raw(4242)), &mut child)
        .unwrap();
    assert_eq!(outcome, Outcome::Exit(128 + 15));
}

#[test]
fn stopped_child_stops_supervisor_once() {
    let mut child = ScriptedChild::after_wait(ChildStatus::Stopped);
    let mut sup = supervisor();
    let outcome = sup
        .handle_signal(&SignalEvent::child(Pid::from_raw(4242)), &mut child)
        .unwrap();
    assert_eq!(outcome, Outcome::Continue);
    assert_eq!(sup.job_control().suspends, 1);
}

#[test]
fn still_running_child_continues_without_suspend() {
    let mut child = ScriptedChild::after_wait(ChildStatus::Running);
    let mut sup = supervisor();
    let outcome = sup
        .handle_signal(&SignalEvent::child(Pid::from_raw(4242)), &mut child)
        .unwrap();
    assert_eq!(outcome, Outcome::Continue);
    assert_eq!(sup.job_control().suspends, 0);
}

#[test]
fn continue_resumes_child_without_status_query() {
    let mut child = ScriptedChild::default();
    let outcome = supervisor()
        .handle_signal(&SignalEvent::new(Signal::SIGCONT), &mut child)
        .unwrap();
    assert_eq!(outcome, Outcome::Continue);
    assert_eq!(child.resumes, 1);
    assert_eq!(child.waits, 0);
}

#[test]
fn hangup_and_terminate_relay_hangup_and_exit_zero() {
    for sig in [Signal::SIGHUP, Signal::SIGTERM] {
        let mut child = ScriptedChild::default();
        let outcome = supervisor()
            .handle_signal(&SignalEvent::new(sig), &mut child)
            .unwrap();
        assert_eq!(outcome, Outcome::Exit(0));
        assert_eq!(child.signals, vec![Signal::SIGHUP]);
        assert!(child.running());
    }
}

#[test]
fn unregistered_signal_is_rejected_without_touching_child() {
    for signo in [libc_sigusr1(), 0, 9999] {
        let mut child = ScriptedChild::default();
        let event = SignalEvent { signo, pid: None };
        let err = supervisor().handle_signal(&event, &mut child).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedSignal);
        assert!(child.untouched());
    }
}

#[test]
fn foreign_sigchld_is_rejected_before_waiting() {
    let mut child = ScriptedChild::after_wait(ChildStatus::Exited(0));
    let err = supervisor()
        .handle_signal(&SignalEvent::child(Pid::from_raw(1)), &mut child)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChildIdentity);
    assert!(child.untouched());

    let anonymous = SignalEvent {
        signo: Signal::SIGCHLD as i32,
        pid: None,
    };
    let err = supervisor().handle_signal(&anonymous, &mut child).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChildIdentity);
}

#[test]
fn run_stops_at_first_exit_outcome() {
    let mut child = ScriptedChild::after_wait(ChildStatus::Exited(3));
    let mut events = Replay(
        vec![
            SignalEvent::new(Signal::SIGCONT),
            SignalEvent::child(Pid::from_raw(4242)),
        ]
        .into(),
    );
    let status = supervisor().run(&mut events, &mut child).unwrap();
    assert_eq!(status, 3);
    assert_eq!(child.resumes, 1);
    assert!(events.0.is_empty());
}

#[test]
fn run_propagates_handler_errors() {
    let mut child = ScriptedChild::default();
    let mut events = Replay(vec![SignalEvent::child(Pid::from_raw(7))].into());
    let err = supervisor().run(&mut events, &mut child).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChildIdentity);
}

fn libc_sigusr1() -> i32 {
    privguard::reexports::libc::SIGUSR1
}
