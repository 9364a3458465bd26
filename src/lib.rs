/*!
# privguard

The trusted core of a setuid-root network-namespace tool: startup checks,
a verified privilege drop, and signal-driven supervision of one child.

## Overview

A setuid-root tool has a short window where it runs as root on behalf of an
unprivileged user. This crate guards both ends of that window:

- [`check_requirements`] refuses to start unless the binary is setuid root,
  was invoked by a non-root user, has sane standard descriptors, and the
  kernel has IP forwarding enabled
- [`drop_privileges`] returns to the real user and group, revokes
  supplementary groups, and proves the old ids cannot be re-acquired
- [`Supervisor`] turns signals read from a [`SignalChannel`] into
  [`Outcome`]s, mirroring job control between the tool and its child

Every error is terminal. Report it and exit; never continue after a failed
privilege drop.

## Example

```no_run
use privguard::{check_requirements, drop_privileges, ChildProcess, SignalChannel, Supervisor};
use std::process::Command;

fn main() {
    let args: Vec<_> = std::env::args_os().collect();
    check_requirements(&args).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1)
    });

    // ... privileged network setup ...

    let mut signals = SignalChannel::new().expect("signalfd");
    drop_privileges().unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::abort()
    });

    let spawned = Command::new("/bin/sh").spawn().expect("spawn");
    let mut child = ChildProcess::from(&spawned);
    let status = Supervisor::new()
        .run(&mut signals, &mut child)
        .unwrap_or_else(|e| {
            eprintln!("{}", e);
            1
        });
    std::process::exit(status);
}
```

## Testing without root

[`PrivilegeContext`], [`Child`], [`JobControl`] and [`SignalSource`] are the
seams between the logic and the OS. The `*_with` entry points and
[`Supervisor::with_job_control`] accept substitutes for each.
*/

pub use self::child::*;
pub use self::errors::*;
pub use self::privdrop::*;
pub use self::requirements::*;
pub use self::signals::*;
pub use self::supervisor::*;

mod child;
mod errors;
mod privdrop;
mod requirements;
pub mod shell;
mod signals;
mod supervisor;

/// Reexported dependencies for use in consuming crates.
///
/// - `libc`: Low-level bindings to the C standard library
/// - `nix`: Rust friendly bindings to *nix APIs (ids, signals, wait)
pub mod reexports {
    pub use {libc, nix};
}
