//! Helpers for launching the user's shell once privileges are gone.

use crate::errors::*;
use nix::unistd::{self, User};
use std::env;
use std::path::PathBuf;

/// Environment variable accumulating prompt tags across nested tools
pub const SHELL_PREFIX_VAR: &str = "PRIVGUARD_SHELL_PREFIX";

const DEFAULT_SHELL: &str = "/bin/sh";

/// Login shell of the real user, `/bin/sh` when none is configured
pub fn shell_path() -> Result<PathBuf, GuardError> {
    let user = User::from_uid(unistd::getuid())?
        .ok_or((ErrorKind::SysError, "real user not found in the user database"))?;
    if user.shell.as_os_str().is_empty() {
        return Ok(PathBuf::from(DEFAULT_SHELL));
    }
    Ok(user.shell)
}

/// Prepend `tag` to the prompt of bash-like shells started from this
/// environment
pub fn prepend_shell_prefix(tag: &str) {
    let mut prefix = env::var(SHELL_PREFIX_VAR).unwrap_or_default();
    prefix.push_str(tag);
    env::set_var(SHELL_PREFIX_VAR, prefix);
    env::set_var(
        "PROMPT_COMMAND",
        format!("PS1=\"${}$PS1\" PROMPT_COMMAND=", SHELL_PREFIX_VAR),
    );
}
