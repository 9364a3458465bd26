use crate::errors::*;
use nix::unistd::{self, Gid, Uid};
use tracing::{debug, error, info};

/// Real and effective user and group ids of the process at one instant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Credentials {
    /// Real user id
    pub ruid: Uid,
    /// Effective user id
    pub euid: Uid,
    /// Real group id
    pub rgid: Gid,
    /// Effective group id
    pub egid: Gid,
}

impl Credentials {
    /// Read the ids of the calling process
    pub fn current() -> Self {
        Credentials {
            ruid: unistd::getuid(),
            euid: unistd::geteuid(),
            rgid: unistd::getgid(),
            egid: unistd::getegid(),
        }
    }

    /// `true` when the effective ids differ from the real ones
    pub fn is_elevated(&self) -> bool {
        self.ruid != self.euid || self.rgid != self.egid
    }
}

/// Capability over the process-wide identity state.
///
/// `SystemPrivileges` issues the real system calls; tests substitute their
/// own implementation to reach failure paths without being root.
pub trait PrivilegeContext {
    /// Read the current ids. Never cached.
    fn credentials(&self) -> Credentials;

    /// Read the supplementary group list
    fn groups(&self) -> nix::Result<Vec<Gid>>;

    /// Replace the supplementary group list
    fn set_groups(&mut self, groups: &[Gid]) -> nix::Result<()>;

    /// Set real, effective and saved group id to `gid`
    fn set_gid(&mut self, gid: Gid) -> nix::Result<()>;

    /// Set real, effective and saved user id to `uid`
    fn set_uid(&mut self, uid: Uid) -> nix::Result<()>;

    /// Set only the effective group id
    fn set_egid(&mut self, gid: Gid) -> nix::Result<()>;

    /// Set only the effective user id
    fn set_euid(&mut self, uid: Uid) -> nix::Result<()>;
}

/// The calling process's own privileges
#[derive(Default, Clone, Copy, Debug)]
pub struct SystemPrivileges;

impl PrivilegeContext for SystemPrivileges {
    fn credentials(&self) -> Credentials {
        Credentials::current()
    }

    fn groups(&self) -> nix::Result<Vec<Gid>> {
        unistd::getgroups()
    }

    fn set_groups(&mut self, groups: &[Gid]) -> nix::Result<()> {
        unistd::setgroups(groups)
    }

    fn set_gid(&mut self, gid: Gid) -> nix::Result<()> {
        unistd::setresgid(gid, gid, gid)
    }

    fn set_uid(&mut self, uid: Uid) -> nix::Result<()> {
        unistd::setresuid(uid, uid, uid)
    }

    fn set_egid(&mut self, gid: Gid) -> nix::Result<()> {
        unistd::setegid(gid)
    }

    fn set_euid(&mut self, uid: Uid) -> nix::Result<()> {
        unistd::seteuid(uid)
    }
}

/// Permanently drop the calling process from effective-root to its real user
/// and group.
///
/// Must be called once, after all privileged setup is done and before any
/// user-supplied command runs. On error the process is in an unknown
/// privilege state and must exit without running anything else.
pub fn drop_privileges() -> Result<Credentials, GuardError> {
    drop_privileges_with(&mut SystemPrivileges)
}

/// Same as [`drop_privileges`], through an explicit privilege context.
///
/// Returns the credentials observed after the drop was verified.
pub fn drop_privileges_with<P: PrivilegeContext>(ctx: &mut P) -> Result<Credentials, GuardError> {
    let before = ctx.credentials();
    debug!(?before, "dropping privileges");

    if before.euid.is_root() {
        ctx.set_groups(&[before.rgid])
            .map_err(|e| GuardError::nix(ErrorKind::PrivilegeDrop, e))?;
        let groups = ctx
            .groups()
            .map_err(|e| GuardError::nix(ErrorKind::PrivilegeDrop, e))?;
        if groups != [before.rgid] {
            error!(?groups, "supplementary groups were not revoked");
            return Err((ErrorKind::PrivilegeDrop, "revoking supplementary groups failed").into());
        }
    }

    if before.rgid != before.egid {
        ctx.set_gid(before.rgid)
            .map_err(|e| GuardError::nix(ErrorKind::PrivilegeDrop, e))?;
    }

    if before.ruid != before.euid {
        ctx.set_uid(before.ruid)
            .map_err(|e| GuardError::nix(ErrorKind::PrivilegeDrop, e))?;
    }

    // The old effective ids must be out of reach, not merely unused.
    if before.rgid != before.egid
        && (ctx.set_egid(before.egid).is_ok() || ctx.credentials().egid != before.rgid)
    {
        error!(gid = before.egid.as_raw(), "group id is still reachable");
        return Err((ErrorKind::PrivilegeDrop, "dropping gid failed").into());
    }

    if before.ruid != before.euid
        && (ctx.set_euid(before.euid).is_ok() || ctx.credentials().euid != before.ruid)
    {
        error!(uid = before.euid.as_raw(), "user id is still reachable");
        return Err((ErrorKind::PrivilegeDrop, "dropping uid failed").into());
    }

    let after = ctx.credentials();
    if after.is_elevated() || after.ruid != before.ruid || after.rgid != before.rgid {
        error!(?after, "credentials do not match the real ids");
        return Err((ErrorKind::PrivilegeDrop, "credentials still elevated").into());
    }

    info!(uid = after.ruid.as_raw(), gid = after.rgid.as_raw(), "privileges dropped");
    Ok(after)
}
