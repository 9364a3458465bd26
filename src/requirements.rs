use crate::errors::*;
use crate::privdrop::{PrivilegeContext, SystemPrivileges};
use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_PROBE_PATH: &str = "/dev/null";
const DEFAULT_IP_FORWARD_PATH: &str = "/proc/sys/net/ipv4/ip_forward";
const DEFAULT_IP_FORWARD_EXPECTED: &str = "1\n";
const DEFAULT_IP_FORWARD_REMEDIATION: &str =
    "Please run \"sudo sysctl -w net.ipv4.ip_forward=1\" to enable IP forwarding";

/// The environment a setuid-root network tool insists on before doing any
/// privileged work.
///
/// # Example
/// ```no_run
/// use privguard::Requirements;
///
/// let args: Vec<_> = std::env::args_os().collect();
/// Requirements::default().check(&args).unwrap_or_else(|e| {
///     eprintln!("{}", e);
///     std::process::exit(1)
/// });
/// ```
#[derive(Clone, Debug)]
pub struct Requirements {
    probe_path: PathBuf,
    ip_forward_path: PathBuf,
    ip_forward_expected: String,
    ip_forward_remediation: String,
}

impl Default for Requirements {
    fn default() -> Self {
        Requirements {
            probe_path: PathBuf::from(DEFAULT_PROBE_PATH),
            ip_forward_path: PathBuf::from(DEFAULT_IP_FORWARD_PATH),
            ip_forward_expected: DEFAULT_IP_FORWARD_EXPECTED.to_owned(),
            ip_forward_remediation: DEFAULT_IP_FORWARD_REMEDIATION.to_owned(),
        }
    }
}

impl Requirements {
    /// Readable path opened to probe the descriptor table
    pub fn probe_path<T: AsRef<Path>>(mut self, path: T) -> Self {
        self.probe_path = path.as_ref().to_owned();
        self
    }

    /// File holding the IP forwarding flag
    pub fn ip_forward_path<T: AsRef<Path>>(mut self, path: T) -> Self {
        self.ip_forward_path = path.as_ref().to_owned();
        self
    }

    /// Exact contents the IP forwarding file must have, and the hint shown
    /// when it does not
    pub fn ip_forward_expected<T: AsRef<str>, R: AsRef<str>>(
        mut self,
        contents: T,
        remediation: R,
    ) -> Self {
        self.ip_forward_expected = contents.as_ref().to_owned();
        self.ip_forward_remediation = remediation.as_ref().to_owned();
        self
    }

    /// Run every check against the calling process
    pub fn check<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<(), GuardError> {
        self.check_with(args, &SystemPrivileges)
    }

    /// Run every check in order, stopping at the first failure.
    ///
    /// `args[0]` only names the program in error messages.
    pub fn check_with<S: AsRef<OsStr>, P: PrivilegeContext>(
        &self,
        args: &[S],
        ctx: &P,
    ) -> Result<(), GuardError> {
        let program = match args.first() {
            Some(arg0) => arg0.as_ref().to_string_lossy().into_owned(),
            None => {
                return Err((ErrorKind::Invocation, "missing argv[0]: argc <= 0").into());
            }
        };

        self.check_descriptors()?;

        let creds = ctx.credentials();
        if !creds.euid.is_root() {
            return Err(GuardError::new(
                ErrorKind::Privilege,
                format!("{}: needs to be installed setuid root", program),
            ));
        }
        if creds.ruid.is_root() || creds.rgid.as_raw() == 0 {
            return Err(GuardError::new(
                ErrorKind::Privilege,
                format!("{}: please run as non-root", program),
            ));
        }

        self.check_ip_forwarding(&program)?;
        debug!(program = %program, "startup requirements satisfied");
        Ok(())
    }

    fn check_descriptors(&self) -> Result<(), GuardError> {
        let context = || format!("open {}", self.probe_path.display());
        let probe = File::open(&self.probe_path)
            .map_err(|e| GuardError::io(ErrorKind::Environment, context(), e))?;
        // The lowest free descriptor is handed out; a standard stream must be closed.
        if probe.as_raw_fd() <= libc::STDERR_FILENO {
            return Err(GuardError::new(
                ErrorKind::Environment,
                format!(
                    "{} opened as fd {}: standard streams are closed",
                    self.probe_path.display(),
                    probe.as_raw_fd()
                ),
            ));
        }
        Ok(())
    }

    fn check_ip_forwarding(&self, program: &str) -> Result<(), GuardError> {
        let path = &self.ip_forward_path;
        let mut contents = String::new();
        File::open(path)
            .and_then(|mut f| f.read_to_string(&mut contents))
            .map_err(|e| {
                GuardError::io(ErrorKind::Environment, format!("open {}", path.display()), e)
            })?;
        if contents != self.ip_forward_expected {
            return Err(GuardError::new(
                ErrorKind::Precondition,
                format!("{}: {}", program, self.ip_forward_remediation),
            ));
        }
        Ok(())
    }
}

/// Validate the startup environment with the default requirements.
///
/// Must run once, before any privileged setup and before a child exists.
pub fn check_requirements<S: AsRef<OsStr>>(args: &[S]) -> Result<(), GuardError> {
    Requirements::default().check(args)
}
