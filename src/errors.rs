use std::error::Error;
use std::fmt;
use std::io;

/// Types of errors that can occur while guarding the privilege boundary or
/// supervising a child
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed startup arguments
    Invocation,
    /// The file descriptor table or OS environment is not sane
    Environment,
    /// Wrong privilege configuration at startup
    Privilege,
    /// A required kernel or system feature is disabled
    Precondition,
    /// The verified privilege drop did not reach its post-condition
    PrivilegeDrop,
    /// A signal outside the supervised set was delivered
    UnexpectedSignal,
    /// A child-status event came from a process other than the supervised child
    ChildIdentity,
    /// System-level error when interacting with the OS
    SysError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Invocation => "invocation error",
            ErrorKind::Environment => "environment error",
            ErrorKind::Privilege => "privilege error",
            ErrorKind::Precondition => "precondition error",
            ErrorKind::PrivilegeDrop => "privilege drop failure",
            ErrorKind::UnexpectedSignal => "unexpected signal",
            ErrorKind::ChildIdentity => "child identity violation",
            ErrorKind::SysError => "system error",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
enum ErrorRepr {
    FromNix(ErrorKind, nix::Error),
    FromIo(ErrorKind, String, io::Error),
    WithDescription(ErrorKind, &'static str),
    WithMessage(ErrorKind, String),
}

/// Error type for privilege checks, privilege dropping and supervision.
///
/// Every error is terminal: callers are expected to report it and exit.
#[derive(Debug)]
pub struct GuardError {
    repr: ErrorRepr,
}

impl GuardError {
    pub(crate) fn new<T: Into<String>>(kind: ErrorKind, message: T) -> GuardError {
        GuardError {
            repr: ErrorRepr::WithMessage(kind, message.into()),
        }
    }

    pub(crate) fn io<T: Into<String>>(kind: ErrorKind, context: T, e: io::Error) -> GuardError {
        GuardError {
            repr: ErrorRepr::FromIo(kind, context.into(), e),
        }
    }

    pub(crate) fn nix(kind: ErrorKind, e: nix::Error) -> GuardError {
        GuardError {
            repr: ErrorRepr::FromNix(kind, e),
        }
    }

    /// The category this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::FromNix(kind, _)
            | ErrorRepr::FromIo(kind, _, _)
            | ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithMessage(kind, _) => kind,
        }
    }
}

impl Error for GuardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.repr {
            ErrorRepr::FromNix(_, ref e) => Some(e),
            ErrorRepr::FromIo(_, _, ref e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.repr {
            ErrorRepr::FromNix(kind, ref e) => write!(f, "{}: {}", kind, e),
            ErrorRepr::FromIo(kind, ref context, ref e) => {
                write!(f, "{}: {}: {}", kind, context, e)
            }
            ErrorRepr::WithDescription(kind, description) => write!(f, "{}: {}", kind, description),
            ErrorRepr::WithMessage(kind, ref message) => write!(f, "{}: {}", kind, message),
        }
    }
}

impl From<nix::Error> for GuardError {
    fn from(e: nix::Error) -> GuardError {
        GuardError::nix(ErrorKind::SysError, e)
    }
}

impl From<(ErrorKind, &'static str)> for GuardError {
    fn from((kind, description): (ErrorKind, &'static str)) -> GuardError {
        GuardError {
            repr: ErrorRepr::WithDescription(kind, description),
        }
    }
}
