//! Unified error types for jep

use std::io;
use thiserror::Error;

/// Command line usage error (sysexits.h)
pub const EX_USAGE: i32 = 64;
/// Operating system error (sysexits.h)
pub const EX_OSERR: i32 = 71;
/// Insufficient permission (sysexits.h)
pub const EX_NOPERM: i32 = 77;

/// Main error type for jep operations
#[derive(Error, Debug)]
pub enum Error {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // Validation errors, raised before any kernel request
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to create C string: {0}")]
    CString(#[from] std::ffi::NulError),

    // Interface control errors
    #[error("Failed to open interface control socket: {0}")]
    ControlOpen(#[source] io::Error),

    #[error("{request} on '{interface}' failed: {source}")]
    Ioctl {
        request: &'static str,
        interface: String,
        source: io::Error,
    },

    #[error("Failed to enumerate interface addresses: {0}")]
    Enumerate(#[source] io::Error),

    #[error("Unexpected epair name format: {0}")]
    EpairName(String),

    // Jail errors
    #[error("jail_get syscall failed: {0}")]
    JailGet(String),

    #[error("Failed to attach to jail with JID {jid}: {source}")]
    JailAttach { jid: i32, source: io::Error },

    // Kernel module errors
    #[error("Unable to load kernel module \"{module}\": {source}")]
    KldLoad { module: String, source: io::Error },

    // Process coordination errors
    #[error("Failed to create channel: {0}")]
    Channel(#[source] io::Error),

    #[error("Unable to report link address to parent: {0}")]
    Report(#[source] io::Error),

    #[error("Malformed link address report from jail side: {0}")]
    MalformedReport(String),

    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),

    #[error("waitpid failed: {0}")]
    Wait(#[source] nix::Error),

    #[error("Jail side exited with status {0}")]
    ChildExited(i32),

    #[error("Provisioning out of order: {0}")]
    Protocol(String),
}

impl Error {
    /// Process exit code for this error
    ///
    /// Permission failures map to `EX_NOPERM`, everything the kernel or the
    /// OS rejected maps to `EX_OSERR`. A forwarded child status is returned
    /// unchanged unless it would read as success.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) | Error::CString(_) => EX_USAGE,
            Error::ChildExited(0) => EX_OSERR,
            Error::ChildExited(code) => *code,
            Error::Fork(errno) | Error::Wait(errno) => errno_exit(*errno as i32),
            other => match other.os_error() {
                Some(errno) => errno_exit(errno),
                None => EX_OSERR,
            },
        }
    }

    /// Underlying errno, when the error wraps one
    fn os_error(&self) -> Option<i32> {
        match self {
            Error::Io(e)
            | Error::ControlOpen(e)
            | Error::Enumerate(e)
            | Error::Channel(e)
            | Error::Report(e)
            | Error::Ioctl { source: e, .. }
            | Error::JailAttach { source: e, .. }
            | Error::KldLoad { source: e, .. } => e.raw_os_error(),
            _ => None,
        }
    }
}

fn errno_exit(errno: i32) -> i32 {
    if errno == libc::EPERM {
        EX_NOPERM
    } else {
        EX_OSERR
    }
}

/// Result type alias for jep operations
pub type Result<T> = std::result::Result<T, Error>;
