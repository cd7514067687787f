//! Error types for remote device operations.
//!
//! Every collaborator call (gNOI, gNMI, console) reports failures through
//! [`DeviceError`]. The verifier only cares about a few classes of failure,
//! so the variants are shaped around how callers react to them rather than
//! around the transport that produced them.

use std::io;
use thiserror::Error;

/// Result type alias for remote device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors that can occur while talking to the device under test.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The remote end does not implement the requested RPC.
    #[error("{rpc} is not implemented by the device: {message}")]
    Unimplemented {
        /// The RPC that was refused.
        rpc: String,
        /// Message reported by the device.
        message: String,
    },

    /// The remote end understood the request but refused it.
    #[error("{rpc} rejected by the device: {reason}")]
    Rejected {
        /// The RPC that was rejected.
        rpc: String,
        /// Reason reported by the device.
        reason: String,
    },

    /// Transport or RPC failure (connection refused, deadline, unavailable).
    #[error("{rpc} failed: {message}")]
    Transport {
        /// The RPC that failed.
        rpc: String,
        /// Error message.
        message: String,
    },

    /// The device answered, but the payload could not be decoded.
    #[error("Failed to decode {path}: {message}")]
    Decode {
        /// Path or command whose answer was malformed.
        path: String,
        /// Error message.
        message: String,
    },

    /// Failed to execute a shell command (spawn error).
    #[error("Failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command returned non-zero exit code.
    #[error("Shell command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },
}

impl DeviceError {
    /// Creates an unimplemented error.
    pub fn unimplemented(rpc: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unimplemented {
            rpc: rpc.into(),
            message: message.into(),
        }
    }

    /// Creates a rejected error.
    pub fn rejected(rpc: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            rpc: rpc.into(),
            reason: reason.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(rpc: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            rpc: rpc.into(),
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns true if the device signalled that the operation itself is
    /// not supported.
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, DeviceError::Unimplemented { .. })
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeviceError::Transport { .. } | DeviceError::ShellCommandFailed { .. }
        )
    }
}
