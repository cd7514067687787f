//! Error types for reboot verification.
//!
//! Every variant is a hard failure of the current case. Environment
//! preconditions that are not met (too few cards, nothing removable on a
//! fixed platform) are not errors; they surface as [`crate::Selection::Skip`].

use std::num::ParseIntError;
use std::time::Duration;

use sonic_reboot_common::{ComponentType, DeviceError};
use thiserror::Error;

/// Result type alias for verification operations.
pub type VerifyResult<T> = Result<T, VerifyError>;

/// Errors that fail a reboot verification case.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Discovered component count disagrees with the declared topology.
    #[error("Incorrect number of {component_type} components: got {actual}, want exactly {expected}")]
    TopologyMismatch {
        component_type: ComponentType,
        expected: i32,
        actual: usize,
    },

    /// A modular chassis declared removable units but none qualified.
    #[error("No removable {component_type} component found on a modular device")]
    NoRemovableComponent { component_type: ComponentType },

    /// No controller card reported the required redundancy role.
    #[error("No controller card reports redundant role {role}")]
    RedundancyRoleNotFound { role: &'static str },

    /// More than one controller card reported the same redundancy role.
    #[error("{count} controller cards report redundant role {role}, expected exactly one")]
    RedundancyRoleAmbiguous { role: &'static str, count: usize },

    /// The device refused the reboot request.
    #[error("Reboot of {component} rejected: {reason}")]
    RebootRejected { component: String, reason: String },

    /// The reboot status query is not implemented.
    #[error("RebootStatus for {component} is unimplemented; the reboot service is not fully compliant")]
    StatusUnimplemented { component: String },

    /// A bounded wait elapsed before the expected state was observed.
    #[error("{what} did not reach target state within {timeout:?} (waited {elapsed:?}): last observed {last_observed}")]
    Timeout {
        what: String,
        timeout: Duration,
        elapsed: Duration,
        last_observed: String,
    },

    /// A console table line did not match the column grammar.
    #[error("invalid line format: {line}")]
    MalformedLine { line: String },

    /// A numeric column matched the grammar but did not parse.
    #[error("error parsing {field} in line '{line}': {source}")]
    InvalidNumber {
        field: &'static str,
        line: String,
        #[source]
        source: ParseIntError,
    },

    /// A console command returned an error string.
    #[error("could not fetch output for: {command}, err: {error}")]
    CommandFailed { command: String, error: String },

    /// Trap statistics reported packets being dropped to an exception path.
    #[error("found non-zero rate for {count} trap statistic sample(s): {summary}")]
    NonZeroDropRate { count: usize, summary: String },

    /// Ingress counter did not move, so a zero drop rate proves nothing.
    #[error("incoming packets on {interface} did not change after traffic was started ({before} -> {after})")]
    TrafficNotFlowing {
        interface: String,
        before: u64,
        after: u64,
    },

    /// Port name does not follow the `<type>-<fpc>/<pic>/<port>` scheme.
    #[error("invalid port name format: {port}")]
    InvalidPortName { port: String },

    /// Several independent checks failed in the same case.
    #[error("{} checks failed: {}", .0.len(), summarize(.0))]
    Multiple(Vec<VerifyError>),

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    /// Unexpected failure of a remote operation.
    #[error("{operation} failed: {source}")]
    Device {
        operation: String,
        #[source]
        source: DeviceError,
    },
}

fn summarize(errors: &[VerifyError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl VerifyError {
    /// Wraps a device error with the operation that produced it.
    pub fn device(operation: impl Into<String>, source: DeviceError) -> Self {
        Self::Device {
            operation: operation.into(),
            source,
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Collapses a list of failures into a single error, if any.
    pub fn from_failures(mut failures: Vec<VerifyError>) -> Option<Self> {
        match failures.len() {
            0 => None,
            1 => failures.pop(),
            _ => Some(Self::Multiple(failures)),
        }
    }
}
