//! Verification helpers for testing reboot cases
//!
//! Provides assertion helpers over the calls recorded by [`MockDevice`].

use thiserror::Error;

use crate::mock::{CallLog, MockDevice};

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected a reboot of '{component}', got {actual:?}")]
    RebootNotIssued {
        component: String,
        actual: Vec<String>,
    },

    #[error("Unexpected reboot of '{component}'")]
    UnexpectedReboot { component: String },

    #[error("Expected command containing '{expected}', got {actual:?}")]
    CommandNotExecuted {
        expected: String,
        actual: Vec<String>,
    },

    #[error("Command containing '{pattern}' was executed")]
    UnexpectedCommand { pattern: String },

    #[error("Expected {expected} {what}, found {actual}")]
    CountMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Result type for verification operations
pub type VerificationResult<T> = Result<T, VerificationError>;

/// Verifier over a snapshot of the calls made to a mock device
pub struct CallVerifier {
    calls: CallLog,
}

impl CallVerifier {
    pub fn new(calls: CallLog) -> Self {
        Self { calls }
    }

    /// Snapshots the calls made to `device` so far
    pub fn of(device: &MockDevice) -> Self {
        Self::new(device.calls())
    }

    fn rebooted(&self) -> Vec<String> {
        self.calls
            .reboots
            .iter()
            .map(|t| t.component.clone())
            .collect()
    }

    /// Verify that a reboot was issued for `component`
    pub fn assert_cold_reboot(&self, component: &str) -> VerificationResult<()> {
        if self.calls.reboots.iter().any(|t| t.component == component) {
            Ok(())
        } else {
            Err(VerificationError::RebootNotIssued {
                component: component.to_string(),
                actual: self.rebooted(),
            })
        }
    }

    /// Verify that no reboot was issued for `component`
    pub fn assert_not_rebooted(&self, component: &str) -> VerificationResult<()> {
        if self.calls.reboots.iter().any(|t| t.component == component) {
            return Err(VerificationError::UnexpectedReboot {
                component: component.to_string(),
            });
        }
        Ok(())
    }

    /// Verify the number of reboot requests
    pub fn assert_reboot_count(&self, expected: usize) -> VerificationResult<()> {
        count("reboot requests", expected, self.calls.reboots.len())
    }

    /// Verify the number of `RebootStatus` queries
    pub fn assert_status_query_count(&self, expected: usize) -> VerificationResult<()> {
        count("status queries", expected, self.calls.status_requests.len())
    }

    /// Verify that a console command containing `expected` was executed
    pub fn assert_command_executed(&self, expected: &str) -> VerificationResult<()> {
        if self.calls.commands.iter().any(|cmd| cmd.contains(expected)) {
            Ok(())
        } else {
            Err(VerificationError::CommandNotExecuted {
                expected: expected.to_string(),
                actual: self.calls.commands.clone(),
            })
        }
    }

    /// Verify that no console command containing `pattern` was executed
    pub fn assert_command_not_executed(&self, pattern: &str) -> VerificationResult<()> {
        if self.calls.commands.iter().any(|cmd| cmd.contains(pattern)) {
            Err(VerificationError::UnexpectedCommand {
                pattern: pattern.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Verify the number of console commands executed
    pub fn assert_command_count(&self, expected: usize) -> VerificationResult<()> {
        count("commands", expected, self.calls.commands.len())
    }

    pub fn calls(&self) -> &CallLog {
        &self.calls
    }
}

fn count(what: &'static str, expected: usize, actual: usize) -> VerificationResult<()> {
    if actual != expected {
        Err(VerificationError::CountMismatch {
            what,
            expected,
            actual,
        })
    } else {
        Ok(())
    }
}
