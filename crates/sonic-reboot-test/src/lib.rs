//! Test infrastructure for SONiC per-component reboot verification
//!
//! Provides:
//! - A scriptable in-memory device implementing every device trait
//! - A counting traffic generator
//! - Chassis, component and console-output fixtures
//! - Assertion helpers over the recorded device calls

pub mod fixtures;
pub mod mock;
mod verification;

pub use fixtures::*;
pub use mock::{CallLog, MockComponent, MockDevice, MockTrafficGenerator, Script};
pub use verification::*;
