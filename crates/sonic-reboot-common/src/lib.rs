//! Common infrastructure for SONiC per-component reboot verification.
//!
//! This crate holds what both the verifier and its test harness need:
//!
//! - [`types`]: component descriptors, reboot targets, status samples
//! - [`device`]: traits for the remote collaborators (gNOI reboot service,
//!   state reads, console commands, traffic generator)
//! - [`error`]: the device error type shared by every collaborator
//! - [`shell`]: shell execution used by the command-line device client
//!
//! # Example
//!
//! ```ignore
//! use sonic_reboot_common::{RebootService, RebootTarget};
//!
//! async fn reboot_linecard(svc: &impl RebootService) -> DeviceResult<()> {
//!     let target = RebootTarget::cold("FPC0", false);
//!     svc.reboot(&target).await
//! }
//! ```

pub mod device;
pub mod error;
pub mod shell;
pub mod types;

// Re-export commonly used items at crate root
pub use device::{CommandRunner, Device, RebootService, StateReader, TrafficGenerator};
pub use error::{DeviceError, DeviceResult};
pub use types::{
    CommandOutput, ComponentDescriptor, ComponentOperStatus, ComponentPath, ComponentState,
    ComponentType, InterfaceCounters, OperStatus, PathElem, RebootMethod, RebootStatusRequest,
    RebootStatusSample, RebootTarget, RedundantRole,
};
