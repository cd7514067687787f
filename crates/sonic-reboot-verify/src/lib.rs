//! # reboot-verify - per-component reboot verification
//!
//! Issues gNOI cold reboots for single hardware components of a modular
//! device and independently checks that the device honours the contract:
//! the reboot completes in bounded time, the component comes back, and
//! nothing else is damaged on the way.
//!
//! ## Cases
//! - Standby controller card: reboot the secondary, wait for it to report
//!   its redundancy role again
//! - Line card: reboot a removable line card, poll `RebootStatus`, wait for
//!   it to come back, check interface recovery and (Juniper) trap drops
//! - Fabric: reboot a removable fabric module, poll, wait for `ACTIVE`,
//!   check interface recovery
//!
//! ## Building blocks
//! - [`selector`]: picks the unit to reboot from the component inventory
//! - [`poller`]: bounded `RebootStatus` polling state machine
//! - [`validator`]: interface snapshots before/after the reboot
//! - [`traffic`]: trap statistics sampling under live traffic
//! - [`trap_stats`]: parser for the trap statistics console table

pub mod cases;
pub mod client;
pub mod config;
pub mod error;
pub mod poller;
pub mod selector;
pub mod traffic;
pub mod trap_stats;
pub mod validator;
pub mod wait;

pub use cases::{fpc_from_port, CaseOutcome, CaseReport, RebootCase, RebootVerifier};
pub use client::{ShellDevice, ShellTrafficGenerator};
pub use config::{ExpectedCount, Vendor, VerifyConfig};
pub use error::{VerifyError, VerifyResult};
pub use poller::{PollReport, PollState, RebootStatusPoller, REBOOT_STATUS_INTERVAL};
pub use selector::{ControllerPair, Selection};
pub use traffic::{DropReport, DropViolation, TrafficDropMonitor};
pub use trap_stats::{parse_trap_stats, TrapStatRecord};
pub use validator::{InterfaceScope, InterfaceStateSnapshot, StateValidator};
