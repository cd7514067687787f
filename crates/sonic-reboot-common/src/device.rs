//! Remote collaborator traits.
//!
//! The verifier never talks to a wire protocol directly. Each capability it
//! needs from the device under test (or the traffic generator) is a trait,
//! so the production client and the test harness's mock device are
//! interchangeable.

use async_trait::async_trait;

use crate::error::DeviceResult;
use crate::types::{
    CommandOutput, ComponentState, ComponentType, InterfaceCounters, OperStatus,
    RebootStatusRequest, RebootStatusSample, RebootTarget,
};

/// gNOI system reboot service.
#[async_trait]
pub trait RebootService: Send + Sync {
    /// Issues a reboot for the target.
    ///
    /// The device rejects the request (`DeviceError::Rejected`) while a
    /// reboot of the active control processor is pending. The verifier only
    /// observes that rule, it never tracks it locally.
    async fn reboot(&self, target: &RebootTarget) -> DeviceResult<()>;

    /// Asks whether a reboot is still active.
    ///
    /// Returns `DeviceError::Unimplemented` when the device does not support
    /// the query at all.
    async fn reboot_status(&self, request: &RebootStatusRequest)
        -> DeviceResult<RebootStatusSample>;
}

/// Read-only access to device operational state.
#[async_trait]
pub trait StateReader: Send + Sync {
    /// Returns the names of all components of the given type.
    async fn components_of_type(&self, component_type: ComponentType)
        -> DeviceResult<Vec<String>>;

    /// Reads the state leaves of a component. Leaves the device does not
    /// report are `None`.
    async fn component_state(&self, name: &str) -> DeviceResult<ComponentState>;

    /// Returns the names of all interfaces.
    async fn interface_names(&self) -> DeviceResult<Vec<String>>;

    async fn interface_oper_status(&self, name: &str) -> DeviceResult<OperStatus>;

    async fn interface_counters(&self, name: &str) -> DeviceResult<InterfaceCounters>;
}

/// Console command execution on the device.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run_command(&self, command: &str) -> DeviceResult<CommandOutput>;
}

/// Synthetic traffic source attached to the device.
///
/// Configuration push (flows, addresses) happens outside the verifier.
#[async_trait]
pub trait TrafficGenerator: Send + Sync {
    async fn start_traffic(&self) -> DeviceResult<()>;

    async fn stop_traffic(&self) -> DeviceResult<()>;
}

/// Everything the reboot cases need from the device under test.
pub trait Device: RebootService + StateReader + CommandRunner {}

impl<T> Device for T where T: RebootService + StateReader + CommandRunner {}
