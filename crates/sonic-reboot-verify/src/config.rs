//! Verifier configuration loaded from a TOML file.
//!
//! ```toml
//! vendor = "juniper"
//!
//! [target]
//! address = "dut.example.net:9339"
//! username = "admin"
//! password = "admin"
//!
//! [topology]
//! controller_cards = 2
//! linecards = -1
//! fabrics = 6
//! ports = ["et-0/0/0", "et-0/0/1"]
//!
//! [deviations]
//! subcomponent_path_name_only = true
//!
//! [traffic]
//! start_command = "otgen run"
//! stop_command = "otgen stop"
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration
//! with topology checks disabled.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{VerifyError, VerifyResult};

/// Operator-declared component count.
///
/// A non-negative value enables exact-match validation, a negative value
/// disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ExpectedCount(pub i32);

impl ExpectedCount {
    pub const UNDECLARED: ExpectedCount = ExpectedCount(-1);

    /// Returns the declared count, if validation is enabled.
    pub fn declared(&self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    /// True when the operator declared at least one unit (a modular chassis).
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// True when `count` exceeds the declared value. Always true when
    /// validation is disabled.
    pub fn is_exceeded_by(&self, count: usize) -> bool {
        self.declared().map_or(true, |declared| count > declared)
    }
}

impl Default for ExpectedCount {
    fn default() -> Self {
        Self::UNDECLARED
    }
}

/// Device vendor, for vendor-specific checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Juniper,
    Arista,
    Cisco,
    Nokia,
    #[default]
    Other,
}

/// Connection parameters for the device under test.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// gNMI/gNOI address (`host:port`).
    pub address: String,
    pub username: String,
    pub password: String,
    pub insecure: bool,
    /// Host for console commands over ssh; defaults to the address host.
    pub ssh_host: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:9339".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            insecure: true,
            ssh_host: None,
        }
    }
}

impl TargetConfig {
    /// Host used for console commands.
    pub fn console_host(&self) -> &str {
        match &self.ssh_host {
            Some(host) => host,
            None => self
                .address
                .rsplit_once(':')
                .map_or(self.address.as_str(), |(host, _)| host),
        }
    }
}

/// Declared topology of the device under test.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub controller_cards: ExpectedCount,
    pub linecards: ExpectedCount,
    pub fabrics: ExpectedCount,
    /// Device ports bound to the testbed. The first one carries ingress traffic.
    pub ports: Vec<String>,
    /// Restrict interface recovery checks to `ports`.
    pub check_interfaces_in_binding: bool,
}

impl TopologyConfig {
    pub fn ingress_port(&self) -> Option<&str> {
        self.ports.first().map(String::as_str)
    }
}

/// Known platform deviations from the reboot service contract.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Deviations {
    /// Subcomponent paths carry only the component name.
    pub subcomponent_path_name_only: bool,
    /// `RebootStatus` does not accept subcomponents; query the chassis instead.
    pub reboot_status_subcomponents_unsupported: bool,
    /// Fabric components cannot be rebooted individually.
    pub fabric_reboot_unsupported: bool,
}

/// Waits and deadlines, in seconds.
///
/// `RebootStatus` is always polled every
/// [`REBOOT_STATUS_INTERVAL`](crate::poller::REBOOT_STATUS_INTERVAL) and has
/// no setting here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    pub state_poll_interval_secs: u64,
    pub controller_settle_secs: u64,
    pub linecard_settle_secs: u64,
    pub controller_boot_secs: u64,
    pub linecard_boot_secs: u64,
    pub fabric_boot_secs: u64,
    pub linecard_interface_recovery_secs: u64,
    pub fabric_interface_recovery_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            state_poll_interval_secs: 5,
            controller_settle_secs: 60,
            linecard_settle_secs: 10,
            controller_boot_secs: 600,
            linecard_boot_secs: 600,
            fabric_boot_secs: 600,
            linecard_interface_recovery_secs: 600,
            fabric_interface_recovery_secs: 300,
        }
    }
}

impl TimingConfig {
    pub fn state_poll_interval(&self) -> Duration {
        Duration::from_secs(self.state_poll_interval_secs)
    }

    pub fn controller_settle(&self) -> Duration {
        Duration::from_secs(self.controller_settle_secs)
    }

    pub fn linecard_settle(&self) -> Duration {
        Duration::from_secs(self.linecard_settle_secs)
    }

    pub fn controller_boot(&self) -> Duration {
        Duration::from_secs(self.controller_boot_secs)
    }

    pub fn linecard_boot(&self) -> Duration {
        Duration::from_secs(self.linecard_boot_secs)
    }

    pub fn fabric_boot(&self) -> Duration {
        Duration::from_secs(self.fabric_boot_secs)
    }

    pub fn linecard_interface_recovery(&self) -> Duration {
        Duration::from_secs(self.linecard_interface_recovery_secs)
    }

    pub fn fabric_interface_recovery(&self) -> Duration {
        Duration::from_secs(self.fabric_interface_recovery_secs)
    }
}

/// Traffic-drop check settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    pub sample_interval_secs: u64,
    pub iterations: u32,
    /// Shell command that starts traffic on the generator.
    pub start_command: Option<String>,
    /// Shell command that stops traffic on the generator.
    pub stop_command: Option<String>,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: 30,
            iterations: 10,
            start_command: None,
            stop_command: None,
        }
    }
}

impl TrafficConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }
}

/// Top-level verifier configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub vendor: Vendor,
    pub target: TargetConfig,
    pub topology: TopologyConfig,
    pub deviations: Deviations,
    pub timing: TimingConfig,
    pub traffic: TrafficConfig,
}

impl VerifyConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> VerifyResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            VerifyError::invalid_config(path.display().to_string(), e.to_string())
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), ?config.vendor, "Loaded configuration");
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn from_toml(text: &str) -> VerifyResult<Self> {
        let config: VerifyConfig =
            toml::from_str(text).map_err(|e| VerifyError::invalid_config("toml", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates configuration values.
    pub fn validate(&self) -> VerifyResult<()> {
        if self.target.address.trim().is_empty() {
            return Err(VerifyError::invalid_config(
                "target.address",
                "address cannot be empty",
            ));
        }
        let intervals = [
            ("timing.state_poll_interval_secs", self.timing.state_poll_interval_secs),
            ("traffic.sample_interval_secs", self.traffic.sample_interval_secs),
        ];
        for (field, value) in intervals {
            if value == 0 {
                return Err(VerifyError::invalid_config(field, "interval must be non-zero"));
            }
        }
        if self.traffic.iterations == 0 {
            return Err(VerifyError::invalid_config(
                "traffic.iterations",
                "at least one sample is required",
            ));
        }
        if self.vendor == Vendor::Juniper && self.traffic.start_command.is_none() {
            return Err(VerifyError::invalid_config(
                "traffic.start_command",
                "the Juniper line card traffic-drop check needs a traffic generator",
            ));
        }
        Ok(())
    }
}
