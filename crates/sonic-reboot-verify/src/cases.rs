//! The per-component reboot cases.
//!
//! Each case selects a unit, issues a cold reboot for it alone and then
//! proves the unit came back without collateral damage. Cases are isolated:
//! [`RebootVerifier::run_cases`] records a failure and moves on.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use sonic_reboot_common::{
    ComponentOperStatus, ComponentType, Device, DeviceError, RebootTarget, TrafficGenerator,
};
use tokio::time::{sleep, Instant};
use tracing::{error, info, instrument, warn};

use crate::config::{Vendor, VerifyConfig};
use crate::error::{VerifyError, VerifyResult};
use crate::poller::RebootStatusPoller;
use crate::selector::{
    fetch_inventory, select_controller_cards, select_fabric, select_linecard, Selection,
};
use crate::traffic::TrafficDropMonitor;
use crate::validator::{InterfaceScope, StateValidator};
use crate::wait::await_state;

/// `<type>-<fpc>/<pic>/<port>[:<channel>]`
static JUNIPER_PORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z]+-(\d+)/\d+/\d+(?::\d+)?$").expect("Invalid regex pattern")
});

/// Line card hosting a Juniper port, e.g. `et-1/0/3:2` -> `FPC1`.
pub fn fpc_from_port(port: &str) -> VerifyResult<String> {
    JUNIPER_PORT_RE
        .captures(port)
        .and_then(|caps| caps.get(1))
        .map(|fpc| format!("FPC{}", fpc.as_str()))
        .ok_or_else(|| VerifyError::InvalidPortName {
            port: port.to_string(),
        })
}

/// A reboot test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RebootCase {
    StandbyControllerCard,
    Linecard,
    Fabric,
}

impl RebootCase {
    /// All cases, in run order.
    pub const ALL: [RebootCase; 3] = [
        RebootCase::StandbyControllerCard,
        RebootCase::Linecard,
        RebootCase::Fabric,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RebootCase::StandbyControllerCard => "standby-controller-card",
            RebootCase::Linecard => "linecard",
            RebootCase::Fabric => "fabric",
        }
    }
}

impl fmt::Display for RebootCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RebootCase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standby-controller-card" | "controller" | "controller-card" => {
                Ok(RebootCase::StandbyControllerCard)
            }
            "linecard" | "line-card" => Ok(RebootCase::Linecard),
            "fabric" => Ok(RebootCase::Fabric),
            _ => Err(format!(
                "unknown reboot case '{}', expected one of: standby-controller-card, linecard, fabric",
                s
            )),
        }
    }
}

/// How a case ended.
#[derive(Debug)]
pub enum CaseOutcome {
    Passed,
    Skipped(String),
    Failed(VerifyError),
}

impl CaseOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, CaseOutcome::Failed(_))
    }
}

/// Result of one case in a run.
#[derive(Debug)]
pub struct CaseReport {
    pub case: RebootCase,
    pub outcome: CaseOutcome,
    pub elapsed: Duration,
}

impl fmt::Display for CaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs_f64();
        match &self.outcome {
            CaseOutcome::Passed => write!(f, "PASS {} ({:.1}s)", self.case, secs),
            CaseOutcome::Skipped(reason) => {
                write!(f, "SKIP {} ({:.1}s): {}", self.case, secs, reason)
            }
            CaseOutcome::Failed(e) => write!(f, "FAIL {} ({:.1}s): {}", self.case, secs, e),
        }
    }
}

/// Runs reboot cases against one device.
pub struct RebootVerifier<'a, D: Device + ?Sized> {
    device: &'a D,
    traffic: Option<&'a dyn TrafficGenerator>,
    config: &'a VerifyConfig,
}

impl<'a, D: Device + ?Sized> RebootVerifier<'a, D> {
    pub fn new(device: &'a D, config: &'a VerifyConfig) -> Self {
        Self {
            device,
            traffic: None,
            config,
        }
    }

    /// Attaches the traffic generator used by the line card traffic check.
    pub fn with_traffic(mut self, traffic: &'a dyn TrafficGenerator) -> Self {
        self.traffic = Some(traffic);
        self
    }

    /// Runs `cases` in order. A failing case does not stop the run.
    pub async fn run_cases(&self, cases: &[RebootCase]) -> Vec<CaseReport> {
        let mut reports = Vec::with_capacity(cases.len());
        for &case in cases {
            reports.push(self.run_case(case).await);
        }
        reports
    }

    #[instrument(skip(self, case), fields(case = %case))]
    pub async fn run_case(&self, case: RebootCase) -> CaseReport {
        let start = Instant::now();
        let result = match case {
            RebootCase::StandbyControllerCard => self.standby_controller_card_reboot().await,
            RebootCase::Linecard => self.linecard_reboot().await,
            RebootCase::Fabric => self.fabric_reboot().await,
        };
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => CaseOutcome::Failed(e),
        };
        let report = CaseReport {
            case,
            outcome,
            elapsed: start.elapsed(),
        };
        match &report.outcome {
            CaseOutcome::Failed(_) => error!("{}", report),
            _ => info!("{}", report),
        }
        report
    }

    /// Reboots the standby controller card and waits for it to rejoin.
    pub async fn standby_controller_card_reboot(&self) -> VerifyResult<CaseOutcome> {
        let timing = &self.config.timing;
        let inventory = fetch_inventory(self.device, ComponentType::ControllerCard).await?;
        let pair = match select_controller_cards(
            &inventory,
            self.config.topology.controller_cards,
        )? {
            Selection::Selected(pair) => pair,
            Selection::Skip(reason) => return Ok(CaseOutcome::Skipped(reason)),
        };

        let standby = pair.standby.name;
        let target = self.target(&standby);
        let start = Instant::now();
        self.issue_reboot(&target).await?;

        info!(settle = ?timing.controller_settle(), "Waiting for the reboot process to start");
        sleep(timing.controller_settle()).await;

        await_state(
            &format!("redundant role of {}", standby),
            timing.state_poll_interval(),
            timing.controller_boot(),
            || self.device.component_state(&standby),
            |state| state.redundant_role.is_some(),
        )
        .await?;
        info!(
            component = %standby,
            boot_secs = start.elapsed().as_secs_f64(),
            "Standby controller card is back"
        );
        Ok(CaseOutcome::Passed)
    }

    /// Reboots a removable line card, validates recovery and, on Juniper,
    /// checks the line card forwards without punting traffic.
    pub async fn linecard_reboot(&self) -> VerifyResult<CaseOutcome> {
        let timing = &self.config.timing;
        let topology = &self.config.topology;

        let inventory = fetch_inventory(self.device, ComponentType::Linecard).await?;
        let pinned = match self.config.vendor {
            Vendor::Juniper => {
                let port = self.ingress_port()?;
                let fpc = fpc_from_port(port)?;
                info!(port, linecard = %fpc, "Line card to reboot");
                Some(fpc)
            }
            _ => None,
        };
        let linecard =
            match select_linecard(&inventory, topology.linecards, pinned.as_deref())? {
                Selection::Selected(lc) => lc.name,
                Selection::Skip(reason) => return Ok(CaseOutcome::Skipped(reason)),
            };

        let scope = self.interface_scope();
        let validator = StateValidator::new(
            timing.state_poll_interval(),
            timing.linecard_interface_recovery(),
        );
        let pre = validator.capture(self.device, &scope).await?;

        let target = self.target(&linecard);
        self.issue_reboot(&target).await?;

        info!(settle = ?timing.linecard_settle(), "Waiting for the reboot process to start");
        sleep(timing.linecard_settle()).await;

        self.poll_reboot_status(&target, timing.linecard_boot())
            .await?;

        await_state(
            &format!("removable flag of {}", linecard),
            timing.state_poll_interval(),
            timing.linecard_boot(),
            || self.device.component_state(&linecard),
            |state| state.removable == Some(true),
        )
        .await?;
        info!(component = %linecard, "Line card is back");

        validator.validate_recovery(self.device, &pre, &scope).await?;

        // TODO: add traffic-drop checks for vendors other than Juniper once
        // their trap statistics output is known.
        if self.config.vendor == Vendor::Juniper {
            let Some(traffic) = self.traffic else {
                warn!(
                    component = %linecard,
                    "No traffic generator attached, traffic-drop check not run"
                );
                return Ok(CaseOutcome::Skipped(
                    "traffic-drop check needs a traffic generator".to_string(),
                ));
            };
            self.traffic_drop_check(traffic, &linecard).await?;
        }
        Ok(CaseOutcome::Passed)
    }

    /// Reboots a removable fabric component and validates recovery.
    pub async fn fabric_reboot(&self) -> VerifyResult<CaseOutcome> {
        if self.config.deviations.fabric_reboot_unsupported {
            return Ok(CaseOutcome::Skipped(
                "fabric component reboot is unsupported on this platform".to_string(),
            ));
        }
        let timing = &self.config.timing;

        let inventory = fetch_inventory(self.device, ComponentType::Fabric).await?;
        let fabric = match select_fabric(&inventory, self.config.topology.fabrics)? {
            Selection::Selected(fabric) => fabric.name,
            Selection::Skip(reason) => return Ok(CaseOutcome::Skipped(reason)),
        };

        let scope = self.interface_scope();
        let validator = StateValidator::new(
            timing.state_poll_interval(),
            timing.fabric_interface_recovery(),
        );
        let pre = validator.capture(self.device, &scope).await?;

        let target = self.target(&fabric);
        self.issue_reboot(&target).await?;
        self.poll_reboot_status(&target, timing.fabric_boot()).await?;

        await_state(
            &format!("oper-status of {}", fabric),
            timing.state_poll_interval(),
            timing.fabric_boot(),
            || self.device.component_state(&fabric),
            |state| state.oper_status == Some(ComponentOperStatus::Active),
        )
        .await?;
        info!(component = %fabric, "Fabric component is active");

        validator.validate_recovery(self.device, &pre, &scope).await?;
        Ok(CaseOutcome::Passed)
    }

    fn target(&self, component: &str) -> RebootTarget {
        RebootTarget::cold(component, self.config.deviations.subcomponent_path_name_only)
    }

    fn interface_scope(&self) -> InterfaceScope {
        let topology = &self.config.topology;
        InterfaceScope::from_binding(&topology.ports, topology.check_interfaces_in_binding)
    }

    fn ingress_port(&self) -> VerifyResult<&str> {
        self.config.topology.ingress_port().ok_or_else(|| {
            VerifyError::invalid_config("topology.ports", "the ingress port is not configured")
        })
    }

    #[instrument(skip(self, target), fields(component = %target.component))]
    async fn issue_reboot(&self, target: &RebootTarget) -> VerifyResult<()> {
        info!(
            method = target.method.as_str(),
            subcomponents = ?target.subcomponents.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Issuing reboot"
        );
        self.device.reboot(target).await.map_err(|e| match e {
            DeviceError::Rejected { reason, .. } => VerifyError::RebootRejected {
                component: target.component.clone(),
                reason,
            },
            other => VerifyError::device(format!("reboot of {}", target.component), other),
        })
    }

    async fn poll_reboot_status(&self, target: &RebootTarget, max_wait: Duration) -> VerifyResult<()> {
        let scoped = !self.config.deviations.reboot_status_subcomponents_unsupported;
        if !scoped {
            warn!("RebootStatus does not accept subcomponents, querying the chassis");
        }
        let request = target.status_request(scoped);
        RebootStatusPoller::new(self.device, max_wait)
            .poll(&request)
            .await
            .into_result(&target.component, max_wait)?;
        Ok(())
    }

    async fn traffic_drop_check(
        &self,
        traffic: &dyn TrafficGenerator,
        linecard: &str,
    ) -> VerifyResult<()> {
        let ingress = self.ingress_port()?;
        TrafficDropMonitor::from_config(&self.config.traffic)
            .run(self.device, traffic, linecard, ingress)
            .await?
            .into_result()
    }
}
