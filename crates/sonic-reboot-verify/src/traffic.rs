//! Traffic-drop check after a line card reboot.
//!
//! While the traffic generator sends traffic through the rebooted line card,
//! its trap statistics are sampled at a fixed interval. Any record with a
//! non-zero rate means packets are still being punted to an exception path.
//! The ingress counter must also move, otherwise the zero rates prove
//! nothing.

use std::time::Duration;

use sonic_reboot_common::{CommandRunner, StateReader, TrafficGenerator};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::config::TrafficConfig;
use crate::error::{VerifyError, VerifyResult};
use crate::trap_stats::{parse_trap_stats, trap_stats_command, TrapStatRecord};

/// A record with a non-zero rate, and the sample it was seen in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropViolation {
    /// Zero-based sample index.
    pub iteration: u32,
    pub record: TrapStatRecord,
}

/// Everything observed during one monitoring window.
#[derive(Debug, Default)]
pub struct DropReport {
    pub in_pkts_before: u64,
    /// `None` when the final counter read failed.
    pub in_pkts_after: Option<u64>,
    pub violations: Vec<DropViolation>,
    /// Samples fetched and parsed successfully.
    pub samples_taken: u32,
    /// Failure that ended sampling early, if any.
    pub aborted: Option<VerifyError>,
    /// Failures after the sampling window (traffic stop, final counters).
    pub errors: Vec<VerifyError>,
    ingress: String,
}

impl DropReport {
    /// True when traffic went through the ingress port.
    pub fn traffic_flowed(&self) -> bool {
        self.in_pkts_after
            .is_some_and(|after| after > self.in_pkts_before)
    }

    /// Every failed check, in the order they were found.
    pub fn failures(self) -> Vec<VerifyError> {
        let mut failures = Vec::new();
        if !self.violations.is_empty() {
            let summary = self
                .violations
                .iter()
                .map(|v| {
                    format!(
                        "#{} {} rate {}",
                        v.iteration, v.record.name, v.record.rate
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            failures.push(VerifyError::NonZeroDropRate {
                count: self.violations.len(),
                summary,
            });
        }
        let flowed = self.traffic_flowed();
        failures.extend(self.aborted);
        failures.extend(self.errors);
        if let Some(after) = self.in_pkts_after {
            if !flowed {
                failures.push(VerifyError::TrafficNotFlowing {
                    interface: self.ingress,
                    before: self.in_pkts_before,
                    after,
                });
            }
        }
        failures
    }

    pub fn into_result(self) -> VerifyResult<()> {
        match VerifyError::from_failures(self.failures()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Samples trap statistics while traffic runs.
#[derive(Debug, Clone)]
pub struct TrafficDropMonitor {
    interval: Duration,
    iterations: u32,
}

impl TrafficDropMonitor {
    pub fn new(interval: Duration, iterations: u32) -> Self {
        Self {
            interval,
            iterations,
        }
    }

    pub fn from_config(config: &TrafficConfig) -> Self {
        Self::new(config.sample_interval(), config.iterations)
    }

    /// Runs one monitoring window on `linecard` with traffic entering at
    /// `ingress`.
    ///
    /// Fails outright only when the window cannot start (initial counter
    /// read, traffic start). Everything found afterwards lands in the
    /// report. Traffic stop is attempted whenever traffic was started.
    #[instrument(skip(self, device, traffic))]
    pub async fn run<D, G>(
        &self,
        device: &D,
        traffic: &G,
        linecard: &str,
        ingress: &str,
    ) -> VerifyResult<DropReport>
    where
        D: CommandRunner + StateReader + ?Sized,
        G: TrafficGenerator + ?Sized,
    {
        let initial = device
            .interface_counters(ingress)
            .await
            .map_err(|e| VerifyError::device(format!("read counters of {}", ingress), e))?;
        info!(in_pkts = initial.in_pkts, "Initial incoming packets");

        let mut report = DropReport {
            in_pkts_before: initial.in_pkts,
            ingress: ingress.to_string(),
            ..DropReport::default()
        };

        traffic
            .start_traffic()
            .await
            .map_err(|e| VerifyError::device("start traffic", e))?;
        info!("Started traffic");

        let command = trap_stats_command(linecard);
        for iteration in 0..self.iterations {
            sleep(self.interval).await;
            match self.sample(device, &command).await {
                Ok(stats) => {
                    report.samples_taken += 1;
                    for record in stats.into_iter().filter(|r| r.rate != 0) {
                        error!(
                            iteration,
                            name = %record.name,
                            rate = record.rate,
                            "Found non-zero rate for trap statistic"
                        );
                        report.violations.push(DropViolation { iteration, record });
                    }
                }
                Err(e) => {
                    error!(iteration, error = %e, "Trap statistics sampling aborted");
                    report.aborted = Some(e);
                    break;
                }
            }
        }

        if let Err(e) = traffic.stop_traffic().await {
            warn!(error = %e, "Failed to stop traffic");
            report.errors.push(VerifyError::device("stop traffic", e));
        } else {
            info!("Stopped traffic");
        }

        match device.interface_counters(ingress).await {
            Ok(counters) => {
                info!(in_pkts = counters.in_pkts, "Final incoming packets");
                report.in_pkts_after = Some(counters.in_pkts);
            }
            Err(e) => {
                report
                    .errors
                    .push(VerifyError::device(format!("read counters of {}", ingress), e));
            }
        }

        Ok(report)
    }

    async fn sample<D>(&self, device: &D, command: &str) -> VerifyResult<Vec<TrapStatRecord>>
    where
        D: CommandRunner + ?Sized,
    {
        let result = device
            .run_command(command)
            .await
            .map_err(|e| VerifyError::device(format!("run '{}'", command), e))?;
        if result.is_error() {
            return Err(VerifyError::CommandFailed {
                command: command.to_string(),
                error: result.error,
            });
        }
        let stats = parse_trap_stats(&result.output)?;
        debug!(records = stats.len(), "Parsed trap statistics");
        Ok(stats)
    }
}
