//! Reboot status polling.
//!
//! After a reboot request is accepted the device is asked, every
//! [`REBOOT_STATUS_INTERVAL`], whether the reboot is still active:
//!
//! ```text
//!              active=true / transient error
//!                  +-----------+
//!                  v           |
//!  reboot ---> Polling --------+
//!                  |  active=false      ---> Completed
//!                  |  deadline reached  ---> TimedOut
//!                  |  Unimplemented     ---> UnsupportedFatal
//! ```
//!
//! Transient query failures are expected while the component restarts and
//! are retried silently; if they persist, the poll ends as `TimedOut`. The
//! interval is fixed on purpose: device boot time dwarfs polling overhead.

use std::time::Duration;

use sonic_reboot_common::{
    DeviceResult, RebootService, RebootStatusRequest, RebootStatusSample,
};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use crate::error::{VerifyError, VerifyResult};

/// Fixed pause between status queries.
pub const REBOOT_STATUS_INTERVAL: Duration = Duration::from_secs(10);

/// Poller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Completed,
    TimedOut,
    UnsupportedFatal,
}

impl PollState {
    /// Applies one status query result.
    pub fn next(self, result: &DeviceResult<RebootStatusSample>) -> PollState {
        if self != PollState::Polling {
            return self;
        }
        match result {
            Ok(sample) if sample.active => PollState::Polling,
            Ok(_) => PollState::Completed,
            Err(e) if e.is_unimplemented() => PollState::UnsupportedFatal,
            Err(_) => PollState::Polling,
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self != PollState::Polling
    }
}

/// How a poll ended.
#[derive(Debug, Clone)]
pub struct PollReport {
    pub state: PollState,
    /// Time spent polling.
    pub elapsed: Duration,
    /// Number of status queries issued.
    pub queries: u32,
    /// Last successful answer.
    pub last_sample: Option<RebootStatusSample>,
    /// Last query error, if any.
    pub last_error: Option<String>,
}

impl PollReport {
    /// Converts a non-completed poll into the matching failure.
    pub fn into_result(self, component: &str, max_wait: Duration) -> VerifyResult<PollReport> {
        match self.state {
            PollState::Completed => Ok(self),
            PollState::UnsupportedFatal => Err(VerifyError::StatusUnimplemented {
                component: component.to_string(),
            }),
            PollState::TimedOut | PollState::Polling => {
                let last_observed = match (&self.last_sample, &self.last_error) {
                    (_, Some(e)) => format!("error: {}", e),
                    (Some(sample), None) => format!("active={}", sample.active),
                    (None, None) => "no status answer".to_string(),
                };
                Err(VerifyError::Timeout {
                    what: format!("reboot of {}", component),
                    timeout: max_wait,
                    elapsed: self.elapsed,
                    last_observed,
                })
            }
        }
    }
}

/// Polls reboot status until the reboot completes or the budget runs out.
pub struct RebootStatusPoller<'a, S: RebootService + ?Sized> {
    service: &'a S,
    interval: Duration,
    max_wait: Duration,
}

impl<'a, S: RebootService + ?Sized> RebootStatusPoller<'a, S> {
    /// Creates a poller with the fixed [`REBOOT_STATUS_INTERVAL`].
    pub fn new(service: &'a S, max_wait: Duration) -> Self {
        Self {
            service,
            interval: REBOOT_STATUS_INTERVAL,
            max_wait,
        }
    }

    #[cfg(test)]
    fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Polls with a deadline of now + max wait.
    pub async fn poll(&self, request: &RebootStatusRequest) -> PollReport {
        self.poll_from(Instant::now(), request).await
    }

    /// Polls with a deadline of `issued_at` + max wait.
    ///
    /// An unrepresentable deadline means the poll is bounded only by the
    /// device answering.
    #[instrument(skip(self, request), fields(scoped = request.is_scoped()))]
    pub async fn poll_from(&self, issued_at: Instant, request: &RebootStatusRequest) -> PollReport {
        let start = Instant::now();
        let deadline = issued_at.checked_add(self.max_wait);
        let mut report = PollReport {
            state: PollState::Polling,
            elapsed: Duration::ZERO,
            queries: 0,
            last_sample: None,
            last_error: None,
        };

        while !report.state.is_terminal() {
            debug!(interval = ?self.interval, "Waiting before checking reboot status");
            sleep(self.interval).await;

            if deadline.is_some_and(|d| Instant::now() >= d) {
                report.state = PollState::TimedOut;
                break;
            }

            let result = self.service.reboot_status(request).await;
            report.queries += 1;
            report.state = report.state.next(&result);

            match result {
                Ok(sample) => {
                    debug!(active = sample.active, query = report.queries, "Reboot status");
                    report.last_sample = Some(sample);
                    report.last_error = None;
                }
                Err(e) if e.is_unimplemented() => {
                    warn!(error = %e, "RebootStatus is not implemented");
                    report.last_error = Some(e.to_string());
                }
                Err(e) => {
                    // Unreachability during a reboot is expected; keep polling.
                    debug!(error = %e, "RebootStatus failed, retrying");
                    report.last_error = Some(e.to_string());
                }
            }
        }

        report.elapsed = start.elapsed();
        info!(
            state = ?report.state,
            queries = report.queries,
            elapsed = ?report.elapsed,
            "Reboot status polling finished"
        );
        report
    }
}
