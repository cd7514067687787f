//! Bounded waits on device state.

use std::fmt::{Debug, Display};
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::error::{VerifyError, VerifyResult};

/// Repeatedly reads a value until `predicate` holds or `timeout` elapses.
///
/// The first read happens immediately, later reads every `interval`. Read
/// errors count as "not there yet": the device is expected to be partly
/// unreachable while a component reboots. On timeout the error carries the
/// last value (or read error) observed.
pub async fn await_state<T, E, F, Fut, P>(
    what: &str,
    interval: Duration,
    timeout: Duration,
    mut read: F,
    mut predicate: P,
) -> VerifyResult<T>
where
    T: Debug,
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&T) -> bool,
{
    let start = Instant::now();
    let deadline = start.checked_add(timeout);
    let mut last_observed = String::from("nothing");

    loop {
        match read().await {
            Ok(value) if predicate(&value) => {
                info!(what, elapsed = ?start.elapsed(), "Reached target state");
                return Ok(value);
            }
            Ok(value) => {
                debug!(what, ?value, "Target state not reached yet");
                last_observed = format!("{:?}", value);
            }
            Err(e) => {
                debug!(what, error = %e, "Read failed while waiting");
                last_observed = format!("error: {}", e);
            }
        }

        let now = Instant::now();
        let pause = match deadline {
            Some(d) if now >= d => {
                return Err(VerifyError::Timeout {
                    what: what.to_string(),
                    timeout,
                    elapsed: start.elapsed(),
                    last_observed,
                });
            }
            Some(d) => interval.min(d - now),
            None => interval,
        };
        sleep(pause).await;
    }
}
