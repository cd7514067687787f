//! Interface state snapshots taken around a reboot.
//!
//! A snapshot records which interfaces are operationally up. After the
//! reboot the post snapshot must contain every interface that was up before;
//! interfaces that come up during the reboot are fine.

use std::collections::BTreeSet;
use std::time::Duration;

use sonic_reboot_common::{DeviceError, DeviceResult, OperStatus, StateReader};
use tracing::{debug, info, instrument, warn};

use crate::error::{VerifyError, VerifyResult};
use crate::wait::await_state;

/// Interfaces covered by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceScope {
    /// Every interface the device reports.
    All,
    /// Only the named interfaces (the testbed binding ports).
    Only(Vec<String>),
}

impl InterfaceScope {
    /// Picks the scope from the binding configuration.
    pub fn from_binding(ports: &[String], binding_only: bool) -> Self {
        if binding_only {
            InterfaceScope::Only(ports.to_vec())
        } else {
            InterfaceScope::All
        }
    }

    async fn interfaces<R: StateReader + ?Sized>(&self, reader: &R) -> DeviceResult<Vec<String>> {
        match self {
            InterfaceScope::All => reader.interface_names().await,
            InterfaceScope::Only(names) => Ok(names.clone()),
        }
    }
}

/// Set of interfaces that were up at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceStateSnapshot {
    pub up: BTreeSet<String>,
}

impl InterfaceStateSnapshot {
    pub fn from_up<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            up: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads oper-status of every interface in `scope`.
    pub async fn capture<R>(reader: &R, scope: &InterfaceScope) -> DeviceResult<Self>
    where
        R: StateReader + ?Sized,
    {
        let mut up = BTreeSet::new();
        for name in scope.interfaces(reader).await? {
            let status = reader.interface_oper_status(&name).await?;
            if status == OperStatus::Up {
                up.insert(name);
            }
        }
        Ok(Self { up })
    }

    /// Interfaces up here but not in `post`, sorted.
    pub fn missing_from(&self, post: &InterfaceStateSnapshot) -> Vec<String> {
        self.up.difference(&post.up).cloned().collect()
    }

    /// True when every interface up here is also up in `post`.
    pub fn is_recovered_in(&self, post: &InterfaceStateSnapshot) -> bool {
        self.up.is_subset(&post.up)
    }

    pub fn len(&self) -> usize {
        self.up.len()
    }

    pub fn is_empty(&self) -> bool {
        self.up.is_empty()
    }
}

/// Waits for the interfaces captured before a reboot to come back up.
#[derive(Debug, Clone)]
pub struct StateValidator {
    interval: Duration,
    timeout: Duration,
}

impl StateValidator {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Captures the pre-reboot snapshot.
    #[instrument(skip(self, reader))]
    pub async fn capture<R>(
        &self,
        reader: &R,
        scope: &InterfaceScope,
    ) -> VerifyResult<InterfaceStateSnapshot>
    where
        R: StateReader + ?Sized,
    {
        let snapshot = InterfaceStateSnapshot::capture(reader, scope)
            .await
            .map_err(|e| VerifyError::device("capture interface state", e))?;
        info!(up = snapshot.len(), "Captured interface state before reboot");
        Ok(snapshot)
    }

    /// Polls until `pre` is contained in a fresh snapshot.
    ///
    /// On timeout the error lists the interfaces still missing.
    #[instrument(skip(self, reader, pre), fields(pre_up = pre.len()))]
    pub async fn validate_recovery<R>(
        &self,
        reader: &R,
        pre: &InterfaceStateSnapshot,
        scope: &InterfaceScope,
    ) -> VerifyResult<InterfaceStateSnapshot>
    where
        R: StateReader + ?Sized,
    {
        if pre.is_empty() {
            warn!("No interface was up before the reboot, nothing to validate");
            return Ok(InterfaceStateSnapshot::default());
        }

        let state = await_state(
            "interface recovery",
            self.interval,
            self.timeout,
            move || async move {
                let post = InterfaceStateSnapshot::capture(reader, scope).await?;
                Ok::<_, DeviceError>(MissingInterfaces {
                    missing: pre.missing_from(&post),
                    post,
                })
            },
            |state| state.missing.is_empty(),
        )
        .await?;

        debug!(post_up = state.post.len(), "All interfaces recovered");
        Ok(state.post)
    }
}

/// Value observed while waiting for recovery.
struct MissingInterfaces {
    missing: Vec<String>,
    post: InterfaceStateSnapshot,
}

impl std::fmt::Debug for MissingInterfaces {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "interfaces not up: [{}]", self.missing.join(", "))
    }
}
