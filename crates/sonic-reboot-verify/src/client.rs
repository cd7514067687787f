//! Device client backed by the gNOI/gNMI command-line tools.
//!
//! Reboot RPCs go through `gnoic`, state reads through `gnmic get
//! --format json`, console commands through `ssh`. gRPC status codes only
//! reach us as text on stderr, so errors are classified by their message.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sonic_reboot_common::shell::{self, shellquote, GNMIC_CMD, GNOIC_CMD, SSH_CMD};
use sonic_reboot_common::{
    CommandOutput, CommandRunner, ComponentPath, ComponentState, ComponentType, DeviceError,
    DeviceResult, InterfaceCounters, OperStatus, RebootService, RebootStatusRequest,
    RebootStatusSample, RebootTarget, RedundantRole, StateReader, TrafficGenerator,
};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{TargetConfig, TrafficConfig};

static COMPONENT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"component\[name=([^\]]+)\]").expect("Invalid regex pattern"));

static INTERFACE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"interface\[name=([^\]]+)\]").expect("Invalid regex pattern"));

const REBOOT_RPC: &str = "Reboot";
const REBOOT_STATUS_RPC: &str = "RebootStatus";

/// Classifies a failed `gnoic`/`gnmic` invocation.
pub fn classify_rpc_error(rpc: &str, message: &str) -> DeviceError {
    if message.contains("Unimplemented") || message.contains("unknown service") {
        DeviceError::unimplemented(rpc, message)
    } else if message.contains("FailedPrecondition")
        || message.contains("InvalidArgument")
        || message.contains("AlreadyExists")
    {
        DeviceError::rejected(rpc, message)
    } else {
        DeviceError::transport(rpc, message)
    }
}

fn is_not_found(message: &str) -> bool {
    message.contains("NotFound") || message.contains("not found")
}

/// Collects `(path, value)` pairs from `gnmic get --format json` output.
pub fn decode_gnmic_updates(path: &str, output: &str) -> DeviceResult<Vec<(String, Value)>> {
    let notifications: Value = serde_json::from_str(output.trim())
        .map_err(|e| DeviceError::decode(path, e.to_string()))?;
    let notifications = match notifications {
        Value::Array(items) => items,
        other => vec![other],
    };

    let mut values = Vec::new();
    for notification in notifications {
        let Some(updates) = notification.get("updates").and_then(Value::as_array) else {
            continue;
        };
        for update in updates {
            let update_path = update
                .get("Path")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let Some(leaves) = update.get("values").and_then(Value::as_object) else {
                continue;
            };
            for (leaf_path, value) in leaves {
                let full = if update_path.is_empty() {
                    leaf_path.clone()
                } else {
                    update_path.clone()
                };
                values.push((full, value.clone()));
            }
        }
    }
    Ok(values)
}

/// Decodes `gnoic system reboot-status --format json` output.
pub fn decode_reboot_status(output: &str) -> DeviceResult<RebootStatusSample> {
    let decoded: Value = serde_json::from_str(output.trim())
        .map_err(|e| DeviceError::decode("reboot-status", e.to_string()))?;
    let status = match decoded {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        Value::Array(_) => {
            return Err(DeviceError::decode("reboot-status", "empty response"));
        }
        other => other,
    };
    // Inside a `response` envelope proto3 omits `active` when false; a bare
    // object must carry it.
    let envelope = status.get("response").filter(|r| r.is_object()).cloned();
    let (status, active) = match envelope {
        Some(response) => {
            let active = response
                .get("active")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            (response, active)
        }
        None => {
            let active = status.get("active").and_then(Value::as_bool).ok_or_else(|| {
                DeviceError::decode("reboot-status", "no active flag in response")
            })?;
            (status, active)
        }
    };

    Ok(RebootStatusSample {
        active,
        wait: status
            .get("wait")
            .and_then(Value::as_u64)
            .map(Duration::from_nanos),
        reason: status
            .get("reason")
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())
            .map(str::to_string),
        count: status
            .get("count")
            .and_then(Value::as_u64)
            .and_then(|c| u32::try_from(c).ok()),
    })
}

fn key_from_path(re: &Regex, path: &str) -> Option<String> {
    re.captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn value_as_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        // 64-bit counters are JSON strings in some encodings.
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Device reached through `gnoic`, `gnmic` and `ssh`.
#[derive(Debug, Clone)]
pub struct ShellDevice {
    target: TargetConfig,
}

impl ShellDevice {
    pub fn new(target: TargetConfig) -> Self {
        Self { target }
    }

    fn connection_flags(&self) -> String {
        let mut flags = format!(
            "-a {} -u {} -p {}",
            shellquote(&self.target.address),
            shellquote(&self.target.username),
            shellquote(&self.target.password)
        );
        if self.target.insecure {
            flags.push_str(" --insecure");
        }
        flags
    }

    fn subcomponent_flags(subcomponents: &[ComponentPath]) -> String {
        subcomponents
            .iter()
            .map(|p| format!(" --subcomponent {}", shellquote(&p.to_string())))
            .collect()
    }

    async fn gnoic(&self, rpc: &str, args: &str) -> DeviceResult<String> {
        let cmd = format!("{} {} {}", GNOIC_CMD, self.connection_flags(), args);
        let result = shell::exec(&cmd).await?;
        if result.success() {
            Ok(result.stdout)
        } else {
            Err(classify_rpc_error(rpc, &result.combined_output()))
        }
    }

    /// Runs a gNMI Get. A path the device does not know yields no values.
    async fn gnmi_get(&self, path: &str) -> DeviceResult<Vec<(String, Value)>> {
        let cmd = format!(
            "{} {} get --path {} --format json",
            GNMIC_CMD,
            self.connection_flags(),
            shellquote(path)
        );
        let result = shell::exec(&cmd).await?;
        if !result.success() {
            let message = result.combined_output();
            if is_not_found(&message) {
                debug!(path, "Path not present on the device");
                return Ok(Vec::new());
            }
            return Err(classify_rpc_error("Get", &message));
        }
        decode_gnmic_updates(path, &result.stdout)
    }

    async fn gnmi_leaf(&self, path: &str) -> DeviceResult<Option<Value>> {
        Ok(self.gnmi_get(path).await?.into_iter().next().map(|(_, v)| v))
    }
}

#[async_trait]
impl RebootService for ShellDevice {
    async fn reboot(&self, target: &RebootTarget) -> DeviceResult<()> {
        let args = format!(
            "system reboot --method {}{}",
            target.method.as_str(),
            Self::subcomponent_flags(&target.subcomponents)
        );
        let output = self.gnoic(REBOOT_RPC, &args).await?;
        info!(component = %target.component, response = %output.trim(), "Reboot accepted");
        Ok(())
    }

    async fn reboot_status(
        &self,
        request: &RebootStatusRequest,
    ) -> DeviceResult<RebootStatusSample> {
        let args = format!(
            "--format json system reboot-status{}",
            Self::subcomponent_flags(&request.subcomponents)
        );
        let output = self.gnoic(REBOOT_STATUS_RPC, &args).await?;
        decode_reboot_status(&output)
    }
}

#[async_trait]
impl StateReader for ShellDevice {
    async fn components_of_type(
        &self,
        component_type: ComponentType,
    ) -> DeviceResult<Vec<String>> {
        let path = "/components/component/state/type";
        let mut names = Vec::new();
        for (update_path, value) in self.gnmi_get(path).await? {
            let matches = value_as_str(&value)
                .and_then(|t| t.parse::<ComponentType>().ok())
                .is_some_and(|t| t == component_type);
            if !matches {
                continue;
            }
            if let Some(name) = key_from_path(&COMPONENT_NAME_RE, &update_path) {
                names.push(name);
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn component_state(&self, name: &str) -> DeviceResult<ComponentState> {
        let leaf = |leaf: &str| format!("/components/component[name={}]/state/{}", name, leaf);

        let removable = self.gnmi_leaf(&leaf("removable")).await?;
        let empty = self.gnmi_leaf(&leaf("empty")).await?;
        let role = self.gnmi_leaf(&leaf("redundant-role")).await?;
        let oper_status = self.gnmi_leaf(&leaf("oper-status")).await?;

        Ok(ComponentState {
            removable: removable.as_ref().and_then(value_as_bool),
            empty: empty.as_ref().and_then(value_as_bool),
            redundant_role: role
                .as_ref()
                .and_then(value_as_str)
                .map(|r| RedundantRole::parse(r.rsplit(':').next().unwrap_or(&r))),
            oper_status: oper_status
                .as_ref()
                .and_then(value_as_str)
                .and_then(|s| s.parse().ok()),
        })
    }

    async fn interface_names(&self) -> DeviceResult<Vec<String>> {
        let mut names: Vec<String> = self
            .gnmi_get("/interfaces/interface/state/name")
            .await?
            .into_iter()
            .filter_map(|(path, value)| {
                key_from_path(&INTERFACE_NAME_RE, &path).or_else(|| value_as_str(&value))
            })
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn interface_oper_status(&self, name: &str) -> DeviceResult<OperStatus> {
        let path = format!("/interfaces/interface[name={}]/state/oper-status", name);
        Ok(self
            .gnmi_leaf(&path)
            .await?
            .as_ref()
            .and_then(value_as_str)
            .map_or(OperStatus::Unknown, |s| OperStatus::parse(&s)))
    }

    async fn interface_counters(&self, name: &str) -> DeviceResult<InterfaceCounters> {
        let path = format!("/interfaces/interface[name={}]/state/counters/in-pkts", name);
        let in_pkts = self
            .gnmi_leaf(&path)
            .await?
            .as_ref()
            .and_then(value_as_u64)
            .ok_or_else(|| DeviceError::decode(&path, "in-pkts not reported"))?;
        Ok(InterfaceCounters { in_pkts })
    }
}

#[async_trait]
impl CommandRunner for ShellDevice {
    async fn run_command(&self, command: &str) -> DeviceResult<CommandOutput> {
        let cmd = format!(
            "{} -o BatchMode=yes {}@{} {}",
            SSH_CMD,
            shellquote(&self.target.username),
            shellquote(self.target.console_host()),
            shellquote(command)
        );
        let result = shell::exec(&cmd).await?;
        if result.success() {
            Ok(CommandOutput::ok(result.stdout))
        } else {
            Ok(CommandOutput::failed(result.combined_output()))
        }
    }
}

/// Traffic generator driven by operator-supplied shell commands.
#[derive(Debug, Clone)]
pub struct ShellTrafficGenerator {
    start_command: String,
    stop_command: Option<String>,
}

impl ShellTrafficGenerator {
    /// Returns `None` when no start command is configured.
    pub fn from_config(config: &TrafficConfig) -> Option<Self> {
        config.start_command.as_ref().map(|start| Self {
            start_command: start.clone(),
            stop_command: config.stop_command.clone(),
        })
    }
}

#[async_trait]
impl TrafficGenerator for ShellTrafficGenerator {
    async fn start_traffic(&self) -> DeviceResult<()> {
        shell::exec_checked(&self.start_command).await.map(|_| ())
    }

    async fn stop_traffic(&self) -> DeviceResult<()> {
        match &self.stop_command {
            Some(cmd) => shell::exec_checked(cmd).await.map(|_| ()),
            None => Ok(()),
        }
    }
}
