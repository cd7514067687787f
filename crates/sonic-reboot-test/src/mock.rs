//! Scriptable in-memory device.
//!
//! `MockDevice` implements every device trait from `sonic-reboot-common`.
//! Answers come from per-call scripts: each read pops the next scripted
//! value and the last one sticks, so a script of `[Down, Up]` reads as
//! down once and up forever after. Every request is recorded for later
//! inspection (see [`crate::CallVerifier`]).

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use sonic_reboot_common::{
    CommandOutput, CommandRunner, ComponentState, ComponentType, DeviceError, DeviceResult,
    InterfaceCounters, OperStatus, RebootService, RebootStatusRequest, RebootStatusSample,
    RebootTarget, StateReader, TrafficGenerator,
};
use tracing::debug;

/// Values returned in order; the last one repeats.
#[derive(Debug, Clone)]
pub struct Script<T> {
    values: VecDeque<T>,
}

impl<T: Clone> Script<T> {
    pub fn new(values: impl IntoIterator<Item = T>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn constant(value: T) -> Self {
        Self::new([value])
    }

    /// Next value, or `None` for an empty script.
    pub fn next_value(&mut self) -> Option<T> {
        if self.values.len() > 1 {
            self.values.pop_front()
        } else {
            self.values.front().cloned()
        }
    }
}

/// One hardware component of the mock chassis.
#[derive(Debug, Clone)]
pub struct MockComponent {
    pub name: String,
    pub component_type: ComponentType,
    pub state: Script<ComponentState>,
}

impl MockComponent {
    pub fn new(
        name: impl Into<String>,
        component_type: ComponentType,
        state: ComponentState,
    ) -> Self {
        Self {
            name: name.into(),
            component_type,
            state: Script::constant(state),
        }
    }

    /// Replaces the state with a per-read script.
    pub fn with_state_script(mut self, states: impl IntoIterator<Item = ComponentState>) -> Self {
        self.state = Script::new(states);
        self
    }
}

/// Everything the mock has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    pub reboots: Vec<RebootTarget>,
    pub status_requests: Vec<RebootStatusRequest>,
    pub commands: Vec<String>,
    pub component_reads: Vec<String>,
    pub counter_reads: Vec<String>,
}

#[derive(Default)]
struct MockState {
    components: Vec<MockComponent>,
    /// Pending `RebootStatus` answers; empty means "not active".
    status_answers: VecDeque<DeviceResult<RebootStatusSample>>,
    /// Error returned by every `RebootStatus` once the script is exhausted.
    status_unimplemented: bool,
    reboot_rejection: Option<String>,
    interfaces: BTreeMap<String, Script<OperStatus>>,
    counters: BTreeMap<String, Script<u64>>,
    command_answers: VecDeque<DeviceResult<CommandOutput>>,
    default_command_output: CommandOutput,
    calls: CallLog,
}

/// In-memory device under test.
#[derive(Default)]
pub struct MockDevice {
    state: Mutex<MockState>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, component: MockComponent) -> Self {
        self.state.get_mut().components.push(component);
        self
    }

    pub fn with_components(mut self, components: impl IntoIterator<Item = MockComponent>) -> Self {
        self.state.get_mut().components.extend(components);
        self
    }

    /// Queues `RebootStatus` answers.
    pub fn with_status_answers(
        mut self,
        answers: impl IntoIterator<Item = DeviceResult<RebootStatusSample>>,
    ) -> Self {
        self.state.get_mut().status_answers.extend(answers);
        self
    }

    /// Reports the reboot as active for the next `queries` status queries.
    pub fn with_active_reboot(self, queries: usize) -> Self {
        self.with_status_answers((0..queries).map(|_| Ok(RebootStatusSample::active())))
    }

    /// Answers every `RebootStatus` with `Unimplemented`.
    pub fn with_status_unimplemented(mut self) -> Self {
        self.state.get_mut().status_unimplemented = true;
        self
    }

    /// Rejects every reboot request with `reason`.
    pub fn rejecting_reboots(mut self, reason: impl Into<String>) -> Self {
        self.state.get_mut().reboot_rejection = Some(reason.into());
        self
    }

    pub fn with_interface(self, name: impl Into<String>, status: OperStatus) -> Self {
        self.with_interface_script(name, [status])
    }

    /// Scripts the oper-status reads of one interface.
    pub fn with_interface_script(
        mut self,
        name: impl Into<String>,
        statuses: impl IntoIterator<Item = OperStatus>,
    ) -> Self {
        self.state
            .get_mut()
            .interfaces
            .insert(name.into(), Script::new(statuses));
        self
    }

    /// Scripts the `in-pkts` reads of one interface.
    pub fn with_counters(
        mut self,
        name: impl Into<String>,
        in_pkts: impl IntoIterator<Item = u64>,
    ) -> Self {
        self.state
            .get_mut()
            .counters
            .insert(name.into(), Script::new(in_pkts));
        self
    }

    /// Queues console command answers.
    pub fn with_command_answers(
        mut self,
        answers: impl IntoIterator<Item = DeviceResult<CommandOutput>>,
    ) -> Self {
        self.state.get_mut().command_answers.extend(answers);
        self
    }

    /// Output returned once the queued answers run out.
    pub fn with_default_command_output(mut self, output: CommandOutput) -> Self {
        self.state.get_mut().default_command_output = output;
        self
    }

    /// Snapshot of the calls made so far.
    pub fn calls(&self) -> CallLog {
        self.state.lock().calls.clone()
    }

    pub fn reboots(&self) -> Vec<RebootTarget> {
        self.state.lock().calls.reboots.clone()
    }

    pub fn status_requests(&self) -> Vec<RebootStatusRequest> {
        self.state.lock().calls.status_requests.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().calls.commands.clone()
    }
}

#[async_trait]
impl RebootService for MockDevice {
    async fn reboot(&self, target: &RebootTarget) -> DeviceResult<()> {
        let mut state = self.state.lock();
        debug!(component = %target.component, "Mock reboot");
        state.calls.reboots.push(target.clone());
        match &state.reboot_rejection {
            Some(reason) => Err(DeviceError::rejected("Reboot", reason.clone())),
            None => Ok(()),
        }
    }

    async fn reboot_status(
        &self,
        request: &RebootStatusRequest,
    ) -> DeviceResult<RebootStatusSample> {
        let mut state = self.state.lock();
        state.calls.status_requests.push(request.clone());
        match state.status_answers.pop_front() {
            Some(answer) => answer,
            None if state.status_unimplemented => Err(DeviceError::unimplemented(
                "RebootStatus",
                "unknown method RebootStatus",
            )),
            None => Ok(RebootStatusSample::inactive()),
        }
    }
}

#[async_trait]
impl StateReader for MockDevice {
    async fn components_of_type(
        &self,
        component_type: ComponentType,
    ) -> DeviceResult<Vec<String>> {
        let state = self.state.lock();
        Ok(state
            .components
            .iter()
            .filter(|c| c.component_type == component_type)
            .map(|c| c.name.clone())
            .collect())
    }

    async fn component_state(&self, name: &str) -> DeviceResult<ComponentState> {
        let mut state = self.state.lock();
        state.calls.component_reads.push(name.to_string());
        let component = state
            .components
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| DeviceError::transport("Get", format!("no component {}", name)))?;
        Ok(component.state.next_value().unwrap_or_default())
    }

    async fn interface_names(&self) -> DeviceResult<Vec<String>> {
        Ok(self.state.lock().interfaces.keys().cloned().collect())
    }

    async fn interface_oper_status(&self, name: &str) -> DeviceResult<OperStatus> {
        let mut state = self.state.lock();
        Ok(state
            .interfaces
            .get_mut(name)
            .and_then(Script::next_value)
            .unwrap_or(OperStatus::NotPresent))
    }

    async fn interface_counters(&self, name: &str) -> DeviceResult<InterfaceCounters> {
        let mut state = self.state.lock();
        state.calls.counter_reads.push(name.to_string());
        let in_pkts = state
            .counters
            .get_mut(name)
            .and_then(Script::next_value)
            .ok_or_else(|| DeviceError::decode(name, "in-pkts not reported"))?;
        Ok(InterfaceCounters { in_pkts })
    }
}

#[async_trait]
impl CommandRunner for MockDevice {
    async fn run_command(&self, command: &str) -> DeviceResult<CommandOutput> {
        let mut state = self.state.lock();
        state.calls.commands.push(command.to_string());
        match state.command_answers.pop_front() {
            Some(answer) => answer,
            None => Ok(state.default_command_output.clone()),
        }
    }
}

/// Traffic generator that counts start/stop calls.
#[derive(Default)]
pub struct MockTrafficGenerator {
    fail_start: bool,
    fail_stop: bool,
    counts: Mutex<(u32, u32)>,
}

impl MockTrafficGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn failing_stop() -> Self {
        Self {
            fail_stop: true,
            ..Self::default()
        }
    }

    pub fn starts(&self) -> u32 {
        self.counts.lock().0
    }

    pub fn stops(&self) -> u32 {
        self.counts.lock().1
    }
}

#[async_trait]
impl TrafficGenerator for MockTrafficGenerator {
    async fn start_traffic(&self) -> DeviceResult<()> {
        self.counts.lock().0 += 1;
        if self.fail_start {
            return Err(DeviceError::transport("StartTraffic", "generator unreachable"));
        }
        Ok(())
    }

    async fn stop_traffic(&self) -> DeviceResult<()> {
        self.counts.lock().1 += 1;
        if self.fail_stop {
            return Err(DeviceError::transport("StopTraffic", "generator unreachable"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_script_last_value_sticks() {
        let mut script = Script::new([1, 2, 3]);
        assert_eq!(script.next_value(), Some(1));
        assert_eq!(script.next_value(), Some(2));
        assert_eq!(script.next_value(), Some(3));
        assert_eq!(script.next_value(), Some(3));

        let mut empty: Script<u32> = Script::new([]);
        assert_eq!(empty.next_value(), None);
    }

    #[tokio::test]
    async fn test_status_answers_then_inactive() {
        let device = MockDevice::new().with_active_reboot(2);
        let request = RebootStatusRequest::default();
        assert!(device.reboot_status(&request).await.unwrap().active);
        assert!(device.reboot_status(&request).await.unwrap().active);
        assert!(!device.reboot_status(&request).await.unwrap().active);
        assert_eq!(device.status_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_status_unimplemented() {
        let device = MockDevice::new().with_status_unimplemented();
        let err = device
            .reboot_status(&RebootStatusRequest::default())
            .await
            .unwrap_err();
        assert!(err.is_unimplemented());
    }

    #[tokio::test]
    async fn test_reboot_rejection_recorded() {
        let device = MockDevice::new().rejecting_reboots("reboot already pending");
        let target = RebootTarget::cold("RP0", false);
        assert!(matches!(
            device.reboot(&target).await,
            Err(DeviceError::Rejected { .. })
        ));
        assert_eq!(device.reboots(), vec![target]);
    }

    #[tokio::test]
    async fn test_component_reads() {
        let device = MockDevice::new().with_component(
            MockComponent::new("FPC0", ComponentType::Linecard, ComponentState::default())
                .with_state_script([
                    ComponentState::default(),
                    ComponentState {
                        removable: Some(true),
                        ..ComponentState::default()
                    },
                ]),
        );
        assert_eq!(
            device.components_of_type(ComponentType::Linecard).await.unwrap(),
            vec!["FPC0".to_string()]
        );
        assert!(device
            .components_of_type(ComponentType::Fabric)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(device.component_state("FPC0").await.unwrap().removable, None);
        assert_eq!(
            device.component_state("FPC0").await.unwrap().removable,
            Some(true)
        );
        assert!(device.component_state("FPC9").await.is_err());
    }

    #[tokio::test]
    async fn test_commands_and_counters() {
        let device = MockDevice::new()
            .with_counters("et-0/0/0", [10, 20])
            .with_command_answers([Ok(CommandOutput::failed("target not online"))])
            .with_default_command_output(CommandOutput::ok("done"));

        assert_eq!(
            device.interface_counters("et-0/0/0").await.unwrap().in_pkts,
            10
        );
        assert_eq!(
            device.interface_counters("et-0/0/0").await.unwrap().in_pkts,
            20
        );
        assert!(device.interface_counters("et-0/0/1").await.is_err());

        assert!(device.run_command("show a").await.unwrap().is_error());
        assert_eq!(device.run_command("show b").await.unwrap().output, "done");
        assert_eq!(device.commands(), vec!["show a", "show b"]);
    }

    #[tokio::test]
    async fn test_traffic_generator_counts() {
        let generator = MockTrafficGenerator::failing_stop();
        assert!(generator.start_traffic().await.is_ok());
        assert!(generator.stop_traffic().await.is_err());
        assert_eq!((generator.starts(), generator.stops()), (1, 1));
    }
}
