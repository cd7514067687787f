//! Platform and reboot types shared by the verifier and its test harness.
//!
//! Names follow the OpenConfig platform model and the gNOI system service.
//! Every attribute read from the device is an `Option`: a leaf the device
//! does not report is a capability gap and must never read as `false`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Hardware component types the verifier knows how to reboot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentType {
    /// Route processor / supervisor card.
    ControllerCard,
    /// Line card (FPC on Juniper platforms).
    Linecard,
    /// Switch fabric module.
    Fabric,
}

impl ComponentType {
    /// Returns the OpenConfig hardware component identity.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::ControllerCard => "CONTROLLER_CARD",
            ComponentType::Linecard => "LINECARD",
            ComponentType::Fabric => "FABRIC",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // gNMI may report the identity with its module prefix.
        let identity = s.rsplit(':').next().unwrap_or(s);
        match identity {
            "CONTROLLER_CARD" => Ok(ComponentType::ControllerCard),
            "LINECARD" => Ok(ComponentType::Linecard),
            "FABRIC" => Ok(ComponentType::Fabric),
            other => Err(format!("unknown component type: {}", other)),
        }
    }
}

/// Redundancy role of a controller card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedundantRole {
    /// Active controller.
    Primary,
    /// Standby controller.
    Secondary,
    /// Role reported but not recognized.
    Unknown,
}

impl RedundantRole {
    /// Returns the OpenConfig enumeration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RedundantRole::Primary => "PRIMARY",
            RedundantRole::Secondary => "SECONDARY",
            RedundantRole::Unknown => "UNKNOWN",
        }
    }

    /// Parses a role, mapping anything unrecognized to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.rsplit(':').next().unwrap_or(s) {
            "PRIMARY" => RedundantRole::Primary,
            "SECONDARY" => RedundantRole::Secondary,
            _ => RedundantRole::Unknown,
        }
    }
}

/// Operational status of a hardware component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentOperStatus {
    Active,
    Inactive,
    Disabled,
}

impl ComponentOperStatus {
    /// Returns the OpenConfig enumeration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentOperStatus::Active => "ACTIVE",
            ComponentOperStatus::Inactive => "INACTIVE",
            ComponentOperStatus::Disabled => "DISABLED",
        }
    }
}

impl FromStr for ComponentOperStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit(':').next().unwrap_or(s) {
            "ACTIVE" => Ok(ComponentOperStatus::Active),
            "INACTIVE" => Ok(ComponentOperStatus::Inactive),
            "DISABLED" => Ok(ComponentOperStatus::Disabled),
            other => Err(format!("unknown component oper-status: {}", other)),
        }
    }
}

/// Component state leaves as read from the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentState {
    pub removable: Option<bool>,
    pub empty: Option<bool>,
    pub redundant_role: Option<RedundantRole>,
    pub oper_status: Option<ComponentOperStatus>,
}

/// Read-only snapshot of one hardware unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescriptor {
    /// Component name, unique within the device (e.g. "FPC0", "RP1").
    pub name: String,
    /// Component type.
    pub component_type: ComponentType,
    /// Whether the unit is field removable, if reported.
    pub removable: Option<bool>,
    /// Whether the slot is unpopulated, if reported.
    pub empty: Option<bool>,
    /// Redundancy role, if reported (controller cards only).
    pub redundant_role: Option<RedundantRole>,
}

impl ComponentDescriptor {
    /// Creates a descriptor with no attributes reported.
    pub fn new(name: impl Into<String>, component_type: ComponentType) -> Self {
        Self {
            name: name.into(),
            component_type,
            removable: None,
            empty: None,
            redundant_role: None,
        }
    }

    /// Builds a descriptor from the state leaves read for `name`.
    pub fn from_state(
        name: impl Into<String>,
        component_type: ComponentType,
        state: &ComponentState,
    ) -> Self {
        Self {
            name: name.into(),
            component_type,
            removable: state.removable,
            empty: state.empty,
            redundant_role: state.redundant_role,
        }
    }

    pub fn with_removable(mut self, removable: bool) -> Self {
        self.removable = Some(removable);
        self
    }

    pub fn with_empty(mut self, empty: bool) -> Self {
        self.empty = Some(empty);
        self
    }

    pub fn with_role(mut self, role: RedundantRole) -> Self {
        self.redundant_role = Some(role);
        self
    }

    /// Returns true only when the device explicitly reports the unit as removable.
    pub fn is_removable(&self) -> bool {
        self.removable == Some(true)
    }

    /// Returns true only when the device explicitly reports the slot as empty.
    pub fn is_empty_slot(&self) -> bool {
        self.empty == Some(true)
    }
}

/// One element of a gNMI-style path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathElem {
    pub name: String,
    pub keys: BTreeMap<String, String>,
}

impl PathElem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: BTreeMap::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.keys.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for PathElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (k, v) in &self.keys {
            write!(f, "[{}={}]", k, v)?;
        }
        Ok(())
    }
}

/// Path identifying a subcomponent in reboot requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentPath {
    pub elems: Vec<PathElem>,
}

impl ComponentPath {
    /// Builds the subcomponent path for a component.
    ///
    /// Some platforms only accept the bare component name instead of the
    /// full `/components/component[name=...]` path.
    pub fn for_component(name: &str, name_only: bool) -> Self {
        let elems = if name_only {
            vec![PathElem::new(name)]
        } else {
            vec![
                PathElem::new("components"),
                PathElem::new("component").with_key("name", name),
            ]
        };
        Self { elems }
    }
}

impl fmt::Display for ComponentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elems.len() == 1 {
            return write!(f, "{}", self.elems[0]);
        }
        for elem in &self.elems {
            write!(f, "/{}", elem)?;
        }
        Ok(())
    }
}

/// gNOI reboot method. Only the full reboot every target must support is
/// issued per component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootMethod {
    Cold,
}

impl RebootMethod {
    /// Returns the gNOI enumeration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RebootMethod::Cold => "COLD",
        }
    }
}

/// The resolved unit to reboot. Built once per case, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebootTarget {
    /// Component the paths were built for.
    pub component: String,
    pub subcomponents: Vec<ComponentPath>,
    pub method: RebootMethod,
}

impl RebootTarget {
    /// Cold reboot of a single component.
    pub fn cold(component: &str, name_only: bool) -> Self {
        Self {
            component: component.to_string(),
            subcomponents: vec![ComponentPath::for_component(component, name_only)],
            method: RebootMethod::Cold,
        }
    }

    /// Builds the status query for this target.
    ///
    /// With `scoped == false` the subcomponent list is omitted, for devices
    /// that only answer chassis-wide status queries.
    pub fn status_request(&self, scoped: bool) -> RebootStatusRequest {
        RebootStatusRequest {
            subcomponents: if scoped {
                self.subcomponents.clone()
            } else {
                Vec::new()
            },
        }
    }
}

/// gNOI `RebootStatus` request. An empty subcomponent list asks about the chassis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebootStatusRequest {
    pub subcomponents: Vec<ComponentPath>,
}

impl RebootStatusRequest {
    pub fn is_scoped(&self) -> bool {
        !self.subcomponents.is_empty()
    }
}

/// Point-in-time answer to "is a reboot still active".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebootStatusSample {
    pub active: bool,
    /// Time the device expects to wait before the reboot, if reported.
    pub wait: Option<Duration>,
    pub reason: Option<String>,
    /// Number of reboots the device has seen, if reported.
    pub count: Option<u32>,
}

impl RebootStatusSample {
    pub fn active() -> Self {
        Self {
            active: true,
            ..Self::default()
        }
    }

    pub fn inactive() -> Self {
        Self::default()
    }
}

/// Interface operational status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperStatus {
    Up,
    Down,
    Testing,
    Unknown,
    Dormant,
    NotPresent,
    LowerLayerDown,
}

impl OperStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperStatus::Up => "UP",
            OperStatus::Down => "DOWN",
            OperStatus::Testing => "TESTING",
            OperStatus::Unknown => "UNKNOWN",
            OperStatus::Dormant => "DORMANT",
            OperStatus::NotPresent => "NOT_PRESENT",
            OperStatus::LowerLayerDown => "LOWER_LAYER_DOWN",
        }
    }

    /// Parses an oper-status, mapping anything unrecognized to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "UP" => OperStatus::Up,
            "DOWN" => OperStatus::Down,
            "TESTING" => OperStatus::Testing,
            "DORMANT" => OperStatus::Dormant,
            "NOT_PRESENT" => OperStatus::NotPresent,
            "LOWER_LAYER_DOWN" => OperStatus::LowerLayerDown,
            _ => OperStatus::Unknown,
        }
    }
}

/// Interface counters the verifier reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub in_pkts: u64,
}

/// Result of a console command. A non-empty `error` means the device
/// refused or failed the command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub output: String,
    pub error: String,
}

impl CommandOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            error: String::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            error: error.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}
