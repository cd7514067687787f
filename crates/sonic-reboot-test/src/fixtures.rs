//! Test fixtures for common chassis layouts and console outputs

use sonic_reboot_common::{
    CommandOutput, ComponentOperStatus, ComponentState, ComponentType, OperStatus, RedundantRole,
};

use crate::mock::{MockComponent, MockDevice};

/// Component fixtures
pub mod component_fixtures {
    use super::*;

    /// Controller card with a redundancy role
    pub fn controller_card(name: &str, role: RedundantRole) -> MockComponent {
        MockComponent::new(
            name,
            ComponentType::ControllerCard,
            ComponentState {
                removable: Some(true),
                redundant_role: Some(role),
                oper_status: Some(ComponentOperStatus::Active),
                ..ComponentState::default()
            },
        )
    }

    /// Populated, removable line card
    pub fn linecard(name: &str) -> MockComponent {
        MockComponent::new(
            name,
            ComponentType::Linecard,
            ComponentState {
                removable: Some(true),
                empty: Some(false),
                oper_status: Some(ComponentOperStatus::Active),
                ..ComponentState::default()
            },
        )
    }

    /// Unpopulated line card slot
    pub fn empty_slot(name: &str) -> MockComponent {
        MockComponent::new(
            name,
            ComponentType::Linecard,
            ComponentState {
                removable: Some(true),
                empty: Some(true),
                ..ComponentState::default()
            },
        )
    }

    /// Removable fabric module
    pub fn fabric(name: &str) -> MockComponent {
        MockComponent::new(
            name,
            ComponentType::Fabric,
            ComponentState {
                removable: Some(true),
                oper_status: Some(ComponentOperStatus::Active),
                ..ComponentState::default()
            },
        )
    }

    /// Component that does not report `removable` at all
    pub fn without_removable(mut component: MockComponent) -> MockComponent {
        let state = ComponentState {
            removable: None,
            ..component.state.next_value().unwrap_or_default()
        };
        component.state = crate::mock::Script::constant(state);
        component
    }

    /// Component whose reads go through `during` for `reads` reads after
    /// the first one, then settle on `after`.
    pub fn rebooting(
        component: MockComponent,
        reads: usize,
        during: ComponentState,
        after: ComponentState,
    ) -> MockComponent {
        let mut component = component;
        let before = component.state.next_value().unwrap_or_default();
        let script = std::iter::once(before)
            .chain(std::iter::repeat(during).take(reads))
            .chain(std::iter::once(after));
        component.state = crate::mock::Script::new(script);
        component
    }
}

/// Trap statistics console output fixtures
pub mod trap_stats_fixtures {
    /// Header line of the trap statistics table
    pub const HEADER: &str = "DEV TRAPCODE NAME                        COUNT      RATE";

    /// Table with no packets being dropped
    pub fn clean_table() -> String {
        format!(
            "SENT: Ukern command: show cda trapstats\n\n{}\n  0       12 arp-reply                     100         0\n  0       13 ttl-exceeded                   50         0\n",
            HEADER
        )
    }

    /// Table where `ttl-exceeded` is still being punted
    pub fn dropping_table() -> String {
        format!(
            "{}\n  0       12 arp-reply                     100         0\n  0       13 ttl-exceeded                   50         3\n",
            HEADER
        )
    }

    /// Table cut short in the middle of a row
    pub fn truncated_table() -> String {
        format!("{}\n  0       12 arp-reply                     100         0\n  0       13\n", HEADER)
    }
}

/// Chassis fixtures
pub mod chassis_fixtures {
    use super::*;

    /// Ingress port of the default chassis, hosted by `FPC0`.
    pub const INGRESS_PORT: &str = "et-0/0/0";

    /// Egress port of the default chassis, hosted by `FPC1`.
    pub const EGRESS_PORT: &str = "et-1/0/0";

    /// Modular chassis: two controller cards, two line cards, two fabrics,
    /// two interfaces up.
    pub fn modular_chassis() -> MockDevice {
        MockDevice::new()
            .with_components([
                component_fixtures::controller_card("RE0", RedundantRole::Primary),
                component_fixtures::controller_card("RE1", RedundantRole::Secondary),
                component_fixtures::linecard("FPC0"),
                component_fixtures::linecard("FPC1"),
                component_fixtures::fabric("SIB0"),
                component_fixtures::fabric("SIB1"),
            ])
            .with_interface(INGRESS_PORT, OperStatus::Up)
            .with_interface(EGRESS_PORT, OperStatus::Up)
            .with_default_command_output(CommandOutput::ok(
                super::trap_stats_fixtures::clean_table(),
            ))
    }

    /// Fixed-form-factor device: one controller, no removable units.
    pub fn fixed_chassis() -> MockDevice {
        MockDevice::new()
            .with_component(component_fixtures::controller_card(
                "RE0",
                RedundantRole::Primary,
            ))
            .with_interface(INGRESS_PORT, OperStatus::Up)
    }
}
