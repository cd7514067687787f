//! Component selection: which unit each case reboots.
//!
//! Selection works on an inventory snapshot and never talks to the device.
//! A missing precondition (not enough cards, nothing removable on a fixed
//! platform) yields [`Selection::Skip`]; a disagreement with the declared
//! topology is a [`VerifyError`].

use sonic_reboot_common::{ComponentDescriptor, ComponentType, RedundantRole, StateReader};
use tracing::{debug, info};

use crate::config::ExpectedCount;
use crate::error::{VerifyError, VerifyResult};

/// Outcome of a selection step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    /// The case can proceed with this value.
    Selected(T),
    /// The environment cannot run the case.
    Skip(String),
}

/// Standby and active controller cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerPair {
    pub standby: ComponentDescriptor,
    pub active: ComponentDescriptor,
}

/// Reads the inventory of one component type from the device.
pub async fn fetch_inventory<R>(
    reader: &R,
    component_type: ComponentType,
) -> VerifyResult<Vec<ComponentDescriptor>>
where
    R: StateReader + ?Sized,
{
    let names = reader
        .components_of_type(component_type)
        .await
        .map_err(|e| VerifyError::device(format!("list {} components", component_type), e))?;

    let mut inventory = Vec::with_capacity(names.len());
    for name in names {
        let state = reader
            .component_state(&name)
            .await
            .map_err(|e| VerifyError::device(format!("read state of {}", name), e))?;
        inventory.push(ComponentDescriptor::from_state(name, component_type, &state));
    }
    info!(%component_type, count = inventory.len(), "Fetched component inventory");
    Ok(inventory)
}

/// Components of exactly `component_type`.
pub fn filter_by_type(
    inventory: &[ComponentDescriptor],
    component_type: ComponentType,
) -> Vec<ComponentDescriptor> {
    inventory
        .iter()
        .filter(|c| c.component_type == component_type)
        .cloned()
        .collect()
}

fn check_count(
    component_type: ComponentType,
    expected: ExpectedCount,
    actual: usize,
) -> VerifyResult<()> {
    match expected.declared() {
        Some(declared) if declared != actual => Err(VerifyError::TopologyMismatch {
            component_type,
            expected: expected.0,
            actual,
        }),
        _ => Ok(()),
    }
}

/// Components explicitly reported as removable.
///
/// When `only` is set, every other component is ignored.
pub fn removable_components(
    candidates: &[ComponentDescriptor],
    only: Option<&str>,
) -> Vec<ComponentDescriptor> {
    candidates
        .iter()
        .filter(|c| only.map_or(true, |name| c.name == name))
        .filter(|c| match c.removable {
            Some(true) => {
                info!(component = %c.name, "Found removable component");
                true
            }
            Some(false) => {
                info!(component = %c.name, "Detected non-removable component");
                false
            }
            None => {
                info!(component = %c.name, "Component does not report removable, excluding");
                false
            }
        })
        .cloned()
        .collect()
}

fn pick_removable(
    component_type: ComponentType,
    candidates: &[ComponentDescriptor],
    expected: ExpectedCount,
    only: Option<&str>,
) -> VerifyResult<Selection<ComponentDescriptor>> {
    match removable_components(candidates, only).into_iter().next() {
        Some(component) => Ok(Selection::Selected(component)),
        None if expected.is_positive() => {
            Err(VerifyError::NoRemovableComponent { component_type })
        }
        None => Ok(Selection::Skip(format!(
            "No removable {} component found for the testing",
            component_type
        ))),
    }
}

/// Picks the standby/active controller pair.
pub fn select_controller_cards(
    inventory: &[ComponentDescriptor],
    expected: ExpectedCount,
) -> VerifyResult<Selection<ControllerPair>> {
    let cards = filter_by_type(inventory, ComponentType::ControllerCard);
    debug!(cards = ?names(&cards), "Found controller card list");

    check_count(ComponentType::ControllerCard, expected, cards.len())?;

    if cards.len() < 2 {
        return Ok(Selection::Skip(format!(
            "Not enough controller cards for the test: got {}, want at least 2",
            cards.len()
        )));
    }

    let find = |role: RedundantRole| {
        let mut matching = cards.iter().filter(|c| c.redundant_role == Some(role));
        match (matching.next(), matching.count()) {
            (Some(card), 0) => Ok(card.clone()),
            (Some(_), others) => Err(VerifyError::RedundancyRoleAmbiguous {
                role: role.as_str(),
                count: others + 1,
            }),
            (None, _) => Err(VerifyError::RedundancyRoleNotFound {
                role: role.as_str(),
            }),
        }
    };
    let standby = find(RedundantRole::Secondary)?;
    let active = find(RedundantRole::Primary)?;
    info!(standby = %standby.name, active = %active.name, "Detected controller cards");

    Ok(Selection::Selected(ControllerPair { standby, active }))
}

/// Line cards considered for the test.
///
/// Empty slots are dropped only when the inventory is larger than the
/// declared count; platforms that cannot report emptiness keep everything.
pub fn present_linecards(
    inventory: &[ComponentDescriptor],
    expected: ExpectedCount,
) -> Vec<ComponentDescriptor> {
    let linecards = filter_by_type(inventory, ComponentType::Linecard);
    if expected.is_exceeded_by(linecards.len()) {
        linecards.into_iter().filter(|c| !c.is_empty_slot()).collect()
    } else {
        linecards
    }
}

/// Picks the line card to reboot.
///
/// `pinned` restricts the choice to one named card (see
/// [`crate::cases::fpc_from_port`]).
pub fn select_linecard(
    inventory: &[ComponentDescriptor],
    expected: ExpectedCount,
    pinned: Option<&str>,
) -> VerifyResult<Selection<ComponentDescriptor>> {
    let linecards = present_linecards(inventory, expected);
    debug!(linecards = ?names(&linecards), "Found linecard list");

    check_count(ComponentType::Linecard, expected, linecards.len())?;

    if linecards.is_empty() {
        return Ok(Selection::Skip(
            "Not enough linecards for the test: got 0, want > 0".to_string(),
        ));
    }

    pick_removable(ComponentType::Linecard, &linecards, expected, pinned)
}

/// Picks the fabric component to reboot.
pub fn select_fabric(
    inventory: &[ComponentDescriptor],
    expected: ExpectedCount,
) -> VerifyResult<Selection<ComponentDescriptor>> {
    let fabrics = filter_by_type(inventory, ComponentType::Fabric);
    debug!(fabrics = ?names(&fabrics), "Found fabric components");

    check_count(ComponentType::Fabric, expected, fabrics.len())?;

    pick_removable(ComponentType::Fabric, &fabrics, expected, None)
}

fn names(components: &[ComponentDescriptor]) -> Vec<&str> {
    components.iter().map(|c| c.name.as_str()).collect()
}
