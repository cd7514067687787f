//! End-to-end reboot case tests against the mock device
//!
//! Time is paused: settle delays, 10 s status polling and 30 s traffic
//! sampling run instantly.

use sonic_reboot_common::{
    CommandOutput, ComponentOperStatus, ComponentState, DeviceError, OperStatus, RedundantRole,
};
use sonic_reboot_test::{
    chassis_fixtures::{self, EGRESS_PORT, INGRESS_PORT},
    component_fixtures, trap_stats_fixtures, CallVerifier, MockDevice, MockTrafficGenerator,
};
use sonic_reboot_verify::{
    CaseOutcome, ExpectedCount, RebootCase, RebootVerifier, Vendor, VerifyConfig, VerifyError,
};
use std::time::Duration;

fn config() -> VerifyConfig {
    VerifyConfig::default()
}

fn juniper_config(ingress: &str) -> VerifyConfig {
    let mut config = config();
    config.vendor = Vendor::Juniper;
    config.topology.ports = vec![ingress.to_string()];
    config
}

async fn run(device: &MockDevice, config: &VerifyConfig, case: RebootCase) -> CaseOutcome {
    RebootVerifier::new(device, config)
        .run_case(case)
        .await
        .outcome
}

// ---------------------------------------------------------------------------
// Line card
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_linecard_reboot_passes() {
    let device = chassis_fixtures::modular_chassis().with_active_reboot(4);
    let config = config();

    let outcome = run(&device, &config, RebootCase::Linecard).await;
    assert!(matches!(outcome, CaseOutcome::Passed), "{:?}", outcome);

    let verifier = CallVerifier::of(&device);
    verifier.assert_cold_reboot("FPC0").unwrap();
    verifier.assert_reboot_count(1).unwrap();
    verifier.assert_status_query_count(5).unwrap();
    // Traffic check is Juniper only.
    verifier.assert_command_count(0).unwrap();

    let requests = device.status_requests();
    assert_eq!(
        requests[0].subcomponents[0].to_string(),
        "/components/component[name=FPC0]"
    );
}

#[tokio::test(start_paused = true)]
async fn test_linecard_reboot_name_only_paths() {
    let device = chassis_fixtures::modular_chassis();
    let mut config = config();
    config.deviations.subcomponent_path_name_only = true;

    let outcome = run(&device, &config, RebootCase::Linecard).await;
    assert!(matches!(outcome, CaseOutcome::Passed), "{:?}", outcome);
    assert_eq!(device.reboots()[0].subcomponents[0].to_string(), "FPC0");
}

#[tokio::test(start_paused = true)]
async fn test_linecard_skips_empty_slots() {
    let device = MockDevice::new()
        .with_components([
            component_fixtures::empty_slot("FPC0"),
            component_fixtures::linecard("FPC1"),
            component_fixtures::empty_slot("FPC2"),
            component_fixtures::linecard("FPC3"),
            component_fixtures::linecard("FPC4"),
        ])
        .with_interface(INGRESS_PORT, OperStatus::Up);
    let mut config = config();
    config.topology.linecards = ExpectedCount(3);

    let outcome = run(&device, &config, RebootCase::Linecard).await;
    assert!(matches!(outcome, CaseOutcome::Passed), "{:?}", outcome);
    CallVerifier::of(&device).assert_cold_reboot("FPC1").unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_linecard_topology_mismatch_fails_without_reboot() {
    let device = chassis_fixtures::modular_chassis();
    let mut config = config();
    config.topology.linecards = ExpectedCount(3);

    let outcome = run(&device, &config, RebootCase::Linecard).await;
    assert!(
        matches!(
            outcome,
            CaseOutcome::Failed(VerifyError::TopologyMismatch {
                expected: 3,
                actual: 2,
                ..
            })
        ),
        "{:?}",
        outcome
    );
    CallVerifier::of(&device).assert_reboot_count(0).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_linecard_status_unimplemented_is_fatal() {
    let device = chassis_fixtures::modular_chassis().with_status_unimplemented();
    let config = config();

    let outcome = run(&device, &config, RebootCase::Linecard).await;
    assert!(
        matches!(
            outcome,
            CaseOutcome::Failed(VerifyError::StatusUnimplemented { .. })
        ),
        "{:?}",
        outcome
    );
    CallVerifier::of(&device)
        .assert_status_query_count(1)
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_linecard_reboot_never_completes() {
    let device = chassis_fixtures::modular_chassis().with_active_reboot(1000);
    let config = config();

    match run(&device, &config, RebootCase::Linecard).await {
        CaseOutcome::Failed(VerifyError::Timeout { what, elapsed, .. }) => {
            assert_eq!(what, "reboot of FPC0");
            assert!(elapsed >= config.timing.linecard_boot());
        }
        other => panic!("Expected Timeout, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_linecard_transient_status_errors_are_retried() {
    let device = chassis_fixtures::modular_chassis().with_status_answers([
        Err(DeviceError::transport("RebootStatus", "connection refused")),
        Err(DeviceError::transport("RebootStatus", "connection refused")),
    ]);
    let config = config();

    let outcome = run(&device, &config, RebootCase::Linecard).await;
    assert!(matches!(outcome, CaseOutcome::Passed), "{:?}", outcome);
    CallVerifier::of(&device)
        .assert_status_query_count(3)
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_linecard_waits_for_removable_again() {
    let down = ComponentState::default();
    let up = ComponentState {
        removable: Some(true),
        empty: Some(false),
        ..ComponentState::default()
    };
    let device = MockDevice::new()
        .with_component(component_fixtures::rebooting(
            component_fixtures::linecard("FPC0"),
            3,
            down,
            up,
        ))
        .with_interface(INGRESS_PORT, OperStatus::Up);
    let config = config();

    let outcome = run(&device, &config, RebootCase::Linecard).await;
    assert!(matches!(outcome, CaseOutcome::Passed), "{:?}", outcome);
    // Inventory read + three reads while down + the read that sees it back.
    assert_eq!(device.calls().component_reads.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_linecard_reboot_rejected() {
    let device = chassis_fixtures::modular_chassis()
        .rejecting_reboots("reboot of the active control processor pending");
    let config = config();

    match run(&device, &config, RebootCase::Linecard).await {
        CaseOutcome::Failed(VerifyError::RebootRejected { component, reason }) => {
            assert_eq!(component, "FPC0");
            assert!(reason.contains("pending"));
        }
        other => panic!("Expected RebootRejected, got {:?}", other),
    }
    CallVerifier::of(&device)
        .assert_status_query_count(0)
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_linecard_fixed_platform_skips() {
    let device = MockDevice::new().with_component(component_fixtures::without_removable(
        component_fixtures::linecard("FPC0"),
    ));
    let config = config();

    let outcome = run(&device, &config, RebootCase::Linecard).await;
    assert!(matches!(outcome, CaseOutcome::Skipped(_)), "{:?}", outcome);
}

// ---------------------------------------------------------------------------
// Line card traffic-drop check (Juniper)
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_juniper_linecard_pinned_to_ingress_port() {
    let device = chassis_fixtures::modular_chassis().with_counters(EGRESS_PORT, [100, 5000]);
    let traffic = MockTrafficGenerator::new();
    let config = juniper_config(EGRESS_PORT);

    let report = RebootVerifier::new(&device, &config)
        .with_traffic(&traffic)
        .run_case(RebootCase::Linecard)
        .await;
    assert!(matches!(report.outcome, CaseOutcome::Passed), "{}", report);

    let verifier = CallVerifier::of(&device);
    verifier.assert_cold_reboot("FPC1").unwrap();
    verifier.assert_not_rebooted("FPC0").unwrap();
    verifier
        .assert_command_executed(
            "request pfe execute target fpc1 command \"show cda trapstats\" | no-more",
        )
        .unwrap();
    verifier.assert_command_count(10).unwrap();
    assert_eq!((traffic.starts(), traffic.stops()), (1, 1));
    // Ten 30 s samples after the reboot.
    assert!(report.elapsed >= Duration::from_secs(300));
}

#[tokio::test(start_paused = true)]
async fn test_juniper_drop_violation_does_not_abort_sampling() {
    let device = chassis_fixtures::modular_chassis()
        .with_counters(INGRESS_PORT, [100, 5000])
        .with_command_answers([
            Ok(CommandOutput::ok(trap_stats_fixtures::clean_table())),
            Ok(CommandOutput::ok(trap_stats_fixtures::dropping_table())),
        ]);
    let traffic = MockTrafficGenerator::new();
    let config = juniper_config(INGRESS_PORT);

    let report = RebootVerifier::new(&device, &config)
        .with_traffic(&traffic)
        .run_case(RebootCase::Linecard)
        .await;
    match report.outcome {
        CaseOutcome::Failed(VerifyError::NonZeroDropRate { count, summary }) => {
            assert_eq!(count, 1);
            assert!(summary.contains("ttl-exceeded rate 3"));
        }
        other => panic!("Expected NonZeroDropRate, got {:?}", other),
    }
    CallVerifier::of(&device).assert_command_count(10).unwrap();
    assert_eq!(traffic.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_juniper_parse_failure_aborts_sampling() {
    let device = chassis_fixtures::modular_chassis()
        .with_counters(INGRESS_PORT, [100, 5000])
        .with_command_answers([
            Ok(CommandOutput::ok(trap_stats_fixtures::clean_table())),
            Ok(CommandOutput::ok(trap_stats_fixtures::truncated_table())),
        ]);
    let traffic = MockTrafficGenerator::new();
    let config = juniper_config(INGRESS_PORT);

    let report = RebootVerifier::new(&device, &config)
        .with_traffic(&traffic)
        .run_case(RebootCase::Linecard)
        .await;
    match report.outcome {
        CaseOutcome::Failed(VerifyError::MalformedLine { line }) => {
            assert_eq!(line, "  0       13");
        }
        other => panic!("Expected MalformedLine, got {:?}", other),
    }
    CallVerifier::of(&device).assert_command_count(2).unwrap();
    assert_eq!(traffic.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_juniper_command_error_aborts_sampling() {
    let device = chassis_fixtures::modular_chassis()
        .with_counters(INGRESS_PORT, [100, 5000])
        .with_command_answers([Ok(CommandOutput::failed("error: fpc0 not online"))]);
    let traffic = MockTrafficGenerator::new();
    let config = juniper_config(INGRESS_PORT);

    let report = RebootVerifier::new(&device, &config)
        .with_traffic(&traffic)
        .run_case(RebootCase::Linecard)
        .await;
    match report.outcome {
        CaseOutcome::Failed(VerifyError::CommandFailed { error, .. }) => {
            assert_eq!(error, "error: fpc0 not online");
        }
        other => panic!("Expected CommandFailed, got {:?}", other),
    }
    CallVerifier::of(&device).assert_command_count(1).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_juniper_flat_ingress_counter_fails() {
    let device = chassis_fixtures::modular_chassis().with_counters(INGRESS_PORT, [100]);
    let traffic = MockTrafficGenerator::new();
    let config = juniper_config(INGRESS_PORT);

    let report = RebootVerifier::new(&device, &config)
        .with_traffic(&traffic)
        .run_case(RebootCase::Linecard)
        .await;
    assert!(
        matches!(
            report.outcome,
            CaseOutcome::Failed(VerifyError::TrafficNotFlowing {
                before: 100,
                after: 100,
                ..
            })
        ),
        "{}",
        report
    );
}

#[tokio::test(start_paused = true)]
async fn test_juniper_without_traffic_generator_skips() {
    let device = chassis_fixtures::modular_chassis().with_counters(INGRESS_PORT, [100, 5000]);
    let config = juniper_config(INGRESS_PORT);

    match run(&device, &config, RebootCase::Linecard).await {
        CaseOutcome::Skipped(reason) => {
            assert_eq!(reason, "traffic-drop check needs a traffic generator");
        }
        other => panic!("Expected Skipped, got {:?}", other),
    }
    let verifier = CallVerifier::of(&device);
    verifier.assert_cold_reboot("FPC0").unwrap();
    verifier.assert_command_count(0).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_juniper_invalid_port_name_fails() {
    let device = chassis_fixtures::modular_chassis();
    let config = juniper_config("Ethernet0");

    let outcome = run(&device, &config, RebootCase::Linecard).await;
    assert!(
        matches!(outcome, CaseOutcome::Failed(VerifyError::InvalidPortName { .. })),
        "{:?}",
        outcome
    );
    CallVerifier::of(&device).assert_reboot_count(0).unwrap();
}

// ---------------------------------------------------------------------------
// Standby controller card
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_standby_controller_reboot_passes() {
    let device = MockDevice::new().with_components([
        component_fixtures::controller_card("RE0", RedundantRole::Primary),
        component_fixtures::rebooting(
            component_fixtures::controller_card("RE1", RedundantRole::Secondary),
            2,
            ComponentState::default(),
            ComponentState {
                redundant_role: Some(RedundantRole::Secondary),
                ..ComponentState::default()
            },
        ),
    ]);
    let mut config = config();
    config.topology.controller_cards = ExpectedCount(2);

    let report = RebootVerifier::new(&device, &config)
        .run_case(RebootCase::StandbyControllerCard)
        .await;
    assert!(matches!(report.outcome, CaseOutcome::Passed), "{}", report);
    assert!(report.elapsed >= config.timing.controller_settle());

    let verifier = CallVerifier::of(&device);
    verifier.assert_cold_reboot("RE1").unwrap();
    verifier.assert_not_rebooted("RE0").unwrap();
    verifier.assert_status_query_count(0).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_standby_controller_single_card_skips() {
    let device = chassis_fixtures::fixed_chassis();
    let config = config();

    let outcome = run(&device, &config, RebootCase::StandbyControllerCard).await;
    assert!(matches!(outcome, CaseOutcome::Skipped(_)), "{:?}", outcome);
    CallVerifier::of(&device).assert_reboot_count(0).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_standby_controller_never_returns() {
    let device = MockDevice::new().with_components([
        component_fixtures::controller_card("RE0", RedundantRole::Primary),
        component_fixtures::rebooting(
            component_fixtures::controller_card("RE1", RedundantRole::Secondary),
            0,
            ComponentState::default(),
            ComponentState::default(),
        ),
    ]);
    let config = config();

    match run(&device, &config, RebootCase::StandbyControllerCard).await {
        CaseOutcome::Failed(VerifyError::Timeout { what, .. }) => {
            assert_eq!(what, "redundant role of RE1");
        }
        other => panic!("Expected Timeout, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Fabric
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_fabric_reboot_unsupported_deviation_skips() {
    let device = chassis_fixtures::modular_chassis();
    let mut config = config();
    config.deviations.fabric_reboot_unsupported = true;

    let outcome = run(&device, &config, RebootCase::Fabric).await;
    assert!(matches!(outcome, CaseOutcome::Skipped(_)), "{:?}", outcome);
    CallVerifier::of(&device).assert_reboot_count(0).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_fabric_reboot_passes_with_unscoped_status() {
    let inactive = ComponentState {
        removable: Some(true),
        oper_status: Some(ComponentOperStatus::Inactive),
        ..ComponentState::default()
    };
    let active = ComponentState {
        removable: Some(true),
        oper_status: Some(ComponentOperStatus::Active),
        ..ComponentState::default()
    };
    let device = MockDevice::new()
        .with_components([
            component_fixtures::without_removable(component_fixtures::fabric("SIB0")),
            component_fixtures::rebooting(component_fixtures::fabric("SIB1"), 4, inactive, active),
        ])
        .with_interface(INGRESS_PORT, OperStatus::Up)
        .with_active_reboot(2);
    let mut config = config();
    config.topology.fabrics = ExpectedCount(2);
    config.deviations.reboot_status_subcomponents_unsupported = true;

    let outcome = run(&device, &config, RebootCase::Fabric).await;
    assert!(matches!(outcome, CaseOutcome::Passed), "{:?}", outcome);

    let verifier = CallVerifier::of(&device);
    verifier.assert_cold_reboot("SIB1").unwrap();
    verifier.assert_status_query_count(3).unwrap();
    assert!(device.status_requests().iter().all(|r| !r.is_scoped()));
}

#[tokio::test(start_paused = true)]
async fn test_fabric_interfaces_not_recovering() {
    let device = chassis_fixtures::modular_chassis()
        .with_interface_script(EGRESS_PORT, [OperStatus::Up, OperStatus::Down]);
    let config = config();

    match run(&device, &config, RebootCase::Fabric).await {
        CaseOutcome::Failed(VerifyError::Timeout {
            what,
            timeout,
            last_observed,
            ..
        }) => {
            assert_eq!(what, "interface recovery");
            assert_eq!(timeout, config.timing.fabric_interface_recovery());
            assert!(last_observed.contains(EGRESS_PORT), "{}", last_observed);
            assert!(!last_observed.contains(INGRESS_PORT), "{}", last_observed);
        }
        other => panic!("Expected Timeout, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_fabric_no_removable_on_modular_device_fails() {
    let device = MockDevice::new().with_components([
        component_fixtures::without_removable(component_fixtures::fabric("SIB0")),
        component_fixtures::without_removable(component_fixtures::fabric("SIB1")),
    ]);
    let mut config = config();
    config.topology.fabrics = ExpectedCount(2);

    let outcome = run(&device, &config, RebootCase::Fabric).await;
    assert!(
        matches!(
            outcome,
            CaseOutcome::Failed(VerifyError::NoRemovableComponent { .. })
        ),
        "{:?}",
        outcome
    );
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_run_cases_isolates_failures() {
    let device = chassis_fixtures::modular_chassis().with_status_unimplemented();
    let config = config();

    let reports = RebootVerifier::new(&device, &config)
        .run_cases(&RebootCase::ALL)
        .await;

    let summary: Vec<(RebootCase, bool)> = reports
        .iter()
        .map(|r| (r.case, r.outcome.is_failed()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (RebootCase::StandbyControllerCard, false),
            (RebootCase::Linecard, true),
            (RebootCase::Fabric, true),
        ]
    );
    CallVerifier::of(&device).assert_reboot_count(3).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_run_cases_on_fixed_platform_skips_everything() {
    let device = chassis_fixtures::fixed_chassis();
    let config = config();

    let reports = RebootVerifier::new(&device, &config)
        .run_cases(&RebootCase::ALL)
        .await;
    assert_eq!(reports.len(), 3);
    for report in &reports {
        assert!(matches!(report.outcome, CaseOutcome::Skipped(_)), "{}", report);
    }
}
