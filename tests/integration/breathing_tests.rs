//! Breathing gate scenarios: eligibility, power-hold pairing, ordering.

use blinkd::app::ports::PowerHoldPort;
use blinkd::app::service::{LedService, ServiceSettings};
use blinkd::arbiter::ChargerState;
use blinkd::patterns::graph::ActivationGraph;
use blinkd::patterns::{Pattern, PatternRepository, VisibilityPolicy};

use crate::mock_hw::{pattern, BackendCall, FakeClock, MockBackend, MockPowerHold, RecordingSink};

fn make_service(patterns: Vec<Pattern>) -> LedService {
    LedService::new(
        PatternRepository::from_patterns(patterns),
        ActivationGraph::new(),
        Box::new(FakeClock::new()),
        ServiceSettings {
            led_enabled: true,
            sw_breathing_enabled: true,
            breath_battery_limit: 90,
        },
    )
}

#[test]
fn battery_gates_breathing_and_the_power_hold() {
    // on=500 off=2000 → a breathable envelope.
    let mut svc = make_service(vec![pattern("A", 10, VisibilityPolicy::Always)]);
    let mut hw = MockBackend::breathing_capable();
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.set_battery_level(80, &mut hw, &mut power);
    svc.set_charger_state(ChargerState::Off, &mut hw, &mut power);
    svc.activate_pattern("A", &mut hw, &mut power, &mut sink);
    assert!(!svc.breathing_engaged(), "below the battery floor");
    assert!(!power.held);

    svc.set_battery_level(95, &mut hw, &mut power);
    assert!(svc.breathing_engaged());
    assert!(power.held);

    svc.deactivate_pattern("A", &mut hw, &mut power, &mut sink);
    assert!(!svc.breathing_engaged());
    assert!(!power.held);
}

#[test]
fn charger_overrides_the_battery_floor() {
    let mut svc = make_service(vec![pattern("A", 10, VisibilityPolicy::Always)]);
    let mut hw = MockBackend::breathing_capable();
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.set_battery_level(10, &mut hw, &mut power);
    svc.activate_pattern("A", &mut hw, &mut power, &mut sink);
    assert!(!svc.breathing_engaged());

    svc.set_charger_state(ChargerState::On, &mut hw, &mut power);
    assert!(svc.breathing_engaged());

    svc.set_charger_state(ChargerState::Off, &mut hw, &mut power);
    assert!(!svc.breathing_engaged());
}

#[test]
fn acquire_before_enable_and_disable_before_release() {
    let mut svc = make_service(vec![pattern("A", 10, VisibilityPolicy::Always)]);
    let mut hw = MockBackend::breathing_capable();
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.set_battery_level(95, &mut hw, &mut power);
    svc.activate_pattern("A", &mut hw, &mut power, &mut sink);
    assert_eq!(power.transitions, vec![true]);
    assert!(hw.calls.contains(&BackendCall::Breathing(true)));

    svc.deactivate_pattern("A", &mut hw, &mut power, &mut sink);
    assert_eq!(power.transitions, vec![true, false]);
    // The LED quiesces first, then breathing stops (and only then the
    // hold was released, per the transition log above).
    let n = hw.calls.len();
    assert_eq!(&hw.calls[n - 2..], &[BackendCall::Disable, BackendCall::Breathing(false)]);
}

#[test]
fn non_breathable_envelope_never_engages() {
    let mut fast = pattern("A", 10, VisibilityPolicy::Always);
    fast.on_period_ms = 100; // below the 250 ms floor
    let mut svc = make_service(vec![fast]);
    let mut hw = MockBackend::breathing_capable();
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.set_battery_level(100, &mut hw, &mut power);
    svc.activate_pattern("A", &mut hw, &mut power, &mut sink);
    assert!(!svc.breathing_engaged());
}

#[test]
fn allow_listed_pattern_breathes_regardless() {
    let mut full = pattern("PatternBatteryFull", 10, VisibilityPolicy::Always);
    full.on_period_ms = 0; // not a breathable envelope on its own
    full.off_period_ms = 0;
    let mut svc = make_service(vec![full]);
    let mut hw = MockBackend::breathing_capable();
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.set_sw_breathing(false, &mut hw, &mut power);
    svc.set_battery_level(5, &mut hw, &mut power);
    svc.activate_pattern("PatternBatteryFull", &mut hw, &mut power, &mut sink);
    assert!(svc.breathing_engaged());
    assert!(power.held);
}

#[test]
fn incapable_backend_never_holds_power() {
    let mut svc = make_service(vec![pattern("A", 10, VisibilityPolicy::Always)]);
    let mut hw = MockBackend::new(); // cannot breathe
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.set_battery_level(100, &mut hw, &mut power);
    svc.activate_pattern("A", &mut hw, &mut power, &mut sink);
    assert!(!svc.breathing_engaged());
    assert!(power.transitions.is_empty());
}

#[test]
fn shutdown_releases_the_hold_mid_breathing() {
    let mut svc = make_service(vec![pattern("A", 10, VisibilityPolicy::Always)]);
    let mut hw = MockBackend::breathing_capable();
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.set_battery_level(95, &mut hw, &mut power);
    svc.activate_pattern("A", &mut hw, &mut power, &mut sink);
    assert!(power.held);

    svc.shutdown(&mut hw, &mut power);
    assert!(!power.held);
    assert!(!svc.breathing_engaged());
    power.release(); // idempotent for the drop-guard backstop
    assert!(!power.held);
}
