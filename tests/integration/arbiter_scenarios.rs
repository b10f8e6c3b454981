//! End-to-end arbitration scenarios: request in, hardware call and bus
//! signal out, with a scripted environment and clock.

use std::time::Duration;

use blinkd::app::service::{LedService, ServiceSettings};
use blinkd::arbiter::DisplayState;
use blinkd::patterns::graph::ActivationGraph;
use blinkd::patterns::{Pattern, PatternRepository, VisibilityPolicy};

use crate::mock_hw::{pattern, BackendCall, FakeClock, MockBackend, MockPowerHold, RecordingSink};

fn make_service(patterns: Vec<Pattern>, graph: ActivationGraph) -> (LedService, FakeClock) {
    let clock = FakeClock::new();
    let service = LedService::new(
        PatternRepository::from_patterns(patterns),
        graph,
        Box::new(clock.clone()),
        ServiceSettings::default(),
    );
    (service, clock)
}

// ── Priority wins ─────────────────────────────────────────────

#[test]
fn higher_urgency_pattern_takes_the_hardware() {
    let (mut svc, _clock) = make_service(
        vec![
            pattern("A", 10, VisibilityPolicy::Always),
            pattern("B", 50, VisibilityPolicy::Always),
        ],
        ActivationGraph::new(),
    );
    let mut hw = MockBackend::new();
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.activate_pattern("B", &mut hw, &mut power, &mut sink);
    svc.activate_pattern("A", &mut hw, &mut power, &mut sink);

    assert_eq!(hw.showing(), Some("A"));
    assert_eq!(hw.programmed(), vec!["B", "A"]);
    // The loser is still announced on the bus.
    assert_eq!(sink.activated(), vec!["B", "A"]);
}

#[test]
fn loser_activation_does_not_reprogram() {
    let (mut svc, _clock) = make_service(
        vec![
            pattern("A", 10, VisibilityPolicy::Always),
            pattern("B", 50, VisibilityPolicy::Always),
        ],
        ActivationGraph::new(),
    );
    let mut hw = MockBackend::new();
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.activate_pattern("A", &mut hw, &mut power, &mut sink);
    svc.activate_pattern("B", &mut hw, &mut power, &mut sink);

    // Winner unchanged: exactly one program call ever happened.
    assert_eq!(hw.programmed(), vec!["A"]);
    assert_eq!(sink.activated(), vec!["A", "B"]);
}

// ── Visibility gate ───────────────────────────────────────────

#[test]
fn display_transition_flips_the_winner() {
    let (mut svc, _clock) = make_service(
        vec![
            pattern("C", 5, VisibilityPolicy::DisplayOn),
            pattern("D", 10, VisibilityPolicy::Always),
        ],
        ActivationGraph::new(),
    );
    let mut hw = MockBackend::new();
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.set_display_state(DisplayState::Off, &mut hw, &mut power, &mut sink);
    svc.activate_pattern("C", &mut hw, &mut power, &mut sink);
    svc.activate_pattern("D", &mut hw, &mut power, &mut sink);
    assert_eq!(hw.showing(), Some("D"));

    svc.set_display_state(DisplayState::On, &mut hw, &mut power, &mut sink);
    assert_eq!(hw.showing(), Some("C"));
}

// ── Notification dismissal ────────────────────────────────────

#[test]
fn notification_is_dismissed_when_the_user_sees_it() {
    let (mut svc, clock) = make_service(
        vec![pattern("E", 20, VisibilityPolicy::Notification)],
        ActivationGraph::new(),
    );
    let mut hw = MockBackend::new();
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.set_display_state(DisplayState::Off, &mut hw, &mut power, &mut sink);
    svc.activate_pattern("E", &mut hw, &mut power, &mut sink);
    assert_eq!(hw.showing(), Some("E"));

    clock.advance(Duration::from_millis(1000));
    svc.note_user_activity(&mut hw, &mut power, &mut sink);
    clock.advance(Duration::from_millis(500));
    svc.set_display_state(DisplayState::On, &mut hw, &mut power, &mut sink);

    assert_eq!(sink.deactivated(), vec!["E"]);
    assert_eq!(hw.showing(), None);
}

// ── Timeout ───────────────────────────────────────────────────

#[test]
fn timeout_fires_across_simulated_suspend() {
    let mut f = pattern("F", 20, VisibilityPolicy::Always);
    f.timeout = Some(Duration::from_secs(2));
    let (mut svc, clock) = make_service(vec![f], ActivationGraph::new());
    let mut hw = MockBackend::new();
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.activate_pattern("F", &mut hw, &mut power, &mut sink);
    assert_eq!(svc.time_to_next_deadline(), Some(Duration::from_secs(2)));

    // The whole window passes in suspend; boot-time still advances.
    clock.advance(Duration::from_secs(2));
    svc.tick_timers(&mut hw, &mut power, &mut sink);

    assert!(!svc.pattern("F").unwrap().active);
    assert_eq!(hw.showing(), None);
    assert_eq!(sink.deactivated(), vec!["F"]);
}

// ── Combination rules ─────────────────────────────────────────

#[test]
fn derived_pattern_follows_the_and_of_its_prereqs() {
    let mut graph = ActivationGraph::new();
    graph.add_rule("G".into(), vec!["H".into(), "I".into()]);
    let (mut svc, _clock) = make_service(
        vec![
            pattern("G", 5, VisibilityPolicy::Always),
            pattern("H", 10, VisibilityPolicy::Always),
            pattern("I", 20, VisibilityPolicy::Always),
        ],
        graph,
    );
    let mut hw = MockBackend::new();
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.activate_pattern("H", &mut hw, &mut power, &mut sink);
    assert!(!svc.pattern("G").unwrap().active);

    svc.activate_pattern("I", &mut hw, &mut power, &mut sink);
    assert!(svc.pattern("G").unwrap().active);
    assert_eq!(hw.showing(), Some("G"));

    svc.deactivate_pattern("H", &mut hw, &mut power, &mut sink);
    assert!(!svc.pattern("G").unwrap().active);
    assert_eq!(hw.showing(), Some("I"));
}

// ── Master switch ─────────────────────────────────────────────

#[test]
fn disable_led_blocks_everything_but_forced() {
    let (mut svc, _clock) = make_service(
        vec![
            pattern("A", 10, VisibilityPolicy::Always),
            pattern("P5", 50, VisibilityPolicy::Forced),
        ],
        ActivationGraph::new(),
    );
    let mut hw = MockBackend::new();
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.set_led_enabled(false, &mut hw, &mut power);
    svc.activate_pattern("A", &mut hw, &mut power, &mut sink);
    assert_eq!(hw.showing(), None, "masked pattern must not reach the LED");

    svc.activate_pattern("P5", &mut hw, &mut power, &mut sink);
    assert_eq!(hw.showing(), Some("P5"), "forced class ignores the master switch");

    svc.set_led_enabled(true, &mut hw, &mut power);
    assert_eq!(hw.showing(), Some("A"));
}

// ── Ordering & brightness ─────────────────────────────────────

#[test]
fn signal_precedes_the_backend_program() {
    let trace = crate::mock_hw::Trace::default();
    let (mut svc, _clock) =
        make_service(vec![pattern("A", 10, VisibilityPolicy::Always)], ActivationGraph::new());
    let mut hw = MockBackend::with_trace(trace.clone());
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::with_trace(trace.clone());

    svc.activate_pattern("A", &mut hw, &mut power, &mut sink);

    let trace = trace.borrow();
    assert_eq!(*trace, vec!["signal-activated:A".to_string(), "program:A".to_string()]);
}

#[test]
fn brightness_changes_push_through_without_reprogramming() {
    let (mut svc, _clock) =
        make_service(vec![pattern("A", 10, VisibilityPolicy::Always)], ActivationGraph::new());
    let mut hw = MockBackend::new();
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.activate_pattern("A", &mut hw, &mut power, &mut sink);
    let programs_before = hw.programmed().len();

    svc.set_led_brightness(5, &mut hw, &mut power);
    assert_eq!(hw.programmed().len(), programs_before);
    assert!(hw
        .calls
        .iter()
        .any(|c| matches!(c, BackendCall::Brightness(blinkd::app::ports::Brightness::Level(5)))));
}

#[test]
fn backend_failure_is_swallowed() {
    let (mut svc, _clock) =
        make_service(vec![pattern("A", 10, VisibilityPolicy::Always)], ActivationGraph::new());
    let mut hw = MockBackend::new();
    hw.fail_program = true;
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    // The arbiter must carry on as if the hardware were fine.
    svc.activate_pattern("A", &mut hw, &mut power, &mut sink);
    assert_eq!(svc.winning_pattern().unwrap().name, "A");
    assert_eq!(sink.activated(), vec!["A"]);
}

#[test]
fn shutdown_quiesces_and_cancels_deadlines() {
    let mut f = pattern("F", 20, VisibilityPolicy::Always);
    f.timeout = Some(Duration::from_secs(60));
    let (mut svc, _clock) = make_service(vec![f], ActivationGraph::new());
    let mut hw = MockBackend::new();
    let mut power = MockPowerHold::default();
    let mut sink = RecordingSink::new();

    svc.activate_pattern("F", &mut hw, &mut power, &mut sink);
    svc.shutdown(&mut hw, &mut power);

    assert_eq!(svc.time_to_next_deadline(), None);
    assert_eq!(hw.calls.last(), Some(&BackendCall::Quiesce));
    assert!(!power.held);
}
