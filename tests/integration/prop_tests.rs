//! Randomised invariants over the arbiter and the activation state.

use proptest::prelude::*;

use blinkd::app::service::{LedService, ServiceSettings};
use blinkd::arbiter::{self, ChargerState, DisplayState, Environment, SystemState};
use blinkd::patterns::graph::ActivationGraph;
use blinkd::patterns::{Pattern, PatternRepository, VisibilityPolicy};

use crate::mock_hw::{pattern, FakeClock, MockBackend, MockPowerHold, RecordingSink};

fn policy_strategy() -> impl Strategy<Value = VisibilityPolicy> {
    (1u8..=7).prop_map(|n| VisibilityPolicy::from_config(n).unwrap())
}

fn display_strategy() -> impl Strategy<Value = DisplayState> {
    prop_oneof![
        Just(DisplayState::On),
        Just(DisplayState::Dim),
        Just(DisplayState::Off),
        Just(DisplayState::LpmOn),
        Just(DisplayState::LpmOff),
        Just(DisplayState::PowerUp),
        Just(DisplayState::PowerDown),
        Just(DisplayState::Undef),
    ]
}

fn system_strategy() -> impl Strategy<Value = SystemState> {
    prop_oneof![
        Just(SystemState::User),
        Just(SystemState::ActDead),
        Just(SystemState::Shutdown),
        Just(SystemState::Reboot),
        Just(SystemState::Undef),
    ]
}

fn env_strategy() -> impl Strategy<Value = Environment> {
    (display_strategy(), system_strategy(), any::<bool>()).prop_map(|(display, system, led)| {
        Environment { display, system, led_enabled: led, ..Environment::new() }
    })
}

fn pattern_set_strategy() -> impl Strategy<Value = Vec<Pattern>> {
    prop::collection::vec((0u32..100, policy_strategy(), any::<bool>(), any::<bool>()), 1..12)
        .prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(i, (priority, policy, active, enabled))| {
                    let mut p = pattern(&format!("P{i}"), priority, policy);
                    p.active = active;
                    p.enabled = enabled;
                    p
                })
                .collect()
        })
}

proptest! {
    /// The winner is always the first visible pattern in priority order —
    /// i.e. the minimum priority among visible ones, ties broken by
    /// position in the sorted slice.
    #[test]
    fn winner_is_minimum_visible_priority(patterns in pattern_set_strategy(), env in env_strategy()) {
        let repo = PatternRepository::from_patterns(patterns);
        let winner = arbiter::select(repo.patterns(), &env);

        let expected = repo
            .patterns()
            .iter()
            .position(|p| arbiter::visible(p, &env));
        prop_assert_eq!(winner, expected);

        if let Some(idx) = winner {
            let min_visible = repo
                .patterns()
                .iter()
                .filter(|p| arbiter::visible(p, &env))
                .map(|p| p.priority)
                .min();
            prop_assert_eq!(Some(repo.get(idx).priority), min_visible);
        } else {
            prop_assert!(repo.patterns().iter().all(|p| !arbiter::visible(p, &env)));
        }
    }

    /// Every flip of an enabled pattern's active bit emits exactly one
    /// signal with the matching verb, regardless of request order.
    #[test]
    fn one_signal_per_flip(ops in prop::collection::vec((0usize..4, any::<bool>()), 0..40)) {
        let names = ["P0", "P1", "P2", "P3"];
        let patterns = names
            .iter()
            .enumerate()
            .map(|(i, n)| pattern(n, i as u32 * 10, VisibilityPolicy::Always))
            .collect();
        let mut svc = LedService::new(
            PatternRepository::from_patterns(patterns),
            ActivationGraph::new(),
            Box::new(FakeClock::new()),
            ServiceSettings::default(),
        );
        let mut hw = MockBackend::new();
        let mut power = MockPowerHold::default();
        let mut sink = RecordingSink::new();

        let mut expected = Vec::new();
        let mut active = [false; 4];
        for (target, activate) in ops {
            if activate != active[target] {
                active[target] = activate;
                expected.push((names[target], activate));
            }
            if activate {
                svc.activate_pattern(names[target], &mut hw, &mut power, &mut sink);
            } else {
                svc.deactivate_pattern(names[target], &mut hw, &mut power, &mut sink);
            }
        }

        let seen: Vec<(&str, bool)> = sink
            .signals
            .iter()
            .map(|s| match s {
                blinkd::app::events::LedSignal::PatternActivated(n) => (n.as_str(), true),
                blinkd::app::events::LedSignal::PatternDeactivated(n) => (n.as_str(), false),
            })
            .collect();
        prop_assert_eq!(seen, expected);
    }

    /// The suspend blocker is held exactly while breathing eligibility
    /// holds, across arbitrary environment churn.
    #[test]
    fn power_hold_iff_breathing(
        battery in 0u8..=100,
        limit in 0u8..=100,
        charger_on in any::<bool>(),
        setting in any::<bool>(),
        activate in any::<bool>(),
    ) {
        let mut svc = LedService::new(
            PatternRepository::from_patterns(vec![pattern("A", 10, VisibilityPolicy::Always)]),
            ActivationGraph::new(),
            Box::new(FakeClock::new()),
            ServiceSettings {
                led_enabled: true,
                sw_breathing_enabled: setting,
                breath_battery_limit: limit,
            },
        );
        let mut hw = MockBackend::breathing_capable();
        let mut power = MockPowerHold::default();
        let mut sink = RecordingSink::new();

        svc.set_battery_level(battery, &mut hw, &mut power);
        let charger = if charger_on { ChargerState::On } else { ChargerState::Off };
        svc.set_charger_state(charger, &mut hw, &mut power);
        if activate {
            svc.activate_pattern("A", &mut hw, &mut power, &mut sink);
        }

        let eligible = activate && setting && (charger_on || battery >= limit);
        prop_assert_eq!(svc.breathing_engaged(), eligible);
        prop_assert_eq!(power.held, eligible);
    }

    /// Re-running rule propagation with no intervening mutation changes
    /// nothing: a second activation of an already-active prereq is a
    /// no-op.
    #[test]
    fn rule_propagation_is_idempotent(first in any::<bool>(), second in any::<bool>()) {
        let mut graph = ActivationGraph::new();
        graph.add_rule("R".into(), vec!["A".into(), "B".into()]);
        let mut svc = LedService::new(
            PatternRepository::from_patterns(vec![
                pattern("R", 5, VisibilityPolicy::Always),
                pattern("A", 10, VisibilityPolicy::Always),
                pattern("B", 20, VisibilityPolicy::Always),
            ]),
            graph,
            Box::new(FakeClock::new()),
            ServiceSettings::default(),
        );
        let mut hw = MockBackend::new();
        let mut power = MockPowerHold::default();
        let mut sink = RecordingSink::new();

        if first {
            svc.activate_pattern("A", &mut hw, &mut power, &mut sink);
        }
        if second {
            svc.activate_pattern("B", &mut hw, &mut power, &mut sink);
        }
        let derived_after = svc.pattern("R").unwrap().active;
        let signals_after = sink.signals.len();

        // Repeat the same requests: already-active prereqs must not move
        // the derived pattern or emit anything new.
        if first {
            svc.activate_pattern("A", &mut hw, &mut power, &mut sink);
        }
        if second {
            svc.activate_pattern("B", &mut hw, &mut power, &mut sink);
        }
        prop_assert_eq!(svc.pattern("R").unwrap().active, derived_after);
        prop_assert_eq!(svc.pattern("R").unwrap().active, first && second);
        prop_assert_eq!(sink.signals.len(), signals_after);
    }
}
