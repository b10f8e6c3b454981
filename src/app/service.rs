//! The arbitration service — owns all mutable indicator state.
//!
//! [`LedService`] holds the pattern repository, the activation graph, the
//! timeout deadlines, the environment snapshot, and the breathing
//! supervisor.  Every public entry point runs on the single main loop,
//! mutates state first, emits any activation signals, and then runs the
//! arbiter **exactly once** before returning — so one inbound message is
//! one batched update, and observers hear "activated" before the LED
//! changes.
//!
//! ```text
//!  LedCommand ──▶ ┌────────────────────────────┐ ──▶ SignalSink
//!                 │         LedService          │
//!  BackendPort ◀──│  patterns · graph · timers  │──▶ PowerHoldPort
//!                 │  arbiter · breathing        │
//!                 └────────────────────────────┘
//! ```

use std::time::Duration;

use log::{debug, warn};

use crate::arbiter::{self, ChargerState, DisplayState, Environment, SystemState, MAX_BRIGHTNESS_STEP};
use crate::breathing::{BreathingSupervisor, DEFAULT_BREATH_BATTERY_LIMIT};
use crate::patterns::graph::ActivationGraph;
use crate::patterns::timers::DeactivateTimers;
use crate::patterns::{Pattern, PatternRepository, VisibilityPolicy};

use super::commands::LedCommand;
use super::events::LedSignal;
use super::ports::{BackendPort, Brightness, MonotonicClock, PowerHoldPort, SignalSink};

/// Initial values normally read from the settings store.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub led_enabled: bool,
    pub sw_breathing_enabled: bool,
    pub breath_battery_limit: u8,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            led_enabled: true,
            sw_breathing_enabled: true,
            breath_battery_limit: DEFAULT_BREATH_BATTERY_LIMIT,
        }
    }
}

/// The indicator core.  One per process, owned by the main loop; every
/// entry point takes the hardware and bus ports by mutable borrow.
pub struct LedService {
    patterns: PatternRepository,
    graph: ActivationGraph,
    timers: DeactivateTimers,
    env: Environment,
    breathing: BreathingSupervisor,
    clock: Box<dyn MonotonicClock>,
    /// Index of the pattern currently on the hardware.
    winner: Option<usize>,
}

impl LedService {
    pub fn new(
        patterns: PatternRepository,
        graph: ActivationGraph,
        clock: Box<dyn MonotonicClock>,
        settings: ServiceSettings,
    ) -> Self {
        let timers = DeactivateTimers::new(patterns.len());
        let mut env = Environment::new();
        env.led_enabled = settings.led_enabled;
        Self {
            patterns,
            graph,
            timers,
            env,
            breathing: BreathingSupervisor::new(
                settings.sw_breathing_enabled,
                settings.breath_battery_limit,
            ),
            clock,
            winner: None,
        }
    }

    // ── Command dispatch ──────────────────────────────────────

    /// Process one inbound command.  Exactly one arbiter pass per call.
    pub fn handle_command(
        &mut self,
        cmd: LedCommand,
        backend: &mut impl BackendPort,
        power: &mut impl PowerHoldPort,
        sink: &mut impl SignalSink,
    ) {
        match cmd {
            LedCommand::Activate(name) => self.activate_pattern(&name, backend, power, sink),
            LedCommand::Deactivate(name) => self.deactivate_pattern(&name, backend, power, sink),
            LedCommand::EnableLed => self.set_led_enabled(true, backend, power),
            LedCommand::DisableLed => self.set_led_enabled(false, backend, power),
            LedCommand::SetPatternEnabled(name, on) => {
                self.set_pattern_enabled(&name, on, backend, power);
            }
            LedCommand::SetSwBreathing(on) => self.set_sw_breathing(on, backend, power),
            LedCommand::SetBreathBatteryLimit(limit) => {
                self.set_breath_battery_limit(limit, backend, power);
            }
            LedCommand::DisplayState(state) => {
                self.set_display_state(state, backend, power, sink);
            }
            LedCommand::SystemState(state) => self.set_system_state(state, backend, power),
            LedCommand::ChargerState(state) => self.set_charger_state(state, backend, power),
            LedCommand::BatteryLevel(pct) => self.set_battery_level(pct, backend, power),
            LedCommand::UserActivity => self.note_user_activity(backend, power, sink),
            LedCommand::LedBrightness(step) => self.set_led_brightness(step, backend, power),
        }
    }

    // ── Pattern requests ──────────────────────────────────────

    /// A client asked for a pattern.  Unknown names are ignored.
    pub fn activate_pattern(
        &mut self,
        name: &str,
        backend: &mut impl BackendPort,
        power: &mut impl PowerHoldPort,
        sink: &mut impl SignalSink,
    ) {
        let Some(idx) = self.patterns.find(name) else {
            debug!("activation request for unknown pattern {name}");
            return;
        };
        self.apply_active(idx, true, sink, true);
        self.reevaluate(backend, power);
    }

    /// A client withdrew its request.  Unknown names are ignored.
    pub fn deactivate_pattern(
        &mut self,
        name: &str,
        backend: &mut impl BackendPort,
        power: &mut impl PowerHoldPort,
        sink: &mut impl SignalSink,
    ) {
        let Some(idx) = self.patterns.find(name) else {
            debug!("deactivation request for unknown pattern {name}");
            return;
        };
        self.apply_active(idx, false, sink, true);
        self.reevaluate(backend, power);
    }

    /// Per-pattern user toggle.  Changes arbitration but never signals.
    pub fn set_pattern_enabled(
        &mut self,
        name: &str,
        enabled: bool,
        backend: &mut impl BackendPort,
        power: &mut impl PowerHoldPort,
    ) {
        let Some(idx) = self.patterns.find(name) else {
            debug!("enable toggle for unknown pattern {name}");
            return;
        };
        self.patterns.get_mut(idx).enabled = enabled;
        self.reevaluate(backend, power);
    }

    // ── Environment setters ───────────────────────────────────

    pub fn set_led_enabled(
        &mut self,
        on: bool,
        backend: &mut impl BackendPort,
        power: &mut impl PowerHoldPort,
    ) {
        if self.env.led_enabled == on {
            return;
        }
        self.env.led_enabled = on;
        self.reevaluate(backend, power);
    }

    /// Display state transition.  Also drives the notification-class
    /// dismissal lifecycle: a pattern that activated while nobody was
    /// looking is dropped the moment the user demonstrably saw it, and
    /// locked in otherwise.
    pub fn set_display_state(
        &mut self,
        state: DisplayState,
        backend: &mut impl BackendPort,
        power: &mut impl PowerHoldPort,
        sink: &mut impl SignalSink,
    ) {
        if self.env.display == state {
            return;
        }
        let recent = self.env.recent_activity(self.clock.now());
        let entering_on = state.is_on_class() && !self.env.display.is_on_class();
        let entering_off = state.is_off_class() && !self.env.display.is_off_class();

        if entering_on || entering_off {
            for idx in 0..self.patterns.len() {
                if !self.patterns.get(idx).undecided {
                    continue;
                }
                if entering_on && recent {
                    // The user was interacting and the screen lit: seen.
                    self.apply_active(idx, false, sink, true);
                } else if entering_off && recent {
                    // Screen blanked right after interaction: dismissed.
                    self.patterns.get_mut(idx).undecided = false;
                    self.apply_active(idx, false, sink, true);
                } else {
                    // No recent activity either way: lock the pattern in.
                    self.patterns.get_mut(idx).undecided = false;
                }
            }
        }

        self.env.display = state;
        self.reevaluate(backend, power);
    }

    pub fn set_system_state(
        &mut self,
        state: SystemState,
        backend: &mut impl BackendPort,
        power: &mut impl PowerHoldPort,
    ) {
        if self.env.system == state {
            return;
        }
        self.env.system = state;
        self.reevaluate(backend, power);
    }

    pub fn set_charger_state(
        &mut self,
        state: ChargerState,
        backend: &mut impl BackendPort,
        power: &mut impl PowerHoldPort,
    ) {
        if self.env.charger == state {
            return;
        }
        self.env.charger = state;
        self.reevaluate(backend, power);
    }

    pub fn set_battery_level(
        &mut self,
        percent: u8,
        backend: &mut impl BackendPort,
        power: &mut impl PowerHoldPort,
    ) {
        let percent = percent.min(100);
        if self.env.battery_percent == percent {
            return;
        }
        self.env.battery_percent = percent;
        self.reevaluate(backend, power);
    }

    /// Explicit user input.  While the screen is lit this also dismisses
    /// every still-undecided notification pattern — the user is clearly
    /// looking at the device.
    pub fn note_user_activity(
        &mut self,
        backend: &mut impl BackendPort,
        power: &mut impl PowerHoldPort,
        sink: &mut impl SignalSink,
    ) {
        self.env.last_activity = Some(self.clock.now());
        if self.env.display.is_on_class() {
            for idx in 0..self.patterns.len() {
                if self.patterns.get(idx).undecided {
                    self.apply_active(idx, false, sink, true);
                }
            }
        }
        self.reevaluate(backend, power);
    }

    /// Display brightness step changed.  Pushed to the backend even when
    /// the winner is unchanged — intensity tracks the display without a
    /// reprogram.
    pub fn set_led_brightness(
        &mut self,
        step: u8,
        backend: &mut impl BackendPort,
        power: &mut impl PowerHoldPort,
    ) {
        let step = step.clamp(1, MAX_BRIGHTNESS_STEP);
        if self.env.led_brightness == step {
            return;
        }
        self.env.led_brightness = step;
        backend.set_brightness(Brightness::Level(step));
        self.reevaluate(backend, power);
    }

    // ── Breathing settings ────────────────────────────────────

    pub fn set_sw_breathing(
        &mut self,
        on: bool,
        backend: &mut impl BackendPort,
        power: &mut impl PowerHoldPort,
    ) {
        if self.breathing.setting_enabled == on {
            return;
        }
        self.breathing.setting_enabled = on;
        self.reevaluate(backend, power);
    }

    pub fn set_breath_battery_limit(
        &mut self,
        limit: u8,
        backend: &mut impl BackendPort,
        power: &mut impl PowerHoldPort,
    ) {
        let limit = limit.min(100);
        if self.breathing.battery_limit == limit {
            return;
        }
        self.breathing.battery_limit = limit;
        self.reevaluate(backend, power);
    }

    // ── Timers ────────────────────────────────────────────────

    /// Fire any expired auto-deactivate deadlines, then re-arbitrate once.
    pub fn tick_timers(
        &mut self,
        backend: &mut impl BackendPort,
        power: &mut impl PowerHoldPort,
        sink: &mut impl SignalSink,
    ) {
        let expired = self.timers.take_expired(self.clock.now());
        if expired.is_empty() {
            return;
        }
        for idx in expired {
            debug!("pattern {} reached its timeout", self.patterns.get(idx).name);
            self.apply_active(idx, false, sink, true);
        }
        self.reevaluate(backend, power);
    }

    /// How long until the earliest pending deadline.
    pub fn time_to_next_deadline(&self) -> Option<Duration> {
        let next = self.timers.next_deadline()?;
        Some(next.saturating_sub(self.clock.now()))
    }

    // ── Shutdown ──────────────────────────────────────────────

    /// Quiesce everything: breathing off (power-hold released), backend
    /// drained and disabled, deadlines cancelled.
    pub fn shutdown(&mut self, backend: &mut impl BackendPort, power: &mut impl PowerHoldPort) {
        self.breathing.update(false, backend, power);
        backend.quiesce();
        self.timers.cancel_all();
        self.winner = None;
    }

    // ── Queries ───────────────────────────────────────────────

    /// The pattern currently on the hardware.
    pub fn winning_pattern(&self) -> Option<&Pattern> {
        self.winner.map(|i| self.patterns.get(i))
    }

    pub fn pattern(&self, name: &str) -> Option<&Pattern> {
        self.patterns.find(name).map(|i| self.patterns.get(i))
    }

    pub fn breathing_engaged(&self) -> bool {
        self.breathing.engaged()
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    // ── Internal ──────────────────────────────────────────────

    /// The single place a pattern's `active` bit changes.
    ///
    /// Handles the timeout deadline, the notification `undecided` mark,
    /// the activation signal (only while enabled), and — for externally
    /// caused changes — one non-transitive pass over the combination rules
    /// that depend on this pattern.  Derived assignments come back through
    /// here with `propagate = false`, so their own signals still fire.
    fn apply_active(&mut self, idx: usize, active: bool, sink: &mut impl SignalSink, propagate: bool) {
        let timeout = {
            let p = self.patterns.get_mut(idx);
            if p.active == active {
                return;
            }
            p.active = active;
            if active {
                p.undecided = p.policy == VisibilityPolicy::Notification;
            } else {
                p.undecided = false;
            }
            p.timeout
        };

        if active {
            if let Some(t) = timeout {
                self.timers.start(idx, self.clock.now() + t);
            }
        } else {
            self.timers.cancel(idx);
        }

        let (name, enabled) = {
            let p = self.patterns.get(idx);
            (p.name.clone(), p.enabled)
        };
        if enabled {
            let signal = if active {
                LedSignal::PatternActivated(name.clone())
            } else {
                LedSignal::PatternDeactivated(name.clone())
            };
            sink.emit(&signal);
        }

        if propagate {
            for rule_idx in self.graph.affected_by(&name).to_vec() {
                let (derived, target) = {
                    let rule = self.graph.rule(rule_idx);
                    let target = rule.prereqs.iter().all(|q| {
                        self.patterns.find(q).is_some_and(|i| self.patterns.get(i).active)
                    });
                    (rule.derived.clone(), target)
                };
                if let Some(derived_idx) = self.patterns.find(&derived) {
                    self.apply_active(derived_idx, target, sink, false);
                }
            }
        }
    }

    /// One arbiter pass: reprogram the backend only when the winner
    /// changed, then settle breathing.  Never fails — hardware trouble is
    /// the backend's to log.
    fn reevaluate(&mut self, backend: &mut impl BackendPort, power: &mut impl PowerHoldPort) {
        let winner = arbiter::select(self.patterns.patterns(), &self.env);
        if winner != self.winner {
            match winner {
                Some(idx) => {
                    let p = self.patterns.get(idx);
                    debug!("arbiter: pattern {} wins", p.name);
                    if !backend.program(p) {
                        warn!("backend could not program pattern {}", p.name);
                    }
                    // The lit colour may have changed; refresh intensity.
                    backend.set_brightness(Brightness::Reapply);
                }
                None => {
                    debug!("arbiter: no visible pattern");
                    backend.disable();
                }
            }
            self.winner = winner;
        }

        let desired = backend.supports_sw_breathing()
            && self.breathing.desired(self.winner.map(|i| self.patterns.get(i)), &self.env);
        self.breathing.update(desired, backend, power);
    }
}
