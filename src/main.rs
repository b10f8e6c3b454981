//! blinkd — indicator LED arbitration daemon.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  ControlPipe      LogSignalSink   JsonSettings   BoottimeClock │
//! │  (commands in)    (SignalSink)    (SettingsPort) (clock)       │
//! │  Backend<I2cdev>  WakeLockHold                                 │
//! │  (BackendPort)    (PowerHoldPort)                              │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              LedService (pure logic)                   │    │
//! │  │  patterns · graph · timers · arbiter · breathing       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Single-threaded: commands, timer expiries, and environment updates all
//! run on this loop, one batched arbiter pass each.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use blinkd::adapters::control::{ControlPipe, ControlRequest};
use blinkd::adapters::indicator::LoggingIndicator;
use blinkd::adapters::log_sink::LogSignalSink;
use blinkd::adapters::power::WakeLockHold;
use blinkd::adapters::settings::JsonSettings;
use blinkd::adapters::time::BoottimeClock;
use blinkd::app::commands::LedCommand;
use blinkd::app::ports::SettingsPort;
use blinkd::app::service::{LedService, ServiceSettings};
use blinkd::backends::{Backend, DirectMonoLed, EngineBackend, EngineMode, ShimBackend};
use blinkd::breathing::DEFAULT_BREATH_BATTERY_LIMIT;
use blinkd::config::{
    KeyFile, KEY_BACKEND, KEY_ENGINE_ADDRESS, KEY_ENGINE_DEVICE, KEY_LED_CLASS_PATH, LED_SECTION,
};
use blinkd::patterns::graph::ActivationGraph;
use blinkd::patterns::{BackendFamily, PatternRepository};

use linux_embedded_hal::I2cdev;

const CONFIG_PATH: &str = "/etc/blinkd/led.conf";
const SETTINGS_PATH: &str = "/var/lib/blinkd/settings.json";
const CONTROL_PIPE_PATH: &str = "/run/blinkd/control";

/// Idle poll interval when no deadline is pending.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("blinkd v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 1. Configuration ──────────────────────────────────────
    let keyfile = KeyFile::load(Path::new(CONFIG_PATH))
        .with_context(|| format!("loading {CONFIG_PATH}"))?;

    let family = match keyfile.get(LED_SECTION, KEY_BACKEND) {
        Some(tag) => BackendFamily::from_config(tag).unwrap_or_else(|| {
            warn!("unknown backend tag '{tag}', running without an LED");
            BackendFamily::None
        }),
        None => {
            warn!("no backend probed into the configuration, running without an LED");
            BackendFamily::None
        }
    };
    info!("backend family: {family:?}");

    // ── 2. Settings, patterns, rules ──────────────────────────
    let mut settings = JsonSettings::open(SETTINGS_PATH);
    let service_settings = ServiceSettings {
        led_enabled: settings.led_enabled().unwrap_or(true),
        sw_breathing_enabled: settings.sw_breathing_enabled().unwrap_or(true),
        breath_battery_limit: settings
            .breath_battery_limit()
            .unwrap_or(DEFAULT_BREATH_BATTERY_LIMIT),
    };

    let repository = PatternRepository::load(family, &keyfile, &settings)
        .context("loading pattern definitions")?;
    info!("{} patterns loaded", repository.len());
    let graph = ActivationGraph::from_config(&keyfile, &repository);
    if !graph.is_empty() {
        info!("{} combination rules loaded", graph.len());
    }

    // ── 3. Hardware ───────────────────────────────────────────
    let mut backend = build_backend(family, &keyfile);
    let mut power = WakeLockHold::kernel_default("blinkd_breathing");
    let mut sink = LogSignalSink;

    let mut service =
        LedService::new(repository, graph, Box::new(BoottimeClock), service_settings);

    // ── 4. Main loop ──────────────────────────────────────────
    let mut pipe = ControlPipe::open(Path::new(CONTROL_PIPE_PATH))
        .with_context(|| format!("opening control pipe {CONTROL_PIPE_PATH}"))?;

    'main: loop {
        for request in pipe.poll() {
            let cmd = match request {
                ControlRequest::Stop => {
                    info!("stop requested");
                    break 'main;
                }
                ControlRequest::Command(cmd) => cmd,
            };
            persist_setting(&mut settings, &cmd);
            service.handle_command(cmd, &mut backend, &mut power, &mut sink);
        }

        service.tick_timers(&mut backend, &mut power, &mut sink);

        let sleep = match service.time_to_next_deadline() {
            Some(remaining) => remaining.min(POLL_INTERVAL),
            None => POLL_INTERVAL,
        };
        std::thread::sleep(sleep);
    }

    service.shutdown(&mut backend, &mut power);
    info!("blinkd stopped");
    Ok(())
}

/// Settings-backed commands write through to disk before they mutate the
/// running service, so a restart comes back with the user's choices.
fn persist_setting(settings: &mut JsonSettings, cmd: &LedCommand) {
    match cmd {
        LedCommand::SetPatternEnabled(name, on) => settings.store_pattern_enabled(name, *on),
        LedCommand::SetSwBreathing(on) => settings.store_sw_breathing_enabled(*on),
        LedCommand::SetBreathBatteryLimit(limit) => settings.store_breath_battery_limit(*limit),
        LedCommand::EnableLed => settings.store_led_enabled(true),
        LedCommand::DisableLed => settings.store_led_enabled(false),
        _ => {}
    }
}

/// Build the backend variant for the probed family.  Anything that fails
/// to open degrades to the no-op variant — the daemon stays up for bus
/// introspection either way.
fn build_backend(family: BackendFamily, keyfile: &KeyFile) -> Backend<I2cdev> {
    match family {
        BackendFamily::None => Backend::None,
        BackendFamily::DirectMono => {
            let dir = keyfile
                .get(LED_SECTION, KEY_LED_CLASS_PATH)
                .map_or_else(|| PathBuf::from("/sys/class/leds/status"), PathBuf::from);
            Backend::DirectMono(DirectMonoLed::new(&dir))
        }
        BackendFamily::EngineMonoA
        | BackendFamily::EngineMonoB
        | BackendFamily::EngineRgbA
        | BackendFamily::EngineRgbB => {
            let device = keyfile.get(LED_SECTION, KEY_ENGINE_DEVICE).unwrap_or("/dev/i2c-2");
            let addr = keyfile
                .get(LED_SECTION, KEY_ENGINE_ADDRESS)
                .and_then(|a| u8::from_str_radix(a, 16).ok())
                .unwrap_or(0x32);
            let bus = match I2cdev::new(device) {
                Ok(bus) => bus,
                Err(e) => {
                    warn!("opening {device} failed ({e}), running without an LED");
                    return Backend::None;
                }
            };
            let Some((engine_family, mode)) = Backend::<I2cdev>::engine_params(family) else {
                return Backend::None;
            };
            let engine = EngineBackend::new(bus, addr, engine_family, mode);
            match mode {
                EngineMode::Mono => Backend::EngineMono(engine),
                EngineMode::Rgb => Backend::EngineRgb(engine),
            }
        }
        BackendFamily::RgbShim => {
            Backend::RgbShim(ShimBackend::new(Box::new(LoggingIndicator)))
        }
    }
}
