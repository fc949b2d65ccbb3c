//! Scripted replay on a virtual clock.
//!
//! A script is a JSON document:
//!
//! ```json
//! {
//!   "contacts": ["+15551234567"],
//!   "until_ms": 12000,
//!   "steps": [
//!     { "at_ms": 500,  "action": "location", "latitude": 37.0, "longitude": -122.0 },
//!     { "at_ms": 1000, "action": "shake" },
//!     { "at_ms": 3000, "action": "cancel" }
//!   ]
//! }
//! ```
//!
//! `contacts` replaces the saved contacts for the run (nothing is written);
//! without it the saved contacts are used. Emitted events are printed to
//! stdout as JSON lines; notices and outgoing SMS go to stderr.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use serde::Deserialize;

use alertmate_core::location::NoLocationProvider;
use alertmate_core::power::{NoHaptics, NoWakeLock};
use alertmate_core::{
    BackgroundService, Config, ContactStore, Database, Event, GrantedPermissions, KeyAction,
    KeyCode, KeyEvent, Location, SensorSample, ServiceCommand, ServiceParts,
};

use super::{console_host, open_contacts, CliResult, ConsoleHost};
use crate::console::{ConsoleNotifier, ConsoleSender};

/// Granularity of the virtual clock between scripted steps.
const TICK_MS: u64 = 100;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HostArg {
    Foreground,
    Background,
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Path to the JSON script
    file: PathBuf,
    /// Which host to run the script through
    #[arg(long, value_enum, default_value = "foreground")]
    host: HostArg,
}

#[derive(Debug, Deserialize)]
struct Script {
    #[serde(default)]
    contacts: Option<Vec<String>>,
    #[serde(default)]
    until_ms: Option<u64>,
    #[serde(default)]
    steps: Vec<TimedStep>,
}

#[derive(Debug, Deserialize)]
struct TimedStep {
    at_ms: u64,
    #[serde(flatten)]
    step: Step,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Step {
    /// One raw accelerometer sample.
    Accel { values: [f32; 3] },
    /// A burst of strong samples that completes the shake gesture.
    Shake {
        #[serde(default)]
        count: Option<u32>,
        #[serde(default = "default_shake_interval")]
        interval_ms: u64,
    },
    Location { latitude: f64, longitude: f64 },
    KeyDown {
        #[serde(default = "volume_down")]
        code: KeyCode,
    },
    KeyUp {
        #[serde(default = "volume_down")]
        code: KeyCode,
    },
    Cancel,
    Manual,
    TimerStart { minutes: u32 },
    TimerStop,
}

fn default_shake_interval() -> u64 {
    100
}

fn volume_down() -> KeyCode {
    KeyCode::VolumeDown
}

enum Sim {
    Foreground(ConsoleHost),
    Background(BackgroundService<ConsoleNotifier, ConsoleSender, NoWakeLock>),
}

impl Sim {
    fn tick(&mut self, now_ms: u64) -> Vec<Event> {
        match self {
            Sim::Foreground(host) => host.tick(now_ms),
            Sim::Background(service) => service.tick(now_ms),
        }
    }

    fn on_sample(&mut self, sample: &SensorSample) -> Vec<Event> {
        match self {
            Sim::Foreground(host) => host.on_sensor(sample),
            Sim::Background(service) => service.on_sensor(sample),
        }
    }

    fn apply(&mut self, step: &Step, at_ms: u64) -> Vec<Event> {
        match (self, step) {
            (sim, Step::Accel { values }) => {
                sim.on_sample(&SensorSample::accelerometer(at_ms, *values))
            }
            (_, Step::Shake { .. }) => Vec::new(),
            (Sim::Foreground(host), Step::Location { latitude, longitude }) => host
                .on_location(Location::new(*latitude, *longitude, at_ms))
                .into_iter()
                .collect(),
            (Sim::Background(service), Step::Location { latitude, longitude }) => service
                .on_location(Location::new(*latitude, *longitude, at_ms))
                .into_iter()
                .collect(),
            (Sim::Foreground(host), Step::KeyDown { code }) => {
                host.on_key(&KeyEvent::new(*code, KeyAction::Down, at_ms))
            }
            (Sim::Foreground(host), Step::KeyUp { code }) => {
                host.on_key(&KeyEvent::new(*code, KeyAction::Up, at_ms))
            }
            (Sim::Foreground(host), Step::Cancel) => {
                host.cancel_pending(at_ms).into_iter().collect()
            }
            (Sim::Background(service), Step::Cancel) => {
                service.on_start_command(ServiceCommand::CancelAlert, at_ms)
            }
            (Sim::Foreground(host), Step::Manual) => host.send_manual_alert(at_ms),
            (Sim::Background(service), Step::Manual) => {
                service.host_mut().send_manual_alert(at_ms)
            }
            (Sim::Foreground(host), Step::TimerStart { minutes }) => {
                match host.start_timer(*minutes, at_ms) {
                    Ok(event) => vec![event],
                    Err(e) => {
                        tracing::warn!(error = %e, "safety timer not started");
                        Vec::new()
                    }
                }
            }
            (Sim::Foreground(host), Step::TimerStop) => host.stop_timer(at_ms).into_iter().collect(),
            (Sim::Background(_), step) => {
                tracing::warn!(?step, "step not supported by the background host, skipped");
                Vec::new()
            }
        }
    }

    fn finish(&mut self, now_ms: u64) -> Vec<Event> {
        match self {
            Sim::Foreground(host) => host.pause(now_ms).into_iter().collect(),
            Sim::Background(service) => service.shutdown(now_ms).into_iter().collect(),
        }
    }
}

/// Steps in time order, with shake bursts expanded into single samples.
fn expand_steps(steps: Vec<TimedStep>, config: &Config) -> Vec<TimedStep> {
    // Two equal axes at 0.75x the threshold give a magnitude ~1.06x above it.
    let axis = (config.shake.threshold * 0.75) as f32;
    let mut expanded = Vec::with_capacity(steps.len());
    for timed in steps {
        match timed.step {
            Step::Shake { count, interval_ms } => {
                let count = count.unwrap_or(config.shake.required_count);
                for i in 0..u64::from(count) {
                    expanded.push(TimedStep {
                        at_ms: timed.at_ms.saturating_add(i.saturating_mul(interval_ms)),
                        step: Step::Accel {
                            values: [axis, axis, 0.0],
                        },
                    });
                }
            }
            _ => expanded.push(timed),
        }
    }
    expanded.sort_by_key(|s| s.at_ms);
    expanded
}

fn script_contacts(script: &Script, config: &Config) -> alertmate_core::error::Result<ContactStore> {
    match &script.contacts {
        Some(numbers) => {
            let store = ContactStore::new(Database::open_memory()?, config.contacts.max);
            for number in numbers {
                store.save_contact(number)?;
            }
            Ok(store)
        }
        None => open_contacts(config),
    }
}

fn emit(events: Vec<Event>) -> CliResult {
    for event in events {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}

pub fn run(args: SimulateArgs) -> CliResult {
    let content = std::fs::read_to_string(&args.file)?;
    let script: Script = serde_json::from_str(&content)?;
    let config = Config::load()?;
    let contacts = script_contacts(&script, &config)?;

    let steps = expand_steps(script.steps, &config);
    let last_at = steps.last().map_or(0, |s| s.at_ms);
    let until_ms = script
        .until_ms
        .unwrap_or(last_at.saturating_add(config.arming.delay_ms).saturating_add(1_000))
        .max(last_at);

    let mut sim = match args.host {
        HostArg::Foreground => {
            let mut host = console_host(config, contacts, ConsoleSender::stderr());
            emit(host.resume(&mut NoLocationProvider, 0))?;
            Sim::Foreground(host)
        }
        HostArg::Background => {
            let parts = ServiceParts {
                config,
                contacts,
                permissions: Box::new(GrantedPermissions::all()),
                notifier: ConsoleNotifier,
                sender: ConsoleSender::stderr(),
                wake_lock: NoWakeLock::default(),
                haptics: Box::new(NoHaptics),
                sensor_available: true,
            };
            let (service, events) = BackgroundService::start(parts, &mut NoLocationProvider, 0)?;
            emit(events)?;
            Sim::Background(service)
        }
    };

    let mut clock = 0;
    for timed in &steps {
        advance(&mut sim, &mut clock, timed.at_ms)?;
        emit(sim.apply(&timed.step, timed.at_ms))?;
    }
    advance(&mut sim, &mut clock, until_ms)?;
    emit(sim.finish(until_ms))
}

/// Tick the host at every `TICK_MS` boundary up to and including `target`.
fn advance(sim: &mut Sim, clock: &mut u64, target: u64) -> CliResult {
    while *clock < target {
        *clock = clock.saturating_add(TICK_MS).min(target);
        emit(sim.tick(*clock))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_script_with_defaults() {
        let script: Script = serde_json::from_str(
            r#"{
                "steps": [
                    { "at_ms": 1000, "action": "shake" },
                    { "at_ms": 200, "action": "key_down" },
                    { "at_ms": 4500, "action": "key_up" },
                    { "at_ms": 3000, "action": "cancel" }
                ]
            }"#,
        )
        .unwrap();
        assert!(script.contacts.is_none());
        assert!(matches!(
            script.steps[1].step,
            Step::KeyDown {
                code: KeyCode::VolumeDown
            }
        ));

        let steps = expand_steps(script.steps, &Config::default());
        // 6 samples + 3 other steps, sorted by time.
        assert_eq!(steps.len(), 9);
        assert_eq!(steps[0].at_ms, 200);
        assert!(steps.windows(2).all(|w| w[0].at_ms <= w[1].at_ms));
    }

    #[test]
    fn expanded_shake_samples_exceed_threshold() {
        let config = Config::default();
        let steps = expand_steps(
            vec![TimedStep {
                at_ms: 0,
                step: Step::Shake {
                    count: Some(1),
                    interval_ms: 100,
                },
            }],
            &config,
        );
        let Step::Accel { values } = steps[0].step else {
            panic!("expected an accelerometer sample");
        };
        let sample = SensorSample::accelerometer(0, values);
        assert!(sample.magnitude() > config.shake.threshold);
    }

    #[test]
    fn shake_burst_near_clock_end_clamps_timestamps() {
        let steps = expand_steps(
            vec![TimedStep {
                at_ms: u64::MAX - 50,
                step: Step::Shake {
                    count: Some(3),
                    interval_ms: u64::MAX,
                },
            }],
            &Config::default(),
        );
        let times: Vec<u64> = steps.iter().map(|s| s.at_ms).collect();
        assert_eq!(times, vec![u64::MAX - 50, u64::MAX, u64::MAX]);
    }
}
