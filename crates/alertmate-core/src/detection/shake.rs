//! Shake gesture detection.
//!
//! Each accelerometer sample whose magnitude exceeds the threshold is a
//! qualifying sample. Qualifying samples chain while they arrive less than
//! `chain_gap_ms` apart; a longer gap restarts the chain at 1. Once the chain
//! reaches `required_count` and the cooldown since the last emitted trigger
//! has passed, a [`TriggerEvent`] is emitted and the chain resets to 0.
//!
//! ```text
//! sample > threshold ──► gap < chain_gap ? count += 1 : count = 1
//!                         count >= required && since_alert > cooldown
//!                              └──► TriggerEvent, count = 0
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::trigger::{TriggerEvent, TriggerSource};

/// Kind of sensor a sample came from. Only the accelerometer feeds the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
    Magnetometer,
    Other,
}

/// A raw 3-axis sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub sensor: SensorKind,
    /// Monotonic milliseconds.
    pub timestamp_ms: u64,
    pub values: [f32; 3],
}

impl SensorSample {
    pub fn accelerometer(timestamp_ms: u64, values: [f32; 3]) -> Self {
        Self {
            sensor: SensorKind::Accelerometer,
            timestamp_ms,
            values,
        }
    }

    /// sqrt(x² + y² + z²), computed in f64.
    pub fn magnitude(&self) -> f64 {
        let [x, y, z] = self.values.map(f64::from);
        (x * x + y * y + z * z).sqrt()
    }
}

/// Tunables for the shake gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShakeConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_chain_gap_ms")]
    pub chain_gap_ms: u64,
    #[serde(default = "default_required_count")]
    pub required_count: u32,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_threshold() -> f64 {
    40.0
}
fn default_chain_gap_ms() -> u64 {
    1_200
}
fn default_required_count() -> u32 {
    6
}
fn default_cooldown_ms() -> u64 {
    10_000
}

impl Default for ShakeConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            chain_gap_ms: default_chain_gap_ms(),
            required_count: default_required_count(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

/// Mutable counters owned by one detector instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShakeState {
    pub shake_count: u32,
    pub last_shake_ms: Option<u64>,
    pub last_alert_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ShakeDetector {
    config: ShakeConfig,
    state: ShakeState,
    sensor_available: bool,
    registered: bool,
}

impl ShakeDetector {
    /// A detector whose accelerometer is `sensor_available`. Without one the
    /// detector is inert for its whole lifetime.
    pub fn new(config: ShakeConfig, sensor_available: bool) -> Self {
        if !sensor_available {
            tracing::warn!("accelerometer unavailable, shake detection disabled");
        }
        Self {
            config,
            state: ShakeState::default(),
            sensor_available,
            registered: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &ShakeConfig {
        &self.config
    }

    pub fn state(&self) -> &ShakeState {
        &self.state
    }

    pub fn is_available(&self) -> bool {
        self.sensor_available
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start listening. The shake chain restarts; the cooldown survives so a
    /// re-registration cannot bypass it.
    ///
    /// # Errors
    /// `SensorUnavailable` when the device has no accelerometer.
    pub fn register(&mut self) -> Result<()> {
        if !self.sensor_available {
            return Err(CoreError::SensorUnavailable);
        }
        self.state.shake_count = 0;
        self.state.last_shake_ms = None;
        self.registered = true;
        Ok(())
    }

    pub fn unregister(&mut self) {
        self.registered = false;
    }

    /// Feed one sample. Returns a trigger when the gesture completes.
    pub fn on_sample(&mut self, sample: &SensorSample) -> Option<TriggerEvent> {
        if !self.sensor_available || !self.registered {
            return None;
        }
        if sample.sensor != SensorKind::Accelerometer {
            return None;
        }
        let magnitude = sample.magnitude();
        if magnitude <= self.config.threshold {
            return None;
        }

        let now = sample.timestamp_ms;
        let chained = self
            .state
            .last_shake_ms
            .is_some_and(|last| now.saturating_sub(last) < self.config.chain_gap_ms);
        self.state.shake_count = if chained {
            self.state.shake_count.saturating_add(1)
        } else {
            1
        };
        self.state.last_shake_ms = Some(now);
        tracing::debug!(count = self.state.shake_count, magnitude, "qualifying shake sample");

        if self.state.shake_count >= self.config.required_count && self.cooled_down(now) {
            self.state.last_alert_ms = Some(now);
            self.state.shake_count = 0;
            tracing::info!(at_ms = now, "shake gesture recognised");
            return Some(TriggerEvent::new(TriggerSource::Shake, now));
        }
        None
    }

    fn cooled_down(&self, now: u64) -> bool {
        self.state
            .last_alert_ms
            .map_or(true, |last| now.saturating_sub(last) > self.config.cooldown_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strong(t: u64) -> SensorSample {
        SensorSample::accelerometer(t, [30.0, 30.0, 10.0])
    }

    fn detector() -> ShakeDetector {
        let mut d = ShakeDetector::new(ShakeConfig::default(), true);
        d.register().unwrap();
        d
    }

    fn feed(d: &mut ShakeDetector, times: &[u64]) -> Vec<TriggerEvent> {
        times.iter().filter_map(|t| d.on_sample(&strong(*t))).collect()
    }

    #[test]
    fn magnitude_is_euclidean() {
        let s = SensorSample::accelerometer(0, [3.0, 4.0, 12.0]);
        assert!((s.magnitude() - 13.0).abs() < 1e-9);
    }

    #[test]
    fn six_chained_samples_trigger() {
        let mut d = detector();
        let triggers = feed(&mut d, &[1_000, 1_500, 2_000, 2_500, 3_000, 3_500]);
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].source, TriggerSource::Shake);
        assert_eq!(triggers[0].at_ms, 3_500);
        assert_eq!(d.state().shake_count, 0);
    }

    #[test]
    fn gap_restarts_chain() {
        let mut d = detector();
        assert!(feed(&mut d, &[0, 500, 1_000, 1_500, 2_000]).is_empty());
        assert_eq!(d.state().shake_count, 5);
        // 1200ms gap is not "less than" the chain window.
        assert!(feed(&mut d, &[3_200]).is_empty());
        assert_eq!(d.state().shake_count, 1);
    }

    #[test]
    fn weak_samples_do_not_count() {
        let mut d = detector();
        for t in 0..20 {
            assert!(d
                .on_sample(&SensorSample::accelerometer(t * 100, [20.0, 20.0, 20.0]))
                .is_none());
        }
        assert_eq!(d.state().shake_count, 0);
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut d = detector();
        d.on_sample(&SensorSample::accelerometer(0, [40.0, 0.0, 0.0]));
        assert_eq!(d.state().shake_count, 0);
    }

    #[test]
    fn cooldown_suppresses_second_trigger() {
        let mut d = detector();
        assert_eq!(feed(&mut d, &[0, 100, 200, 300, 400, 500]).len(), 1);
        // Another full chain inside the 10s window is swallowed.
        let times: Vec<u64> = (1..=10).map(|i| 500 + i * 100).collect();
        assert!(feed(&mut d, &times).is_empty());
        assert!(d.state().shake_count >= 6);
        // Keep the chain alive past the cooldown and the next sample fires.
        let mut t = 1_500;
        let mut fired = Vec::new();
        while t <= 12_000 {
            fired.extend(feed(&mut d, &[t]));
            t += 1_000;
        }
        assert_eq!(fired.len(), 1);
        assert!(fired[0].at_ms - 500 > 10_000);
    }

    #[test]
    fn non_accelerometer_ignored() {
        let mut d = detector();
        for t in 0..10 {
            let s = SensorSample {
                sensor: SensorKind::Gyroscope,
                timestamp_ms: t * 100,
                values: [100.0, 100.0, 100.0],
            };
            assert!(d.on_sample(&s).is_none());
        }
        assert_eq!(d.state().shake_count, 0);
    }

    #[test]
    fn unavailable_sensor_is_inert() {
        let mut d = ShakeDetector::new(ShakeConfig::default(), false);
        assert!(matches!(d.register(), Err(CoreError::SensorUnavailable)));
        assert!(!d.is_registered());
        assert!(feed(&mut d, &[0, 100, 200, 300, 400, 500, 600]).is_empty());
    }

    #[test]
    fn unregistered_detector_ignores_samples() {
        let mut d = detector();
        d.unregister();
        assert!(feed(&mut d, &[0, 100, 200, 300, 400, 500]).is_empty());
        assert_eq!(d.state().shake_count, 0);
    }

    #[test]
    fn register_resets_chain_but_keeps_cooldown() {
        let mut d = detector();
        feed(&mut d, &[0, 100, 200, 300, 400, 500]);
        feed(&mut d, &[600, 700]);
        d.register().unwrap();
        assert_eq!(d.state().shake_count, 0);
        assert_eq!(d.state().last_alert_ms, Some(500));
        assert!(feed(&mut d, &[800, 900, 1_000, 1_100, 1_200, 1_300]).is_empty());
    }
}
