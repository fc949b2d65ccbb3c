//! Safety timer.
//!
//! A user-set countdown that raises a timer-expiry trigger when it runs out.
//! Like the alert armer it has no thread: the host calls `tick()` (about once
//! a second) and the timer reports remaining whole seconds or expiry.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (stop | expiry) -> Idle
//! ```
//!
//! Starting while running replaces the running countdown.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyTimerState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyTimer {
    state: SafetyTimerState,
    duration_ms: u64,
    /// Remaining time in milliseconds.
    remaining_ms: u64,
    /// Clock reading at the last flush; elapsed time is measured from here.
    #[serde(default)]
    last_tick_ms: Option<u64>,
    /// Last whole-second value reported through `TimerTick`.
    #[serde(default)]
    last_reported_secs: Option<u64>,
}

impl Default for SafetyTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl SafetyTimer {
    pub fn new() -> Self {
        Self {
            state: SafetyTimerState::Idle,
            duration_ms: 0,
            remaining_ms: 0,
            last_tick_ms: None,
            last_reported_secs: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SafetyTimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SafetyTimerState::Running
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_ms / 1000
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a countdown of `minutes`.
    ///
    /// # Errors
    /// `Validation` for a zero duration, `NoContacts` when nobody would be
    /// alerted. A running timer is left untouched on error.
    pub fn start(&mut self, minutes: u32, has_contacts: bool, now_ms: u64) -> Result<Event> {
        if minutes == 0 {
            return Err(ValidationError::invalid("minutes", "must be at least 1").into());
        }
        if !has_contacts {
            return Err(CoreError::NoContacts);
        }

        let replaced = self.is_running();
        if replaced {
            tracing::info!("replacing running safety timer");
        }
        self.duration_ms = u64::from(minutes) * 60 * 1000;
        self.remaining_ms = self.duration_ms;
        self.state = SafetyTimerState::Running;
        self.last_tick_ms = Some(now_ms);
        self.last_reported_secs = None;
        tracing::info!(minutes, "safety timer started");
        Ok(Event::TimerStarted {
            duration_secs: self.duration_ms / 1000,
            replaced,
            at_ms: now_ms,
        })
    }

    /// Stop without side effects. `None` when nothing was running.
    pub fn stop(&mut self, now_ms: u64) -> Option<Event> {
        if !self.is_running() {
            return None;
        }
        self.reset();
        tracing::info!("safety timer stopped");
        Some(Event::TimerStopped { at_ms: now_ms })
    }

    /// Call periodically. Returns `TimerTick` when the displayed second
    /// changes and `TimerExpired` once when the countdown reaches zero.
    pub fn tick(&mut self, now_ms: u64) -> Option<Event> {
        if !self.is_running() {
            return None;
        }
        self.flush_elapsed(now_ms);
        if self.remaining_ms == 0 {
            self.reset();
            tracing::info!("safety timer expired");
            return Some(Event::TimerExpired { at_ms: now_ms });
        }

        let secs = self.remaining_secs();
        if self.last_reported_secs == Some(secs) {
            return None;
        }
        self.last_reported_secs = Some(secs);
        Some(Event::TimerTick {
            remaining_secs: secs,
            at_ms: now_ms,
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn flush_elapsed(&mut self, now_ms: u64) {
        if let Some(last) = self.last_tick_ms {
            let elapsed = now_ms.saturating_sub(last);
            self.remaining_ms = self.remaining_ms.saturating_sub(elapsed);
            self.last_tick_ms = Some(now_ms);
        }
    }

    fn reset(&mut self) {
        self.state = SafetyTimerState::Idle;
        self.remaining_ms = 0;
        self.last_tick_ms = None;
        self.last_reported_secs = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_tick_expire() {
        let mut timer = SafetyTimer::new();
        let started = timer.start(1, true, 0).unwrap();
        assert!(matches!(
            started,
            Event::TimerStarted {
                duration_secs: 60,
                replaced: false,
                ..
            }
        ));
        assert!(timer.is_running());

        assert!(matches!(
            timer.tick(500),
            Some(Event::TimerTick { remaining_secs: 59, .. })
        ));
        // Same displayed second: nothing new to report.
        assert!(timer.tick(900).is_none());
        assert!(matches!(
            timer.tick(30_000),
            Some(Event::TimerTick { remaining_secs: 30, .. })
        ));
        assert!(matches!(timer.tick(60_000), Some(Event::TimerExpired { .. })));
        assert_eq!(timer.state(), SafetyTimerState::Idle);
        assert!(timer.tick(61_000).is_none());
    }

    #[test]
    fn late_tick_still_expires_once() {
        let mut timer = SafetyTimer::new();
        timer.start(1, true, 0).unwrap();
        assert!(matches!(timer.tick(600_000), Some(Event::TimerExpired { .. })));
        assert!(timer.tick(600_001).is_none());
    }

    #[test]
    fn stop_has_no_side_effect() {
        let mut timer = SafetyTimer::new();
        timer.start(2, true, 0).unwrap();
        assert!(matches!(timer.stop(5_000), Some(Event::TimerStopped { .. })));
        assert!(timer.tick(500_000).is_none());
        assert!(timer.stop(500_000).is_none());
    }

    #[test]
    fn start_requires_contacts_and_minutes() {
        let mut timer = SafetyTimer::new();
        assert!(matches!(timer.start(5, false, 0), Err(CoreError::NoContacts)));
        assert!(matches!(timer.start(0, true, 0), Err(CoreError::Validation(_))));
        assert!(!timer.is_running());
    }

    #[test]
    fn restart_replaces_running_timer() {
        let mut timer = SafetyTimer::new();
        timer.start(1, true, 0).unwrap();
        timer.tick(30_000);
        let event = timer.start(2, true, 30_000).unwrap();
        assert!(matches!(event, Event::TimerStarted { replaced: true, duration_secs: 120, .. }));
        // Old deadline (60s) passes without expiry.
        assert!(!matches!(timer.tick(61_000), Some(Event::TimerExpired { .. })));
        assert!(matches!(timer.tick(150_000), Some(Event::TimerExpired { .. })));
    }
}
