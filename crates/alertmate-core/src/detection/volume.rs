//! Volume-down long-press detection.

use serde::{Deserialize, Serialize};

use crate::trigger::{TriggerEvent, TriggerSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCode {
    VolumeDown,
    VolumeUp,
    Power,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub action: KeyAction,
    pub timestamp_ms: u64,
}

impl KeyEvent {
    pub fn new(code: KeyCode, action: KeyAction, timestamp_ms: u64) -> Self {
        Self {
            code,
            action,
            timestamp_ms,
        }
    }
}

/// Tracks how long volume-down is held and emits a trigger on release once
/// the hold reaches `hold_ms`.
#[derive(Debug, Clone)]
pub struct VolumeHoldDetector {
    hold_ms: u64,
    pressed_at_ms: Option<u64>,
}

impl VolumeHoldDetector {
    pub fn new(hold_ms: u64) -> Self {
        Self {
            hold_ms,
            pressed_at_ms: None,
        }
    }

    pub fn hold_ms(&self) -> u64 {
        self.hold_ms
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_at_ms.is_some()
    }

    pub fn on_key(&mut self, event: &KeyEvent) -> Option<TriggerEvent> {
        if event.code != KeyCode::VolumeDown {
            return None;
        }
        match event.action {
            KeyAction::Down => {
                // Auto-repeat delivers more downs; the first one wins.
                if self.pressed_at_ms.is_none() {
                    self.pressed_at_ms = Some(event.timestamp_ms);
                }
                None
            }
            KeyAction::Up => {
                let started = self.pressed_at_ms.take()?;
                let held = event.timestamp_ms.saturating_sub(started);
                if held >= self.hold_ms {
                    tracing::info!(held_ms = held, "volume-down long press");
                    Some(TriggerEvent::new(TriggerSource::VolumeHold, event.timestamp_ms))
                } else {
                    None
                }
            }
        }
    }
}
