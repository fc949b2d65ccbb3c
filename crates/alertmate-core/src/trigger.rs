//! Trigger signals and per-source routing policy.

use serde::{Deserialize, Serialize};

/// Where an emergency trigger came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Shake,
    VolumeHold,
    TimerExpiry,
    Manual,
}

impl TriggerSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Shake => "shake",
            TriggerSource::VolumeHold => "volume_hold",
            TriggerSource::TimerExpiry => "timer_expiry",
            TriggerSource::Manual => "manual",
        }
    }
}

impl std::str::FromStr for TriggerSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shake" => Ok(TriggerSource::Shake),
            "volume_hold" => Ok(TriggerSource::VolumeHold),
            "timer_expiry" => Ok(TriggerSource::TimerExpiry),
            "manual" => Ok(TriggerSource::Manual),
            other => Err(format!("unknown trigger source: {other}")),
        }
    }
}

/// "The user intends to raise an emergency alert."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub source: TriggerSource,
    /// Monotonic milliseconds at which the trigger was recognised.
    pub at_ms: u64,
}

impl TriggerEvent {
    pub fn new(source: TriggerSource, at_ms: u64) -> Self {
        Self { source, at_ms }
    }
}

/// How a host reacts to a trigger of one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPolicy {
    /// Arm a cancellable delayed alert instead of sending right away.
    #[serde(default)]
    pub confirm: bool,
}

impl TriggerPolicy {
    pub const CONFIRM: TriggerPolicy = TriggerPolicy { confirm: true };
    pub const IMMEDIATE: TriggerPolicy = TriggerPolicy { confirm: false };
}
