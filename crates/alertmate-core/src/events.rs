use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::permissions::Permission;
use crate::sms::DispatchReport;
use crate::trigger::TriggerSource;

/// Every state change in the system produces an Event.
/// Hosts return them to their embedder, which may log or render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ListenerRegistered {
        at_ms: u64,
    },
    ListenerUnregistered {
        at_ms: u64,
    },
    LocationUpdated {
        latitude: f64,
        longitude: f64,
        at_ms: u64,
    },
    TriggerRaised {
        source: TriggerSource,
        at_ms: u64,
    },
    /// A trigger arrived while an alert was already armed.
    TriggerIgnored {
        source: TriggerSource,
        at_ms: u64,
    },
    /// A trigger could not proceed (no contacts, missing permission).
    TriggerAborted {
        source: TriggerSource,
        reason: String,
        at_ms: u64,
    },
    AlertArmed {
        session_id: Uuid,
        source: TriggerSource,
        fire_at_ms: u64,
        at_ms: u64,
    },
    AlertCancelled {
        session_id: Uuid,
        at_ms: u64,
    },
    AlertFired {
        session_id: Uuid,
        source: TriggerSource,
        at_ms: u64,
    },
    AlertDispatched {
        report: DispatchReport,
        at_ms: u64,
    },
    DispatchFailed {
        source: TriggerSource,
        reason: String,
        at_ms: u64,
    },
    TimerStarted {
        duration_secs: u64,
        /// A running timer was cancelled to make room for this one.
        replaced: bool,
        at_ms: u64,
    },
    TimerTick {
        remaining_secs: u64,
        at_ms: u64,
    },
    TimerStopped {
        at_ms: u64,
    },
    TimerExpired {
        at_ms: u64,
    },
    /// A feature stays off because the user has not granted `permission`.
    PermissionDenied {
        permission: Permission,
        at_ms: u64,
    },
    ServiceStarted {
        at_ms: u64,
    },
    ServiceStopped {
        at_ms: u64,
    },
}

impl Event {
    pub fn at_ms(&self) -> u64 {
        match self {
            Event::ListenerRegistered { at_ms }
            | Event::ListenerUnregistered { at_ms }
            | Event::LocationUpdated { at_ms, .. }
            | Event::TriggerRaised { at_ms, .. }
            | Event::TriggerIgnored { at_ms, .. }
            | Event::TriggerAborted { at_ms, .. }
            | Event::AlertArmed { at_ms, .. }
            | Event::AlertCancelled { at_ms, .. }
            | Event::AlertFired { at_ms, .. }
            | Event::AlertDispatched { at_ms, .. }
            | Event::DispatchFailed { at_ms, .. }
            | Event::TimerStarted { at_ms, .. }
            | Event::TimerTick { at_ms, .. }
            | Event::TimerStopped { at_ms }
            | Event::TimerExpired { at_ms }
            | Event::PermissionDenied { at_ms, .. }
            | Event::ServiceStarted { at_ms }
            | Event::ServiceStopped { at_ms } => *at_ms,
        }
    }
}
