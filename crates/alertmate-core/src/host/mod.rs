//! Hosts that run the detection and arming pipeline.
//!
//! [`AlertHost`] is the shared core. [`ForegroundHost`] adds the volume
//! gesture, the safety timer and contact management; [`BackgroundService`]
//! adds the wake lock and the notification-driven cancel action. Each host
//! differs only in how it presents the cancel option, which is the
//! [`AlertPresenter`] it is built with.

mod alert_host;
mod background;
mod foreground;

pub use alert_host::AlertHost;
pub use background::{BackgroundService, ServiceCommand, ServiceParts};
pub use foreground::ForegroundHost;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::alert::AlertSession;
use crate::permissions::Permission;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    Foreground,
    Background,
}

/// A user-visible signal. Every path that ends without sending produces one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    NoContacts,
    AlertArmed { delay_secs: u64 },
    AlertCancelled,
    AlertSent { delivered: usize },
    SendFailed { reason: String },
    PermissionDenied { permission: Permission },
    ShakeDetected,
    VolumeHeld,
    TimerStarted { minutes: u32 },
    TimerStopped,
    TimerExpired,
    TimerRejected { reason: String },
    ContactSaved,
    ContactRejected { reason: String },
    ContactsCleared,
    SensorUnavailable,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoContacts => write!(f, "Please add emergency contacts first"),
            Notice::AlertArmed { delay_secs } => {
                write!(f, "Sending alert in {delay_secs} seconds. Tap Cancel to stop.")
            }
            Notice::AlertCancelled => write!(f, "Alert cancelled"),
            Notice::AlertSent { delivered } => {
                write!(f, "Emergency SMS sent to {delivered} contact(s)!")
            }
            Notice::SendFailed { reason } => write!(f, "Failed to send SMS: {reason}"),
            Notice::PermissionDenied { permission } => {
                write!(f, "Permission required: {permission}")
            }
            Notice::ShakeDetected => write!(f, "Shake Detected: Emergency Alert Triggered!"),
            Notice::VolumeHeld => write!(f, "Volume Button Held: Emergency Alert Triggered!"),
            Notice::TimerStarted { minutes } => write!(f, "Timer started for {minutes} minutes"),
            Notice::TimerStopped => write!(f, "Safety Timer Stopped"),
            Notice::TimerExpired => write!(f, "Timer Expired: Sending emergency alert now."),
            Notice::TimerRejected { reason } => {
                write!(f, "Set timer and add at least one contact ({reason})")
            }
            Notice::ContactSaved => write!(f, "Contact saved"),
            Notice::ContactRejected { reason } => write!(f, "{reason}"),
            Notice::ContactsCleared => write!(f, "All contacts deleted"),
            Notice::SensorUnavailable => write!(f, "Shake detection unavailable on this device"),
        }
    }
}

/// How a host shows the pending alert and its cancel option
/// (a dialog in the foreground, a notification action in the background).
pub trait AlertPresenter {
    /// An alert was armed; offer the user a way to cancel it.
    fn show_pending(&mut self, session: &AlertSession);
    /// The pending alert fired or was cancelled; withdraw the cancel option.
    fn clear_pending(&mut self);
    /// Show a transient message.
    fn notice(&mut self, notice: Notice);
}
