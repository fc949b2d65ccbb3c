//! Notification model for the background host.
//!
//! Two logical channels: an ongoing low-importance "listening" notification
//! while the service runs, and an ongoing high-importance "alert pending"
//! notification that carries a single Cancel action.

use serde::{Deserialize, Serialize};

use crate::alert::AlertSession;
use crate::host::{AlertPresenter, Notice};
use crate::permissions::Permission;

pub const LISTENING_NOTIFICATION_ID: u32 = 1;
pub const PENDING_NOTIFICATION_ID: u32 = 2;
pub const NOTICE_NOTIFICATION_ID: u32 = 3;

/// Action identifier delivered back to the service when Cancel is tapped.
pub const ACTION_CANCEL_ALERT: &str = "alertmate.CANCEL_ALERT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Low,
    Default,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    ServiceRunning,
    AlertPending,
}

impl NotificationChannel {
    pub fn id(self) -> &'static str {
        match self {
            NotificationChannel::ServiceRunning => "alertmate_service_channel",
            NotificationChannel::AlertPending => "alertmate_alert_channel",
        }
    }

    pub fn importance(self) -> Importance {
        match self {
            NotificationChannel::ServiceRunning => Importance::Low,
            NotificationChannel::AlertPending => Importance::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub label: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u32,
    pub channel: NotificationChannel,
    pub title: String,
    pub text: String,
    pub ongoing: bool,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    pub fn listening() -> Self {
        Self {
            id: LISTENING_NOTIFICATION_ID,
            channel: NotificationChannel::ServiceRunning,
            title: "AlertMate Service Running".into(),
            text: "Listening for emergency gestures...".into(),
            ongoing: true,
            actions: Vec::new(),
        }
    }

    pub fn pending_alert(delay_secs: u64) -> Self {
        Self {
            id: PENDING_NOTIFICATION_ID,
            channel: NotificationChannel::AlertPending,
            title: "Emergency Alert".into(),
            text: format!("Alert will be sent in {delay_secs} seconds. Tap Cancel to stop."),
            ongoing: true,
            actions: vec![NotificationAction {
                label: "Cancel".into(),
                action: ACTION_CANCEL_ALERT.into(),
            }],
        }
    }

    pub fn notice(notice: &Notice) -> Self {
        Self {
            id: NOTICE_NOTIFICATION_ID,
            channel: NotificationChannel::AlertPending,
            title: "AlertMate".into(),
            text: notice.to_string(),
            ongoing: false,
            actions: Vec::new(),
        }
    }
}

/// Platform notification surface.
pub trait Notifier {
    fn post(&mut self, notification: Notification);
    fn cancel(&mut self, id: u32);
}

/// Presents the cancel option as a notification action.
///
/// Posting is gated on the notification permission: while it is withheld
/// every post is dropped and counted, cancels still go through.
pub struct NotificationPresenter<N: Notifier> {
    notifier: N,
    allowed: bool,
    suppressed: u32,
}

impl<N: Notifier> NotificationPresenter<N> {
    pub fn new(notifier: N) -> Self {
        Self {
            notifier,
            allowed: true,
            suppressed: 0,
        }
    }

    /// Post the ongoing "listening" notification.
    pub fn show_listening(&mut self) {
        self.post(Notification::listening());
    }

    pub fn set_allowed(&mut self, allowed: bool) {
        self.allowed = allowed;
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Posts dropped because the permission was missing.
    pub fn suppressed(&self) -> u32 {
        self.suppressed
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    fn post(&mut self, notification: Notification) {
        if !self.allowed {
            self.suppressed += 1;
            tracing::warn!(
                id = notification.id,
                permission = %Permission::PostNotifications,
                "notification not posted, permission missing"
            );
            return;
        }
        self.notifier.post(notification);
    }
}

impl<N: Notifier> AlertPresenter for NotificationPresenter<N> {
    fn show_pending(&mut self, session: &AlertSession) {
        let delay_secs = session.fire_at_ms.saturating_sub(session.armed_at_ms) / 1000;
        self.notifier.cancel(LISTENING_NOTIFICATION_ID);
        self.post(Notification::pending_alert(delay_secs));
    }

    fn clear_pending(&mut self) {
        self.notifier.cancel(PENDING_NOTIFICATION_ID);
        self.post(Notification::listening());
    }

    fn notice(&mut self, notice: Notice) {
        self.post(Notification::notice(&notice));
    }
}
