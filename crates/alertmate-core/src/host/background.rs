//! Background listening service.
//!
//! Keeps shake detection alive while the app is not visible. Holds a wake
//! lock for its whole lifetime and presents the pending alert as an ongoing
//! notification whose Cancel action comes back as [`ServiceCommand::CancelAlert`].

use super::{AlertHost, HostKind};
use crate::detection::SensorSample;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::location::{Location, LocationProvider};
use crate::notification::{NotificationPresenter, Notifier, ACTION_CANCEL_ALERT};
use crate::permissions::{Permission, PermissionChecker};
use crate::power::{Haptics, WakeLock, WakeLockGuard, ARM_VIBRATION_MS};
use crate::sms::SmsSender;
use crate::storage::{Config, ContactStore};

/// Commands delivered to a running service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCommand {
    /// The Cancel action on the pending-alert notification.
    CancelAlert,
    /// Any other start request; re-registers the sensor listener.
    Restart,
}

impl ServiceCommand {
    pub fn from_action(action: Option<&str>) -> Self {
        match action {
            Some(ACTION_CANCEL_ALERT) => ServiceCommand::CancelAlert,
            _ => ServiceCommand::Restart,
        }
    }
}

/// Everything a service needs from its platform.
pub struct ServiceParts<N, S, W> {
    pub config: Config,
    pub contacts: ContactStore,
    pub permissions: Box<dyn PermissionChecker>,
    pub notifier: N,
    pub sender: S,
    pub wake_lock: W,
    pub haptics: Box<dyn Haptics>,
    pub sensor_available: bool,
}

pub struct BackgroundService<N: Notifier, S: SmsSender, W: WakeLock> {
    host: AlertHost<NotificationPresenter<N>, S>,
    wake_lock: WakeLockGuard<W>,
    haptics: Box<dyn Haptics>,
    running: bool,
}

impl<N: Notifier, S: SmsSender, W: WakeLock> BackgroundService<N, S, W> {
    /// Start listening.
    ///
    /// # Errors
    /// `PermissionDenied` when foreground-service or location permissions
    /// are missing; nothing is started and no wake lock is taken.
    ///
    /// A withheld notification permission does not stop the service: posts
    /// are skipped and the returned events carry a `PermissionDenied`.
    pub fn start<L: LocationProvider + ?Sized>(
        parts: ServiceParts<N, S, W>,
        provider: &mut L,
        now_ms: u64,
    ) -> Result<(Self, Vec<Event>)> {
        if let Some(permission) = parts
            .permissions
            .first_missing(&Permission::service_requirements())
        {
            tracing::warn!(%permission, "background service not started");
            return Err(CoreError::PermissionDenied { permission });
        }

        let notifications_allowed = parts.permissions.is_granted(Permission::PostNotifications);
        let mut presenter = NotificationPresenter::new(parts.notifier);
        presenter.set_allowed(notifications_allowed);
        presenter.show_listening();

        let mut host = AlertHost::new(
            HostKind::Background,
            parts.config,
            parts.contacts,
            parts.permissions,
            presenter,
            parts.sender,
            parts.sensor_available,
        );

        let mut events = vec![Event::ServiceStarted { at_ms: now_ms }];
        if !notifications_allowed {
            events.push(Event::PermissionDenied {
                permission: Permission::PostNotifications,
                at_ms: now_ms,
            });
        }
        events.extend(host.register_listener(now_ms));
        match host.start_location(provider, now_ms) {
            Ok(denied) => events.extend(denied),
            Err(e) => tracing::warn!(error = %e, "location tracking failed to start"),
        }

        let wake_lock = WakeLockGuard::acquire(parts.wake_lock);
        tracing::info!("background service started");
        Ok((
            Self {
                host,
                wake_lock,
                haptics: parts.haptics,
                running: true,
            },
            events,
        ))
    }

    pub fn host(&self) -> &AlertHost<NotificationPresenter<N>, S> {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut AlertHost<NotificationPresenter<N>, S> {
        &mut self.host
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_wake_lock_held(&self) -> bool {
        self.wake_lock.is_held()
    }

    /// Replace the permission view and re-evaluate notification posting.
    pub fn set_permissions(&mut self, permissions: Box<dyn PermissionChecker>) {
        let allowed = permissions.is_granted(Permission::PostNotifications);
        self.host.presenter_mut().set_allowed(allowed);
        self.host.set_permissions(permissions);
    }

    pub fn on_start_command(&mut self, command: ServiceCommand, now_ms: u64) -> Vec<Event> {
        if !self.running {
            return Vec::new();
        }
        match command {
            ServiceCommand::CancelAlert => self.host.cancel_pending(now_ms).into_iter().collect(),
            ServiceCommand::Restart => {
                let mut events: Vec<Event> =
                    self.host.unregister_listener(now_ms).into_iter().collect();
                events.extend(self.host.register_listener(now_ms));
                events
            }
        }
    }

    pub fn on_sensor(&mut self, sample: &SensorSample) -> Vec<Event> {
        if !self.running {
            return Vec::new();
        }
        let events = self.host.on_sensor(sample);
        if events.iter().any(|e| matches!(e, Event::AlertArmed { .. })) {
            self.haptics.vibrate(ARM_VIBRATION_MS);
        }
        events
    }

    pub fn on_location(&mut self, fix: Location) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.host.on_location(fix)
    }

    pub fn tick(&mut self, now_ms: u64) -> Vec<Event> {
        if !self.running {
            return Vec::new();
        }
        self.host.tick(now_ms)
    }

    /// Tear down: stop listening and release the wake lock. Idempotent.
    pub fn shutdown(&mut self, now_ms: u64) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.running = false;
        self.host.unregister_listener(now_ms);
        self.wake_lock.release();
        tracing::info!("background service stopped");
        Some(Event::ServiceStopped { at_ms: now_ms })
    }
}
