//! Foreground host: the screen the user is looking at.

use std::collections::BTreeSet;

use super::{AlertHost, AlertPresenter, HostKind, Notice};
use crate::detection::{KeyEvent, SensorSample, VolumeHoldDetector};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::location::{Location, LocationProvider};
use crate::permissions::PermissionChecker;
use crate::sms::SmsSender;
use crate::storage::{Config, ContactStore};
use crate::timer::SafetyTimer;
use crate::trigger::{TriggerEvent, TriggerSource};

pub struct ForegroundHost<P: AlertPresenter, S: SmsSender> {
    host: AlertHost<P, S>,
    volume: VolumeHoldDetector,
    timer: SafetyTimer,
}

impl<P: AlertPresenter, S: SmsSender> ForegroundHost<P, S> {
    pub fn new(
        config: Config,
        contacts: ContactStore,
        permissions: Box<dyn PermissionChecker>,
        presenter: P,
        sender: S,
        sensor_available: bool,
    ) -> Self {
        let volume = VolumeHoldDetector::new(config.volume.hold_ms);
        Self {
            host: AlertHost::new(
                HostKind::Foreground,
                config,
                contacts,
                permissions,
                presenter,
                sender,
                sensor_available,
            ),
            volume,
            timer: SafetyTimer::new(),
        }
    }

    pub fn host(&self) -> &AlertHost<P, S> {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut AlertHost<P, S> {
        &mut self.host
    }

    pub fn timer(&self) -> &SafetyTimer {
        &self.timer
    }

    pub fn volume(&self) -> &VolumeHoldDetector {
        &self.volume
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Screen visible: start location tracking and listen for shakes.
    /// Missing location permission shows up as a `PermissionDenied` event.
    pub fn resume<L: LocationProvider + ?Sized>(
        &mut self,
        provider: &mut L,
        now_ms: u64,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        match self.host.start_location(provider, now_ms) {
            Ok(denied) => events.extend(denied),
            Err(e) => tracing::warn!(error = %e, "location tracking failed to start"),
        }
        events.extend(self.host.register_listener(now_ms));
        events
    }

    /// Screen hidden: stop listening. A pending alert keeps its schedule.
    pub fn pause(&mut self, now_ms: u64) -> Option<Event> {
        self.host.unregister_listener(now_ms)
    }

    // ── Inputs ───────────────────────────────────────────────────────

    pub fn on_sensor(&mut self, sample: &SensorSample) -> Vec<Event> {
        self.host.on_sensor(sample)
    }

    pub fn on_location(&mut self, fix: Location) -> Option<Event> {
        self.host.on_location(fix)
    }

    pub fn on_key(&mut self, event: &KeyEvent) -> Vec<Event> {
        match self.volume.on_key(event) {
            Some(trigger) => self.host.handle_trigger(trigger),
            None => Vec::new(),
        }
    }

    /// Cancel button on the confirmation dialog.
    pub fn cancel_pending(&mut self, now_ms: u64) -> Option<Event> {
        self.host.cancel_pending(now_ms)
    }

    pub fn send_manual_alert(&mut self, now_ms: u64) -> Vec<Event> {
        self.host.send_manual_alert(now_ms)
    }

    /// Drive deferred work: the arming window and the safety timer.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = self.host.tick(now_ms);
        if let Some(event) = self.timer.tick(now_ms) {
            let expired = matches!(event, Event::TimerExpired { .. });
            events.push(event);
            if expired {
                let trigger = TriggerEvent::new(TriggerSource::TimerExpiry, now_ms);
                events.extend(self.host.handle_trigger(trigger));
            }
        }
        events
    }

    // ── Safety timer ─────────────────────────────────────────────────

    pub fn start_timer(&mut self, minutes: u32, now_ms: u64) -> Result<Event> {
        let has_contacts = match self.host.contacts().is_empty() {
            Ok(empty) => !empty,
            Err(e) => {
                self.host.presenter_mut().notice(Notice::TimerRejected {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };
        match self.timer.start(minutes, has_contacts, now_ms) {
            Ok(event) => {
                self.host.presenter_mut().notice(Notice::TimerStarted { minutes });
                Ok(event)
            }
            Err(e) => {
                self.host.presenter_mut().notice(Notice::TimerRejected {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    pub fn stop_timer(&mut self, now_ms: u64) -> Option<Event> {
        let event = self.timer.stop(now_ms)?;
        self.host.presenter_mut().notice(Notice::TimerStopped);
        Some(event)
    }

    // ── Contacts ─────────────────────────────────────────────────────

    pub fn contacts(&self) -> Result<BTreeSet<String>> {
        self.host.contacts().load()
    }

    pub fn add_contact(&mut self, number: &str) -> Result<BTreeSet<String>> {
        match self.host.contacts().save_contact(number) {
            Ok(contacts) => {
                self.host.presenter_mut().notice(Notice::ContactSaved);
                Ok(contacts)
            }
            Err(CoreError::Contact(e)) => {
                self.host.presenter_mut().notice(Notice::ContactRejected {
                    reason: e.to_string(),
                });
                Err(e.into())
            }
            Err(e) => Err(e),
        }
    }

    pub fn delete_contacts(&mut self) -> Result<()> {
        self.host.contacts().delete_all()?;
        self.host.presenter_mut().notice(Notice::ContactsCleared);
        Ok(())
    }
}
