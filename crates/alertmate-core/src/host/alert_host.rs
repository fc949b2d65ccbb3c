//! Shared detection → arming → dispatch pipeline.

use std::collections::BTreeSet;

use chrono::Utc;

use super::{AlertPresenter, HostKind, Notice};
use crate::alert::{AlertArmer, ArmOutcome};
use crate::detection::{SensorSample, ShakeDetector};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::location::{Location, LocationProvider, LocationTracker};
use crate::permissions::{Permission, PermissionChecker};
use crate::sms::{SmsDispatcher, SmsSender};
use crate::storage::{Config, ContactStore};
use crate::trigger::{TriggerEvent, TriggerSource};

/// One instance per host. All callbacks arrive on the host's single
/// execution context, so the state needs no locking.
pub struct AlertHost<P: AlertPresenter, S: SmsSender> {
    kind: HostKind,
    config: Config,
    contacts: ContactStore,
    permissions: Box<dyn PermissionChecker>,
    shake: ShakeDetector,
    armer: AlertArmer,
    location: LocationTracker,
    dispatcher: SmsDispatcher,
    presenter: P,
    sender: S,
}

impl<P: AlertPresenter, S: SmsSender> AlertHost<P, S> {
    pub fn new(
        kind: HostKind,
        config: Config,
        contacts: ContactStore,
        permissions: Box<dyn PermissionChecker>,
        presenter: P,
        sender: S,
        sensor_available: bool,
    ) -> Self {
        let mut presenter = presenter;
        if !sensor_available {
            presenter.notice(Notice::SensorUnavailable);
        }
        Self {
            kind,
            shake: ShakeDetector::new(config.shake, sensor_available),
            armer: AlertArmer::new(config.arming.delay_ms),
            location: LocationTracker::new(config.location_request(), config.location.stale_after_ms),
            dispatcher: SmsDispatcher::new(),
            config,
            contacts,
            permissions,
            presenter,
            sender,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn kind(&self) -> HostKind {
        self.kind
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn contacts(&self) -> &ContactStore {
        &self.contacts
    }

    pub fn permissions(&self) -> &dyn PermissionChecker {
        self.permissions.as_ref()
    }

    pub fn shake(&self) -> &ShakeDetector {
        &self.shake
    }

    pub fn armer(&self) -> &AlertArmer {
        &self.armer
    }

    pub fn location(&self) -> &LocationTracker {
        &self.location
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub fn sender_mut(&mut self) -> &mut S {
        &mut self.sender
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace the permission view, e.g. after the user answered a prompt.
    pub fn set_permissions(&mut self, permissions: Box<dyn PermissionChecker>) {
        self.permissions = permissions;
    }

    /// Subscribe to location updates if permitted.
    ///
    /// Without location permission tracking stays off, the user is told so
    /// and a `PermissionDenied` event is returned. Every later alert then
    /// says the location is unavailable.
    pub fn start_location<L: LocationProvider + ?Sized>(
        &mut self,
        provider: &mut L,
        now_ms: u64,
    ) -> Result<Option<Event>> {
        if self.location.start(self.permissions.as_ref(), provider)? {
            return Ok(None);
        }
        let permission = Permission::FineLocation;
        self.presenter.notice(Notice::PermissionDenied { permission });
        Ok(Some(Event::PermissionDenied {
            permission,
            at_ms: now_ms,
        }))
    }

    pub fn register_listener(&mut self, now_ms: u64) -> Option<Event> {
        match self.shake.register() {
            Ok(()) => Some(Event::ListenerRegistered { at_ms: now_ms }),
            Err(e) => {
                tracing::debug!(error = %e, "shake listener not registered");
                None
            }
        }
    }

    pub fn unregister_listener(&mut self, now_ms: u64) -> Option<Event> {
        if !self.shake.is_registered() {
            return None;
        }
        self.shake.unregister();
        Some(Event::ListenerUnregistered { at_ms: now_ms })
    }

    pub fn on_sensor(&mut self, sample: &SensorSample) -> Vec<Event> {
        match self.shake.on_sample(sample) {
            Some(trigger) => self.handle_trigger(trigger),
            None => Vec::new(),
        }
    }

    pub fn on_location(&mut self, fix: Location) -> Option<Event> {
        self.location.on_update(fix).then_some(Event::LocationUpdated {
            latitude: fix.latitude,
            longitude: fix.longitude,
            at_ms: fix.recorded_at_ms,
        })
    }

    /// Route a trigger by its source policy: arm a cancellable alert, or
    /// send right away.
    pub fn handle_trigger(&mut self, trigger: TriggerEvent) -> Vec<Event> {
        let mut events = vec![Event::TriggerRaised {
            source: trigger.source,
            at_ms: trigger.at_ms,
        }];

        let contacts = match self.contacts.load() {
            Ok(contacts) => contacts,
            Err(e) => {
                tracing::error!(error = %e, "failed to read contacts");
                self.presenter.notice(Notice::SendFailed {
                    reason: e.to_string(),
                });
                events.push(aborted(trigger, &e));
                return events;
            }
        };

        let policy = self.config.policy_for(trigger.source);
        let template = self.config.message_for(trigger.source, self.kind).to_string();
        let location = self.location.last_known();

        if policy.confirm {
            // A trigger swallowed by a pending session stays silent.
            if self.armer.pending().is_none() && !contacts.is_empty() {
                self.announce(trigger.source);
            }
            match self.armer.arm(trigger, &template, contacts, location) {
                Ok(ArmOutcome::Armed(session)) => {
                    self.presenter.show_pending(&session);
                    self.presenter.notice(Notice::AlertArmed {
                        delay_secs: self.armer.delay_ms() / 1000,
                    });
                    events.push(Event::AlertArmed {
                        session_id: session.id,
                        source: session.source,
                        fire_at_ms: session.fire_at_ms,
                        at_ms: trigger.at_ms,
                    });
                }
                Ok(ArmOutcome::Ignored) => events.push(Event::TriggerIgnored {
                    source: trigger.source,
                    at_ms: trigger.at_ms,
                }),
                Err(e) => {
                    self.notice_for(&e);
                    events.push(aborted(trigger, &e));
                }
            }
            return events;
        }

        if contacts.is_empty() {
            let e = CoreError::NoContacts;
            self.notice_for(&e);
            events.push(aborted(trigger, &e));
            return events;
        }
        self.announce(trigger.source);
        events.push(self.dispatch(trigger.source, &template, location, &contacts, trigger.at_ms));
        events
    }

    /// User cancelled the pending alert. `None` when nothing was armed.
    pub fn cancel_pending(&mut self, now_ms: u64) -> Option<Event> {
        let session = self.armer.cancel()?;
        self.presenter.clear_pending();
        self.presenter.notice(Notice::AlertCancelled);
        Some(Event::AlertCancelled {
            session_id: session.id,
            at_ms: now_ms,
        })
    }

    /// Fire the armed alert once its delay has elapsed.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Event> {
        let Some(session) = self.armer.tick(now_ms) else {
            return Vec::new();
        };
        self.presenter.clear_pending();
        let mut events = vec![Event::AlertFired {
            session_id: session.id,
            source: session.source,
            at_ms: now_ms,
        }];
        events.push(self.dispatch(
            session.source,
            &session.message_template,
            session.location_snapshot,
            &session.contacts_snapshot,
            now_ms,
        ));
        events
    }

    /// "Send alert" button: immediate dispatch with the manual template.
    pub fn send_manual_alert(&mut self, now_ms: u64) -> Vec<Event> {
        self.handle_trigger(TriggerEvent::new(TriggerSource::Manual, now_ms))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn announce(&mut self, source: TriggerSource) {
        match source {
            TriggerSource::Shake => self.presenter.notice(Notice::ShakeDetected),
            TriggerSource::VolumeHold => self.presenter.notice(Notice::VolumeHeld),
            TriggerSource::TimerExpiry => self.presenter.notice(Notice::TimerExpired),
            TriggerSource::Manual => {}
        }
    }

    fn notice_for(&mut self, err: &CoreError) {
        let notice = match err {
            CoreError::NoContacts => Notice::NoContacts,
            CoreError::PermissionDenied { permission } => Notice::PermissionDenied {
                permission: *permission,
            },
            other => Notice::SendFailed {
                reason: other.to_string(),
            },
        };
        self.presenter.notice(notice);
    }

    fn dispatch(
        &mut self,
        source: TriggerSource,
        template: &str,
        location: Option<Location>,
        contacts: &BTreeSet<String>,
        now_ms: u64,
    ) -> Event {
        if self.location.is_stale(now_ms) {
            tracing::warn!("last location fix is stale");
        }
        let result = self.dispatcher.dispatch(
            self.permissions.as_ref(),
            &mut self.sender,
            source,
            template,
            location.as_ref(),
            contacts,
        );
        match result {
            Ok(report) => {
                if let Err(e) = self.contacts.database().record_dispatch(&report, Utc::now()) {
                    tracing::warn!(error = %e, "failed to record dispatch");
                }
                if report.all_delivered() {
                    self.presenter.notice(Notice::AlertSent {
                        delivered: report.delivered.len(),
                    });
                } else if !report.any_delivered() {
                    let reason = report
                        .first_error()
                        .map(|e| e.to_string())
                        .unwrap_or_default();
                    self.presenter.notice(Notice::SendFailed { reason });
                } else {
                    let failed: Vec<&str> =
                        report.failed.iter().map(|f| f.contact.as_str()).collect();
                    self.presenter.notice(Notice::SendFailed {
                        reason: format!(
                            "{} of {} contact(s) failed: {}",
                            failed.len(),
                            contacts.len(),
                            failed.join(", ")
                        ),
                    });
                }
                Event::AlertDispatched {
                    report,
                    at_ms: now_ms,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, source = source.as_str(), "alert dispatch failed");
                self.notice_for(&e);
                Event::DispatchFailed {
                    source,
                    reason: e.to_string(),
                    at_ms: now_ms,
                }
            }
        }
    }
}

fn aborted(trigger: TriggerEvent, err: &CoreError) -> Event {
    Event::TriggerAborted {
        source: trigger.source,
        reason: err.to_string(),
        at_ms: trigger.at_ms,
    }
}
