//! Alert message composition and SMS fan-out.
//!
//! The final message is the template, a newline, then either the map link
//! for the last known fix or a placeholder. It is sent individually to each
//! contact. Failures are recorded per contact and the fan-out continues; the
//! caller decides how to surface a partial failure. Nothing is retried.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::location::Location;
use crate::permissions::{Permission, PermissionChecker};
use crate::trigger::TriggerSource;

pub const LOCATION_UNAVAILABLE: &str = "(Location not available)";
pub const LOCATION_PREFIX: &str = "My Live Location: ";

/// Platform SMS transport.
pub trait SmsSender {
    /// Send one text message. An `Err` is the platform's failure description.
    fn send_text(&mut self, to: &str, body: &str) -> std::result::Result<(), String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFailure {
    pub contact: String,
    pub reason: String,
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub source: TriggerSource,
    pub message: String,
    pub delivered: Vec<String>,
    pub failed: Vec<ContactFailure>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn any_delivered(&self) -> bool {
        !self.delivered.is_empty()
    }

    /// The first failure as a [`CoreError`], for callers that need one.
    pub fn first_error(&self) -> Option<CoreError> {
        self.failed.first().map(|f| CoreError::SendFailure {
            contact: f.contact.clone(),
            message: f.reason.clone(),
        })
    }
}

/// Build the outbound text.
pub fn compose_message(template: &str, location: Option<&Location>) -> String {
    match location {
        Some(loc) => format!("{template}\n{LOCATION_PREFIX}{}", loc.map_url()),
        None => format!("{template}\n{LOCATION_UNAVAILABLE}"),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SmsDispatcher;

impl SmsDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Compose and send to every contact.
    ///
    /// # Errors
    /// `PermissionDenied` when SMS sending is not granted; nothing is sent.
    /// `NoContacts` when the set is empty.
    pub fn dispatch<C, S>(
        &self,
        permissions: &C,
        sender: &mut S,
        source: TriggerSource,
        template: &str,
        location: Option<&Location>,
        contacts: &BTreeSet<String>,
    ) -> Result<DispatchReport>
    where
        C: PermissionChecker + ?Sized,
        S: SmsSender + ?Sized,
    {
        if !permissions.is_granted(Permission::SendSms) {
            tracing::warn!(source = source.as_str(), "SMS permission missing, alert not sent");
            return Err(CoreError::PermissionDenied {
                permission: Permission::SendSms,
            });
        }
        if contacts.is_empty() {
            return Err(CoreError::NoContacts);
        }
        if location.is_none() {
            tracing::warn!("no location fix, sending placeholder");
        }

        let message = compose_message(template, location);
        let mut report = DispatchReport {
            source,
            message,
            delivered: Vec::with_capacity(contacts.len()),
            failed: Vec::new(),
        };

        for contact in contacts {
            match sender.send_text(contact, &report.message) {
                Ok(()) => {
                    tracing::info!(contact = %contact, "emergency SMS sent");
                    report.delivered.push(contact.clone());
                }
                Err(reason) => {
                    tracing::warn!(contact = %contact, reason = %reason, "emergency SMS failed");
                    report.failed.push(ContactFailure {
                        contact: contact.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::GrantedPermissions;

    #[derive(Default)]
    struct Outbox {
        sent: Vec<(String, String)>,
        fail_for: Option<String>,
    }

    impl SmsSender for Outbox {
        fn send_text(&mut self, to: &str, body: &str) -> std::result::Result<(), String> {
            if self.fail_for.as_deref() == Some(to) {
                return Err("generic failure".into());
            }
            self.sent.push((to.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn contacts(numbers: &[&str]) -> BTreeSet<String> {
        numbers.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn compose_with_location() {
        let loc = Location::new(37.0, -122.0, 0);
        assert_eq!(
            compose_message("Help", Some(&loc)),
            "Help\nMy Live Location: https://maps.google.com/?q=37.0,-122.0"
        );
    }

    #[test]
    fn compose_without_location() {
        assert_eq!(compose_message("Help", None), "Help\n(Location not available)");
    }

    #[test]
    fn sends_one_message_per_contact() {
        let mut outbox = Outbox::default();
        let report = SmsDispatcher::new()
            .dispatch(
                &GrantedPermissions::all(),
                &mut outbox,
                TriggerSource::Manual,
                "Help",
                None,
                &contacts(&["+1", "+2", "+3"]),
            )
            .unwrap();
        assert_eq!(outbox.sent.len(), 3);
        assert!(report.all_delivered());
        assert!(outbox.sent.iter().all(|(_, body)| body == &report.message));
    }

    #[test]
    fn partial_failure_is_per_contact() {
        let mut outbox = Outbox {
            fail_for: Some("+2".into()),
            ..Default::default()
        };
        let report = SmsDispatcher::new()
            .dispatch(
                &GrantedPermissions::all(),
                &mut outbox,
                TriggerSource::Shake,
                "Help",
                None,
                &contacts(&["+1", "+2", "+3"]),
            )
            .unwrap();
        assert_eq!(report.delivered, vec!["+1".to_string(), "+3".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(
            report.first_error(),
            Some(CoreError::SendFailure { ref contact, .. }) if contact == "+2"
        ));
    }

    #[test]
    fn missing_permission_sends_nothing() {
        let mut outbox = Outbox::default();
        let err = SmsDispatcher::new()
            .dispatch(
                &GrantedPermissions::new(34),
                &mut outbox,
                TriggerSource::Manual,
                "Help",
                None,
                &contacts(&["+1"]),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::PermissionDenied {
                permission: Permission::SendSms
            }
        ));
        assert!(outbox.sent.is_empty());
    }

    #[test]
    fn empty_contacts_rejected() {
        let err = SmsDispatcher::new()
            .dispatch(
                &GrantedPermissions::all(),
                &mut Outbox::default(),
                TriggerSource::Manual,
                "Help",
                None,
                &BTreeSet::new(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::NoContacts));
    }
}
