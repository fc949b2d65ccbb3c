//! Alert arming state machine.
//!
//! ```text
//! Idle ──trigger──► Armed ──delay elapses──► Fired ──► Idle
//!                     │
//!                     └──cancel──► Cancelled ──► Idle
//! ```
//!
//! Like the safety timer, the armer has no thread of its own: the host calls
//! [`AlertArmer::tick`] from its event loop and the session fires on the first
//! tick at or after its deadline. At most one session exists at a time.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::location::Location;
use crate::trigger::{TriggerEvent, TriggerSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmerState {
    Idle,
    Armed,
}

/// One armed-but-not-yet-fired alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSession {
    pub id: Uuid,
    pub source: TriggerSource,
    pub armed_at_ms: u64,
    pub fire_at_ms: u64,
    pub message_template: String,
    pub contacts_snapshot: BTreeSet<String>,
    pub location_snapshot: Option<Location>,
    /// Only ever true on the session handed back by `cancel`.
    pub cancelled: bool,
}

impl AlertSession {
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.fire_at_ms.saturating_sub(now_ms)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArmOutcome {
    Armed(AlertSession),
    /// A session is already pending; the trigger was dropped.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct AlertArmer {
    delay_ms: u64,
    session: Option<AlertSession>,
}

impl AlertArmer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            session: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> ArmerState {
        if self.session.is_some() {
            ArmerState::Armed
        } else {
            ArmerState::Idle
        }
    }

    pub fn pending(&self) -> Option<&AlertSession> {
        self.session.as_ref()
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Arm a delayed alert with snapshots of the contacts and location.
    ///
    /// # Errors
    /// `NoContacts` when `contacts` is empty; the armer stays idle.
    pub fn arm(
        &mut self,
        trigger: TriggerEvent,
        message_template: &str,
        contacts: BTreeSet<String>,
        location: Option<Location>,
    ) -> Result<ArmOutcome> {
        if self.session.is_some() {
            tracing::info!(source = trigger.source.as_str(), "alert already armed, trigger ignored");
            return Ok(ArmOutcome::Ignored);
        }
        if contacts.is_empty() {
            return Err(CoreError::NoContacts);
        }

        let session = AlertSession {
            id: Uuid::new_v4(),
            source: trigger.source,
            armed_at_ms: trigger.at_ms,
            fire_at_ms: trigger.at_ms.saturating_add(self.delay_ms),
            message_template: message_template.to_string(),
            contacts_snapshot: contacts,
            location_snapshot: location,
            cancelled: false,
        };
        tracing::info!(
            session = %session.id,
            fire_at_ms = session.fire_at_ms,
            contacts = session.contacts_snapshot.len(),
            "alert armed"
        );
        self.session = Some(session.clone());
        Ok(ArmOutcome::Armed(session))
    }

    /// Cancel the pending session. Returns it (marked cancelled), or `None`
    /// when nothing was armed.
    pub fn cancel(&mut self) -> Option<AlertSession> {
        let mut session = self.session.take()?;
        session.cancelled = true;
        tracing::info!(session = %session.id, "alert cancelled");
        Some(session)
    }

    /// Returns the session to send once its delay has elapsed.
    pub fn tick(&mut self, now_ms: u64) -> Option<AlertSession> {
        let due = self
            .session
            .as_ref()
            .is_some_and(|s| now_ms >= s.fire_at_ms);
        if !due {
            return None;
        }
        let session = self.session.take()?;
        tracing::info!(session = %session.id, "alert delay elapsed, firing");
        Some(session)
    }
}
