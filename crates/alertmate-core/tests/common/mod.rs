//! Shared test doubles for the host-level integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use alertmate_core::alert::AlertSession;
use alertmate_core::location::{LocationProvider, LocationRequest};
use alertmate_core::notification::{Notification, Notifier};
use alertmate_core::power::{Haptics, WakeLock};
use alertmate_core::{AlertPresenter, ContactStore, Database, Notice, SensorSample, SmsSender};

// ============================================================================
// Presenters and transports
// ============================================================================

/// Records everything a host shows to the user.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub pending: Option<AlertSession>,
    pub notices: Vec<Notice>,
    pub cleared: usize,
}

impl AlertPresenter for RecordingPresenter {
    fn show_pending(&mut self, session: &AlertSession) {
        self.pending = Some(session.clone());
    }

    fn clear_pending(&mut self) {
        self.pending = None;
        self.cleared += 1;
    }

    fn notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

/// SMS transport that keeps every message and can be told to fail for
/// specific numbers.
#[derive(Debug, Default)]
pub struct Outbox {
    pub sent: Vec<(String, String)>,
    pub failing: HashSet<String>,
}

impl Outbox {
    pub fn failing_for(numbers: &[&str]) -> Self {
        Self {
            sent: Vec::new(),
            failing: numbers.iter().map(|n| n.to_string()).collect(),
        }
    }
}

impl SmsSender for Outbox {
    fn send_text(&mut self, to: &str, body: &str) -> Result<(), String> {
        if self.failing.contains(to) {
            return Err("generic failure".to_string());
        }
        self.sent.push((to.to_string(), body.to_string()));
        Ok(())
    }
}

/// Keeps the currently visible notifications by id plus a full log.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub active: BTreeMap<u32, Notification>,
    pub posted: Vec<Notification>,
    pub cancelled: Vec<u32>,
}

impl Notifier for RecordingNotifier {
    fn post(&mut self, notification: Notification) {
        self.active.insert(notification.id, notification.clone());
        self.posted.push(notification);
    }

    fn cancel(&mut self, id: u32) {
        self.active.remove(&id);
        self.cancelled.push(id);
    }
}

// ============================================================================
// Power and location
// ============================================================================

/// Wake lock whose state stays observable after the service drops it.
#[derive(Debug, Clone, Default)]
pub struct SharedWakeLock {
    pub held: Rc<Cell<bool>>,
    pub acquisitions: Rc<Cell<u32>>,
    pub releases: Rc<Cell<u32>>,
}

impl WakeLock for SharedWakeLock {
    fn acquire(&mut self) {
        self.held.set(true);
        self.acquisitions.set(self.acquisitions.get() + 1);
    }

    fn release(&mut self) {
        self.held.set(false);
        self.releases.set(self.releases.get() + 1);
    }

    fn is_held(&self) -> bool {
        self.held.get()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingHaptics {
    pub pulses: Rc<RefCell<Vec<u64>>>,
}

impl Haptics for RecordingHaptics {
    fn vibrate(&mut self, duration_ms: u64) {
        self.pulses.borrow_mut().push(duration_ms);
    }
}

#[derive(Debug, Default)]
pub struct RecordingProvider {
    pub requests: Vec<LocationRequest>,
}

impl LocationProvider for RecordingProvider {
    fn request_updates(&mut self, request: &LocationRequest) -> alertmate_core::error::Result<()> {
        self.requests.push(*request);
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub const CONTACT_A: &str = "+15551234567";
pub const CONTACT_B: &str = "+15557654321";

/// In-memory contact store pre-filled with `numbers`.
pub fn contact_store(numbers: &[&str]) -> ContactStore {
    let store = ContactStore::new(Database::open_memory().unwrap(), 5);
    for number in numbers {
        store.save_contact(number).unwrap();
    }
    store
}

/// `count` strong accelerometer samples, `step_ms` apart, starting at `start_ms`.
/// Each sample has magnitude ~42.4, above the default threshold.
pub fn shake_burst(start_ms: u64, count: usize, step_ms: u64) -> Vec<SensorSample> {
    (0..count as u64)
        .map(|i| SensorSample::accelerometer(start_ms + i * step_ms, [30.0, 30.0, 0.0]))
        .collect()
}
