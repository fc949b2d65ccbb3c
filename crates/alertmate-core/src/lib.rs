//! # AlertMate Core Library
//!
//! Core logic for AlertMate, a personal-safety alerting tool. A trigger
//! (phone shake, long volume-down press, expired safety timer or a manual
//! request) becomes an SMS with the user's last known location, sent to a
//! small list of emergency contacts.
//!
//! ## Architecture
//!
//! - **Detection**: pure state machines fed with sensor samples and key
//!   events, producing [`TriggerEvent`]s
//! - **Arming**: a wall-clock state machine holding a cancellable alert for
//!   a fixed delay; the caller drives it with `tick(now_ms)`
//! - **Dispatch**: composes the message and fans it out to every contact,
//!   reporting per-contact failures
//! - **Hosts**: [`ForegroundHost`] and [`BackgroundService`] share one
//!   [`AlertHost`] pipeline and differ only in how they present the
//!   cancel option
//! - **Storage**: SQLite key-value records for contacts and dispatch
//!   history, TOML configuration
//!
//! Platform services (permissions, location, SMS, notifications, wake
//! locks, vibration) sit behind traits so the whole pipeline runs and is
//! tested without a device.

pub mod alert;
pub mod detection;
pub mod error;
pub mod events;
pub mod host;
pub mod location;
pub mod notification;
pub mod permissions;
pub mod power;
pub mod sms;
pub mod storage;
pub mod timer;
pub mod trigger;

pub use alert::{AlertArmer, AlertSession, ArmOutcome, ArmerState};
pub use detection::{
    KeyAction, KeyCode, KeyEvent, SensorKind, SensorSample, ShakeConfig, ShakeDetector,
    VolumeHoldDetector,
};
pub use error::{ConfigError, ContactError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use host::{
    AlertHost, AlertPresenter, BackgroundService, ForegroundHost, HostKind, Notice,
    ServiceCommand, ServiceParts,
};
pub use location::{Location, LocationProvider, LocationRequest, LocationTracker};
pub use notification::{Notification, NotificationPresenter, Notifier};
pub use permissions::{GrantedPermissions, Permission, PermissionChecker};
pub use power::{Haptics, WakeLock, WakeLockGuard};
pub use sms::{compose_message, DispatchReport, SmsDispatcher, SmsSender};
pub use storage::{Config, ContactStore, Database, DispatchRecord};
pub use timer::{SafetyTimer, SafetyTimerState};
pub use trigger::{TriggerEvent, TriggerPolicy, TriggerSource};
