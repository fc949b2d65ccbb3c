//! TOML-based application configuration.
//!
//! Stores:
//! - Shake gesture tunables and cooldown
//! - Arming delay and volume hold duration
//! - Location request cadence
//! - Contact capacity
//! - Alert message templates and per-trigger routing policy
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::contacts::DEFAULT_MAX_CONTACTS;
use super::data_dir;
use crate::detection::ShakeConfig;
use crate::error::{ConfigError, Result, ValidationError};
use crate::host::HostKind;
use crate::location::{LocationPriority, LocationRequest};
use crate::trigger::{TriggerPolicy, TriggerSource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmingConfig {
    /// Cancellable window between arming and sending.
    #[serde(default = "default_arm_delay_ms")]
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeConfig {
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_fastest_interval_ms")]
    pub fastest_interval_ms: u64,
    #[serde(default = "default_priority")]
    pub priority: LocationPriority,
    /// A fix older than this is logged as stale. It is still sent.
    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactsConfig {
    #[serde(default = "default_max_contacts")]
    pub max: usize,
}

/// Message templates. The location line is appended at send time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_shake_foreground")]
    pub shake_foreground: String,
    #[serde(default = "default_shake_background")]
    pub shake_background: String,
    #[serde(default = "default_volume_hold")]
    pub volume_hold: String,
    #[serde(default = "default_timer_expired")]
    pub timer_expired: String,
    #[serde(default = "default_manual")]
    pub manual: String,
}

/// Whether each trigger source goes through the cancellable arming window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_confirm")]
    pub shake: TriggerPolicy,
    #[serde(default = "default_immediate")]
    pub volume_hold: TriggerPolicy,
    #[serde(default = "default_immediate")]
    pub timer_expiry: TriggerPolicy,
    #[serde(default = "default_immediate")]
    pub manual: TriggerPolicy,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub shake: ShakeConfig,
    #[serde(default)]
    pub arming: ArmingConfig,
    #[serde(default)]
    pub volume: VolumeConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub contacts: ContactsConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

// Default functions
fn default_arm_delay_ms() -> u64 {
    5_000
}
fn default_hold_ms() -> u64 {
    4_000
}
fn default_interval_ms() -> u64 {
    10_000
}
fn default_fastest_interval_ms() -> u64 {
    5_000
}
fn default_priority() -> LocationPriority {
    LocationPriority::HighAccuracy
}
fn default_stale_after_ms() -> u64 {
    120_000
}
fn default_max_contacts() -> usize {
    DEFAULT_MAX_CONTACTS
}
fn default_shake_foreground() -> String {
    "Emergency! I triggered the alert by shaking my phone.".into()
}
fn default_shake_background() -> String {
    "Emergency Alert from background!".into()
}
fn default_volume_hold() -> String {
    "Emergency! I triggered the alert by holding the volume button.".into()
}
fn default_timer_expired() -> String {
    "Timer expired! I may need help.".into()
}
fn default_manual() -> String {
    "Emergency Alert! I may need help.".into()
}
fn default_confirm() -> TriggerPolicy {
    TriggerPolicy::CONFIRM
}
fn default_immediate() -> TriggerPolicy {
    TriggerPolicy::IMMEDIATE
}

impl Default for ArmingConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_arm_delay_ms(),
        }
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            hold_ms: default_hold_ms(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            fastest_interval_ms: default_fastest_interval_ms(),
            priority: default_priority(),
            stale_after_ms: default_stale_after_ms(),
        }
    }
}

impl Default for ContactsConfig {
    fn default() -> Self {
        Self {
            max: default_max_contacts(),
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            shake_foreground: default_shake_foreground(),
            shake_background: default_shake_background(),
            volume_hold: default_volume_hold(),
            timer_expired: default_timer_expired(),
            manual: default_manual(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            shake: TriggerPolicy::CONFIRM,
            volume_hold: TriggerPolicy::IMMEDIATE,
            timer_expiry: TriggerPolicy::IMMEDIATE,
            manual: TriggerPolicy::IMMEDIATE,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> std::result::Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing the default file if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed, or if the default config cannot be written to disk. An
    /// existing file is never overwritten here.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update one value in memory. The result must still validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or fails validation. `self` is unchanged on error.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Update one value and persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value)?;
        self.save()
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if !(self.shake.threshold > 0.0) {
            return Err(ValidationError::invalid("shake.threshold", "must be > 0"));
        }
        if self.shake.required_count == 0 {
            return Err(ValidationError::invalid("shake.required_count", "must be >= 1"));
        }
        if self.shake.chain_gap_ms == 0 {
            return Err(ValidationError::invalid("shake.chain_gap_ms", "must be > 0"));
        }
        if self.shake.cooldown_ms == 0 {
            return Err(ValidationError::invalid("shake.cooldown_ms", "must be > 0"));
        }
        if self.arming.delay_ms == 0 {
            return Err(ValidationError::invalid("arming.delay_ms", "must be > 0"));
        }
        if self.volume.hold_ms == 0 {
            return Err(ValidationError::invalid("volume.hold_ms", "must be > 0"));
        }
        if self.contacts.max == 0 {
            return Err(ValidationError::invalid("contacts.max", "must be >= 1"));
        }
        if self.location.fastest_interval_ms > self.location.interval_ms {
            return Err(ValidationError::invalid(
                "location.fastest_interval_ms",
                "must not exceed location.interval_ms",
            ));
        }
        Ok(())
    }

    pub fn location_request(&self) -> LocationRequest {
        LocationRequest {
            interval_ms: self.location.interval_ms,
            fastest_interval_ms: self.location.fastest_interval_ms,
            priority: self.location.priority,
        }
    }

    pub fn policy_for(&self, source: TriggerSource) -> TriggerPolicy {
        match source {
            TriggerSource::Shake => self.policy.shake,
            TriggerSource::VolumeHold => self.policy.volume_hold,
            TriggerSource::TimerExpiry => self.policy.timer_expiry,
            TriggerSource::Manual => self.policy.manual,
        }
    }

    pub fn message_for(&self, source: TriggerSource, host: HostKind) -> &str {
        match (source, host) {
            (TriggerSource::Shake, HostKind::Foreground) => &self.messages.shake_foreground,
            (TriggerSource::Shake, HostKind::Background) => &self.messages.shake_background,
            (TriggerSource::VolumeHold, _) => &self.messages.volume_hold,
            (TriggerSource::TimerExpiry, _) => &self.messages.timer_expired,
            (TriggerSource::Manual, _) => &self.messages.manual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.shake.required_count, 6);
        assert_eq!(parsed.arming.delay_ms, 5_000);
        assert!(parsed.policy.shake.confirm);
        assert!(!parsed.policy.volume_hold.confirm);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[shake]\nthreshold = 25.5\n").unwrap();
        assert_eq!(parsed.shake.threshold, 25.5);
        assert_eq!(parsed.shake.cooldown_ms, 10_000);
        assert_eq!(parsed.contacts.max, 5);
        assert_eq!(parsed.messages.timer_expired, "Timer expired! I may need help.");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("shake.required_count").as_deref(), Some("6"));
        assert_eq!(cfg.get("policy.shake.confirm").as_deref(), Some("true"));
        assert_eq!(cfg.get("location.priority").as_deref(), Some("high_accuracy"));
        assert!(cfg.get("shake.missing_key").is_none());
    }

    #[test]
    fn set_value_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.set_value("arming.delay_ms", "3000").unwrap();
        assert_eq!(cfg.arming.delay_ms, 3_000);
        cfg.set_value("shake.threshold", "35.5").unwrap();
        assert_eq!(cfg.shake.threshold, 35.5);
    }

    #[test]
    fn set_value_updates_nested_bool_and_string() {
        let mut cfg = Config::default();
        cfg.set_value("policy.volume_hold.confirm", "true").unwrap();
        assert!(cfg.policy.volume_hold.confirm);
        cfg.set_value("messages.manual", "Help me").unwrap();
        assert_eq!(cfg.messages.manual, "Help me");
    }

    #[test]
    fn set_value_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set_value("shake.nonexistent", "1").unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Config(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn set_value_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set_value("policy.shake.confirm", "maybe").is_err());
        assert!(cfg.set_value("arming.delay_ms", "soon").is_err());
        assert!(cfg.policy.shake.confirm);
    }

    #[test]
    fn set_value_rejects_invalid_config() {
        let mut cfg = Config::default();
        assert!(cfg.set_value("contacts.max", "0").is_err());
        assert_eq!(cfg.contacts.max, 5);

        for key in ["volume.hold_ms", "arming.delay_ms", "shake.cooldown_ms"] {
            let err = cfg.set_value(key, "0").unwrap_err();
            assert!(
                matches!(&err, crate::error::CoreError::Validation(v) if v.to_string().contains(key)),
                "{key}: {err}"
            );
        }
        assert_eq!(cfg.volume.hold_ms, 4_000);
        assert_eq!(cfg.arming.delay_ms, 5_000);
        assert_eq!(cfg.shake.cooldown_ms, 10_000);
    }

    #[test]
    fn load_from_rejects_zero_durations_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[volume]\nhold_ms = 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn load_from_writes_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.volume.hold_ms, 4_000);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[shake\nthreshold = ").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn load_from_keeps_unreadable_file_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut bytes = b"[volume]\nhold_ms = 6000\n# ".to_vec();
        bytes.push(0xff);
        std::fs::write(&path, &bytes).unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Config(ConfigError::LoadFailed { .. })
        ));
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn message_depends_on_host_for_shake_only() {
        let cfg = Config::default();
        assert_ne!(
            cfg.message_for(TriggerSource::Shake, HostKind::Foreground),
            cfg.message_for(TriggerSource::Shake, HostKind::Background)
        );
        assert_eq!(
            cfg.message_for(TriggerSource::VolumeHold, HostKind::Foreground),
            cfg.message_for(TriggerSource::VolumeHold, HostKind::Background)
        );
    }
}
