mod config;
mod contacts;
pub mod database;
pub mod migrations;

pub use config::{
    ArmingConfig, Config, ContactsConfig, LocationConfig, MessagesConfig, PolicyConfig,
    VolumeConfig,
};
pub use contacts::{ContactStore, CONTACTS_KEY, CONTACTS_NAMESPACE, DEFAULT_MAX_CONTACTS};
pub use database::{Database, DispatchRecord};

use std::path::PathBuf;

/// Returns the data directory.
///
/// `ALERTMATE_DATA_DIR` wins when set. Otherwise `~/.config/alertmate[-dev]/`,
/// with the `-dev` suffix when `ALERTMATE_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("ALERTMATE_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("ALERTMATE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("alertmate-dev")
            } else {
                base_dir.join("alertmate")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
