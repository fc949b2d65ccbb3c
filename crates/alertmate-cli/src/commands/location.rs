use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::{Deserialize, Serialize};

use alertmate_core::error::{Result, ValidationError};
use alertmate_core::{Database, Location};

use super::CliResult;

const LOCATION_NAMESPACE: &str = "location";
const LOCATION_KEY: &str = "last";

#[derive(Subcommand)]
pub enum LocationAction {
    /// Record the current position
    Set {
        /// Latitude in degrees
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        /// Longitude in degrees
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },
    /// Forget the saved position
    Clear,
    /// Print the saved position as JSON
    Show,
}

/// A fix saved between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedFix {
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
}

impl SavedFix {
    pub fn to_location(&self, at_ms: u64) -> Location {
        Location::new(self.latitude, self.longitude, at_ms)
    }
}

pub fn load(db: &Database) -> Result<Option<SavedFix>> {
    match db.kv_get(LOCATION_NAMESPACE, LOCATION_KEY)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

fn validate(latitude: f64, longitude: f64) -> std::result::Result<(), ValidationError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ValidationError::invalid("latitude", "must be within -90..=90"));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ValidationError::invalid("longitude", "must be within -180..=180"));
    }
    Ok(())
}

pub fn run(action: LocationAction) -> CliResult {
    let db = Database::open()?;

    match action {
        LocationAction::Set {
            latitude,
            longitude,
        } => {
            validate(latitude, longitude)?;
            let fix = SavedFix {
                latitude,
                longitude,
                recorded_at: Utc::now(),
            };
            db.kv_set(LOCATION_NAMESPACE, LOCATION_KEY, &serde_json::to_string(&fix)?)?;
            println!("{}", fix.to_location(0).map_url());
        }
        LocationAction::Clear => {
            db.kv_remove(LOCATION_NAMESPACE, LOCATION_KEY)?;
            println!("location cleared");
        }
        LocationAction::Show => match load(&db)? {
            Some(fix) => println!("{}", serde_json::to_string_pretty(&fix)?),
            None => println!("null"),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(validate(37.0, -122.0).is_ok());
        assert!(validate(90.5, 0.0).is_err());
        assert!(validate(0.0, -180.5).is_err());
    }

    #[test]
    fn saved_fix_round_trips_through_kv() {
        let db = Database::open_memory().unwrap();
        assert!(load(&db).unwrap().is_none());

        let fix = SavedFix {
            latitude: 37.0,
            longitude: -122.0,
            recorded_at: Utc::now(),
        };
        db.kv_set(LOCATION_NAMESPACE, LOCATION_KEY, &serde_json::to_string(&fix).unwrap())
            .unwrap();
        let loaded = load(&db).unwrap().unwrap();
        assert_eq!(loaded.to_location(0).latitude, 37.0);
    }
}
