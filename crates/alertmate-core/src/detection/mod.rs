mod shake;
mod volume;

pub use shake::{SensorKind, SensorSample, ShakeConfig, ShakeDetector, ShakeState};
pub use volume::{KeyAction, KeyCode, KeyEvent, VolumeHoldDetector};
