mod safety;

pub use safety::{SafetyTimer, SafetyTimerState};
