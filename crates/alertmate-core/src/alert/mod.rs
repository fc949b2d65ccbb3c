mod armer;

pub use armer::{AlertArmer, AlertSession, ArmOutcome, ArmerState};
