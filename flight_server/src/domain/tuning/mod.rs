// Flight-model tuning, kept separate from runtime/server configuration.

pub mod airframe;
pub mod envelope;
pub mod watchdog;

pub use airframe::Airframe;
pub use envelope::{BoundsLimits, Envelope};
pub use watchdog::HealthThresholds;
