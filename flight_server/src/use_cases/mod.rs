// Use cases layer: application workflows for the flight server.

pub mod broadcast;
pub mod failover;
pub mod flight;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use broadcast::{SubscriberSet, TelemetrySink};
pub use failover::{BackendFactory, FailoverSupervisor, HealthVerdict, SupervisorState};
pub use flight::{FlightLoop, TelemetryEncoder, flight_task};
pub use types::SimEvent;
