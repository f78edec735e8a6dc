// Domain layer: flight model types and rules.

pub mod ports;
pub mod state;
pub mod systems;
pub mod tuning;

pub use ports::{BackendError, PhysicsBackend};
pub use state::{
    AircraftState, ControlInputs, ControlStaging, ControlUpdate, EngineTag, InitialConditions,
    Telemetry,
};
