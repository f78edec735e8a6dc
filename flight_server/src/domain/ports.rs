use crate::domain::state::{ControlInputs, EngineTag, InitialConditions, Telemetry};
use std::fmt;

// Port for an interchangeable flight-dynamics engine driven by the tick loop.
pub trait PhysicsBackend: Send {
    /// Establishes a ground-ready state and settles it for a fixed window.
    fn initialize(&mut self, initial: InitialConditions) -> Result<(), BackendError>;

    /// Clamps and stores the controls for the next step.
    fn set_controls(&mut self, controls: ControlInputs);

    /// Advances exactly one tick.
    fn step(&mut self) -> Result<(), BackendError>;

    /// Current telemetry; degraded frames instead of errors.
    fn get_state(&mut self) -> Telemetry;

    /// Back to the canonical initial condition.
    fn reset(&mut self) -> Result<(), BackendError>;

    fn engine(&self) -> EngineTag;
}

// Errors a backend reports instead of panicking.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    NotInitialized,
    StepRejected,
    Engine(String),
    Construction(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::NotInitialized => write!(f, "backend not initialized"),
            BackendError::StepRejected => write!(f, "engine refused to advance"),
            BackendError::Engine(msg) => write!(f, "engine error: {}", msg),
            BackendError::Construction(msg) => write!(f, "failed to build backend: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}
