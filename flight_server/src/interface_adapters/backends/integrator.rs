use crate::domain::systems::integrator::integrate;
use crate::domain::tuning::{Airframe, Envelope};
use crate::domain::{
    AircraftState, BackendError, ControlInputs, EngineTag, InitialConditions, PhysicsBackend,
    Telemetry,
};
use crate::interface_adapters::backends::SETTLE_STEPS;
use std::time::Duration;
use tracing::debug;

/// Backend built on the in-crate semi-implicit Euler integrator.
#[derive(Debug, Clone)]
pub struct IntegratorBackend {
    state: AircraftState,
    controls: ControlInputs,
    dt: f64,
    airframe: Airframe,
    envelope: Envelope,
    initialized: bool,
}

impl IntegratorBackend {
    pub fn new(tick_interval: Duration, airframe: Airframe, envelope: Envelope) -> Self {
        Self {
            state: AircraftState::initial(),
            controls: ControlInputs::neutral(),
            dt: tick_interval.as_secs_f64(),
            airframe,
            envelope,
            initialized: false,
        }
    }

    pub fn with_defaults(tick_interval: Duration) -> Self {
        Self::new(tick_interval, Airframe::default(), Envelope::default())
    }

    pub fn state(&self) -> &AircraftState {
        &self.state
    }
}

impl PhysicsBackend for IntegratorBackend {
    fn initialize(&mut self, initial: InitialConditions) -> Result<(), BackendError> {
        self.state = AircraftState::from_initial_conditions(initial).clamped(&self.envelope);
        self.controls = ControlInputs::neutral();

        for _ in 0..SETTLE_STEPS {
            self.state = integrate(
                &self.state,
                self.controls,
                self.dt,
                &self.airframe,
                &self.envelope,
            );
        }

        self.initialized = true;
        debug!(
            altitude = -self.state.z,
            airspeed = self.state.airspeed(),
            "integrator backend settled"
        );
        Ok(())
    }

    fn set_controls(&mut self, controls: ControlInputs) {
        self.controls = controls.clamped();
    }

    fn step(&mut self) -> Result<(), BackendError> {
        if !self.initialized {
            return Err(BackendError::NotInitialized);
        }

        // `integrate` already falls back to the canonical state on non-finite output.
        self.state = integrate(
            &self.state,
            self.controls,
            self.dt,
            &self.airframe,
            &self.envelope,
        );
        Ok(())
    }

    fn get_state(&mut self) -> Telemetry {
        Telemetry::from_state(&self.state, EngineTag::Internal, &self.envelope)
    }

    fn reset(&mut self) -> Result<(), BackendError> {
        // Full reconstruction so no integrator state survives the reset.
        *self = Self {
            state: AircraftState::initial(),
            controls: ControlInputs::neutral(),
            initialized: false,
            ..self.clone()
        };
        self.initialize(InitialConditions::default())
    }

    fn engine(&self) -> EngineTag {
        EngineTag::Internal
    }
}
