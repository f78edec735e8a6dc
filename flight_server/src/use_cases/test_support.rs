use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::tuning::Envelope;
use crate::domain::{
    AircraftState, BackendError, ControlInputs, EngineTag, InitialConditions, PhysicsBackend,
    Telemetry,
};

// Shared counters so tests can observe a backend after it moved into the supervisor.
#[derive(Default)]
pub(crate) struct CallLog {
    pub steps: AtomicUsize,
    pub resets: AtomicUsize,
    pub initializes: AtomicUsize,
}

// Backend with canned behaviour for supervisor and tick-loop tests.
#[derive(Clone)]
pub(crate) struct ScriptedBackend {
    engine: EngineTag,
    fail_steps: bool,
    telemetry: Telemetry,
    telemetry_after_reset: Telemetry,
    controls: ControlInputs,
    calls: Arc<CallLog>,
}

impl ScriptedBackend {
    pub(crate) fn new(engine: EngineTag, calls: Arc<CallLog>) -> Self {
        let resting = Telemetry::from_state(&AircraftState::initial(), engine, &Envelope::default());
        Self {
            engine,
            fail_steps: false,
            telemetry: resting,
            telemetry_after_reset: resting,
            controls: ControlInputs::neutral(),
            calls,
        }
    }

    pub(crate) fn native(calls: Arc<CallLog>) -> Self {
        Self::new(EngineTag::Native, calls)
    }

    pub(crate) fn internal(calls: Arc<CallLog>) -> Self {
        Self::new(EngineTag::Internal, calls)
    }

    pub(crate) fn failing_steps(mut self) -> Self {
        self.fail_steps = true;
        self
    }

    pub(crate) fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub(crate) fn with_telemetry_after_reset(mut self, telemetry: Telemetry) -> Self {
        self.telemetry_after_reset = telemetry;
        self
    }
}

impl PhysicsBackend for ScriptedBackend {
    fn initialize(&mut self, _initial: InitialConditions) -> Result<(), BackendError> {
        self.calls.initializes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_controls(&mut self, controls: ControlInputs) {
        self.controls = controls.clamped();
    }

    fn step(&mut self) -> Result<(), BackendError> {
        self.calls.steps.fetch_add(1, Ordering::SeqCst);
        if self.fail_steps {
            return Err(BackendError::StepRejected);
        }
        Ok(())
    }

    fn get_state(&mut self) -> Telemetry {
        Telemetry {
            throttle: self.controls.throttle,
            ..self.telemetry
        }
    }

    fn reset(&mut self) -> Result<(), BackendError> {
        self.calls.resets.fetch_add(1, Ordering::SeqCst);
        self.telemetry = self.telemetry_after_reset;
        self.controls = ControlInputs::neutral();
        Ok(())
    }

    fn engine(&self) -> EngineTag {
        self.engine
    }
}
