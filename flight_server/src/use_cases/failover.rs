// Backend failover: health checks after every step, one-way switch to the fallback.

use crate::domain::tuning::HealthThresholds;
use crate::domain::{
    BackendError, ControlInputs, EngineTag, InitialConditions, PhysicsBackend, Telemetry,
};
use std::time::Instant;
use tracing::{error, info, warn};

/// Builds a fresh, uninitialized backend.
pub type BackendFactory = Box<dyn Fn() -> Result<Box<dyn PhysicsBackend>, BackendError> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Primary,
    /// Transient while the fallback is being built.
    Switching,
    Fallback,
}

/// What the supervisor did about the active backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthVerdict {
    Healthy,
    /// The active backend was reset in place.
    Reset,
    /// The active backend was replaced by a freshly built fallback.
    FailedOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Advanced,
    Failed(HealthVerdict),
}

/// Owns the active backend and decides when to reset or abandon it.
///
/// There is no way back from `Fallback` to `Primary`; once downgraded the process stays on
/// the fallback until restart.
pub struct FailoverSupervisor {
    active: Box<dyn PhysicsBackend>,
    state: SupervisorState,
    fallback: Option<BackendFactory>,
    thresholds: HealthThresholds,
    initial: InitialConditions,
    consecutive_failures: u32,
    uninitialized_since: Option<Instant>,
    stalled_since: Option<Instant>,
    failovers: u32,
}

impl FailoverSupervisor {
    /// Wraps an already initialized primary backend.
    pub fn new(
        primary: Box<dyn PhysicsBackend>,
        fallback: Option<BackendFactory>,
        thresholds: HealthThresholds,
        initial: InitialConditions,
    ) -> Self {
        Self {
            active: primary,
            state: SupervisorState::Primary,
            fallback,
            thresholds,
            initial,
            consecutive_failures: 0,
            uninitialized_since: None,
            stalled_since: None,
            failovers: 0,
        }
    }

    /// Builds and initializes the primary, starting directly on the fallback when the
    /// primary cannot be brought up. Fails only when neither backend can be started.
    pub fn start(
        primary: &BackendFactory,
        fallback: BackendFactory,
        thresholds: HealthThresholds,
        initial: InitialConditions,
    ) -> Result<Self, BackendError> {
        match build_backend(primary, initial) {
            Ok(backend) => {
                info!(engine = backend.engine().as_str(), "primary backend ready");
                Ok(Self::new(backend, Some(fallback), thresholds, initial))
            }
            Err(e) => {
                warn!(error = %e, "primary backend unavailable; starting on fallback");
                let backend = build_backend(&fallback, initial)?;
                let mut supervisor = Self::new(backend, None, thresholds, initial);
                supervisor.state = SupervisorState::Fallback;
                Ok(supervisor)
            }
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn engine(&self) -> EngineTag {
        self.active.engine()
    }

    pub fn failovers(&self) -> u32 {
        self.failovers
    }

    /// Hands the controls to the active backend and advances it one tick.
    pub fn step(&mut self, controls: ControlInputs) -> StepOutcome {
        self.active.set_controls(controls);
        match self.active.step() {
            Ok(()) => {
                self.consecutive_failures = 0;
                StepOutcome::Advanced
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                warn!(
                    error = %e,
                    engine = self.active.engine().as_str(),
                    consecutive_failures = self.consecutive_failures,
                    "backend step failed"
                );
                if self.consecutive_failures >= self.thresholds.max_consecutive_step_failures {
                    StepOutcome::Failed(self.fail_over("repeated step failures"))
                } else {
                    StepOutcome::Failed(self.reset())
                }
            }
        }
    }

    pub fn get_state(&mut self) -> Telemetry {
        self.active.get_state()
    }

    /// Runs the telemetry watchdogs against the frame the active backend just produced.
    pub fn check(
        &mut self,
        telemetry: &Telemetry,
        controls: &ControlInputs,
        now: Instant,
    ) -> HealthVerdict {
        if telemetry.looks_uninitialized() {
            let since = *self.uninitialized_since.get_or_insert(now);
            if now.duration_since(since) > self.thresholds.uninitialized_grace {
                return self.fail_over("telemetry looks uninitialized");
            }
        } else {
            self.uninitialized_since = None;
        }

        let stalled = controls.throttle > self.thresholds.stall_throttle
            && telemetry.airspeed < self.thresholds.stall_airspeed;
        if stalled {
            let since = *self.stalled_since.get_or_insert(now);
            if now.duration_since(since) > self.thresholds.stall_window {
                return self.fail_over("throttle applied without airspeed");
            }
        } else {
            self.stalled_since = None;
        }

        HealthVerdict::Healthy
    }

    /// Forced reset of the active backend. A backend that cannot even reset is abandoned.
    pub fn reset(&mut self) -> HealthVerdict {
        if self.reset_active() {
            HealthVerdict::Reset
        } else {
            self.fail_over("reset failed")
        }
    }

    fn reset_active(&mut self) -> bool {
        self.uninitialized_since = None;
        self.stalled_since = None;
        match self.active.reset() {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, engine = self.active.engine().as_str(), "backend reset failed");
                false
            }
        }
    }

    fn fail_over(&mut self, reason: &'static str) -> HealthVerdict {
        let Some(factory) = self.fallback.take() else {
            // Nothing left to switch to: keep ticking on what we have.
            error!(
                reason,
                engine = self.active.engine().as_str(),
                "no fallback backend left; resetting active backend"
            );
            self.consecutive_failures = 0;
            self.reset_active();
            return HealthVerdict::Reset;
        };

        let previous = self.state;
        self.state = SupervisorState::Switching;
        warn!(
            reason,
            from = self.active.engine().as_str(),
            "failing over to fallback backend"
        );

        match build_backend(&factory, self.initial) {
            Ok(backend) => {
                // The failed backend is dropped here and never consulted again.
                self.active = backend;
                self.state = SupervisorState::Fallback;
                self.failovers += 1;
                self.consecutive_failures = 0;
                self.uninitialized_since = None;
                self.stalled_since = None;
                info!(to = self.active.engine().as_str(), "fallback backend active");
                HealthVerdict::FailedOver
            }
            Err(e) => {
                error!(error = %e, "fallback backend could not be built");
                self.state = previous;
                self.reset_active();
                HealthVerdict::Reset
            }
        }
    }
}

fn build_backend(
    factory: &BackendFactory,
    initial: InitialConditions,
) -> Result<Box<dyn PhysicsBackend>, BackendError> {
    let mut backend = factory()?;
    backend.initialize(initial)?;
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{CallLog, ScriptedBackend};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn scripted_factory(backend: ScriptedBackend) -> BackendFactory {
        Box::new(move || Ok(Box::new(backend.clone()) as Box<dyn PhysicsBackend>))
    }

    fn supervisor_with(primary: ScriptedBackend, fallback: ScriptedBackend) -> FailoverSupervisor {
        FailoverSupervisor::new(
            Box::new(primary),
            Some(scripted_factory(fallback)),
            HealthThresholds::default(),
            InitialConditions::default(),
        )
    }

    #[test]
    fn when_step_fails_n_times_then_switches_exactly_once_and_never_retries_primary() {
        let primary_calls = Arc::new(CallLog::default());
        let fallback_calls = Arc::new(CallLog::default());
        let primary = ScriptedBackend::native(primary_calls.clone()).failing_steps();
        let fallback = ScriptedBackend::internal(fallback_calls.clone());
        let mut supervisor = supervisor_with(primary, fallback);
        let threshold = HealthThresholds::default().max_consecutive_step_failures;

        let mut outcomes = Vec::new();
        for _ in 0..threshold {
            outcomes.push(supervisor.step(ControlInputs::neutral()));
        }
        for _ in 0..50 {
            assert_eq!(
                supervisor.step(ControlInputs::neutral()),
                StepOutcome::Advanced
            );
        }

        let failovers = outcomes
            .iter()
            .filter(|o| **o == StepOutcome::Failed(HealthVerdict::FailedOver))
            .count();
        assert_eq!(failovers, 1);
        assert_eq!(
            outcomes.last(),
            Some(&StepOutcome::Failed(HealthVerdict::FailedOver))
        );
        assert_eq!(supervisor.failovers(), 1);
        assert_eq!(supervisor.state(), SupervisorState::Fallback);
        assert_eq!(supervisor.engine(), EngineTag::Internal);
        assert_eq!(
            primary_calls.steps.load(Ordering::SeqCst),
            threshold as usize
        );
        assert_eq!(fallback_calls.steps.load(Ordering::SeqCst), 50);
        assert_eq!(fallback_calls.initializes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn when_step_fails_below_threshold_then_backend_is_reset() {
        let calls = Arc::new(CallLog::default());
        let primary = ScriptedBackend::native(calls.clone()).failing_steps();
        let mut supervisor = supervisor_with(primary, ScriptedBackend::internal(Arc::default()));

        let outcome = supervisor.step(ControlInputs::neutral());

        assert_eq!(outcome, StepOutcome::Failed(HealthVerdict::Reset));
        assert_eq!(calls.resets.load(Ordering::SeqCst), 1);
        assert_eq!(supervisor.state(), SupervisorState::Primary);
    }

    #[test]
    fn when_telemetry_looks_uninitialized_past_grace_then_fails_over() {
        let primary = ScriptedBackend::native(Arc::default()).with_telemetry(Telemetry::degraded());
        let mut supervisor = supervisor_with(primary, ScriptedBackend::internal(Arc::default()));
        let grace = HealthThresholds::default().uninitialized_grace;
        let start = Instant::now();
        let frame = supervisor.get_state();

        let controls = ControlInputs::neutral();
        assert_eq!(
            supervisor.check(&frame, &controls, start),
            HealthVerdict::Healthy
        );
        assert_eq!(
            supervisor.check(&frame, &controls, start + grace),
            HealthVerdict::Healthy
        );
        assert_eq!(
            supervisor.check(&frame, &controls, start + grace + Duration::from_millis(20)),
            HealthVerdict::FailedOver
        );
        assert_eq!(supervisor.engine(), EngineTag::Internal);
    }

    #[test]
    fn when_uninitialized_frames_are_interrupted_then_grace_restarts() {
        let mut supervisor = supervisor_with(
            ScriptedBackend::native(Arc::default()),
            ScriptedBackend::internal(Arc::default()),
        );
        let grace = HealthThresholds::default().uninitialized_grace;
        let healthy = supervisor.get_state();
        let degraded = Telemetry::degraded();
        let controls = ControlInputs::neutral();
        let start = Instant::now();

        supervisor.check(&degraded, &controls, start);
        supervisor.check(&healthy, &controls, start + grace);
        let verdict = supervisor.check(&degraded, &controls, start + grace * 2);

        assert_eq!(verdict, HealthVerdict::Healthy);
        assert_eq!(supervisor.state(), SupervisorState::Primary);
    }

    #[test]
    fn when_throttle_produces_no_airspeed_for_the_window_then_fails_over() {
        let mut supervisor = supervisor_with(
            ScriptedBackend::native(Arc::default()),
            ScriptedBackend::internal(Arc::default()),
        );
        let window = HealthThresholds::default().stall_window;
        let frame = supervisor.get_state();
        let controls = ControlInputs {
            throttle: 1.0,
            ..ControlInputs::neutral()
        };
        let start = Instant::now();

        assert_eq!(
            supervisor.check(&frame, &controls, start),
            HealthVerdict::Healthy
        );
        assert_eq!(
            supervisor.check(&frame, &controls, start + window / 2),
            HealthVerdict::Healthy
        );
        assert_eq!(
            supervisor.check(&frame, &controls, start + window + Duration::from_millis(1)),
            HealthVerdict::FailedOver
        );
    }

    #[test]
    fn when_airspeed_builds_under_throttle_then_stall_watchdog_stays_quiet() {
        let mut supervisor = supervisor_with(
            ScriptedBackend::native(Arc::default()),
            ScriptedBackend::internal(Arc::default()),
        );
        let window = HealthThresholds::default().stall_window;
        let mut frame = supervisor.get_state();
        frame.airspeed = 10.0;
        let controls = ControlInputs {
            throttle: 1.0,
            ..ControlInputs::neutral()
        };
        let start = Instant::now();

        supervisor.check(&frame, &controls, start);
        let verdict = supervisor.check(&frame, &controls, start + window * 3);

        assert_eq!(verdict, HealthVerdict::Healthy);
    }

    #[test]
    fn when_no_fallback_is_configured_then_failure_count_restarts_after_each_reset() {
        let calls = Arc::new(CallLog::default());
        let primary = ScriptedBackend::native(calls.clone()).failing_steps();
        let mut supervisor = FailoverSupervisor::new(
            Box::new(primary),
            None,
            HealthThresholds::default(),
            InitialConditions::default(),
        );
        let threshold = HealthThresholds::default().max_consecutive_step_failures;

        for _ in 0..threshold * 4 {
            assert_eq!(
                supervisor.step(ControlInputs::neutral()),
                StepOutcome::Failed(HealthVerdict::Reset)
            );
            assert!(supervisor.consecutive_failures < threshold);
        }

        assert_eq!(supervisor.failovers(), 0);
        assert_eq!(supervisor.state(), SupervisorState::Primary);
        assert_eq!(
            calls.resets.load(Ordering::SeqCst),
            (threshold * 4) as usize
        );
    }

    #[test]
    fn when_already_on_fallback_then_triggers_reset_instead_of_switching() {
        let fallback_calls = Arc::new(CallLog::default());
        let primary = ScriptedBackend::native(Arc::default()).failing_steps();
        let fallback = ScriptedBackend::internal(fallback_calls.clone()).failing_steps();
        let mut supervisor = supervisor_with(primary, fallback);
        let threshold = HealthThresholds::default().max_consecutive_step_failures;

        for _ in 0..threshold * 3 {
            let _ = supervisor.step(ControlInputs::neutral());
        }

        assert_eq!(supervisor.failovers(), 1);
        assert_eq!(supervisor.state(), SupervisorState::Fallback);
        assert!(fallback_calls.resets.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn when_fallback_cannot_be_built_then_primary_keeps_running() {
        let calls = Arc::new(CallLog::default());
        let primary = ScriptedBackend::native(calls.clone()).failing_steps();
        let mut supervisor = FailoverSupervisor::new(
            Box::new(primary),
            Some(Box::new(|| {
                Err(BackendError::Construction("unavailable".to_string()))
            })),
            HealthThresholds::default(),
            InitialConditions::default(),
        );
        let threshold = HealthThresholds::default().max_consecutive_step_failures;

        for _ in 0..threshold {
            let _ = supervisor.step(ControlInputs::neutral());
        }

        assert_eq!(supervisor.state(), SupervisorState::Primary);
        assert_eq!(supervisor.failovers(), 0);
        assert_eq!(supervisor.engine(), EngineTag::Native);
        assert_eq!(calls.resets.load(Ordering::SeqCst), threshold as usize);
    }

    #[test]
    fn when_primary_cannot_start_then_supervisor_starts_on_fallback() {
        let primary: BackendFactory =
            Box::new(|| Err(BackendError::Construction("no engine".to_string())));
        let fallback = scripted_factory(ScriptedBackend::internal(Arc::default()));

        let supervisor = FailoverSupervisor::start(
            &primary,
            fallback,
            HealthThresholds::default(),
            InitialConditions::default(),
        )
        .expect("fallback starts");

        assert_eq!(supervisor.state(), SupervisorState::Fallback);
        assert_eq!(supervisor.engine(), EngineTag::Internal);
    }

    #[test]
    fn when_no_backend_can_start_then_start_fails() {
        let primary: BackendFactory =
            Box::new(|| Err(BackendError::Construction("no engine".to_string())));
        let fallback: BackendFactory =
            Box::new(|| Err(BackendError::Construction("no integrator".to_string())));

        let result = FailoverSupervisor::start(
            &primary,
            fallback,
            HealthThresholds::default(),
            InitialConditions::default(),
        );

        assert!(result.is_err());
    }
}
