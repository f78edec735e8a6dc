// Adapter for an external flight-dynamics engine driven through a property tree.

use crate::domain::tuning::Envelope;
use crate::domain::{
    BackendError, ControlInputs, EngineTag, InitialConditions, PhysicsBackend, Telemetry,
};
use crate::interface_adapters::backends::SETTLE_STEPS;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

const FT_TO_M: f64 = 0.3048;
const M_TO_FT: f64 = 1.0 / FT_TO_M;
// Rough metres per degree of latitude/longitude near the origin.
const METRES_PER_DEGREE: f64 = 111_320.0;
// Cap on distinct missing properties we log, to avoid spamming every tick.
const MAX_LOGGED_PROPERTIES: usize = 5;

// Property paths understood by the engine.
const IC_ALTITUDE_FT: &str = "ic/h-sl-ft";
const IC_LONGITUDE_DEG: &str = "ic/long-gc-deg";
const IC_LATITUDE_DEG: &str = "ic/lat-gc-deg";
const IC_HEADING_DEG: &str = "ic/psi-true-deg";
const IC_U_FPS: &str = "ic/u-fps";
const IC_V_FPS: &str = "ic/v-fps";
const IC_W_FPS: &str = "ic/w-fps";
const IC_PHI_DEG: &str = "ic/phi-deg";
const IC_THETA_DEG: &str = "ic/theta-deg";
const IC_ALPHA_DEG: &str = "ic/alpha-deg";
const IC_BETA_DEG: &str = "ic/beta-deg";
const GEAR_CMD: &str = "gear/gear-cmd-norm";
const THROTTLE_CMD: &str = "fcs/throttle-cmd-norm";
const ELEVATOR_CMD: &str = "fcs/elevator-cmd-norm";
const AILERON_CMD: &str = "fcs/aileron-cmd-norm";
const RUDDER_CMD: &str = "fcs/rudder-cmd-norm";

/// Port for a native engine exposing a JSBSim-style property tree.
pub trait FdmExec: Send {
    fn set_property(&mut self, name: &str, value: f64) -> Result<(), BackendError>;

    /// Absent when the property does not exist or cannot be read.
    fn get_property(&self, name: &str) -> Option<f64>;

    /// Applies the staged `ic/*` properties.
    fn run_ic(&mut self) -> Result<(), BackendError>;

    /// Advances one engine frame; false when the engine refuses.
    fn run(&mut self) -> bool;
}

type EngineFactory<E> = Box<dyn Fn() -> Result<E, BackendError> + Send>;

/// `PhysicsBackend` over a native engine.
///
/// `reset` rebuilds the engine from its factory: an in-place reset leaves spun-up
/// rotational state behind in some models.
pub struct NativeBackend<E: FdmExec> {
    fdm: E,
    make_fdm: EngineFactory<E>,
    envelope: Envelope,
    initialized: bool,
    logged_properties: HashSet<String>,
}

impl<E: FdmExec> NativeBackend<E> {
    pub fn new<F>(make_fdm: F) -> Result<Self, BackendError>
    where
        F: Fn() -> Result<E, BackendError> + Send + 'static,
    {
        let fdm = make_fdm()?;
        Ok(Self {
            fdm,
            make_fdm: Box::new(make_fdm),
            envelope: Envelope::default(),
            initialized: false,
            logged_properties: HashSet::new(),
        })
    }

    /// Reports airspeed against `envelope` instead of the default ceiling.
    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn fdm(&self) -> &E {
        &self.fdm
    }

    fn property(&mut self, name: &str) -> Option<f64> {
        let value = self.fdm.get_property(name).filter(|v| v.is_finite());
        if value.is_none()
            && !self.logged_properties.contains(name)
            && self.logged_properties.len() < MAX_LOGGED_PROPERTIES
        {
            debug!(property = name, "engine property not available");
            self.logged_properties.insert(name.to_string());
        }
        value
    }

    // First readable property among `names`, or zero.
    fn first_of(&mut self, names: &[&str]) -> f64 {
        names
            .iter()
            .find_map(|name| self.property(name))
            .unwrap_or(0.0)
    }

    fn stage_initial_conditions(&mut self, initial: InitialConditions) -> Result<(), BackendError> {
        let staged = [
            (IC_ALTITUDE_FT, initial.altitude_m * M_TO_FT),
            (IC_LONGITUDE_DEG, 0.0),
            (IC_LATITUDE_DEG, 0.0),
            (IC_HEADING_DEG, initial.heading_deg),
            (IC_U_FPS, initial.airspeed_ms * M_TO_FT),
            (IC_V_FPS, 0.0),
            (IC_W_FPS, 0.0),
            (IC_PHI_DEG, 0.0),
            (IC_THETA_DEG, 0.0),
            (IC_ALPHA_DEG, 0.0),
            (IC_BETA_DEG, 0.0),
        ];
        for (name, value) in staged {
            self.fdm.set_property(name, value)?;
        }

        // Some models have no retractable gear.
        if let Err(e) = self.fdm.set_property(GEAR_CMD, 1.0) {
            debug!(error = %e, "gear command not accepted");
        }
        Ok(())
    }

    fn write_controls(&mut self, controls: ControlInputs) -> Result<(), BackendError> {
        self.fdm.set_property(THROTTLE_CMD, controls.throttle)?;
        self.fdm.set_property(ELEVATOR_CMD, controls.elevator)?;
        self.fdm.set_property(AILERON_CMD, controls.aileron)?;
        self.fdm.set_property(RUDDER_CMD, controls.rudder)?;
        Ok(())
    }
}

impl<E: FdmExec> PhysicsBackend for NativeBackend<E> {
    fn initialize(&mut self, initial: InitialConditions) -> Result<(), BackendError> {
        self.initialized = false;
        self.stage_initial_conditions(initial)?;
        self.fdm.run_ic()?;
        self.write_controls(ControlInputs::neutral())?;

        // Let gear compression transients decay.
        for _ in 0..SETTLE_STEPS {
            if !self.fdm.run() {
                error!("native engine refused to run while settling");
                return Err(BackendError::StepRejected);
            }
        }

        self.initialized = true;
        let altitude = self.first_of(&["position/altitude-agl-ft"]) * FT_TO_M;
        let airspeed = self.first_of(&["velocities/vt-fps"]) * FT_TO_M;
        info!(altitude, airspeed, "native engine initialized and settled");
        Ok(())
    }

    fn set_controls(&mut self, controls: ControlInputs) {
        if let Err(e) = self.write_controls(controls.clamped()) {
            warn!(error = %e, "failed to set native engine controls");
        }
    }

    fn step(&mut self) -> Result<(), BackendError> {
        if !self.initialized {
            return Err(BackendError::NotInitialized);
        }
        if self.fdm.run() {
            Ok(())
        } else {
            Err(BackendError::StepRejected)
        }
    }

    fn get_state(&mut self) -> Telemetry {
        let Some(altitude_ft) = self
            .property("position/h-sl-ft")
            .or_else(|| self.property("position/altitude-agl-ft"))
        else {
            warn!("native engine properties not accessible; reporting degraded telemetry");
            return Telemetry::degraded();
        };

        let longitude = self.first_of(&["position/long-gc-deg"]);
        let latitude = self.first_of(&["position/lat-gc-deg"]);
        let phi_deg = self.first_of(&["attitude/phi-deg"]);
        let theta_deg = self.first_of(&["attitude/theta-deg"]);
        let psi_deg = self.first_of(&["attitude/psi-deg"]);
        let u_fps = self.first_of(&["velocities/u-fps"]);
        let v_fps = self.first_of(&["velocities/v-fps"]);
        let w_fps = self.first_of(&["velocities/w-fps"]);
        let h_dot_fps = self.first_of(&["velocities/h-dot-fps"]);
        let p = self.first_of(&["velocities/p-rad_sec", "velocities/p-rad-sec"]);
        let q = self.first_of(&["velocities/q-rad_sec", "velocities/q-rad-sec"]);
        let r = self.first_of(&["velocities/r-rad_sec", "velocities/r-rad-sec"]);
        let throttle = self.first_of(&[THROTTLE_CMD]);

        let mut true_airspeed_fps = self.first_of(&["velocities/vt-fps"]);
        if true_airspeed_fps == 0.0 {
            true_airspeed_fps = (u_fps * u_fps + v_fps * v_fps + w_fps * w_fps).sqrt();
        }

        // North-east order, matching the integrator: x grows with latitude.
        Telemetry {
            x: latitude * METRES_PER_DEGREE,
            y: longitude * METRES_PER_DEGREE,
            altitude: altitude_ft * FT_TO_M,
            phi_deg,
            theta_deg,
            psi_deg,
            airspeed: (true_airspeed_fps * FT_TO_M).clamp(0.0, self.envelope.max_airspeed),
            vertical_speed: h_dot_fps * FT_TO_M,
            p_deg_s: p.to_degrees(),
            q_deg_s: q.to_degrees(),
            r_deg_s: r.to_degrees(),
            throttle,
            engine: EngineTag::Native,
        }
    }

    fn reset(&mut self) -> Result<(), BackendError> {
        self.initialized = false;
        self.fdm = (self.make_fdm)()?;
        self.logged_properties.clear();
        self.initialize(InitialConditions::default())
    }

    fn engine(&self) -> EngineTag {
        EngineTag::Native
    }
}
