// Domain-level aircraft state, control inputs and telemetry snapshot types.

use crate::domain::tuning::Envelope;
use nalgebra::{Rotation3, Vector3};
use std::f64::consts::TAU;

/// Full 6-DOF state of the aircraft for one tick.
///
/// Positions are NED metres (altitude = -z), velocities are body-frame, angles are 3-2-1
/// Euler angles in radians. The control fields echo what the backend last flew with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AircraftState {
    pub x: f64,
    pub y: f64,
    pub z: f64,

    pub u: f64,
    pub v: f64,
    pub w: f64,

    pub phi: f64,
    pub theta: f64,
    pub psi: f64,

    pub p: f64,
    pub q: f64,
    pub r: f64,

    pub throttle: f64,
    pub elevator: f64,
    pub aileron: f64,
    pub rudder: f64,
}

impl AircraftState {
    /// On the ground, at rest, wings level, controls neutral.
    pub fn initial() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            u: 0.0,
            v: 0.0,
            w: 0.0,
            phi: 0.0,
            theta: 0.0,
            psi: 0.0,
            p: 0.0,
            q: 0.0,
            r: 0.0,
            throttle: 0.0,
            elevator: 0.0,
            aileron: 0.0,
            rudder: 0.0,
        }
    }

    pub fn from_initial_conditions(ic: InitialConditions) -> Self {
        let mut state = Self::initial();
        state.z = -ic.altitude_m.max(0.0);
        state.psi = ic.heading_deg.to_radians().rem_euclid(TAU);
        state.u = ic.airspeed_ms;
        state
    }

    pub fn is_finite(&self) -> bool {
        [
            self.x,
            self.y,
            self.z,
            self.u,
            self.v,
            self.w,
            self.phi,
            self.theta,
            self.psi,
            self.p,
            self.q,
            self.r,
            self.throttle,
            self.elevator,
            self.aileron,
            self.rudder,
        ]
        .iter()
        .all(|value| value.is_finite())
    }

    pub fn with_controls(mut self, controls: ControlInputs) -> Self {
        let controls = controls.clamped();
        self.throttle = controls.throttle;
        self.elevator = controls.elevator;
        self.aileron = controls.aileron;
        self.rudder = controls.rudder;
        self
    }

    pub fn controls(&self) -> ControlInputs {
        ControlInputs {
            throttle: self.throttle,
            elevator: self.elevator,
            aileron: self.aileron,
            rudder: self.rudder,
        }
    }

    pub fn body_velocity(&self) -> Vector3<f64> {
        Vector3::new(self.u, self.v, self.w)
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Body-to-NED rotation (roll, then pitch, then yaw).
    pub fn attitude(&self) -> Rotation3<f64> {
        Rotation3::from_euler_angles(self.phi, self.theta, self.psi)
    }

    pub fn airspeed(&self) -> f64 {
        self.body_velocity().norm()
    }

    pub fn world_velocity(&self) -> Vector3<f64> {
        self.attitude() * self.body_velocity()
    }

    /// Applies the numerical-stability envelope.
    ///
    /// Speed is scaled as a vector so the flight direction survives the clamp; every other
    /// quantity is clamped per component.
    pub fn clamped(mut self, envelope: &Envelope) -> Self {
        let velocity = self.body_velocity();
        let speed = velocity.norm();
        let largest_axis = velocity.amax();
        let mut scale: f64 = 1.0;
        if speed > envelope.max_airspeed {
            scale = scale.min(envelope.max_airspeed / speed);
        }
        if largest_axis > envelope.max_speed {
            scale = scale.min(envelope.max_speed / largest_axis);
        }
        if scale < 1.0 {
            self.u *= scale;
            self.v *= scale;
            self.w *= scale;
        }

        self.phi = self.phi.clamp(-std::f64::consts::PI, std::f64::consts::PI);
        self.theta = self
            .theta
            .clamp(-std::f64::consts::PI, std::f64::consts::PI);
        self.psi = self.psi.rem_euclid(TAU);

        let max_rate = envelope.max_angular_rate;
        self.p = self.p.clamp(-max_rate, max_rate);
        self.q = self.q.clamp(-max_rate, max_rate);
        self.r = self.r.clamp(-max_rate, max_rate);

        let limit = envelope.position_limit;
        self.x = self.x.clamp(-limit, limit);
        self.y = self.y.clamp(-limit, limit);
        // Ground plane is a hard floor.
        self.z = self.z.clamp(-limit, 0.0);

        let controls = self.controls().clamped();
        self.with_controls(controls)
    }
}

/// Pilot commands: throttle in [0, 1], surfaces in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlInputs {
    pub throttle: f64,
    pub elevator: f64,
    pub aileron: f64,
    pub rudder: f64,
}

impl ControlInputs {
    pub fn neutral() -> Self {
        Self {
            throttle: 0.0,
            elevator: 0.0,
            aileron: 0.0,
            rudder: 0.0,
        }
    }

    /// Clamps every field into range; non-finite values fall back to neutral.
    pub fn clamped(self) -> Self {
        Self {
            throttle: clamp_finite(self.throttle, 0.0, 1.0),
            elevator: clamp_finite(self.elevator, -1.0, 1.0),
            aileron: clamp_finite(self.aileron, -1.0, 1.0),
            rudder: clamp_finite(self.rudder, -1.0, 1.0),
        }
    }
}

impl Default for ControlInputs {
    fn default() -> Self {
        Self::neutral()
    }
}

fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        0.0
    }
}

/// Partial control message; absent fields leave the staged value untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlUpdate {
    pub throttle: Option<f64>,
    pub elevator: Option<f64>,
    pub aileron: Option<f64>,
    pub rudder: Option<f64>,
}

/// Latest clamped control values, written by inbound messages and read once per tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlStaging {
    current: ControlInputs,
}

impl ControlStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes each present field, clamped. Non-finite fields are dropped so the previous
    /// value stays in effect.
    pub fn apply(&mut self, update: ControlUpdate) {
        if let Some(throttle) = update.throttle.filter(|v| v.is_finite()) {
            self.current.throttle = throttle.clamp(0.0, 1.0);
        }
        if let Some(elevator) = update.elevator.filter(|v| v.is_finite()) {
            self.current.elevator = elevator.clamp(-1.0, 1.0);
        }
        if let Some(aileron) = update.aileron.filter(|v| v.is_finite()) {
            self.current.aileron = aileron.clamp(-1.0, 1.0);
        }
        if let Some(rudder) = update.rudder.filter(|v| v.is_finite()) {
            self.current.rudder = rudder.clamp(-1.0, 1.0);
        }
    }

    pub fn current(&self) -> ControlInputs {
        self.current
    }

    pub fn neutralize(&mut self) {
        self.current = ControlInputs::neutral();
    }
}

/// Start condition handed to `PhysicsBackend::initialize`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InitialConditions {
    pub altitude_m: f64,
    pub heading_deg: f64,
    pub airspeed_ms: f64,
}

/// Which backend produced a telemetry frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineTag {
    /// Built-in integrator.
    Internal,
    /// External native flight-dynamics engine.
    Native,
    /// Native engine whose readings could not be obtained.
    Degraded,
}

impl EngineTag {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineTag::Internal => "internal",
            EngineTag::Native => "native",
            EngineTag::Degraded => "degraded",
        }
    }
}

/// Externally reported snapshot, in SI units and degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    pub x: f64,
    pub y: f64,
    pub altitude: f64,
    pub phi_deg: f64,
    pub theta_deg: f64,
    pub psi_deg: f64,
    pub airspeed: f64,
    pub vertical_speed: f64,
    pub p_deg_s: f64,
    pub q_deg_s: f64,
    pub r_deg_s: f64,
    pub throttle: f64,
    pub engine: EngineTag,
}

impl Telemetry {
    pub fn from_state(state: &AircraftState, engine: EngineTag, envelope: &Envelope) -> Self {
        let airspeed = state.airspeed();
        let airspeed = if airspeed.is_finite() {
            airspeed.clamp(0.0, envelope.max_airspeed)
        } else {
            airspeed
        };

        Self {
            x: state.x,
            y: state.y,
            altitude: -state.z,
            phi_deg: state.phi.to_degrees(),
            theta_deg: state.theta.to_degrees(),
            psi_deg: state.psi.to_degrees(),
            airspeed,
            vertical_speed: -state.world_velocity().z,
            p_deg_s: state.p.to_degrees(),
            q_deg_s: state.q.to_degrees(),
            r_deg_s: state.r.to_degrees(),
            throttle: state.throttle,
            engine,
        }
    }

    /// Rest-default readings tagged as coming from an unreadable engine.
    pub fn degraded() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            altitude: 0.0,
            phi_deg: 0.0,
            theta_deg: 0.0,
            psi_deg: 0.0,
            airspeed: 0.0,
            vertical_speed: 0.0,
            p_deg_s: 0.0,
            q_deg_s: 0.0,
            r_deg_s: 0.0,
            throttle: 0.0,
            engine: EngineTag::Degraded,
        }
    }

    pub fn is_finite(&self) -> bool {
        [
            self.x,
            self.y,
            self.altitude,
            self.phi_deg,
            self.theta_deg,
            self.psi_deg,
            self.airspeed,
            self.vertical_speed,
            self.p_deg_s,
            self.q_deg_s,
            self.r_deg_s,
            self.throttle,
        ]
        .iter()
        .all(|value| value.is_finite())
    }

    /// True when the frame cannot be told apart from a never-initialized engine.
    pub fn looks_uninitialized(&self) -> bool {
        self.engine == EngineTag::Degraded || !self.is_finite()
    }
}
