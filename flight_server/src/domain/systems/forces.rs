use crate::domain::state::AircraftState;
use crate::domain::tuning::Airframe;
use nalgebra::Vector3;

// Airspeed floor that keeps the direction and alpha terms away from a division by zero.
const MIN_AIRSPEED: f64 = 0.1;
// Below this the w/v term of alpha is mostly noise.
const ALPHA_MIN_AIRSPEED: f64 = 0.5;

/// Net body-frame result of the force/moment model for one state.
#[derive(Debug, Clone, Copy)]
pub struct ForceOutput {
    /// Linear acceleration in body axes (m/s^2), gravity included.
    pub accel_body: Vector3<f64>,
    /// Body rates (p, q, r) after this step's first-order lag.
    pub rates: Vector3<f64>,
    /// Floored airspeed magnitude the coefficients were computed with.
    pub airspeed: f64,
    pub alpha: f64,
    pub lift: f64,
    pub drag: f64,
    pub thrust: f64,
    /// Rolling friction magnitude (zero while airborne).
    pub friction: f64,
    pub grounded: bool,
}

/// Evaluates forces and the simplified rate response for `state`.
///
/// `dt` only feeds the angular lag and the friction limit; no state is advanced here.
pub fn evaluate(state: &AircraftState, dt: f64, airframe: &Airframe) -> ForceOutput {
    let velocity = state.body_velocity();
    let airspeed = velocity.norm().max(MIN_AIRSPEED);

    let alpha = if airspeed > ALPHA_MIN_AIRSPEED {
        state.theta - state.w / airspeed
    } else {
        state.theta
    };
    let alpha = alpha.clamp(-airframe.stall_alpha, airframe.stall_alpha);

    let q_bar = 0.5 * airframe.air_density * airspeed * airspeed;
    let cl = airframe.cl0 + airframe.cl_alpha * alpha;
    let cd = airframe.cd0 + airframe.induced_drag * cl * cl;
    let lift = q_bar * airframe.wing_area * cl;
    let drag = q_bar * airframe.wing_area * cd;
    let thrust = airframe.max_thrust * state.throttle;
    let weight = airframe.weight();

    // Unit-ish flow direction; at rest it collapses to zero and so do lift and drag.
    let direction = velocity / airspeed;
    let drag_force = -direction * drag;
    // Perpendicular to the flow in the body x-z plane, pointing up in level flight.
    let lift_force = Vector3::new(direction.z, 0.0, -direction.x) * lift;
    let gravity_force = state
        .attitude()
        .inverse_transform_vector(&Vector3::new(0.0, 0.0, weight));

    let grounded = state.z >= 0.0;
    let friction = if grounded && state.u != 0.0 {
        // Normal force fades out as the wing takes the weight.
        let normal = (weight * state.theta.cos() - lift).max(0.0);
        let mut magnitude = airframe.rolling_friction * normal;
        if dt > 0.0 {
            magnitude = magnitude.min(airframe.mass * state.u.abs() / dt);
        }
        magnitude
    } else {
        0.0
    };
    let propulsion = Vector3::new(thrust - friction * state.u.signum(), 0.0, 0.0);

    let force = propulsion + drag_force + lift_force + gravity_force;

    let rates = Vector3::new(
        state.p + (airframe.roll_authority * state.aileron - airframe.roll_damping * state.p) * dt,
        state.q
            + (airframe.pitch_authority * state.elevator - airframe.pitch_damping * state.q) * dt,
        state.r + (airframe.yaw_authority * state.rudder - airframe.yaw_damping * state.r) * dt,
    );

    ForceOutput {
        accel_body: force / airframe.mass,
        rates,
        airspeed,
        alpha,
        lift,
        drag,
        thrust,
        friction,
        grounded,
    }
}
