use crate::domain::state::{AircraftState, ControlInputs};
use crate::domain::systems::forces;
use crate::domain::tuning::{Airframe, Envelope};

/// Advances `state` by one semi-implicit Euler step of `dt` seconds.
///
/// The input is never mutated. A non-finite input, or a step that still produces a
/// non-finite value after clamping, yields the canonical initial state flying `controls`.
pub fn integrate(
    state: &AircraftState,
    controls: ControlInputs,
    dt: f64,
    airframe: &Airframe,
    envelope: &Envelope,
) -> AircraftState {
    let controls = controls.clamped();
    if !state.is_finite() || !dt.is_finite() || dt <= 0.0 {
        return AircraftState::initial().with_controls(controls);
    }

    let current = state.clamped(envelope).with_controls(controls);
    let out = forces::evaluate(&current, dt, airframe);

    // Attitude advances first order from the old orientation.
    let phi = current.phi + out.rates.x * dt;
    let theta = current.theta + out.rates.y * dt;
    let psi = current.psi + out.rates.z * dt;

    let body_velocity = current.body_velocity() + out.accel_body * dt;

    // Old attitude on the way out, new attitude on the way back in (see below).
    let old_attitude = current.attitude();
    let mut world_velocity = old_attitude * body_velocity;

    if out.grounded {
        // NED: positive z velocity points into the ground.
        let sinking = world_velocity.z > 0.0;
        let climbing_too_slow = world_velocity.z < 0.0 && out.airspeed < airframe.liftoff_speed;
        if sinking || climbing_too_slow {
            world_velocity.z = 0.0;
        }
    }

    let mut position = current.position() + world_velocity * dt;
    if position.z >= 0.0 {
        position.z = 0.0;
        if world_velocity.z > 0.0 {
            // Touchdown: the gear absorbs the sink rate.
            world_velocity.z = 0.0;
        }
    }

    let mut next = AircraftState {
        x: position.x,
        y: position.y,
        z: position.z,
        u: 0.0,
        v: 0.0,
        w: 0.0,
        phi,
        theta,
        psi,
        p: out.rates.x,
        q: out.rates.y,
        r: out.rates.z,
        throttle: current.throttle,
        elevator: current.elevator,
        aileron: current.aileron,
        rudder: current.rudder,
    };

    // Keep (u, v, w) consistent with the attitude that gets reported, otherwise the one-tick
    // mismatch accumulates as drift.
    let body_velocity = next.attitude().inverse_transform_vector(&world_velocity);
    next.u = body_velocity.x;
    next.v = body_velocity.y;
    next.w = body_velocity.z;

    let next = next.clamped(envelope);
    if next.is_finite() {
        next
    } else {
        AircraftState::initial().with_controls(controls)
    }
}
