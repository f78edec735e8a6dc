use crate::domain::state::Telemetry;
use crate::domain::tuning::BoundsLimits;

/// Returns true once a frame has left the physically sane envelope.
///
/// Non-finite readings count as out of bounds so they are never published.
pub fn is_out_of_bounds(telemetry: &Telemetry, limits: &BoundsLimits) -> bool {
    if !telemetry.is_finite() {
        return true;
    }
    if telemetry.altitude < limits.altitude_min || telemetry.altitude > limits.altitude_max {
        return true;
    }
    telemetry.x.hypot(telemetry.y) > limits.position_abs_max
}
