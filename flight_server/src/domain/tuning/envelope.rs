/// Numerical-stability limits the integrator clamps every state into.

#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    /// Per-axis body velocity limit in m/s.
    pub max_speed: f64,

    /// Combined airspeed ceiling in m/s for a light aircraft.
    pub max_airspeed: f64,

    /// Body angular rate limit in rad/s.
    pub max_angular_rate: f64,

    /// Absolute position limit per axis in metres.
    pub position_limit: f64,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            max_speed: 100.0,
            max_airspeed: 85.0,
            max_angular_rate: 3.0,
            position_limit: 1_000_000.0,
        }
    }
}

/// Physically sane region; leaving it forces a full reset.
#[derive(Debug, Clone, Copy)]
pub struct BoundsLimits {
    pub altitude_min: f64,
    pub altitude_max: f64,
    /// Maximum horizontal distance from the origin in metres.
    pub position_abs_max: f64,
}

impl Default for BoundsLimits {
    fn default() -> Self {
        Self {
            altitude_min: -200.0,
            altitude_max: 50_000.0,
            position_abs_max: 100_000.0,
        }
    }
}
