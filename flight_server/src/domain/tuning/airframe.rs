/// Mass and aerodynamic tuning for the simulated light aircraft.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).

#[derive(Debug, Clone, Copy)]
pub struct Airframe {
    /// Gross mass in kilograms.
    pub mass: f64,

    /// Gravitational acceleration in m/s^2.
    pub gravity: f64,

    /// Reference wing area in m^2.
    pub wing_area: f64,

    /// Sea-level air density in kg/m^3 (no altitude model).
    pub air_density: f64,

    /// Lift coefficient at zero angle of attack.
    pub cl0: f64,

    /// Lift-curve slope per radian.
    pub cl_alpha: f64,

    /// Angle of attack beyond which lift stops growing, in radians.
    pub stall_alpha: f64,

    /// Parasite drag coefficient.
    pub cd0: f64,

    /// Induced drag factor of the parabolic polar.
    pub induced_drag: f64,

    /// Static thrust at full throttle in newtons.
    pub max_thrust: f64,

    /// Rolling friction coefficient while the gear is on the ground.
    pub rolling_friction: f64,

    /// Minimum airspeed in m/s before the aircraft may leave the ground.
    pub liftoff_speed: f64,

    pub roll_authority: f64,
    pub roll_damping: f64,
    pub pitch_authority: f64,
    pub pitch_damping: f64,
    pub yaw_authority: f64,
    pub yaw_damping: f64,
}

impl Airframe {
    pub fn weight(&self) -> f64 {
        self.mass * self.gravity
    }
}

impl Default for Airframe {
    fn default() -> Self {
        Self {
            mass: 1000.0,
            gravity: 9.81,
            wing_area: 16.2,
            air_density: 1.225,
            cl0: 0.3,
            cl_alpha: 5.0,
            stall_alpha: 0.3,
            cd0: 0.03,
            induced_drag: 0.04,
            max_thrust: 3500.0,
            rolling_friction: 0.02,
            liftoff_speed: 25.0,
            roll_authority: 0.6,
            roll_damping: 0.4,
            pitch_authority: 0.6,
            pitch_damping: 0.4,
            yaw_authority: 0.4,
            yaw_damping: 0.4,
        }
    }
}
