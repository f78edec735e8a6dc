use std::time::Duration;

/// Heuristics the failover supervisor uses to judge a backend from its numbers alone.
///
/// These are tuned against an unreliable external engine; keep control flow out of here.
#[derive(Debug, Clone, Copy)]
pub struct HealthThresholds {
    /// Consecutive failed steps before the backend is abandoned.
    pub max_consecutive_step_failures: u32,

    /// How long uninitialized-looking telemetry is tolerated.
    pub uninitialized_grace: Duration,

    /// Commanded throttle above which the stall watchdog arms.
    pub stall_throttle: f64,

    /// Airspeed in m/s the aircraft must exceed while the throttle is armed.
    pub stall_airspeed: f64,

    /// How long throttle may stay armed without airspeed.
    pub stall_window: Duration,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            max_consecutive_step_failures: 5,
            uninitialized_grace: Duration::from_secs(1),
            stall_throttle: 0.5,
            stall_airspeed: 2.0,
            stall_window: Duration::from_secs(5),
        }
    }
}
