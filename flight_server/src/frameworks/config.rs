use crate::domain::tuning::HealthThresholds;
use std::{env, net::IpAddr, str::FromStr, time::Duration};

// Runtime/server constants (not flight model tuning).

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_millis)
}

pub fn http_port() -> u16 {
    env_parse("FLIGHT_SERVER_PORT").unwrap_or(8000)
}

pub fn bind_host() -> IpAddr {
    env_parse("FLIGHT_SERVER_HOST").unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

pub fn reset_ack_timeout() -> Duration {
    env_millis("RESET_ACK_TIMEOUT_MS").unwrap_or(Duration::from_millis(500))
}

/// Failover heuristics, each overridable from the environment.
pub fn health_thresholds() -> HealthThresholds {
    let defaults = HealthThresholds::default();
    HealthThresholds {
        max_consecutive_step_failures: env_parse("FAILOVER_MAX_STEP_FAILURES")
            .filter(|n: &u32| *n > 0)
            .unwrap_or(defaults.max_consecutive_step_failures),
        uninitialized_grace: env_millis("FAILOVER_UNINITIALIZED_GRACE_MS")
            .unwrap_or(defaults.uninitialized_grace),
        stall_throttle: env_parse("FAILOVER_STALL_THROTTLE")
            .filter(|v: &f64| v.is_finite())
            .unwrap_or(defaults.stall_throttle),
        stall_airspeed: env_parse("FAILOVER_STALL_AIRSPEED_MS")
            .filter(|v: &f64| v.is_finite())
            .unwrap_or(defaults.stall_airspeed),
        stall_window: env_millis("FAILOVER_STALL_WINDOW_MS").unwrap_or(defaults.stall_window),
    }
}

pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
// Frames buffered per WebSocket subscriber before new frames are dropped for it.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 32;

// 60 Hz.
pub const TICK_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 60);
