// Wire protocol DTOs for the public flight server endpoints.

use crate::domain::{ControlUpdate, Telemetry};
use serde::{Deserialize, Serialize};

/// One telemetry frame as streamed to WebSocket subscribers every tick.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryDto {
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
    // Which engine produced the frame: "internal", "native" or "degraded".
    pub physics_engine: &'static str,
}

impl From<&Telemetry> for TelemetryDto {
    fn from(t: &Telemetry) -> Self {
        Self {
            x: t.x,
            y: t.y,
            altitude: t.altitude,
            phi_deg: t.phi_deg,
            theta_deg: t.theta_deg,
            psi_deg: t.psi_deg,
            airspeed: t.airspeed,
            vertical_speed: t.vertical_speed,
            p_deg_s: t.p_deg_s,
            q_deg_s: t.q_deg_s,
            r_deg_s: t.r_deg_s,
            throttle: t.throttle,
            physics_engine: t.engine.as_str(),
        }
    }
}

/// Serializes a frame; used by the tick loop as its encoder.
pub fn encode_telemetry(telemetry: &Telemetry) -> Result<String, serde_json::Error> {
    serde_json::to_string(&TelemetryDto::from(telemetry))
}

/// Control message sent by clients. Every field is optional; absent fields keep their
/// current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlMessage {
    #[serde(default)]
    pub throttle: Option<f64>,
    #[serde(default)]
    pub elevator: Option<f64>,
    #[serde(default)]
    pub aileron: Option<f64>,
    #[serde(default)]
    pub rudder: Option<f64>,
}

impl From<ControlMessage> for ControlUpdate {
    fn from(msg: ControlMessage) -> Self {
        Self {
            throttle: msg.throttle,
            elevator: msg.elevator,
            aileron: msg.aileron,
            rudder: msg.rudder,
        }
    }
}

/// Body of successful management responses.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}
