// Fixed-rate flight loop: controls in, physics step, health and bounds checks, telemetry out.

use super::broadcast::SubscriberSet;
use super::failover::{FailoverSupervisor, HealthVerdict, StepOutcome};
use super::types::SimEvent;
use crate::domain::systems::bounds::is_out_of_bounds;
use crate::domain::tuning::BoundsLimits;
use crate::domain::{ControlStaging, Telemetry};
use axum::extract::ws::Utf8Bytes;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Serializes one telemetry frame for the wire.
pub type TelemetryEncoder = fn(&Telemetry) -> Result<String, serde_json::Error>;

const LOG_THROTTLE: Duration = Duration::from_secs(2);

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Everything the tick loop owns between ticks.
pub struct FlightLoop {
    supervisor: FailoverSupervisor,
    staging: ControlStaging,
    subscribers: SubscriberSet,
    bounds: BoundsLimits,
    encode: TelemetryEncoder,
    latest_tx: watch::Sender<Utf8Bytes>,
    tick: u64,
    last_drop_log: Instant,
}

impl FlightLoop {
    pub fn new(
        supervisor: FailoverSupervisor,
        bounds: BoundsLimits,
        encode: TelemetryEncoder,
        latest_tx: watch::Sender<Utf8Bytes>,
    ) -> Self {
        Self {
            supervisor,
            staging: ControlStaging::new(),
            subscribers: SubscriberSet::new(),
            bounds,
            encode,
            latest_tx,
            tick: 0,
            last_drop_log: Instant::now() - LOG_THROTTLE,
        }
    }

    pub fn staging(&self) -> &ControlStaging {
        &self.staging
    }

    pub fn supervisor(&self) -> &FailoverSupervisor {
        &self.supervisor
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Publishes the backend's current state as the latest frame without ticking.
    pub fn prime_latest(&mut self) {
        let telemetry = self.supervisor.get_state();
        self.publish(&telemetry);
    }

    pub fn handle_event(&mut self, event: SimEvent) {
        match event {
            SimEvent::Controls(update) => self.staging.apply(update),
            SimEvent::Subscribe {
                subscriber_id,
                sink,
            } => {
                self.subscribers.add(subscriber_id, sink);
                debug!(
                    subscriber_id,
                    subscribers = self.subscribers.len(),
                    "subscriber registered"
                );
            }
            SimEvent::Unsubscribe { subscriber_id } => {
                if self.subscribers.remove(subscriber_id) {
                    debug!(
                        subscriber_id,
                        subscribers = self.subscribers.len(),
                        "subscriber removed"
                    );
                }
            }
            SimEvent::Reset { ack } => {
                info!(tick = self.tick, "reset requested");
                self.reset();
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
        }
    }

    /// Runs one tick and returns the frame that was broadcast, if any.
    pub fn tick(&mut self, now: Instant) -> Option<Telemetry> {
        self.tick += 1;
        let controls = self.staging.current();

        if let StepOutcome::Failed(verdict) = self.supervisor.step(controls) {
            // The backend was reset or replaced; start clean on the next tick.
            self.staging.neutralize();
            debug!(tick = self.tick, ?verdict, "tick skipped after step failure");
            return None;
        }

        let mut telemetry = self.supervisor.get_state();

        match self.supervisor.check(&telemetry, &controls, now) {
            HealthVerdict::Healthy => {}
            verdict => {
                // Never replay a stale high-authority command into a pristine backend.
                self.staging.neutralize();
                info!(
                    tick = self.tick,
                    ?verdict,
                    engine = self.supervisor.engine().as_str(),
                    "backend recovered by supervisor"
                );
                telemetry = self.supervisor.get_state();
            }
        }

        if is_out_of_bounds(&telemetry, &self.bounds) {
            warn!(
                tick = self.tick,
                altitude = telemetry.altitude,
                x = telemetry.x,
                y = telemetry.y,
                "state left bounds; resetting"
            );
            self.reset();
            telemetry = self.supervisor.get_state();
            if is_out_of_bounds(&telemetry, &self.bounds) {
                error!(tick = self.tick, "state still out of bounds after reset; frame withheld");
                return None;
            }
        }

        self.publish(&telemetry);
        Some(telemetry)
    }

    fn reset(&mut self) {
        self.supervisor.reset();
        self.staging.neutralize();
    }

    // Serialize once, then share the bytes with every subscriber.
    fn publish(&mut self, telemetry: &Telemetry) {
        let txt = match (self.encode)(telemetry) {
            Ok(txt) => txt,
            Err(e) => {
                error!(error = ?e, "failed to serialize telemetry");
                return;
            }
        };
        let bytes = Utf8Bytes::from(txt);

        // Latest frame for connections that subscribe between ticks.
        self.latest_tx.send_replace(bytes.clone());

        let report = self.subscribers.broadcast(&bytes);
        for subscriber_id in &report.pruned {
            debug!(subscriber_id, "subscriber send failed; removed");
        }
        if report.dropped > 0 && should_log(&mut self.last_drop_log) {
            warn!(
                dropped = report.dropped,
                "subscribers lagging; frames dropped"
            );
        }
    }
}

/// Drives `sim` at `tick_interval` until the process exits.
pub async fn flight_task(
    mut sim: FlightLoop,
    mut events_rx: mpsc::Receiver<SimEvent>,
    tick_interval: Duration,
) {
    let mut interval = tokio::time::interval(tick_interval);
    // A late tick simply runs once the timer fires; no catch-up bursts.
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        tick_ms = tick_interval.as_secs_f64() * 1000.0,
        engine = sim.supervisor().engine().as_str(),
        "flight loop started"
    );

    loop {
        interval.tick().await;

        while let Ok(ev) = events_rx.try_recv() {
            sim.handle_event(ev);
        }

        sim.tick(Instant::now());
    }
}
