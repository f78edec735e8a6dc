// Framework bootstrap for the flight server runtime.

use crate::domain::tuning::BoundsLimits;
use crate::domain::{InitialConditions, PhysicsBackend};
use crate::frameworks::config;
use crate::interface_adapters::backends::IntegratorBackend;
use crate::interface_adapters::protocol::encode_telemetry;
use crate::interface_adapters::routes::app;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{BackendFactory, FailoverSupervisor, FlightLoop, flight_task};

use axum::extract::ws::Utf8Bytes;
use std::net::SocketAddr;
use std::{io::Result, sync::Arc, time::Duration};
use tokio::sync::{mpsc, watch};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Factory for the built-in integrator backend.
pub fn integrator_factory(tick_interval: Duration) -> BackendFactory {
    Box::new(move || {
        Ok(Box::new(IntegratorBackend::with_defaults(tick_interval)) as Box<dyn PhysicsBackend>)
    })
}

/// Serves on `listener` with the built-in integrator as both primary and fallback engine.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let tick = config::TICK_INTERVAL;
    run_with_backends(listener, integrator_factory(tick), integrator_factory(tick)).await
}

/// Serves on `listener` with caller-supplied engines, e.g. a native flight dynamics model
/// as primary and the integrator as fallback.
pub async fn run_with_backends(
    listener: tokio::net::TcpListener,
    primary: BackendFactory,
    fallback: BackendFactory,
) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state(primary, fallback)?;
    let app = app(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::new(config::bind_host(), config::http_port());

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state(primary: BackendFactory, fallback: BackendFactory) -> Result<Arc<AppState>> {
    let thresholds = config::health_thresholds();
    tracing::debug!(
        max_step_failures = thresholds.max_consecutive_step_failures,
        uninitialized_grace_ms = thresholds.uninitialized_grace.as_millis() as u64,
        stall_window_ms = thresholds.stall_window.as_millis() as u64,
        "failover thresholds configured"
    );

    // Startup is the only fatal path: with neither engine available there is nothing to fly.
    let supervisor = FailoverSupervisor::start(
        &primary,
        fallback,
        thresholds,
        InitialConditions::default(),
    )
    .map_err(|e| std::io::Error::other(format!("failed to start physics backend: {e}")))?;

    let (events_tx, events_rx) = mpsc::channel(config::EVENT_CHANNEL_CAPACITY);
    let (latest_tx, _latest_rx) = watch::channel(Utf8Bytes::from(""));

    let mut sim = FlightLoop::new(
        supervisor,
        BoundsLimits::default(),
        encode_telemetry,
        latest_tx.clone(),
    );
    sim.prime_latest();

    // The flight loop runs independently of every connection.
    tokio::spawn(flight_task(sim, events_rx, config::TICK_INTERVAL));

    Ok(Arc::new(AppState {
        events_tx,
        latest_tx,
        reset_ack_timeout: config::reset_ack_timeout(),
        subscriber_queue_capacity: config::SUBSCRIBER_QUEUE_CAPACITY,
    }))
}
