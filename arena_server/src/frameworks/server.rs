// Framework bootstrap for the arena server runtime.

use crate::domain::Rules;
use crate::frameworks::config;
use crate::interface_adapters::net::{SerializerObserver, list_rooms_handler, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{CommandGateway, RoomRegistry, RoomSettings};

use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

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

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state()?;
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/rooms", get(list_rooms_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Result<Arc<AppState>> {
    let rules = Rules::for_mode(config::game_mode());
    rules
        .validate()
        .map_err(|e| std::io::Error::other(format!("invalid gameplay tuning: {e}")))?;

    let settings = RoomSettings {
        command_channel_capacity: config::COMMAND_CHANNEL_CAPACITY,
        update_broadcast_capacity: config::ROOM_BROADCAST_CAPACITY,
        tick_interval: config::tick_interval(),
        snapshot_every_ticks: config::SNAPSHOT_EVERY_TICKS,
        rules: Arc::new(rules),
        seed: config::rng_seed(),
    };
    tracing::debug!(
        mode = settings.rules.mode.as_str(),
        side_table_version = settings.rules.sides.version,
        tick_ms = settings.tick_interval.as_millis() as u64,
        seeded = settings.seed.is_some(),
        "room settings configured"
    );

    // Rooms are created on first join; each gets its own serializer.
    let registry =
        RoomRegistry::new(settings).with_observer(Arc::new(SerializerObserver));

    Ok(Arc::new(AppState {
        gateway: CommandGateway::new(Arc::new(registry)),
    }))
}
