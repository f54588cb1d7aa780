use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reactdash::{
    api, broadcast,
    config::ServerConfig,
    questions::QuestionBank,
    state::{AppState, IdleTimeout},
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reactdash=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting reactdash...");

    let config = ServerConfig::from_env();
    let questions = QuestionBank::load_or_fallback(&config.questions_path);
    tracing::info!(
        "Game: {} rounds, {:?} per round, {:?} per voting step, {} prompts",
        config.game.total_rounds,
        config.game.round_duration,
        config.game.vote_step_timeout,
        questions.len()
    );

    let state = Arc::new(
        AppState::new(config.game.clone(), questions).with_eviction(IdleTimeout {
            max_idle: config.rooms.idle_timeout,
        }),
    );

    broadcast::spawn_room_sweeper(state.clone(), config.rooms.sweep_interval);

    let cors = match config
        .front_origin
        .as_deref()
        .map(|origin| origin.parse::<HeaderValue>())
    {
        Some(Ok(origin)) => CorsLayer::new().allow_origin(origin),
        Some(Err(e)) => {
            tracing::warn!("Invalid FRONT_ORIGIN ({}), allowing any origin", e);
            CorsLayer::permissive()
        }
        None => CorsLayer::permissive(),
    };

    let app = api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
