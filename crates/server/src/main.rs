use server::config;
use server::routes;
use server::session::SessionStore;

use std::sync::Arc;

use analysis::{EnginePool, PositionAnalyzer};
use anyhow::Context;
use axum::{routing::{get, post}, Extension, Router};
use chess_core::openings::OpeningBook;
use chess_core::puzzles::PuzzleBook;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env().context("Invalid configuration")?;

    // Opening book is optional; commentary just omits opening names without it
    let book = Arc::new(OpeningBook::load_or_empty(&config.opening_book_path));
    tracing::info!("Opening book: {} openings", book.len());
    let puzzles = Arc::new(PuzzleBook::load_or_empty(&config.puzzle_book_path));

    // One Stockfish process per pool slot
    let engines = Arc::new(
        EnginePool::spawn(
            &config.stockfish_path,
            config.engine_pool_size,
            config.engine_grace,
        )
        .await
        .context("Failed to start Stockfish")?,
    );

    let store: routes::Store = Arc::new(SessionStore::new(
        engines.clone(),
        PositionAnalyzer::new(config.analyzer.clone()),
        book.clone(),
        config.narration_seed,
    ));

    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        // Games
        .route("/api/games", post(routes::games::create_game))
        .route("/api/games/{game_id}", get(routes::games::poll_game))
        .route("/api/games/{game_id}/join", post(routes::games::join_game))
        .route("/api/games/{game_id}/moves", post(routes::games::play_move))
        .route("/api/games/{game_id}/engine-move", post(routes::games::play_engine_move))
        .route("/api/games/{game_id}/draw/offer", post(routes::games::offer_draw))
        .route("/api/games/{game_id}/draw/answer", post(routes::games::answer_draw))
        .route("/api/games/{game_id}/draw/reset", post(routes::games::reset_draw))
        .route("/api/games/{game_id}/retire", post(routes::games::retire))
        .route("/api/games/{game_id}/messages", post(routes::games::post_message))
        // Openings
        .route("/api/openings", get(routes::openings::lookup_opening))
        // Puzzles
        .route("/api/puzzles/types", get(routes::puzzles::puzzle_types))
        .route("/api/puzzles/single-move/{puzzle_type}", get(routes::puzzles::single_move_puzzle))
        .route("/api/puzzles/mate-in/{n}", get(routes::puzzles::mate_in_n_puzzle))
        // Stateless engine play
        .route("/api/engine/play", post(routes::engine::engine_play))
        // Shared state
        .layer(Extension(store))
        .layer(Extension(book))
        .layer(Extension(puzzles))
        .layer(Extension(config.clone()))
        .layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    engines.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
