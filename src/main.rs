mod auth;
mod config;
mod error;
mod handlers;
mod metrics;
mod models;
mod player;
mod rate_limit;
mod server;
mod state;
mod validation;

use anyhow::Context;
use clap::Parser; // for cli
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::auth::TokenStore;
use crate::config::{Cli, Command, IssueTokenArgs, ServeArgs};
use crate::player::Player;
use crate::rate_limit::{RateLimiter, eviction_task};
use crate::state::AppState;
use crate::validation::RequestValidator;

// this is main async function with tokio
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // parse cli arguments
    match Cli::parse().into_command() {
        Command::Serve(args) => serve(args).await,
        Command::IssueToken(args) => issue_token(args),
    }
}

fn issue_token(args: IssueTokenArgs) -> anyhow::Result<()> {
    let store = TokenStore::new(&args.token_file);
    let token = store.issue(&args.name)?;

    println!("Generated API token: {}", token);
    println!("Save this token securely - it is not stored and cannot be shown again");
    println!("Tokens are stored in: {}", store.path().display());
    Ok(())
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let validator = RequestValidator::with_defaults(&args.audio_dir);
    validator
        .prepare_audio_dir()
        .with_context(|| format!("cannot prepare audio directory {}", args.audio_dir.display()))?;

    let rate_limiter = Arc::new(RateLimiter::new(
        args.rate_limit,
        Duration::from_secs(args.rate_window),
    ));

    // creating shared state
    let mut state = AppState::new(
        Arc::clone(&rate_limiter),
        validator,
        TokenStore::new(&args.token_file),
        Player::with_defaults(Duration::from_secs(args.playback_timeout)),
    );
    state.max_body = args.max_body;
    state.require_auth = args.require_auth;
    state.metrics_enabled = args.metrics;

    if state.require_auth && state.tokens.load().is_empty() {
        tracing::warn!(
            "auth is required but {} holds no tokens; run `issue-token` first",
            args.token_file.display()
        );
    }

    // spawn the background eviction of idle client windows
    let every = Duration::from_secs(args.eviction_interval.max(1));
    tokio::spawn(eviction_task(rate_limiter, every));

    let app = server::router(Arc::new(state));

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;

    tracing::info!("Announcement server listening on port {}", args.port);
    tracing::info!(
        "Rate limit: {} requests per {} seconds",
        args.rate_limit, args.rate_window
    );
    if args.require_auth {
        tracing::info!("API token required for /play");
    }

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
