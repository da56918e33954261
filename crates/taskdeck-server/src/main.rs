use std::env;

use taskdeck_auth::cleanup::spawn_cleanup_task;
use taskdeck_auth::config::AuthConfig;
use taskdeck_server::{Backend, build_app, observability};

/// Environment variable naming the listen address (default `0.0.0.0:8080`).
const LISTEN_ADDR: &str = "LISTEN_ADDR";

#[tokio::main]
async fn main() {
    // Load .env file if present; optional in deployments.
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: failed to load .env file: {e}");
        }
    }

    observability::init_tracing();

    // Missing or invalid secrets must kill the process before it serves
    // a single request.
    let config = match AuthConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    let backend = match Backend::from_env().await {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Storage initialization failed: {e}");
            std::process::exit(2);
        }
    };

    let app = build_app(&config, backend);
    let cleanup = spawn_cleanup_task(app.token_store.clone(), config.cleanup_interval);

    let addr = env::var(LISTEN_ADDR).unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind {addr}: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(%addr, "taskdeck server listening");

    let serve = axum::serve(listener, app.router).with_graceful_shutdown(shutdown_signal());
    if let Err(err) = serve.await {
        eprintln!("Server error: {err}");
    }

    cleanup.abort();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}
