use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use visitlog_server::state::AppState;

/// `visitlog health`: liveness probe for container HEALTHCHECK.
///
/// Calls `GET http://localhost:$VISITLOG_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("VISITLOG_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // A missing .env file is normal in containers.
    dotenvy::dotenv().ok();

    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("visitlog=info".parse()?),
        )
        .json()
        .init();

    let cfg = visitlog_core::config::Config::from_env()?;

    // The store is not contacted here: the first request that needs it connects,
    // and every later request in this process reuses that handle.
    info!(
        backend = cfg.database_url.kind(),
        counter = %cfg.counter_name,
        "Store will connect on first request"
    );

    let state = Arc::new(AppState::from_config(cfg.clone())?);

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = visitlog_server::app::build_app(state);

    info!(port = cfg.port, "visitlog listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        tokio::signal::ctrl_c().await.ok();
    })
    .await?;

    Ok(())
}
