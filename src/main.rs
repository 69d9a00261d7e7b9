use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use bearer_gate::adapter::handler::{router, AppState};
use bearer_gate::infrastructure::config::Config;
use bearer_gate::infrastructure::telemetry;
use bearer_gate::usecase::TokenValidator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- Config ---
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/config.yaml".to_string());
    let cfg = Config::load(&config_path)?;

    // --- Logging ---
    telemetry::init_logging(&cfg.observability.log)?;

    info!(
        app_name = %cfg.app.name,
        version = %cfg.app.version,
        environment = %cfg.app.environment,
        "starting bearer-gate server"
    );

    // --- Token validator ---
    info!(
        issuer = %cfg.auth.issuer,
        audience = %cfg.auth.audience(),
        jwks_url = %cfg.auth.jwks_url(),
        jwks_cache_ttl_secs = cfg.auth.jwks_cache_ttl_secs,
        "initializing token validator"
    );
    let validator = Arc::new(TokenValidator::from_config(&cfg.auth)?);

    // --- Router ---
    let app = router(AppState::new(validator));

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!("REST server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("bearer-gate exited");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
