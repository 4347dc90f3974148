use {
    anyhow::Context as _,
    geolocation::{
        api,
        config::Config,
        geoip::{CancellationToken, DatabaseManager, Locator, MaxMindParser, Refresher},
    },
    std::sync::Arc,
    structopt::StructOpt,
    tokio::net::TcpListener,
    tracing::{error, info},
    tracing_subscriber::{fmt, prelude::*, EnvFilter},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let config = Config::from_args();
    config.validate()?;

    let manager = Arc::new(DatabaseManager::new());
    let refresher = Refresher::new(
        config.source()?,
        MaxMindParser,
        manager.clone(),
        config.refresh_config(),
    );

    // There's no fallback data yet, so a failed initial load is fatal.
    let version = refresher
        .refresh()
        .await
        .context("initial geoip database load failed")?;
    info!(version, "geoip database loaded");

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, prefix = %config.route_prefix, "geoip service listening");

    let token = CancellationToken::new();
    let refresh_task = refresher.spawn(token.child_token());
    tokio::spawn(shutdown_signal(token.clone()));

    let app = api::router(&config.route_prefix, Locator::new(manager));
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(token.clone().cancelled_owned())
        .await
        .context("http server failed");

    token.cancel();
    refresh_task.await.context("refresh task failed")?;

    info!("geoip service stopped");

    result
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }

            Err(error) => {
                error!(%error, "failed to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = token.cancelled() => return,
    }

    info!("shutdown signal received");
    token.cancel();
}
