use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use comicsearch_core::{
    load_config, validate_config, ComicCatalog, ComicSource, EventBus, IndexScheduler,
    JwtAuthenticator, Normalizer, SearchService, SnowballNormalizer, SqliteCatalog, UpdateService,
    XkcdClient,
};

use comicsearch_server::api::create_router;
use comicsearch_server::state::AppState;

/// How long in-flight requests may drain after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // tracing may not be initialized yet when startup fails early
        eprintln!("fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config_path = config_path_from_args();
    let config = load_config(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    validate_config(&config).context("configuration validation failed")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(path = %config_path.display(), "configuration loaded");

    let catalog: Arc<dyn ComicCatalog> = Arc::new(
        SqliteCatalog::new(&config.database.path).with_context(|| {
            format!("failed to open catalog at {}", config.database.path.display())
        })?,
    );
    let words: Arc<dyn Normalizer> = Arc::new(SnowballNormalizer::new());
    let source: Arc<dyn ComicSource> = Arc::new(
        XkcdClient::new(
            &config.xkcd.url,
            Duration::from_secs(config.xkcd.timeout_secs),
        )
        .context("failed to create upstream client")?,
    );

    let bus = EventBus::new(&config.broker.subject, config.broker.capacity);

    let updater = Arc::new(
        UpdateService::new(
            Arc::clone(&catalog),
            source,
            Arc::clone(&words),
            bus.publisher(),
            config.xkcd.concurrency,
        )
        .context("failed to create update service")?,
    );
    let searcher = Arc::new(SearchService::new(Arc::clone(&catalog), Arc::clone(&words)));

    let (shutdown_tx, _) = broadcast::channel(1);
    let _subscriber_task = bus.subscribe(Arc::clone(&searcher), shutdown_tx.subscribe());

    let scheduler = IndexScheduler::new(
        Arc::clone(&searcher),
        Duration::from_secs(config.index.ttl_secs),
    );
    let _index_task = scheduler
        .start(shutdown_tx.subscribe())
        .await
        .context("initial index build failed")?;

    let authenticator = JwtAuthenticator::new(
        &config.auth.admin_user,
        &config.auth.admin_password,
        &config.auth.jwt_secret,
        Duration::from_secs(config.auth.token_ttl_secs),
    );

    let addr = config.api.address;
    let state = Arc::new(AppState::new(
        config,
        authenticator,
        updater,
        searcher,
        words,
        catalog,
    ));
    let app = create_router(state);

    info!(%addr, "starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    let mut force_rx = shutdown_tx.subscribe();
    tokio::select! {
        result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown_tx.clone())) =>
        {
            result.context("server error")?;
            info!("server stopped");
        }
        _ = async {
            // the grace period starts once the shutdown signal fires
            let _ = force_rx.recv().await;
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        } => {
            warn!("graceful shutdown deadline exceeded, terminating");
        }
    }

    Ok(())
}

/// Config path from `-config`/`--config`, the `COMICSEARCH_CONFIG`
/// variable, or `config.toml`.
fn config_path_from_args() -> PathBuf {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "-config" || arg == "--config" {
            if let Some(path) = args.next() {
                return PathBuf::from(path);
            }
        }
    }
    std::env::var("COMICSEARCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"))
}

/// Resolves on SIGINT or SIGTERM and fans the shutdown out to the
/// background tasks.
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
    let _ = shutdown_tx.send(());
}
