use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediaflow_core::{
    create_credential_provider, load_config, validate_config, HttpUploadTransport,
    LocalPreviewGenerator, PreviewGenerator, PreviewRegistry, UploadEvent, UploadOrchestrator,
};
use mediaflow_server::api::{create_router, WsBroadcaster};
use mediaflow_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long shutdown waits for aborted transfers to settle
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("MEDIAFLOW_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "Configuration loaded successfully"
    );
    info!("Auth method: {}", config.auth.method.as_str());
    info!(
        "Uploading to collection {} at {}",
        config.remote.collection_id, config.remote.base_url
    );

    // Outbound credentials and transport
    let credentials =
        create_credential_provider(&config.auth).context("Failed to create credential provider")?;
    info!("Using credential provider: {}", credentials.method_name());

    let transport = Arc::new(
        HttpUploadTransport::new(&config.remote, credentials)
            .context("Failed to create upload transport")?,
    );

    let previews: Option<Arc<dyn PreviewGenerator>> = if config.preview.enabled {
        info!(
            "Local previews enabled for {:?}",
            config.preview.mime_prefixes
        );
        Some(Arc::new(LocalPreviewGenerator::new(
            PreviewRegistry::new(),
            config.preview.mime_prefixes.clone(),
        )))
    } else {
        info!("Local previews disabled");
        None
    };

    // Every orchestrator event is pushed to WebSocket clients
    let ws_broadcaster = WsBroadcaster::default();
    let broadcaster_for_callback = ws_broadcaster.clone();
    let orchestrator = Arc::new(
        UploadOrchestrator::new(config.batch.clone(), transport, previews)
            .context("Failed to create upload orchestrator")?
            .with_event_callback(Arc::new(move |event: &UploadEvent| {
                broadcaster_for_callback.upload_event(event)
            })),
    );

    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&orchestrator),
        ws_broadcaster,
    ));

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if orchestrator.cancel().await.unwrap_or(false) {
        info!("Cancelled active upload session");
        match tokio::time::timeout(SHUTDOWN_GRACE, orchestrator.wait_for_session()).await {
            Ok(Some(summary)) => info!(
                completed = summary.completed_items,
                failed = summary.failed_items,
                "Upload session stopped"
            ),
            Ok(None) => {}
            Err(_) => warn!("Timed out waiting for in-flight transfers to abort"),
        }
    }
    orchestrator.dispose().await;
    info!("Orchestrator disposed");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
