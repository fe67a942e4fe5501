use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use diarypress_core::{
    load_config_or_default, validate_config, BasicHtmlAssembler, CleanupManager, CommandRenderer,
    ContentAssembler, GenerationPipeline, HttpFetcher, MediaFetcher, MediaProcessor,
    ProgressChannel,
};
use diarypress_server::{create_router, AppState};

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
    let config_path = std::env::var("DIARYPRESS_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Output directory: {:?}", config.storage.output_dir);
    info!("Temp directory: {:?}", config.storage.temp_dir);

    for dir in [&config.storage.output_dir, &config.storage.temp_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {:?}", dir))?;
    }

    let channel = ProgressChannel::new(config.progress.clone());

    // Media resolution
    let fetcher: Arc<dyn MediaFetcher> =
        Arc::new(HttpFetcher::new(&config.media).context("Failed to create HTTP fetcher")?);
    let media = Arc::new(MediaProcessor::new(
        config.media.clone(),
        fetcher,
        config.storage.temp_dir.join("media"),
    ));

    // Generation pipeline
    let assembler: Arc<dyn ContentAssembler> = Arc::new(BasicHtmlAssembler::new());
    let mut pipeline = GenerationPipeline::new(
        config.storage.clone(),
        config.orchestrator.clone(),
        channel,
        media,
        assembler,
    );
    match CommandRenderer::from_config(&config.renderer) {
        Some(renderer) => {
            info!("Using external renderer for PDF output");
            pipeline = pipeline.with_renderer(Arc::new(renderer));
        }
        None => info!("No renderer command configured, PDF output disabled"),
    }
    info!("Supported output formats: {:?}", pipeline.supported_formats());

    // Artifact cleanup
    let cleanup = CleanupManager::new(config.resolved_cleanup());
    cleanup.start();

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), pipeline, cleanup.clone()));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    cleanup.stop();
    info!("Cleanup scheduler stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
