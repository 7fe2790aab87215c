//! hookpipe server binary.

use anyhow::Context;
use clap::Parser;
use hookpipe_api::{AppState, routes};
use hookpipe_config::load_pipeline_file;
use hookpipe_core::pipeline::{PipelineConfig, SECRET_ENV_VAR};
use hookpipe_executor::{PipelineExecutor, ProcessRunner};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Webhook-triggered deployment pipeline runner.
#[derive(Debug, Parser)]
#[command(name = "hookpipe-server", version)]
struct Args {
    /// Path to the pipeline definition file.
    #[arg(long, default_value = "hookpipe.kdl")]
    config: PathBuf,

    /// Override the configured listen address.
    #[arg(long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let file = load_pipeline_file(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;

    // The secret is provisioned out-of-band, never from the config file.
    let secret = std::env::var(SECRET_ENV_VAR)
        .with_context(|| format!("{} must be set", SECRET_ENV_VAR))?;

    let config = PipelineConfig {
        pipeline_name: file.pipeline_name.clone(),
        secret: secret.into_bytes(),
    };

    let executor = PipelineExecutor::new(file.steps, Arc::new(ProcessRunner::new()));
    let state = AppState::new(config, executor);

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let addr = args.listen.unwrap_or(file.listen);

    match file.tls {
        Some(tls) => {
            info!(%addr, pipeline = %file.pipeline_name, "starting TLS server");
            let rustls = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                &tls.cert_path,
                &tls.key_path,
            )
            .await
            .context("loading TLS certificate and key")?;
            axum_server::bind_rustls(addr, rustls)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            warn!(%addr, pipeline = %file.pipeline_name, "no tls block configured, serving plain HTTP");
            let listener = TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
