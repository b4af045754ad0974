//! inferd: Synchronous model-serving HTTP daemon.
//!
//! Main entry point for the serving binary.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use inferd::adapters::FsArtifactStore;
use inferd::config::Config;
use inferd::server::HttpServer;

fn main() -> Result<()> {
    // Initialize logging.
    //
    // Default behavior is stdout; `INFERD_LOG_MODE=file` appends to
    // `INFERD_LOG_FILE` instead (for deployments where stdout is not
    // collected).
    let log_mode = std::env::var("INFERD_LOG_MODE").unwrap_or_else(|_| "stdout".to_string());

    let (writer, _guard) = if log_mode == "file" {
        let log_file =
            std::env::var("INFERD_LOG_FILE").unwrap_or_else(|_| "inferd.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting inferd (deployment={})", config.deployment.name);

    preflight(&config);

    let store = Arc::new(FsArtifactStore::new(
        config.deployment.model_path.clone(),
        config.deployment.scaler_path.clone(),
    ));

    HttpServer::new(config, store).run()?;
    Ok(())
}

/// Startup checks for deployment defects.
///
/// Artifacts still load lazily on first use; this only reports broken
/// packaging at startup severity so an operator sees it before the
/// first request does. Serving proceeds either way: every failure here
/// also surfaces as an in-page error.
fn preflight(config: &Config) {
    let deployment = &config.deployment;

    if !deployment.model_path.exists() {
        tracing::error!(
            "Model artifact missing at {}",
            deployment.model_path.display()
        );
    }
    if let Some(scaler_path) = &deployment.scaler_path {
        if !scaler_path.exists() {
            tracing::error!("Scaler artifact missing at {}", scaler_path.display());
        }
    }

    match std::fs::read_to_string(&deployment.template_path) {
        Ok(template) if !template.contains(deployment.marker) => {
            tracing::error!(
                "Template '{}' lacks its placeholder marker",
                deployment.template_path.display()
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(
                "Template '{}' unreadable: {e}",
                deployment.template_path.display()
            );
        }
    }
}
