pub mod cellmap;
pub mod config;
pub mod convert;
pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod paperwork;
pub mod server;
pub mod shutdown;
pub mod state;
pub mod utils;

pub use config::{CliArgs, ServerConfig};
pub use error::{DocumentKind, PaperworkError, PaperworkResult};
pub use logging::{LoggingConfig, init_logging, shutdown_telemetry};
pub use paperwork::{GeneratedWorkbook, PaperworkContext, generate_loadsheet, generate_timesheet};
pub use server::build_router;
pub use state::AppState;

use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;

pub async fn run_server(config: ServerConfig) -> Result<()> {
    config.ensure_directories()?;
    let config = Arc::new(config);
    let state = Arc::new(AppState::new(config.clone()));

    let context = state.context();
    if !context.loadsheet_template.is_file() {
        tracing::warn!(path = %context.loadsheet_template.display(), "loadsheet template missing");
    }
    if !context.timesheet_template.is_file() {
        tracing::warn!(path = %context.timesheet_template.display(), "timesheet template missing");
    }
    if config.pdf_enabled && !state.converter().is_available() {
        tracing::warn!(
            binary = %config.libreoffice_path.display(),
            "libreoffice not found; documents will be generated without PDFs"
        );
    }

    let router = build_router(state);

    let listener = TcpListener::bind(config.http_bind_address).await?;
    let actual_addr = listener.local_addr()?;
    tracing::info!(
        bind = %actual_addr,
        output = %config.output_dir.display(),
        templates = %config.templates_dir.display(),
        pdf_enabled = config.pdf_enabled,
        "paperwork server listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
