use crate::config::ServerConfig;
use crate::convert::{ConvertConfig, PdfConverter, create_converter};
use crate::paperwork::PaperworkContext;
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared per-server state. Nothing here is process-global: each server
/// instance, including every router built in tests, owns its own copy.
pub struct AppState {
    config: Arc<ServerConfig>,
    context: PaperworkContext,
    /// Runtime override of `config.pdf_enabled`, set through `/api/settings`
    pdf_override: RwLock<Option<bool>>,
    converter: Arc<dyn PdfConverter>,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        let converter = create_converter(&ConvertConfig::from_server(&config));
        Self::with_converter(config, converter)
    }

    pub fn with_converter(config: Arc<ServerConfig>, converter: Arc<dyn PdfConverter>) -> Self {
        let context = PaperworkContext::from_config(&config);
        Self {
            config,
            context,
            pdf_override: RwLock::new(None),
            converter,
        }
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }

    pub fn context(&self) -> &PaperworkContext {
        &self.context
    }

    pub fn converter(&self) -> Arc<dyn PdfConverter> {
        self.converter.clone()
    }

    /// Effective PDF switch: the runtime override if one is set, else the
    /// configured default.
    pub fn pdf_enabled(&self) -> bool {
        let current = *self.pdf_override.read();
        current.unwrap_or(self.config.pdf_enabled)
    }

    pub fn set_pdf_enabled(&self, enabled: bool) {
        *self.pdf_override.write() = Some(enabled);
        tracing::info!(enabled, "pdf conversion override set");
    }

    pub fn clear_pdf_override(&self) {
        *self.pdf_override.write() = None;
        tracing::info!(
            enabled = self.config.pdf_enabled,
            "pdf conversion override cleared"
        );
    }
}
