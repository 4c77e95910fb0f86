//! Optional XLSX to PDF conversion through a headless LibreOffice.

mod libreoffice;

pub use libreoffice::LibreOfficeConverter;

use crate::config::ServerConfig;
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Serialises LibreOffice invocations. Concurrent headless instances sharing
/// one user profile fail with lock errors.
#[derive(Clone)]
pub struct ConversionLock(pub Arc<Semaphore>);

impl ConversionLock {
    pub fn new(permits: usize) -> Self {
        Self(Arc::new(Semaphore::new(permits)))
    }
}

impl Default for ConversionLock {
    fn default() -> Self {
        Self::new(1)
    }
}

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub binary: PathBuf,
    pub timeout: Duration,
}

impl ConvertConfig {
    pub fn from_server(config: &ServerConfig) -> Self {
        Self {
            binary: config.libreoffice_path.clone(),
            timeout: config.libreoffice_timeout(),
        }
    }
}

#[async_trait]
pub trait PdfConverter: Send + Sync {
    /// Converts `workbook` into `<out_dir>/<stem>.pdf` and returns that path.
    async fn convert(&self, workbook: &Path, out_dir: &Path) -> Result<PathBuf>;

    fn is_available(&self) -> bool;
}

pub fn create_converter(config: &ConvertConfig) -> Arc<dyn PdfConverter> {
    Arc::new(LibreOfficeConverter::new(config))
}
