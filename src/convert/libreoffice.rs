use super::{ConversionLock, ConvertConfig, PdfConverter};
use crate::metrics::METRICS;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::{fs, time};

pub struct LibreOfficeConverter {
    binary: PathBuf,
    timeout: Duration,
    lock: ConversionLock,
}

impl LibreOfficeConverter {
    pub fn new(config: &ConvertConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout: config.timeout,
            lock: ConversionLock::default(),
        }
    }

    async fn run(&self, workbook: &Path, out_dir: &Path) -> Result<PathBuf> {
        fs::metadata(workbook)
            .await
            .map_err(|_| anyhow!("workbook not found at {}", workbook.display()))?;

        let workbook_str = workbook
            .to_str()
            .ok_or_else(|| anyhow!("workbook path is not valid UTF-8"))?;
        let out_dir_str = out_dir
            .to_str()
            .ok_or_else(|| anyhow!("output directory is not valid UTF-8"))?;

        let _permit = self
            .lock
            .0
            .acquire()
            .await
            .map_err(|_| anyhow!("conversion lock closed"))?;

        let output = time::timeout(
            self.timeout,
            Command::new(&self.binary)
                .args([
                    "--headless",
                    "--convert-to",
                    "pdf",
                    "--outdir",
                    out_dir_str,
                    workbook_str,
                ])
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| anyhow!("libreoffice timed out after {:?}", self.timeout))
        .and_then(|res| res.map_err(|e| anyhow!("failed to spawn libreoffice: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(anyhow!(
                "libreoffice failed (exit {}): stderr={}, stdout={}",
                output.status.code().unwrap_or(-1),
                stderr.trim(),
                stdout.trim()
            ));
        }

        let pdf_path = out_dir.join(pdf_file_name(workbook)?);
        fs::metadata(&pdf_path)
            .await
            .map_err(|_| anyhow!("PDF output not created at {}", pdf_path.display()))?;
        Ok(pdf_path)
    }
}

/// LibreOffice names its output `<stem>.pdf`, keeping any dots in the stem.
fn pdf_file_name(workbook: &Path) -> Result<OsString> {
    let mut name = workbook
        .file_stem()
        .ok_or_else(|| anyhow!("workbook path has no file name"))?
        .to_os_string();
    name.push(".pdf");
    Ok(name)
}

#[async_trait]
impl PdfConverter for LibreOfficeConverter {
    async fn convert(&self, workbook: &Path, out_dir: &Path) -> Result<PathBuf> {
        let start = Instant::now();
        let result = self.run(workbook, out_dir).await;
        METRICS.record_conversion_duration(start.elapsed());

        match &result {
            Ok(pdf) => {
                METRICS.record_conversion("success");
                tracing::info!(pdf = %pdf.display(), elapsed_ms = start.elapsed().as_millis() as u64, "pdf converted");
            }
            Err(err) => {
                METRICS.record_conversion("failed");
                tracing::warn!(workbook = %workbook.display(), error = %err, "pdf conversion failed");
            }
        }
        result
    }

    fn is_available(&self) -> bool {
        if self.binary.components().count() > 1 {
            return self.binary.is_file();
        }
        std::env::var_os("PATH")
            .map(|paths| {
                std::env::split_paths(&paths).any(|dir| dir.join(&self.binary).is_file())
            })
            .unwrap_or(false)
    }
}
