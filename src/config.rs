use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::net::{Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_HTTP_PORT: u16 = 8000;
const DEFAULT_LIBREOFFICE_BINARY: &str = "libreoffice";
const DEFAULT_LIBREOFFICE_TIMEOUT_SECS: u64 = 60;
const LOADSHEET_TEMPLATE: &str = "loadsheet.xlsx";
const TIMESHEET_TEMPLATE: &str = "timesheet.xlsx";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub templates_dir: PathBuf,
    pub signatures_dir: PathBuf,
    pub output_dir: PathBuf,
    pub http_bind_address: SocketAddr,
    /// Startup default; the running server may override it per instance.
    pub pdf_enabled: bool,
    pub libreoffice_path: PathBuf,
    pub libreoffice_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            signatures_dir: PathBuf::from("signatures"),
            output_dir: PathBuf::from("output"),
            http_bind_address: SocketAddr::from((Ipv6Addr::UNSPECIFIED, DEFAULT_HTTP_PORT)),
            pdf_enabled: true,
            libreoffice_path: PathBuf::from(DEFAULT_LIBREOFFICE_BINARY),
            libreoffice_timeout_secs: DEFAULT_LIBREOFFICE_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            templates_dir: cli_templates_dir,
            signatures_dir: cli_signatures_dir,
            output_dir: cli_output_dir,
            http_bind: cli_http_bind,
            disable_pdf: cli_disable_pdf,
            libreoffice_path: cli_libreoffice_path,
            libreoffice_timeout_secs: cli_libreoffice_timeout,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            templates_dir: file_templates_dir,
            signatures_dir: file_signatures_dir,
            output_dir: file_output_dir,
            http_bind: file_http_bind,
            disable_pdf: file_disable_pdf,
            libreoffice_path: file_libreoffice_path,
            libreoffice_timeout_secs: file_libreoffice_timeout,
        } = file_config;

        let defaults = Self::default();

        let disable_pdf = cli_disable_pdf.or(file_disable_pdf).unwrap_or(false);

        Ok(Self {
            templates_dir: expand_home(
                cli_templates_dir
                    .or(file_templates_dir)
                    .unwrap_or(defaults.templates_dir),
            ),
            signatures_dir: expand_home(
                cli_signatures_dir
                    .or(file_signatures_dir)
                    .unwrap_or(defaults.signatures_dir),
            ),
            output_dir: expand_home(
                cli_output_dir
                    .or(file_output_dir)
                    .unwrap_or(defaults.output_dir),
            ),
            http_bind_address: cli_http_bind
                .or(file_http_bind)
                .unwrap_or(defaults.http_bind_address),
            pdf_enabled: !disable_pdf,
            libreoffice_path: cli_libreoffice_path
                .or(file_libreoffice_path)
                .unwrap_or(defaults.libreoffice_path),
            libreoffice_timeout_secs: cli_libreoffice_timeout
                .or(file_libreoffice_timeout)
                .unwrap_or(defaults.libreoffice_timeout_secs),
        })
    }

    /// Fail-fast checks run before the listener is bound.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.libreoffice_timeout_secs > 0,
            "libreoffice timeout must be greater than zero"
        );
        anyhow::ensure!(
            !self.libreoffice_path.as_os_str().is_empty(),
            "libreoffice path must not be empty"
        );
        Ok(())
    }

    pub fn sig1_dir(&self) -> PathBuf {
        self.signatures_dir.join("sig1")
    }

    pub fn sig2_dir(&self) -> PathBuf {
        self.signatures_dir.join("sig2")
    }

    pub fn loadsheet_template(&self) -> PathBuf {
        self.templates_dir.join(LOADSHEET_TEMPLATE)
    }

    pub fn timesheet_template(&self) -> PathBuf {
        self.templates_dir.join(TIMESHEET_TEMPLATE)
    }

    pub fn libreoffice_timeout(&self) -> Duration {
        Duration::from_secs(self.libreoffice_timeout_secs)
    }

    /// Creates the directory layout the service expects. Permission problems
    /// are reported but do not stop startup, so a read-only volume still
    /// serves whatever it can.
    pub fn ensure_directories(&self) -> Result<()> {
        let dirs = [
            self.templates_dir.clone(),
            self.signatures_dir.clone(),
            self.sig1_dir(),
            self.sig2_dir(),
            self.output_dir.clone(),
        ];
        for dir in dirs.iter() {
            match fs::create_dir_all(dir) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::PermissionDenied => {
                    tracing::warn!(
                        path = %dir.display(),
                        "could not create application directory due to a permission error; \
                         ensure the service user has write access to the volume"
                    );
                    return Ok(());
                }
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("failed to create directory {:?}", dir));
                }
            }
        }
        tracing::info!("application directories ready");
        Ok(())
    }
}

fn expand_home(path: PathBuf) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path;
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path,
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "paperwork-gen",
    about = "Paperwork generation API for loadsheets and timesheets",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "PAPERWORK_TEMPLATES_DIR",
        value_name = "DIR",
        help = "Directory holding loadsheet.xlsx and timesheet.xlsx"
    )]
    pub templates_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "PAPERWORK_SIGNATURES_DIR",
        value_name = "DIR",
        help = "Directory holding sig1/ and sig2/ signature images"
    )]
    pub signatures_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "PAPERWORK_OUTPUT_DIR",
        value_name = "DIR",
        help = "Directory where week folders are written"
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "PAPERWORK_HTTP_BIND",
        value_name = "ADDR",
        help = "HTTP bind address"
    )]
    pub http_bind: Option<SocketAddr>,

    #[arg(
        long,
        env = "PAPERWORK_DISABLE_PDF",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        help = "Skip LibreOffice PDF conversion"
    )]
    pub disable_pdf: Option<bool>,

    #[arg(
        long,
        env = "PAPERWORK_LIBREOFFICE",
        value_name = "PATH",
        help = "LibreOffice executable used for PDF conversion"
    )]
    pub libreoffice_path: Option<PathBuf>,

    #[arg(
        long,
        env = "PAPERWORK_LIBREOFFICE_TIMEOUT",
        value_name = "SECS",
        help = "Timeout for a single PDF conversion",
        value_parser = clap::value_parser!(u64)
    )]
    pub libreoffice_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    templates_dir: Option<PathBuf>,
    signatures_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    http_bind: Option<SocketAddr>,
    disable_pdf: Option<bool>,
    libreoffice_path: Option<PathBuf>,
    libreoffice_timeout_secs: Option<u64>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
