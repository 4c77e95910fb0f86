//! Structured logging setup.
//!
//! Pretty output during development and JSON in production, written to
//! stdout, stderr or a daily-rotated file. Spans are also exported over OTLP
//! when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.

use anyhow::{Context, Result};
use opentelemetry::{
    KeyValue,
    trace::{TraceError, TracerProvider as _},
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
};
use std::env;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const SERVICE_NAME: &str = "paperwork-gen";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Daily-rotated file under `log_dir`
    File,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub output: LogOutput,
    pub log_dir: PathBuf,
    pub environment: String,
    pub otlp_endpoint: Option<String>,
    /// Fraction of root traces exported, 0.0 to 1.0
    pub otel_sampling_rate: f64,
    pub otlp_timeout: Duration,
}

fn is_production(environment: &str) -> bool {
    matches!(environment, "production" | "prod")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("ENV"))
            .unwrap_or_else(|_| "development".to_string());
        let production = is_production(&environment);

        Self {
            format: if production {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            output: LogOutput::Stderr,
            log_dir: PathBuf::from("logs"),
            environment,
            otlp_endpoint: None,
            otel_sampling_rate: if production { 0.1 } else { 1.0 },
            otlp_timeout: Duration::from_secs(10),
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        match env_lower("LOG_FORMAT").as_deref() {
            Some("json") => config.format = LogFormat::Json,
            Some("pretty") => config.format = LogFormat::Pretty,
            _ => {}
        }
        match env_lower("LOG_OUTPUT").as_deref() {
            Some("stdout") => config.output = LogOutput::Stdout,
            Some("stderr") => config.output = LogOutput::Stderr,
            Some("file") => config.output = LogOutput::File,
            _ => {}
        }
        if let Ok(dir) = env::var("LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }

        config.otlp_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty());
        if let Some(rate) = env_parse::<f64>("OTEL_SAMPLING_RATE") {
            config.otel_sampling_rate = rate.clamp(0.0, 1.0);
        }
        if let Some(secs) = env_parse::<u64>("OTEL_EXPORTER_OTLP_TIMEOUT") {
            config.otlp_timeout = Duration::from_secs(secs);
        }

        config
    }

    pub fn otel_enabled(&self) -> bool {
        self.otlp_endpoint.is_some()
    }

    fn sampler(&self) -> Sampler {
        match self.otel_sampling_rate {
            rate if rate >= 1.0 => Sampler::AlwaysOn,
            rate if rate <= 0.0 => Sampler::AlwaysOff,
            rate => Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(rate))),
        }
    }
}

fn env_lower(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_ascii_lowercase())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

/// Installs the global subscriber. Keep the returned guard alive for the
/// life of the process; dropping it flushes and stops the log writer.
pub fn init_logging(config: LoggingConfig) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if is_production(&config.environment) {
            "info"
        } else {
            "debug"
        };
        EnvFilter::new(format!("{level},hyper=info,umya_spreadsheet=warn"))
    });

    let (writer, guard) = match config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
        LogOutput::File => {
            std::fs::create_dir_all(&config.log_dir).with_context(|| {
                format!("failed to create log directory {}", config.log_dir.display())
            })?;
            tracing_appender::non_blocking(tracing_appender::rolling::daily(
                &config.log_dir,
                SERVICE_NAME,
            ))
        }
    };

    let fmt_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_ansi(config.output != LogOutput::File)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
    };

    let otel_layer = match config.otel_enabled().then(|| init_tracer_provider(&config)) {
        Some(Ok(provider)) => {
            Some(tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME)))
        }
        Some(Err(err)) => {
            eprintln!("OpenTelemetry exporter unavailable, continuing without it: {err}");
            None
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .with(otel_layer)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        format = ?config.format,
        output = ?config.output,
        otel = config.otel_enabled(),
        "logging initialized"
    );

    Ok(guard)
}

fn init_tracer_provider(config: &LoggingConfig) -> Result<TracerProvider, TraceError> {
    let endpoint = config
        .otlp_endpoint
        .as_deref()
        .ok_or_else(|| TraceError::Other("no OTLP endpoint configured".into()))?;

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .with_timeout(config.otlp_timeout);

    let resource = Resource::new(vec![
        KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_NAME,
            SERVICE_NAME,
        ),
        KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
            env!("CARGO_PKG_VERSION"),
        ),
        KeyValue::new("environment", config.environment.clone()),
    ]);

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(config.sampler())
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)
}

pub fn shutdown_telemetry() {
    tracing::info!("shutting down telemetry");
    opentelemetry::global::shutdown_tracer_provider();
}

/// Span wrapping one document generation request.
pub fn generation_span(document: &'static str) -> tracing::Span {
    tracing::info_span!("generate", document, service = SERVICE_NAME)
}
