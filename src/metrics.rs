/// Prometheus metrics for the paperwork service
///
/// Counts generated documents and PDF conversions and times each
/// generation. Exposed in text format on `/metrics`.
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Global metrics registry instance
pub static METRICS: Lazy<Arc<MetricsCollector>> = Lazy::new(|| Arc::new(MetricsCollector::new()));

/// Labels for document generation outcomes
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DocumentLabels {
    /// "loadsheet" or "timesheet"
    pub document: String,
    /// "success" or an error category
    pub status: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DocumentKindLabels {
    pub document: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ConversionLabels {
    /// "success", "failed", "skipped" or "disabled"
    pub status: String,
}

pub struct MetricsCollector {
    registry: RwLock<Registry>,

    /// Documents generated by type and outcome
    pub documents_generated_total: Family<DocumentLabels, Counter>,

    /// Wall time of a generation request, excluding PDF conversion
    pub generation_duration_seconds: Family<DocumentKindLabels, Histogram>,

    /// PDF conversions by outcome
    pub pdf_conversions_total: Family<ConversionLabels, Counter>,

    /// LibreOffice conversion latency
    pub pdf_conversion_duration_seconds: Histogram,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let documents_generated_total = Family::<DocumentLabels, Counter>::default();
        registry.register(
            "paperwork_documents_generated",
            "Total number of generation requests by document and status",
            documents_generated_total.clone(),
        );

        let generation_duration_seconds =
            Family::<DocumentKindLabels, Histogram>::new_with_constructor(|| {
                // Buckets: 5ms up to ~10s
                Histogram::new(exponential_buckets(0.005, 2.5, 9))
            });
        registry.register(
            "paperwork_generation_duration_seconds",
            "Template population latency in seconds",
            generation_duration_seconds.clone(),
        );

        let pdf_conversions_total = Family::<ConversionLabels, Counter>::default();
        registry.register(
            "paperwork_pdf_conversions",
            "Total number of PDF conversions by status",
            pdf_conversions_total.clone(),
        );

        // Buckets: 250ms up to ~60s
        let pdf_conversion_duration_seconds = Histogram::new(exponential_buckets(0.25, 2.0, 9));
        registry.register(
            "paperwork_pdf_conversion_duration_seconds",
            "LibreOffice conversion latency in seconds",
            pdf_conversion_duration_seconds.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            documents_generated_total,
            generation_duration_seconds,
            pdf_conversions_total,
            pdf_conversion_duration_seconds,
        }
    }

    /// Encode metrics in Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.read();
        if let Err(err) = encode(&mut buffer, &registry) {
            tracing::warn!(error = %err, "failed to encode metrics");
        }
        buffer
    }

    pub fn record_generation(&self, document: &str, status: &str, duration: Duration) {
        self.documents_generated_total
            .get_or_create(&DocumentLabels {
                document: document.to_string(),
                status: status.to_string(),
            })
            .inc();

        self.generation_duration_seconds
            .get_or_create(&DocumentKindLabels {
                document: document.to_string(),
            })
            .observe(duration.as_secs_f64());
    }

    pub fn record_conversion(&self, status: &str) {
        self.pdf_conversions_total
            .get_or_create(&ConversionLabels {
                status: status.to_string(),
            })
            .inc();
    }

    pub fn record_conversion_duration(&self, duration: Duration) {
        self.pdf_conversion_duration_seconds
            .observe(duration.as_secs_f64());
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Times one generation request and records its outcome.
///
/// A guard dropped without `success` or `error` counts as an error, so early
/// returns are never lost.
pub struct GenerationMetrics {
    document: &'static str,
    start: Instant,
    completed: bool,
}

impl GenerationMetrics {
    pub fn new(document: &'static str) -> Self {
        Self {
            document,
            start: Instant::now(),
            completed: false,
        }
    }

    pub fn success(mut self) {
        METRICS.record_generation(self.document, "success", self.start.elapsed());
        self.completed = true;
    }

    pub fn error(mut self, category: &str) {
        METRICS.record_generation(self.document, category, self.start.elapsed());
        self.completed = true;
    }
}

impl Drop for GenerationMetrics {
    fn drop(&mut self) {
        if !self.completed {
            METRICS.record_generation(self.document, "unknown", self.start.elapsed());
        }
    }
}
