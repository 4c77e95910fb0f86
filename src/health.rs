//! Liveness and readiness probes.
//!
//! `/api/health` answers as long as the process is up. `/ready` and
//! `/api/health/components` inspect what a generation request depends on:
//! the templates, a writable output directory, the signature slots and, while
//! PDF output is on, the LibreOffice binary.

use crate::paperwork::signature::list_signatures;
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Generation still works, with something missing (unsigned documents, no PDFs)
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// The worse of the two.
    pub fn combine(self, other: Self) -> Self {
        use HealthStatus::*;
        match (self, other) {
            (Unhealthy, _) | (_, Unhealthy) => Unhealthy,
            (Degraded, _) | (_, Degraded) => Degraded,
            _ => Healthy,
        }
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub component: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ComponentHealth {
    fn new(component: &str, status: HealthStatus, error: Option<String>) -> Self {
        Self {
            component: component.to_string(),
            status,
            error,
            timestamp: now(),
            details: None,
        }
    }

    pub fn healthy(component: &str) -> Self {
        Self::new(component, HealthStatus::Healthy, None)
    }

    pub fn degraded(component: &str, error: impl Into<String>) -> Self {
        Self::new(component, HealthStatus::Degraded, Some(error.into()))
    }

    pub fn unhealthy(component: &str, error: impl Into<String>) -> Self {
        Self::new(component, HealthStatus::Unhealthy, Some(error.into()))
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub status: HealthStatus,
    pub timestamp: String,
    /// Names of unhealthy components, sorted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub not_ready: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthResponse {
    pub status: HealthStatus,
    pub timestamp: String,
    pub components: HashMap<String, ComponentHealth>,
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        (self.status.status_code(), Json(self)).into_response()
    }
}

impl IntoResponse for ReadinessResponse {
    fn into_response(self) -> Response {
        let code = if self.ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (code, Json(self)).into_response()
    }
}

impl IntoResponse for ComponentHealthResponse {
    fn into_response(self) -> Response {
        (self.status.status_code(), Json(self)).into_response()
    }
}

const WRITE_PROBE: &str = ".paperwork-ready";

#[derive(Clone)]
pub struct HealthChecker {
    state: Arc<AppState>,
}

impl HealthChecker {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub fn liveness(&self) -> HealthResponse {
        HealthResponse {
            status: HealthStatus::Healthy,
            timestamp: now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn readiness(&self) -> ReadinessResponse {
        let components = self.check_all();
        let status = overall(&components);
        let mut not_ready: Vec<String> = components
            .iter()
            .filter(|(_, health)| health.status == HealthStatus::Unhealthy)
            .map(|(name, _)| name.clone())
            .collect();
        not_ready.sort();

        ReadinessResponse {
            ready: status != HealthStatus::Unhealthy,
            status,
            timestamp: now(),
            not_ready,
        }
    }

    pub fn components(&self) -> ComponentHealthResponse {
        let components = self.check_all();
        ComponentHealthResponse {
            status: overall(&components),
            timestamp: now(),
            components,
        }
    }

    fn check_all(&self) -> HashMap<String, ComponentHealth> {
        let mut checks = vec![
            self.check_templates(),
            self.check_output_directory(),
            self.check_signatures(),
        ];
        if self.state.pdf_enabled() {
            checks.push(self.check_libreoffice());
        }
        checks
            .into_iter()
            .map(|health| (health.component.clone(), health))
            .collect()
    }

    fn check_templates(&self) -> ComponentHealth {
        let ctx = self.state.context();
        let loadsheet = ctx.loadsheet_template.is_file();
        let timesheet = ctx.timesheet_template.is_file();
        let details = json!({
            "loadsheet": ctx.loadsheet_template.display().to_string(),
            "loadsheet_present": loadsheet,
            "timesheet": ctx.timesheet_template.display().to_string(),
            "timesheet_present": timesheet,
        });

        let health = match (loadsheet, timesheet) {
            (true, true) => ComponentHealth::healthy("templates"),
            (false, false) => ComponentHealth::unhealthy("templates", "no templates found"),
            _ => ComponentHealth::degraded("templates", "one template is missing"),
        };
        health.with_details(details)
    }

    fn check_output_directory(&self) -> ComponentHealth {
        let output = &self.state.context().output_dir;
        if !output.is_dir() {
            return ComponentHealth::unhealthy(
                "output",
                format!("output directory does not exist: {}", output.display()),
            );
        }

        let probe = output.join(WRITE_PROBE);
        match fs::write(&probe, b"ok") {
            Ok(()) => {
                let _ = fs::remove_file(&probe);
                ComponentHealth::healthy("output")
                    .with_details(json!({ "path": output.display().to_string() }))
            }
            Err(err) => ComponentHealth::unhealthy(
                "output",
                format!("output directory is not writable: {} ({err})", output.display()),
            ),
        }
    }

    fn check_signatures(&self) -> ComponentHealth {
        let ctx = self.state.context();
        let sig1 = list_signatures(&ctx.sig1_dir).len();
        let sig2 = list_signatures(&ctx.sig2_dir).len();

        let health = if sig1 == 0 || sig2 == 0 {
            ComponentHealth::degraded("signatures", "a signature slot has no images")
        } else {
            ComponentHealth::healthy("signatures")
        };
        health.with_details(json!({ "sig1_images": sig1, "sig2_images": sig2 }))
    }

    fn check_libreoffice(&self) -> ComponentHealth {
        let binary = self.state.config().libreoffice_path.display().to_string();
        let available = self.state.converter().is_available();

        let health = if available {
            ComponentHealth::healthy("libreoffice")
        } else {
            ComponentHealth::degraded("libreoffice", "libreoffice binary not found; PDFs will be skipped")
        };
        health.with_details(json!({ "binary": binary, "available": available }))
    }
}

fn overall(components: &HashMap<String, ComponentHealth>) -> HealthStatus {
    components
        .values()
        .fold(HealthStatus::Healthy, |acc, health| acc.combine(health.status))
}

pub async fn liveness_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    checker.liveness()
}

pub async fn readiness_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    checker.readiness()
}

pub async fn components_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    checker.components()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::path::Path;

    fn checker_for(dir: &Path, pdf_enabled: bool) -> HealthChecker {
        let config = ServerConfig {
            templates_dir: dir.join("templates"),
            signatures_dir: dir.join("signatures"),
            output_dir: dir.join("output"),
            pdf_enabled,
            libreoffice_path: "/nonexistent/bin/libreoffice".into(),
            ..ServerConfig::default()
        };
        config.ensure_directories().unwrap();
        HealthChecker::new(Arc::new(AppState::new(Arc::new(config))))
    }

    #[test]
    fn combine_keeps_the_worst() {
        use HealthStatus::*;
        assert_eq!(Healthy.combine(Healthy), Healthy);
        assert_eq!(Healthy.combine(Degraded), Degraded);
        assert_eq!(Unhealthy.combine(Degraded), Unhealthy);
        assert_eq!(Degraded.status_code(), StatusCode::OK);
        assert_eq!(Unhealthy.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn missing_templates_are_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let readiness = checker_for(dir.path(), false).readiness();
        assert!(!readiness.ready);
        assert_eq!(readiness.not_ready, vec!["templates".to_string()]);
    }

    #[test]
    fn one_template_is_degraded_but_ready() {
        let dir = tempfile::tempdir().unwrap();
        let checker = checker_for(dir.path(), false);
        fs::write(dir.path().join("templates/loadsheet.xlsx"), b"x").unwrap();

        let readiness = checker.readiness();
        assert!(readiness.ready);
        assert_eq!(readiness.status, HealthStatus::Degraded);
    }

    #[test]
    fn libreoffice_checked_only_when_pdf_enabled() {
        let dir = tempfile::tempdir().unwrap();

        let disabled = checker_for(dir.path(), false).components();
        assert!(!disabled.components.contains_key("libreoffice"));

        let enabled = checker_for(dir.path(), true).components();
        assert_eq!(
            enabled.components["libreoffice"].status,
            HealthStatus::Degraded
        );
    }

    #[test]
    fn liveness_reports_version() {
        let dir = tempfile::tempdir().unwrap();
        let live = checker_for(dir.path(), false).liveness();
        assert_eq!(live.status, HealthStatus::Healthy);
        assert_eq!(live.version, env!("CARGO_PKG_VERSION"));
    }
}
