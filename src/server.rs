//! HTTP surface of the paperwork service.

use crate::error::{DocumentKind, PaperworkError, PaperworkResult};
use crate::health::{self, HealthChecker};
use crate::logging::generation_span;
use crate::metrics::{GenerationMetrics, METRICS};
use crate::model::{
    GenerateResponse, LoadsheetRequest, SettingsResponse, SettingsUpdate, SignatureListResponse,
    TimesheetRequest,
};
use crate::paperwork::signature::list_signatures;
use crate::paperwork::{GeneratedWorkbook, PaperworkContext, generate_loadsheet, generate_timesheet};
use crate::state::AppState;
use crate::utils::path_to_forward_slashes;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task;

/// Error returned by every API handler, rendered as
/// `{"error": <message>, "status_code": <code>}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Maps a generation failure. Server-side failures are logged in full and
    /// reported with a generic message.
    pub fn generation(kind: DocumentKind, err: PaperworkError) -> Self {
        let status = match &err {
            PaperworkError::TemplateNotFound { .. } => StatusCode::NOT_FOUND,
            PaperworkError::TooManyCars { .. } => StatusCode::BAD_REQUEST,
            PaperworkError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PaperworkError::Io { .. } | PaperworkError::Workbook { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(document = kind.as_str(), error = %err, "generation failed");
            Self::new(
                status,
                format!("Internal server error during {} generation", kind.as_str()),
            )
        } else {
            tracing::warn!(document = kind.as_str(), error = %err, "generation rejected");
            Self::new(status, err.to_string())
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!(error = %rejection.body_text(), "rejected request body");
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.message,
            "status_code": self.status.as_u16(),
        });
        (self.status, Json(body)).into_response()
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let health_checker = Arc::new(HealthChecker::new(state.clone()));

    let health_routes = Router::new()
        .route("/api/health", get(health::liveness_handler))
        .route("/ready", get(health::readiness_handler))
        .route("/api/health/components", get(health::components_handler))
        .with_state(health_checker);

    Router::new()
        .route("/", get(root))
        .route("/api/loadsheet/generate", post(loadsheet_handler))
        .route("/api/timesheet/generate", post(timesheet_handler))
        .route("/api/signatures", get(signatures_handler))
        .route("/api/settings", get(get_settings).post(update_settings))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .merge(health_routes)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Paperwork Generation API",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/api/health",
        "ready": "/ready",
        "metrics": "/metrics",
    }))
}

async fn metrics_handler() -> (StatusCode, String) {
    (StatusCode::OK, METRICS.encode())
}

async fn loadsheet_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoadsheetRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(request) = payload?;
    let kind = DocumentKind::Loadsheet;
    let metrics = GenerationMetrics::new(kind.as_str());

    let (document, include_pdf) = match request.into_document() {
        Ok(parsed) => parsed,
        Err(err) => {
            metrics.error(err.category());
            return Err(ApiError::generation(kind, err));
        }
    };

    let generated = run_generation(&state, kind, metrics, move |ctx| {
        generate_loadsheet(ctx, &document)
    })
    .await?;
    Ok(Json(respond(&state, kind, generated, include_pdf).await))
}

async fn timesheet_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TimesheetRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(request) = payload?;
    let kind = DocumentKind::Timesheet;
    let metrics = GenerationMetrics::new(kind.as_str());

    let (document, include_pdf) = match request.into_document() {
        Ok(parsed) => parsed,
        Err(err) => {
            metrics.error(err.category());
            return Err(ApiError::generation(kind, err));
        }
    };

    let generated = run_generation(&state, kind, metrics, move |ctx| {
        generate_timesheet(ctx, &document)
    })
    .await?;
    Ok(Json(respond(&state, kind, generated, include_pdf).await))
}

/// Runs a populator on the blocking pool and records its outcome.
async fn run_generation<F>(
    state: &AppState,
    kind: DocumentKind,
    metrics: GenerationMetrics,
    populate: F,
) -> Result<GeneratedWorkbook, ApiError>
where
    F: FnOnce(&PaperworkContext) -> PaperworkResult<GeneratedWorkbook> + Send + 'static,
{
    let ctx = state.context().clone();
    let span = generation_span(kind.as_str());

    let joined = task::spawn_blocking(move || {
        let _entered = span.enter();
        populate(&ctx)
    })
    .await;

    match joined {
        Ok(Ok(generated)) => {
            metrics.success();
            Ok(generated)
        }
        Ok(Err(err)) => {
            metrics.error(err.category());
            Err(ApiError::generation(kind, err))
        }
        Err(join_err) => {
            metrics.error("panic");
            tracing::error!(document = kind.as_str(), error = %join_err, "generation task failed");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error during {} generation", kind.as_str()),
            ))
        }
    }
}

/// Converts to PDF when allowed and builds the response message.
async fn respond(
    state: &AppState,
    kind: DocumentKind,
    generated: GeneratedWorkbook,
    include_pdf: bool,
) -> GenerateResponse {
    let pdf_path: Option<PathBuf> = if !include_pdf {
        METRICS.record_conversion("skipped");
        None
    } else if !state.pdf_enabled() {
        METRICS.record_conversion("disabled");
        None
    } else {
        state
            .converter()
            .convert(&generated.excel_path, &generated.folder)
            .await
            .ok()
    };

    let message = match (&pdf_path, include_pdf) {
        (Some(_), _) => format!("{} generated successfully", kind.title()),
        (None, false) => format!(
            "{} generated (Excel only - PDF conversion skipped per request)",
            kind.title()
        ),
        (None, true) => format!(
            "{} generated (Excel only - PDF conversion failed or disabled)",
            kind.title()
        ),
    };

    GenerateResponse {
        excel_path: path_to_forward_slashes(&generated.excel_path),
        pdf_path: pdf_path.as_deref().map(path_to_forward_slashes),
        message,
        week_folder: generated.week_folder,
    }
}

async fn signatures_handler(State(state): State<Arc<AppState>>) -> Json<SignatureListResponse> {
    let ctx = state.context();
    Json(SignatureListResponse {
        sig1_images: list_signatures(&ctx.sig1_dir),
        sig2_images: list_signatures(&ctx.sig2_dir),
    })
}

fn settings_snapshot(state: &AppState) -> SettingsResponse {
    let config = state.config();
    SettingsResponse {
        host: config.http_bind_address.ip().to_string(),
        port: config.http_bind_address.port(),
        output_dir: path_to_forward_slashes(&config.output_dir),
        templates_dir: path_to_forward_slashes(&config.templates_dir),
        signatures_dir: path_to_forward_slashes(&config.signatures_dir),
        pdf_enabled: state.pdf_enabled(),
    }
}

async fn get_settings(State(state): State<Arc<AppState>>) -> Json<SettingsResponse> {
    Json(settings_snapshot(&state))
}

async fn update_settings(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SettingsUpdate>, JsonRejection>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let Json(update) = payload?;

    if update.reset_pdf_override {
        state.clear_pdf_override();
    } else if let Some(enabled) = update.pdf_enabled {
        state.set_pdf_enabled(enabled);
    } else {
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "expected pdf_enabled or reset_pdf_override",
        ));
    }

    Ok(Json(settings_snapshot(&state)))
}
