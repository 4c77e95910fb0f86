//! Error types for paperwork generation.
//!
//! Core failures are deliberately few: a missing template and a loadsheet
//! that carries more cars than the template has slots. Both are raised before
//! anything is written. Everything else that can go wrong is I/O or workbook
//! codec trouble while reading or saving.

use std::path::PathBuf;
use thiserror::Error;

pub type PaperworkResult<T> = Result<T, PaperworkError>;

#[derive(Debug, Error)]
pub enum PaperworkError {
    /// The configured template file is absent
    #[error("{kind} template not found: {}", path.display())]
    TemplateNotFound { kind: DocumentKind, path: PathBuf },

    /// The loadsheet has more cars than the template can hold
    #[error("Loadsheet supports up to {max} cars per template (got {count})")]
    TooManyCars { count: usize, max: usize },

    /// Request content failed validation at the boundary
    #[error("{0}")]
    InvalidRequest(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// umya-spreadsheet failed to read or write a workbook
    #[error("workbook error for {}: {message}", path.display())]
    Workbook { path: PathBuf, message: String },
}

impl PaperworkError {
    pub fn invalid(message: impl Into<String>) -> Self {
        PaperworkError::InvalidRequest(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PaperworkError::Io {
            path: path.into(),
            source,
        }
    }

    /// Category label used for logging and metrics
    pub fn category(&self) -> &'static str {
        match self {
            PaperworkError::TemplateNotFound { .. } => "not_found",
            PaperworkError::TooManyCars { .. } | PaperworkError::InvalidRequest(_) => {
                "validation_error"
            }
            PaperworkError::Io { .. } => "io_error",
            PaperworkError::Workbook { .. } => "workbook_error",
        }
    }

    /// Precondition failures are safe to retry once the input is fixed.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            PaperworkError::TemplateNotFound { .. }
                | PaperworkError::TooManyCars { .. }
                | PaperworkError::InvalidRequest(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Loadsheet,
    Timesheet,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Loadsheet => "loadsheet",
            DocumentKind::Timesheet => "timesheet",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DocumentKind::Loadsheet => "Loadsheet",
            DocumentKind::Timesheet => "Timesheet",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}
