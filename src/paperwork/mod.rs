//! Template population for loadsheets and timesheets.
//!
//! Each generation call is one synchronous unit of work: check
//! preconditions, open the template, write mapped cells in memory, then save
//! under a fresh path inside the week folder. Templates are never modified in
//! place.

mod loadsheet;
mod sheet;
pub mod signature;
mod timesheet;

pub use loadsheet::{fill_loadsheet, generate_loadsheet, load_summary, notes_block};
pub use timesheet::{calculate_total_hours, fill_timesheet, generate_timesheet};

use crate::config::ServerConfig;
use std::path::PathBuf;

/// Everything a populator needs, passed explicitly per call.
#[derive(Debug, Clone)]
pub struct PaperworkContext {
    pub loadsheet_template: PathBuf,
    pub timesheet_template: PathBuf,
    pub output_dir: PathBuf,
    pub signatures_dir: PathBuf,
    pub sig1_dir: PathBuf,
    pub sig2_dir: PathBuf,
}

impl PaperworkContext {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            loadsheet_template: config.loadsheet_template(),
            timesheet_template: config.timesheet_template(),
            output_dir: config.output_dir.clone(),
            signatures_dir: config.signatures_dir.clone(),
            sig1_dir: config.sig1_dir(),
            sig2_dir: config.sig2_dir(),
        }
    }
}

/// Result of a successful population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedWorkbook {
    pub excel_path: PathBuf,
    /// Week folder on disk, e.g. `<output>/18-05-25`
    pub folder: PathBuf,
    /// Folder name alone, e.g. `18-05-25`
    pub week_folder: String,
}
