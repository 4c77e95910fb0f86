#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use paperwork_gen::state::AppState;
use paperwork_gen::{PaperworkContext, ServerConfig};
use tempfile::{TempDir, tempdir};
use umya_spreadsheet::{self, Spreadsheet, Worksheet};

/// Smallest valid PNG: one transparent pixel.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

pub fn write_workbook_to_path<F>(path: &Path, f: F)
where
    F: FnOnce(&mut Spreadsheet),
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create dir");
    }
    let mut book = umya_spreadsheet::new_file();
    f(&mut book);
    umya_spreadsheet::writer::xlsx::write(&book, path).expect("write workbook");
}

pub fn read_workbook(path: &Path) -> Spreadsheet {
    umya_spreadsheet::reader::xlsx::read(path).expect("read workbook")
}

pub fn cell_value(sheet: &Worksheet, coordinate: &str) -> String {
    sheet
        .get_cell(coordinate)
        .map(|cell| cell.get_value().to_string())
        .unwrap_or_default()
}

/// Temporary templates/signatures/output layout mirroring a deployment.
pub struct TestWorkspace {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestWorkspace {
    /// Workspace with both templates and empty signature slots.
    pub fn new() -> Self {
        let workspace = Self::bare();
        workspace.write_loadsheet_template();
        workspace.write_timesheet_template();
        workspace
    }

    /// Directory layout only, no templates.
    pub fn bare() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        let workspace = Self {
            _tempdir: tempdir,
            root,
        };
        workspace
            .config()
            .ensure_directories()
            .expect("create directories");
        workspace
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.path("templates")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path("output")
    }

    pub fn config(&self) -> ServerConfig {
        ServerConfig {
            templates_dir: self.templates_dir(),
            signatures_dir: self.path("signatures"),
            output_dir: self.output_dir(),
            pdf_enabled: false,
            libreoffice_path: PathBuf::from("/nonexistent/bin/libreoffice"),
            ..ServerConfig::default()
        }
    }

    pub fn context(&self) -> PaperworkContext {
        PaperworkContext::from_config(&self.config())
    }

    pub fn app_state(&self) -> Arc<AppState> {
        Arc::new(AppState::new(Arc::new(self.config())))
    }

    pub fn add_signature(&self, slot: &str, name: &str) -> PathBuf {
        let path = self.path("signatures").join(slot).join(name);
        std::fs::write(&path, TINY_PNG).expect("write signature");
        path
    }

    /// Loadsheet template with label text in the header and placeholders in
    /// every car slot, so blanking can be observed.
    pub fn write_loadsheet_template(&self) -> PathBuf {
        let path = self.templates_dir().join("loadsheet.xlsx");
        write_workbook_to_path(&path, |book| {
            let sheet = book.get_sheet_mut(&0).unwrap();
            sheet.get_cell_mut("A1").set_value("VEHICLE LOADSHEET");
            sheet.get_cell_mut("B6").set_value("DATE");
            sheet.get_cell_mut("F6").set_value("LOAD NO");
            for row in (10..=38).step_by(4) {
                sheet.get_cell_mut(format!("B{}", row + 1).as_str()).set_value("make/model");
                sheet.get_cell_mut(format!("B{}", row + 3).as_str()).set_value("reg");
                sheet.get_cell_mut(format!("E{row}").as_str()).set_value("-");
                sheet.get_cell_mut(format!("G{row}").as_str()).set_value("-");
                sheet.get_cell_mut(format!("I{row}").as_str()).set_value("-");
            }
        });
        path
    }

    /// Timesheet template whose driver cell sits inside a merged region
    /// anchored at J3.
    pub fn write_timesheet_template(&self) -> PathBuf {
        let path = self.templates_dir().join("timesheet.xlsx");
        write_workbook_to_path(&path, |book| {
            let sheet = book.get_sheet_mut(&0).unwrap();
            sheet.get_cell_mut("A1").set_value("DRIVER TIMESHEET");
            sheet.get_cell_mut("I3").set_value("DRIVER");
            sheet.add_merge_cells("J3:M3");
        });
        path
    }
}
