use crate::error::{DocumentKind, PaperworkError, PaperworkResult};
use crate::utils::format_folder_date;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use umya_spreadsheet::helper::coordinate::{coordinate_from_index, index_from_coordinate};
use umya_spreadsheet::structs::Image;
use umya_spreadsheet::structs::drawing::spreadsheet::MarkerType;
use umya_spreadsheet::{Spreadsheet, Worksheet};

pub(crate) fn ensure_template(kind: DocumentKind, path: &Path) -> PaperworkResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PaperworkError::TemplateNotFound {
            kind,
            path: path.to_path_buf(),
        })
    }
}

pub(crate) fn open_template(path: &Path) -> PaperworkResult<Spreadsheet> {
    umya_spreadsheet::reader::xlsx::read(path).map_err(|e| PaperworkError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// The sheet the template is authored on.
pub(crate) fn primary_sheet<'a>(
    book: &'a mut Spreadsheet,
    path: &Path,
) -> PaperworkResult<&'a mut Worksheet> {
    book.get_sheet_mut(&0).ok_or_else(|| PaperworkError::Workbook {
        path: path.to_path_buf(),
        message: "template has no worksheets".to_string(),
    })
}

pub(crate) fn save_workbook(book: &Spreadsheet, path: &Path) -> PaperworkResult<()> {
    umya_spreadsheet::writer::xlsx::write(book, path).map_err(|e| PaperworkError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub(crate) struct WeekFolder {
    pub path: PathBuf,
    pub name: String,
}

pub(crate) fn ensure_week_folder(output_dir: &Path, week_end: NaiveDate) -> PaperworkResult<WeekFolder> {
    let name = format_folder_date(week_end);
    let path = output_dir.join(&name);
    fs::create_dir_all(&path).map_err(|e| PaperworkError::io(&path, e))?;
    Ok(WeekFolder { path, name })
}

pub(crate) fn write_text(sheet: &mut Worksheet, coordinate: &str, value: impl Into<String>) {
    sheet.get_cell_mut(coordinate).set_value(value.into());
}

/// Top-left cell of the merged region containing `coordinate`, or the
/// coordinate itself when it is not merged. Values written to any other cell
/// of a merged region are dropped by spreadsheet applications.
pub(crate) fn merged_anchor(sheet: &Worksheet, coordinate: &str) -> String {
    let (Some(col), Some(row), _, _) = index_from_coordinate(coordinate) else {
        return coordinate.to_string();
    };

    for merged in sheet.get_merge_cells() {
        let range = merged.get_range();
        let Some((start, end)) = range.split_once(':') else {
            continue;
        };
        let (Some(c1), Some(r1), _, _) = index_from_coordinate(start) else {
            continue;
        };
        let (Some(c2), Some(r2), _, _) = index_from_coordinate(end) else {
            continue;
        };
        let (min_col, max_col) = (c1.min(c2), c1.max(c2));
        let (min_row, max_row) = (r1.min(r2), r1.max(r2));
        if (min_col..=max_col).contains(&col) && (min_row..=max_row).contains(&row) {
            return coordinate_from_index(&min_col, &min_row);
        }
    }

    coordinate.to_string()
}

/// Anchors an image at `coordinate`. Failures are logged and swallowed.
pub(crate) fn embed_image(sheet: &mut Worksheet, image_path: &Path, coordinate: &str) {
    if let Err(err) = fs::metadata(image_path).and_then(|meta| {
        if meta.is_file() {
            Ok(())
        } else {
            Err(std::io::Error::other("not a regular file"))
        }
    }) {
        tracing::warn!(path = %image_path.display(), error = %err, "unable to embed signature");
        return;
    }

    let Some(path_str) = image_path.to_str() else {
        tracing::warn!(path = %image_path.display(), "signature path is not valid UTF-8");
        return;
    };

    let mut marker = MarkerType::default();
    marker.set_coordinate(coordinate);

    // umya panics on unreadable image data instead of returning an error.
    let loaded = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut image = Image::default();
        image.new_image(path_str, marker);
        image
    }));

    match loaded {
        Ok(image) => {
            sheet.add_image(image);
            tracing::debug!(path = %image_path.display(), cell = coordinate, "embedded signature");
        }
        Err(_) => {
            tracing::warn!(path = %image_path.display(), "unable to decode signature image");
        }
    }
}
