use super::sheet::{
    embed_image, ensure_template, ensure_week_folder, open_template, primary_sheet, save_workbook,
    write_text,
};
use super::signature::select_signature;
use super::{GeneratedWorkbook, PaperworkContext};
use crate::cellmap::loadsheet as cells;
use crate::error::{DocumentKind, PaperworkError, PaperworkResult};
use crate::model::{CarEntry, LoadsheetDocument};
use crate::utils::{filename_component, format_cell_date, sanitize_filename, week_ending};
use umya_spreadsheet::Worksheet;

/// Populates the loadsheet template and saves it into the load's week folder.
///
/// The template and car-count checks both run before the week folder is
/// created, so a rejected request leaves the output tree untouched.
pub fn generate_loadsheet(
    ctx: &PaperworkContext,
    doc: &LoadsheetDocument,
) -> PaperworkResult<GeneratedWorkbook> {
    let template = ctx.loadsheet_template.as_path();
    ensure_template(DocumentKind::Loadsheet, template)?;

    if doc.cars.len() > cells::MAX_CARS {
        return Err(PaperworkError::TooManyCars {
            count: doc.cars.len(),
            max: cells::MAX_CARS,
        });
    }

    let week_end = week_ending(doc.load_date);
    let folder = ensure_week_folder(&ctx.output_dir, week_end)?;
    let file_name = format!(
        "{}_{}.xlsx",
        filename_component(&doc.load_number),
        sanitize_filename(&doc.collection_point)
    );
    let excel_path = folder.path.join(file_name);

    let mut book = open_template(template)?;
    let sheet = primary_sheet(&mut book, template)?;
    fill_loadsheet(sheet, doc);

    let signatures = [
        select_signature(&doc.signatures.sig1, &ctx.sig1_dir, &ctx.signatures_dir),
        select_signature(&doc.signatures.sig2, &ctx.sig2_dir, &ctx.signatures_dir),
    ];
    for (signature, anchor) in signatures.iter().zip(cells::SIGNATURE_ANCHORS) {
        if let Some(path) = signature {
            embed_image(sheet, path, anchor);
        }
    }

    save_workbook(&book, &excel_path)?;

    tracing::info!(
        load_number = %doc.load_number,
        cars = doc.cars.len(),
        path = %excel_path.display(),
        "loadsheet written"
    );

    Ok(GeneratedWorkbook {
        excel_path,
        folder: folder.path,
        week_folder: folder.name,
    })
}

/// Writes every mapped loadsheet cell. Slots without a car are blanked so
/// template placeholder text never leaks into the output.
pub fn fill_loadsheet(sheet: &mut Worksheet, doc: &LoadsheetDocument) {
    let load_date = format_cell_date(doc.load_date);

    write_text(sheet, cells::LOAD_DATE, load_date.as_str());
    write_text(sheet, cells::LOAD_NUMBER, doc.load_number.to_uppercase());
    write_text(sheet, cells::FLEET_REG, doc.fleet_reg.to_uppercase());
    write_text(sheet, cells::COLLECTION, doc.collection_point.to_uppercase());
    write_text(sheet, cells::DELIVERY, doc.delivery_point.to_uppercase());
    for cell in cells::FOOTER_DATES {
        write_text(sheet, cell, load_date.as_str());
    }

    for (idx, slot) in cells::CAR_SLOTS.iter().enumerate() {
        match doc.cars.get(idx) {
            Some(car) => {
                write_text(sheet, slot.make_model, car.make_model.to_uppercase());
                write_text(sheet, slot.reg, car.reg.to_uppercase());
                write_text(sheet, slot.offloaded, car.offloaded.as_str());
                write_text(sheet, slot.docs, car.docs.as_str());
                write_text(sheet, slot.spare_keys, car.spare_keys.as_str());
                if let Some(notes) = slot.notes {
                    write_text(sheet, notes, car.car_notes.to_uppercase());
                }
            }
            None => {
                for cell in slot.cells() {
                    write_text(sheet, cell, "");
                }
            }
        }
    }

    write_text(sheet, cells::NOTES_BLOCK, notes_block(doc));
}

/// One-line tally of the cars on the load.
pub fn load_summary(cars: &[CarEntry]) -> String {
    let loaded = cars.iter().filter(|car| !car.offloaded.is_yes()).count();
    let with_docs = cars.iter().filter(|car| car.docs.is_yes()).count();
    let with_spare = cars.iter().filter(|car| car.spare_keys.is_yes()).count();

    let docs_part = if with_docs > 0 {
        format!("{with_docs} CARS HAVE DOCUMENTS AND HAVE BEEN PLACED ON THE PASSENGER SEAT")
    } else {
        "0 CARS HAVE DOCUMENTS".to_string()
    };

    [
        format!("{loaded} CARS LOADED"),
        docs_part,
        format!("{with_spare} CARS HAVE SPARE KEYS"),
    ]
    .join(", ")
}

/// Summary line, then load notes, then per-car notes, one per line.
pub fn notes_block(doc: &LoadsheetDocument) -> String {
    let mut lines = vec![load_summary(&doc.cars)];

    let load_notes = doc.notes.trim();
    if !load_notes.is_empty() {
        lines.push(load_notes.to_string());
    }

    lines.extend(
        doc.cars
            .iter()
            .filter(|car| !car.car_notes.trim().is_empty())
            .map(|car| car.car_notes.clone()),
    );

    lines.join("\n").to_uppercase()
}
