use super::sheet::{
    ensure_template, ensure_week_folder, merged_anchor, open_template, primary_sheet,
    save_workbook, write_text,
};
use super::{GeneratedWorkbook, PaperworkContext};
use crate::cellmap::timesheet::{self as cells, cell};
use crate::error::{DocumentKind, PaperworkResult};
use crate::model::{DayEntry, LoadEntry, LoadLine, TimesheetDocument};
use crate::utils::{
    day_in_week, format_cell_date, format_hours, format_short_date, parse_day_name,
    sanitize_filename, week_ending,
};
use chrono::NaiveDate;
use std::collections::HashSet;
use umya_spreadsheet::Worksheet;

const ABSENCE_MARKERS: [&str; 2] = ["SICK", "HOLIDAY"];

pub fn generate_timesheet(
    ctx: &PaperworkContext,
    doc: &TimesheetDocument,
) -> PaperworkResult<GeneratedWorkbook> {
    let template = ctx.timesheet_template.as_path();
    ensure_template(DocumentKind::Timesheet, template)?;

    let week_end = week_ending(doc.week_ending);
    let folder = ensure_week_folder(&ctx.output_dir, week_end)?;
    let file_name = format!(
        "timesheet_{}_{}.xlsx",
        week_end.format("%Y-%m-%d"),
        sanitize_filename(&doc.driver)
    );
    let excel_path = folder.path.join(file_name);

    let mut book = open_template(template)?;
    let sheet = primary_sheet(&mut book, template)?;
    fill_timesheet(sheet, doc, week_end);
    save_workbook(&book, &excel_path)?;

    tracing::info!(
        driver = %doc.driver,
        days = doc.days.len(),
        path = %excel_path.display(),
        "timesheet written"
    );

    Ok(GeneratedWorkbook {
        excel_path,
        folder: folder.path,
        week_folder: folder.name,
    })
}

/// Writes headers, day rows, overflow rows and the weekly total.
///
/// Days are visited in the order supplied. Loads past the third for any day
/// go to a shared overflow region whose row counter runs across the whole
/// document.
pub fn fill_timesheet(sheet: &mut Worksheet, doc: &TimesheetDocument, week_end: NaiveDate) {
    write_text(sheet, cells::WEEK_ENDING, format_cell_date(week_end));
    let driver_cell = merged_anchor(sheet, cells::DRIVER);
    write_text(sheet, &driver_cell, doc.driver.to_uppercase());
    write_text(sheet, cells::FLEET_REGS, joined_fleet_regs(&doc.fleet_regs));
    write_text(sheet, cells::START_MILEAGE, doc.start_mileage.as_str());
    write_text(sheet, cells::END_MILEAGE, doc.end_mileage.as_str());

    let mut overflow_row = cells::OVERFLOW_START_ROW;
    for day in &doc.days {
        let Some(weekday) = parse_day_name(&day.day) else {
            tracing::debug!(day = %day.day, "skipping unknown day");
            continue;
        };
        let rows = cells::day_rows(weekday);

        let (start, finish, total) = day_times(day);
        write_text(sheet, &cell(cells::COL_START, rows.time_row), start);
        write_text(sheet, &cell(cells::COL_FINISH, rows.time_row), finish);
        write_text(sheet, &cell(cells::COL_TOTAL, rows.time_row), total);

        for (idx, line) in day.loads.iter().take(cells::LOADS_PER_DAY).enumerate() {
            let row = rows.base_row + idx as u32;
            match line {
                LoadLine::Load(load) => write_load_row(sheet, row, load),
                LoadLine::Annotation(message) => {
                    write_text(sheet, &cell(cells::COL_CUSTOMER, row), message.to_uppercase());
                }
                LoadLine::Unrecognised => {}
            }
        }

        let overflow: Vec<&LoadEntry> = day
            .loads
            .iter()
            .skip(cells::LOADS_PER_DAY)
            .filter_map(|line| match line {
                LoadLine::Load(load) => Some(load),
                _ => None,
            })
            .collect();
        if overflow.is_empty() {
            continue;
        }

        let stamp = format_short_date(day_in_week(week_end, weekday));
        for load in overflow {
            write_text(sheet, &cell(cells::COL_OVERFLOW_DATE, overflow_row), stamp.as_str());
            write_load_row(sheet, overflow_row, load);
            overflow_row += 1;
        }
    }

    let weekly_total = doc
        .weekly_total_hours
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format_hours(calculate_total_hours(&doc.days)));
    write_text(sheet, cells::WEEKLY_TOTAL, weekly_total);
}

/// Sum of the supplied daily totals. Blank, unparsable and non-finite values
/// are skipped rather than counted as zero.
pub fn calculate_total_hours(days: &[DayEntry]) -> f64 {
    days.iter()
        .filter_map(|day| day.total_hours.as_deref())
        .filter_map(|raw| raw.trim().parse::<f64>().ok())
        .filter(|hours| hours.is_finite())
        .sum()
}

/// Start, finish and total for the day's time row, with an absence marker in
/// either time field overriding all three.
fn day_times(day: &DayEntry) -> (String, String, String) {
    let field = |value: &Option<String>| value.as_deref().unwrap_or("").trim().to_string();
    let start = field(&day.start_time);
    let finish = field(&day.finish_time);
    let total = field(&day.total_hours);

    let marker = [&start, &finish]
        .into_iter()
        .map(|value| value.to_uppercase())
        .find(|value| ABSENCE_MARKERS.contains(&value.as_str()));

    match marker {
        Some(marker) => (marker.clone(), marker, "0".to_string()),
        None => (start, finish, total),
    }
}

fn write_load_row(sheet: &mut Worksheet, row: u32, load: &LoadEntry) {
    write_text(sheet, &cell(cells::COL_CUSTOMER, row), load.customer.to_uppercase());
    write_text(sheet, &cell(cells::COL_CAR_COUNT, row), load.car_count.as_str());
    write_text(sheet, &cell(cells::COL_COLLECTION, row), load.collection.to_uppercase());
    write_text(sheet, &cell(cells::COL_DELIVERY, row), load.delivery.to_uppercase());
    if !load.note.trim().is_empty() {
        write_text(sheet, &cell(cells::COL_NOTE, row), load.note.to_uppercase());
    }
}

/// Upper-cased, first occurrence wins, comma separated.
fn joined_fleet_regs(regs: &[String]) -> String {
    let mut seen = HashSet::new();
    regs.iter()
        .map(|reg| reg.trim().to_uppercase())
        .filter(|reg| !reg.is_empty() && seen.insert(reg.clone()))
        .collect::<Vec<_>>()
        .join(", ")
}
