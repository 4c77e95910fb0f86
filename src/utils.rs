use chrono::{Datelike, Days, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

const FALLBACK_FILENAME: &str = "paperwork";

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9\-_.]+").expect("filename regex is valid"));

/// Sunday closing the Monday-first week that contains `date`. A Sunday maps to itself.
pub fn week_ending(date: NaiveDate) -> NaiveDate {
    let days_to_sunday = 6 - date.weekday().num_days_from_monday();
    date + Days::new(u64::from(days_to_sunday))
}

/// Long form used inside template cells, e.g. `Sunday 18/05/25`.
pub fn format_cell_date(date: NaiveDate) -> String {
    date.format("%A %d/%m/%y").to_string()
}

/// Week folder name, e.g. `18-05-25`.
pub fn format_folder_date(date: NaiveDate) -> String {
    date.format("%d-%m-%y").to_string()
}

/// Date stamp written beside timesheet overflow rows, e.g. `12/05/25`.
pub fn format_short_date(date: NaiveDate) -> String {
    date.format("%d/%m/%y").to_string()
}

pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Turns descriptive text into something safe to use as a file stem.
///
/// Runs of characters outside `[A-Za-z0-9-_.]` collapse to a single `_`, then
/// leading/trailing `_`, `.` and `-` are trimmed. Empty results fall back to
/// `paperwork`.
pub fn sanitize_filename(value: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(value.trim(), "_");
    let trimmed = cleaned.trim_matches(|c| matches!(c, '_' | '.' | '-'));
    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Strips path separators from an identifier that is otherwise kept verbatim
/// in a file name.
pub fn filename_component(value: &str) -> String {
    let replaced: String = value
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    if replaced.is_empty() || replaced.chars().all(|c| c == '.') {
        FALLBACK_FILENAME.to_string()
    } else {
        replaced
    }
}

/// Canonical Monday-first day names as they appear in requests.
pub const DAY_NAMES: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Parses a full day name, case-insensitively. Abbreviations are not accepted.
pub fn parse_day_name(raw: &str) -> Option<Weekday> {
    let lowered = raw.trim().to_ascii_lowercase();
    DAY_NAMES
        .iter()
        .position(|name| *name == lowered)
        .map(|idx| WEEK[idx])
}

/// Calendar date of `day` within the week that ends on `week_end`.
pub fn day_in_week(week_end: NaiveDate, day: Weekday) -> NaiveDate {
    let offset = 6 - day.num_days_from_monday();
    week_end - Days::new(u64::from(offset))
}

pub fn path_to_forward_slashes(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if raw.contains('\\') {
        raw.replace('\\', "/")
    } else {
        raw.into_owned()
    }
}

/// Renders an hours total without a trailing `.0` for whole numbers.
pub fn format_hours(total: f64) -> String {
    if total.fract() == 0.0 && total.abs() < 1e15 {
        format!("{}", total as i64)
    } else {
        format!("{}", total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn saturday_snaps_forward_to_sunday() {
        assert_eq!(week_ending(date(2025, 5, 17)), date(2025, 5, 18));
    }

    #[test]
    fn sunday_maps_to_itself() {
        assert_eq!(week_ending(date(2025, 5, 18)), date(2025, 5, 18));
    }

    #[test]
    fn monday_snaps_to_end_of_same_week() {
        assert_eq!(week_ending(date(2025, 5, 12)), date(2025, 5, 18));
    }

    #[test]
    fn week_ending_crosses_year_boundary() {
        assert_eq!(week_ending(date(2025, 12, 30)), date(2026, 1, 4));
    }

    #[test]
    fn display_formats() {
        let sunday = date(2025, 5, 18);
        assert_eq!(format_cell_date(sunday), "Sunday 18/05/25");
        assert_eq!(format_folder_date(sunday), "18-05-25");
        assert_eq!(format_short_date(date(2025, 5, 12)), "12/05/25");
    }

    #[test]
    fn sanitize_collapses_and_trims() {
        assert_eq!(sanitize_filename("WBAC Maidstone!!"), "WBAC_Maidstone");
        assert_eq!(sanitize_filename("  BCA  Corby / North "), "BCA_Corby_North");
        assert_eq!(sanitize_filename("v1.2-final"), "v1.2-final");
    }

    #[test]
    fn sanitize_falls_back_when_nothing_survives() {
        assert_eq!(sanitize_filename("!!!"), "paperwork");
        assert_eq!(sanitize_filename(""), "paperwork");
        assert_eq!(sanitize_filename("._-"), "paperwork");
    }

    #[test]
    fn filename_component_keeps_identifier_but_drops_separators() {
        assert_eq!(filename_component("$S123456"), "$S123456");
        assert_eq!(filename_component("../etc/passwd"), ".._etc_passwd");
        assert_eq!(filename_component(".."), "paperwork");
    }

    #[test]
    fn day_names_parse_case_insensitively() {
        assert_eq!(parse_day_name("Monday"), Some(Weekday::Mon));
        assert_eq!(parse_day_name("SUNDAY"), Some(Weekday::Sun));
        assert_eq!(parse_day_name("mon"), None);
        assert_eq!(parse_day_name("funday"), None);
    }

    #[test]
    fn day_in_week_counts_back_from_sunday() {
        let week_end = date(2025, 5, 18);
        assert_eq!(day_in_week(week_end, Weekday::Mon), date(2025, 5, 12));
        assert_eq!(day_in_week(week_end, Weekday::Sun), week_end);
    }

    #[test]
    fn hours_formatting() {
        assert_eq!(format_hours(16.5), "16.5");
        assert_eq!(format_hours(16.0), "16");
        assert_eq!(format_hours(0.0), "0");
    }
}
