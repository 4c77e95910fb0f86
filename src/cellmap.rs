//! Fixed template coordinates for each document type.
//!
//! Every logical field resolves to exactly one cell, except for the explicit
//! repeating structures (loadsheet car slots, timesheet day rows and the
//! timesheet overflow region). Redesigning a template means editing this file
//! and nothing else.

use chrono::Weekday;

/// Cells making up one car slot on the loadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarSlot {
    pub make_model: &'static str,
    pub reg: &'static str,
    pub offloaded: &'static str,
    pub docs: &'static str,
    pub spare_keys: &'static str,
    /// Per-car notes cell. The last slot has none: its notes cell is the
    /// combined notes block.
    pub notes: Option<&'static str>,
}

impl CarSlot {
    pub fn cells(&self) -> impl Iterator<Item = &'static str> {
        [
            self.make_model,
            self.reg,
            self.offloaded,
            self.docs,
            self.spare_keys,
        ]
        .into_iter()
        .chain(self.notes)
    }
}

pub mod loadsheet {
    use super::CarSlot;

    pub const LOAD_DATE: &str = "C6";
    pub const LOAD_NUMBER: &str = "G6";
    pub const FLEET_REG: &str = "C7";
    pub const COLLECTION: &str = "B9";
    pub const DELIVERY: &str = "F9";
    pub const FOOTER_DATES: [&str; 2] = ["C46", "H46"];
    pub const NOTES_BLOCK: &str = "C39";
    pub const SIGNATURE_ANCHORS: [&str; 2] = ["C42", "H42"];

    pub const CAR_SLOTS: [CarSlot; 8] = [
        slot("B11", "B13", "E10", "G10", "I10", Some("C11")),
        slot("B15", "B17", "E14", "G14", "I14", Some("C15")),
        slot("B19", "B21", "E18", "G18", "I18", Some("C19")),
        slot("B23", "B25", "E22", "G22", "I22", Some("C23")),
        slot("B27", "B29", "E26", "G26", "I26", Some("C27")),
        slot("B31", "B33", "E30", "G30", "I30", Some("C31")),
        slot("B35", "B37", "E34", "G34", "I34", Some("C35")),
        slot("B39", "B41", "E38", "G38", "I38", None),
    ];

    pub const MAX_CARS: usize = CAR_SLOTS.len();

    const fn slot(
        make_model: &'static str,
        reg: &'static str,
        offloaded: &'static str,
        docs: &'static str,
        spare_keys: &'static str,
        notes: Option<&'static str>,
    ) -> CarSlot {
        CarSlot {
            make_model,
            reg,
            offloaded,
            docs,
            spare_keys,
            notes,
        }
    }

    /// Every single-cell field plus every slot cell, for collision checks.
    pub fn all_cells() -> Vec<&'static str> {
        let mut cells = vec![LOAD_DATE, LOAD_NUMBER, FLEET_REG, COLLECTION, DELIVERY, NOTES_BLOCK];
        cells.extend(FOOTER_DATES);
        cells.extend(SIGNATURE_ANCHORS);
        for slot in CAR_SLOTS.iter() {
            cells.extend(slot.cells());
        }
        cells
    }
}

pub mod timesheet {
    use chrono::Weekday;

    pub const WEEK_ENDING: &str = "E5";
    pub const DRIVER: &str = "K3";
    pub const FLEET_REGS: &str = "K5";
    pub const START_MILEAGE: &str = "H4";
    pub const END_MILEAGE: &str = "H5";
    pub const WEEKLY_TOTAL: &str = "J29";

    /// Fixed load rows available per day before spilling into the overflow region.
    pub const LOADS_PER_DAY: usize = 3;
    /// First row of the shared overflow region, directly below the week grid.
    pub const OVERFLOW_START_ROW: u32 = 29;

    pub const COL_OVERFLOW_DATE: &str = "B";
    pub const COL_CUSTOMER: &str = "C";
    pub const COL_CAR_COUNT: &str = "D";
    pub const COL_COLLECTION: &str = "E";
    pub const COL_DELIVERY: &str = "F";
    pub const COL_NOTE: &str = "G";
    pub const COL_START: &str = "H";
    pub const COL_FINISH: &str = "I";
    pub const COL_TOTAL: &str = "J";

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DayRows {
        /// First of the day's fixed load rows.
        pub base_row: u32,
        /// Row holding start, finish and total hours.
        pub time_row: u32,
    }

    const FIRST_DAY_ROW: u32 = 8;
    const ROWS_PER_DAY: u32 = 3;

    pub fn day_rows(day: Weekday) -> DayRows {
        let row = FIRST_DAY_ROW + day.num_days_from_monday() * ROWS_PER_DAY;
        DayRows {
            base_row: row,
            time_row: row,
        }
    }

    pub fn cell(column: &str, row: u32) -> String {
        format!("{column}{row}")
    }
}

/// Rows occupied by the timesheet week grid for `day`.
pub fn timesheet_day_span(day: Weekday) -> std::ops::Range<u32> {
    let rows = timesheet::day_rows(day);
    rows.base_row..rows.base_row + timesheet::LOADS_PER_DAY as u32
}
