use crate::error::{PaperworkError, PaperworkResult};
use crate::utils::{parse_day_name, parse_iso_date};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const RANDOM_SIGNATURE: &str = "random";

fn random_signature() -> String {
    RANDOM_SIGNATURE.to_string()
}

fn default_true() -> bool {
    true
}

/// A Y/N flag on a loadsheet car. Accepts either case on input and always
/// renders upper-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum YesNo {
    #[serde(rename = "Y")]
    Yes,
    #[serde(rename = "N")]
    No,
}

impl YesNo {
    pub fn as_str(&self) -> &'static str {
        match self {
            YesNo::Yes => "Y",
            YesNo::No => "N",
        }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, YesNo::Yes)
    }
}

impl<'de> Deserialize<'de> for YesNo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_uppercase().as_str() {
            "Y" => Ok(YesNo::Yes),
            "N" => Ok(YesNo::No),
            _ => Err(serde::de::Error::custom("Must be 'Y' or 'N'")),
        }
    }
}

fn flag_no() -> YesNo {
    YesNo::No
}

fn flag_yes() -> YesNo {
    YesNo::Yes
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarEntry {
    pub reg: String,
    pub make_model: String,
    #[serde(default = "flag_no")]
    pub offloaded: YesNo,
    #[serde(default = "flag_no")]
    pub docs: YesNo,
    #[serde(default = "flag_yes")]
    pub spare_keys: YesNo,
    #[serde(default)]
    pub car_notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRefs {
    pub sig1: String,
    pub sig2: String,
}

impl Default for SignatureRefs {
    fn default() -> Self {
        Self {
            sig1: random_signature(),
            sig2: random_signature(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadsheetRequest {
    /// `YYYY-MM-DD`
    pub load_date: String,
    pub load_number: String,
    pub collection_point: String,
    pub delivery_point: String,
    pub fleet_reg: String,
    #[serde(default)]
    pub load_notes: String,
    #[serde(default = "random_signature")]
    pub sig1: String,
    #[serde(default = "random_signature")]
    pub sig2: String,
    pub cars: Vec<CarEntry>,
    #[serde(default = "default_true")]
    pub include_pdf: bool,
}

#[derive(Debug, Clone)]
pub struct LoadsheetDocument {
    pub load_date: NaiveDate,
    pub load_number: String,
    pub collection_point: String,
    pub delivery_point: String,
    pub fleet_reg: String,
    pub notes: String,
    pub cars: Vec<CarEntry>,
    pub signatures: SignatureRefs,
}

impl LoadsheetRequest {
    /// Checks field shapes. The car cap is enforced by the populator, which
    /// owns the slot table.
    pub fn into_document(self) -> PaperworkResult<(LoadsheetDocument, bool)> {
        let load_date = parse_iso_date(&self.load_date)
            .ok_or_else(|| PaperworkError::invalid("load_date must be in YYYY-MM-DD format"))?;
        let document = LoadsheetDocument {
            load_date,
            load_number: self.load_number,
            collection_point: self.collection_point,
            delivery_point: self.delivery_point,
            fleet_reg: self.fleet_reg,
            notes: self.load_notes,
            cars: self.cars,
            signatures: SignatureRefs {
                sig1: self.sig1,
                sig2: self.sig2,
            },
        };
        Ok((document, self.include_pdf))
    }
}

/// One load on a timesheet day, after best-effort coercion to strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadEntry {
    pub customer: String,
    pub car_count: String,
    pub collection: String,
    pub delivery: String,
    pub note: String,
}

/// A line in a day's load list. Positions matter: an unrecognised entry in the
/// first three still occupies its fixed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadLine {
    Load(LoadEntry),
    /// Free-text placeholder written to a single cell
    Annotation(String),
    Unrecognised,
}

const LOAD_FIELDS: [&str; 4] = ["customer", "car_count", "collection", "delivery"];

impl LoadLine {
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return LoadLine::Unrecognised;
        };

        let complete = LOAD_FIELDS
            .iter()
            .all(|key| obj.get(*key).is_some_and(|v| !v.is_null()));
        if complete {
            return LoadLine::Load(coerce_load(obj));
        }

        if let Some(message) = obj.get("message").and_then(coerce_scalar)
            && !message.is_empty()
        {
            return LoadLine::Annotation(message);
        }

        if obj.contains_key("customer") || obj.contains_key("collection") {
            return LoadLine::Load(coerce_load(obj));
        }

        LoadLine::Unrecognised
    }
}

fn coerce_load(obj: &Map<String, Value>) -> LoadEntry {
    let field = |key: &str| obj.get(key).and_then(coerce_scalar).unwrap_or_default();
    let note = Some(field("note"))
        .filter(|note| !note.is_empty())
        .unwrap_or_else(|| field("custom_note"));
    LoadEntry {
        customer: field("customer"),
        car_count: field("car_count"),
        collection: field("collection"),
        delivery: field("delivery"),
        note,
    }
}

/// Strings pass through, numbers and booleans render, everything else is dropped.
fn coerce_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_scalar))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_opt_string(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Deserialize)]
pub struct DayRequest {
    pub day: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub finish_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub total_hours: Option<String>,
    #[serde(default)]
    pub loads: Vec<Value>,
}

/// `fleet_reg` may arrive as a single string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FleetRegs {
    One(String),
    Many(Vec<String>),
}

impl FleetRegs {
    fn normalised(self) -> Vec<String> {
        let items = match self {
            FleetRegs::One(reg) => vec![reg],
            FleetRegs::Many(regs) => regs,
        };
        items
            .into_iter()
            .filter(|reg| !reg.trim().is_empty())
            .map(|reg| reg.to_uppercase())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimesheetRequest {
    #[serde(default)]
    pub week_ending: Option<String>,
    #[serde(default)]
    pub week_end_date: Option<String>,
    pub driver: String,
    pub fleet_reg: FleetRegs,
    #[serde(default, deserialize_with = "lenient_string")]
    pub start_mileage: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub end_mileage: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub weekly_total_hours: Option<String>,
    #[serde(default = "random_signature")]
    pub sig1: String,
    #[serde(default = "random_signature")]
    pub sig2: String,
    pub days: Vec<DayRequest>,
    #[serde(default = "default_true")]
    pub include_pdf: bool,
}

#[derive(Debug, Clone)]
pub struct DayEntry {
    /// Day name as supplied; resolved against the template at population time.
    pub day: String,
    pub start_time: Option<String>,
    pub finish_time: Option<String>,
    pub total_hours: Option<String>,
    pub loads: Vec<LoadLine>,
}

#[derive(Debug, Clone)]
pub struct TimesheetDocument {
    pub week_ending: NaiveDate,
    pub driver: String,
    pub fleet_regs: Vec<String>,
    pub start_mileage: String,
    pub end_mileage: String,
    pub weekly_total_hours: Option<String>,
    pub days: Vec<DayEntry>,
    pub signatures: SignatureRefs,
}

impl TimesheetRequest {
    pub fn into_document(self) -> PaperworkResult<(TimesheetDocument, bool)> {
        let raw_week = self
            .week_ending
            .filter(|value| !value.trim().is_empty())
            .or(self.week_end_date.filter(|value| !value.trim().is_empty()))
            .ok_or_else(|| {
                PaperworkError::invalid("week_ending (or week_end_date) is required for timesheets")
            })?;
        let week_ending = parse_iso_date(&raw_week)
            .ok_or_else(|| PaperworkError::invalid("week_ending must be in YYYY-MM-DD format"))?;

        let mut days = Vec::with_capacity(self.days.len());
        for day in self.days {
            if parse_day_name(&day.day).is_none() {
                return Err(PaperworkError::invalid(format!(
                    "'{}' is not a valid weekday name",
                    day.day
                )));
            }
            days.push(DayEntry {
                day: day.day,
                start_time: day.start_time,
                finish_time: day.finish_time,
                total_hours: day.total_hours,
                loads: day.loads.iter().map(LoadLine::from_value).collect(),
            });
        }

        let document = TimesheetDocument {
            week_ending,
            driver: self.driver,
            fleet_regs: self.fleet_reg.normalised(),
            start_mileage: self.start_mileage,
            end_mileage: self.end_mileage,
            weekly_total_hours: self.weekly_total_hours,
            days,
            signatures: SignatureRefs {
                sig1: self.sig1,
                sig2: self.sig2,
            },
        };
        Ok((document, self.include_pdf))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub excel_path: String,
    pub pdf_path: Option<String>,
    pub message: String,
    pub week_folder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureListResponse {
    pub sig1_images: Vec<String>,
    pub sig2_images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub host: String,
    pub port: u16,
    pub output_dir: String,
    pub templates_dir: String,
    pub signatures_dir: String,
    pub pdf_enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub pdf_enabled: Option<bool>,
    #[serde(default)]
    pub reset_pdf_override: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn car_flags_default_and_normalise() {
        let car: CarEntry = serde_json::from_value(json!({
            "reg": "ab12cde",
            "make_model": "Ford Focus",
            "docs": "y"
        }))
        .unwrap();
        assert_eq!(car.offloaded, YesNo::No);
        assert_eq!(car.docs, YesNo::Yes);
        assert_eq!(car.spare_keys, YesNo::Yes);
        assert!(car.car_notes.is_empty());
    }

    #[test]
    fn car_flag_rejects_other_values() {
        let err = serde_json::from_value::<CarEntry>(json!({
            "reg": "AB12CDE",
            "make_model": "Ford Focus",
            "offloaded": "maybe"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("Must be 'Y' or 'N'"));
    }

    #[test]
    fn loadsheet_rejects_bad_date() {
        let request: LoadsheetRequest = serde_json::from_value(json!({
            "load_date": "17/05/2025",
            "load_number": "1",
            "collection_point": "A",
            "delivery_point": "B",
            "fleet_reg": "Y6BTT",
            "cars": []
        }))
        .unwrap();
        assert!(matches!(
            request.into_document(),
            Err(PaperworkError::InvalidRequest(_))
        ));
    }

    #[test]
    fn complete_load_wins_over_message() {
        let line = LoadLine::from_value(&json!({
            "customer": "WBAC",
            "car_count": 2,
            "collection": "Maidstone",
            "delivery": "Yard",
            "message": "ignored"
        }));
        assert_eq!(
            line,
            LoadLine::Load(LoadEntry {
                customer: "WBAC".into(),
                car_count: "2".into(),
                collection: "Maidstone".into(),
                delivery: "Yard".into(),
                note: String::new(),
            })
        );
    }

    #[test]
    fn message_only_is_annotation() {
        let line = LoadLine::from_value(&json!({"message": "Rest day"}));
        assert_eq!(line, LoadLine::Annotation("Rest day".into()));
    }

    #[test]
    fn partial_load_is_coerced() {
        let line = LoadLine::from_value(&json!({
            "collection": "Corby",
            "car_count": 7.5,
            "custom_note": "late"
        }));
        let LoadLine::Load(load) = line else {
            panic!("expected load");
        };
        assert_eq!(load.customer, "");
        assert_eq!(load.car_count, "7.5");
        assert_eq!(load.note, "late");
    }

    #[test]
    fn unrecognised_shapes_are_kept_as_placeholders() {
        assert_eq!(LoadLine::from_value(&json!("text")), LoadLine::Unrecognised);
        assert_eq!(
            LoadLine::from_value(&json!({"delivery": "Yard"})),
            LoadLine::Unrecognised
        );
    }

    #[test]
    fn timesheet_accepts_alias_and_single_fleet_reg() {
        let request: TimesheetRequest = serde_json::from_value(json!({
            "week_end_date": "2025-05-18",
            "driver": "Craig",
            "fleet_reg": "y6btt",
            "start_mileage": 12000,
            "days": [{"day": "monday", "total_hours": 9}]
        }))
        .unwrap();
        let (doc, include_pdf) = request.into_document().unwrap();
        assert!(include_pdf);
        assert_eq!(doc.week_ending, NaiveDate::from_ymd_opt(2025, 5, 18).unwrap());
        assert_eq!(doc.fleet_regs, vec!["Y6BTT".to_string()]);
        assert_eq!(doc.start_mileage, "12000");
        assert_eq!(doc.days[0].total_hours.as_deref(), Some("9"));
    }

    #[test]
    fn timesheet_requires_week_ending() {
        let request: TimesheetRequest = serde_json::from_value(json!({
            "driver": "Craig",
            "fleet_reg": ["Y6BTT", " "],
            "days": []
        }))
        .unwrap();
        let err = request.into_document().unwrap_err();
        assert!(err.to_string().contains("week_ending"));
    }

    #[test]
    fn timesheet_rejects_unknown_day_name() {
        let request: TimesheetRequest = serde_json::from_value(json!({
            "week_ending": "2025-05-18",
            "driver": "Craig",
            "fleet_reg": ["Y6BTT"],
            "days": [{"day": "Caturday"}]
        }))
        .unwrap();
        assert!(request.into_document().is_err());
    }
}
