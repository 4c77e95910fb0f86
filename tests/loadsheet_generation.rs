mod support;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use paperwork_gen::model::{CarEntry, LoadsheetDocument, SignatureRefs, YesNo};
use paperwork_gen::{PaperworkError, generate_loadsheet};
use support::{TestWorkspace, cell_value, read_workbook};

fn car(reg: &str, make_model: &str, docs: YesNo, notes: &str) -> CarEntry {
    CarEntry {
        reg: reg.to_string(),
        make_model: make_model.to_string(),
        offloaded: YesNo::No,
        docs,
        spare_keys: YesNo::Yes,
        car_notes: notes.to_string(),
    }
}

fn sample_document(cars: Vec<CarEntry>) -> LoadsheetDocument {
    LoadsheetDocument {
        load_date: NaiveDate::from_ymd_opt(2025, 5, 17).unwrap(),
        load_number: "$S123456".to_string(),
        collection_point: "WBAC Maidstone".to_string(),
        delivery_point: "BTT Yard".to_string(),
        fleet_reg: "Y6BTT".to_string(),
        notes: "Sample manifest".to_string(),
        cars,
        signatures: SignatureRefs::default(),
    }
}

#[test]
fn loadsheet_lands_in_week_folder_with_filled_cells() {
    let workspace = TestWorkspace::new();
    let doc = sample_document(vec![
        car("AB12CDE", "Ford Focus", YesNo::Yes, "keys in glovebox"),
        car("XY34ZZZ", "VW Golf", YesNo::No, ""),
    ]);

    let generated = generate_loadsheet(&workspace.context(), &doc).unwrap();

    assert_eq!(generated.week_folder, "18-05-25");
    assert_eq!(generated.folder, workspace.output_dir().join("18-05-25"));
    assert_eq!(
        generated.excel_path,
        workspace
            .output_dir()
            .join("18-05-25")
            .join("$S123456_WBAC_Maidstone.xlsx")
    );
    assert!(generated.excel_path.is_file());

    let book = read_workbook(&generated.excel_path);
    let sheet = book.get_sheet(&0).unwrap();
    assert_eq!(cell_value(sheet, "A1"), "VEHICLE LOADSHEET");
    assert_eq!(cell_value(sheet, "C6"), "Saturday 17/05/25");
    assert_eq!(cell_value(sheet, "G6"), "$S123456");
    assert_eq!(cell_value(sheet, "B9"), "WBAC MAIDSTONE");
    assert_eq!(cell_value(sheet, "B11"), "FORD FOCUS");
    assert_eq!(cell_value(sheet, "B17"), "XY34ZZZ");
    assert_eq!(cell_value(sheet, "G10"), "Y");
    assert_eq!(cell_value(sheet, "G14"), "N");
    assert_eq!(cell_value(sheet, "C11"), "KEYS IN GLOVEBOX");
    assert_eq!(cell_value(sheet, "C15"), "");

    // third slot onwards cleared
    assert_eq!(cell_value(sheet, "B19"), "");
    assert_eq!(cell_value(sheet, "E38"), "");

    let notes = cell_value(sheet, "C39");
    let lines: Vec<&str> = notes.lines().collect();
    assert_eq!(
        lines[0],
        "2 CARS LOADED, 1 CARS HAVE DOCUMENTS AND HAVE BEEN PLACED ON THE PASSENGER SEAT, \
         2 CARS HAVE SPARE KEYS"
    );
    assert_eq!(lines[1], "SAMPLE MANIFEST");
    assert_eq!(lines[2], "KEYS IN GLOVEBOX");
}

#[test]
fn template_is_never_modified() {
    let workspace = TestWorkspace::new();
    let template = workspace.templates_dir().join("loadsheet.xlsx");
    let before = std::fs::read(&template).unwrap();

    generate_loadsheet(&workspace.context(), &sample_document(vec![])).unwrap();

    assert_eq!(std::fs::read(&template).unwrap(), before);
}

#[test]
fn missing_template_is_not_found() {
    let workspace = TestWorkspace::bare();
    let err = generate_loadsheet(&workspace.context(), &sample_document(vec![])).unwrap_err();
    assert_matches!(err, PaperworkError::TemplateNotFound { .. });
    assert!(err.to_string().starts_with("Loadsheet template not found"));
}

#[test]
fn nine_cars_are_rejected_before_any_output() {
    let workspace = TestWorkspace::new();
    let cars = (0..9)
        .map(|i| car(&format!("REG{i}"), "Ford Ka", YesNo::No, ""))
        .collect();

    let err = generate_loadsheet(&workspace.context(), &sample_document(cars)).unwrap_err();

    assert_matches!(err, PaperworkError::TooManyCars { count: 9, max: 8 });
    assert!(!workspace.output_dir().join("18-05-25").exists());
}

#[test]
fn eight_cars_fill_every_slot() {
    let workspace = TestWorkspace::new();
    let cars = (1..=8)
        .map(|i| car(&format!("REG{i}"), "Ford Ka", YesNo::No, ""))
        .collect();

    let generated = generate_loadsheet(&workspace.context(), &sample_document(cars)).unwrap();

    let book = read_workbook(&generated.excel_path);
    let sheet = book.get_sheet(&0).unwrap();
    assert_eq!(cell_value(sheet, "B13"), "REG1");
    assert_eq!(cell_value(sheet, "B41"), "REG8");
    assert!(cell_value(sheet, "C39").starts_with("8 CARS LOADED"));
}

#[test]
fn regenerating_the_same_load_overwrites() {
    let workspace = TestWorkspace::new();
    let ctx = workspace.context();
    let first = generate_loadsheet(&ctx, &sample_document(vec![])).unwrap();

    let mut doc = sample_document(vec![car("NEW1", "Kia Rio", YesNo::No, "")]);
    doc.notes = String::new();
    let second = generate_loadsheet(&ctx, &doc).unwrap();

    assert_eq!(first.excel_path, second.excel_path);
    let book = read_workbook(&second.excel_path);
    assert_eq!(cell_value(book.get_sheet(&0).unwrap(), "B13"), "NEW1");
}
