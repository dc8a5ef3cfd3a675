use std::collections::BTreeMap;

use payadj_recon::config::AdjustmentConfig;
use payadj_recon::engine::run;
use payadj_recon::model::{Employee, PayRateEntry, RawRecord, Value};
use payadj_recon::store::MemoryStore;
use payadj_recon::AdjustError;

const NAVY_TOML: &str = r#"
name = "Navy adjustments"

[payclasses]
"1" = "officers"
"2" = "wofficers"
"3" = "ratings"
"#;

fn config() -> AdjustmentConfig {
    AdjustmentConfig::from_toml(NAVY_TOML).unwrap()
}

fn rate(
    payment_type: &str,
    description: &str,
    perc: &str,
    status: &str,
    grades: &[(&str, f64)],
) -> PayRateEntry {
    PayRateEntry {
        payment_type: payment_type.into(),
        description: description.into(),
        perc: Some(perc.into()),
        status: Some(status.into()),
        grade_amounts: grades.iter().map(|(g, a)| (g.to_string(), *a)).collect::<BTreeMap<_, _>>(),
    }
}

fn reference() -> MemoryStore {
    MemoryStore::new()
        .with_employee(Employee::new("NN001", "0401"))
        .with_employee(Employee::new("NN002", "0702"))
        .with_employee(Employee::new("WO100", "1101"))
        .with_employee(Employee::new("RT500", "0301"))
        .with_employee(Employee {
            id: "NN900".into(),
            grade_level: Some("0401".into()),
            date_left: Some("2023-12-31".into()),
            exit_type: Some("Retired".into()),
        })
        .with_rate(
            "officers",
            rate(
                "PT330",
                "Revised Consolidated Pay",
                "R",
                "Active",
                &[("04", 237007.92), ("07", 310442.10)],
            ),
        )
        .with_rate("officers", rate("PT110", "Call Duty Allowance", "P", "Active", &[]))
        .with_rate(
            "wofficers",
            rate("PT330W", "Revised Consolidated Pay", "R", "Active", &[("11", 98000.0)]),
        )
        .with_rate("ratings", rate("PT412", "Kit Upkeep", "R", "Inactive", &[("03", 5000.0)]))
}

fn row(sheet: &str, n: usize, numb: &str, bp: &str, payclass: &str) -> RawRecord {
    RawRecord::new(sheet, n)
        .with("Numb", numb)
        .with("Title", "Lt")
        .with("BP", bp)
        .with("Payclass", payclass)
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[tokio::test]
async fn padded_and_recased_headers_dedup_to_one() {
    let records = vec![
        row("Sheet1", 2, "NN001", "Revised Consolidated Pay", "1"),
        RawRecord::new("Sheet2", 2)
            .with(" NUMB ", " NN001 ")
            .with("title", "Lt")
            .with("Bp", "Revised Consolidated Pay ")
            .with("PAYCLASS", "1"),
    ];
    let result = run(&config(), records, &reference()).await.unwrap();
    assert_eq!(result.summary.total_unique_records, 1);
    assert_eq!(result.summary.duplicates, 1);
    assert_eq!(result.summary.uploaded, 1);
}

#[tokio::test]
async fn unknown_employee_is_inactive() {
    let records = vec![
        row("Sheet1", 2, "NN001", "Revised Consolidated Pay", "1"),
        row("Sheet1", 3, "XX404", "Revised Consolidated Pay", "1"),
        row("Sheet1", 4, "NN900", "Revised Consolidated Pay", "1"),
    ];
    let result = run(&config(), records, &reference()).await.unwrap();
    assert_eq!(result.summary.inactive, 2);
    assert_eq!(result.summary.uploaded, 1);
    let ids: Vec<String> = result.sheets[0]
        .records
        .iter()
        .map(|r| r.service_number.as_text().into_owned())
        .collect();
    assert_eq!(ids, vec!["NN001"]);
}

#[tokio::test]
async fn fixed_rate_grade_amount() {
    let records = vec![row("Sheet1", 2, "NN001", "Revised Consolidated Pay", "1")];
    let result = run(&config(), records, &reference()).await.unwrap();
    let rec = &result.sheets[0].records[0];
    assert_eq!(rec.payment_type, "PT330");
    assert_eq!(rec.amount_payable, Some(Value::Number(237007.92)));
    assert_eq!(rec.payment_indicator, "T");
    assert_eq!(rec.months, 1);
    assert_eq!(rec.amount_to_date, 0.0);
}

#[tokio::test]
async fn unmapped_payclass_is_a_gap_not_a_count() {
    let records = vec![
        row("Sheet1", 2, "NN001", "Revised Consolidated Pay", "1"),
        row("Sheet1", 3, "NN002", "Revised Consolidated Pay", "8"),
    ];
    let result = run(&config(), records, &reference()).await.unwrap();
    let s = &result.summary;
    assert_eq!(s.inactive, 0);
    assert_eq!(s.duplicates, 0);
    assert_eq!(s.unmapped, 1);
    assert_eq!(s.uploaded, 1);
    assert_eq!(s.failures.len(), 1);
    assert_eq!(s.failures[0].payclass, "8");
    assert_eq!(s.dropped[0].row, 3);
    assert!(result
        .sheets
        .iter()
        .flat_map(|sh| &sh.records)
        .all(|r| r.service_number.as_text() != "NN002"));
}

#[tokio::test]
async fn empty_file_is_validation_error() {
    let err = run(&config(), Vec::new(), &reference()).await.unwrap_err();
    assert!(matches!(err, AdjustError::Validation { .. }));
}

// -------------------------------------------------------------------------
// Pipeline behaviour
// -------------------------------------------------------------------------

#[tokio::test]
async fn output_sheets_mirror_source_sheets() {
    let records = vec![
        row("Ratings", 2, "RT500", "Kit Upkeep", "3"),
        row("Officers", 2, "NN001", "Revised Consolidated Pay", "1"),
        row("Warrant", 2, "WO100", "Revised Consolidated Pay", "2"),
        row("Officers", 3, "NN002", "Revised Consolidated Pay", "1"),
    ];
    let result = run(&config(), records, &reference()).await.unwrap();

    // Payclass groups are processed in first-appearance order (3, 1, 2)
    let names: Vec<&str> = result.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Ratings", "Officers", "Warrant"]);

    let officers = &result.sheets[1].records;
    assert_eq!(officers.len(), 2);
    assert_eq!(officers[1].amount_payable, Some(Value::Number(310442.10)));

    // Inactive rate entry: code assigned, amount left empty
    let ratings = &result.sheets[0].records[0];
    assert_eq!(ratings.payment_type, "PT412");
    assert_eq!(ratings.amount_payable, None);

    let warrant = &result.sheets[2].records[0];
    assert_eq!(warrant.payment_type, "PT330W");
    assert_eq!(warrant.amount_payable, Some(Value::Number(98000.0)));
    assert_eq!(result.summary.uploaded, 4);
    assert_eq!(result.record_count(), 4);
}

#[tokio::test]
async fn explicit_amount_and_percentage_codes() {
    let records = vec![
        row("Sheet1", 2, "NN001", "Revised Consolidated Pay", "1").with("BPM", 1200.5),
        row("Sheet1", 3, "NN002", "call duty allowance", "1"),
    ];
    let result = run(&config(), records, &reference()).await.unwrap();
    let recs = &result.sheets[0].records;
    assert_eq!(recs[0].amount_payable, Some(Value::Number(1200.5)));
    assert_eq!(recs[1].payment_type, "PT110");
    assert_eq!(recs[1].amount_payable, None);
}

#[tokio::test]
async fn every_emitted_payment_type_matches_its_description() {
    let store = reference();
    let records = vec![
        row("Sheet1", 2, "NN001", "REVISED CONSOLIDATED PAY", "1"),
        row("Sheet1", 3, "NN002", "Call Duty Allowance", "1"),
        row("Sheet1", 4, "WO100", " revised consolidated pay", "2"),
        row("Sheet1", 5, "RT500", "Kit Upkeep", "3"),
    ];
    let expected = ["PT330", "PT110", "PT330W", "PT412"];
    let result = run(&config(), records, &store).await.unwrap();
    let got: Vec<&str> = result.sheets[0].records.iter().map(|r| r.payment_type.as_str()).collect();
    assert_eq!(got, expected);
}

#[tokio::test]
async fn unresolved_pay_codes_are_counted() {
    let records = vec![
        row("Sheet1", 2, "NN001", "Hazard Allowance", "1"),
        row("Sheet1", 3, "NN002", "Revised Consolidated Pay", "1"),
    ];
    let result = run(&config(), records, &reference()).await.unwrap();
    let s = &result.summary;
    assert_eq!(s.unresolved, 1);
    assert_eq!(s.uploaded, 1);
    assert_eq!(s.inactive, 0);
    assert!(s.failures[0].reason.contains("hazard allowance"));
    assert_eq!(s.dropped[0].identifier.as_deref(), Some("NN001"));
}

#[tokio::test]
async fn summary_serializes_named_counters() {
    let records = vec![row("Sheet1", 2, "NN001", "Revised Consolidated Pay", "1")];
    let result = run(&config(), records, &reference()).await.unwrap();
    let json = serde_json::to_value(&result.summary).unwrap();
    assert_eq!(json["total_unique_records"], 1);
    assert_eq!(json["inactive"], 0);
    assert_eq!(json["duplicates"], 0);
    assert_eq!(json["uploaded"], 1);
    assert!(json["failures"].as_array().unwrap().is_empty());
}
