// Sample input workbook for uploaders

use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};

use payadj_recon::model::Value;
use payadj_recon::AdjustError;

use crate::xlsx::{add_named_sheet, write_header, write_row};

pub const TEMPLATE_FILENAME: &str = "payment-adjustments_template.xlsx";
pub const TEMPLATE_SHEET: &str = "Payment-Adjustments-Sample";

pub const TEMPLATE_HEADERS: [&str; 9] = [
    "Numb",
    "Title",
    "Surname",
    "Other Names",
    "BPC",
    "BP",
    "BPA",
    "BPM",
    "Payclass",
];

fn sample_row() -> [Option<Value>; 9] {
    [
        Some("NN001".into()),
        Some("Lt".into()),
        Some("Dabrinze".into()),
        Some("Nihinkea".into()),
        Some("BP".into()),
        Some("REVISED CONSOLIDATED PAY".into()),
        Some("TAXABLE PAYMENT".into()),
        Some(Value::Number(237007.92)),
        Some(Value::Number(1.0)),
    ]
}

/// Single-sheet workbook with the expected input header and one sample row.
pub fn template_workbook() -> Result<Vec<u8>, AdjustError> {
    let mut workbook = XlsxWorkbook::new();
    let bold = Format::new().set_bold();

    let worksheet = add_named_sheet(&mut workbook, TEMPLATE_SHEET)?;
    write_header(worksheet, &TEMPLATE_HEADERS, &bold)?;
    write_row(worksheet, 1, &sample_row())?;

    workbook
        .save_to_buffer()
        .map_err(|e| AdjustError::Output(format!("Failed to save template: {}", e)))
}
