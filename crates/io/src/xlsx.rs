// Excel import (xlsx, xls) and adjustment workbook export

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};
use tracing::{debug, info};

use payadj_recon::model::{format_number, OutputRecord, OutputSheet, RawRecord, Value};
use payadj_recon::AdjustError;

/// Maximum number of cells to import (prevents DoS from huge files)
const MAX_CELLS: usize = 5_000_000;

/// Import every sheet of a workbook. The first row of each sheet's used
/// range is the header; each later row becomes one record tagged with the
/// sheet name. Blank rows are discarded.
pub fn import_records(path: &Path) -> Result<Vec<RawRecord>, AdjustError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| AdjustError::Parse(format!("Failed to open Excel file: {}", e)))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(AdjustError::Parse("Excel file contains no sheets".to_string()));
    }

    let mut records = Vec::new();
    let mut total_cells = 0usize;

    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| {
                AdjustError::Parse(format!("Failed to read sheet '{}': {}", sheet_name, e))
            })?;

        let (height, width) = range.get_size();
        if height == 0 || width == 0 {
            debug!(sheet = %sheet_name, "empty sheet skipped");
            continue;
        }

        // Range start offset (data may not begin at A1)
        let (data_start_row, _) = range.start().unwrap_or((0, 0));
        let mut rows = range.rows();
        let headers: Vec<Option<String>> = match rows.next() {
            Some(header_row) => header_row.iter().map(header_text).collect(),
            None => continue,
        };

        let before = records.len();
        for (row_idx, row) in rows.enumerate() {
            // Header occupies data_start_row; spreadsheet rows are 1-based
            let row_number = data_start_row as usize + row_idx + 2;
            let mut record = RawRecord::new(sheet_name.as_str(), row_number);

            for (header, cell) in headers.iter().zip(row.iter()) {
                let Some(header) = header else { continue };
                if let Some(value) = cell_value(cell) {
                    record.fields.push((header.clone(), value));
                    total_cells += 1;
                }
            }

            if total_cells > MAX_CELLS {
                return Err(AdjustError::Parse(format!(
                    "Import stopped at {} cells (limit reached)",
                    MAX_CELLS
                )));
            }
            if !record.is_blank() {
                records.push(record);
            }
        }
        debug!(sheet = %sheet_name, records = records.len() - before, "sheet imported");
    }

    Ok(records)
}

fn header_text(cell: &Data) -> Option<String> {
    match cell_value(cell)? {
        Value::Text(s) => Some(s),
        Value::Number(n) => Some(format_number(n)),
    }
}

fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            if s.trim().is_empty() {
                None
            } else {
                Some(Value::Text(s.clone()))
            }
        }
        Data::Float(n) => Some(Value::Number(*n)),
        Data::Int(n) => Some(Value::Number(*n as f64)),
        Data::Bool(b) => Some(Value::from(if *b { "TRUE" } else { "FALSE" })),
        Data::Error(e) => Some(Value::Text(format!("#{:?}", e))),
        // Serial number, 1900 date system
        Data::DateTime(dt) => Some(Value::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Value::Text(s.clone())),
    }
}

/// Render the adjustment workbook: one worksheet per output sheet, bold
/// header row, columns in [`OutputRecord::HEADERS`] order. With no sheets a
/// header-only `default_sheet` is written so the artifact is always valid.
pub fn write_workbook(sheets: &[OutputSheet], default_sheet: &str) -> Result<Vec<u8>, AdjustError> {
    let mut xlsx_workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();

    if sheets.is_empty() {
        let worksheet = add_named_sheet(&mut xlsx_workbook, default_sheet)?;
        write_header(worksheet, &OutputRecord::HEADERS, &header_format)?;
    }

    for sheet in sheets {
        let worksheet = add_named_sheet(&mut xlsx_workbook, &sheet.name)?;
        write_header(worksheet, &OutputRecord::HEADERS, &header_format)?;
        for (idx, record) in sheet.records.iter().enumerate() {
            let mut cells = record.cells();
            cells[AMOUNT_PAYABLE_COL] = cells[AMOUNT_PAYABLE_COL].take().map(numeric_amount);
            write_row(worksheet, idx as u32 + 1, &cells)?;
        }
    }

    let bytes = xlsx_workbook
        .save_to_buffer()
        .map_err(|e| AdjustError::Output(format!("Failed to save XLSX file: {}", e)))?;

    info!(
        sheets = sheets.len(),
        records = sheets.iter().map(|s| s.records.len()).sum::<usize>(),
        bytes = bytes.len(),
        "adjustment workbook written"
    );
    Ok(bytes)
}

/// Column of "Amount Payable" in [`OutputRecord::HEADERS`].
const AMOUNT_PAYABLE_COL: usize = 3;

/// Uploaded amounts arrive as text from CSV; write them as numbers when they
/// parse as one. Anything else is written as given.
fn numeric_amount(value: Value) -> Value {
    if let Value::Text(s) = &value {
        if let Ok(n) = s.trim().parse::<f64>() {
            if n.is_finite() {
                return Value::Number(n);
            }
        }
    }
    value
}

pub(crate) fn add_named_sheet<'a>(
    workbook: &'a mut XlsxWorkbook,
    name: &str,
) -> Result<&'a mut Worksheet, AdjustError> {
    workbook
        .add_worksheet()
        .set_name(name)
        .map_err(|e| AdjustError::Output(format!("Failed to create sheet '{}': {}", name, e)))
}

pub(crate) fn write_header(
    worksheet: &mut Worksheet,
    headers: &[&str],
    format: &Format,
) -> Result<(), AdjustError> {
    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *header, format)
            .map_err(|e| {
                AdjustError::Output(format!("Failed to write header ({}): {}", header, e))
            })?;
    }
    Ok(())
}

pub(crate) fn write_row(
    worksheet: &mut Worksheet,
    row: u32,
    cells: &[Option<Value>],
) -> Result<(), AdjustError> {
    for (col, cell) in cells.iter().enumerate() {
        let col16 = col as u16;
        let written = match cell {
            None => continue,
            Some(Value::Text(s)) => worksheet.write_string(row, col16, s).map(|_| ()),
            Some(Value::Number(n)) => worksheet.write_number(row, col16, *n).map(|_| ()),
        };
        written.map_err(|e| {
            AdjustError::Output(format!("Failed to write cell ({}, {}): {}", row, col, e))
        })?;
    }
    Ok(())
}
