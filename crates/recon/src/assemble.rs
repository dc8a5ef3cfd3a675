use crate::model::{OutputRecord, OutputSheet};

/// Regroup records by source sheet, sheets in order of first appearance.
/// Records with no sheet tag land on `default_sheet`.
pub fn assemble_sheets(records: Vec<OutputRecord>, default_sheet: &str) -> Vec<OutputSheet> {
    let mut sheets: Vec<OutputSheet> = Vec::new();

    for record in records {
        let name = if record.source_sheet.trim().is_empty() {
            default_sheet.to_string()
        } else {
            record.source_sheet.clone()
        };
        match sheets.iter().position(|s| s.name == name) {
            Some(i) => sheets[i].records.push(record),
            None => sheets.push(OutputSheet { name, records: vec![record] }),
        }
    }

    sheets
}
