// CSV/TSV import

use std::io::Read;
use std::path::Path;

use payadj_recon::model::{RawRecord, Value};
use payadj_recon::AdjustError;
use tracing::debug;

/// Import a flat table; every record is tagged with `sheet`.
pub fn import_records(path: &Path, sheet: &str) -> Result<Vec<RawRecord>, AdjustError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    debug!(delimiter = %(delimiter as char).escape_default(), "csv delimiter sniffed");
    import_from_string(&content, delimiter, sheet)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // More columns breaks ties
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, AdjustError> {
    let mut file = std::fs::File::open(path).map_err(|e| AdjustError::Io(e.to_string()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| AdjustError::Io(e.to_string()))?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            // Excel-exported CSVs are commonly Windows-1252
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };

    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

fn import_from_string(
    content: &str,
    delimiter: u8,
    sheet: &str,
) -> Result<Vec<RawRecord>, AdjustError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AdjustError::Parse(e.to_string()))?
        .clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(AdjustError::Parse("CSV file has no header row".into()));
    }

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row = result.map_err(|e| AdjustError::Parse(e.to_string()))?;
        // Header is row 1
        let mut record = RawRecord::new(sheet, idx + 2);
        for (header, field) in headers.iter().zip(row.iter()) {
            if header.trim().is_empty() || field.trim().is_empty() {
                continue;
            }
            record.fields.push((header.to_string(), Value::Text(field.to_string())));
        }
        if !record.is_blank() {
            records.push(record);
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Numb;BP;Payclass\nNN001;Bonus;1\nNN002;Bonus;2\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Numb,BP,Payclass\nNN001,Bonus,1\nNN002,Bonus,2\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Numb\tBP\tPayclass\nNN001\tBonus\t1\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_pipe_delimiter() {
        let content = "Numb|BP|Payclass\nNN001|Bonus|1\n";
        assert_eq!(sniff_delimiter(content), b'|');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Numb;BP;Payclass\nNN001;\"Pay, Revised\";1\nNN002;\"Kit\";3\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_import_tags_default_sheet_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("adjust.csv");
        fs::write(
            &path,
            "Numb,BP,BPM,Payclass\nNN001,Bonus,1200.5,1\n,,,\nNN002,Bonus,,2\n",
        )
        .unwrap();

        let records = import_records(&path, "Sheet1").unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.sheet == "Sheet1"));
        assert_eq!(records[0].row, 2);
        assert_eq!(records[1].row, 4);
        assert_eq!(records[0].fields[2], ("BPM".to_string(), Value::from("1200.5")));
        // Empty BPM field is not materialized
        assert_eq!(records[1].fields.len(), 3);
    }

    #[test]
    fn test_bom_is_stripped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}Numb,BP\nNN001,Bonus\n").unwrap();

        let records = import_records(&path, "Sheet1").unwrap();
        assert_eq!(records[0].fields[0].0, "Numb");
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Café" with 0xE9
        fs::write(&path, b"Numb,Surname\nNN001,Caf\xe9\n").unwrap();

        let records = import_records(&path, "Sheet1").unwrap();
        assert_eq!(records[0].fields[1].1, Value::from("Café"));
    }

    #[test]
    fn test_numeric_looking_fields_stay_verbatim_text() {
        let content = "Numb,Grade,BPM,Payclass\n123456789012345678,0401,1.0,1\n1e3,+5, 7 ,1\n";
        let records = import_from_string(content, b',', "Sheet1").unwrap();

        let values: Vec<&Value> = records[0].fields.iter().map(|(_, v)| v).collect();
        assert_eq!(
            values,
            vec![
                &Value::from("123456789012345678"),
                &Value::from("0401"),
                &Value::from("1.0"),
                &Value::from("1"),
            ]
        );
        assert_eq!(records[1].fields[0].1, Value::from("1e3"));
        assert_eq!(records[1].fields[1].1, Value::from("+5"));
        assert_eq!(records[1].fields[2].1, Value::from(" 7 "));
    }

    #[test]
    fn test_header_only_file_yields_no_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "Numb,BP,Payclass\n").unwrap();
        assert!(import_records(&path, "Sheet1").unwrap().is_empty());
    }

    #[test]
    fn test_empty_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blank.csv");
        fs::write(&path, "").unwrap();
        assert!(matches!(import_records(&path, "Sheet1"), Err(AdjustError::Parse(_))));
    }
}
