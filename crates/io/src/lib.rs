// File I/O operations

pub mod csv;
pub mod sqlite_store;
pub mod staging;
pub mod template;
pub mod upload;
pub mod xlsx;

use std::path::Path;

use payadj_recon::model::RawRecord;
use payadj_recon::AdjustError;

pub use sqlite_store::SqliteStore;
pub use upload::{process_upload, FileDelivery, UploadRequest, UploadResponse};

/// Extensions accepted for uploads, lower-case with the leading dot.
pub const ALLOWED_EXTENSIONS: [&str; 3] = [".xlsx", ".xls", ".csv"];

/// The two input container families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Multi-sheet workbook (xlsx, xls).
    Spreadsheet,
    /// Single delimited table (csv).
    FlatTable,
}

impl InputFormat {
    /// Format from a filename's extension (case-insensitive); `None` if not allowed.
    pub fn from_filename(name: &str) -> Option<Self> {
        match extension_of(name)?.as_str() {
            ".xlsx" | ".xls" => Some(Self::Spreadsheet),
            ".csv" => Some(Self::FlatTable),
            _ => None,
        }
    }
}

/// Lower-cased extension including the dot, e.g. `.xlsx`.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name.trim())
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

/// Parse a file on disk into raw records, dispatching on `format`.
pub fn ingest(
    path: &Path,
    format: InputFormat,
    default_sheet: &str,
) -> Result<Vec<RawRecord>, AdjustError> {
    match format {
        InputFormat::Spreadsheet => xlsx::import_records(path),
        InputFormat::FlatTable => csv::import_records(path, default_sheet),
    }
}
