use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::RecordDetail;

// ---------------------------------------------------------------------------
// Cell values
// ---------------------------------------------------------------------------

/// A populated scalar cell. Blank cells are never materialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(f64),
}

impl Value {
    /// Textual form; integral numbers render without decimals.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s.as_str()),
            Self::Number(n) => Cow::Owned(format_number(*n)),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

/// One parsed row, keyed by the header text exactly as found in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub sheet: String,
    /// 1-based spreadsheet row (the header is row 1).
    pub row: usize,
    pub fields: Vec<(String, Value)>,
}

impl RawRecord {
    pub fn new(sheet: impl Into<String>, row: usize) -> Self {
        Self { sheet: sheet.into(), row, fields: Vec::new() }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.push((key.to_string(), value.into()));
        self
    }

    pub fn is_blank(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A record whose keys went through [`crate::normalize::normalize_key`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub sheet: String,
    pub row: usize,
    pub fields: BTreeMap<String, Value>,
}

impl NormalizedRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Trimmed text of a field, `None` when absent or blank.
    pub fn text(&self, key: &str) -> Option<String> {
        let value = self.fields.get(key)?;
        let text = value.as_text();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Lower-cased trimmed text, the form used for case-insensitive keys.
    pub fn folded(&self, key: &str) -> Option<String> {
        self.text(key).map(|s| s.to_lowercase())
    }

    pub fn detail(
        &self,
        identifier_key: &str,
        pay_code_key: &str,
        message: impl Into<String>,
    ) -> RecordDetail {
        RecordDetail {
            sheet: self.sheet.clone(),
            row: self.row,
            identifier: self.text(identifier_key),
            pay_code: self.text(pay_code_key),
            message: message.into(),
        }
    }
}

/// An active-employee record carrying its derived grade code.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedRecord {
    pub record: NormalizedRecord,
    pub grade: Option<String>,
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Employee {
    pub id: String,
    pub grade_level: Option<String>,
    pub date_left: Option<String>,
    pub exit_type: Option<String>,
}

impl Employee {
    pub fn new(id: &str, grade_level: &str) -> Self {
        Self {
            id: id.to_string(),
            grade_level: Some(grade_level.to_string()),
            ..Default::default()
        }
    }

    /// Active iff neither a departure date nor an exit type is recorded.
    pub fn is_active(&self) -> bool {
        is_unset(&self.date_left) && is_unset(&self.exit_type)
    }
}

fn is_unset(field: &Option<String>) -> bool {
    field.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// A payment type joined with its (optional) per-grade rate row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PayRateEntry {
    pub payment_type: String,
    pub description: String,
    pub perc: Option<String>,
    pub status: Option<String>,
    /// Grade code -> amount. Empty when the payment type has no rate row.
    pub grade_amounts: BTreeMap<String, f64>,
}

impl PayRateEntry {
    pub fn is_active(&self, active_status: &str) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case(active_status))
    }

    pub fn is_fixed_rate(&self, flag: &str) -> bool {
        self.perc.as_deref().is_some_and(|p| p.trim() == flag)
    }

    /// Amount for a grade code; 0 when the grade has no amount.
    pub fn amount_for_grade(&self, grade: Option<&str>) -> f64 {
        grade
            .and_then(|g| self.grade_amounts.get(g))
            .copied()
            .filter(|n| n.is_finite())
            .unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

pub const MAKER_DEFAULT: &str = "No";
pub const MONTHS: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    #[serde(rename = "Service Number")]
    pub service_number: Value,
    #[serde(rename = "Payment Type")]
    pub payment_type: String,
    #[serde(rename = "Maker 1")]
    pub maker_1: String,
    #[serde(rename = "Amount Payable")]
    pub amount_payable: Option<Value>,
    #[serde(rename = "Maker 2")]
    pub maker_2: String,
    #[serde(rename = "Amount To Date")]
    pub amount_to_date: f64,
    #[serde(rename = "Payment Indicator")]
    pub payment_indicator: String,
    #[serde(rename = "Number of Months")]
    pub months: u32,
    #[serde(skip)]
    pub source_sheet: String,
}

impl OutputRecord {
    pub const HEADERS: [&'static str; 8] = [
        "Service Number",
        "Payment Type",
        "Maker 1",
        "Amount Payable",
        "Maker 2",
        "Amount To Date",
        "Payment Indicator",
        "Number of Months",
    ];

    /// Cells in [`Self::HEADERS`] order; `None` is an empty cell.
    pub fn cells(&self) -> [Option<Value>; 8] {
        [
            Some(self.service_number.clone()),
            Some(Value::Text(self.payment_type.clone())),
            Some(Value::Text(self.maker_1.clone())),
            self.amount_payable.clone(),
            Some(Value::Text(self.maker_2.clone())),
            Some(Value::Number(self.amount_to_date)),
            Some(Value::Text(self.payment_indicator.clone())),
            Some(Value::Number(f64::from(self.months))),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputSheet {
    pub name: String,
    pub records: Vec<OutputRecord>,
}

// ---------------------------------------------------------------------------
// Summary + Result
// ---------------------------------------------------------------------------

/// A non-fatal resolution failure for one payclass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingGap {
    pub payclass: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_unique_records: usize,
    pub inactive: usize,
    pub duplicates: usize,
    pub uploaded: usize,
    /// Records dropped because their payclass has no store mapping.
    pub unmapped: usize,
    /// Records dropped because their pay code matched no rate entry.
    pub unresolved: usize,
    pub failures: Vec<MappingGap>,
    pub dropped: Vec<RecordDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentResult {
    pub meta: RunMeta,
    pub summary: Summary,
    pub sheets: Vec<OutputSheet>,
}

impl AdjustmentResult {
    pub fn record_count(&self) -> usize {
        self.sheets.iter().map(|s| s.records.len()).sum()
    }
}
