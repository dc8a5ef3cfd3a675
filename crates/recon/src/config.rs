use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::error::AdjustError;
use crate::normalize::normalize_key;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustmentConfig {
    pub name: String,
    /// Payclass value -> store identifier.
    #[serde(default)]
    pub payclasses: BTreeMap<String, String>,
    /// Store identifier -> location, consumed by concrete store backends.
    #[serde(default)]
    pub stores: BTreeMap<String, StoreConfig>,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub columns: ColumnConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub rates: RateConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

impl Default for AdjustmentConfig {
    fn default() -> Self {
        Self {
            name: "payroll adjustments".into(),
            payclasses: BTreeMap::new(),
            stores: BTreeMap::new(),
            reference: ReferenceConfig::default(),
            columns: ColumnConfig::default(),
            dedup: DedupConfig::default(),
            rates: RateConfig::default(),
            output: OutputConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    /// Store holding the employee table.
    #[serde(default)]
    pub employee_store: Option<String>,
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
}

fn default_query_timeout() -> u64 {
    30
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            employee_store: None,
            query_timeout_secs: default_query_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Input column names. Normalised before use, so "Service Number" and
/// "service_number" are the same column.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub identifier: String,
    pub pay_code: String,
    pub amount: String,
    pub payclass: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            identifier: "numb".into(),
            pay_code: "bp".into(),
            amount: "bpm".into(),
            payclass: "payclass".into(),
        }
    }
}

impl ColumnConfig {
    /// The same columns with every name normalised.
    pub fn normalized(&self) -> ColumnConfig {
        ColumnConfig {
            identifier: normalize_key(&self.identifier),
            pay_code: normalize_key(&self.pay_code),
            amount: normalize_key(&self.amount),
            payclass: normalize_key(&self.payclass),
        }
    }
}

// ---------------------------------------------------------------------------
// Dedup, Rates, Output, Upload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupScope {
    /// Identical rows on different sheets are duplicates.
    #[default]
    Workbook,
    /// The sheet name is part of the signature.
    Sheet,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DedupConfig {
    #[serde(default)]
    pub scope: DedupScope,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    pub fixed_rate_flag: String,
    pub active_status: String,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            fixed_rate_flag: "R".into(),
            active_status: "active".into(),
        }
    }
}

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub filename: String,
    pub default_sheet: String,
    pub payment_indicator: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            filename: "payroll-adjustments.xlsx".into(),
            default_sheet: "Sheet1".into(),
            payment_indicator: "T".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: u64,
    pub staging_dir: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            staging_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl AdjustmentConfig {
    pub fn from_toml(input: &str) -> Result<Self, AdjustError> {
        let config: AdjustmentConfig =
            toml::from_str(input).map_err(|e| AdjustError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AdjustError> {
        if self.name.trim().is_empty() {
            return Err(AdjustError::ConfigValidation("name must not be empty".into()));
        }

        // Store references only checked once stores are declared
        if !self.stores.is_empty() {
            for (payclass, store) in &self.payclasses {
                if !self.stores.contains_key(store) {
                    return Err(AdjustError::ConfigValidation(format!(
                        "payclass '{payclass}': store '{store}' not declared under [stores]"
                    )));
                }
            }
            if let Some(ref emp) = self.reference.employee_store {
                if !self.stores.contains_key(emp) {
                    return Err(AdjustError::ConfigValidation(format!(
                        "employee_store '{emp}' not declared under [stores]"
                    )));
                }
            }
        }

        for (payclass, store) in &self.payclasses {
            if payclass.trim().is_empty() || store.trim().is_empty() {
                return Err(AdjustError::ConfigValidation(
                    "payclass mappings must have non-empty keys and stores".into(),
                ));
            }
        }

        let cols = self.columns.normalized();
        let names = [
            ("identifier", &cols.identifier),
            ("pay_code", &cols.pay_code),
            ("amount", &cols.amount),
            ("payclass", &cols.payclass),
        ];
        let mut seen = HashSet::new();
        for (field, name) in names {
            if name.is_empty() {
                return Err(AdjustError::ConfigValidation(format!(
                    "columns.{field} must not be empty"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(AdjustError::ConfigValidation(format!(
                    "columns.{field}: '{name}' is used by another column"
                )));
            }
        }

        if self.reference.query_timeout_secs == 0 {
            return Err(AdjustError::ConfigValidation(
                "reference.query_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.upload.max_bytes == 0 {
            return Err(AdjustError::ConfigValidation(
                "upload.max_bytes must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Store mapped to a payclass value (trimmed).
    pub fn store_for(&self, payclass: &str) -> Option<&str> {
        self.payclasses.get(payclass.trim()).map(|s| s.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
