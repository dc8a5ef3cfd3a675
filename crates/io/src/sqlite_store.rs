// SQLite-backed reference store

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use payadj_recon::config::AdjustmentConfig;
use payadj_recon::model::{Employee, PayRateEntry};
use payadj_recon::rates::fold_description;
use payadj_recon::{AdjustError, ReferenceStore, StoreError};

/// Rate-row columns named `one_amount<grade>` carry the per-grade amounts.
const GRADE_COLUMN_PREFIX: &str = "one_amount";

const EMPLOYEES_QUERY: &str =
    "SELECT Empl_id, gradelevel, DateLeft, exittype FROM hr_employees";

/// Reference data held in one SQLite file per store identifier. Every query
/// opens its own read-only connection on the blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    employee_db: PathBuf,
    stores: BTreeMap<String, PathBuf>,
}

impl SqliteStore {
    pub fn new(employee_db: impl Into<PathBuf>, stores: BTreeMap<String, PathBuf>) -> Self {
        Self { employee_db: employee_db.into(), stores }
    }

    /// Build from `[stores]` and `reference.employee_store`; relative paths
    /// resolve against `base_dir` (normally the config file's directory).
    pub fn from_config(config: &AdjustmentConfig, base_dir: &Path) -> Result<Self, AdjustError> {
        if config.stores.is_empty() {
            return Err(AdjustError::ConfigValidation(
                "no reference stores declared under [stores]".into(),
            ));
        }
        let employee_store = config.reference.employee_store.as_deref().ok_or_else(|| {
            AdjustError::ConfigValidation(
                "reference.employee_store must name a declared store".into(),
            )
        })?;

        let stores: BTreeMap<String, PathBuf> = config
            .stores
            .iter()
            .map(|(id, store)| (id.clone(), base_dir.join(&store.path)))
            .collect();
        let employee_db = stores.get(employee_store).cloned().ok_or_else(|| {
            AdjustError::ConfigValidation(format!(
                "employee_store '{employee_store}' not declared under [stores]"
            ))
        })?;

        Ok(Self { employee_db, stores })
    }

    fn path_for(&self, store: &str) -> Result<PathBuf, StoreError> {
        self.stores
            .get(store)
            .cloned()
            .ok_or_else(|| StoreError::UnknownStore(store.to_string()))
    }
}

#[async_trait]
impl ReferenceStore for SqliteStore {
    async fn employees(&self) -> Result<Vec<Employee>, StoreError> {
        let path = self.employee_db.clone();
        tokio::task::spawn_blocking(move || query_employees(&path))
            .await
            .map_err(|e| StoreError::Unavailable(format!("employee query task failed: {e}")))?
    }

    async fn rate_entries(
        &self,
        store: &str,
        descriptions: &[String],
    ) -> Result<Vec<PayRateEntry>, StoreError> {
        if descriptions.is_empty() {
            return Ok(Vec::new());
        }
        let path = self.path_for(store)?;
        let descriptions = descriptions.to_vec();
        let entries = tokio::task::spawn_blocking(move || query_rate_entries(&path, &descriptions))
            .await
            .map_err(|e| StoreError::Unavailable(format!("rate query task failed: {e}")))??;
        debug!(store, entries = entries.len(), "rate entries loaded");
        Ok(entries)
    }
}

fn open_read_only(path: &Path) -> Result<Connection, StoreError> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e)))
}

fn unavailable(e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn query_employees(path: &Path) -> Result<Vec<Employee>, StoreError> {
    let conn = open_read_only(path)?;
    let mut stmt = conn.prepare(EMPLOYEES_QUERY).map_err(unavailable)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Employee {
                id: text_of(row.get_ref(0)?).unwrap_or_default(),
                grade_level: text_of(row.get_ref(1)?),
                date_left: text_of(row.get_ref(2)?),
                exit_type: text_of(row.get_ref(3)?),
            })
        })
        .map_err(unavailable)?;

    rows.collect::<Result<Vec<_>, _>>().map_err(unavailable)
}

/// Every payment type outer-joined with its per-grade rate row. Descriptions
/// are matched on the Rust side so folding agrees with
/// [`fold_description`] for all Unicode whitespace and letters.
const RATE_ENTRIES_QUERY: &str = "SELECT e.PaymentType, e.elmDesc, e.perc, e.Status, r.* \
     FROM py_elementType e \
     LEFT JOIN py_payperrank r ON r.one_type = e.PaymentType";

/// Payment types whose folded `elmDesc` is in `descriptions`.
fn query_rate_entries(
    path: &Path,
    descriptions: &[String],
) -> Result<Vec<PayRateEntry>, StoreError> {
    let wanted: HashSet<&str> = descriptions.iter().map(String::as_str).collect();
    let conn = open_read_only(path)?;
    let mut stmt = conn.prepare(RATE_ENTRIES_QUERY).map_err(unavailable)?;

    let grade_columns: Vec<(usize, String)> = stmt
        .column_names()
        .iter()
        .enumerate()
        .skip(4)
        .filter_map(|(idx, name)| grade_of_column(name).map(|grade| (idx, grade)))
        .collect();

    let rows = stmt
        .query_map([], |row| {
            let description = text_of(row.get_ref(1)?).unwrap_or_default();
            if !wanted.contains(fold_description(&description).as_str()) {
                return Ok(None);
            }
            let mut grade_amounts = BTreeMap::new();
            for (idx, grade) in &grade_columns {
                if let Some(amount) = number_of(row.get_ref(*idx)?) {
                    grade_amounts.insert(grade.clone(), amount);
                }
            }
            Ok(Some(PayRateEntry {
                payment_type: text_of(row.get_ref(0)?).unwrap_or_default(),
                description,
                perc: text_of(row.get_ref(2)?),
                status: text_of(row.get_ref(3)?),
                grade_amounts,
            }))
        })
        .map_err(unavailable)?;

    let mut entries = Vec::new();
    for row in rows {
        if let Some(entry) = row.map_err(unavailable)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// `one_amount04` -> `04`. Case-insensitive on the prefix.
fn grade_of_column(name: &str) -> Option<String> {
    let prefix = name.get(..GRADE_COLUMN_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(GRADE_COLUMN_PREFIX) {
        return None;
    }
    let grade = name[GRADE_COLUMN_PREFIX.len()..].trim();
    if grade.is_empty() {
        None
    } else {
        Some(grade.to_string())
    }
}

fn text_of(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(payadj_recon::model::format_number(f)),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}

fn number_of(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => std::str::from_utf8(t).ok()?.trim().parse().ok(),
    }
}
