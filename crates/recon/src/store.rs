//! Read-only query seam over the reference data.
//!
//! The engine never manages connections; it only needs an implementation of
//! [`ReferenceStore`]. [`MemoryStore`] serves tests and embedders that already
//! hold the reference data; `payadj-io` provides a SQLite-backed store.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::model::{Employee, PayRateEntry};
use crate::rates::fold_description;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or queried.
    Unavailable(String),
    /// No backing store is registered under this identifier.
    UnknownStore(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "{msg}"),
            Self::UnknownStore(store) => write!(f, "unknown store '{store}'"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Every employee, active or not.
    async fn employees(&self) -> Result<Vec<Employee>, StoreError>;

    /// Payment types in `store` whose [`fold_description`] is in
    /// `descriptions`, outer-joined with their per-grade rate row.
    async fn rate_entries(
        &self,
        store: &str,
        descriptions: &[String],
    ) -> Result<Vec<PayRateEntry>, StoreError>;
}

/// In-memory reference data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    employees: Vec<Employee>,
    rates: BTreeMap<String, Vec<PayRateEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employee(mut self, employee: Employee) -> Self {
        self.employees.push(employee);
        self
    }

    pub fn with_rate(mut self, store: &str, entry: PayRateEntry) -> Self {
        self.rates.entry(store.to_string()).or_default().push(entry);
        self
    }

    /// Register a store with no payment types.
    pub fn with_store(mut self, store: &str) -> Self {
        self.rates.entry(store.to_string()).or_default();
        self
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn employees(&self) -> Result<Vec<Employee>, StoreError> {
        Ok(self.employees.clone())
    }

    async fn rate_entries(
        &self,
        store: &str,
        descriptions: &[String],
    ) -> Result<Vec<PayRateEntry>, StoreError> {
        let entries = self
            .rates
            .get(store)
            .ok_or_else(|| StoreError::UnknownStore(store.to_string()))?;
        let wanted: HashSet<&str> = descriptions.iter().map(|d| d.as_str()).collect();
        Ok(entries
            .iter()
            .filter(|e| wanted.contains(fold_description(&e.description).as_str()))
            .cloned()
            .collect())
    }
}
