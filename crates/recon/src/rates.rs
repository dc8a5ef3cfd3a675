use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::AdjustError;
use crate::model::{GradedRecord, PayRateEntry};
use crate::store::{ReferenceStore, StoreError};

/// Case-insensitive key for pay-code descriptions.
pub fn fold_description(description: &str) -> String {
    description.trim().to_lowercase()
}

/// Distinct folded pay-code descriptions of a group, blanks discarded.
/// Sorted so the store sees the same query for the same input.
pub fn descriptions(records: &[GradedRecord], pay_code_key: &str) -> Vec<String> {
    records
        .iter()
        .filter_map(|g| g.record.folded(pay_code_key))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Folded description -> rate entry for one store.
#[derive(Debug, Default)]
pub struct RateTable {
    by_description: HashMap<String, PayRateEntry>,
}

impl RateTable {
    /// Several payment types sharing a description: the last one seen wins.
    pub fn from_entries(entries: Vec<PayRateEntry>) -> Self {
        let mut by_description = HashMap::with_capacity(entries.len());
        for entry in entries {
            by_description.insert(fold_description(&entry.description), entry);
        }
        Self { by_description }
    }

    pub fn lookup(&self, description: &str) -> Option<&PayRateEntry> {
        self.by_description.get(&fold_description(description))
    }

    pub fn len(&self) -> usize {
        self.by_description.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_description.is_empty()
    }
}

/// Await a store query, mapping failures and timeouts to
/// [`AdjustError::ReferenceUnavailable`].
pub async fn bounded<T, F>(store: &str, timeout: Duration, query: F) -> Result<T, AdjustError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, query).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(AdjustError::ReferenceUnavailable {
            store: store.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Err(AdjustError::ReferenceUnavailable {
            store: store.to_string(),
            message: format!("query timed out after {}s", timeout.as_secs()),
        }),
    }
}

/// One query against `store_id` for every description of the group.
pub async fn resolve_rates<S>(
    store: &S,
    store_id: &str,
    descriptions: &[String],
    timeout: Duration,
) -> Result<RateTable, AdjustError>
where
    S: ReferenceStore + ?Sized,
{
    let entries = bounded(store_id, timeout, store.rate_entries(store_id, descriptions)).await?;
    debug!(
        store = store_id,
        requested = descriptions.len(),
        returned = entries.len(),
        "rate entries fetched"
    );
    Ok(RateTable::from_entries(entries))
}
