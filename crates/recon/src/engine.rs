use std::time::Duration;

use futures::future::try_join_all;
use tracing::{info, warn};

use crate::amount::compute_group;
use crate::assemble::assemble_sheets;
use crate::config::AdjustmentConfig;
use crate::dedup::deduplicate;
use crate::error::AdjustError;
use crate::group::group_by_payclass;
use crate::model::{AdjustmentResult, MappingGap, RawRecord, RunMeta, Summary};
use crate::normalize::normalize;
use crate::rates::{bounded, descriptions, resolve_rates, RateTable};
use crate::resolve::filter_active;
use crate::store::ReferenceStore;

/// Label used in errors raised by the employee query.
pub const EMPLOYEE_STORE: &str = "employees";

/// Run the reconciliation pipeline over ingested records.
///
/// Fails with `Validation` when no usable record remains and with
/// `ReferenceUnavailable` when any store query fails or times out; in both
/// cases nothing partial is returned. Mapping gaps are collected in the
/// summary instead.
pub async fn run<S>(
    config: &AdjustmentConfig,
    records: Vec<RawRecord>,
    store: &S,
) -> Result<AdjustmentResult, AdjustError>
where
    S: ReferenceStore + ?Sized,
{
    let columns = config.columns.normalized();
    let timeout = Duration::from_secs(config.reference.query_timeout_secs);

    // Normalize, dropping blank records
    let normalized: Vec<_> = records
        .into_iter()
        .filter(|r| !r.is_blank())
        .map(normalize)
        .collect();

    if normalized.is_empty() {
        return Err(AdjustError::validation("File is empty or invalid"));
    }

    if normalized.iter().all(|r| r.text(&columns.identifier).is_none()) {
        let details = normalized
            .iter()
            .map(|r| {
                r.detail(
                    &columns.identifier,
                    &columns.pay_code,
                    format!("missing identifier '{}'", columns.identifier),
                )
            })
            .collect();
        return Err(AdjustError::Validation {
            message: format!("no record carries an identifier in column '{}'", columns.identifier),
            details,
        });
    }

    let parsed = normalized.len();
    let dedup = deduplicate(normalized, config.dedup.scope);
    let total_unique = dedup.cleaned.len();
    let duplicates = dedup.duplicates.len();
    info!(parsed, unique = total_unique, duplicates, "records deduplicated");

    let employees = bounded(EMPLOYEE_STORE, timeout, store.employees()).await?;
    let active = filter_active(dedup.cleaned, &employees, &columns.identifier);
    info!(
        employees = employees.len(),
        retained = active.filtered.len(),
        inactive = active.inactive,
        "active employee filter applied"
    );

    let mut summary = Summary {
        total_unique_records: total_unique,
        inactive: active.inactive,
        duplicates,
        ..Summary::default()
    };

    let grouped = group_by_payclass(active.filtered, &columns.payclass, config);

    for gap in &grouped.unmapped {
        warn!(
            payclass = %gap.payclass,
            records = gap.records.len(),
            "no reference store mapped for payclass, skipping"
        );
        summary.unmapped += gap.records.len();
        summary.failures.push(MappingGap {
            payclass: gap.payclass.clone(),
            reason: "no reference store mapped for payclass".into(),
        });
        summary.dropped.extend(gap.records.iter().map(|g| {
            g.record.detail(
                &columns.identifier,
                &columns.pay_code,
                format!("payclass '{}' has no reference store", gap.payclass),
            )
        }));
    }

    // Groups are independent once partitioned, so their queries run concurrently.
    let wanted: Vec<Vec<String>> = grouped
        .groups
        .iter()
        .map(|g| descriptions(&g.records, &columns.pay_code))
        .collect();
    let tables: Vec<Option<RateTable>> = try_join_all(grouped.groups.iter().zip(&wanted).map(
        |(group, descs)| async move {
            if descs.is_empty() {
                return Ok(None);
            }
            resolve_rates(store, &group.store, descs, timeout).await.map(Some)
        },
    ))
    .await?;

    let mut emitted = Vec::new();
    for (group, table) in grouped.groups.into_iter().zip(tables) {
        let Some(table) = table else {
            warn!(payclass = %group.payclass, "payclass group has no pay codes, skipping");
            summary.unresolved += group.records.len();
            summary.failures.push(MappingGap {
                payclass: group.payclass.clone(),
                reason: "no pay code descriptions in group".into(),
            });
            summary.dropped.extend(group.records.iter().map(|g| {
                g.record.detail(&columns.identifier, &columns.pay_code, "missing pay code")
            }));
            continue;
        };

        let computed =
            compute_group(group.records, &table, &columns, &config.rates, &config.output);
        for code in &computed.missing_pay_codes {
            warn!(
                payclass = %group.payclass,
                store = %group.store,
                pay_code = %code,
                "pay code has no rate entry"
            );
            summary.failures.push(MappingGap {
                payclass: group.payclass.clone(),
                reason: format!("pay code '{code}' has no rate entry in store '{}'", group.store),
            });
        }
        summary.unresolved += computed.unresolved.len();
        summary.dropped.extend(computed.unresolved);
        emitted.extend(computed.records);
    }

    summary.uploaded = emitted.len();
    let sheets = assemble_sheets(emitted, &config.output.default_sheet);

    info!(
        uploaded = summary.uploaded,
        sheets = sheets.len(),
        unmapped = summary.unmapped,
        unresolved = summary.unresolved,
        "adjustments assembled"
    );

    Ok(AdjustmentResult {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        sheets,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::{Employee, PayRateEntry, Value};
    use crate::store::{MemoryStore, MockReferenceStore, StoreError};

    fn config() -> AdjustmentConfig {
        AdjustmentConfig::from_toml(
            r#"
name = "engine test"
[payclasses]
"1" = "officers"
"3" = "ratings"
"#,
        )
        .unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_employee(Employee::new("NN001", "0401"))
            .with_employee(Employee::new("NN002", "0802"))
            .with_rate(
                "officers",
                PayRateEntry {
                    payment_type: "PT330".into(),
                    description: "Revised Consolidated Pay".into(),
                    perc: Some("R".into()),
                    status: Some("Active".into()),
                    grade_amounts: BTreeMap::from([("04".to_string(), 237007.92)]),
                },
            )
            .with_store("ratings")
    }

    fn row(sheet: &str, n: usize, numb: &str, bp: &str, payclass: &str) -> RawRecord {
        RawRecord::new(sheet, n)
            .with("Numb", numb)
            .with("BP", bp)
            .with("Payclass", payclass)
    }

    #[tokio::test]
    async fn empty_input_is_validation_error() {
        let err = run(&config(), vec![RawRecord::new("Sheet1", 2)], &store())
            .await
            .unwrap_err();
        assert!(matches!(err, AdjustError::Validation { .. }));
        assert_eq!(err.to_string(), "File is empty or invalid");
    }

    #[tokio::test]
    async fn missing_identifier_column_lists_rows() {
        let records = vec![
            RawRecord::new("Sheet1", 2).with("Service", "NN001").with("BP", "Bonus"),
            RawRecord::new("Sheet1", 3).with("Service", "NN002"),
        ];
        let err = run(&config(), records, &store()).await.unwrap_err();
        assert_eq!(err.details().len(), 2);
        assert_eq!(err.details()[0].row, 2);
        assert_eq!(err.details()[0].pay_code.as_deref(), Some("Bonus"));
    }

    #[tokio::test]
    async fn end_to_end_counts() {
        let records = vec![
            row("Officers", 2, "NN001", "Revised Consolidated Pay", "1"),
            row("Officers", 3, "NN001", " Revised Consolidated Pay ", "1"),
            row("Officers", 4, "NN999", "Revised Consolidated Pay", "1"),
            row("Officers", 5, "NN002", "Unknown Pay", "1"),
            row("Officers", 6, "NN002", "Revised Consolidated Pay", "7"),
        ];
        let result = run(&config(), records, &store()).await.unwrap();
        let s = &result.summary;
        assert_eq!(s.total_unique_records, 4);
        assert_eq!(s.duplicates, 1);
        assert_eq!(s.inactive, 1);
        assert_eq!(s.uploaded, 1);
        assert_eq!(s.unmapped, 1);
        assert_eq!(s.unresolved, 1);
        assert_eq!(s.failures.len(), 2);
        assert_eq!(s.dropped.len(), 2);
        assert_eq!(result.sheets.len(), 1);
        assert_eq!(
            result.sheets[0].records[0].amount_payable,
            Some(Value::Number(237007.92))
        );
        assert_eq!(result.meta.config_name, "engine test");
    }

    #[tokio::test]
    async fn group_without_pay_codes_issues_no_query() {
        let mut mock = MockReferenceStore::new();
        mock.expect_employees()
            .returning(|| Ok(vec![Employee::new("NN001", "0401")]));
        mock.expect_rate_entries().never();

        let records = vec![RawRecord::new("Sheet1", 2).with("Numb", "NN001").with("Payclass", "1")];
        let result = run(&config(), records, &mock).await.unwrap();
        assert_eq!(result.summary.uploaded, 0);
        assert_eq!(result.summary.unresolved, 1);
        assert_eq!(result.summary.failures[0].payclass, "1");
    }

    #[tokio::test]
    async fn employee_store_failure_aborts() {
        let mut mock = MockReferenceStore::new();
        mock.expect_employees()
            .returning(|| Err(StoreError::Unavailable("connection refused".into())));

        let records = vec![row("Sheet1", 2, "NN001", "Revised Consolidated Pay", "1")];
        let err = run(&config(), records, &mock).await.unwrap_err();
        match err {
            AdjustError::ReferenceUnavailable { store, message } => {
                assert_eq!(store, EMPLOYEE_STORE);
                assert_eq!(message, "connection refused");
            }
            other => panic!("expected ReferenceUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_store_failure_aborts_without_partial_output() {
        let mut mock = MockReferenceStore::new();
        mock.expect_employees()
            .returning(|| Ok(vec![Employee::new("NN001", "0401"), Employee::new("NN002", "0401")]));
        mock.expect_rate_entries()
            .withf(|store, _| store == "officers")
            .returning(|_, _| Ok(Vec::new()));
        mock.expect_rate_entries()
            .withf(|store, _| store == "ratings")
            .returning(|_, _| Err(StoreError::Unavailable("login failed".into())));

        let records = vec![
            row("Sheet1", 2, "NN001", "Revised Consolidated Pay", "1"),
            row("Sheet1", 3, "NN002", "Kit Allowance", "3"),
        ];
        let err = run(&config(), records, &mock).await.unwrap_err();
        assert!(matches!(
            err,
            AdjustError::ReferenceUnavailable { ref store, .. } if store == "ratings"
        ));
    }
}
