use crate::config::{ColumnConfig, OutputConfig, RateConfig};
use crate::error::RecordDetail;
use crate::model::{GradedRecord, OutputRecord, Value, MAKER_DEFAULT, MONTHS};
use crate::rates::RateTable;

#[derive(Debug, Default)]
pub struct Computed {
    pub records: Vec<OutputRecord>,
    /// Records whose pay code matched no rate entry.
    pub unresolved: Vec<RecordDetail>,
    /// Distinct folded pay codes with no rate entry, in first-seen order.
    pub missing_pay_codes: Vec<String>,
}

/// Assign payment codes and amounts for one resolved payclass group.
///
/// `columns` must already be normalised.
pub fn compute_group(
    records: Vec<GradedRecord>,
    table: &RateTable,
    columns: &ColumnConfig,
    rates: &RateConfig,
    output: &OutputConfig,
) -> Computed {
    let mut computed = Computed::default();

    for graded in records {
        let record = &graded.record;
        let entry = record
            .folded(&columns.pay_code)
            .and_then(|code| table.lookup(&code));

        let Some(entry) = entry else {
            if let Some(code) = record.folded(&columns.pay_code) {
                if !computed.missing_pay_codes.contains(&code) {
                    computed.missing_pay_codes.push(code);
                }
            }
            computed.unresolved.push(record.detail(
                &columns.identifier,
                &columns.pay_code,
                "pay code has no matching rate entry",
            ));
            continue;
        };

        let explicit = record
            .get(&columns.amount)
            .filter(|v| !v.is_blank())
            .cloned();

        let amount_payable = match explicit {
            Some(amount) => Some(amount),
            None if entry.is_active(&rates.active_status)
                && entry.is_fixed_rate(&rates.fixed_rate_flag) =>
            {
                Some(Value::Number(entry.amount_for_grade(graded.grade.as_deref())))
            }
            None => None,
        };

        computed.records.push(OutputRecord {
            service_number: record
                .get(&columns.identifier)
                .cloned()
                .unwrap_or_else(|| Value::Text(String::new())),
            payment_type: entry.payment_type.clone(),
            maker_1: MAKER_DEFAULT.to_string(),
            amount_payable,
            maker_2: MAKER_DEFAULT.to_string(),
            amount_to_date: 0.0,
            payment_indicator: output.payment_indicator.clone(),
            months: MONTHS,
            source_sheet: record.sheet.clone(),
        });
    }

    computed
}
