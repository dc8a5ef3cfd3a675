use std::collections::HashMap;

use crate::config::AdjustmentConfig;
use crate::model::GradedRecord;

/// Records sharing a payclass, bound to the store that holds its rates.
#[derive(Debug)]
pub struct PayclassGroup {
    pub payclass: String,
    pub store: String,
    pub records: Vec<GradedRecord>,
}

/// Records whose payclass has no configured store.
#[derive(Debug)]
pub struct UnmappedPayclass {
    pub payclass: String,
    pub records: Vec<GradedRecord>,
}

#[derive(Debug, Default)]
pub struct Grouped {
    /// In order of first appearance.
    pub groups: Vec<PayclassGroup>,
    pub unmapped: Vec<UnmappedPayclass>,
}

/// Partition by payclass value (trimmed text; absent = empty string).
pub fn group_by_payclass(
    filtered: Vec<GradedRecord>,
    payclass_key: &str,
    config: &AdjustmentConfig,
) -> Grouped {
    let mut order: Vec<(String, Vec<GradedRecord>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for graded in filtered {
        let payclass = graded.record.text(payclass_key).unwrap_or_default();
        let slot = *index.entry(payclass.clone()).or_insert_with(|| {
            order.push((payclass, Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(graded);
    }

    let mut grouped = Grouped::default();
    for (payclass, records) in order {
        match config.store_for(&payclass) {
            Some(store) => grouped.groups.push(PayclassGroup {
                store: store.to_string(),
                payclass,
                records,
            }),
            None => grouped.unmapped.push(UnmappedPayclass { payclass, records }),
        }
    }
    grouped
}
