use std::collections::HashSet;

use crate::config::DedupScope;
use crate::model::{NormalizedRecord, Value};

/// Comparable form of a single value: text is trimmed, numbers compare bitwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SignatureValue {
    Text(String),
    Number(u64),
}

/// Order-independent identity of a record, used only for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalSignature {
    sheet: Option<String>,
    fields: Vec<(String, SignatureValue)>,
}

pub fn signature(record: &NormalizedRecord, scope: DedupScope) -> CanonicalSignature {
    // BTreeMap iteration is already key-sorted
    let fields = record
        .fields
        .iter()
        .map(|(key, value)| {
            let v = match value {
                Value::Text(s) => SignatureValue::Text(s.trim().to_string()),
                // -0.0 and 0.0 are the same cell value
                Value::Number(n) if *n == 0.0 => SignatureValue::Number(0f64.to_bits()),
                Value::Number(n) => SignatureValue::Number(n.to_bits()),
            };
            (key.clone(), v)
        })
        .collect();

    let sheet = match scope {
        DedupScope::Workbook => None,
        DedupScope::Sheet => Some(record.sheet.clone()),
    };

    CanonicalSignature { sheet, fields }
}

#[derive(Debug, Default)]
pub struct Deduplicated {
    /// First occurrence of each signature, in input order.
    pub cleaned: Vec<NormalizedRecord>,
    /// Every later record whose signature was already seen.
    pub duplicates: Vec<NormalizedRecord>,
}

/// Single left-to-right pass against a growing signature set.
pub fn deduplicate(records: Vec<NormalizedRecord>, scope: DedupScope) -> Deduplicated {
    let mut seen: HashSet<CanonicalSignature> = HashSet::with_capacity(records.len());
    let mut out = Deduplicated::default();

    for record in records {
        if seen.insert(signature(&record, scope)) {
            out.cleaned.push(record);
        } else {
            out.duplicates.push(record);
        }
    }

    out
}
