use std::collections::BTreeMap;

use crate::model::{NormalizedRecord, RawRecord};

/// Canonical field name: trimmed, lower-cased, whitespace runs -> `_`.
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Canonicalize every key of a record. Colliding keys: last write wins.
pub fn normalize(raw: RawRecord) -> NormalizedRecord {
    let mut fields = BTreeMap::new();
    for (key, value) in raw.fields {
        fields.insert(normalize_key(&key), value);
    }
    NormalizedRecord {
        sheet: raw.sheet,
        row: raw.row,
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[test]
    fn keys() {
        assert_eq!(normalize_key("Numb"), "numb");
        assert_eq!(normalize_key("  Other   Names "), "other_names");
        assert_eq!(normalize_key("Pay\tClass"), "pay_class");
        assert_eq!(normalize_key("already_snake"), "already_snake");
        assert_eq!(normalize_key("   "), "");
    }

    #[test]
    fn colliding_keys_last_write_wins() {
        let raw = RawRecord::new("Sheet1", 2)
            .with("BP", "first")
            .with(" bp ", "second");
        let rec = normalize(raw);
        assert_eq!(rec.fields.len(), 1);
        assert_eq!(rec.get("bp"), Some(&Value::from("second")));
    }

    #[test]
    fn values_pass_through() {
        let raw = RawRecord::new("Officers", 7)
            .with("BPM", "  not a number ")
            .with("Payclass", 1.0);
        let rec = normalize(raw);
        assert_eq!(rec.sheet, "Officers");
        assert_eq!(rec.row, 7);
        assert_eq!(rec.get("bpm"), Some(&Value::from("  not a number ")));
        assert_eq!(rec.get("payclass"), Some(&Value::Number(1.0)));
    }
}
