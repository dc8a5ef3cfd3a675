use std::collections::{HashMap, HashSet};

use crate::model::{Employee, GradedRecord, NormalizedRecord};

/// Number of leading grade-level characters that form the grade code.
pub const GRADE_CODE_LEN: usize = 2;

#[derive(Debug, Default)]
pub struct ActiveRecords {
    pub filtered: Vec<GradedRecord>,
    /// `|cleaned| - |filtered|`.
    pub inactive: usize,
}

/// First two characters of the raw grade level. A blank level has no code.
pub fn grade_code(grade_level: &str) -> Option<String> {
    if grade_level.trim().is_empty() {
        return None;
    }
    Some(grade_level.chars().take(GRADE_CODE_LEN).collect())
}

/// Keep records whose identifier belongs to an active employee and attach
/// that employee's grade code.
///
/// Membership is an exact match on the trimmed identifier; the grade lookup
/// additionally ignores case.
pub fn filter_active(
    cleaned: Vec<NormalizedRecord>,
    employees: &[Employee],
    identifier_key: &str,
) -> ActiveRecords {
    let active: Vec<&Employee> = employees.iter().filter(|e| e.is_active()).collect();

    let active_ids: HashSet<&str> = active.iter().map(|e| e.id.trim()).collect();
    let grade_levels: HashMap<String, Option<&str>> = active
        .iter()
        .map(|e| (e.id.trim().to_lowercase(), e.grade_level.as_deref()))
        .collect();

    let total = cleaned.len();
    let filtered: Vec<GradedRecord> = cleaned
        .into_iter()
        .filter_map(|record| {
            let id = record.text(identifier_key)?;
            if !active_ids.contains(id.as_str()) {
                return None;
            }
            let grade = grade_levels
                .get(&id.to_lowercase())
                .copied()
                .flatten()
                .and_then(grade_code);
            Some(GradedRecord { record, grade })
        })
        .collect();

    ActiveRecords {
        inactive: total - filtered.len(),
        filtered,
    }
}
