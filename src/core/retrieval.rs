//! Deterministic service retrieval: three pure predicates, then truncation.
//!
//! Result order is catalog order. Nothing is re-ranked.

use crate::domain::model::{AgeGroup, NeedCategory, ServiceRecord, TargetAge, FALLBACK_LANGUAGE};

pub const MAX_RESULTS: usize = 5;

/// The record's category is one of the requested needs.
pub fn category_matches(record: &ServiceRecord, needs: &[NeedCategory]) -> bool {
    needs.iter().any(|need| need.tag() == record.category)
}

/// The record supports the visitor's language, or English.
pub fn language_compatible(record: &ServiceRecord, language: &str) -> bool {
    record
        .languages
        .iter()
        .any(|lang| lang == language || lang == FALLBACK_LANGUAGE)
}

/// Allow-list: `all`, `18+` for adult brackets, or the exact bracket.
pub fn age_compatible(record: &ServiceRecord, age_group: AgeGroup) -> bool {
    match &record.target_age {
        TargetAge::All => true,
        TargetAge::Adults => age_group.is_adult(),
        TargetAge::Bracket(bracket) => *bracket == age_group,
        TargetAge::Unrecognized(_) => false,
    }
}

/// Callers must reject an empty `needs` before calling; an empty slice simply matches nothing.
pub fn retrieve(
    catalog: &[ServiceRecord],
    needs: &[NeedCategory],
    language: &str,
    age_group: AgeGroup,
) -> Vec<ServiceRecord> {
    let results: Vec<ServiceRecord> = catalog
        .iter()
        .filter(|record| category_matches(record, needs))
        .filter(|record| language_compatible(record, language))
        .filter(|record| age_compatible(record, age_group))
        .take(MAX_RESULTS)
        .cloned()
        .collect();

    tracing::debug!(
        "Retrieved {} services for needs={:?}, language={}, age_group={}",
        results.len(),
        needs,
        language,
        age_group
    );
    results
}
