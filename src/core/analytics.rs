//! Usage summary over the interaction log.

use crate::core::catalog::ServiceCatalog;
use crate::domain::model::InteractionRecord;
use crate::utils::error::{HandoutError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::io::Write;
use std::str::FromStr;

pub const TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyticsPeriod {
    AllTime,
    Last7Days,
    #[default]
    Last30Days,
    Last90Days,
}

impl AnalyticsPeriod {
    pub fn days(self) -> Option<i64> {
        match self {
            AnalyticsPeriod::AllTime => None,
            AnalyticsPeriod::Last7Days => Some(7),
            AnalyticsPeriod::Last30Days => Some(30),
            AnalyticsPeriod::Last90Days => Some(90),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AnalyticsPeriod::AllTime => "All time",
            AnalyticsPeriod::Last7Days => "Last 7 days",
            AnalyticsPeriod::Last30Days => "Last 30 days",
            AnalyticsPeriod::Last90Days => "Last 90 days",
        }
    }
}

impl FromStr for AnalyticsPeriod {
    type Err = HandoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "all-time" | "all_time" => Ok(AnalyticsPeriod::AllTime),
            "7" | "7d" => Ok(AnalyticsPeriod::Last7Days),
            "30" | "30d" => Ok(AnalyticsPeriod::Last30Days),
            "90" | "90d" => Ok(AnalyticsPeriod::Last90Days),
            other => Err(HandoutError::InvalidConfigValueError {
                field: "period".to_string(),
                value: other.to_string(),
                reason: "Expected one of: all, 7, 30, 90".to_string(),
            }),
        }
    }
}

/// Rows inside the period ending at `now`. Rows whose timestamp does not
/// parse are only kept for `AllTime`.
pub fn filter_period(
    records: &[InteractionRecord],
    period: AnalyticsPeriod,
    now: NaiveDateTime,
) -> Vec<InteractionRecord> {
    let Some(days) = period.days() else {
        return records.to_vec();
    };
    let cutoff = now - Duration::days(days);
    records
        .iter()
        .filter(|record| record.parsed_timestamp().is_some_and(|ts| ts >= cutoff))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UsageSummary {
    pub total_interactions: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub top_needs: Vec<(String, usize)>,
    pub top_services: Vec<(String, usize)>,
    pub by_housing: Vec<(String, usize)>,
    pub by_age: Vec<(String, usize)>,
}

/// Counts sorted by count descending, then key ascending.
fn ranked(counts: HashMap<String, usize>, limit: Option<usize>) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    ranked
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(';').map(str::trim).filter(|item| !item.is_empty())
}

pub fn summarize(records: &[InteractionRecord], catalog: &ServiceCatalog) -> UsageSummary {
    let dates: Vec<NaiveDate> = records
        .iter()
        .filter_map(|record| record.parsed_timestamp())
        .map(|ts| ts.date())
        .collect();

    let mut needs = HashMap::new();
    let mut services = HashMap::new();
    let mut housing = HashMap::new();
    let mut ages = HashMap::new();

    for record in records {
        for need in split_list(&record.needs) {
            *needs.entry(need.to_string()).or_insert(0) += 1;
        }
        // 目錄中找不到的 id 直接略過
        for name in split_list(&record.service_ids_kept)
            .filter_map(|id| id.parse::<u32>().ok())
            .filter_map(|id| catalog.get(id))
            .map(|svc| svc.name.clone())
        {
            *services.entry(name).or_insert(0) += 1;
        }
        if !record.housing_status.trim().is_empty() {
            *housing.entry(record.housing_status.trim().to_string()).or_insert(0) += 1;
        }
        if !record.age_group.trim().is_empty() {
            *ages.entry(record.age_group.trim().to_string()).or_insert(0) += 1;
        }
    }

    UsageSummary {
        total_interactions: records.len(),
        first_date: dates.iter().min().copied(),
        last_date: dates.iter().max().copied(),
        top_needs: ranked(needs, Some(TOP_N)),
        top_services: ranked(services, Some(TOP_N)),
        by_housing: ranked(housing, None),
        by_age: ranked(ages, None),
    }
}

/// Writes the rows with the interaction log header.
pub fn export_csv<W: Write>(records: &[InteractionRecord], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if records.is_empty() {
        csv_writer.write_record(crate::domain::model::INTERACTION_COLUMNS)?;
    }
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ServiceRecord, TargetAge, INTERACTION_COLUMNS};

    fn record(timestamp: &str, needs: &str, kept: &str, housing: &str, age: &str) -> InteractionRecord {
        InteractionRecord {
            interaction_id: format!("{}_x", timestamp),
            timestamp: timestamp.to_string(),
            site: "NFCM".to_string(),
            age_group: age.to_string(),
            language: "English".to_string(),
            housing_status: housing.to_string(),
            needs: needs.to_string(),
            service_ids_kept: kept.to_string(),
            service_ids_removed: String::new(),
            num_services_kept: split_list(kept).count(),
        }
    }

    fn catalog() -> ServiceCatalog {
        let service = |id: u32, name: &str| ServiceRecord {
            id,
            name: name.to_string(),
            description: String::new(),
            category: "food".to_string(),
            languages: vec!["English".to_string()],
            target_age: TargetAge::All,
            hours_today: String::new(),
            address: String::new(),
            eligibility: String::new(),
        };
        ServiceCatalog::new(vec![service(1, "Food Bank"), service(2, "Soup Kitchen")]).unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 31)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn records() -> Vec<InteractionRecord> {
        vec![
            record("2025-05-30T10:00:00", "food;housing", "1;2", "Shelter", "18-29"),
            record("2025-05-10T10:00:00", "food", "1;99", "Shelter", "55+"),
            record("2025-02-01T10:00:00", "health", "2", "Stably housed", "55+"),
            record("yesterday", "food", "1", "", "55+"),
        ]
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("all".parse::<AnalyticsPeriod>().unwrap(), AnalyticsPeriod::AllTime);
        assert_eq!("30".parse::<AnalyticsPeriod>().unwrap(), AnalyticsPeriod::Last30Days);
        assert!("14".parse::<AnalyticsPeriod>().is_err());
        assert_eq!(AnalyticsPeriod::default(), AnalyticsPeriod::Last30Days);
    }

    #[test]
    fn test_filter_period_drops_unparseable_rows() {
        let all = filter_period(&records(), AnalyticsPeriod::AllTime, now());
        assert_eq!(all.len(), 4);

        let week = filter_period(&records(), AnalyticsPeriod::Last7Days, now());
        assert_eq!(week.len(), 1);

        let month = filter_period(&records(), AnalyticsPeriod::Last30Days, now());
        assert_eq!(month.len(), 2);

        let quarter = filter_period(&records(), AnalyticsPeriod::Last90Days, now());
        assert_eq!(quarter.len(), 2);
    }

    #[test]
    fn test_summarize_counts() {
        let summary = summarize(&records(), &catalog());

        assert_eq!(summary.total_interactions, 4);
        assert_eq!(summary.first_date, NaiveDate::from_ymd_opt(2025, 2, 1));
        assert_eq!(summary.last_date, NaiveDate::from_ymd_opt(2025, 5, 30));
        assert_eq!(
            summary.top_needs,
            vec![
                ("food".to_string(), 3),
                ("health".to_string(), 1),
                ("housing".to_string(), 1)
            ]
        );
        assert_eq!(
            summary.top_services,
            vec![("Food Bank".to_string(), 3), ("Soup Kitchen".to_string(), 2)]
        );
        assert_eq!(
            summary.by_housing,
            vec![("Shelter".to_string(), 2), ("Stably housed".to_string(), 1)]
        );
        assert_eq!(summary.by_age[0], ("55+".to_string(), 3));
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[], &catalog());
        assert_eq!(summary, UsageSummary::default());
    }

    #[test]
    fn test_export_csv_writes_header() {
        let mut buffer = Vec::new();
        export_csv(&records()[..1], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(INTERACTION_COLUMNS.join(",").as_str()));
        assert!(lines.next().unwrap().contains("food;housing"));

        let mut empty = Vec::new();
        export_csv(&[], &mut empty).unwrap();
        assert_eq!(String::from_utf8(empty).unwrap().trim_end(), INTERACTION_COLUMNS.join(","));
    }
}
