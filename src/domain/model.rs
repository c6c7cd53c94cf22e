use crate::utils::error::{HandoutError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Universal fallback: a service offered in English is shown to every visitor.
pub const FALLBACK_LANGUAGE: &str = "English";

/// Display languages offered at the front desk. Any other string is accepted too.
pub const DISPLAY_LANGUAGES: [&str; 5] = ["Cree", "Inuktitut", "English", "French", "Other"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "Under 18")]
    Under18,
    #[serde(rename = "18-29")]
    From18To29,
    #[serde(rename = "30-54")]
    From30To54,
    #[serde(rename = "55+")]
    Over55,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 4] = [
        AgeGroup::Under18,
        AgeGroup::From18To29,
        AgeGroup::From30To54,
        AgeGroup::Over55,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::Under18 => "Under 18",
            AgeGroup::From18To29 => "18-29",
            AgeGroup::From30To54 => "30-54",
            AgeGroup::Over55 => "55+",
        }
    }

    pub fn is_adult(self) -> bool {
        !matches!(self, AgeGroup::Under18)
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AgeGroup {
    type Err = HandoutError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        let group = match normalized.as_str() {
            "under 18" | "under18" | "under-18" => AgeGroup::Under18,
            "18-29" => AgeGroup::From18To29,
            "30-54" => AgeGroup::From30To54,
            "55+" => AgeGroup::Over55,
            _ => {
                return Err(HandoutError::InvalidConfigValueError {
                    field: "age_group".to_string(),
                    value: s.to_string(),
                    reason: "Expected one of: Under 18, 18-29, 30-54, 55+".to_string(),
                })
            }
        };
        Ok(group)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HousingStatus {
    #[default]
    #[serde(rename = "Not specified")]
    NotSpecified,
    #[serde(rename = "Homeless / unstably housed")]
    Unstable,
    #[serde(rename = "Stably housed")]
    Stable,
    #[serde(rename = "Shelter")]
    Shelter,
}

impl HousingStatus {
    pub fn label(self) -> &'static str {
        match self {
            HousingStatus::NotSpecified => "Not specified",
            HousingStatus::Unstable => "Homeless / unstably housed",
            HousingStatus::Stable => "Stably housed",
            HousingStatus::Shelter => "Shelter",
        }
    }
}

impl fmt::Display for HousingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for HousingStatus {
    type Err = HandoutError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        let status = match normalized.as_str() {
            "" | "not specified" | "not-specified" | "unknown" => HousingStatus::NotSpecified,
            "homeless / unstably housed" | "homeless" | "unstable" => HousingStatus::Unstable,
            "stably housed" | "stable" | "housed" => HousingStatus::Stable,
            "shelter" => HousingStatus::Shelter,
            _ => {
                return Err(HandoutError::InvalidConfigValueError {
                    field: "housing_status".to_string(),
                    value: s.to_string(),
                    reason: "Expected one of: not-specified, homeless, stable, shelter"
                        .to_string(),
                })
            }
        };
        Ok(status)
    }
}

/// Closed need vocabulary. The tag is what the catalog `category` column carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedCategory {
    Food,
    Health,
    MentalHealth,
    Housing,
    Clothing,
    Employment,
    FamilySupport,
    Culture,
}

impl NeedCategory {
    pub const ALL: [NeedCategory; 8] = [
        NeedCategory::Food,
        NeedCategory::Health,
        NeedCategory::MentalHealth,
        NeedCategory::Housing,
        NeedCategory::Clothing,
        NeedCategory::Employment,
        NeedCategory::FamilySupport,
        NeedCategory::Culture,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            NeedCategory::Food => "food",
            NeedCategory::Health => "health",
            NeedCategory::MentalHealth => "mental_health",
            NeedCategory::Housing => "housing",
            NeedCategory::Clothing => "clothing",
            NeedCategory::Employment => "employment",
            NeedCategory::FamilySupport => "family_support",
            NeedCategory::Culture => "culture",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NeedCategory::Food => "Food",
            NeedCategory::Health => "Health & Wellness",
            NeedCategory::MentalHealth => "Mental Health",
            NeedCategory::Housing => "Housing & Shelter",
            NeedCategory::Clothing => "Clothes & Hygiene",
            NeedCategory::Employment => "Work / Employment",
            NeedCategory::FamilySupport => "Family & Children",
            NeedCategory::Culture => "Culture / Community",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            NeedCategory::Food => "🍽️",
            NeedCategory::Health => "🩺",
            NeedCategory::MentalHealth => "🧠",
            NeedCategory::Housing => "🏠",
            NeedCategory::Clothing => "🧥",
            NeedCategory::Employment => "💼",
            NeedCategory::FamilySupport => "👨‍👩‍👧",
            NeedCategory::Culture => "🌿",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|need| need.tag() == tag)
    }
}

impl fmt::Display for NeedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for NeedCategory {
    type Err = HandoutError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::from_tag(&normalized).ok_or_else(|| HandoutError::InvalidConfigValueError {
            field: "needs".to_string(),
            value: s.to_string(),
            reason: format!(
                "Unknown need. Valid needs: {}",
                Self::ALL.map(NeedCategory::tag).join(", ")
            ),
        })
    }
}

/// Eligibility declared by the catalog for a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAge {
    All,
    Adults,
    Bracket(AgeGroup),
    /// Kept so the row still loads; it matches no visitor.
    Unrecognized(String),
}

impl TargetAge {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "all" => TargetAge::All,
            "18+" => TargetAge::Adults,
            other => AgeGroup::ALL
                .into_iter()
                .find(|group| group.label() == other)
                .map(TargetAge::Bracket)
                .unwrap_or_else(|| TargetAge::Unrecognized(other.to_string())),
        }
    }
}

impl fmt::Display for TargetAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAge::All => f.write_str("all"),
            TargetAge::Adults => f.write_str("18+"),
            TargetAge::Bracket(group) => f.write_str(group.label()),
            TargetAge::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub category: String,
    pub languages: Vec<String>,
    pub target_age: TargetAge,
    pub hours_today: String,
    pub address: String,
    pub eligibility: String,
}

/// One visitor's answers at the front desk. Lives for a single session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorContext {
    pub age_group: AgeGroup,
    pub language: String,
    pub housing_status: HousingStatus,
    pub needs: Vec<NeedCategory>,
}

impl VisitorContext {
    /// Duplicated needs collapse to their first occurrence.
    pub fn new(
        age_group: AgeGroup,
        language: impl Into<String>,
        housing_status: HousingStatus,
        needs: impl IntoIterator<Item = NeedCategory>,
    ) -> Self {
        let mut unique = Vec::new();
        for need in needs {
            if !unique.contains(&need) {
                unique.push(need);
            }
        }
        Self {
            age_group,
            language: language.into(),
            housing_status,
            needs: unique,
        }
    }

    pub fn needs_joined(&self, separator: &str) -> String {
        self.needs
            .iter()
            .map(|need| need.tag())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// Intro and closing paragraphs recovered from generated text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandoutText {
    pub intro: String,
    pub closing: String,
}

/// Input to the text generation capability.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// One row of the interaction log; the column order is the sink schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub interaction_id: String,
    pub timestamp: String,
    pub site: String,
    pub age_group: String,
    pub language: String,
    pub housing_status: String,
    pub needs: String,
    pub service_ids_kept: String,
    pub service_ids_removed: String,
    pub num_services_kept: usize,
}

pub const INTERACTION_COLUMNS: [&str; 10] = [
    "interaction_id",
    "timestamp",
    "site",
    "age_group",
    "language",
    "housing_status",
    "needs",
    "service_ids_kept",
    "service_ids_removed",
    "num_services_kept",
];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

impl InteractionRecord {
    pub fn new(
        context: &VisitorContext,
        kept: &[ServiceRecord],
        removed_ids: &[u32],
        site: &str,
        at: NaiveDateTime,
    ) -> Self {
        let timestamp = at.format(TIMESTAMP_FORMAT).to_string();
        Self {
            interaction_id: format!("{}_{}", timestamp, kept.len()),
            timestamp,
            site: site.to_string(),
            age_group: context.age_group.label().to_string(),
            language: context.language.clone(),
            housing_status: context.housing_status.label().to_string(),
            needs: context.needs_joined(";"),
            service_ids_kept: join_ids(kept.iter().map(|svc| svc.id)),
            service_ids_removed: join_ids(removed_ids.iter().copied()),
            num_services_kept: kept.len(),
        }
    }

    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.timestamp.trim(), TIMESTAMP_FORMAT).ok()
    }

    /// Row values in column order, as sent to row-oriented sinks.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.interaction_id.clone(),
            self.timestamp.clone(),
            self.site.clone(),
            self.age_group.clone(),
            self.language.clone(),
            self.housing_status.clone(),
            self.needs.clone(),
            self.service_ids_kept.clone(),
            self.service_ids_removed.clone(),
            self.num_services_kept.to_string(),
        ]
    }
}

fn join_ids(ids: impl Iterator<Item = u32>) -> String {
    ids.map(|id| id.to_string()).collect::<Vec<_>>().join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_target_age_parsing_is_strict() {
        assert_eq!(TargetAge::parse("all"), TargetAge::All);
        assert_eq!(TargetAge::parse("18+"), TargetAge::Adults);
        assert_eq!(TargetAge::parse("55+"), TargetAge::Bracket(AgeGroup::Over55));
        assert_eq!(
            TargetAge::parse("seniors"),
            TargetAge::Unrecognized("seniors".to_string())
        );
        assert!(matches!(TargetAge::parse("All"), TargetAge::Unrecognized(_)));
    }

    #[test]
    fn test_visitor_context_dedups_needs_in_order() {
        let context = VisitorContext::new(
            AgeGroup::From18To29,
            "Cree",
            HousingStatus::NotSpecified,
            [NeedCategory::Food, NeedCategory::Housing, NeedCategory::Food],
        );
        assert_eq!(context.needs, vec![NeedCategory::Food, NeedCategory::Housing]);
        assert_eq!(context.needs_joined(";"), "food;housing");
    }

    #[test]
    fn test_need_parsing_accepts_dashes() {
        assert_eq!(
            "mental-health".parse::<NeedCategory>().unwrap(),
            NeedCategory::MentalHealth
        );
        assert!("transport".parse::<NeedCategory>().is_err());
    }

    #[test]
    fn test_interaction_record_fields() {
        let context = VisitorContext::new(
            AgeGroup::From30To54,
            "French",
            HousingStatus::Shelter,
            [NeedCategory::Food, NeedCategory::Clothing],
        );
        let kept = vec![ServiceRecord {
            id: 7,
            name: "Pantry".to_string(),
            description: String::new(),
            category: "food".to_string(),
            languages: vec!["English".to_string()],
            target_age: TargetAge::All,
            hours_today: String::new(),
            address: String::new(),
            eligibility: String::new(),
        }];
        let at = NaiveDate::from_ymd_opt(2025, 3, 4)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();

        let record = InteractionRecord::new(&context, &kept, &[3, 4], "NFCM", at);

        assert_eq!(record.interaction_id, "2025-03-04T09:15:00_1");
        assert_eq!(record.needs, "food;clothing");
        assert_eq!(record.service_ids_kept, "7");
        assert_eq!(record.service_ids_removed, "3;4");
        assert_eq!(record.housing_status, "Shelter");
        assert_eq!(record.to_row().len(), INTERACTION_COLUMNS.len());
        assert_eq!(record.parsed_timestamp(), Some(at));
    }
}
