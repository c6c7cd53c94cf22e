#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::domain::model::{
    AgeGroup, HousingStatus, NeedCategory, VisitorContext, DISPLAY_LANGUAGES, FALLBACK_LANGUAGE,
};
#[cfg(feature = "cli")]
use crate::utils::error::{HandoutError, Result};
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;

/// One front-desk visit from the command line.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "handout")]
#[command(about = "Match a visitor's needs to local services and print a handout")]
pub struct CliConfig {
    #[arg(long, help = "Under 18, 18-29, 30-54 or 55+")]
    pub age_group: AgeGroup,

    #[arg(long, default_value = "English", help = "Preferred display language")]
    pub language: String,

    #[arg(long, default_value = "not-specified")]
    pub housing_status: HousingStatus,

    #[arg(long, value_delimiter = ',', required = true, help = "Comma separated need tags, e.g. food,housing")]
    pub needs: Vec<NeedCategory>,

    #[arg(long, value_delimiter = ',', help = "Service ids to drop from the suggestions")]
    pub remove: Vec<u32>,

    #[arg(long, default_value = "handout.toml")]
    pub config: String,

    #[arg(long, help = "Overrides [output] path")]
    pub output_path: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory per phase")]
    pub monitor: bool,

    #[arg(long, help = "Show matching services and the prompt without generating")]
    pub dry_run: bool,

    #[arg(long, help = "Print the generated text to stdout")]
    pub print_text: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn visitor_context(&self) -> VisitorContext {
        VisitorContext::new(
            self.age_group,
            self.language.trim(),
            self.housing_status,
            self.needs.iter().copied(),
        )
    }

    /// Whether the language is one of the front desk's display languages.
    pub fn offers_language(&self) -> bool {
        let language = self.language.trim();
        DISPLAY_LANGUAGES
            .iter()
            .any(|offered| offered.eq_ignore_ascii_case(language))
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if self.needs.is_empty() {
            return Err(HandoutError::EmptyNeeds);
        }
        validation::validate_non_empty_string("language", &self.language)?;
        if !self.offers_language() {
            tracing::info!(
                "Language '{}' is not a display language; matching services or {} ones will be listed",
                self.language.trim(),
                FALLBACK_LANGUAGE
            );
        }
        validation::validate_path("config", &self.config)?;
        if let Some(path) = &self.output_path {
            validation::validate_path("output_path", path)?;
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_visit() {
        let config = CliConfig::try_parse_from([
            "handout",
            "--age-group",
            "30-54",
            "--language",
            "Cree",
            "--needs",
            "food,housing,food",
            "--remove",
            "3,7",
            "--housing-status",
            "shelter",
        ])
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.remove, vec![3, 7]);
        assert_eq!(config.config, "handout.toml");

        let context = config.visitor_context();
        assert_eq!(context.age_group, AgeGroup::From30To54);
        assert_eq!(context.housing_status, HousingStatus::Shelter);
        assert_eq!(context.needs, vec![NeedCategory::Food, NeedCategory::Housing]);
    }

    #[test]
    fn test_unknown_need_is_rejected_by_parser() {
        let result = CliConfig::try_parse_from([
            "handout",
            "--age-group",
            "55+",
            "--needs",
            "snacks",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults() {
        let config =
            CliConfig::try_parse_from(["handout", "--age-group", "under18", "--needs", "mental-health"])
                .unwrap();
        assert_eq!(config.language, "English");
        assert_eq!(config.housing_status, HousingStatus::NotSpecified);
        assert_eq!(config.needs, vec![NeedCategory::MentalHealth]);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_free_form_language_is_accepted() {
        let config = CliConfig::try_parse_from([
            "handout",
            "--age-group",
            "18-29",
            "--language",
            "Ojibwe",
            "--needs",
            "food",
        ])
        .unwrap();
        assert!(!config.offers_language());
        assert!(config.validate().is_ok());

        let offered = CliConfig::try_parse_from([
            "handout",
            "--age-group",
            "18-29",
            "--language",
            " inuktitut ",
            "--needs",
            "food",
        ])
        .unwrap();
        assert!(offered.offers_language());
    }
}
