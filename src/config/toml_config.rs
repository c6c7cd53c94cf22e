use crate::adapters::generation::{ChatCompletionGenerator, DEFAULT_API_KEY_ENV, DEFAULT_MODEL, GROQ_BASE_URL};
use crate::adapters::sink::{
    resolve_sheet_location, CsvInteractionSink, NullSink, SheetsInteractionSink, DEFAULT_TOKEN_ENV,
    DEFAULT_WORKSHEET, SHEETS_API_BASE,
};
use crate::core::engine::EngineSettings;
use crate::core::prompt::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::core::render::DEFAULT_TITLE;
use crate::domain::ports::{InteractionSink, TextGenerator};
use crate::utils::error::{HandoutError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoutConfig {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: GROQ_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            temperature: None,
            max_tokens: None,
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    #[default]
    Csv,
    Sheets,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub kind: LogKind,
    /// CSV file for `kind = "csv"`.
    pub path: Option<String>,
    /// Spreadsheet URL, `/d/<key>` reference or bare key for `kind = "sheets"`.
    pub location: Option<String>,
    pub worksheet: Option<String>,
    pub token_env: Option<String>,
    pub api_base: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            kind: LogKind::Csv,
            path: None,
            location: None,
            worksheet: None,
            token_env: None,
            api_base: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub org: String,
    pub site: Option<String>,
    pub title: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "./output".to_string(),
            org: "NFCM".to_string(),
            site: None,
            title: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub log_format: LogFormat,
}

pub const DEFAULT_LOG_PATH: &str = "./output/interactions.csv";

impl HandoutConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(HandoutError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| HandoutError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SHEET_URL})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| HandoutError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn temperature(&self) -> f32 {
        self.generation.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn max_tokens(&self) -> u32 {
        self.generation.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.generation.timeout_seconds.unwrap_or(30))
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }

    pub fn log_path(&self) -> &str {
        self.log.path.as_deref().unwrap_or(DEFAULT_LOG_PATH)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            site: self
                .output
                .site
                .clone()
                .unwrap_or_else(|| self.output.org.clone()),
            org: self.output.org.clone(),
            title: self
                .output
                .title
                .clone()
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            temperature: self.temperature(),
            max_tokens: self.max_tokens(),
        }
    }

    pub fn build_generator(&self) -> Result<Arc<dyn TextGenerator>> {
        let generator = ChatCompletionGenerator::new(
            &self.generation.base_url,
            &self.generation.model,
            &self.generation.api_key_env,
            self.timeout(),
        )?;
        if !generator.has_credential() {
            tracing::warn!(
                "⚠️ {} is not set; handouts will show a generation error",
                self.generation.api_key_env
            );
        }
        Ok(Arc::new(generator))
    }

    pub fn build_sink(&self) -> Result<Arc<dyn InteractionSink>> {
        let sink: Arc<dyn InteractionSink> = match self.log.kind {
            LogKind::Csv => {
                tracing::info!("📝 Logging interactions to CSV: {}", self.log_path());
                Arc::new(CsvInteractionSink::new(self.log_path()))
            }
            LogKind::Sheets => {
                let location = validation::validate_required_field("log.location", &self.log.location)?;
                let sink = SheetsInteractionSink::new(
                    location,
                    self.log.worksheet.as_deref().unwrap_or(DEFAULT_WORKSHEET),
                    self.log.token_env.as_deref().unwrap_or(DEFAULT_TOKEN_ENV),
                )?
                .with_api_base(self.log.api_base.as_deref().unwrap_or(SHEETS_API_BASE));
                tracing::info!(
                    "📝 Logging interactions to spreadsheet {}",
                    sink.spreadsheet_key()
                );
                Arc::new(sink)
            }
            LogKind::None => {
                tracing::info!("Interaction logging disabled");
                Arc::new(NullSink)
            }
        };
        Ok(sink)
    }
}

impl Validate for HandoutConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("catalog.path", &self.catalog.path)?;
        validation::validate_file_extension("catalog.path", &self.catalog.path, &["csv"])?;

        validation::validate_url("generation.base_url", &self.generation.base_url)?;
        validation::validate_non_empty_string("generation.model", &self.generation.model)?;
        validation::validate_non_empty_string("generation.api_key_env", &self.generation.api_key_env)?;
        validation::validate_range("generation.temperature", self.temperature(), 0.0, 2.0)?;
        validation::validate_positive_number("generation.max_tokens", self.max_tokens() as usize, 1)?;
        if let Some(timeout) = self.generation.timeout_seconds {
            validation::validate_positive_number("generation.timeout_seconds", timeout as usize, 1)?;
        }

        match self.log.kind {
            LogKind::Csv => {
                validation::validate_path("log.path", self.log_path())?;
                validation::validate_file_extension("log.path", self.log_path(), &["csv"])?;
            }
            LogKind::Sheets => {
                let location = validation::validate_required_field("log.location", &self.log.location)?;
                resolve_sheet_location(location)?;
                if let Some(api_base) = &self.log.api_base {
                    validation::validate_url("log.api_base", api_base)?;
                }
            }
            LogKind::None => {}
        }

        validation::validate_path("output.path", &self.output.path)?;
        validation::validate_non_empty_string("output.org", &self.output.org)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[catalog]
path = "data/services_sample.csv"
"#;

    #[test]
    fn test_defaults_from_minimal_config() {
        let config = HandoutConfig::from_toml_str(MINIMAL).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.generation.model, DEFAULT_MODEL);
        assert_eq!(config.generation.api_key_env, "GROQ_API_KEY");
        assert_eq!(config.log.kind, LogKind::Csv);
        assert_eq!(config.log_path(), DEFAULT_LOG_PATH);
        assert_eq!(config.temperature(), 0.4);
        assert_eq!(config.max_tokens(), 600);
        assert!(!config.monitoring_enabled());

        let settings = config.engine_settings();
        assert_eq!(settings.org, "NFCM");
        assert_eq!(settings.site, "NFCM");
        assert_eq!(settings.title, "Service Handout");
    }

    #[test]
    fn test_full_config() {
        let content = r#"
[catalog]
path = "data/services.csv"

[generation]
base_url = "https://api.groq.com/openai/v1"
model = "llama-3.3-70b-versatile"
api_key_env = "MY_KEY"
temperature = 0.2
max_tokens = 400

[log]
kind = "sheets"
location = "https://docs.google.com/spreadsheets/d/1AbC/edit"
worksheet = "visits"

[output]
path = "./handouts"
org = "Friendship Centre"
site = "Front desk 2"

[monitoring]
enabled = true
log_format = "json"
"#;
        let config = HandoutConfig::from_toml_str(content).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.log.kind, LogKind::Sheets);
        assert_eq!(config.monitoring.log_format, LogFormat::Json);
        assert_eq!(config.engine_settings().site, "Front desk 2");
        assert_eq!(config.engine_settings().max_tokens, 400);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SERVICE_HANDOUT_TEST_SHEET", "1XyZ");

        let content = r#"
[catalog]
path = "data/services.csv"

[log]
kind = "sheets"
location = "${SERVICE_HANDOUT_TEST_SHEET}"
"#;
        let config = HandoutConfig::from_toml_str(content).unwrap();
        assert_eq!(config.log.location.as_deref(), Some("1XyZ"));

        std::env::remove_var("SERVICE_HANDOUT_TEST_SHEET");
    }

    #[test]
    fn test_validation_failures() {
        let missing_location = r#"
[catalog]
path = "data/services.csv"

[log]
kind = "sheets"
"#;
        let config = HandoutConfig::from_toml_str(missing_location).unwrap();
        assert!(matches!(
            config.validate().unwrap_err(),
            HandoutError::MissingConfigError { .. }
        ));

        let bad_catalog = r#"
[catalog]
path = "data/services.xlsx"
"#;
        let config = HandoutConfig::from_toml_str(bad_catalog).unwrap();
        assert!(config.validate().is_err());

        let hot = r#"
[catalog]
path = "data/services.csv"

[generation]
base_url = "https://api.groq.com/openai/v1"
model = "m"
api_key_env = "K"
temperature = 3.5
"#;
        let config = HandoutConfig::from_toml_str(hot).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_catalog_section_is_rejected() {
        let err = HandoutConfig::from_toml_str("[output]\npath = \"x\"\norg = \"y\"\n").unwrap_err();
        assert!(matches!(err, HandoutError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = HandoutConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.catalog.path, "data/services_sample.csv");
    }

    #[tokio::test]
    async fn test_build_none_sink() {
        let mut config = HandoutConfig::from_toml_str(MINIMAL).unwrap();
        config.log.kind = LogKind::None;
        let sink = config.build_sink().unwrap();
        assert!(sink.load_all().await.unwrap().is_empty());
    }
}
