use thiserror::Error;

#[derive(Error, Debug)]
pub enum HandoutError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Service catalog error: {message}")]
    CatalogError { message: String },

    #[error("At least one need must be selected")]
    EmptyNeeds,

    #[error("No matching services found")]
    NoMatchingServices,

    #[error("At least one service should be selected")]
    NoServicesKept,

    #[error("Missing credential: environment variable {variable} is not set")]
    MissingCredential { variable: String },

    #[error("Text generation failed: {message}")]
    GenerationError { message: String },

    #[error("Interaction sink error: {message}")]
    SinkError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    Storage,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HandoutError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HandoutError::ConfigError { .. }
            | HandoutError::ConfigValidationError { .. }
            | HandoutError::InvalidConfigValueError { .. }
            | HandoutError::MissingConfigError { .. }
            | HandoutError::MissingCredential { .. } => ErrorCategory::Configuration,
            HandoutError::EmptyNeeds
            | HandoutError::NoMatchingServices
            | HandoutError::NoServicesKept => ErrorCategory::Input,
            HandoutError::HttpError(_) | HandoutError::GenerationError { .. } => {
                ErrorCategory::Network
            }
            HandoutError::IoError(_) | HandoutError::SinkError { .. } => ErrorCategory::Storage,
            HandoutError::CsvError(_)
            | HandoutError::SerializationError(_)
            | HandoutError::CatalogError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 使用者可以調整輸入後重試
            HandoutError::EmptyNeeds
            | HandoutError::NoMatchingServices
            | HandoutError::NoServicesKept
            | HandoutError::SinkError { .. } => ErrorSeverity::Low,
            HandoutError::HttpError(_)
            | HandoutError::GenerationError { .. }
            | HandoutError::MissingCredential { .. } => ErrorSeverity::Medium,
            HandoutError::CsvError(_)
            | HandoutError::SerializationError(_)
            | HandoutError::CatalogError { .. } => ErrorSeverity::High,
            HandoutError::IoError(_)
            | HandoutError::ConfigError { .. }
            | HandoutError::ConfigValidationError { .. }
            | HandoutError::InvalidConfigValueError { .. }
            | HandoutError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Process exit code for the binaries. Every error is nonzero.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 4,      // 沒有產生講義
            ErrorSeverity::Medium => 2,   // 可重試
            ErrorSeverity::High => 1,     // 資料問題
            ErrorSeverity::Critical => 3, // 系統錯誤
        }
    }

    /// Message shown to front desk staff, without internal detail.
    pub fn user_friendly_message(&self) -> String {
        match self {
            HandoutError::EmptyNeeds => {
                "Please select at least one need before searching.".to_string()
            }
            HandoutError::NoMatchingServices => {
                "No matching services found. Try changing needs or language.".to_string()
            }
            HandoutError::NoServicesKept => "At least one service should be selected.".to_string(),
            HandoutError::MissingCredential { variable } => {
                format!("The text generation key is not configured ({}).", variable)
            }
            HandoutError::GenerationError { message } => {
                format!("The handout text could not be generated: {}", message)
            }
            HandoutError::HttpError(_) => "A network request failed.".to_string(),
            HandoutError::CatalogError { message } => {
                format!("The service catalog could not be loaded: {}", message)
            }
            HandoutError::SinkError { .. } => "The interaction could not be logged.".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Adjust the selected needs, language or services and try again",
            ErrorCategory::Configuration => {
                "Check handout.toml and the environment variables it references"
            }
            ErrorCategory::Network => "Check the network connection and API quota, then retry",
            ErrorCategory::Storage => "Check that the output and log locations are writable",
            ErrorCategory::Processing => "Check the catalog CSV columns and values",
        }
    }
}

pub type Result<T> = std::result::Result<T, HandoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_errors_are_low_severity() {
        assert_eq!(HandoutError::NoMatchingServices.severity(), ErrorSeverity::Low);
        assert_eq!(HandoutError::NoServicesKept.category(), ErrorCategory::Input);
        assert_eq!(
            HandoutError::SinkError {
                message: "offline".to_string()
            }
            .severity(),
            ErrorSeverity::Low
        );
    }

    #[test]
    fn test_generation_failure_message() {
        let err = HandoutError::GenerationError {
            message: "quota exceeded".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.user_friendly_message().contains("quota exceeded"));
    }

    #[test]
    fn test_soft_errors_still_exit_nonzero() {
        assert_eq!(HandoutError::EmptyNeeds.exit_code(), 4);
        assert_eq!(HandoutError::NoMatchingServices.exit_code(), 4);
        assert_eq!(HandoutError::NoServicesKept.exit_code(), 4);
        let generation = HandoutError::GenerationError {
            message: "timeout".to_string(),
        };
        assert_eq!(generation.exit_code(), 2);
        let io = HandoutError::IoError(std::io::Error::other("disk full"));
        assert_eq!(io.exit_code(), 3);
    }
}
