pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig};

pub use adapters::{ChatCompletionGenerator, CsvInteractionSink, NullSink, SheetsInteractionSink};
pub use config::toml_config::HandoutConfig;
pub use core::catalog::ServiceCatalog;
pub use core::engine::{EngineSettings, HandoutEngine, HandoutOutcome};
pub use core::session::HandoutSession;
pub use utils::error::{HandoutError, Result};
