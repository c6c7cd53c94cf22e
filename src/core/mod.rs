pub mod analytics;
pub mod catalog;
pub mod engine;
pub mod interaction;
pub mod prompt;
pub mod render;
pub mod retrieval;
pub mod session;

pub use crate::domain::model::{HandoutText, InteractionRecord, ServiceRecord, VisitorContext};
pub use crate::domain::ports::{InteractionSink, Storage, TextGenerator};
pub use crate::utils::error::Result;
