// Adapters layer: concrete collaborators behind the domain ports.

pub mod generation;
pub mod sink;

pub use generation::ChatCompletionGenerator;
pub use sink::{resolve_sheet_location, CsvInteractionSink, NullSink, SheetsInteractionSink};
