use crate::domain::model::InteractionRecord;
use crate::domain::ports::InteractionSink;

/// Appends one record. A sink failure is reported to diagnostics and
/// swallowed; the return value only says whether the row landed.
pub async fn log_interaction(sink: &dyn InteractionSink, record: &InteractionRecord) -> bool {
    match sink.append(record).await {
        Ok(()) => {
            tracing::info!(
                interaction_id = %record.interaction_id,
                "📝 Logged interaction with {} kept services",
                record.num_services_kept
            );
            true
        }
        Err(e) => {
            tracing::error!(
                interaction_id = %record.interaction_id,
                category = ?e.category(),
                "❌ Failed to log interaction: {}",
                e
            );
            false
        }
    }
}
