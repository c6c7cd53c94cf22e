use crate::domain::model::{GenerationRequest, InteractionRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Where produced handouts are written.
pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Opaque text generation capability. Fallible and non-deterministic.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Append-only interaction log.
#[async_trait]
pub trait InteractionSink: Send + Sync {
    async fn append(&self, record: &InteractionRecord) -> Result<()>;
    /// Bulk read, used by the analytics summary only.
    async fn load_all(&self) -> Result<Vec<InteractionRecord>>;
}
