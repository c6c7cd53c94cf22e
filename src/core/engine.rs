use crate::core::catalog::ServiceCatalog;
use crate::core::interaction::log_interaction;
use crate::core::prompt::{self, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::core::render::{self, HandoutDocument, RenderOptions, DEFAULT_TITLE};
use crate::core::session::HandoutSession;
use crate::domain::model::{HandoutText, InteractionRecord, VisitorContext};
use crate::domain::ports::{InteractionSink, Storage, TextGenerator};
use crate::utils::error::{HandoutError, Result};
use crate::utils::monitor::SystemMonitor;
use chrono::NaiveDateTime;
use std::sync::Arc;

/// Prefix of the visible text when generation fails.
pub const GENERATION_ERROR_PREFIX: &str = "⚠️ Error generating handout:";

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Site label written to the interaction log.
    pub site: String,
    /// Organisation name for the footer and file name.
    pub org: String,
    pub title: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            site: "NFCM".to_string(),
            org: "NFCM".to_string(),
            title: DEFAULT_TITLE.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// What one confirmed session produced.
#[derive(Debug, Clone)]
pub struct HandoutOutcome {
    /// Intro and closing as shown; on failure the intro is the error line.
    pub text: HandoutText,
    /// Raw generated text, or the error line on failure.
    pub visible_text: String,
    pub document: Vec<u8>,
    pub file_name: String,
    pub output_path: String,
    pub cards: usize,
    pub logged: bool,
    pub generation_error: Option<String>,
}

impl HandoutOutcome {
    pub fn is_success(&self) -> bool {
        self.generation_error.is_none()
    }
}

pub struct HandoutEngine<S: Storage> {
    catalog: Arc<ServiceCatalog>,
    generator: Arc<dyn TextGenerator>,
    sink: Arc<dyn InteractionSink>,
    storage: S,
    settings: EngineSettings,
    monitor: SystemMonitor,
}

impl<S: Storage> HandoutEngine<S> {
    pub fn new(
        catalog: Arc<ServiceCatalog>,
        generator: Arc<dyn TextGenerator>,
        sink: Arc<dyn InteractionSink>,
        storage: S,
        settings: EngineSettings,
    ) -> Self {
        Self::new_with_monitoring(catalog, generator, sink, storage, settings, false)
    }

    pub fn new_with_monitoring(
        catalog: Arc<ServiceCatalog>,
        generator: Arc<dyn TextGenerator>,
        sink: Arc<dyn InteractionSink>,
        storage: S,
        settings: EngineSettings,
        monitor_enabled: bool,
    ) -> Self {
        Self {
            catalog,
            generator,
            sink,
            storage,
            settings,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Retrieval step. The session it returns is owned by the caller and
    /// never shared between visitors.
    pub fn find_services(&self, context: VisitorContext) -> Result<HandoutSession> {
        if context.needs.is_empty() {
            return Err(HandoutError::EmptyNeeds);
        }

        tracing::info!(
            "🔎 Retrieving services: needs={}, language={}, age_group={}",
            context.needs_joined(", "),
            context.language,
            context.age_group
        );
        let candidates = self
            .catalog
            .retrieve(&context.needs, &context.language, context.age_group);
        self.monitor.log_phase("retrieve");

        if candidates.is_empty() {
            tracing::warn!("No matching services for the visitor's answers");
            return Err(HandoutError::NoMatchingServices);
        }
        tracing::info!("📋 Found {} candidate services", candidates.len());

        Ok(HandoutSession::new(context, candidates))
    }

    pub async fn produce_handout(&self, session: &HandoutSession) -> Result<HandoutOutcome> {
        self.produce_handout_at(session, chrono::Local::now().naive_local())
            .await
    }

    /// Generation, rendering, logging and storage for a confirmed session.
    /// Only a storage failure (or an empty selection) is returned as an error.
    pub async fn produce_handout_at(
        &self,
        session: &HandoutSession,
        at: NaiveDateTime,
    ) -> Result<HandoutOutcome> {
        let kept = session.confirm()?;

        // Generate
        let request = prompt::build_request(
            session.context(),
            &kept,
            self.settings.temperature,
            self.settings.max_tokens,
        );
        tracing::info!(
            "✍️ Generating handout text with {} for {} services",
            self.generator.name(),
            kept.len()
        );
        let generated = self.generator.generate(&request).await;
        self.monitor.log_phase("generate");

        let (visible_text, text, cards, generation_error) = match generated {
            Ok(raw) => {
                let text = prompt::parse_generated_text(&raw);
                (raw, text, kept.clone(), None)
            }
            Err(e) => {
                tracing::error!("❌ Handout generation failed: {}", e);
                let line = format!("{} {}", GENERATION_ERROR_PREFIX, e);
                let text = HandoutText {
                    intro: line.clone(),
                    closing: String::new(),
                };
                (line, text, Vec::new(), Some(e.to_string()))
            }
        };

        // Render
        let document = HandoutDocument::assemble(text.clone(), &cards, at);
        let options = RenderOptions {
            title: self.settings.title.clone(),
            org: self.settings.org.clone(),
        };
        let bytes = render::render(&document, &options);
        tracing::info!(
            "🖨️ Rendered handout with {} cards ({} bytes)",
            document.cards.len(),
            bytes.len()
        );
        self.monitor.log_phase("render");

        // Store
        let file_name = options.file_name();
        let output_path = self.storage.write_file(&file_name, &bytes).await?;
        tracing::info!("💾 Handout saved to: {}", output_path);
        self.monitor.log_phase("store");

        // Log, only once a completed handout is saved
        let logged = if generation_error.is_none() {
            let record = InteractionRecord::new(
                session.context(),
                &kept,
                &session.removed_ids(),
                &self.settings.site,
                at,
            );
            log_interaction(self.sink.as_ref(), &record).await
        } else {
            tracing::info!("Skipping interaction log for a failed handout");
            false
        };
        self.monitor.log_phase("log");

        Ok(HandoutOutcome {
            text,
            visible_text,
            document: bytes,
            file_name,
            output_path,
            cards: cards.len(),
            logged,
            generation_error,
        })
    }
}
