mod config;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use skyprice_core::{
    is_command, render, resolve_locale, InboundMessage, Locale, Message, ValidationGate,
};
use skyprice_extraction::PropertyExtractor;
use skyprice_observability::AppMetrics;
use skyprice_pricing::PricePredictor;
use skyprice_storage::{LanguageEntry, LanguageStore};
use tracing::{info, instrument, warn};

pub use config::{build_agent, ServiceConfig, SkyPriceAgent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    Priced,
    Command,
    ExtractionFailed,
    Rejected,
    PredictionFailed,
    Ignored,
}

impl PipelineOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Priced => "priced",
            Self::Command => "command",
            Self::ExtractionFailed => "extraction_failed",
            Self::Rejected => "rejected",
            Self::PredictionFailed => "prediction_failed",
            Self::Ignored => "ignored",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentReply {
    pub locale: Locale,
    pub replies: Vec<String>,
    pub outcome: PipelineOutcome,
}

/// Receives each reply as soon as the pipeline produces it, so a chat
/// transport can show the processing notice before the upstream calls finish.
pub trait ReplySink: Send + Sync {
    fn deliver(&self, text: &str) -> impl Future<Output = ()> + Send;
}

impl ReplySink for () {
    async fn deliver(&self, _text: &str) {}
}

struct ReplyLog<'a, K> {
    sink: &'a K,
    replies: Vec<String>,
}

impl<'a, K: ReplySink> ReplyLog<'a, K> {
    fn new(sink: &'a K) -> Self {
        Self {
            sink,
            replies: Vec::new(),
        }
    }

    async fn push(&mut self, text: String) {
        self.sink.deliver(&text).await;
        self.replies.push(text);
    }

    fn finish(self, locale: Locale, outcome: PipelineOutcome) -> AgentReply {
        AgentReply {
            locale,
            replies: self.replies,
            outcome,
        }
    }
}

pub struct ValuationAgent<S, E, P> {
    store: Arc<S>,
    extractor: Arc<E>,
    predictor: Arc<P>,
    gate: ValidationGate,
    metrics: Arc<AppMetrics>,
}

impl<S, E, P> Clone for ValuationAgent<S, E, P> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            extractor: Arc::clone(&self.extractor),
            predictor: Arc::clone(&self.predictor),
            gate: self.gate.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<S, E, P> ValuationAgent<S, E, P>
where
    S: LanguageStore,
    E: PropertyExtractor,
    P: PricePredictor,
{
    pub fn new(
        store: Arc<S>,
        extractor: Arc<E>,
        predictor: Arc<P>,
        gate: ValidationGate,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            store,
            extractor,
            predictor,
            gate,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<AppMetrics> {
        &self.metrics
    }

    /// Language currently stored for the user, without recording anything.
    pub fn current_locale(&self, user_id: &str) -> Locale {
        self.store.language(user_id).unwrap_or_default()
    }

    pub fn stored_language(&self, user_id: &str) -> Option<LanguageEntry> {
        self.store.entry(user_id)
    }

    /// Applies a language command (if it names one) and persists the result.
    pub fn resolve_locale(&self, user_id: &str, command: Option<&str>) -> Locale {
        self.store
            .update_language(user_id, &|stored| resolve_locale(command, stored))
    }

    pub async fn handle_inbound(&self, message: InboundMessage) -> AgentReply {
        self.handle_inbound_with(message, &()).await
    }

    #[instrument(skip(self, message, sink), fields(user_id = %message.user_id))]
    pub async fn handle_inbound_with<K: ReplySink>(
        &self,
        message: InboundMessage,
        sink: &K,
    ) -> AgentReply {
        let started = Instant::now();
        self.metrics.inc_message();

        // Trimmed only for routing; the extractor gets the text as typed.
        let trimmed = message.text.trim();
        let reply = if trimmed.is_empty() {
            AgentReply {
                locale: self.current_locale(&message.user_id),
                replies: Vec::new(),
                outcome: PipelineOutcome::Ignored,
            }
        } else if is_command(trimmed) {
            self.handle_command(&message.user_id, trimmed, sink).await
        } else {
            self.handle_message(&message.user_id, &message.text, sink).await
        };

        self.metrics.observe_latency(started.elapsed());
        info!(
            locale = reply.locale.as_code(),
            outcome = reply.outcome.as_str(),
            replies = reply.replies.len(),
            "message handled"
        );
        reply
    }

    /// Every command answers with the welcome text; language commands switch
    /// the language first, anything else keeps the current one.
    pub async fn handle_command<K: ReplySink>(
        &self,
        user_id: &str,
        command: &str,
        sink: &K,
    ) -> AgentReply {
        let locale = self.resolve_locale(user_id, Some(command));
        self.metrics.inc_command(locale.as_code());
        info!(command = %command, locale = locale.as_code(), "command received");

        let mut log = ReplyLog::new(sink);
        log.push(render(locale, &Message::Welcome)).await;
        log.finish(locale, PipelineOutcome::Command)
    }

    pub async fn handle_message<K: ReplySink>(
        &self,
        user_id: &str,
        text: &str,
        sink: &K,
    ) -> AgentReply {
        let locale = self.resolve_locale(user_id, None);
        let mut log = ReplyLog::new(sink);
        log.push(render(locale, &Message::Processing)).await;

        let draft = match self.extractor.extract(text).await {
            Ok(draft) => draft,
            Err(error) => {
                warn!(error = %error, "extraction failed");
                self.metrics.inc_extraction_failure();
                log.push(render(locale, &Message::ExtractionFailed)).await;
                return log.finish(locale, PipelineOutcome::ExtractionFailed);
            }
        };

        let record = match self.gate.evaluate(&draft) {
            Ok(record) => record,
            Err(failure) => {
                self.metrics
                    .inc_validation_failure(failure.check().as_str());
                log.push(render(locale, &Message::from(&failure))).await;
                return log.finish(locale, PipelineOutcome::Rejected);
            }
        };

        log.push(render(locale, &Message::Details(&record))).await;

        match self.predictor.predict(&record).await {
            Ok(estimate) => {
                self.metrics.inc_priced();
                log.push(render(locale, &Message::PriceSummary(&estimate)))
                    .await;
                log.finish(locale, PipelineOutcome::Priced)
            }
            Err(error) => {
                warn!(error = %error, "price prediction failed");
                self.metrics.inc_prediction_failure();
                log.push(render(locale, &Message::GenericError)).await;
                log.finish(locale, PipelineOutcome::PredictionFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde_json::json;
    use skyprice_core::{Field, Municipality, PriceEstimate, PropertyDraft, PropertyRecord};
    use skyprice_extraction::ExtractionError;
    use skyprice_pricing::PredictionError;
    use skyprice_storage::MemoryStore;

    struct FixedExtractor {
        reply: Option<PropertyDraft>,
        calls: AtomicUsize,
        seen: Mutex<Option<String>>,
    }

    impl PropertyExtractor for FixedExtractor {
        async fn extract(&self, text: &str) -> Result<PropertyDraft, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock() = Some(text.to_string());
            self.reply
                .clone()
                .ok_or_else(|| ExtractionError::Parse("not json".to_string()))
        }
    }

    struct FixedPredictor {
        estimate: Option<PriceEstimate>,
        calls: AtomicUsize,
        seen: Mutex<Option<PropertyRecord>>,
    }

    impl PricePredictor for FixedPredictor {
        async fn predict(&self, record: &PropertyRecord) -> Result<PriceEstimate, PredictionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock() = Some(record.clone());
            self.estimate
                .ok_or_else(|| PredictionError::Network("connection refused".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<String>>,
    }

    impl ReplySink for RecordingSink {
        async fn deliver(&self, text: &str) {
            self.delivered.lock().push(text.to_string());
        }
    }

    type TestAgent = ValuationAgent<MemoryStore, FixedExtractor, FixedPredictor>;

    fn reference_draft() -> PropertyDraft {
        serde_json::from_value(json!({
            "Size_Terrain": 100,
            "Size_Construction": 80,
            "Rooms": 2,
            "Bathrooms": 1,
            "Parking": 1,
            "Age": 10,
            "Lat": 19.39,
            "Lng": -99.16,
            "Municipality": "Benito Juárez"
        }))
        .unwrap()
    }

    fn estimate() -> PriceEstimate {
        PriceEstimate {
            random_forest: 4_500_000.0,
            svm: 4_200_000.0,
            neural_network: 4_700_000.0,
        }
    }

    fn agent(draft: Option<PropertyDraft>, estimate: Option<PriceEstimate>) -> TestAgent {
        ValuationAgent::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedExtractor {
                reply: draft,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(None),
            }),
            Arc::new(FixedPredictor {
                estimate,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(None),
            }),
            ValidationGate::default(),
            AppMetrics::shared(),
        )
    }

    fn inbound(text: &str) -> InboundMessage {
        InboundMessage {
            user_id: "42".to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn priced_flow_echoes_details_then_prices() {
        let agent = agent(Some(reference_draft()), Some(estimate()));
        let reply = agent.handle_inbound(inbound("Depa en Benito Juárez")).await;

        assert_eq!(reply.outcome, PipelineOutcome::Priced);
        assert_eq!(reply.locale, Locale::Es);
        assert_eq!(reply.replies.len(), 3);
        assert_eq!(reply.replies[0], render(Locale::Es, &Message::Processing));
        assert!(reply.replies[1].contains("Benito Juárez"));
        assert_eq!(
            reply.replies[2],
            render(Locale::Es, &Message::PriceSummary(&estimate()))
        );

        let seen = agent.predictor.seen.lock().clone().unwrap();
        assert_eq!(seen.municipality, Municipality::BenitoJuarez);
        assert_eq!(seen.measure(Field::Rooms), Some(2.0));
        assert_eq!(seen.lat, 19.39);
        assert_eq!(agent.metrics().snapshot().priced_total, 1);
    }

    #[tokio::test]
    async fn extraction_failure_skips_validation_and_pricing() {
        let agent = agent(None, Some(estimate()));
        let reply = agent.handle_inbound(inbound("hola")).await;

        assert_eq!(reply.outcome, PipelineOutcome::ExtractionFailed);
        assert_eq!(
            reply.replies.last().unwrap(),
            &render(Locale::Es, &Message::ExtractionFailed)
        );
        assert_eq!(agent.predictor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(agent.metrics().snapshot().extraction_failures_total, 1);
    }

    #[tokio::test]
    async fn rejected_draft_lists_missing_fields() {
        let mut draft = reference_draft();
        draft.set(Field::Parking, None);
        draft.set(Field::Age, None);
        let agent = agent(Some(draft), Some(estimate()));

        let reply = agent.handle_inbound(inbound("depa sin datos")).await;
        assert_eq!(reply.outcome, PipelineOutcome::Rejected);
        assert_eq!(
            reply.replies[1],
            render(
                Locale::Es,
                &Message::MissingFields(&[Field::Parking, Field::Age])
            )
        );
        assert_eq!(agent.predictor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_municipality_is_echoed() {
        let mut draft = reference_draft();
        draft.set(Field::Municipality, Some(json!("Springfield")));
        let agent = agent(Some(draft), Some(estimate()));

        let reply = agent.handle_inbound(inbound("depa en Springfield")).await;
        assert_eq!(reply.outcome, PipelineOutcome::Rejected);
        assert!(reply.replies[1].contains("Springfield"));
    }

    #[tokio::test]
    async fn prediction_failure_renders_generic_error() {
        let agent = agent(Some(reference_draft()), None);
        let reply = agent.handle_inbound(inbound("depa")).await;

        assert_eq!(reply.outcome, PipelineOutcome::PredictionFailed);
        assert_eq!(
            reply.replies.last().unwrap(),
            &render(Locale::Es, &Message::GenericError)
        );
        assert_eq!(agent.metrics().snapshot().prediction_failures_total, 1);
    }

    #[tokio::test]
    async fn language_command_persists_for_later_messages() {
        let agent = agent(Some(reference_draft()), Some(estimate()));

        let welcome = agent.handle_inbound(inbound("/english")).await;
        assert_eq!(welcome.outcome, PipelineOutcome::Command);
        assert_eq!(welcome.replies, vec![render(Locale::En, &Message::Welcome)]);

        let reply = agent.handle_inbound(inbound("Apartment in Benito Juárez")).await;
        assert_eq!(reply.locale, Locale::En);
        assert_eq!(reply.replies[0], render(Locale::En, &Message::Processing));
        assert_eq!(agent.current_locale("42"), Locale::En);
        assert_eq!(agent.current_locale("7"), Locale::Es);
    }

    #[tokio::test]
    async fn unknown_command_keeps_language_and_welcomes() {
        let agent = agent(None, None);
        agent.handle_inbound(inbound("/portuguese")).await;

        let reply = agent.handle_inbound(inbound("/help")).await;
        assert_eq!(reply.locale, Locale::Pt);
        assert_eq!(reply.replies, vec![render(Locale::Pt, &Message::Welcome)]);
        assert_eq!(agent.extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn extractor_receives_text_as_typed() {
        let agent = agent(Some(reference_draft()), Some(estimate()));
        let text = "  Depa de 80 m2\n\n2 recámaras,   1 baño\nBenito Juárez ";
        agent.handle_inbound(inbound(text)).await;

        assert_eq!(agent.extractor.seen.lock().as_deref(), Some(text));
    }

    #[tokio::test]
    async fn padded_command_is_still_a_command() {
        let agent = agent(None, None);
        let reply = agent.handle_inbound(inbound("\n  /french  ")).await;
        assert_eq!(reply.outcome, PipelineOutcome::Command);
        assert_eq!(reply.locale, Locale::Fr);
        assert_eq!(agent.extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_text_is_ignored() {
        let agent = agent(None, None);
        let reply = agent.handle_inbound(inbound("   \n ")).await;
        assert_eq!(reply.outcome, PipelineOutcome::Ignored);
        assert!(reply.replies.is_empty());
        assert_eq!(agent.extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sink_receives_replies_in_order() {
        let agent = agent(Some(reference_draft()), Some(estimate()));
        let sink = RecordingSink::default();

        let reply = agent
            .handle_inbound_with(inbound("/french"), &sink)
            .await;
        assert_eq!(reply.locale, Locale::Fr);
        let reply_two = agent.handle_inbound_with(inbound("Appartement"), &sink).await;

        let delivered = sink.delivered.lock().clone();
        let mut expected = reply.replies.clone();
        expected.extend(reply_two.replies);
        assert_eq!(delivered, expected);
        assert_eq!(delivered.len(), 4);
    }
}
