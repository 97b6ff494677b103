mod events;
pub mod recommendations;
pub mod suggestions;
pub mod visualization;

pub use events::{DisplayMessage, SessionEvent, TurnOutcome};
pub use suggestions::{Suggestion, SuggestionIcon};
pub use visualization::{ChartKind, ChartSet, ChartSpec};

use crate::config::Settings;
use crate::constants::{messages, storage};
use crate::context::persistence::{self, KeyValueStore};
use crate::context::{
    analysis_request, build_system_prompt, ConversationState, DatasetFingerprint, DatasetMemory,
    FileStore,
};
use crate::error::DataSightError;
use crate::ingest::FileRecord;
use crate::llm::{ChatOptions, ContentPart, LlmClient, LlmResponse, Message, UsageTracker};
use crate::voice::{self, TranscriptAlternative};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, MutexGuard};

/// Tunables a session needs from [`Settings`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_messages: usize,
    pub keep_recent: usize,
    pub memory_capacity: usize,
    pub palette: Vec<String>,
    pub prediction_horizon: u32,
    pub confidence_threshold: f32,
    pub filler_words: Vec<String>,
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_messages: settings.conversation.max_messages,
            keep_recent: settings.conversation.keep_recent,
            memory_capacity: settings.conversation.memory_capacity,
            palette: settings.charts.palette.clone(),
            prediction_horizon: settings.charts.prediction_horizon,
            confidence_threshold: settings.voice.confidence_threshold,
            filler_words: settings.voice.filler_words.clone(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

struct SessionState {
    conversation: ConversationState,
    current_data: Option<Vec<FileRecord>>,
    memory: DatasetMemory,
    log: Vec<DisplayMessage>,
    charts: Option<ChartSet>,
    recommendations: Option<String>,
    suggestions: Vec<Suggestion>,
    usage: UsageTracker,
    epoch: Epoch,
}

/// Generation counters for results produced after the flight guard is
/// released. `analysis` moves on every analysis and restart and guards
/// charts and recommendations; `turn` moves on every committed turn and
/// restart and guards suggestions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Epoch {
    analysis: u64,
    turn: u64,
}

impl Epoch {
    fn next_analysis(&mut self) -> Self {
        self.analysis += 1;
        self.turn += 1;
        *self
    }

    fn next_turn(&mut self) -> Self {
        self.turn += 1;
        *self
    }
}

/// The conversation orchestrator.
///
/// Owns the conversation, the current file batch and the dataset memory,
/// and is the only thing that mutates them. At most one analysis or chat
/// turn runs at a time: a second one started while another is awaiting the
/// model is rejected with [`DataSightError::Busy`]. State is persisted as a
/// full snapshot after every successful turn.
pub struct Session {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn KeyValueStore>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    flight: Mutex<()>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl Session {
    /// Open a session, restoring whatever the store holds.
    pub fn open(llm: Arc<dyn LlmClient>, store: Arc<dyn KeyValueStore>, config: SessionConfig) -> Self {
        let conversation = ConversationState::load(store.as_ref())
            .with_limits(config.max_messages, config.keep_recent);
        let current_data = persistence::load_json::<Option<Vec<FileRecord>>>(
            store.as_ref(),
            storage::CURRENT_DATA_KEY,
        )
        .flatten();
        let memory = DatasetMemory::load(store.as_ref(), config.memory_capacity);
        let log = conversation
            .messages()
            .iter()
            .filter_map(DisplayMessage::from_message)
            .collect();

        tracing::info!(
            messages = conversation.len(),
            datasets = memory.len(),
            "session opened"
        );

        Self {
            llm,
            store,
            config,
            state: Mutex::new(SessionState {
                conversation,
                current_data,
                memory,
                log,
                charts: None,
                recommendations: None,
                suggestions: suggestions::default_suggestions(),
                usage: UsageTracker::default(),
                epoch: Epoch::default(),
            }),
            flight: Mutex::new(()),
            events: None,
        }
    }

    /// Open a session backed by the configured provider and data directory.
    pub fn from_settings(settings: &Settings) -> Result<Self, DataSightError> {
        let client: Arc<dyn LlmClient> = Arc::from(settings.build_llm_client()?);
        let llm: Arc<dyn LlmClient> = Arc::new(settings.guard_client(client));
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::with_dir(settings.data_dir()?)?);
        Ok(Self::open(llm, store, SessionConfig::from_settings(settings)))
    }

    pub fn with_events(mut self, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event);
        }
    }

    fn begin_turn(&self) -> Result<MutexGuard<'_, ()>, DataSightError> {
        self.flight.try_lock().map_err(|_| DataSightError::Busy)
    }

    fn show(&self, state: &mut SessionState, message: DisplayMessage) {
        state.log.push(message.clone());
        self.emit(SessionEvent::Message(message));
    }

    fn record_usage(state: &mut SessionState, response: &LlmResponse) {
        if let Some(ref usage) = response.usage {
            state.usage.track(usage.input_tokens, usage.output_tokens);
        }
    }

    fn persist_snapshot(&self, state: &SessionState) {
        let store = self.store.as_ref();
        let results = [
            state.conversation.persist(store),
            persistence::save_json(store, storage::CURRENT_DATA_KEY, &state.current_data),
            state.memory.persist(store),
        ];
        for result in results {
            if let Err(e) = result {
                tracing::warn!("failed to persist session snapshot: {}", e);
            }
        }
    }

    /// Analyze a batch of uploaded files.
    ///
    /// Records the batch in the dataset memory, seeds the conversation with
    /// an adaptive system message if it is empty, asks the model for an
    /// analysis and then refreshes charts, recommendations and suggestions
    /// concurrently. An empty batch is ignored.
    pub async fn start_analysis(&self, files: Vec<FileRecord>) -> Result<TurnOutcome, DataSightError> {
        if files.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }
        let flight = self.begin_turn()?;
        self.emit(SessionEvent::Loading(true));

        let request_text = analysis_request(&files);
        let request = {
            let mut state = self.state.lock().await;

            state.memory.record(DatasetFingerprint::from_files(&files));
            if let Err(e) = state.memory.persist(self.store.as_ref()) {
                tracing::warn!("failed to persist dataset memory: {}", e);
            }

            if state.conversation.is_empty() {
                let prompt = build_system_prompt(&state.memory);
                state.conversation.seed_system(prompt);
            }

            let mut parts = vec![ContentPart::text(&request_text)];
            parts.extend(files.iter().map(|f| ContentPart::image(&f.data_url)));
            state.conversation.push_user_parts(parts);
            state.current_data = Some(files);

            state.conversation.messages().to_vec()
        };

        tracing::info!(messages = request.len(), "starting analysis");

        let response = match self.llm.chat(&request, ChatOptions::default()).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("analysis request failed: {}", e);
                let mut state = self.state.lock().await;
                self.show(&mut state, DisplayMessage::assistant(messages::ANALYSIS_ERROR));
                self.emit(SessionEvent::Loading(false));
                return Ok(TurnOutcome::Failed(e.to_string()));
            }
        };

        let reply = response.message.clone();
        let (conversation, previous_datasets, epoch) = {
            let mut state = self.state.lock().await;
            let epoch = state.epoch.next_analysis();
            state.conversation.push(reply.clone());
            Self::record_usage(&mut state, &response);
            self.persist_snapshot(&state);

            self.show(&mut state, DisplayMessage::user(request_text));
            if let Some(shown) = DisplayMessage::from_message(&reply) {
                self.show(&mut state, shown);
            }
            (state.conversation.messages().to_vec(), state.memory.len(), epoch)
        };
        drop(flight);

        self.render_analysis(&conversation, previous_datasets, epoch).await;
        self.emit(SessionEvent::Loading(false));

        Ok(TurnOutcome::Answered(reply))
    }

    async fn render_analysis(&self, conversation: &[Message], previous_datasets: usize, epoch: Epoch) {
        let llm = self.llm.as_ref();
        let (charts, recommendations, suggestions) = futures::join!(
            visualization::generate_visualization(
                llm,
                conversation,
                &self.config.palette,
                self.config.prediction_horizon,
            ),
            recommendations::generate_recommendations(llm, conversation, previous_datasets),
            suggestions::refresh_suggestions(llm, conversation),
        );

        let mut state = self.state.lock().await;
        if state.epoch.analysis != epoch.analysis {
            tracing::debug!("discarding analysis renders superseded by a later analysis or restart");
            return;
        }

        match charts {
            Ok(charts) => {
                state.charts = Some(charts.clone());
                self.emit(SessionEvent::Visualization(charts));
            }
            Err(e) => {
                tracing::warn!("visualization request failed: {}", e);
                state.charts = None;
                self.emit(SessionEvent::VisualizationUnavailable);
            }
        }

        let recommendations = recommendations.unwrap_or_else(|e| {
            tracing::warn!("recommendations request failed: {}", e);
            messages::RECOMMENDATIONS_UNAVAILABLE.to_string()
        });
        state.recommendations = Some(recommendations.clone());
        self.emit(SessionEvent::Recommendations(recommendations));

        if state.epoch.turn == epoch.turn {
            state.suggestions = suggestions.clone();
            self.emit(SessionEvent::Suggestions(suggestions));
        }
    }

    /// Send a typed (or transcribed) question.
    ///
    /// The conversation is trimmed to its cap after the question is appended
    /// and before the model is called. Blank input is ignored. If the call
    /// fails the question stays in the conversation and an error notice is
    /// shown in the log.
    pub async fn send_user_text(&self, text: &str) -> Result<TurnOutcome, DataSightError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }
        let flight = self.begin_turn()?;

        let request = {
            let mut state = self.state.lock().await;
            self.show(&mut state, DisplayMessage::user(text));
            state.conversation.push_user(text);
            state.conversation.trim();
            state.conversation.messages().to_vec()
        };

        tracing::debug!(messages = request.len(), "sending chat turn");

        let response = match self.llm.chat(&request, ChatOptions::default()).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("chat request failed: {}", e);
                let mut state = self.state.lock().await;
                self.show(&mut state, DisplayMessage::assistant(messages::CHAT_ERROR));
                return Ok(TurnOutcome::Failed(e.to_string()));
            }
        };

        let reply = response.message.clone();
        let (conversation, epoch) = {
            let mut state = self.state.lock().await;
            let epoch = state.epoch.next_turn();
            state.conversation.push(reply.clone());
            Self::record_usage(&mut state, &response);
            self.persist_snapshot(&state);
            if let Some(shown) = DisplayMessage::from_message(&reply) {
                self.show(&mut state, shown);
            }
            (state.conversation.messages().to_vec(), epoch)
        };
        drop(flight);

        self.update_suggestions(&conversation, epoch).await;

        Ok(TurnOutcome::Answered(reply))
    }

    /// Pick and clean a speech-recognition result, then send it like typed text.
    pub async fn send_voice(&self, alternatives: &[TranscriptAlternative]) -> Result<TurnOutcome, DataSightError> {
        let transcript = voice::select_transcript(alternatives, self.config.confidence_threshold);
        let cleaned = voice::clean_transcript(&transcript, &self.config.filler_words);
        self.send_user_text(&cleaned).await
    }

    /// Clear the conversation and current data, keeping the dataset memory.
    ///
    /// Waits for any in-flight turn to finish first. Renders still running
    /// for an earlier turn are discarded when they complete.
    pub async fn restart(&self) {
        let flight = self.flight.lock().await;

        let epoch = {
            let mut state = self.state.lock().await;
            let epoch = state.epoch.next_analysis();
            state.conversation.clear();
            state.current_data = None;
            state.charts = None;
            state.recommendations = None;
            state.log.clear();

            for key in [storage::CONVERSATION_KEY, storage::CURRENT_DATA_KEY] {
                if let Err(e) = self.store.remove(key) {
                    tracing::warn!(key, "failed to clear stored record: {}", e);
                }
            }

            self.show(&mut state, DisplayMessage::assistant(messages::RESTARTED));
            epoch
        };
        drop(flight);

        tracing::info!("chat restarted");
        self.update_suggestions(&[], epoch).await;
    }

    async fn update_suggestions(&self, conversation: &[Message], epoch: Epoch) {
        let suggestions = suggestions::refresh_suggestions(self.llm.as_ref(), conversation).await;
        let mut state = self.state.lock().await;
        if state.epoch.turn != epoch.turn {
            tracing::debug!("discarding suggestions superseded by a later turn or restart");
            return;
        }
        state.suggestions = suggestions.clone();
        self.emit(SessionEvent::Suggestions(suggestions));
    }

    /// Recompute suggestions from the current conversation.
    pub async fn refresh_suggestions(&self) -> Vec<Suggestion> {
        let (conversation, epoch) = {
            let state = self.state.lock().await;
            (state.conversation.messages().to_vec(), state.epoch)
        };
        self.update_suggestions(&conversation, epoch).await;
        self.suggestions().await
    }

    /// Detailed commentary for one chart of the latest visualization.
    /// `None` if no charts have been generated yet.
    pub async fn explain_chart(&self, kind: ChartKind) -> Option<String> {
        let chart = self.state.lock().await.charts.as_ref()?.get(kind).clone();
        Some(visualization::explain_chart(self.llm.as_ref(), kind, &chart).await)
    }

    pub fn is_busy(&self) -> bool {
        self.flight.try_lock().is_err()
    }

    pub async fn conversation(&self) -> Vec<Message> {
        self.state.lock().await.conversation.messages().to_vec()
    }

    pub async fn message_log(&self) -> Vec<DisplayMessage> {
        self.state.lock().await.log.clone()
    }

    pub async fn current_data(&self) -> Option<Vec<FileRecord>> {
        self.state.lock().await.current_data.clone()
    }

    pub async fn memory(&self) -> DatasetMemory {
        self.state.lock().await.memory.clone()
    }

    pub async fn charts(&self) -> Option<ChartSet> {
        self.state.lock().await.charts.clone()
    }

    pub async fn recommendations(&self) -> Option<String> {
        self.state.lock().await.recommendations.clone()
    }

    pub async fn suggestions(&self) -> Vec<Suggestion> {
        self.state.lock().await.suggestions.clone()
    }

    pub async fn usage(&self) -> UsageTracker {
        self.state.lock().await.usage.clone()
    }
}
