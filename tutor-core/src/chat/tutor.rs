//! Per-turn question answering over the curriculum.
//!
//! A turn is strictly sequential: retrieve context, then generate. Failures
//! never escape as errors; each one is mapped to a fixed user-facing message
//! and a [`TurnStatus`] that records what went wrong.

use super::conversation::{Conversation, Role};
use crate::config::Config;
use crate::provider::{create_provider, ChatRequest, ChatResponse, Message, Provider, ProviderError};
use crate::rag::{create_chunk_store, render_context, RagEngine, RagError, Retrieval};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Shown when the question could not be embedded.
pub const EMBEDDING_FAILED_MESSAGE: &str =
    "Sorry, I couldn't process your question right now. Please try again later.";

/// Shown when the answer generator failed or returned nothing.
pub const GENERATION_FAILED_MESSAGE: &str = "Sorry, I couldn't generate a response.";

/// Shown when the curriculum could not be read during a turn.
pub const STORE_FAILED_MESSAGE: &str =
    "Sorry, I couldn't read the curriculum right now. Please try again later.";

/// Shown when the curriculum holds no chunks at all.
pub const NO_DATA_MESSAGE: &str = "No curriculum data is available yet.";

/// Errors raised while wiring the tutor at startup.
#[derive(Debug, Error)]
pub enum TutorError {
    #[error("Provider setup failed: {0}")]
    Provider(#[from] ProviderError),

    /// The chunk store could not be reached. Fatal at startup.
    #[error("Chunk store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type Result<T> = std::result::Result<T, TutorError>;

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Answered,
    NoData,
    EmbeddingFailed,
    GenerationFailed,
    StoreFailed,
}

/// The result of one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Text shown to the user: the generated answer or a fixed message.
    pub answer: String,
    /// Rendered context sent to the generator, if retrieval produced one.
    pub context: Option<String>,
    pub status: TurnStatus,
}

impl TurnOutcome {
    fn failed(answer: &str, context: Option<String>, status: TurnStatus) -> Self {
        Self {
            answer: answer.to_string(),
            context,
            status,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.status == TurnStatus::Answered
    }
}

/// Answers curriculum questions with retrieved context.
#[derive(Clone)]
pub struct Tutor {
    config: Config,
    generator: Arc<dyn Provider>,
    rag: RagEngine,
}

impl Tutor {
    /// Builds providers and the chunk store from configuration and checks
    /// the store is reachable.
    ///
    /// Credentials must already be resolved (see
    /// [`Config::resolve_credentials`]).
    ///
    /// # Errors
    ///
    /// - [`TutorError::Provider`] if a provider is missing its API key
    /// - [`TutorError::StoreUnavailable`] if the store cannot be opened or pinged
    pub async fn connect(config: Config) -> Result<Self> {
        let generator = create_provider(
            config.llm.provider,
            &config.llm.base_url,
            config.llm.api_key.as_deref(),
        )?;
        let embedding_provider = create_provider(
            config.embedding.provider,
            &config.embedding.base_url,
            config.embedding.api_key.as_deref(),
        )?;

        let store = create_chunk_store(&config.storage, config.embedding.dimensions as u64)
            .await
            .map_err(|e| TutorError::StoreUnavailable(format!("{e:#}")))?;

        let rag = RagEngine::new(&config, embedding_provider, store);
        rag.ping()
            .await
            .map_err(|e| TutorError::StoreUnavailable(e.to_string()))?;

        info!(
            llm = %config.llm.model,
            embedding = %config.embedding.model,
            strategy = ?config.rag.strategy,
            "Tutor connected"
        );

        Ok(Self::from_parts(config, generator, rag))
    }

    /// Assembles a tutor from already-built parts.
    pub fn from_parts(config: Config, generator: Arc<dyn Provider>, rag: RagEngine) -> Self {
        Self {
            config,
            generator,
            rag,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rag(&self) -> &RagEngine {
        &self.rag
    }

    /// Runs one turn and returns the updated conversation with its outcome.
    ///
    /// The user turn and the assistant turn (answer or fixed message) are
    /// always appended.
    pub async fn handle_turn(
        &self,
        conversation: Conversation,
        query: &str,
    ) -> (Conversation, TurnOutcome) {
        self.handle_turn_stream(conversation, query, |_| {}).await
    }

    /// Like [`handle_turn`](Self::handle_turn), forwarding generated text to
    /// `on_chunk` as it arrives.
    ///
    /// `on_chunk` only sees generator output; fixed failure messages are
    /// reported through the returned outcome.
    pub async fn handle_turn_stream<F>(
        &self,
        mut conversation: Conversation,
        query: &str,
        on_chunk: F,
    ) -> (Conversation, TurnOutcome)
    where
        F: FnMut(&str) + Send,
    {
        let history = conversation.to_messages();
        let outcome = self.answer(&history, query, on_chunk).await;

        conversation.push(Role::User, query);
        conversation.push(Role::Assistant, outcome.answer.clone());
        (conversation, outcome)
    }

    async fn answer<F>(&self, history: &[Message], query: &str, on_chunk: F) -> TurnOutcome
    where
        F: FnMut(&str) + Send,
    {
        let hits = match self.rag.retrieve(query).await {
            Ok(Retrieval::NoData) => {
                info!("Curriculum is empty, skipping generation");
                return TurnOutcome::failed(NO_DATA_MESSAGE, None, TurnStatus::NoData);
            }
            Ok(Retrieval::Context(hits)) => hits,
            Err(RagError::EmbeddingUnavailable(e)) => {
                warn!(error = %e, "Query embedding failed");
                return TurnOutcome::failed(
                    EMBEDDING_FAILED_MESSAGE,
                    None,
                    TurnStatus::EmbeddingFailed,
                );
            }
            Err(e) => {
                warn!(error = %e, "Retrieval failed");
                return TurnOutcome::failed(STORE_FAILED_MESSAGE, None, TurnStatus::StoreFailed);
            }
        };

        let context = render_context(&hits);
        debug!(hits = hits.len(), "Generating answer");

        match self.generate(history, query, &context, on_chunk).await {
            Ok(answer) => TurnOutcome {
                answer,
                context: Some(context),
                status: TurnStatus::Answered,
            },
            Err(e) => {
                warn!(error = %e, "Answer generation failed");
                TurnOutcome::failed(
                    GENERATION_FAILED_MESSAGE,
                    Some(context),
                    TurnStatus::GenerationFailed,
                )
            }
        }
    }

    async fn generate<F>(
        &self,
        history: &[Message],
        query: &str,
        context: &str,
        mut on_chunk: F,
    ) -> std::result::Result<String, ProviderError>
    where
        F: FnMut(&str) + Send,
    {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(&self.config.system_prompt));
        messages.extend_from_slice(history);
        messages.push(Message::user(user_prompt(context, query)));

        let request = ChatRequest::new(&self.config.llm.model, messages)
            .with_temperature(self.config.llm.temperature);

        let mut answer = String::new();
        self.generator
            .chat(
                request,
                Box::new(|chunk: ChatResponse| {
                    if !chunk.content.is_empty() {
                        on_chunk(&chunk.content);
                        answer.push_str(&chunk.content);
                    }
                }),
            )
            .await?;

        if answer.trim().is_empty() {
            return Err(ProviderError::Other("empty response".to_string()));
        }

        Ok(answer)
    }
}

fn user_prompt(context: &str, query: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {query}")
}
