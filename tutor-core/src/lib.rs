//! tutor-core - Curriculum question-answering engine
//!
//! Provides the building blocks of the tutor:
//! - Provider abstraction for embeddings and chat (OpenAI-compatible, Ollama)
//! - Chunk stores (memory, JSON file, Qdrant) and brute-force similarity retrieval
//! - Conversation turns with fixed failure messages
//! - YAML configuration with credentials from the environment
//!
//! ## Primary API
//!
//! Build a [`Tutor`] with [`Tutor::connect`] and drive it with
//! [`Tutor::handle_turn`], passing the [`Conversation`] in and getting it back.

pub mod chat;
pub mod config;
pub mod provider;
pub mod rag;

pub use chat::{Conversation, ConversationTurn, Role, Tutor, TutorError, TurnOutcome, TurnStatus};
pub use config::{Config, ConfigError, MatchStrategy, StorageMode};
pub use rag::{RagEngine, RagError, Retrieval, ScoredChunk};

pub use provider::{ChatRequest, ChatResponse, Message, Provider, ProviderError};
