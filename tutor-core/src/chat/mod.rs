//! Conversation turns: retrieval, generation and history.
//!
//! ```text
//! question ─► RagEngine::retrieve ─► NoData ──────────► NO_DATA_MESSAGE
//!                    │
//!                    ├─► embedding error ─────────────► EMBEDDING_FAILED_MESSAGE
//!                    │
//!                    └─► context ─► generator ─► answer
//!                                        └─ error ───► GENERATION_FAILED_MESSAGE
//! ```

mod conversation;
mod tutor;

pub use conversation::{Conversation, ConversationTurn, Role};
pub use tutor::{
    Tutor, TutorError, TurnOutcome, TurnStatus, EMBEDDING_FAILED_MESSAGE,
    GENERATION_FAILED_MESSAGE, NO_DATA_MESSAGE, STORE_FAILED_MESSAGE,
};
