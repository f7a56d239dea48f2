//! tutor - Curriculum question-answering engine
//!
//! This is the convenience wrapper crate that re-exports `tutor-core`.
//!
//! # Quick Start
//!
//! ```no_run
//! use tutor::prelude::*;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load_or_default().resolve_credentials()?;
//! let tutor = Tutor::connect(config).await?;
//!
//! let (conversation, outcome) = tutor
//!     .handle_turn(Conversation::new(), "What is photosynthesis?")
//!     .await;
//! println!("{}", outcome.answer);
//! # let _ = conversation;
//! # Ok(())
//! # }
//! ```

// Re-export core
pub use tutor_core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use tutor_core::chat::{
        EMBEDDING_FAILED_MESSAGE, GENERATION_FAILED_MESSAGE, NO_DATA_MESSAGE,
        STORE_FAILED_MESSAGE,
    };
    pub use tutor_core::rag::{ChunkStore, MemoryStore, TOP_K};
    pub use tutor_core::*;
}
