//! Example: ingest a small curriculum into memory and ask about it.
//!
//! Uses Ollama for both embeddings and chat, so it needs a local server with
//! `nomic-embed-text` and `llama3.2` pulled:
//!
//! ```text
//! ollama pull nomic-embed-text && ollama pull llama3.2
//! cargo run --example curriculum_chat
//! ```

use std::io::Write;
use tutor::config::ProviderKind;
use tutor::prelude::*;
use tracing_subscriber::EnvFilter;

const CURRICULUM: &str = "\
Photosynthesis converts light energy into chemical energy stored in glucose.
It takes place in the chloroplasts of plant cells.\x0c\
Cellular respiration releases the energy stored in glucose.
It takes place in the mitochondria and produces carbon dioxide and water.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tutor_core=info".parse()?))
        .init();

    let mut config = Config::default();
    config.llm.provider = ProviderKind::Ollama;
    config.llm.base_url = "http://localhost:11434".into();
    config.llm.model = "llama3.2".into();
    config.embedding.provider = ProviderKind::Ollama;
    config.embedding.base_url = "http://localhost:11434".into();
    config.embedding.model = "nomic-embed-text".into();
    config.embedding.dimensions = 768;
    config.rag.chunk_size = 200;
    config.rag.chunk_overlap = 20;
    config.storage = StorageMode::Memory;

    let tutor = Tutor::connect(config).await?;
    let chunks = tutor.rag().ingest_text("biology", CURRICULUM).await?;
    println!("Ingested {} chunks\n", chunks);

    let mut conversation = Conversation::new();
    for question in ["Where does photosynthesis happen?", "And what does the other process produce?"] {
        println!("You: {}", question);
        print!("Tutor: ");
        let (next, outcome) = tutor
            .handle_turn_stream(conversation, question, |chunk| {
                print!("{}", chunk);
                let _ = std::io::stdout().flush();
            })
            .await;
        if !outcome.is_answered() {
            print!("{}", outcome.answer);
        }
        println!("\n");
        conversation = next;
    }

    Ok(())
}
