use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tutor_core::chat::{Conversation, Role, Tutor, TurnStatus};
use tutor_core::config::{Config, StorageMode};
use tutor_core::rag::Retrieval;

#[derive(Parser)]
#[command(name = "tutor")]
#[command(about = "Ask questions about your curriculum", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Start an interactive tutoring session")]
    Chat,

    #[command(about = "Ask a single question")]
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },

    #[command(about = "Print the context retrieved for a question")]
    Retrieve {
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },

    #[command(about = "Ingest a curriculum file or directory")]
    Ingest {
        path: PathBuf,

        #[arg(long, help = "Remove existing documents first")]
        reset: bool,
    },

    #[command(about = "Show document and chunk counts")]
    Stats,

    #[command(about = "Model management commands")]
    Model {
        #[command(subcommand)]
        command: ModelCommands,
    },
}

#[derive(Subcommand)]
enum ModelCommands {
    #[command(about = "Show current models")]
    Show,

    #[command(about = "Set the answer generation model")]
    Set {
        #[arg(help = "Model name (e.g., 'gpt-4o-mini' or 'llama3.2')")]
        model: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tutor_core=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Show => show_config(&cli.config),
        Commands::Chat => chat(&cli.config).await,
        Commands::Ask { question } => ask(&cli.config, &question.join(" ")).await,
        Commands::Retrieve { question } => retrieve(&cli.config, &question.join(" ")).await,
        Commands::Ingest { path, reset } => ingest(&cli.config, &path, reset).await,
        Commands::Stats => stats(&cli.config).await,
        Commands::Model { command } => match command {
            ModelCommands::Show => show_model(&cli.config),
            ModelCommands::Set { model } => set_model(&cli.config, &model),
        },
    }
}

fn load_config(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        warn!(path = %config_path.display(), "Config file not found, using defaults");
        return Ok(Config::default());
    }

    Config::load(config_path).context("Failed to load config")
}

/// Loads config, resolves credentials and connects. Any failure here is fatal.
async fn connect(config_path: &Path) -> Result<Tutor> {
    let config = load_config(config_path)?
        .resolve_credentials()
        .context("Failed to resolve credentials")?;

    Tutor::connect(config).await.context("Failed to start tutor")
}

fn show_config(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    println!("{}", "Current Configuration:".bold().green());
    println!();
    println!("{}", "LLM:".bold());
    println!("  Provider:       {:?}", config.llm.provider);
    println!("  Model:          {}", config.llm.model.cyan());
    println!("  Base URL:       {}", config.llm.base_url);
    println!("  Temperature:    {}", config.llm.temperature);
    println!("  API Key Env:    {}", config.llm.api_key_env);
    println!();
    println!("{}", "Embedding:".bold());
    println!("  Provider:       {:?}", config.embedding.provider);
    println!("  Model:          {}", config.embedding.model.cyan());
    println!("  Base URL:       {}", config.embedding.base_url);
    println!("  Dimensions:     {}", config.embedding.dimensions);
    println!();
    println!("{}", "RAG:".bold());
    println!("  Strategy:       {:?}", config.rag.strategy);
    println!("  Chunk Size:     {}", config.rag.chunk_size);
    println!("  Chunk Overlap:  {}", config.rag.chunk_overlap);
    println!("  Top K:          {}", tutor_core::rag::TOP_K);
    println!();
    println!("{}", "Storage:".bold());
    match &config.storage {
        StorageMode::Memory => println!("  Mode:           memory"),
        StorageMode::File { path } => println!("  Mode:           file @ {}", path),
        StorageMode::Qdrant { url, collection, .. } => {
            println!("  Mode:           qdrant @ {}", url);
            println!("  Collection:     {}", collection);
        }
    }

    Ok(())
}

async fn chat(config_path: &Path) -> Result<()> {
    let tutor = connect(config_path).await?;

    println!("{}", "Curriculum tutor".bold().green());
    println!("Type {} to reset, {} to review, {} to leave.", "/clear".bold(), "/history".bold(), "exit".bold());
    println!();

    let mut conversation = Conversation::new();
    let stdin = std::io::stdin();

    loop {
        print!("{} ", "you>".cyan().bold());
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        match input {
            "" => continue,
            "exit" | "quit" => break,
            "/clear" => {
                conversation.clear();
                println!("{}", "Conversation cleared.".yellow());
                continue;
            }
            "/history" => {
                print_history(&conversation);
                continue;
            }
            _ => {}
        }

        conversation = run_turn(&tutor, conversation, input).await?;
    }

    Ok(())
}

fn print_history(conversation: &Conversation) {
    if conversation.is_empty() {
        println!("{}", "No messages yet.".yellow());
        return;
    }

    for turn in conversation.turns() {
        let label = match turn.role {
            Role::User => "you".cyan().bold(),
            Role::Assistant => "tutor".green().bold(),
        };
        println!("{}: {}", label, turn.content);
    }
}

/// Streams one answer to stdout and hands the conversation back.
async fn run_turn(tutor: &Tutor, conversation: Conversation, question: &str) -> Result<Conversation> {
    print!("{} ", "tutor>".green().bold());
    std::io::stdout().flush()?;

    let (conversation, outcome) = tutor
        .handle_turn_stream(conversation, question, |chunk| {
            print!("{}", chunk);
            let _ = std::io::stdout().flush();
        })
        .await;

    match outcome.status {
        TurnStatus::Answered => {}
        TurnStatus::NoData => print!("{}", outcome.answer.yellow()),
        _ => print!("{}", outcome.answer.red()),
    }
    println!("\n");

    Ok(conversation)
}

async fn ask(config_path: &Path, question: &str) -> Result<()> {
    let tutor = connect(config_path).await?;
    run_turn(&tutor, Conversation::new(), question).await?;
    Ok(())
}

async fn retrieve(config_path: &Path, question: &str) -> Result<()> {
    let tutor = connect(config_path).await?;
    let retrieval = tutor
        .rag()
        .retrieve(question)
        .await
        .context("Retrieval failed")?;

    match retrieval {
        Retrieval::NoData => println!("{}", "No curriculum data in the store.".yellow()),
        Retrieval::Context(hits) if hits.is_empty() => {
            println!("{}", "No matching chunks.".yellow())
        }
        Retrieval::Context(hits) => {
            println!("{}", tutor_core::rag::render_context(&hits));
        }
    }

    Ok(())
}

async fn ingest(config_path: &Path, path: &Path, reset: bool) -> Result<()> {
    let tutor = connect(config_path).await?;
    let rag = tutor.rag();

    if reset {
        rag.clear().await.context("Failed to clear store")?;
        println!("{} Cleared existing documents", "✓".green().bold());
    }

    println!("{} Ingesting {}...", "→".blue(), path.display());
    let report = rag
        .ingest_path(path)
        .await
        .with_context(|| format!("Failed to ingest {}", path.display()))?;

    println!(
        "{} Ingested {} files ({} chunks)",
        "✓".green().bold(),
        report.files,
        report.chunks
    );

    Ok(())
}

async fn stats(config_path: &Path) -> Result<()> {
    let tutor = connect(config_path).await?;
    let rag = tutor.rag();

    let documents = rag.document_count().await.context("Failed to count documents")?;
    let chunks = rag.count().await.context("Failed to count chunks")?;

    println!("{}", "Curriculum:".bold().green());
    println!("  Documents:  {}", documents);
    println!("  Chunks:     {}", chunks);
    println!("  Strategy:   {:?}", rag.strategy());
    println!("  Dimensions: {}", rag.dimensions());

    Ok(())
}

fn show_model(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    println!("{}: {}", "Answer model".bold(), config.llm.model.cyan());
    println!("{}: {}", "Embedding model".bold(), config.embedding.model.cyan());
    Ok(())
}

fn set_model(config_path: &Path, model: &str) -> Result<()> {
    let content = std::fs::read_to_string(config_path)
        .context("Failed to read config file")?;

    let updated_content = with_llm_model(&content, model)?;

    std::fs::write(config_path, updated_content)
        .context("Failed to write config file")?;

    println!(
        "{} Model updated to: {}",
        "✓".green().bold(),
        model.cyan()
    );

    Ok(())
}

/// Rewrites `llm.model` in a YAML document, leaving other keys untouched.
fn with_llm_model(content: &str, model: &str) -> Result<String> {
    let mut config: serde_yaml::Value = serde_yaml::from_str(content)
        .context("Failed to parse config")?;

    let llm = config
        .get_mut("llm")
        .and_then(|llm| llm.as_mapping_mut())
        .context("Config has no llm section")?;
    llm.insert(
        serde_yaml::Value::String("model".to_string()),
        serde_yaml::Value::String(model.to_string()),
    );

    serde_yaml::to_string(&config).context("Failed to serialize config")
}
