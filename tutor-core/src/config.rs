use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for the whole tutor.
///
/// Loaded once at process start and never mutated afterwards. Credentials are
/// not part of the file: each section names the environment variable holding
/// its key, and [`Config::resolve_credentials`] reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub storage: StorageMode,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

/// Which hosted API a provider section talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible `/v1/chat/completions` and `/v1/embeddings`
    OpenAi,
    /// Ollama `/api/chat` and `/api/embed`
    Ollama,
}

/// Configuration for the answer-generating model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
    /// Environment variable holding the API key. Ignored for Ollama.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(skip)]
    pub api_key: Option<String>,
}

/// Configuration for the embedding model.
///
/// `dimensions` must match the vectors already stored in the chunk store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: String,
    pub dimensions: usize,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(skip)]
    pub api_key: Option<String>,
}

/// How chunks are matched against the user's question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Cosine similarity between the query embedding and each chunk embedding
    #[default]
    Embedding,
    /// Case-insensitive substring match on chunk text, storage order, no scoring
    Substring,
}

/// Configuration for retrieval and ingestion chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default)]
    pub strategy: MatchStrategy,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful tutor. Answer questions about the curriculum using the provided context."
        .to_string()
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::default(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Chunk store backend.
///
/// Written in YAML as a `mode` tag next to the backend's fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum StorageMode {
    /// In-process store, empty at startup
    Memory,
    /// JSON array of documents on disk
    File { path: String },
    /// Remote Qdrant collection
    Qdrant {
        url: String,
        collection: String,
        #[serde(default)]
        api_key_env: Option<String>,
        #[serde(skip)]
        api_key: Option<String>,
    },
}

impl Default for StorageMode {
    fn default() -> Self {
        Self::File {
            path: "./data/curriculum.json".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com".to_string(),
            temperature: 0.7,
            api_key_env: default_api_key_env(),
            api_key: None,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: "text-embedding-ada-002".to_string(),
            base_url: "https://api.openai.com".to_string(),
            dimensions: 1536,
            api_key_env: default_api_key_env(),
            api_key: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            rag: RagConfig::default(),
            storage: StorageMode::default(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `config.yaml` if it exists, otherwise use defaults.
    pub fn load_or_default() -> Self {
        Self::load("config.yaml").unwrap_or_default()
    }

    /// Reads API keys from the environment variables named in the config.
    ///
    /// OpenAI-compatible providers require their key; Ollama never does. The
    /// Qdrant key is optional and only read when a variable is named.
    pub fn resolve_credentials(mut self) -> Result<Self> {
        self.resolve_credentials_with(|name| std::env::var(name).ok())?;
        Ok(self)
    }

    fn resolve_credentials_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.llm.provider == ProviderKind::OpenAi {
            let key = lookup(&self.llm.api_key_env)
                .ok_or_else(|| ConfigError::MissingCredential(self.llm.api_key_env.clone()))?;
            self.llm.api_key = Some(key);
        }

        if self.embedding.provider == ProviderKind::OpenAi {
            let key = lookup(&self.embedding.api_key_env).ok_or_else(|| {
                ConfigError::MissingCredential(self.embedding.api_key_env.clone())
            })?;
            self.embedding.api_key = Some(key);
        }

        if let StorageMode::Qdrant {
            api_key_env: Some(var),
            api_key,
            ..
        } = &mut self.storage
        {
            let key = lookup(var).ok_or_else(|| ConfigError::MissingCredential(var.clone()))?;
            *api_key = Some(key);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_rag_config_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.strategy, MatchStrategy::Embedding);
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 100);
    }

    #[test]
    fn test_storage_mode_default_is_file() {
        match StorageMode::default() {
            StorageMode::File { path } => assert_eq!(path, "./data/curriculum.json"),
            other => panic!("unexpected storage mode: {:?}", other),
        }
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
llm:
  provider: ollama
  model: llama3.2
  base_url: http://localhost:11434
  temperature: 0.2
embedding:
  provider: ollama
  model: nomic-embed-text
  base_url: http://localhost:11434
  dimensions: 768
rag:
  strategy: substring
storage:
  mode: qdrant
  url: http://localhost:6334
  collection: physics
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.llm.provider, ProviderKind::Ollama);
        assert_eq!(config.embedding.dimensions, 768);
        assert_eq!(config.rag.strategy, MatchStrategy::Substring);
        assert_eq!(config.rag.chunk_size, 1000);
        assert!(config.system_prompt.contains("tutor"));
        match config.storage {
            StorageMode::Qdrant { url, collection, api_key_env, .. } => {
                assert_eq!(url, "http://localhost:6334");
                assert_eq!(collection, "physics");
                assert!(api_key_env.is_none());
            }
            other => panic!("unexpected storage mode: {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/tutor/config.yaml");
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }

    #[test]
    fn test_resolve_credentials_openai() {
        let mut config = Config::default();
        config
            .resolve_credentials_with(|name| {
                (name == "OPENAI_API_KEY").then(|| "sk-test".to_string())
            })
            .unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.embedding.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_resolve_credentials_missing() {
        let mut config = Config::default();
        let err = config.resolve_credentials_with(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential(var) if var == "OPENAI_API_KEY"));
    }

    #[test]
    fn test_ollama_needs_no_credentials() {
        let mut config = Config::default();
        config.llm.provider = ProviderKind::Ollama;
        config.embedding.provider = ProviderKind::Ollama;
        config.resolve_credentials_with(|_| None).unwrap();
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_credentials_never_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".to_string());
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("sk-secret"));
    }
}
