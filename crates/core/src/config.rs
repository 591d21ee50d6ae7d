//! Configuration management for docvec.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.docvec/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources win. The configuration is workspace-centric, with local state
//! (such as the SQLite index) stored under `.docvec/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Embedding providers known to the provider factory.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["mock", "openai"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docvec/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub json_logs: bool,

    /// Chunking and batching settings
    pub pipeline: PipelineSettings,

    /// Embedding provider settings
    pub embedding: EmbeddingSettings,

    /// Vector index settings
    pub index: IndexSettings,
}

/// What the pipeline does when a single document fails to split or embed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentErrorPolicy {
    /// Stop the whole run at the first failing document.
    #[default]
    Abort,
    /// Log the failure and continue with the next document.
    Skip,
}

/// Similarity metric used when creating a vector index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    Dotproduct,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
            Metric::Dotproduct => "dotproduct",
        }
    }
}

/// Vector index backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// Remote Pinecone index over HTTP
    #[default]
    Pinecone,
    /// Local single-file SQLite index
    Sqlite,
}

/// Chunking and batching settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSettings {
    /// Maximum chunk size in characters
    #[serde(default = "default_chunk_max_size")]
    pub chunk_max_size: usize,

    /// Number of records per upsert request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Vector dimension of the target index
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Failure policy for individual documents
    #[serde(default)]
    pub on_document_error: DocumentErrorPolicy,
}

/// Embedding provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name: "mock" or "openai"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Override for the provider base URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the provider API key
    #[serde(default = "default_embedding_api_key_env")]
    pub api_key_env: String,

    /// Maximum number of inputs per provider HTTP request
    #[serde(default = "default_request_batch_size")]
    pub request_batch_size: usize,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Vector index settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    #[serde(default)]
    pub backend: IndexBackend,

    /// Index name
    #[serde(default = "default_index_name")]
    pub name: String,

    /// Metric used when the index has to be created
    #[serde(default)]
    pub metric: Metric,

    /// Environment variable holding the Pinecone API key
    #[serde(default = "default_index_api_key_env")]
    pub api_key_env: String,

    /// Override for the Pinecone control plane URL
    #[serde(default)]
    pub controller_url: Option<String>,

    /// Serverless cloud for newly created Pinecone indexes
    #[serde(default = "default_cloud")]
    pub cloud: String,

    /// Serverless region for newly created Pinecone indexes
    #[serde(default = "default_region")]
    pub region: String,

    /// SQLite file path (defaults to .docvec/index.sqlite in the workspace)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// How long to wait for a freshly created index to become ready
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
}

fn default_chunk_max_size() -> usize {
    1000
}

fn default_batch_size() -> usize {
    100
}

fn default_dimension() -> usize {
    1536
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_embedding_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_batch_size() -> usize {
    100
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_index_name() -> String {
    "docvec".to_string()
}

fn default_index_api_key_env() -> String {
    "PINECONE_API_KEY".to_string()
}

fn default_cloud() -> String {
    "aws".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_ready_timeout_secs() -> u64 {
    80
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_max_size: default_chunk_max_size(),
            batch_size: default_batch_size(),
            dimension: default_dimension(),
            on_document_error: DocumentErrorPolicy::default(),
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            endpoint: None,
            api_key_env: default_embedding_api_key_env(),
            request_batch_size: default_request_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            name: default_index_name(),
            metric: Metric::default(),
            api_key_env: default_index_api_key_env(),
            controller_url: None,
            cloud: default_cloud(),
            region: default_region(),
            path: None,
            ready_timeout_secs: default_ready_timeout_secs(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    pipeline: Option<PipelineSettings>,
    embedding: Option<EmbeddingSettings>,
    index: Option<IndexSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            json_logs: false,
            pipeline: PipelineSettings::default(),
            embedding: EmbeddingSettings::default(),
            index: IndexSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `DOCVEC_WORKSPACE`: Override workspace path
    /// - `DOCVEC_CONFIG`: Path to config file
    /// - `DOCVEC_INDEX`: Index name
    /// - `DOCVEC_EMBEDDING_PROVIDER`: Embedding provider
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use docvec_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Index: {}", config.index.name);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Like [`load`](Self::load), with a workspace and config file chosen on
    /// the command line.
    ///
    /// Explicit paths win over `DOCVEC_WORKSPACE` and `DOCVEC_CONFIG`. The
    /// workspace is settled first so that its `.docvec/config.yaml` is the
    /// file that gets read, and the file is merged exactly once, before the
    /// environment.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        Self::resolve(workspace, config_file, |key| std::env::var(key).ok())
    }

    fn resolve(
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env("DOCVEC_WORKSPACE").map(PathBuf::from)) {
            config.workspace = workspace;
        }
        config.config_file = config_file.or_else(|| env("DOCVEC_CONFIG").map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        match config.config_file.clone() {
            Some(path) => config = config.merge_yaml(&path)?,
            None => {
                let path = config.docvec_dir().join("config.yaml");
                if path.exists() {
                    config = config.merge_yaml(&path)?;
                }
            }
        }

        Ok(config.apply_env(env))
    }

    /// Environment variables override the YAML config.
    fn apply_env(mut self, env: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(index) = env("DOCVEC_INDEX") {
            self.index.name = index;
        }

        if let Some(provider) = env("DOCVEC_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }

        if let Some(level) = env("RUST_LOG") {
            self.log_level = Some(level);
        }

        if env("NO_COLOR").is_some() {
            self.no_color = true;
        }

        self
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        tracing::debug!("Merging config file {:?}", path);

        Ok(self.merge(config_file))
    }

    fn merge(mut self, file: ConfigFile) -> Self {
        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(json) = logging.json {
                self.json_logs = json;
            }
        }

        if let Some(pipeline) = file.pipeline {
            self.pipeline = pipeline;
        }
        if let Some(embedding) = file.embedding {
            self.embedding = embedding;
        }
        if let Some(index) = file.index {
            self.index = index;
        }

        self
    }

    /// Apply CLI logging overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and the
    /// config file. Workspace and config file paths are taken by
    /// [`load_with`](Self::load_with).
    pub fn with_overrides(
        mut self,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        json_logs: bool,
    ) -> Self {
        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if json_logs {
            self.json_logs = true;
        }

        self
    }

    /// Get the path to the .docvec directory.
    pub fn docvec_dir(&self) -> PathBuf {
        self.workspace.join(".docvec")
    }

    /// Ensure the .docvec directory exists.
    pub fn ensure_docvec_dir(&self) -> AppResult<()> {
        let dir = self.docvec_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .docvec directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Path of the local SQLite index file.
    pub fn sqlite_index_path(&self) -> PathBuf {
        self.index
            .path
            .clone()
            .unwrap_or_else(|| self.docvec_dir().join("index.sqlite"))
    }

    /// Read an API key from the named environment variable.
    pub fn resolve_api_key(env_var: &str) -> AppResult<String> {
        std::env::var(env_var).map_err(|_| {
            AppError::Config(format!(
                "API key not found in environment variable: {}",
                env_var
            ))
        })
    }

    /// Validate configuration values.
    ///
    /// Does not check API keys; those are resolved when a client is built.
    pub fn validate(&self) -> AppResult<()> {
        if self.pipeline.chunk_max_size == 0 {
            return Err(AppError::Config(
                "pipeline.chunkMaxSize must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.batch_size == 0 {
            return Err(AppError::Config(
                "pipeline.batchSize must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.dimension == 0 {
            return Err(AppError::Config(
                "pipeline.dimension must be greater than 0".to_string(),
            ));
        }

        let provider = self.embedding.provider.as_str();
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.request_batch_size == 0 {
            return Err(AppError::Config(
                "embedding.requestBatchSize must be greater than 0".to_string(),
            ));
        }

        if self.index.name.trim().is_empty() {
            return Err(AppError::Config("index.name is required".to_string()));
        }

        Ok(())
    }
}
