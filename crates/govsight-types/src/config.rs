//! Configuration types for GovSight.
//!
//! Every section uses `#[serde(default)]` so a partial `config.toml` only
//! overrides the keys it names. The defaults below are the authoritative
//! values for thresholds and the parser vocabulary; `govsight init` writes
//! them out verbatim so they are visible and editable.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovsightConfig {
    /// Data directory (database, logs). Defaults to `~/.govsight`.
    pub home_dir: PathBuf,
    /// Default tracing filter when `RUST_LOG` is not set.
    pub log_level: String,
    pub memory: MemoryConfig,
    pub cascade: CascadeConfig,
    pub parser: ParserConfig,
    pub embedding: EmbeddingSettings,
    pub web: WebConfig,
    pub llm: LlmConfig,
}

impl Default for GovsightConfig {
    fn default() -> Self {
        Self {
            home_dir: default_home_dir(),
            log_level: "info".to_string(),
            memory: MemoryConfig::default(),
            cascade: CascadeConfig::default(),
            parser: ParserConfig::default(),
            embedding: EmbeddingSettings::default(),
            web: WebConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl GovsightConfig {
    /// Resolved path of the SQLite database.
    pub fn db_path(&self) -> PathBuf {
        self.memory
            .db_path
            .clone()
            .unwrap_or_else(|| self.home_dir.join("govsight.db"))
    }
}

/// `~/.govsight`, or a temp dir when no home directory is known.
pub fn default_home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".govsight")
}

/// Fact and passage storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Explicit database path. `None` means `<home_dir>/govsight.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

/// Cascade thresholds and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Minimum top score for a vector hit to be accepted.
    pub vector_threshold: f32,
    /// How many passages to request from the semantic index.
    pub top_k: usize,
    /// Per-query deadline in seconds. `0` disables the deadline.
    pub query_timeout_secs: u64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            vector_threshold: 0.75,
            top_k: 5,
            query_timeout_secs: 30,
        }
    }
}

/// A question template recognized by the fact parser.
///
/// `pattern` is a regex with a `subject` named group and, unless `attribute`
/// is set, an `attr` named group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionTemplate {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl QuestionTemplate {
    fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            attribute: None,
        }
    }

    fn fixed(pattern: &str, attribute: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            attribute: Some(attribute.to_string()),
        }
    }
}

/// A vocabulary attribute: canonical name, accepted aliases and an optional
/// answer template using `{subject}`, `{attribute}` and `{value}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl AttributeSpec {
    fn new(name: &str, aliases: &[&str], template: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            template: template.map(String::from),
        }
    }
}

/// Fact parser vocabulary. Configured lists replace the defaults entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub templates: Vec<QuestionTemplate>,
    pub attributes: Vec<AttributeSpec>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            templates: vec![
                QuestionTemplate::new(
                    r"(?i)^\s*(?:who|what)(?:'s|\s+is|\s+was|\s+are)\s+the\s+(?P<attr>.+?)\s+of\s+(?P<subject>.+?)[\s?.!]*$",
                ),
                QuestionTemplate::new(
                    r"(?i)^\s*(?:tell\s+me|give\s+me|find|name)\s+the\s+(?P<attr>.+?)\s+of\s+(?P<subject>.+?)[\s?.!]*$",
                ),
                QuestionTemplate::new(
                    r"(?i)^\s*(?:who|what)(?:'s|\s+is|\s+was)\s+(?P<subject>.+?)'s\s+(?P<attr>.+?)[\s?.!]*$",
                ),
                QuestionTemplate::fixed(
                    r"(?i)^\s*how\s+many\s+people\s+live\s+in\s+(?P<subject>.+?)[\s?.!]*$",
                    "population",
                ),
                QuestionTemplate::fixed(
                    r"(?i)^\s*what\s+county\s+is\s+(?P<subject>.+?)\s+in[\s?.!]*$",
                    "county",
                ),
            ],
            attributes: vec![
                AttributeSpec::new("mayor", &["city mayor"], None),
                AttributeSpec::new("governor", &["state governor"], None),
                AttributeSpec::new("senator", &["us senator", "state senator"], None),
                AttributeSpec::new(
                    "representative",
                    &["congressman", "congresswoman", "congressperson", "us representative"],
                    None,
                ),
                AttributeSpec::new(
                    "population",
                    &["number of residents", "number of people", "pop"],
                    Some("{subject} has a population of {value}"),
                ),
                AttributeSpec::new(
                    "capital",
                    &["capital city"],
                    Some("the capital of {subject} is {value}"),
                ),
                AttributeSpec::new("county", &[], Some("{subject} is located in {value}")),
                AttributeSpec::new(
                    "zip code",
                    &["zip", "zipcode", "postal code"],
                    Some("the zip code of {subject} is {value}"),
                ),
            ],
        }
    }
}

/// Embedding provider used by the local semantic index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Provider name (openai, ollama, together, ...).
    pub provider: String,
    pub model: String,
    /// Env var holding the API key. Empty for keyless local providers.
    pub api_key_env: String,
    /// Overrides the provider's default base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
        }
    }
}

/// Web search provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    /// First provider with a configured key: SerpAPI, Brave, Tavily, then DuckDuckGo.
    #[default]
    Auto,
    SerpApi,
    Brave,
    Tavily,
    DuckDuckGo,
}

/// API key location for a search provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderKey {
    pub api_key_env: String,
}

impl ProviderKey {
    fn env(name: &str) -> Self {
        Self {
            api_key_env: name.to_string(),
        }
    }
}

/// Web fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// When false the web tier always reports unavailable.
    pub enabled: bool,
    pub search_provider: SearchProvider,
    /// Search results fed to the summarizer.
    pub max_results: usize,
    /// Search result cache TTL. `0` disables the cache.
    pub cache_ttl_secs: u64,
    /// HTTP timeout for search providers.
    pub timeout_secs: u64,
    /// Confidence reported for a summarized web answer.
    pub summary_confidence: f32,
    /// Confidence reported when only a raw snippet is available.
    pub snippet_confidence: f32,
    pub serpapi: ProviderKey,
    pub brave: ProviderKey,
    pub tavily: ProviderKey,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_provider: SearchProvider::Auto,
            max_results: 5,
            cache_ttl_secs: 900,
            timeout_secs: 15,
            summary_confidence: 0.6,
            snippet_confidence: 0.4,
            serpapi: ProviderKey::env("SERPAPI_API_KEY"),
            brave: ProviderKey::env("BRAVE_API_KEY"),
            tavily: ProviderKey::env("TAVILY_API_KEY"),
        }
    }
}

/// Chat-completion model used to summarize web results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            temperature: 0.2,
            max_tokens: 400,
        }
    }
}
