//! GovsightKernel: boots the stores and adapters and owns the cascade.

use crate::cascade::{Cascade, CascadeStatsSnapshot};
use crate::error::{KernelError, KernelResult};
use govsight_memory::MemorySubstrate;
use govsight_runtime::adapters::{SemanticIndex, WebFallback};
use govsight_runtime::embedding::{create_embedding_driver, EmbeddingDriver};
use govsight_runtime::llm::{create_chat_driver, ChatDriver};
use govsight_runtime::parser::FactParser;
use govsight_runtime::vector_index::EmbeddingIndex;
use govsight_runtime::web_cache::SearchCache;
use govsight_runtime::web_reasoner::WebReasoner;
use govsight_runtime::web_search::WebSearchEngine;
use govsight_types::config::GovsightConfig;
use govsight_types::fact::{Fact, ParsedStatement};
use govsight_types::retrieval::{NoAnswerFound, RetrievalResult};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Store sizes plus this process's cascade counters.
#[derive(Debug, Clone, Serialize)]
pub struct KernelStats {
    pub facts: usize,
    pub passages: usize,
    pub queries: CascadeStatsSnapshot,
}

/// The booted system.
pub struct GovsightKernel {
    config: GovsightConfig,
    memory: MemorySubstrate,
    parser: Arc<FactParser>,
    index: Arc<EmbeddingIndex>,
    cascade: Cascade,
}

impl GovsightKernel {
    /// Open the database, compile the parser and build the adapters.
    ///
    /// Neither a database that cannot be opened nor a missing API key fails
    /// boot: the affected tier reports unavailable at query time and the
    /// cascade moves on.
    pub fn boot(config: GovsightConfig) -> KernelResult<Self> {
        let db_path = config.db_path();
        let memory = match open_memory(&db_path) {
            Ok(memory) => memory,
            Err(reason) => {
                warn!(
                    db = %db_path.display(),
                    error = %reason,
                    "Fact database unavailable, local tier disabled"
                );
                MemorySubstrate::unavailable(reason)
            }
        };
        Self::boot_with_memory(config, memory)
    }

    /// Boot over an already-open substrate (in-memory databases in tests).
    pub fn boot_with_memory(config: GovsightConfig, memory: MemorySubstrate) -> KernelResult<Self> {
        let parser = Arc::new(FactParser::from_config(&config.parser)?);

        let embedder: Option<Arc<dyn EmbeddingDriver>> =
            match create_embedding_driver(&config.embedding) {
                Ok(driver) => Some(Arc::from(driver)),
                Err(e) => {
                    warn!(error = %e, "Semantic tier disabled");
                    None
                }
            };
        let index = Arc::new(EmbeddingIndex::new(embedder, memory.passages().clone()));

        let llm: Option<Arc<dyn ChatDriver>> = match create_chat_driver(&config.llm) {
            Ok(driver) => Some(Arc::from(driver)),
            Err(e) => {
                info!(error = %e, "No summarizer; web answers will use raw snippets");
                None
            }
        };
        let cache = Arc::new(SearchCache::new(Duration::from_secs(
            config.web.cache_ttl_secs,
        )));
        let search = Arc::new(WebSearchEngine::new(config.web.clone(), cache));
        let web: Arc<dyn WebFallback> = Arc::new(WebReasoner::new(&config.web, search, llm));

        let semantic: Arc<dyn SemanticIndex> = index.clone();
        let cascade = Cascade::new(
            parser.clone(),
            memory.facts().clone(),
            semantic,
            web,
            &config.cascade,
        );

        info!(
            db = %config.db_path().display(),
            store_available = memory.is_available(),
            web_enabled = config.web.enabled,
            threshold = config.cascade.vector_threshold,
            "GovSight kernel booted"
        );

        Ok(Self {
            config,
            memory,
            parser,
            index,
            cascade,
        })
    }

    /// Whether the fact and passage stores are backed by an open database.
    pub fn store_available(&self) -> bool {
        self.memory.is_available()
    }

    pub fn config(&self) -> &GovsightConfig {
        &self.config
    }

    pub fn parser(&self) -> &FactParser {
        &self.parser
    }

    pub fn cascade(&self) -> &Cascade {
        &self.cascade
    }

    /// Answer a question through the cascade.
    pub async fn ask(&self, query: &str) -> Result<RetrievalResult, NoAnswerFound> {
        self.cascade.answer(query).await
    }

    /// Answer a question, aborting when `cancel` turns true.
    pub async fn ask_with_cancel(
        &self,
        query: &str,
        cancel: watch::Receiver<bool>,
    ) -> Result<RetrievalResult, NoAnswerFound> {
        self.cascade.answer_with_cancel(query, cancel).await
    }

    /// Parse a declarative statement and store it.
    pub fn teach(&self, statement: &str) -> KernelResult<ParsedStatement> {
        let parsed = self
            .parser
            .parse_statement(statement)
            .map_err(|e| KernelError::Unparseable(e.0))?;
        self.memory.facts().put_with_source(
            &parsed.key.subject,
            &parsed.key.attribute,
            &parsed.value,
            Some("teach"),
        )?;
        info!(key = %parsed.key, "Fact learned");
        Ok(parsed)
    }

    /// Store a fact. Attribute aliases are mapped to their canonical name.
    pub fn put_fact(
        &self,
        subject: &str,
        attribute: &str,
        value: &str,
        source: Option<&str>,
    ) -> KernelResult<()> {
        let attribute = self.parser.canonical_attribute(attribute);
        self.memory
            .facts()
            .put_with_source(subject, &attribute, value, source)?;
        Ok(())
    }

    pub fn get_fact(&self, subject: &str, attribute: &str) -> KernelResult<Option<Fact>> {
        let attribute = self.parser.canonical_attribute(attribute);
        Ok(self.memory.facts().get(subject, &attribute)?)
    }

    pub fn delete_fact(&self, subject: &str, attribute: &str) -> KernelResult<bool> {
        let attribute = self.parser.canonical_attribute(attribute);
        Ok(self.memory.facts().delete(subject, &attribute)?)
    }

    pub fn facts_for_subject(&self, subject: &str) -> KernelResult<Vec<Fact>> {
        Ok(self.memory.facts().facts_for_subject(subject)?)
    }

    /// Embed and index a passage for the semantic tier.
    pub async fn add_passage(&self, content: &str, source: Option<&str>) -> KernelResult<String> {
        Ok(self.index.add_passage(content, source).await?)
    }

    pub fn stats(&self) -> KernelResult<KernelStats> {
        Ok(KernelStats {
            facts: self.memory.facts().count()?,
            passages: self.memory.passages().count()?,
            queries: self.cascade.stats(),
        })
    }
}

fn open_memory(db_path: &Path) -> Result<MemorySubstrate, String> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("create {}: {e}", parent.display()))?;
    }
    MemorySubstrate::open(db_path).map_err(|e| e.to_string())
}
