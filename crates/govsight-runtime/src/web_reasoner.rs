//! Web fallback: one search, one summary.
//!
//! The top results of a single search are handed to the chat model, which
//! writes one short answer. Without a chat driver (or when the model call
//! fails) the best direct snippet is returned at lower confidence.

use crate::adapters::{WebAnswer, WebFallback};
use crate::llm::ChatDriver;
use crate::web_search::{SearchResults, WebSearchEngine};
use async_trait::async_trait;
use govsight_types::config::WebConfig;
use govsight_types::error::{GovsightError, GovsightResult};
use govsight_types::retrieval::SourceTier;
use std::sync::Arc;
use tracing::{debug, warn};

const SUMMARY_SYSTEM_PROMPT: &str = "You answer factual questions about US government, \
places and officials using only the search results provided. Reply with one or two \
plain sentences. If the results do not contain the answer, reply exactly: UNKNOWN";

/// Model reply meaning the results did not contain an answer.
const UNKNOWN_REPLY: &str = "UNKNOWN";

/// Search source for [`WebReasoner`]. Implemented by [`WebSearchEngine`];
/// tests substitute canned results.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<SearchResults, String>;
}

#[async_trait]
impl SearchBackend for WebSearchEngine {
    async fn search(&self, query: &str, max_results: usize) -> Result<SearchResults, String> {
        WebSearchEngine::search(self, query, max_results).await
    }
}

/// [`WebFallback`] backed by web search plus an optional summarizer.
pub struct WebReasoner {
    enabled: bool,
    search: Arc<dyn SearchBackend>,
    llm: Option<Arc<dyn ChatDriver>>,
    max_results: usize,
    summary_confidence: f32,
    snippet_confidence: f32,
}

impl WebReasoner {
    pub fn new(
        config: &WebConfig,
        search: Arc<dyn SearchBackend>,
        llm: Option<Arc<dyn ChatDriver>>,
    ) -> Self {
        Self {
            enabled: config.enabled,
            search,
            llm,
            max_results: config.max_results.max(1),
            summary_confidence: config.summary_confidence,
            snippet_confidence: config.snippet_confidence,
        }
    }

    async fn summarize(
        &self,
        llm: &dyn ChatDriver,
        query: &str,
        results: &SearchResults,
    ) -> Option<String> {
        let prompt = build_summary_prompt(query, results);
        match llm.complete(SUMMARY_SYSTEM_PROMPT, &prompt).await {
            Ok(text) if text.is_empty() || text.trim() == UNKNOWN_REPLY => {
                debug!("Summarizer found no answer in search results");
                None
            }
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "Summarizer failed, using top snippet");
                None
            }
        }
    }
}

/// Numbered list of results under the question.
fn build_summary_prompt(query: &str, results: &SearchResults) -> String {
    let mut prompt = format!("Question: {query}\n\nSearch results:\n");
    if let Some(answer) = &results.answer {
        prompt.push_str(&format!("Direct answer: {answer}\n"));
    }
    for (i, hit) in results.hits.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {}\n   {}\n   {}\n",
            i + 1,
            hit.title,
            hit.url,
            hit.snippet
        ));
    }
    prompt
}

/// Provider answer first, then the first non-empty snippet.
fn best_snippet(results: &SearchResults) -> Option<String> {
    results.answer.clone().or_else(|| {
        results
            .hits
            .iter()
            .map(|h| h.snippet.trim())
            .find(|s| !s.is_empty())
            .map(String::from)
    })
}

#[async_trait]
impl WebFallback for WebReasoner {
    async fn query(&self, text: &str) -> GovsightResult<WebAnswer> {
        if !self.enabled {
            return Err(GovsightError::adapter(SourceTier::Web, "web fallback disabled"));
        }

        let results = self
            .search
            .search(text, self.max_results)
            .await
            .map_err(|e| GovsightError::adapter(SourceTier::Web, e))?;
        if results.is_empty() {
            return Err(GovsightError::adapter(SourceTier::Web, "no search results"));
        }
        debug!(
            provider = %results.provider,
            hits = results.hits.len(),
            "Web search returned results"
        );

        if let Some(llm) = &self.llm {
            if let Some(summary) = self.summarize(llm.as_ref(), text, &results).await {
                return Ok(WebAnswer {
                    text: summary,
                    confidence: self.summary_confidence,
                });
            }
        }

        best_snippet(&results)
            .map(|snippet| WebAnswer {
                text: snippet,
                confidence: self.snippet_confidence,
            })
            .ok_or_else(|| GovsightError::adapter(SourceTier::Web, "no usable answer in results"))
    }
}
