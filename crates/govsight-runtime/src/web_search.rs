//! Multi-provider web search with auto-fallback.
//!
//! Providers: SerpAPI, Brave, Tavily and DuckDuckGo (keyless HTML scrape).
//! `auto` tries each keyed provider in that order and always ends at
//! DuckDuckGo. Successful results are cached for `web.cache_ttl_secs`.

use crate::embedding::resolve_api_key;
use crate::web_cache::SearchCache;
use govsight_types::config::{SearchProvider, WebConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One organic search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Results from one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub provider: String,
    /// Direct answer when the provider offers one (SerpAPI answer box, Tavily answer).
    pub answer: Option<String>,
    pub hits: Vec<SearchHit>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.answer.is_none() && self.hits.is_empty()
    }
}

/// Multi-provider web search engine.
pub struct WebSearchEngine {
    config: WebConfig,
    client: reqwest::Client,
    cache: Arc<SearchCache>,
}

impl WebSearchEngine {
    pub fn new(config: WebConfig, cache: Arc<SearchCache>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_default();
        Self {
            config,
            client,
            cache,
        }
    }

    /// Search with the configured provider (or auto-fallback).
    pub async fn search(&self, query: &str, max_results: usize) -> Result<SearchResults, String> {
        let provider_name = format!("{:?}", self.config.search_provider).to_lowercase();
        let cache_key = SearchCache::key(&provider_name, query, max_results);
        if let Some(cached) = self.cache.get(&cache_key) {
            debug!(query, "Search cache hit");
            return Ok(cached);
        }

        let result = match self.config.search_provider {
            SearchProvider::SerpApi => self.search_serpapi(query, max_results).await,
            SearchProvider::Brave => self.search_brave(query, max_results).await,
            SearchProvider::Tavily => self.search_tavily(query, max_results).await,
            SearchProvider::DuckDuckGo => self.search_duckduckgo(query, max_results).await,
            SearchProvider::Auto => self.search_auto(query, max_results).await,
        };

        if let Ok(ref results) = result {
            if !results.is_empty() {
                self.cache.put(cache_key, results.clone());
            }
        }
        result
    }

    /// Priority: SerpAPI, Brave, Tavily, then DuckDuckGo.
    async fn search_auto(&self, query: &str, max_results: usize) -> Result<SearchResults, String> {
        if resolve_api_key(&self.config.serpapi.api_key_env).is_some() {
            debug!("Auto: trying SerpAPI");
            match self.search_serpapi(query, max_results).await {
                Ok(r) if !r.is_empty() => return Ok(r),
                Ok(_) => debug!("SerpAPI returned nothing, falling back"),
                Err(e) => warn!("SerpAPI failed, falling back: {e}"),
            }
        }

        if resolve_api_key(&self.config.brave.api_key_env).is_some() {
            debug!("Auto: trying Brave");
            match self.search_brave(query, max_results).await {
                Ok(r) if !r.is_empty() => return Ok(r),
                Ok(_) => debug!("Brave returned nothing, falling back"),
                Err(e) => warn!("Brave failed, falling back: {e}"),
            }
        }

        if resolve_api_key(&self.config.tavily.api_key_env).is_some() {
            debug!("Auto: trying Tavily");
            match self.search_tavily(query, max_results).await {
                Ok(r) if !r.is_empty() => return Ok(r),
                Ok(_) => debug!("Tavily returned nothing, falling back"),
                Err(e) => warn!("Tavily failed, falling back: {e}"),
            }
        }

        debug!("Auto: falling back to DuckDuckGo");
        self.search_duckduckgo(query, max_results).await
    }

    async fn search_serpapi(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<SearchResults, String> {
        let api_key =
            resolve_api_key(&self.config.serpapi.api_key_env).ok_or("SerpAPI key not set")?;

        let resp = self
            .client
            .get("https://serpapi.com/search.json")
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", &max_results.to_string()),
                ("api_key", api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| format!("SerpAPI request failed: {e}"))?;

        if !resp.status().is_success() {
            return Err(format!("SerpAPI returned {}", resp.status()));
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| format!("SerpAPI JSON parse failed: {e}"))?;
        Ok(parse_serpapi(&body, max_results))
    }

    async fn search_brave(&self, query: &str, max_results: usize) -> Result<SearchResults, String> {
        let api_key =
            resolve_api_key(&self.config.brave.api_key_env).ok_or("Brave API key not set")?;

        let resp = self
            .client
            .get("https://api.search.brave.com/res/v1/web/search")
            .query(&[("q", query.to_string()), ("count", max_results.to_string())])
            .header("X-Subscription-Token", api_key.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| format!("Brave request failed: {e}"))?;

        if !resp.status().is_success() {
            return Err(format!("Brave API returned {}", resp.status()));
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| format!("Brave JSON parse failed: {e}"))?;
        Ok(parse_brave(&body, max_results))
    }

    async fn search_tavily(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<SearchResults, String> {
        let api_key =
            resolve_api_key(&self.config.tavily.api_key_env).ok_or("Tavily API key not set")?;

        let body = serde_json::json!({
            "api_key": api_key.as_str(),
            "query": query,
            "search_depth": "basic",
            "max_results": max_results,
            "include_answer": true,
        });
        let resp = self
            .client
            .post("https://api.tavily.com/search")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Tavily request failed: {e}"))?;

        if !resp.status().is_success() {
            return Err(format!("Tavily API returned {}", resp.status()));
        }
        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| format!("Tavily JSON parse failed: {e}"))?;
        Ok(parse_tavily(&data, max_results))
    }

    async fn search_duckduckgo(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<SearchResults, String> {
        debug!(query, "Searching via DuckDuckGo HTML");
        let resp = self
            .client
            .get("https://html.duckduckgo.com/html/")
            .query(&[("q", query)])
            .header("User-Agent", "Mozilla/5.0 (compatible; GovSight/0.3)")
            .send()
            .await
            .map_err(|e| format!("DuckDuckGo request failed: {e}"))?;

        let body = resp
            .text()
            .await
            .map_err(|e| format!("Failed to read DDG response: {e}"))?;

        Ok(SearchResults {
            provider: "duckduckgo".to_string(),
            answer: None,
            hits: parse_ddg_results(&body, max_results),
        })
    }
}

fn str_field(v: &serde_json::Value, key: &str) -> String {
    v[key].as_str().unwrap_or("").trim().to_string()
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

/// SerpAPI: `answer_box` (answer, then snippet) and `organic_results`.
pub fn parse_serpapi(body: &serde_json::Value, max: usize) -> SearchResults {
    let answer = non_empty(body["answer_box"]["answer"].as_str())
        .or_else(|| non_empty(body["answer_box"]["snippet"].as_str()));
    let hits = body["organic_results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .take(max)
                .map(|r| SearchHit {
                    title: str_field(r, "title"),
                    url: str_field(r, "link"),
                    snippet: str_field(r, "snippet"),
                })
                .filter(|h| !h.url.is_empty())
                .collect()
        })
        .unwrap_or_default();
    SearchResults {
        provider: "serpapi".to_string(),
        answer,
        hits,
    }
}

/// Brave: `web.results[]` with `title`, `url`, `description`.
pub fn parse_brave(body: &serde_json::Value, max: usize) -> SearchResults {
    let hits = body["web"]["results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .take(max)
                .map(|r| SearchHit {
                    title: str_field(r, "title"),
                    url: str_field(r, "url"),
                    snippet: strip_html_tags(&str_field(r, "description")),
                })
                .filter(|h| !h.url.is_empty())
                .collect()
        })
        .unwrap_or_default();
    SearchResults {
        provider: "brave".to_string(),
        answer: None,
        hits,
    }
}

/// Tavily: optional `answer` plus `results[]` with `title`, `url`, `content`.
pub fn parse_tavily(body: &serde_json::Value, max: usize) -> SearchResults {
    let hits = body["results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .take(max)
                .map(|r| SearchHit {
                    title: str_field(r, "title"),
                    url: str_field(r, "url"),
                    snippet: str_field(r, "content"),
                })
                .filter(|h| !h.url.is_empty())
                .collect()
        })
        .unwrap_or_default();
    SearchResults {
        provider: "tavily".to_string(),
        answer: non_empty(body["answer"].as_str()),
        hits,
    }
}

/// Parse DuckDuckGo HTML search results.
pub fn parse_ddg_results(html: &str, max: usize) -> Vec<SearchHit> {
    let mut results = Vec::new();

    for chunk in html.split("class=\"result__a\"") {
        if results.len() >= max {
            break;
        }
        if !chunk.contains("href=") {
            continue;
        }

        let url = extract_between(chunk, "href=\"", "\"")
            .unwrap_or_default()
            .to_string();
        let url = if url.contains("uddg=") {
            url.split("uddg=")
                .nth(1)
                .and_then(|u| u.split('&').next())
                .map(urldecode)
                .unwrap_or(url)
        } else {
            url
        };

        let title = extract_between(chunk, ">", "</a>")
            .map(strip_html_tags)
            .unwrap_or_default();

        let snippet = chunk
            .find("class=\"result__snippet\"")
            .map(|start| {
                let after = &chunk[start..];
                extract_between(after, ">", "</a>")
                    .or_else(|| extract_between(after, ">", "</"))
                    .map(strip_html_tags)
                    .unwrap_or_default()
            })
            .unwrap_or_default();

        if !title.is_empty() && !url.is_empty() {
            results.push(SearchHit {
                title,
                url,
                snippet,
            });
        }
    }
    results
}

fn extract_between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let start_idx = text.find(start)? + start.len();
    let remaining = &text[start_idx..];
    let end_idx = remaining.find(end)?;
    Some(&remaining[..end_idx])
}

/// Strip HTML tags and decode the common entities.
pub fn strip_html_tags(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

/// Percent-decode a URL component, UTF-8 aware.
fn urldecode(s: &str) -> String {
    fn hex(b: u8) -> Option<u8> {
        (b as char).to_digit(16).map(|d| d as u8)
    }
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => match (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                (Some(hi), Some(lo)) => {
                    out.push(hi << 4 | lo);
                    i += 3;
                }
                _ => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ddg_parse() {
        let html = r#"junk class="result__a" href="https://grandviewtx.gov">City of <b>Grandview</b></a> class="result__snippet">Mayor Jane Doe</a>"#;
        let results = parse_ddg_results(html, 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "City of Grandview");
        assert_eq!(results[0].url, "https://grandviewtx.gov");
        assert_eq!(results[0].snippet, "Mayor Jane Doe");
    }

    #[test]
    fn test_ddg_redirect_urls_and_limit() {
        let html = r#"x class="result__a" href="/l/?uddg=https%3A%2F%2Fexample.com%2Fcaf%C3%A9&rut=abc">Title</a> class="result__snippet">Desc</a> class="result__a" href="https://b.example">B</a>"#;
        let results = parse_ddg_results(html, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://example.com/café");
        assert!(parse_ddg_results("<html>No results</html>", 5).is_empty());
    }

    #[test]
    fn test_serpapi_answer_box() {
        let body = serde_json::json!({
            "answer_box": {"snippet": "Jane Doe is the mayor of Grandview."},
            "organic_results": [
                {"title": "Grandview", "link": "https://grandviewtx.gov", "snippet": "City site"},
                {"title": "No link", "snippet": "dropped"}
            ]
        });
        let r = parse_serpapi(&body, 5);
        assert_eq!(r.answer.as_deref(), Some("Jane Doe is the mayor of Grandview."));
        assert_eq!(r.hits.len(), 1);
        assert_eq!(r.provider, "serpapi");
    }

    #[test]
    fn test_brave_and_tavily() {
        let brave = serde_json::json!({
            "web": {"results": [{"title": "T", "url": "https://a", "description": "<strong>Jane</strong> Doe"}]}
        });
        let r = parse_brave(&brave, 5);
        assert_eq!(r.hits[0].snippet, "Jane Doe");
        assert!(r.answer.is_none());

        let tavily = serde_json::json!({
            "answer": "  ",
            "results": [{"title": "T", "url": "https://a", "content": "c"}]
        });
        let r = parse_tavily(&tavily, 5);
        assert!(r.answer.is_none());
        assert_eq!(r.hits.len(), 1);
        assert!(parse_tavily(&serde_json::json!({}), 5).is_empty());
    }

    #[test]
    fn test_urldecode() {
        assert_eq!(urldecode("a%20b+c"), "a b c");
        assert_eq!(urldecode("100%"), "100%");
        assert_eq!(urldecode("%zz"), "%zz");
    }
}
