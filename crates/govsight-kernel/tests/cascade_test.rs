//! Integration tests for the retrieval cascade.
//!
//! A real fact store (in-memory SQLite) and parser are wired to stub semantic
//! and web adapters that count their calls, so each test can assert exactly
//! which tiers ran.

use async_trait::async_trait;
use govsight_kernel::{CancelHandle, Cascade};
use govsight_memory::MemorySubstrate;
use govsight_runtime::adapters::{ScoredText, SemanticIndex, WebAnswer, WebFallback};
use govsight_runtime::parser::FactParser;
use govsight_types::config::{CascadeConfig, ParserConfig};
use govsight_types::error::{GovsightError, GovsightResult};
use govsight_types::retrieval::{NoAnswerFound, NoAnswerReason, SourceTier};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Stub adapters
// ---------------------------------------------------------------------------

enum VectorBehavior {
    Hits(Vec<(&'static str, f32)>),
    Fail,
    Hang,
}

struct StubIndex {
    behavior: VectorBehavior,
    calls: AtomicUsize,
}

impl StubIndex {
    fn new(behavior: VectorBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SemanticIndex for StubIndex {
    async fn query(&self, _text: &str, _top_k: usize) -> GovsightResult<Vec<ScoredText>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            VectorBehavior::Hits(hits) => Ok(hits
                .iter()
                .map(|(text, score)| ScoredText {
                    text: text.to_string(),
                    score: *score,
                })
                .collect()),
            VectorBehavior::Fail => Err(GovsightError::adapter(
                SourceTier::Vector,
                "connection refused",
            )),
            VectorBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![])
            }
        }
    }
}

struct StubWeb {
    answer: Option<&'static str>,
    calls: AtomicUsize,
}

impl StubWeb {
    fn answering(text: &'static str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(text),
            calls: AtomicUsize::new(0),
        })
    }

    fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebFallback for StubWeb {
    async fn query(&self, _text: &str) -> GovsightResult<WebAnswer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answer {
            Some(text) => Ok(WebAnswer {
                text: text.to_string(),
                confidence: 0.6,
            }),
            None => Err(GovsightError::adapter(SourceTier::Web, "no results")),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn cascade_with(
    memory: &MemorySubstrate,
    index: Arc<StubIndex>,
    web: Arc<StubWeb>,
    timeout_secs: u64,
) -> Cascade {
    let parser = Arc::new(FactParser::from_config(&ParserConfig::default()).unwrap());
    let config = CascadeConfig {
        vector_threshold: 0.75,
        top_k: 5,
        query_timeout_secs: timeout_secs,
    };
    Cascade::new(parser, memory.facts().clone(), index, web, &config)
}

fn seeded_memory() -> MemorySubstrate {
    let memory = MemorySubstrate::open_in_memory().unwrap();
    memory
        .facts()
        .put("grandview tx", "mayor", "Jane Doe")
        .unwrap();
    memory
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_local_answer_end_to_end() {
    let memory = seeded_memory();
    let index = StubIndex::new(VectorBehavior::Hits(vec![("passage", 0.99)]));
    let web = StubWeb::answering("web answer");
    let cascade = cascade_with(&memory, index.clone(), web.clone(), 30);

    let result = cascade
        .answer("who is the mayor of grandview, tx?")
        .await
        .unwrap();

    assert_eq!(result.answer_text, "mayor of grandview tx is Jane Doe");
    assert_eq!(result.source_tier, SourceTier::Local);
    assert_eq!(result.confidence, 1.0);
    assert_eq!(index.calls(), 0, "vector tier must not run after a local hit");
    assert_eq!(web.calls(), 0, "web tier must not run after a local hit");
}

#[tokio::test]
async fn test_low_vector_score_falls_through_to_web() {
    let memory = MemorySubstrate::open_in_memory().unwrap();
    let index = StubIndex::new(VectorBehavior::Hits(vec![("weak match", 0.4)]));
    let web = StubWeb::answering("Jane Doe is the mayor of Grandview.");
    let cascade = cascade_with(&memory, index.clone(), web.clone(), 30);

    let result = cascade
        .answer("who is the mayor of grandview, tx?")
        .await
        .unwrap();

    assert_eq!(result.source_tier, SourceTier::Web);
    assert_eq!(result.answer_text, "Jane Doe is the mayor of Grandview.");
    assert_eq!(result.confidence, 0.6);
    assert_eq!(index.calls(), 1);
    assert_eq!(web.calls(), 1);
}

#[tokio::test]
async fn test_vector_hit_at_threshold_is_accepted() {
    let memory = MemorySubstrate::open_in_memory().unwrap();
    let index = StubIndex::new(VectorBehavior::Hits(vec![
        ("Jane Doe was sworn in as mayor.", 0.75),
        ("unrelated", 0.2),
    ]));
    let web = StubWeb::answering("web answer");
    let cascade = cascade_with(&memory, index.clone(), web.clone(), 30);

    let result = cascade.answer("grandview mayor swearing in").await.unwrap();

    assert_eq!(result.source_tier, SourceTier::Vector);
    assert_eq!(result.answer_text, "Jane Doe was sworn in as mayor.");
    assert_eq!(result.confidence, 0.75);
    assert_eq!(web.calls(), 0);
}

#[tokio::test]
async fn test_unparseable_query_skips_to_vector() {
    let memory = seeded_memory();
    let index = StubIndex::new(VectorBehavior::Hits(vec![]));
    let web = StubWeb::answering("answer");
    let cascade = cascade_with(&memory, index.clone(), web.clone(), 30);

    let result = cascade.answer("tell me about grandview").await.unwrap();

    assert_eq!(result.source_tier, SourceTier::Web);
    assert_eq!(index.calls(), 1);
}

#[tokio::test]
async fn test_vector_failure_degrades_to_miss() {
    let memory = MemorySubstrate::open_in_memory().unwrap();
    let index = StubIndex::new(VectorBehavior::Fail);
    let web = StubWeb::answering("from the web");
    let cascade = cascade_with(&memory, index.clone(), web.clone(), 30);

    let result = cascade.answer("who is the mayor of grandview?").await.unwrap();

    assert_eq!(result.source_tier, SourceTier::Web);
    assert_eq!(web.calls(), 1);
}

#[tokio::test]
async fn test_full_exhaustion() {
    let memory = MemorySubstrate::open_in_memory().unwrap();
    let index = StubIndex::new(VectorBehavior::Hits(vec![("weak", 0.1)]));
    let web = StubWeb::unavailable();
    let cascade = cascade_with(&memory, index.clone(), web.clone(), 30);

    let err = cascade
        .answer("who is the mayor of grandview?")
        .await
        .unwrap_err();

    assert_eq!(err, NoAnswerFound::exhausted());
    assert_eq!(index.calls(), 1);
    assert_eq!(web.calls(), 1);
    assert_eq!(cascade.stats().exhausted, 1);
}

#[tokio::test]
async fn test_timeout_during_vector_tier() {
    let memory = MemorySubstrate::open_in_memory().unwrap();
    let index = StubIndex::new(VectorBehavior::Hang);
    let web = StubWeb::answering("should not be reached");
    let cascade = cascade_with(&memory, index.clone(), web.clone(), 30)
        .with_timeout(Some(Duration::from_millis(50)));

    let err = cascade
        .answer("who is the mayor of grandview?")
        .await
        .unwrap_err();

    assert_eq!(
        err.reason,
        NoAnswerReason::Timeout {
            tier: SourceTier::Vector
        }
    );
    assert!(err.is_aborted());
    assert_eq!(index.calls(), 1);
    assert_eq!(web.calls(), 0, "cascade must stop at the timeout");
    assert_eq!(cascade.stats().timeout, 1);
}

#[tokio::test]
async fn test_cancel_during_vector_tier() {
    let memory = MemorySubstrate::open_in_memory().unwrap();
    let index = StubIndex::new(VectorBehavior::Hang);
    let web = StubWeb::answering("should not be reached");
    let cascade = Arc::new(cascade_with(&memory, index.clone(), web.clone(), 0));

    let handle = CancelHandle::new();
    let rx = handle.subscribe();
    let task = {
        let cascade = cascade.clone();
        tokio::spawn(async move {
            cascade
                .answer_with_cancel("who is the mayor of grandview?", rx)
                .await
        })
    };

    while index.calls() == 0 {
        tokio::task::yield_now().await;
    }
    handle.cancel();

    let err = task.await.unwrap().unwrap_err();
    assert_eq!(err, NoAnswerFound::cancelled(SourceTier::Vector));
    assert_eq!(web.calls(), 0);
    assert_eq!(cascade.stats().cancelled, 1);
}

#[tokio::test]
async fn test_cancel_before_start() {
    let memory = seeded_memory();
    let index = StubIndex::new(VectorBehavior::Hits(vec![]));
    let web = StubWeb::answering("x");
    let cascade = cascade_with(&memory, index.clone(), web.clone(), 30);

    let handle = CancelHandle::new();
    let rx = handle.subscribe();
    handle.cancel();

    let err = cascade
        .answer_with_cancel("who is the mayor of grandview, tx?", rx)
        .await
        .unwrap_err();
    assert_eq!(err, NoAnswerFound::cancelled(SourceTier::Local));
    assert_eq!(index.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_queries_are_independent() {
    let memory = seeded_memory();
    let index = StubIndex::new(VectorBehavior::Hits(vec![("vector answer", 0.9)]));
    let web = StubWeb::unavailable();
    let cascade = Arc::new(cascade_with(&memory, index.clone(), web.clone(), 30));

    let local = {
        let c = cascade.clone();
        tokio::spawn(async move { c.answer("who is the mayor of grandview, tx?").await })
    };
    let vector = {
        let c = cascade.clone();
        tokio::spawn(async move { c.answer("what happened at the council meeting").await })
    };

    assert_eq!(local.await.unwrap().unwrap().source_tier, SourceTier::Local);
    assert_eq!(vector.await.unwrap().unwrap().source_tier, SourceTier::Vector);
    let stats = cascade.stats();
    assert_eq!(stats.local, 1);
    assert_eq!(stats.vector, 1);
}

#[tokio::test]
async fn test_non_finite_vector_score_is_a_miss() {
    let memory = MemorySubstrate::open_in_memory().unwrap();
    let index = StubIndex::new(VectorBehavior::Hits(vec![("nan", f32::NAN)]));
    let web = StubWeb::answering("web");
    let cascade = cascade_with(&memory, index.clone(), web.clone(), 30);

    let result = cascade.answer("anything").await.unwrap();
    assert_eq!(result.source_tier, SourceTier::Web);
}

#[tokio::test]
async fn test_local_store_error_falls_through_to_web() {
    let memory = MemorySubstrate::unavailable("database is locked");
    let index = StubIndex::new(VectorBehavior::Hits(vec![("weak", 0.2)]));
    let web = StubWeb::answering("Jane Doe is the mayor.");
    let cascade = cascade_with(&memory, index.clone(), web.clone(), 30);

    let result = cascade
        .answer("who is the mayor of grandview, tx?")
        .await
        .unwrap();

    assert_eq!(result.source_tier, SourceTier::Web);
    assert_eq!(result.answer_text, "Jane Doe is the mayor.");
    assert_eq!(index.calls(), 1, "vector tier must run after a store error");
    assert_eq!(web.calls(), 1);
    assert_eq!(cascade.stats().web, 1);
}

#[tokio::test]
async fn test_blank_web_answer_is_exhausted() {
    let memory = MemorySubstrate::open_in_memory().unwrap();
    let index = StubIndex::new(VectorBehavior::Hits(vec![]));
    let web = StubWeb::answering("   ");
    let cascade = cascade_with(&memory, index.clone(), web.clone(), 30);

    let err = cascade
        .answer("who is the mayor of grandview?")
        .await
        .unwrap_err();

    assert_eq!(err, NoAnswerFound::exhausted());
    assert_eq!(web.calls(), 1);
    assert_eq!(cascade.stats().exhausted, 1);
    assert_eq!(cascade.stats().web, 0);
}
