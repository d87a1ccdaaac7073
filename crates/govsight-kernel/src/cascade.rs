//! The retrieval cascade: local facts, then the semantic index, then the web.
//!
//! Tiers run strictly in order and only after the previous tier has
//! conclusively missed. Infrastructure failures inside a tier degrade to a
//! miss. Only a timeout, a cancellation, or exhaustion of all three tiers
//! reaches the caller, as [`NoAnswerFound`].

use govsight_memory::facts::FactStore;
use govsight_runtime::adapters::{SemanticIndex, WebFallback};
use govsight_runtime::parser::FactParser;
use govsight_types::config::CascadeConfig;
use govsight_types::retrieval::{NoAnswerFound, RetrievalResult, SourceTier};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Per-outcome query counters.
#[derive(Default)]
struct CascadeStats {
    local: AtomicU64,
    vector: AtomicU64,
    web: AtomicU64,
    exhausted: AtomicU64,
    timeout: AtomicU64,
    cancelled: AtomicU64,
}

/// Point-in-time copy of the cascade counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeStatsSnapshot {
    pub local: u64,
    pub vector: u64,
    pub web: u64,
    pub exhausted: u64,
    pub timeout: u64,
    pub cancelled: u64,
}

impl CascadeStatsSnapshot {
    pub fn answered(&self) -> u64 {
        self.local + self.vector + self.web
    }

    pub fn total(&self) -> u64 {
        self.answered() + self.exhausted + self.timeout + self.cancelled
    }
}

impl CascadeStats {
    fn record_answer(&self, tier: SourceTier) {
        let counter = match tier {
            SourceTier::Local => &self.local,
            SourceTier::Vector => &self.vector,
            SourceTier::Web => &self.web,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self, failure: &NoAnswerFound) {
        use govsight_types::retrieval::NoAnswerReason;
        let counter = match failure.reason {
            NoAnswerReason::Exhausted => &self.exhausted,
            NoAnswerReason::Timeout { .. } => &self.timeout,
            NoAnswerReason::Cancelled { .. } => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CascadeStatsSnapshot {
        CascadeStatsSnapshot {
            local: self.local.load(Ordering::Relaxed),
            vector: self.vector.load(Ordering::Relaxed),
            web: self.web.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            timeout: self.timeout.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Cancellation signal for in-flight queries.
///
/// Hand `subscribe()` receivers to [`Cascade::answer_with_cancel`]; calling
/// `cancel()` aborts every query holding one.
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once the signal is raised. A dropped sender means the query
/// can no longer be cancelled, so this then never resolves.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Priority-ordered retrieval over the three knowledge sources.
pub struct Cascade {
    parser: Arc<FactParser>,
    facts: FactStore,
    semantic: Arc<dyn SemanticIndex>,
    web: Arc<dyn WebFallback>,
    vector_threshold: f32,
    top_k: usize,
    timeout: Option<Duration>,
    stats: CascadeStats,
}

impl Cascade {
    pub fn new(
        parser: Arc<FactParser>,
        facts: FactStore,
        semantic: Arc<dyn SemanticIndex>,
        web: Arc<dyn WebFallback>,
        config: &CascadeConfig,
    ) -> Self {
        let timeout = match config.query_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            parser,
            facts,
            semantic,
            web,
            vector_threshold: config.vector_threshold,
            top_k: config.top_k.max(1),
            timeout,
            stats: CascadeStats::default(),
        }
    }

    /// Replace the per-query deadline. `None` disables it.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn stats(&self) -> CascadeStatsSnapshot {
        self.stats.snapshot()
    }

    /// Answer a query with no external cancellation.
    pub async fn answer(&self, raw_query: &str) -> Result<RetrievalResult, NoAnswerFound> {
        let (_tx, rx) = watch::channel(false);
        self.answer_with_cancel(raw_query, rx).await
    }

    /// Answer a query, aborting when `cancel` turns true or the deadline passes.
    pub async fn answer_with_cancel(
        &self,
        raw_query: &str,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<RetrievalResult, NoAnswerFound> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let outcome = self.run(raw_query, deadline, &mut cancel).await;
        match &outcome {
            Ok(result) => {
                self.stats.record_answer(result.source_tier);
                info!(
                    tier = %result.source_tier,
                    confidence = result.confidence,
                    "Query answered"
                );
            }
            Err(failure) => {
                self.stats.record_failure(failure);
                info!(reason = %failure.reason, "Query ended without an answer");
            }
        }
        outcome
    }

    async fn run(
        &self,
        raw_query: &str,
        deadline: Option<Instant>,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<RetrievalResult, NoAnswerFound> {
        debug!(query = raw_query, "Cascade: local lookup");
        let local = guarded(SourceTier::Local, deadline, cancel, async {
            self.local_lookup(raw_query)
        })
        .await?;
        if let Some(result) = local {
            return Ok(result);
        }

        debug!("Cascade: vector lookup");
        let vector = guarded(
            SourceTier::Vector,
            deadline,
            cancel,
            self.vector_lookup(raw_query),
        )
        .await?;
        if let Some(result) = vector {
            return Ok(result);
        }

        debug!("Cascade: web lookup");
        let web = guarded(SourceTier::Web, deadline, cancel, self.web_lookup(raw_query)).await?;
        web.ok_or_else(NoAnswerFound::exhausted)
    }

    fn local_lookup(&self, raw_query: &str) -> Option<RetrievalResult> {
        let key = match self.parser.parse_query(raw_query) {
            Ok(key) => key,
            Err(e) => {
                debug!(error = %e, "Local tier skipped");
                return None;
            }
        };
        match self.facts.get(&key.subject, &key.attribute) {
            Ok(Some(fact)) => Some(RetrievalResult::local(
                self.parser.render_answer(&key, &fact.value),
            )),
            Ok(None) => {
                debug!(key = %key, "Local miss");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Fact store lookup failed, treating as miss");
                None
            }
        }
    }

    async fn vector_lookup(&self, raw_query: &str) -> Option<RetrievalResult> {
        let hits = match self.semantic.query(raw_query, self.top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Semantic index unavailable, treating as miss");
                return None;
            }
        };
        let top = hits.into_iter().next()?;
        if top.score.is_finite() && top.score >= self.vector_threshold {
            Some(RetrievalResult::new(top.text, SourceTier::Vector, top.score))
        } else {
            debug!(
                score = top.score,
                threshold = self.vector_threshold,
                "Vector hit below threshold"
            );
            None
        }
    }

    async fn web_lookup(&self, raw_query: &str) -> Option<RetrievalResult> {
        match self.web.query(raw_query).await {
            Ok(answer) if !answer.text.trim().is_empty() => Some(RetrievalResult::new(
                answer.text.trim(),
                SourceTier::Web,
                answer.confidence,
            )),
            Ok(_) => {
                warn!("Web fallback returned an empty answer");
                None
            }
            Err(e) => {
                warn!(error = %e, "Web fallback unavailable");
                None
            }
        }
    }
}

/// Run one tier, racing it against cancellation and the deadline.
async fn guarded<T>(
    tier: SourceTier,
    deadline: Option<Instant>,
    cancel: &mut watch::Receiver<bool>,
    work: impl Future<Output = T>,
) -> Result<T, NoAnswerFound> {
    let expired = async {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        biased;
        _ = cancelled(cancel) => {
            debug!(%tier, "Cancelled");
            Err(NoAnswerFound::cancelled(tier))
        }
        _ = expired => {
            debug!(%tier, "Deadline reached");
            Err(NoAnswerFound::timeout(tier))
        }
        out = work => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancelled_resolves_on_signal() {
        let handle = CancelHandle::new();
        let mut rx = handle.subscribe();
        handle.cancel();
        assert!(handle.is_cancelled());
        tokio::time::timeout(Duration::from_millis(100), cancelled(&mut rx))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_sender_never_cancels() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        let waited = tokio::time::timeout(Duration::from_millis(20), cancelled(&mut rx)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_guarded_passes_through_completed_work() {
        let (_tx, mut rx) = watch::channel(false);
        let out = guarded(SourceTier::Vector, None, &mut rx, async { 7 }).await;
        assert_eq!(out.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_guarded_expired_deadline() {
        let (_tx, mut rx) = watch::channel(false);
        let deadline = Some(Instant::now());
        let out = guarded(SourceTier::Web, deadline, &mut rx, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await;
        assert_eq!(out.unwrap_err(), NoAnswerFound::timeout(SourceTier::Web));
    }

    #[test]
    fn test_snapshot_totals() {
        let stats = CascadeStats::default();
        stats.record_answer(SourceTier::Local);
        stats.record_answer(SourceTier::Web);
        stats.record_failure(&NoAnswerFound::exhausted());
        stats.record_failure(&NoAnswerFound::timeout(SourceTier::Vector));
        let snap = stats.snapshot();
        assert_eq!(snap.answered(), 2);
        assert_eq!(snap.total(), 4);
        assert_eq!(snap.timeout, 1);
    }
}
