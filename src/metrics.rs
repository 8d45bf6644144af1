use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing answering activity.
#[derive(Default)]
pub struct ChatMetrics {
    turns_answered: AtomicU64,
    queries_expanded: AtomicU64,
    documents_retrieved: AtomicU64,
}

impl ChatMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of an answering turn.
    pub fn record_turn(&self) {
        self.turns_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the query and document counts of a completed retrieval.
    pub fn record_retrieval(&self, queries: u64, documents: u64) {
        self.queries_expanded.fetch_add(queries, Ordering::Relaxed);
        self.documents_retrieved
            .fetch_add(documents, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            turns_answered: self.turns_answered.load(Ordering::Relaxed),
            queries_expanded: self.queries_expanded.load(Ordering::Relaxed),
            documents_retrieved: self.documents_retrieved.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of answering counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of chat turns started since process start.
    pub turns_answered: u64,
    /// Total queries issued against the vector store, expansions included.
    pub queries_expanded: u64,
    /// Total documents returned across all turns, after deduplication.
    pub documents_retrieved: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_turns_and_retrievals() {
        let metrics = ChatMetrics::new();
        metrics.record_turn();
        metrics.record_retrieval(4, 6);
        metrics.record_turn();
        metrics.record_retrieval(4, 2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.turns_answered, 2);
        assert_eq!(snapshot.queries_expanded, 8);
        assert_eq!(snapshot.documents_retrieved, 8);
    }

    #[test]
    fn snapshot_starts_empty() {
        let metrics = ChatMetrics::new();
        assert_eq!(metrics.snapshot().turns_answered, 0);
        assert_eq!(metrics.snapshot().documents_retrieved, 0);
    }
}
