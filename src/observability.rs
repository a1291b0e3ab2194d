use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Process-wide transition counters
#[derive(Debug, Default)]
pub struct TransitionMetrics {
    pub opened: AtomicU64,
    pub validation_failures: AtomicU64,
    pub submissions: AtomicU64,
    pub submission_failures: AtomicU64,
    pub completed: AtomicU64,
    pub cancelled: AtomicU64,
}

impl TransitionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_opened(&self) {
        self.opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submission(&self) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submission_failure(&self) {
        self.submission_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> TransitionStats {
        TransitionStats {
            opened: self.opened.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            submissions: self.submissions.load(Ordering::Relaxed),
            submission_failures: self.submission_failures.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            opened = stats.opened,
            validation_failures = stats.validation_failures,
            submissions = stats.submissions,
            submission_failures = stats.submission_failures,
            completed = stats.completed,
            cancelled = stats.cancelled,
            "Transition metrics"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionStats {
    pub opened: u64,
    pub validation_failures: u64,
    pub submissions: u64,
    pub submission_failures: u64,
    pub completed: u64,
    pub cancelled: u64,
}

/// Global metrics instance
static TRANSITION_METRICS: std::sync::LazyLock<TransitionMetrics> =
    std::sync::LazyLock::new(TransitionMetrics::new);

pub fn transition_metrics() -> &'static TransitionMetrics {
    &TRANSITION_METRICS
}

/// Time an operation and log its duration
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}
