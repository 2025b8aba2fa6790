//! Per-operation transfer accounting.

use std::time::{Duration, Instant};

/// Accumulates row, batch, commit and error counts for one source-to-target
/// operation. Created per operation, discarded after reporting.
#[derive(Debug, Clone)]
pub struct TransferListener {
    rows_submitted: u64,
    rows_committed: u64,
    batches: u64,
    commits: u64,
    errors: Vec<String>,
    started: Instant,
}

impl TransferListener {
    /// Start accounting for a new operation.
    pub fn new() -> Self {
        Self {
            rows_submitted: 0,
            rows_committed: 0,
            batches: 0,
            commits: 0,
            errors: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Record one submitted batch of `rows` rows.
    pub fn record_batch(&mut self, rows: u64) {
        self.batches += 1;
        self.rows_submitted += rows;
    }

    /// Record a commit: every row submitted so far is now durable.
    pub fn record_commit(&mut self) {
        self.commits += 1;
        self.rows_committed = self.rows_submitted;
    }

    /// Capture an error without losing the counts so far.
    pub fn record_error(&mut self, message: impl ToString) {
        self.errors.push(message.to_string());
    }

    /// Rows submitted to the store, committed or not.
    pub fn rows_submitted(&self) -> u64 {
        self.rows_submitted
    }

    /// Rows known durable. This is the number a caller can trust after a
    /// mid-operation failure.
    pub fn rows_committed(&self) -> u64 {
        self.rows_committed
    }

    /// Batches submitted.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// Commits performed.
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// Captured error messages.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Snapshot the counts into a report.
    pub fn report(&self) -> TransferReport {
        TransferReport {
            rows_submitted: self.rows_submitted,
            rows_committed: self.rows_committed,
            batches: self.batches,
            commits: self.commits,
            errors: self.errors.clone(),
            elapsed: self.started.elapsed(),
        }
    }
}

impl Default for TransferListener {
    fn default() -> Self {
        Self::new()
    }
}

/// Final counts of one transfer operation.
#[derive(Debug, Clone)]
pub struct TransferReport {
    /// Rows submitted to the store.
    pub rows_submitted: u64,
    /// Rows durably committed.
    pub rows_committed: u64,
    /// Batches submitted.
    pub batches: u64,
    /// Commits performed.
    pub commits: u64,
    /// Captured error messages.
    pub errors: Vec<String>,
    /// Wall-clock duration of the operation.
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_marks_submitted_rows_durable() {
        let mut listener = TransferListener::new();
        listener.record_batch(100);
        listener.record_batch(50);
        assert_eq!(listener.rows_submitted(), 150);
        assert_eq!(listener.rows_committed(), 0);

        listener.record_commit();
        assert_eq!(listener.rows_committed(), 150);

        listener.record_batch(10);
        assert_eq!(listener.rows_committed(), 150);

        let report = listener.report();
        assert_eq!(report.rows_submitted, 160);
        assert_eq!(report.batches, 3);
        assert_eq!(report.commits, 1);
    }

    #[test]
    fn test_errors_preserve_counts() {
        let mut listener = TransferListener::new();
        listener.record_batch(5);
        listener.record_commit();
        listener.record_error("driver failure");
        let report = listener.report();
        assert_eq!(report.rows_committed, 5);
        assert_eq!(report.errors.len(), 1);
    }
}
