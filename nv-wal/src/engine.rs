use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use crate::error::{classify, ErrorClass, WalError};
use crate::journal::{Journal, WalLine};
use crate::writer::{AuditWriter, ItemOutcome, WriteReport};

/// Result of a `flush()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub accepted: usize,
    pub quarantined: usize,
    pub remaining: usize,
}

/// Durable write-ahead log for audit events.
///
/// Every `append`/`append_batch` lands in the file-backed [`Journal`] first
/// (so a crash never loses data already accepted) and in a bounded
/// in-memory queue that mirrors it. `flush()` drains the queue into the
/// configured [`AuditWriter`]; at most one flush runs at a time, and a
/// caller that re-enters while one is in flight gets back `{accepted: 0}`
/// immediately rather than blocking or double-sending.
pub struct Wal {
    journal: Journal,
    queue: Mutex<VecDeque<WalLine>>,
    capacity: usize,
    writer: RwLock<Option<Arc<dyn AuditWriter>>>,
    flushing: AtomicBool,
}

impl Wal {
    pub fn new(dir: impl Into<std::path::PathBuf>, fsync_interval_ms: u64, capacity: usize) -> Self {
        Self {
            journal: Journal::new(dir, fsync_interval_ms),
            queue: Mutex::new(VecDeque::new()),
            capacity,
            writer: RwLock::new(None),
            flushing: AtomicBool::new(false),
        }
    }

    pub async fn set_writer(&self, writer: Arc<dyn AuditWriter>) {
        *self.writer.write().await = Some(writer);
    }

    pub async fn clear_writer(&self) {
        *self.writer.write().await = None;
    }

    pub fn queue_len_sync(&self) -> usize {
        self.queue.try_lock().map(|q| q.len()).unwrap_or(0)
    }

    async fn enqueue(&self, line: WalLine) {
        let mut queue = self.queue.lock().await;
        if queue.len() >= self.capacity {
            if let Some(dropped) = queue.pop_front() {
                tracing::warn!(target: "wal", "in-memory queue at capacity ({}), dropping oldest line: {:?}", self.capacity, dropped.appended_at);
            }
        }
        queue.push_back(line);
    }

    /// Append one blob: write to the journal, then enqueue it for flush.
    /// A journal write failure is fatal to the call — the queue is never
    /// allowed to get ahead of the durable record.
    pub async fn append(&self, blob: Value) -> Result<(), WalError> {
        let line = WalLine::new(blob);
        self.journal.append(&line).await?;
        self.enqueue(line).await;
        Ok(())
    }

    /// Append several blobs atomically with respect to the journal (each is
    /// still its own line, written in order); stops at the first journal
    /// failure and returns how many made it in before that.
    pub async fn append_batch(&self, blobs: Vec<Value>) -> Result<usize, WalError> {
        let mut appended = 0;
        for blob in blobs {
            self.append(blob).await?;
            appended += 1;
        }
        Ok(appended)
    }

    /// Drain the in-memory queue into the configured writer.
    ///
    /// Tries the whole queue as one batch first. If the writer call fails
    /// wholesale, nothing is removed and the failure is surfaced. If the
    /// writer responds with per-item outcomes, each item is applied in
    /// order: accepted items and non-retryable rejections are removed from
    /// the queue (the latter quarantined, i.e. dropped without being
    /// counted as accepted); the first retryable rejection stops
    /// processing, leaving it and everything after it queued for the next
    /// flush.
    pub async fn flush(&self) -> Result<FlushReport, WalError> {
        if self.flushing.swap(true, Ordering::AcqRel) {
            return Ok(FlushReport { accepted: 0, quarantined: 0, remaining: self.queue_len_sync() });
        }
        let result = self.flush_inner().await;
        self.flushing.store(false, Ordering::Release);
        result
    }

    async fn flush_inner(&self) -> Result<FlushReport, WalError> {
        let writer = self.writer.read().await.clone().ok_or(WalError::WriterUnavailable)?;

        let snapshot: Vec<WalLine> = {
            let queue = self.queue.lock().await;
            queue.iter().cloned().collect()
        };
        if snapshot.is_empty() {
            return Ok(FlushReport { accepted: 0, quarantined: 0, remaining: 0 });
        }

        match writer.write_batch(&snapshot).await {
            Ok(report) if report.outcomes.iter().all(|o| matches!(o, ItemOutcome::Accepted)) => {
                let mut queue = self.queue.lock().await;
                for _ in 0..snapshot.len() {
                    queue.pop_front();
                }
                Ok(FlushReport { accepted: snapshot.len(), quarantined: 0, remaining: queue.len() })
            }
            Ok(report) => self.apply_per_item(snapshot, report).await,
            Err((code, message)) => {
                tracing::warn!(target: "wal", code = %code, message = %message, "batch write failed wholesale, retrying next flush");
                Ok(FlushReport { accepted: 0, quarantined: 0, remaining: self.queue_len_sync() })
            }
        }
    }

    async fn apply_per_item(&self, snapshot: Vec<WalLine>, report: WriteReport) -> Result<FlushReport, WalError> {
        let mut accepted = 0;
        let mut quarantined = 0;
        let mut removed = 0;

        for outcome in report.outcomes.iter().take(snapshot.len()) {
            match outcome {
                ItemOutcome::Accepted => {
                    accepted += 1;
                    removed += 1;
                }
                ItemOutcome::Rejected(code, message) => match classify(code, message) {
                    ErrorClass::NonRetryable => {
                        tracing::warn!(target: "wal", code = %code, message = %message, "quarantining non-retryable item");
                        quarantined += 1;
                        removed += 1;
                    }
                    ErrorClass::Retryable | ErrorClass::Unknown => {
                        break;
                    }
                },
            }
        }

        let mut queue = self.queue.lock().await;
        for _ in 0..removed {
            queue.pop_front();
        }
        Ok(FlushReport { accepted, quarantined, remaining: queue.len() })
    }

    pub async fn close(&self) -> Result<(), WalError> {
        self.journal.close().await
    }

    /// Boot-time replay: read every segment oldest-first, refill the
    /// in-memory queue, and (if a writer is already configured) try to
    /// flush with jittered backoff before accepting live traffic.
    pub async fn replay(&self, max_attempts: u32) -> Result<FlushReport, WalError> {
        let segments = self.journal.list_segments().await?;
        for segment in &segments {
            let lines = Journal::read_segment(segment).await?;
            let mut queue = self.queue.lock().await;
            for line in lines {
                if queue.len() >= self.capacity {
                    queue.pop_front();
                }
                queue.push_back(line);
            }
        }

        if self.writer.read().await.is_none() {
            return Ok(FlushReport { accepted: 0, quarantined: 0, remaining: self.queue_len_sync() });
        }

        let mut last = FlushReport { accepted: 0, quarantined: 0, remaining: self.queue_len_sync() };
        for attempt in 0..max_attempts {
            last = self.flush().await?;
            if last.remaining == 0 {
                break;
            }
            let jitter_ms = 50 * (attempt as u64 + 1) + rand::thread_rng().gen_range(0..50);
            tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex as StdMutex;

    struct RecordingWriter {
        calls: StdMutex<Vec<usize>>,
        reject_at: Option<(usize, &'static str, &'static str)>,
    }

    impl RecordingWriter {
        fn new() -> Self {
            Self { calls: StdMutex::new(Vec::new()), reject_at: None }
        }
        fn rejecting(index: usize, code: &'static str, message: &'static str) -> Self {
            Self { calls: StdMutex::new(Vec::new()), reject_at: Some((index, code, message)) }
        }
    }

    impl AuditWriter for RecordingWriter {
        fn write_batch<'a>(
            &'a self,
            batch: &'a [WalLine],
        ) -> Pin<Box<dyn Future<Output = Result<WriteReport, (String, String)>> + Send + 'a>> {
            self.calls.lock().unwrap().push(batch.len());
            let outcomes = batch
                .iter()
                .enumerate()
                .map(|(i, _)| match self.reject_at {
                    Some((idx, code, message)) if idx == i => ItemOutcome::Rejected(code.to_string(), message.to_string()),
                    _ => ItemOutcome::Accepted,
                })
                .collect();
            Box::pin(async move { Ok(WriteReport { outcomes }) })
        }
    }

    struct FailingWriter;
    impl AuditWriter for FailingWriter {
        fn write_batch<'a>(
            &'a self,
            _batch: &'a [WalLine],
        ) -> Pin<Box<dyn Future<Output = Result<WriteReport, (String, String)>> + Send + 'a>> {
            Box::pin(async move { Err(("WAL_PERSIST_FAILED".to_string(), "connection refused".to_string())) })
        }
    }

    #[tokio::test]
    async fn flush_without_writer_errors() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::new(dir.path(), 0, 100);
        wal.append(serde_json::json!({"a": 1})).await.unwrap();
        assert!(matches!(wal.flush().await, Err(WalError::WriterUnavailable)));
    }

    #[tokio::test]
    async fn full_batch_accept_drains_queue() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::new(dir.path(), 0, 100);
        wal.set_writer(Arc::new(RecordingWriter::new())).await;
        wal.append_batch(vec![serde_json::json!({"a": 1}), serde_json::json!({"a": 2})]).await.unwrap();
        let report = wal.flush().await.unwrap();
        assert_eq!(report.accepted, 2);
        assert_eq!(report.remaining, 0);
    }

    #[tokio::test]
    async fn non_retryable_middle_item_is_quarantined_not_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::new(dir.path(), 0, 100);
        wal.set_writer(Arc::new(RecordingWriter::rejecting(1, "AUDIT_BLOB_INVALID", "bad schema"))).await;
        wal.append_batch(vec![
            serde_json::json!({"a": 1}),
            serde_json::json!({"a": 2}),
            serde_json::json!({"a": 3}),
        ])
        .await
        .unwrap();
        let report = wal.flush().await.unwrap();
        assert_eq!(report.accepted, 2);
        assert_eq!(report.quarantined, 1);
        assert_eq!(report.remaining, 0);
    }

    #[tokio::test]
    async fn retryable_failure_stops_and_leaves_items_queued() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::new(dir.path(), 0, 100);
        wal.set_writer(Arc::new(RecordingWriter::rejecting(1, "WAL_PERSIST_FAILED", "connection timed out"))).await;
        wal.append_batch(vec![
            serde_json::json!({"a": 1}),
            serde_json::json!({"a": 2}),
            serde_json::json!({"a": 3}),
        ])
        .await
        .unwrap();
        let report = wal.flush().await.unwrap();
        assert_eq!(report.accepted, 1);
        assert_eq!(report.remaining, 2);
    }

    #[tokio::test]
    async fn wholesale_writer_failure_leaves_queue_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::new(dir.path(), 0, 100);
        wal.set_writer(Arc::new(FailingWriter)).await;
        wal.append(serde_json::json!({"a": 1})).await.unwrap();
        let report = wal.flush().await.unwrap();
        assert_eq!(report.accepted, 0);
        assert_eq!(report.remaining, 1);
    }

    #[tokio::test]
    async fn reentrant_flush_returns_zero_accepted() {
        // Simulates re-entry by manually setting the flushing flag, since a
        // true concurrent race is timing-dependent.
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::new(dir.path(), 0, 100);
        wal.set_writer(Arc::new(RecordingWriter::new())).await;
        wal.append(serde_json::json!({"a": 1})).await.unwrap();
        wal.flushing.store(true, Ordering::SeqCst);
        let report = wal.flush().await.unwrap();
        assert_eq!(report.accepted, 0);
        wal.flushing.store(false, Ordering::SeqCst);
    }

    #[tokio::test]
    async fn replay_refills_queue_from_journal_segments() {
        let dir = tempfile::tempdir().unwrap();
        {
            let wal = Wal::new(dir.path(), 0, 100);
            wal.append_batch(vec![serde_json::json!({"a": 1}), serde_json::json!({"a": 2})]).await.unwrap();
            wal.close().await.unwrap();
        }
        let wal = Wal::new(dir.path(), 0, 100);
        let report = wal.replay(3).await.unwrap();
        assert_eq!(report.remaining, 2);
    }
}
