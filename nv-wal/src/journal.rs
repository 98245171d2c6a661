use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WalError;

/// A single line of the on-disk journal: one audit blob plus the moment it
/// was appended. The journal never interprets `blob` — contract-level
/// validation happens upstream, at the writer boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalLine {
    pub appended_at: String,
    pub blob: Value,
}

impl WalLine {
    pub fn new(blob: Value) -> Self {
        Self {
            appended_at: now_rfc3339_ish(),
            blob,
        }
    }
}

fn now_rfc3339_ish() -> String {
    let dur = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    format!("{}.{:09}", dur.as_secs(), dur.subsec_nanos())
}

struct JournalState {
    file: Option<File>,
    segment: Option<PathBuf>,
    last_fsync: Instant,
    pending: u64,
}

/// File-backed append-only journal. Segments are named `wal-<epoch>.ldjson`
/// and hold one JSON object per line. The file handle is opened lazily and
/// kept open across appends; opening is gated behind the same mutex that
/// guards appends, so concurrent callers never race to create two handles
/// for the same segment.
pub struct Journal {
    dir: PathBuf,
    fsync_interval: Duration,
    state: Arc<Mutex<JournalState>>,
}

impl Journal {
    pub fn new(dir: impl Into<PathBuf>, fsync_interval_ms: u64) -> Self {
        Self {
            dir: dir.into(),
            fsync_interval: Duration::from_millis(fsync_interval_ms),
            state: Arc::new(Mutex::new(JournalState {
                file: None,
                segment: None,
                last_fsync: Instant::now(),
                pending: 0,
            })),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn segment_name() -> String {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        format!("wal-{epoch}.ldjson")
    }

    fn ensure_open_blocking(dir: &Path, state: &mut JournalState) -> Result<(), WalError> {
        if state.file.is_some() {
            return Ok(());
        }
        fs::create_dir_all(dir).map_err(|e| WalError::Io(e.to_string()))?;
        let path = dir.join(Self::segment_name());
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| WalError::Io(e.to_string()))?;
        state.file = Some(file);
        state.segment = Some(path);
        state.last_fsync = Instant::now();
        state.pending = 0;
        Ok(())
    }

    /// Append one line, syncing to disk once `fsync_interval` has elapsed
    /// since the last sync (or immediately, if `fsync_interval` is zero).
    ///
    /// The actual file write and fsync run on a blocking-pool thread via
    /// `spawn_blocking`, so a slow disk never stalls the Tokio worker thread
    /// a request handler is running on.
    pub async fn append(&self, line: &WalLine) -> Result<(), WalError> {
        let serialized = serde_json::to_string(line).map_err(|e| WalError::Io(e.to_string()))?;
        let dir = self.dir.clone();
        let fsync_interval = self.fsync_interval;
        let state = self.state.clone();
        tokio::task::spawn_blocking(move || {
            let mut state = state.lock().expect("journal mutex poisoned");
            Self::ensure_open_blocking(&dir, &mut state)?;
            let file = state.file.as_mut().expect("just ensured open");
            writeln!(file, "{serialized}").map_err(|e| WalError::Io(e.to_string()))?;
            state.pending += 1;

            let due = fsync_interval.is_zero() || state.last_fsync.elapsed() >= fsync_interval;
            if due {
                file.sync_all().map_err(|e| WalError::Io(e.to_string()))?;
                state.last_fsync = Instant::now();
                state.pending = 0;
            }
            Ok(())
        })
        .await
        .map_err(|e| WalError::Io(e.to_string()))?
    }

    /// Force a sync of any unflushed bytes without rotating segments.
    pub async fn sync(&self) -> Result<(), WalError> {
        let state = self.state.clone();
        tokio::task::spawn_blocking(move || {
            let mut state = state.lock().expect("journal mutex poisoned");
            if let Some(file) = state.file.as_mut() {
                file.sync_all().map_err(|e| WalError::Io(e.to_string()))?;
                state.last_fsync = Instant::now();
                state.pending = 0;
            }
            Ok(())
        })
        .await
        .map_err(|e| WalError::Io(e.to_string()))?
    }

    /// Close the current segment so the next append opens a fresh one.
    pub async fn rotate(&self) -> Result<(), WalError> {
        let state = self.state.clone();
        tokio::task::spawn_blocking(move || {
            let mut state = state.lock().expect("journal mutex poisoned");
            if let Some(file) = state.file.take() {
                file.sync_all().map_err(|e| WalError::Io(e.to_string()))?;
            }
            state.segment = None;
            Ok(())
        })
        .await
        .map_err(|e| WalError::Io(e.to_string()))?
    }

    pub async fn close(&self) -> Result<(), WalError> {
        self.rotate().await
    }

    /// List segment files oldest-first by the epoch embedded in their name,
    /// for boot-time replay.
    pub async fn list_segments(&self) -> Result<Vec<PathBuf>, WalError> {
        let dir = self.dir.clone();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&dir).await.map_err(|e| WalError::Io(e.to_string()))?;
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| WalError::Io(e.to_string()))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("ldjson") {
                entries.push(path);
            }
        }
        entries.sort();
        Ok(entries)
    }

    /// Read and parse every line of a segment, skipping (and logging) any
    /// line that fails to parse rather than aborting the whole replay.
    pub async fn read_segment(path: &Path) -> Result<Vec<WalLine>, WalError> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| WalError::Io(e.to_string()))?;
        let mut lines = Vec::new();
        for (i, raw) in contents.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WalLine>(raw) {
                Ok(line) => lines.push(line),
                Err(e) => tracing::warn!(target: "wal", segment = %path.display(), line = i, error = %e, "skipping unparseable wal line"),
            }
        }
        Ok(lines)
    }
}
