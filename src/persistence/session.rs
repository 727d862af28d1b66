use super::error::PersistenceError;
use super::header::LogHeader;
use crate::buffer::TieredQueue;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

/// Destination of a log session's bytes.
pub trait LogWriter: AsyncWrite + Unpin + Send {
    /// Makes everything written so far durable.
    fn sync(&mut self) -> impl Future<Output = io::Result<()>> + Send {
        std::future::ready(Ok(()))
    }
}

impl LogWriter for File {
    fn sync(&mut self) -> impl Future<Output = io::Result<()>> + Send {
        self.sync_data()
    }
}

/// Result of one flush cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    pub attempted: usize,
    pub written: usize,
    pub failed: usize,
    pub last_error: Option<ErrorKind>,
}

impl FlushOutcome {
    pub fn is_clean(&self) -> bool {
        self.last_error.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: Uuid,
    pub path: PathBuf,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub records_written: u64,
    pub write_failures: u64,
    pub bytes_written: u64,
}

/// One open log file, from a successful open to its close.
///
/// Opening truncates whatever the path held before, so every session starts
/// with exactly one header followed by back-to-back record payloads.
#[derive(Debug)]
pub struct LogSession<W = File> {
    writer: W,
    path: PathBuf,
    id: Uuid,
    opened_at: DateTime<Utc>,
    header_written: bool,
    records_written: u64,
    write_failures: u64,
    bytes_written: u64,
}

impl LogSession<File> {
    pub async fn open(path: &Path) -> Result<Self, PersistenceError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await
            .map_err(|source| PersistenceError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let session = Self::from_writer(file, path);
        tracing::debug!(session_id = %session.id, path = %path.display(), "Opened log session");
        Ok(session)
    }

    /// Opens `path` and writes `header`.
    pub async fn begin(path: &Path, header: &LogHeader) -> Result<Self, PersistenceError> {
        let mut session = Self::open(path).await?;
        session.write_header(header).await?;
        Ok(session)
    }
}

impl<W: LogWriter> LogSession<W> {
    /// Starts a session over an already open writer. `path` only labels it.
    pub fn from_writer(writer: W, path: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            path: path.into(),
            id: Uuid::new_v4(),
            opened_at: Utc::now(),
            header_written: false,
            records_written: 0,
            write_failures: 0,
            bytes_written: 0,
        }
    }

    pub async fn write_header(&mut self, header: &LogHeader) -> Result<(), PersistenceError> {
        let encoded = header.encode();
        self.write_through(&encoded)
            .await
            .map_err(PersistenceError::Write)?;
        self.header_written = true;
        self.bytes_written += encoded.len() as u64;
        Ok(())
    }

    /// Drains both tiers and appends every record of the batch.
    ///
    /// Each record is released right after its write attempt, whatever the
    /// result; a failed record is never retried.
    pub async fn flush_cycle(&mut self, tiers: &TieredQueue) -> FlushOutcome {
        let batch = tiers.take_batch();
        let mut outcome = FlushOutcome {
            attempted: batch.len(),
            ..FlushOutcome::default()
        };

        for record in batch {
            match self.write_through(record.payload()).await {
                Ok(()) => {
                    outcome.written += 1;
                    self.bytes_written += record.len() as u64;
                }
                Err(e) => {
                    outcome.failed += 1;
                    outcome.last_error = Some(e.kind());
                    tracing::debug!(
                        session_id = %self.id,
                        len = record.len(),
                        "Record write failed: {}",
                        e
                    );
                }
            }
        }

        self.records_written += outcome.written as u64;
        self.write_failures += outcome.failed as u64;
        if outcome.failed > 0 {
            tracing::warn!(
                session_id = %self.id,
                failed = outcome.failed,
                written = outcome.written,
                "Flush cycle discarded records after failed writes"
            );
        }
        outcome
    }

    /// Writes `data` and waits until the writer has accepted all of it, so
    /// an I/O error surfaces here rather than on a later write.
    async fn write_through(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data).await?;
        self.writer.flush().await
    }

    pub async fn close(mut self) -> SessionSummary {
        if let Err(e) = self.writer.flush().await {
            tracing::warn!(session_id = %self.id, "Final log flush failed: {}", e);
        }
        if let Err(e) = self.writer.sync().await {
            tracing::debug!(session_id = %self.id, "Log sync failed: {}", e);
        }

        let summary = SessionSummary {
            id: self.id,
            path: self.path,
            opened_at: self.opened_at,
            closed_at: Utc::now(),
            records_written: self.records_written,
            write_failures: self.write_failures,
            bytes_written: self.bytes_written,
        };
        tracing::debug!(
            session_id = %summary.id,
            records = summary.records_written,
            bytes = summary.bytes_written,
            "Closed log session"
        );
        summary
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::buffer::ExecutionContext;
    use crate::domain::Record;
    use crate::persistence::header::LOG_HEADER_LEN;
    use parking_lot::Mutex;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use tempfile::TempDir;

    /// In-memory writer that reports a full device once `capacity` bytes
    /// have been accepted.
    #[derive(Debug, Clone)]
    pub(crate) struct CappedWriter {
        pub(crate) written: Arc<Mutex<Vec<u8>>>,
        capacity: usize,
    }

    impl CappedWriter {
        pub(crate) fn new(capacity: usize) -> Self {
            Self {
                written: Arc::new(Mutex::new(Vec::new())),
                capacity,
            }
        }
    }

    impl AsyncWrite for CappedWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let mut written = self.written.lock();
            if written.len() + buf.len() > self.capacity {
                return Poll::Ready(Err(io::Error::from(ErrorKind::StorageFull)));
            }
            written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl LogWriter for CappedWriter {}

    fn submit_all(tiers: &TieredQueue, bodies: &[&[u8]]) {
        for body in bodies {
            tiers.submit(Record::length_prefixed(body).unwrap(), ExecutionContext::Blocking);
        }
    }

    #[tokio::test]
    async fn test_empty_flush_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("boot.bin");
        let tiers = TieredQueue::new(None);

        let mut session = LogSession::begin(&path, &LogHeader::current()).await.unwrap();
        let outcome = session.flush_cycle(&tiers).await;
        session.close().await;

        assert_eq!(outcome, FlushOutcome::default());
        let data = tokio::fs::read(&path).await.unwrap();
        assert_eq!(data.len(), LOG_HEADER_LEN);
        assert_eq!(LogHeader::decode(&data).unwrap(), LogHeader::current());
    }

    #[tokio::test]
    async fn test_reopen_truncates_previous_session() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("boot.bin");
        let tiers = TieredQueue::new(None);

        let mut first = LogSession::begin(&path, &LogHeader::current()).await.unwrap();
        tiers.submit(Record::new(vec![1u8; 64]), ExecutionContext::Blocking);
        first.flush_cycle(&tiers).await;
        first.close().await;

        let second = LogSession::begin(&path, &LogHeader::current()).await.unwrap();
        let summary = second.close().await;

        let data = tokio::fs::read(&path).await.unwrap();
        assert_eq!(data.len(), LOG_HEADER_LEN);
        assert_eq!(summary.records_written, 0);
    }

    #[tokio::test]
    async fn test_open_in_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("boot.bin");

        let err = LogSession::open(&path).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Open { .. }));
    }

    #[tokio::test]
    async fn test_failure_is_charged_to_the_failing_record() {
        let tiers = TieredQueue::new(None);
        submit_all(&tiers, &[b"abcd", b"efgh", b"ijkl"]);
        let writer = CappedWriter::new(LOG_HEADER_LEN + 8);

        let mut session = LogSession::from_writer(writer.clone(), "capped");
        session.write_header(&LogHeader::current()).await.unwrap();
        let outcome = session.flush_cycle(&tiers).await;

        assert_eq!(
            outcome,
            FlushOutcome {
                attempted: 3,
                written: 1,
                failed: 2,
                last_error: Some(ErrorKind::StorageFull),
            }
        );
        assert_eq!(tiers.pending(), 0);
        assert_eq!(&writer.written.lock()[LOG_HEADER_LEN..], b"\x08\0\0\0abcd");

        let summary = session.close().await;
        assert_eq!(summary.records_written, 1);
        assert_eq!(summary.write_failures, 2);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_full_device_counts_nothing_as_written() {
        let tiers = TieredQueue::new(None);
        submit_all(&tiers, &[b"one", b"two", b"three"]);

        let mut session = LogSession::open(Path::new("/dev/full")).await.unwrap();
        let outcome = session.flush_cycle(&tiers).await;
        let summary = session.close().await;

        assert_eq!(outcome.written, 0);
        assert_eq!(outcome.failed, 3);
        assert_eq!(outcome.last_error, Some(ErrorKind::StorageFull));
        assert_eq!(summary.bytes_written, 0);
        assert_eq!(tiers.pending(), 0);
    }
}
