use super::header::LogHeader;
use super::session::{FlushOutcome, LogSession, LogWriter};
use crate::buffer::TieredQueue;
use crate::domain::BootLogError;
use parking_lot::Mutex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// No log file open.
    #[default]
    Closed,
    Opening,
    /// File open, header written, flushing periodically.
    Active,
    /// Logging disabled and the last flush attempted.
    Stopped,
}

/// Last status observed by the worker. Per-record failures are not reported
/// individually; only the most recent one survives here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkerStatus {
    #[default]
    Idle,
    Ok,
    OpenFailed(ErrorKind),
    HeaderFailed(ErrorKind),
    WriteFailed(ErrorKind),
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerStatus::Idle => write!(f, "idle"),
            WorkerStatus::Ok => write!(f, "ok"),
            WorkerStatus::OpenFailed(kind) => write!(f, "open failed: {kind}"),
            WorkerStatus::HeaderFailed(kind) => write!(f, "header failed: {kind}"),
            WorkerStatus::WriteFailed(kind) => write!(f, "write failed: {kind}"),
        }
    }
}

impl Serialize for WorkerStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub log_path: PathBuf,
    pub flush_interval: Duration,
    pub retry_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub sessions_opened: u64,
    pub open_failures: u64,
    pub records_written: u64,
    pub write_failures: u64,
    pub last_status: WorkerStatus,
}

/// State and counters shared between the worker task and its observers.
///
/// Counters are updated before the state change that follows them, so a
/// state subscriber always sees the counters of the step that woke it.
#[derive(Debug)]
pub struct WorkerMonitor {
    state: watch::Sender<WorkerState>,
    status: Mutex<WorkerStatus>,
    sessions_opened: AtomicU64,
    open_failures: AtomicU64,
    records_written: AtomicU64,
    write_failures: AtomicU64,
}

impl Default for WorkerMonitor {
    fn default() -> Self {
        Self {
            state: watch::Sender::new(WorkerState::Closed),
            status: Mutex::new(WorkerStatus::Idle),
            sessions_opened: AtomicU64::new(0),
            open_failures: AtomicU64::new(0),
            records_written: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
        }
    }
}

impl WorkerMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    pub fn status(&self) -> WorkerStatus {
        *self.status.lock()
    }

    pub fn report(&self) -> WorkerReport {
        WorkerReport {
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            open_failures: self.open_failures.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            last_status: self.status(),
        }
    }

    fn set_state(&self, state: WorkerState) {
        self.state.send_replace(state);
    }

    fn set_status(&self, status: WorkerStatus) {
        *self.status.lock() = status;
    }
}

/// Background task that drains both tiers into the log file while logging
/// is enabled.
pub struct PersistenceWorker {
    config: WorkerConfig,
    header: LogHeader,
    tiers: Arc<TieredQueue>,
    enabled: Arc<AtomicBool>,
    cancel: CancellationToken,
    monitor: Arc<WorkerMonitor>,
}

impl PersistenceWorker {
    pub fn new(
        config: WorkerConfig,
        tiers: Arc<TieredQueue>,
        enabled: Arc<AtomicBool>,
        cancel: CancellationToken,
        monitor: Arc<WorkerMonitor>,
    ) -> Self {
        Self {
            config,
            header: LogHeader::current(),
            tiers,
            enabled,
            cancel,
            monitor,
        }
    }

    /// Spawns the worker on the current tokio runtime.
    pub fn spawn(self) -> Result<JoinHandle<WorkerReport>, BootLogError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| BootLogError::Spawn(e.to_string()))?;
        Ok(runtime.spawn(self.run()))
    }

    pub async fn run(self) -> WorkerReport {
        info!(path = %self.config.log_path.display(), "Boot log worker started");

        while self.is_enabled() {
            self.monitor.set_state(WorkerState::Opening);
            match LogSession::open(&self.config.log_path).await {
                Ok(session) => self.run_session(session).await,
                Err(e) => {
                    self.monitor.open_failures.fetch_add(1, Ordering::Relaxed);
                    self.monitor.set_status(WorkerStatus::OpenFailed(
                        e.io_kind().unwrap_or(ErrorKind::Other),
                    ));
                    self.monitor.set_state(WorkerState::Closed);
                    warn!("Boot log unavailable, retrying in {:?}: {}", self.config.retry_interval, e);
                    // Keep the cache from growing past the cap while nothing drains.
                    self.tiers.promote_cache();
                }
            }

            if !self.is_enabled() {
                break;
            }
            self.pause(self.config.retry_interval).await;
        }

        self.monitor.set_state(WorkerState::Stopped);
        let report = self.monitor.report();
        info!(
            sessions = report.sessions_opened,
            records = report.records_written,
            failures = report.write_failures,
            "Boot log worker stopped"
        );
        report
    }

    async fn run_session<W: LogWriter>(&self, mut session: LogSession<W>) {
        self.monitor.sessions_opened.fetch_add(1, Ordering::Relaxed);

        match session.write_header(&self.header).await {
            Ok(()) => {
                self.monitor.set_state(WorkerState::Active);
                self.monitor.set_status(WorkerStatus::Ok);
                info!(session_id = %session.id(), "Boot log session active");

                while self.is_enabled() {
                    let outcome = session.flush_cycle(&self.tiers).await;
                    if !self.observe(outcome) {
                        break;
                    }
                    self.pause(self.config.flush_interval).await;
                }

                let outcome = session.flush_cycle(&self.tiers).await;
                self.observe(outcome);
            }
            Err(e) => {
                self.monitor.set_status(WorkerStatus::HeaderFailed(
                    e.io_kind().unwrap_or(ErrorKind::Other),
                ));
                warn!(session_id = %session.id(), "Failed to write log header: {}", e);
            }
        }

        let summary = session.close().await;
        self.monitor.set_state(WorkerState::Closed);
        info!(
            session_id = %summary.id,
            records = summary.records_written,
            failures = summary.write_failures,
            "Boot log session closed"
        );
    }

    /// Folds a flush outcome into the counters. Returns false when the
    /// session should be abandoned.
    fn observe(&self, outcome: FlushOutcome) -> bool {
        self.monitor
            .records_written
            .fetch_add(outcome.written as u64, Ordering::Relaxed);
        self.monitor
            .write_failures
            .fetch_add(outcome.failed as u64, Ordering::Relaxed);

        match outcome.last_error {
            Some(kind) => {
                self.monitor.set_status(WorkerStatus::WriteFailed(kind));
                false
            }
            None => {
                if outcome.attempted > 0 {
                    self.monitor.set_status(WorkerStatus::Ok);
                }
                true
            }
        }
    }

    async fn pause(&self, interval: Duration) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(interval) => {}
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}
