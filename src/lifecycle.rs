//! Engine context: owns both queue tiers, the enabled flag and the
//! persistence worker handle for one boot logging instance.

use crate::app::config::serde_helpers;
use crate::buffer::{Admission, ExecutionContext, QueueMetrics, TieredQueue};
use crate::domain::{BootLogError, Record};
use crate::persistence::{
    PersistenceWorker, WorkerConfig, WorkerMonitor, WorkerReport, WorkerState, WorkerStatus,
};
use crate::settings::{BootSettings, DriverWatch, SettingsSource};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const DEFAULT_LOG_PATH: &str = "/var/log/bootlog/boot.bin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub log_path: PathBuf,
    #[serde(with = "serde_helpers", rename = "flush_interval_ms")]
    pub flush_interval: Duration,
    #[serde(with = "serde_helpers", rename = "retry_interval_ms")]
    pub retry_interval: Duration,
    /// Oldest records beyond this many pending are dropped. Unbounded when unset.
    pub max_pending_records: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            flush_interval: Duration::from_millis(1000),
            retry_interval: Duration::from_millis(1000),
            max_pending_records: None,
        }
    }
}

impl EngineConfig {
    fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            log_path: self.log_path.clone(),
            flush_interval: self.flush_interval,
            retry_interval: self.retry_interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootLogStats {
    pub enabled: bool,
    pub pending: usize,
    pub queue: QueueMetrics,
    pub sessions_opened: u64,
    pub open_failures: u64,
    pub records_written: u64,
    pub write_failures: u64,
    pub worker_state: WorkerState,
    pub worker_status: WorkerStatus,
}

#[derive(Debug, Default)]
struct WorkerSlot {
    handle: Option<JoinHandle<WorkerReport>>,
    cancel: Option<CancellationToken>,
    report: Option<WorkerReport>,
}

#[derive(Debug)]
pub struct BootLog {
    config: EngineConfig,
    tiers: Arc<TieredQueue>,
    enabled: Arc<AtomicBool>,
    monitor: Arc<WorkerMonitor>,
    worker: Mutex<WorkerSlot>,
}

impl BootLog {
    /// Creates both tiers empty with logging disabled. Records submitted now
    /// are kept until a worker drains them.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            tiers: Arc::new(TieredQueue::new(config.max_pending_records)),
            config,
            enabled: Arc::new(AtomicBool::new(false)),
            monitor: Arc::new(WorkerMonitor::new()),
            worker: Mutex::new(WorkerSlot::default()),
        }
    }

    /// Loads the boot settings, registers the watched driver and starts the
    /// worker when boot logging is on.
    ///
    /// A failure leaves the tiers usable; only the worker is missing.
    pub fn init(
        &self,
        source: &dyn SettingsSource,
        watch: &dyn DriverWatch,
    ) -> Result<BootSettings, BootLogError> {
        let settings = BootSettings::load(source)?;
        settings.apply(watch)?;

        if settings.log_boot {
            self.start()?;
        } else {
            info!("Boot logging disabled by settings");
        }
        Ok(settings)
    }

    /// Sets the enabled flag and spawns the persistence worker on the
    /// current tokio runtime.
    ///
    /// Refused while a previous worker exists, including one a `disable`
    /// call is still waiting on.
    pub fn start(&self) -> Result<(), BootLogError> {
        let mut slot = self.worker.try_lock().map_err(|_| BootLogError::Stopping)?;
        if slot.handle.is_some() {
            return Err(BootLogError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        self.enabled.store(true, Ordering::Release);
        let worker = PersistenceWorker::new(
            self.config.worker_config(),
            Arc::clone(&self.tiers),
            Arc::clone(&self.enabled),
            cancel.clone(),
            Arc::clone(&self.monitor),
        );

        match worker.spawn() {
            Ok(handle) => {
                slot.handle = Some(handle);
                slot.cancel = Some(cancel);
                info!(path = %self.config.log_path.display(), "Boot logging enabled");
                Ok(())
            }
            Err(e) => {
                self.enabled.store(false, Ordering::Release);
                warn!("Boot logging could not start: {}", e);
                Err(e)
            }
        }
    }

    /// Waits until the worker has made its first attempt at opening the log
    /// file, successful or not. Returns false if `limit` elapses first.
    pub async fn wait_for_worker(&self, limit: Duration) -> bool {
        let mut changes = self.monitor.subscribe();
        let first_attempt = changes.wait_for(|_| {
            let report = self.monitor.report();
            report.sessions_opened > 0 || report.open_failures > 0
        });
        let attempted = tokio::time::timeout(limit, first_attempt).await;
        matches!(attempted, Ok(Ok(_)))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn submit(&self, record: Record, context: ExecutionContext) {
        self.tiers.submit(record, context);
    }

    /// Cloneable producer handle sharing this engine's tiers.
    pub fn admission(&self) -> Admission {
        Admission::new(Arc::clone(&self.tiers))
    }

    /// Clears the enabled flag, wakes the worker and waits for it to exit.
    ///
    /// Every caller waits until the worker has stopped; once it has, the
    /// stored report is returned again. Dropping the returned future keeps
    /// the worker handle, so a later call resumes the wait.
    pub async fn disable(&self) -> Result<Option<WorkerReport>, BootLogError> {
        self.enabled.store(false, Ordering::Release);

        let mut slot = self.worker.lock().await;
        if let Some(cancel) = slot.cancel.take() {
            cancel.cancel();
        }
        let Some(handle) = slot.handle.as_mut() else {
            return Ok(slot.report.clone());
        };

        let joined = handle.await;
        slot.handle = None;
        let report = joined.map_err(|e| BootLogError::WorkerPanicked(e.to_string()))?;
        info!(
            records = report.records_written,
            failures = report.write_failures,
            "Boot logging disabled"
        );
        slot.report = Some(report.clone());
        Ok(Some(report))
    }

    /// Disables logging and tears the engine down.
    pub async fn finit(self) -> Result<Option<WorkerReport>, BootLogError> {
        let report = self.disable().await?;
        let pending = self.tiers.pending();
        if pending > 0 {
            warn!(pending, "Discarding records never persisted");
        }
        Ok(report)
    }

    pub fn worker_state(&self) -> WorkerState {
        self.monitor.state()
    }

    pub fn stats(&self) -> BootLogStats {
        let report = self.monitor.report();
        BootLogStats {
            enabled: self.is_enabled(),
            pending: self.tiers.pending(),
            queue: self.tiers.metrics(),
            sessions_opened: report.sessions_opened,
            open_failures: report.open_failures,
            records_written: report.records_written,
            write_failures: report.write_failures,
            worker_state: self.monitor.state(),
            worker_status: report.last_status,
        }
    }

    pub fn tiers(&self) -> &Arc<TieredQueue> {
        &self.tiers
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
