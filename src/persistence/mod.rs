pub mod error;
pub mod header;
pub mod reader;
pub mod session;
pub mod worker;

pub use error::PersistenceError;
pub use header::{Architecture, LOG_HEADER_LEN, LOG_SIGNATURE, LOG_VERSION, LogHeader};
pub use reader::{FixedSize, LengthPrefixed, LogReader, RecordFraming};
pub use session::{FlushOutcome, LogSession, LogWriter, SessionSummary};
pub use worker::{
    PersistenceWorker, WorkerConfig, WorkerMonitor, WorkerReport, WorkerState, WorkerStatus,
};
