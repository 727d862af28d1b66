//! Domain layer for the boot logging engine.
//!
//! Contains the types shared across all modules:
//! - `Record`: one opaque monitoring entry with a known byte length
//! - `RecordList`: owning FIFO with O(1) detach/append
//! - `BootLogError`: top-level error type

pub mod error;
pub mod record;

pub use error::BootLogError;
pub use record::{LENGTH_PREFIX_LEN, Record, RecordList};
