use super::tiers::TieredQueue;
use crate::domain::Record;
use std::sync::Arc;

/// Capability describing whether the submitting caller may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionContext {
    /// The caller may wait for the queue lock.
    Blocking,
    /// The caller must never be suspended (interrupt-like context).
    NonBlocking,
}

impl ExecutionContext {
    pub fn may_block(self) -> bool {
        matches!(self, ExecutionContext::Blocking)
    }
}

/// Cloneable producer handle onto the engine's admission tiers.
#[derive(Debug, Clone)]
pub struct Admission {
    tiers: Arc<TieredQueue>,
}

impl Admission {
    pub fn new(tiers: Arc<TieredQueue>) -> Self {
        Self { tiers }
    }

    pub fn submit(&self, record: Record, context: ExecutionContext) {
        self.tiers.submit(record, context);
    }

    /// Shorthand for a submission from a context that may block.
    pub fn submit_blocking(&self, record: Record) {
        self.submit(record, ExecutionContext::Blocking);
    }

    /// Shorthand for a submission from a context that must not block.
    pub fn submit_non_blocking(&self, record: Record) {
        self.submit(record, ExecutionContext::NonBlocking);
    }
}
