use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// An opaque transaction identifier. Created externally (by whoever is
/// beginning a transaction) and threaded through every call into the
/// buffer pool and lock manager; it carries no behavior of its own.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TransactionID(u64);

impl TransactionID {
    pub fn new() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for TransactionID {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "tx_{}", self.0)
    }
}
