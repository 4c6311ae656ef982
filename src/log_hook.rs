//! The logging collaborator the buffer pool calls before a dirty page is
//! allowed to reach disk. spec.md treats the log's own record format and
//! recovery algorithm as external; this module only implements the hook
//! shape (`log_write` / `force`) and a minimal file-backed writer so the
//! crate is self-contained without needing a real ARIES log manager.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::error::{SmallError, SmallResult};
use crate::page_id::PageId;
use crate::transaction_id::TransactionID;

pub trait LogWriter: Send + Sync {
    /// Records the before/after image of one page write, attributed to
    /// `tid`. Must be called, and must return, before the corresponding
    /// page write reaches disk (write-ahead).
    fn log_write(
        &self,
        tid: TransactionID,
        pid: PageId,
        before: &[u8],
        after: &[u8],
    ) -> SmallResult;

    /// Forces every record written so far to stable storage.
    fn force(&self) -> SmallResult;
}

/// Appends flat `tid | table_id | page_number | before | after` records to a
/// single file and fsyncs on `force`. No checkpointing, no recovery replay —
/// just enough to make the write-ahead ordering observable in tests.
pub struct NaiveLogWriter {
    file: Mutex<File>,
}

impl NaiveLogWriter {
    pub fn new(path: &Path) -> Result<Self, SmallError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl LogWriter for NaiveLogWriter {
    fn log_write(
        &self,
        tid: TransactionID,
        pid: PageId,
        before: &[u8],
        after: &[u8],
    ) -> SmallResult {
        let mut file = self.file.lock().unwrap();
        file.write_all(&tid.to_string().into_bytes())?;
        file.write_all(b"\n")?;
        file.write_all(&pid.table_id.to_le_bytes())?;
        file.write_all(&pid.page_number.to_le_bytes())?;
        file.write_all(&(before.len() as u64).to_le_bytes())?;
        file.write_all(before)?;
        file.write_all(&(after.len() as u64).to_le_bytes())?;
        file.write_all(after)?;
        Ok(())
    }

    fn force(&self) -> SmallResult {
        let file = self.file.lock().unwrap();
        file.sync_all()?;
        Ok(())
    }
}

/// A `LogWriter` that discards everything — useful for tests that only
/// care about buffer pool/lock behavior, not write-ahead logging.
pub struct NoopLogWriter;

impl LogWriter for NoopLogWriter {
    fn log_write(
        &self,
        _tid: TransactionID,
        _pid: PageId,
        _before: &[u8],
        _after: &[u8],
    ) -> SmallResult {
        Ok(())
    }

    fn force(&self) -> SmallResult {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn naive_log_writer_appends_and_forces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.bin");
        let log = NaiveLogWriter::new(&path).unwrap();
        let tid = TransactionID::new();
        let pid = PageId::new(1, 0);
        log.log_write(tid, pid, &[0u8; 4], &[1u8; 4]).unwrap();
        log.force().unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }
}
