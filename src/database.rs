//! Process-wide database context: a `Catalog` plus a `BufferPool`, bundled
//! so operators take one explicit reference instead of reaching into a
//! global from inside arbitrary methods. The only thing process-wide about
//! it is that most callers share one instance via `Arc`; nothing here is
//! reached through an internal static.

use std::path::Path;
use std::sync::Arc;

use crate::buffer_pool::{BufferPool, BufferPoolConfig};
use crate::catalog::Catalog;
use crate::error::{SmallError, SmallResult};
use crate::heap_file::HeapFile;
use crate::heap_page::HeapPage;
use crate::log_hook::LogWriter;
use crate::page_id::PageId;
use crate::permissions::Permissions;
use crate::transaction_id::TransactionID;
use crate::tuple::Tuple;
use crate::tuple_desc::TupleDesc;

pub struct Database {
    catalog: Catalog,
    buffer_pool: BufferPool,
}

impl Database {
    pub fn new(config: BufferPoolConfig, log: Box<dyn LogWriter>) -> Arc<Self> {
        Arc::new(Self {
            catalog: Catalog::new(),
            buffer_pool: BufferPool::new(config, log),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    pub fn add_table(
        &self,
        name: &str,
        path: &Path,
        scheme: Arc<TupleDesc>,
    ) -> Result<Arc<HeapFile>, SmallError> {
        let file = Arc::new(HeapFile::new(path, scheme, self.buffer_pool.config().page_size)?);
        self.catalog.add_table(name, file.clone());
        Ok(file)
    }

    pub fn get_page(
        &self,
        tid: TransactionID,
        pid: PageId,
        perm: Permissions,
    ) -> Result<HeapPage, SmallError> {
        self.buffer_pool.get_page(&self.catalog, tid, pid, perm)
    }

    pub fn with_page_mut<R>(
        &self,
        tid: TransactionID,
        pid: PageId,
        perm: Permissions,
        f: impl FnOnce(&mut HeapPage) -> R,
    ) -> Result<R, SmallError> {
        self.buffer_pool.with_page_mut(&self.catalog, tid, pid, perm, f)
    }

    pub fn insert_tuple(&self, tid: TransactionID, table_id: u64, tuple: Tuple) -> SmallResult {
        let file = self.catalog.get_db_file(table_id)?;
        file.insert_tuple(self, tid, tuple)
    }

    pub fn delete_tuple(&self, tid: TransactionID, tuple: &Tuple) -> SmallResult {
        let rid = tuple
            .record_id
            .ok_or_else(|| SmallError::illegal_argument("tuple has no record id"))?;
        let file = self.catalog.get_db_file(rid.page_id.table_id)?;
        file.delete_tuple(self, tid, tuple)
    }

    pub fn transaction_complete(&self, tid: TransactionID, commit: bool) -> SmallResult {
        self.buffer_pool.transaction_complete(&self.catalog, tid, commit)
    }

    pub fn flush_all_pages(&self) -> SmallResult {
        self.buffer_pool.flush_all_pages(&self.catalog)
    }
}
