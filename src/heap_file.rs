//! A table's on-disk storage: a flat file of fixed-size pages, addressed by
//! page number. See spec.md §4.2.

use std::collections::hash_map::DefaultHasher;
use std::fs::{File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::database::Database;
use crate::error::SmallError;
use crate::heap_page::HeapPage;
use crate::page_id::PageId;
use crate::permissions::Permissions;
use crate::transaction_id::TransactionID;
use crate::tuple::Tuple;
use crate::tuple_desc::TupleDesc;

/// Derives a stable `table_id` from the backing file's absolute path, so the
/// same on-disk file always maps to the same `PageId` space across process
/// restarts.
fn stable_table_id(path: &Path) -> u64 {
    let absolute = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());
    let mut hasher = DefaultHasher::new();
    absolute.hash(&mut hasher);
    hasher.finish()
}

/// A file-backed store of fixed-size pages. Any disk-resident table, not
/// just heap-organized ones, could implement the same surface; this crate
/// only ever has heap files, so `DbFile` and `HeapFile` are not split apart.
pub trait DbFile: Send + Sync {
    fn get_id(&self) -> u64;
    fn get_tuple_desc(&self) -> &Arc<TupleDesc>;
    fn read_page(&self, pid: PageId) -> Result<HeapPage, SmallError>;
    fn write_page(&self, page: &HeapPage) -> Result<(), SmallError>;
    fn num_pages(&self) -> usize;
}

pub struct HeapFile {
    table_id: u64,
    scheme: Arc<TupleDesc>,
    page_size: usize,
    file: Mutex<File>,
}

impl HeapFile {
    pub fn new(path: &Path, scheme: Arc<TupleDesc>, page_size: usize) -> Result<Self, SmallError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(Self {
            table_id: stable_table_id(path),
            scheme,
            page_size,
            file: Mutex::new(file),
        })
    }

    pub fn table_id(&self) -> u64 {
        self.table_id
    }

    /// Appends a new, empty page at the end of the file and writes it
    /// through immediately — `insert_tuple` calls this only once every
    /// existing page is full.
    fn append_empty_page(&self) -> Result<PageId, SmallError> {
        let pid = PageId::new(self.table_id, self.num_pages());
        let page = HeapPage::empty(pid, self.scheme.clone(), self.page_size);
        self.write_page(&page)?;
        Ok(pid)
    }

    /// Finds room for `tuple` among the file's existing pages, appending a
    /// fresh page if none has a free slot, and marks whichever page
    /// absorbed the insert dirty under `tid`.
    pub fn insert_tuple(
        &self,
        database: &Database,
        tid: TransactionID,
        tuple: Tuple,
    ) -> Result<(), SmallError> {
        for page_number in 0..self.num_pages() {
            let pid = PageId::new(self.table_id, page_number);
            let inserted = database.with_page_mut(
                tid,
                pid,
                Permissions::ReadWrite,
                |page| -> Result<bool, SmallError> {
                    if page.get_num_empty_slots() == 0 {
                        return Ok(false);
                    }
                    page.insert_tuple(tuple.clone())?;
                    page.mark_dirty(true, tid);
                    Ok(true)
                },
            )??;
            if inserted {
                return Ok(());
            }
        }

        let new_pid = self.append_empty_page()?;
        database.with_page_mut(
            tid,
            new_pid,
            Permissions::ReadWrite,
            |page| -> Result<(), SmallError> {
                page.insert_tuple(tuple)?;
                page.mark_dirty(true, tid);
                Ok(())
            },
        )??;
        Ok(())
    }

    pub fn delete_tuple(
        &self,
        database: &Database,
        tid: TransactionID,
        tuple: &Tuple,
    ) -> Result<(), SmallError> {
        let rid = tuple
            .record_id
            .ok_or_else(|| SmallError::illegal_argument("tuple has no record id"))?;
        database.with_page_mut(
            tid,
            rid.page_id,
            Permissions::ReadWrite,
            |page| -> Result<(), SmallError> {
                page.delete_tuple(tuple)?;
                page.mark_dirty(true, tid);
                Ok(())
            },
        )??;
        Ok(())
    }

    pub fn iterator(self: &Arc<Self>, database: Arc<Database>, tid: TransactionID) -> HeapFileIterator {
        HeapFileIterator::new(self.clone(), database, tid)
    }
}

impl DbFile for HeapFile {
    fn get_id(&self) -> u64 {
        self.table_id
    }

    fn get_tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.scheme
    }

    fn read_page(&self, pid: PageId) -> Result<HeapPage, SmallError> {
        let page_count = self.num_pages();
        if pid.page_number >= page_count {
            return Err(SmallError::illegal_argument(&format!(
                "page {} out of range, file has {} pages",
                pid.page_number, page_count
            )));
        }
        let mut file = self.file.lock().unwrap();
        let offset = (pid.page_number * self.page_size) as u64;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; self.page_size];
        file.read_exact(&mut buf)?;
        HeapPage::new(pid, self.scheme.clone(), self.page_size, &buf)
    }

    fn write_page(&self, page: &HeapPage) -> Result<(), SmallError> {
        let mut file = self.file.lock().unwrap();
        let offset = (page.page_id().page_number * self.page_size) as u64;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&page.get_page_data())?;
        file.flush()?;
        Ok(())
    }

    fn num_pages(&self) -> usize {
        let file = self.file.lock().unwrap();
        let len = file.metadata().map(|m| m.len()).unwrap_or(0) as usize;
        (len + self.page_size - 1) / self.page_size
    }
}

/// A restartable forward cursor over every tuple in a `HeapFile`, fetching
/// one page at a time through the buffer pool (so normal locking applies to
/// scans, not just writes).
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    database: Arc<Database>,
    tid: TransactionID,
    page_number: usize,
    buffer: Vec<Tuple>,
    buf_pos: usize,
    opened: bool,
}

impl HeapFileIterator {
    fn new(file: Arc<HeapFile>, database: Arc<Database>, tid: TransactionID) -> Self {
        Self {
            file,
            database,
            tid,
            page_number: 0,
            buffer: Vec::new(),
            buf_pos: 0,
            opened: false,
        }
    }

    pub fn open(&mut self) -> Result<(), SmallError> {
        self.page_number = 0;
        self.buffer.clear();
        self.buf_pos = 0;
        self.opened = true;
        self.load_page()
    }

    pub fn close(&mut self) {
        self.opened = false;
        self.buffer.clear();
        self.buf_pos = 0;
    }

    pub fn rewind(&mut self) -> Result<(), SmallError> {
        self.close();
        self.open()
    }

    fn load_page(&mut self) -> Result<(), SmallError> {
        self.buffer.clear();
        self.buf_pos = 0;
        while self.page_number < self.file.num_pages() {
            let pid = PageId::new(self.file.table_id(), self.page_number);
            let page = self.database.get_page(
                self.tid,
                pid,
                Permissions::ReadOnly,
            )?;
            self.buffer = page.iter().cloned().collect();
            self.page_number += 1;
            if !self.buffer.is_empty() {
                return Ok(());
            }
        }
        Ok(())
    }

    pub fn has_next(&mut self) -> Result<bool, SmallError> {
        if !self.opened {
            return Err(SmallError::db_exception("iterator not open"));
        }
        if self.buf_pos < self.buffer.len() {
            return Ok(true);
        }
        self.load_page()?;
        Ok(self.buf_pos < self.buffer.len())
    }

    pub fn next(&mut self) -> Result<Tuple, SmallError> {
        if !self.has_next()? {
            return Err(SmallError::no_such_element("no more tuples"));
        }
        let t = self.buffer[self.buf_pos].clone();
        self.buf_pos += 1;
        Ok(t)
    }

    pub fn get_tuple_desc(&self) -> &Arc<TupleDesc> {
        self.file.get_tuple_desc()
    }
}
