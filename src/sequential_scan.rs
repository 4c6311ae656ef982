//! The base-table scan operator: wraps a `HeapFileIterator` behind the
//! `OpIterator` contract so it composes with every other operator.

use std::sync::Arc;

use crate::database::Database;
use crate::error::SmallError;
use crate::heap_file::{DbFile, HeapFile};
use crate::operator::OpIterator;
use crate::transaction_id::TransactionID;
use crate::tuple::Tuple;
use crate::tuple_desc::TupleDesc;

pub struct SequentialScan {
    file: Arc<HeapFile>,
    database: Arc<Database>,
    tid: TransactionID,
    inner: Option<crate::heap_file::HeapFileIterator>,
}

impl SequentialScan {
    pub fn new(database: Arc<Database>, tid: TransactionID, table_id: u64) -> Result<Self, SmallError> {
        let file = database.catalog().get_db_file(table_id)?;
        Ok(Self {
            file,
            database,
            tid,
            inner: None,
        })
    }
}

impl OpIterator for SequentialScan {
    fn open(&mut self) -> Result<(), SmallError> {
        let mut it = self.file.iterator(self.database.clone(), self.tid);
        it.open()?;
        self.inner = Some(it);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(it) = self.inner.as_mut() {
            it.close();
        }
        self.inner = None;
    }

    fn rewind(&mut self) -> Result<(), SmallError> {
        match self.inner.as_mut() {
            Some(it) => it.rewind(),
            None => self.open(),
        }
    }

    fn has_next(&mut self) -> Result<bool, SmallError> {
        match self.inner.as_mut() {
            Some(it) => it.has_next(),
            None => Err(SmallError::db_exception("scan is not open")),
        }
    }

    fn next(&mut self) -> Result<Tuple, SmallError> {
        match self.inner.as_mut() {
            Some(it) => it.next(),
            None => Err(SmallError::db_exception("scan is not open")),
        }
    }

    fn get_tuple_desc(&self) -> &Arc<TupleDesc> {
        self.file.get_tuple_desc()
    }
}
