mod aggregator;
mod buffer_pool;
mod catalog;
mod database;
mod error;
mod field;
mod heap_file;
mod heap_page;
mod lock_manager;
mod log_hook;
mod operator;
mod page_id;
mod permissions;
mod record_id;
mod sequential_scan;
mod transaction_id;
mod tuple;
mod tuple_desc;
mod util;
mod wait_for_graph;

mod log;

pub use aggregator::{AggIterator, AggOp, IntegerAggregator, StringAggregator};
pub use buffer_pool::{BufferPool, BufferPoolConfig, PAGE_SIZE};
pub use catalog::Catalog;
pub use database::Database;
pub use error::{ErrorKind, SmallError, SmallResult};
pub use field::{Field, Op, Type};
pub use heap_file::{DbFile, HeapFile, HeapFileIterator};
pub use heap_page::HeapPage;
pub use lock_manager::{LockKind, LockManager};
pub use log::init_log;
pub use log_hook::{LogWriter, NaiveLogWriter, NoopLogWriter};
pub use operator::{FetchNext, LookAhead, OpIterator};
pub use page_id::PageId;
pub use permissions::Permissions;
pub use record_id::RecordId;
pub use sequential_scan::SequentialScan;
pub use transaction_id::TransactionID;
pub use tuple::Tuple;
pub use tuple_desc::{FieldDesc, TupleDesc};
pub use util::HandyRwLock;
