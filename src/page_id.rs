//! Page addressing. `PageId` is stable for the life of the process; the
//! `table_id` component is derived once, at `HeapFile` construction, from a
//! hash of the backing file's absolute path (see `heap_file::stable_table_id`).

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PageId {
    pub table_id: u64,
    pub page_number: usize,
}

impl PageId {
    pub fn new(table_id: u64, page_number: usize) -> Self {
        Self {
            table_id,
            page_number,
        }
    }
}
