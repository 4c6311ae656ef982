use crate::page_id::PageId;

/// A stable handle to a tuple's physical location, valid as long as the
/// tuple is neither deleted nor moved.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot_index: usize,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_index: usize) -> Self {
        Self {
            page_id,
            slot_index,
        }
    }
}
