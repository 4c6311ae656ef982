//! Fixed-size page layout: a leading slot bitmap followed by packed tuple
//! slots. See spec.md §6 for the exact wire format this module implements.

use std::sync::Arc;

use crate::error::SmallError;
use crate::page_id::PageId;
use crate::record_id::RecordId;
use crate::transaction_id::TransactionID;
use crate::tuple::Tuple;
use crate::tuple_desc::TupleDesc;

/// Number of slots a page of `page_size` bytes can hold for tuples of
/// `tuple_size` bytes: the largest N such that the N-bit header plus N
/// tuples still fits in `page_size` bytes.
pub fn slots_per_page(page_size: usize, tuple_size: usize) -> usize {
    (page_size * 8) / (tuple_size * 8 + 1)
}

fn header_size(num_slots: usize) -> usize {
    (num_slots + 7) / 8
}

fn bit_get(header: &[u8], i: usize) -> bool {
    let byte = header[i / 8];
    (byte >> (i % 8)) & 1 == 1
}

fn bit_set(header: &mut [u8], i: usize, value: bool) {
    let mask = 1u8 << (i % 8);
    if value {
        header[i / 8] |= mask;
    } else {
        header[i / 8] &= !mask;
    }
}

#[derive(Clone)]
pub struct HeapPage {
    page_id: PageId,
    scheme: Arc<TupleDesc>,
    page_size: usize,
    num_slots: usize,
    header: Vec<u8>,
    slots: Vec<Option<Tuple>>,
    dirty: Option<TransactionID>,
    before_image: Vec<u8>,
}

impl HeapPage {
    /// Parses a page out of an exactly-`page_size`-byte buffer.
    pub fn new(
        page_id: PageId,
        scheme: Arc<TupleDesc>,
        page_size: usize,
        bytes: &[u8],
    ) -> Result<Self, SmallError> {
        if bytes.len() != page_size {
            return Err(SmallError::illegal_argument(&format!(
                "page buffer must be exactly {} bytes, got {}",
                page_size,
                bytes.len()
            )));
        }

        let tuple_size = scheme.size();
        let num_slots = slots_per_page(page_size, tuple_size);
        let hsize = header_size(num_slots);

        let header = bytes[..hsize].to_vec();

        let mut slots: Vec<Option<Tuple>> = Vec::with_capacity(num_slots);
        let mut offset = hsize;
        for i in 0..num_slots {
            let slot_bytes = &bytes[offset..offset + tuple_size];
            if bit_get(&header, i) {
                let mut t = Tuple::from_bytes(scheme.clone(), slot_bytes);
                t.record_id = Some(RecordId::new(page_id, i));
                slots.push(Some(t));
            } else {
                slots.push(None);
            }
            offset += tuple_size;
        }

        Ok(Self {
            page_id,
            scheme,
            page_size,
            num_slots,
            header,
            slots,
            dirty: None,
            before_image: bytes.to_vec(),
        })
    }

    /// A fresh, all-empty page of `page_size` bytes for `scheme`.
    pub fn empty(page_id: PageId, scheme: Arc<TupleDesc>, page_size: usize) -> Self {
        let zeros = vec![0u8; page_size];
        Self::new(page_id, scheme, page_size, &zeros).expect("empty page buffer is always valid")
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn scheme(&self) -> &Arc<TupleDesc> {
        &self.scheme
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn get_num_empty_slots(&self) -> usize {
        (0..self.num_slots).filter(|&i| !self.is_slot_used(i)).count()
    }

    pub fn is_slot_used(&self, i: usize) -> bool {
        bit_get(&self.header, i)
    }

    fn mark_slot_used(&mut self, i: usize, used: bool) {
        bit_set(&mut self.header, i, used);
    }

    /// Inserts `tuple` into the first free slot, stamping its `record_id`.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> Result<(), SmallError> {
        if tuple.scheme() != &self.scheme {
            return Err(SmallError::illegal_argument(
                "tuple schema does not match page schema",
            ));
        }

        let slot = (0..self.num_slots).find(|&i| !self.is_slot_used(i));
        let slot = match slot {
            Some(s) => s,
            None => return Err(SmallError::db_exception("no empty slot on page")),
        };

        tuple.record_id = Some(RecordId::new(self.page_id, slot));
        self.mark_slot_used(slot, true);
        self.slots[slot] = Some(tuple);
        Ok(())
    }

    /// Removes the tuple identified by `tuple.record_id`, which must name a
    /// currently-occupied slot on this page.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<(), SmallError> {
        let rid = tuple
            .record_id
            .ok_or_else(|| SmallError::illegal_argument("tuple has no record id"))?;
        if rid.page_id != self.page_id {
            return Err(SmallError::db_exception("tuple is not on this page"));
        }
        if !self.is_slot_used(rid.slot_index) {
            return Err(SmallError::db_exception("slot is already empty"));
        }
        self.mark_slot_used(rid.slot_index, false);
        self.slots[rid.slot_index] = None;
        Ok(())
    }

    /// Used slots in ascending slot order. Each call produces a fresh,
    /// independent snapshot iterator; the page itself is not consumed.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    pub fn get_page_data(&self) -> Vec<u8> {
        let tuple_size = self.scheme.size();
        let hsize = header_size(self.num_slots);
        let mut out = vec![0u8; self.page_size];
        out[..hsize].copy_from_slice(&self.header);

        let mut offset = hsize;
        for slot in &self.slots {
            if let Some(t) = slot {
                let bytes = t.to_bytes();
                out[offset..offset + tuple_size].copy_from_slice(&bytes);
            }
            offset += tuple_size;
        }
        out
    }

    pub fn mark_dirty(&mut self, dirty: bool, tid: TransactionID) {
        self.dirty = if dirty { Some(tid) } else { None };
    }

    pub fn is_dirty(&self) -> Option<TransactionID> {
        self.dirty
    }

    pub fn get_before_image(&self) -> Vec<u8> {
        self.before_image.clone()
    }

    /// Snapshots the page's current serialized bytes as its new
    /// before-image — called at commit, once the page's write has been
    /// logged.
    pub fn set_before_image(&mut self) {
        self.before_image = self.get_page_data();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    fn scheme() -> Arc<TupleDesc> {
        Arc::new(TupleDesc::simple_ints(2, "f"))
    }

    fn tuple(a: i32, b: i32) -> Tuple {
        Tuple::new(scheme(), vec![Field::Int(a), Field::Int(b)]).unwrap()
    }

    #[test]
    fn empty_page_has_no_used_slots() {
        let page = HeapPage::empty(PageId::new(1, 0), scheme(), 4096);
        assert_eq!(page.iter().count(), 0);
        assert_eq!(page.get_num_empty_slots(), page.num_slots());
    }

    #[test]
    fn insert_then_iterate_in_slot_order() {
        let mut page = HeapPage::empty(PageId::new(1, 0), scheme(), 4096);
        page.insert_tuple(tuple(1, 10)).unwrap();
        page.insert_tuple(tuple(2, 20)).unwrap();
        page.insert_tuple(tuple(3, 30)).unwrap();

        let rows: Vec<&Tuple> = page.iter().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].field(0), &Field::Int(1));
        assert_eq!(rows[1].field(0), &Field::Int(2));
        assert_eq!(rows[2].field(0), &Field::Int(3));
    }

    #[test]
    fn insert_stamps_record_id() {
        let mut page = HeapPage::empty(PageId::new(1, 0), scheme(), 4096);
        let t = tuple(1, 1);
        page.insert_tuple(t).unwrap();
        let stored = page.iter().next().unwrap();
        assert_eq!(stored.record_id.unwrap().slot_index, 0);
    }

    #[test]
    fn insert_fails_on_schema_mismatch() {
        let mut page = HeapPage::empty(PageId::new(1, 0), scheme(), 4096);
        let other_scheme = Arc::new(TupleDesc::simple_ints(3, "g"));
        let t = Tuple::new(other_scheme, vec![Field::Int(1), Field::Int(2), Field::Int(3)]).unwrap();
        let err = page.insert_tuple(t).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::IllegalArgument);
    }

    #[test]
    fn insert_fails_when_full() {
        let mut page = HeapPage::empty(PageId::new(1, 0), scheme(), 4096);
        let n = page.num_slots();
        for _ in 0..n {
            page.insert_tuple(tuple(1, 1)).unwrap();
        }
        let err = page.insert_tuple(tuple(1, 1)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DbException);
    }

    #[test]
    fn delete_requires_matching_page_and_used_slot() {
        let mut page = HeapPage::empty(PageId::new(1, 0), scheme(), 4096);
        page.insert_tuple(tuple(1, 1)).unwrap();
        let t = page.iter().next().unwrap().clone();

        page.delete_tuple(&t).unwrap();
        assert_eq!(page.iter().count(), 0);

        let err = page.delete_tuple(&t).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DbException);
    }

    #[test]
    fn round_trip_serialize_parse() {
        let mut page = HeapPage::empty(PageId::new(7, 3), scheme(), 4096);
        page.insert_tuple(tuple(1, 2)).unwrap();
        page.insert_tuple(tuple(3, 4)).unwrap();

        let bytes = page.get_page_data();
        let parsed = HeapPage::new(PageId::new(7, 3), scheme(), 4096, &bytes).unwrap();

        let a: Vec<&Tuple> = page.iter().collect();
        let b: Vec<&Tuple> = parsed.iter().collect();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.fields(), y.fields());
        }
        assert!(parsed.is_dirty().is_none());
    }

    #[test]
    fn unoccupied_slot_bytes_are_zero_on_serialization() {
        let page = HeapPage::empty(PageId::new(1, 0), scheme(), 4096);
        let bytes = page.get_page_data();
        let hsize = header_size(page.num_slots());
        assert!(bytes[hsize..].iter().all(|&b| b == 0));
    }

    #[test]
    fn before_image_tracks_explicit_snapshot() {
        let mut page = HeapPage::empty(PageId::new(1, 0), scheme(), 4096);
        let initial = page.get_before_image();
        page.insert_tuple(tuple(9, 9)).unwrap();
        assert_eq!(page.get_before_image(), initial);
        page.set_before_image();
        assert_eq!(page.get_before_image(), page.get_page_data());
    }
}
