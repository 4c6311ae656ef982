//! The Volcano-style pull iterator contract every operator implements:
//! `open`/`close`/`rewind` to manage lifecycle, `has_next`/`next` to pull
//! tuples one at a time. Kept as a single trait (a capability set) rather
//! than a base class with template methods — spec.md §9 calls out the
//! inheritance-heavy original design as something to avoid here.

use std::sync::Arc;

use crate::error::SmallError;
use crate::tuple::Tuple;
use crate::tuple_desc::TupleDesc;

pub trait OpIterator {
    fn open(&mut self) -> Result<(), SmallError>;
    fn close(&mut self);

    /// Equivalent to `close` followed by `open`, but operators that cache
    /// intermediate state (aggregation) can do this more cheaply than a
    /// full re-open.
    fn rewind(&mut self) -> Result<(), SmallError> {
        self.close();
        self.open()
    }

    fn has_next(&mut self) -> Result<bool, SmallError>;
    fn next(&mut self) -> Result<Tuple, SmallError>;
    fn get_tuple_desc(&self) -> &Arc<TupleDesc>;

    /// This operator's children, for tree rewriting. Leaves (table scans,
    /// the eagerly-materialized aggregate cursor) return an empty slice.
    fn get_children(&self) -> Vec<&dyn OpIterator> {
        Vec::new()
    }

    /// Replaces this operator's children. The default panics: only
    /// operators that actually hold a child (none in this crate's scope —
    /// spec.md §1 leaves non-aggregate operators as contract-only, and
    /// `AggIterator` runs over already-materialized rows) override it.
    fn set_children(&mut self, children: Vec<Box<dyn OpIterator>>) {
        assert!(
            children.is_empty(),
            "this operator accepts no children to rewrite"
        );
    }
}

/// A one-tuple look-ahead buffer: `has_next` pulls from the wrapped source
/// exactly once and caches the result, so repeated calls to `has_next`
/// don't advance the source and `next` never needs to re-fetch.
pub struct LookAhead<I> {
    inner: I,
    peeked: Option<Tuple>,
}

impl<I> LookAhead<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            peeked: None,
        }
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut I {
        &mut self.inner
    }
}

/// `fetch_next` is the operator-specific "pull one tuple, or None at
/// exhaustion" step; `LookAhead` turns that into `has_next`/`next`.
pub trait FetchNext {
    fn fetch_next(&mut self) -> Result<Option<Tuple>, SmallError>;
}

impl<I: FetchNext> LookAhead<I> {
    pub fn has_next(&mut self) -> Result<bool, SmallError> {
        if self.peeked.is_some() {
            return Ok(true);
        }
        self.peeked = self.inner.fetch_next()?;
        Ok(self.peeked.is_some())
    }

    pub fn next(&mut self) -> Result<Tuple, SmallError> {
        if !self.has_next()? {
            return Err(SmallError::no_such_element("no more tuples"));
        }
        Ok(self.peeked.take().unwrap())
    }

    pub fn reset(&mut self) {
        self.peeked = None;
    }
}
