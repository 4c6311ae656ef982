//! Grouped aggregation over one field, per spec.md §4.5. `IntegerAggregator`
//! handles MIN/MAX/SUM/AVG/COUNT on an `Int` field; `StringAggregator`
//! handles only COUNT on a `Str` field (the other operators are not
//! well-defined over strings). Both feed the same `AggIterator`, rather
//! than each defining its own output cursor, since the output shape is
//! identical: an optional group-by column followed by the aggregate value.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SmallError;
use crate::field::{Field, Type};
use crate::operator::OpIterator;
use crate::tuple::Tuple;
use crate::tuple_desc::{FieldDesc, TupleDesc};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AggOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

/// No-grouping aggregates are keyed on this sentinel instead of an
/// `Option<Field>` wrapper, so the internal map has one key type.
const NO_GROUP: Option<Field> = None;

#[derive(Default)]
struct IntAcc {
    count: i32,
    sum: i32,
    min: i32,
    max: i32,
}

impl IntAcc {
    fn new(first: i32) -> Self {
        Self {
            count: 1,
            sum: first,
            min: first,
            max: first,
        }
    }

    fn fold(&mut self, v: i32) {
        self.count += 1;
        self.sum += v;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    fn value(&self, op: AggOp) -> i32 {
        match op {
            AggOp::Min => self.min,
            AggOp::Max => self.max,
            AggOp::Sum => self.sum,
            AggOp::Count => self.count,
            // Integer division truncates toward zero, matching Rust's `/`.
            AggOp::Avg => self.sum / self.count,
        }
    }
}

pub struct IntegerAggregator {
    group_by_field: Option<usize>,
    group_by_type: Option<Type>,
    agg_field: usize,
    op: AggOp,
    groups: HashMap<Option<Field>, IntAcc>,
    group_order: Vec<Option<Field>>,
}

impl IntegerAggregator {
    pub fn new(
        group_by_field: Option<usize>,
        group_by_type: Option<Type>,
        agg_field: usize,
        op: AggOp,
    ) -> Self {
        Self {
            group_by_field,
            group_by_type,
            agg_field,
            op,
            groups: HashMap::new(),
            group_order: Vec::new(),
        }
    }

    pub fn merge_tuple_into_group(&mut self, tuple: &Tuple) -> Result<(), SmallError> {
        let key = self.group_key(tuple)?;
        let value = match tuple.field(self.agg_field) {
            Field::Int(v) => *v,
            other => {
                return Err(SmallError::illegal_argument(&format!(
                    "IntegerAggregator expects an INT aggregate field, got {}",
                    other.field_type()
                )))
            }
        };
        if !self.groups.contains_key(&key) {
            self.group_order.push(key.clone());
            self.groups.insert(key, IntAcc::new(value));
        } else {
            self.groups.get_mut(&key).unwrap().fold(value);
        }
        Ok(())
    }

    fn group_key(&self, tuple: &Tuple) -> Result<Option<Field>, SmallError> {
        match self.group_by_field {
            Some(i) => Ok(Some(tuple.field(i).clone())),
            None => Ok(NO_GROUP),
        }
    }

    pub fn iterator(self) -> AggIterator {
        let scheme = output_scheme(self.group_by_type, self.op);
        let rows: Vec<Tuple> = self
            .group_order
            .iter()
            .map(|key| {
                let acc = &self.groups[key];
                build_row(&scheme, key.clone(), Field::Int(acc.value(self.op)))
            })
            .collect();
        AggIterator::new(scheme, rows)
    }
}

pub struct StringAggregator {
    group_by_field: Option<usize>,
    group_by_type: Option<Type>,
    agg_field: usize,
    groups: HashMap<Option<Field>, i32>,
    group_order: Vec<Option<Field>>,
}

impl StringAggregator {
    /// `op` is accepted for symmetry with `IntegerAggregator` but must be
    /// `Count` — COUNT is the only aggregate defined over a STRING field.
    pub fn new(
        group_by_field: Option<usize>,
        group_by_type: Option<Type>,
        agg_field: usize,
        op: AggOp,
    ) -> Result<Self, SmallError> {
        if op != AggOp::Count {
            return Err(SmallError::illegal_argument(
                "StringAggregator only supports COUNT",
            ));
        }
        Ok(Self {
            group_by_field,
            group_by_type,
            agg_field,
            groups: HashMap::new(),
            group_order: Vec::new(),
        })
    }

    pub fn merge_tuple_into_group(&mut self, tuple: &Tuple) -> Result<(), SmallError> {
        match tuple.field(self.agg_field) {
            Field::Str(_) => {}
            other => {
                return Err(SmallError::illegal_argument(&format!(
                    "StringAggregator expects a STRING aggregate field, got {}",
                    other.field_type()
                )))
            }
        }
        let key = match self.group_by_field {
            Some(i) => Some(tuple.field(i).clone()),
            None => NO_GROUP,
        };
        if !self.groups.contains_key(&key) {
            self.group_order.push(key.clone());
            self.groups.insert(key, 1);
        } else {
            *self.groups.get_mut(&key).unwrap() += 1;
        }
        Ok(())
    }

    pub fn iterator(self) -> AggIterator {
        let scheme = output_scheme(self.group_by_type, AggOp::Count);
        let rows: Vec<Tuple> = self
            .group_order
            .iter()
            .map(|key| {
                let count = self.groups[key];
                build_row(&scheme, key.clone(), Field::Int(count))
            })
            .collect();
        AggIterator::new(scheme, rows)
    }
}

fn output_scheme(group_by_type: Option<Type>, _op: AggOp) -> Arc<TupleDesc> {
    let fields = match group_by_type {
        Some(t) => vec![
            FieldDesc {
                field_type: t,
                name: Some("groupVal".to_string()),
            },
            FieldDesc {
                field_type: Type::Int,
                name: Some("aggregateVal".to_string()),
            },
        ],
        None => vec![FieldDesc {
            field_type: Type::Int,
            name: Some("aggregateVal".to_string()),
        }],
    };
    Arc::new(TupleDesc::new(fields).expect("aggregate output schema is never empty"))
}

fn build_row(scheme: &Arc<TupleDesc>, key: Option<Field>, value: Field) -> Tuple {
    let fields = match key {
        Some(k) => vec![k, value],
        None => vec![value],
    };
    Tuple::new(scheme.clone(), fields).expect("aggregate row matches its own schema")
}

/// Replays the aggregator's precomputed output rows. Aggregation is
/// eager — the whole input is consumed by `merge_tuple_into_group` calls
/// before `iterator()` is ever built — so `open`/`rewind` just reset a
/// cursor over an already-materialized `Vec<Tuple>`.
pub struct AggIterator {
    scheme: Arc<TupleDesc>,
    rows: Vec<Tuple>,
    pos: usize,
    opened: bool,
}

impl AggIterator {
    fn new(scheme: Arc<TupleDesc>, rows: Vec<Tuple>) -> Self {
        Self {
            scheme,
            rows,
            pos: 0,
            opened: false,
        }
    }
}

impl OpIterator for AggIterator {
    fn open(&mut self) -> Result<(), SmallError> {
        self.pos = 0;
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
    }

    fn rewind(&mut self) -> Result<(), SmallError> {
        self.close();
        self.open()
    }

    fn has_next(&mut self) -> Result<bool, SmallError> {
        if !self.opened {
            return Err(SmallError::db_exception("aggregate iterator not open"));
        }
        Ok(self.pos < self.rows.len())
    }

    fn next(&mut self) -> Result<Tuple, SmallError> {
        if !self.has_next()? {
            return Err(SmallError::no_such_element("no more groups"));
        }
        let t = self.rows[self.pos].clone();
        self.pos += 1;
        Ok(t)
    }

    fn get_tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.scheme
    }
}
