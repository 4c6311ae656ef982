use std::fmt;
use std::sync::Arc;

use crate::error::SmallError;
use crate::field::Field;
use crate::record_id::RecordId;
use crate::tuple_desc::TupleDesc;

/// A schema-carrying row. `record_id` is `None` until the tuple is inserted
/// into a page, at which point `HeapPage::insert_tuple` stamps it.
#[derive(Clone, Debug)]
pub struct Tuple {
    scheme: Arc<TupleDesc>,
    fields: Vec<Field>,
    pub record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(scheme: Arc<TupleDesc>, fields: Vec<Field>) -> Result<Self, SmallError> {
        if fields.len() != scheme.num_fields() {
            return Err(SmallError::illegal_argument(&format!(
                "expected {} fields, got {}",
                scheme.num_fields(),
                fields.len()
            )));
        }
        for (i, field) in fields.iter().enumerate() {
            if field.field_type() != scheme.field_type(i) {
                return Err(SmallError::illegal_argument(&format!(
                    "field {} type mismatch: schema wants {}, got {}",
                    i,
                    scheme.field_type(i),
                    field.field_type()
                )));
            }
        }
        Ok(Self {
            scheme,
            fields,
            record_id: None,
        })
    }

    pub fn scheme(&self) -> &Arc<TupleDesc> {
        &self.scheme
    }

    pub fn field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.scheme.size());
        for field in &self.fields {
            out.extend_from_slice(&field.to_bytes());
        }
        out
    }

    pub fn from_bytes(scheme: Arc<TupleDesc>, bytes: &[u8]) -> Self {
        let mut fields = Vec::with_capacity(scheme.num_fields());
        let mut offset = 0;
        for i in 0..scheme.num_fields() {
            let t = scheme.field_type(i);
            let width = t.size();
            fields.push(Field::from_bytes(t, &bytes[offset..offset + width]));
            offset += width;
        }
        Self {
            scheme,
            fields,
            record_id: None,
        }
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.scheme == other.scheme && self.fields == other.fields
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self.fields.iter().map(|field| field.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    #[test]
    fn rejects_wrong_arity() {
        let scheme = Arc::new(TupleDesc::simple_ints(2, "f"));
        let err = Tuple::new(scheme, vec![Field::Int(1)]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::IllegalArgument);
    }

    #[test]
    fn round_trips_through_bytes() {
        let scheme = Arc::new(TupleDesc::simple_ints(2, "f"));
        let t = Tuple::new(scheme.clone(), vec![Field::Int(1), Field::Int(2)]).unwrap();
        let bytes = t.to_bytes();
        let t2 = Tuple::from_bytes(scheme, &bytes);
        assert_eq!(t, t2);
    }
}
