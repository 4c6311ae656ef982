//! Schema: an ordered sequence of `(Type, Option<name>)` pairs, shared by
//! every `Tuple` drawn from the same table or operator output.

use std::fmt;

use crate::error::SmallError;
use crate::field::Type;

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDesc {
    pub field_type: Type,
    pub name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TupleDesc {
    fields: Vec<FieldDesc>,
}

impl TupleDesc {
    /// `fields` must be non-empty; a schema with no fields can't size a
    /// page or address a slot.
    pub fn new(fields: Vec<FieldDesc>) -> Result<Self, SmallError> {
        if fields.is_empty() {
            return Err(SmallError::illegal_argument(
                "TupleDesc must have at least one field",
            ));
        }
        Ok(Self { fields })
    }

    pub fn simple_ints(count: usize, name_prefix: &str) -> Self {
        let fields = (0..count)
            .map(|i| FieldDesc {
                field_type: Type::Int,
                name: Some(format!("{}{}", name_prefix, i)),
            })
            .collect();
        Self { fields }
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn field_type(&self, i: usize) -> Type {
        self.fields[i].field_type
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.fields[i].name.as_deref()
    }

    /// Total serialized width of one tuple under this schema, in bytes.
    pub fn size(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.size()).sum()
    }

    pub fn index_of(&self, name: &str) -> Result<usize, SmallError> {
        self.fields
            .iter()
            .position(|f| f.name.as_deref() == Some(name))
            .ok_or_else(|| SmallError::no_such_element(&format!("no field named {}", name)))
    }

    /// Concatenates two schemas; arity of the result is the sum of the two
    /// inputs' arities.
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let mut fields = a.fields.clone();
        fields.extend(b.fields.clone());
        TupleDesc { fields }
    }
}

/// Schema equality ignores field names: same length, same types at every
/// index.
impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|field| match &field.name {
                Some(n) => format!("{}({})", n, field.field_type),
                None => format!("{}", field.field_type),
            })
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}
