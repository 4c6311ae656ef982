//! Closed field-type set and the tagged field value that carries a row's
//! data, plus the predicate operators used to compare two fields.

use std::fmt;

use crate::error::SmallError;

pub const STRING_LEN: usize = 128;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Type {
    Int,
    /// Fixed width: 4-byte big-endian length prefix + `STRING_LEN` bytes of
    /// zero-padded data.
    String,
}

impl Type {
    pub fn size(&self) -> usize {
        match self {
            Type::Int => 4,
            Type::String => 4 + STRING_LEN,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Int => write!(f, "INT"),
            Type::String => write!(f, "STRING"),
        }
    }
}

/// A predicate comparison operator. `Like` is substring match on strings
/// only; comparing a `Like` op against two `Int` fields is a caller error.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Field {
    Int(i32),
    Str(String),
}

impl Field {
    pub fn field_type(&self) -> Type {
        match self {
            Field::Int(_) => Type::Int,
            Field::Str(_) => Type::String,
        }
    }

    /// Serialize to the on-disk wire format for this field's type.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Field::Int(v) => v.to_be_bytes().to_vec(),
            Field::Str(s) => {
                let raw = s.as_bytes();
                let len = raw.len().min(STRING_LEN);
                let mut out = Vec::with_capacity(4 + STRING_LEN);
                out.extend_from_slice(&(len as u32).to_be_bytes());
                out.extend_from_slice(&raw[..len]);
                out.resize(4 + STRING_LEN, 0);
                out
            }
        }
    }

    pub fn from_bytes(t: Type, bytes: &[u8]) -> Self {
        match t {
            Type::Int => {
                let mut arr = [0u8; 4];
                arr.copy_from_slice(&bytes[0..4]);
                Field::Int(i32::from_be_bytes(arr))
            }
            Type::String => {
                let mut len_arr = [0u8; 4];
                len_arr.copy_from_slice(&bytes[0..4]);
                let len = u32::from_be_bytes(len_arr) as usize;
                let len = len.min(STRING_LEN);
                let data = &bytes[4..4 + len];
                Field::Str(String::from_utf8_lossy(data).into_owned())
            }
        }
    }

    /// Typed comparison against another field with a predicate op. Fails if
    /// the two fields are different types, or `op` is `Like` applied to a
    /// non-string pair.
    pub fn compare(&self, op: Op, other: &Field) -> Result<bool, SmallError> {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => Ok(match op {
                Op::Eq => a == b,
                Op::Ne => a != b,
                Op::Lt => a < b,
                Op::Le => a <= b,
                Op::Gt => a > b,
                Op::Ge => a >= b,
                Op::Like => {
                    return Err(SmallError::illegal_argument(
                        "LIKE is not defined over INT fields",
                    ))
                }
            }),
            (Field::Str(a), Field::Str(b)) => Ok(match op {
                Op::Eq => a == b,
                Op::Ne => a != b,
                Op::Lt => a < b,
                Op::Le => a <= b,
                Op::Gt => a > b,
                Op::Ge => a >= b,
                Op::Like => b.is_empty() || a.contains(b.as_str()),
            }),
            _ => Err(SmallError::illegal_argument(
                "cannot compare fields of different types",
            )),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}
