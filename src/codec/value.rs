//! Generic ordered-map form of an encoded value.

use serde::{Deserialize, Serialize};

/// Structural value tree. Field and variant identities are indexes, not names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Unit,
    Bool(bool),
    U64(u64),
    I64(i64),
    F64(f64),
    Char(char),
    Str(String),
    Bytes(Vec<u8>),
    None,
    Some(Box<Value>),
    Seq(Vec<Value>),
    /// Ordered key/value pairs.
    Map(Vec<(Value, Value)>),
    /// Struct fields: declaration index -> value, ascending.
    Record(Vec<(u32, Value)>),
    /// Enum variant index + payload (`Unit` for unit variants).
    Variant(u32, Box<Value>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::U64(_) => "u64",
            Value::I64(_) => "i64",
            Value::F64(_) => "f64",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::None => "none",
            Value::Some(_) => "some",
            Value::Seq(_) => "seq",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Variant(..) => "variant",
        }
    }

    /// Field `idx` of a record.
    pub fn field(&self, idx: u32) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.iter().find(|(i, _)| *i == idx).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, idx: u32) -> Option<&mut Value> {
        match self {
            Value::Record(fields) => fields
                .iter_mut()
                .find(|(i, _)| *i == idx)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Set (or insert, keeping index order) field `idx`. Returns the previous value.
    /// Returns Err(value) untouched if `self` is not a record.
    pub fn set_field(&mut self, idx: u32, value: Value) -> Result<Option<Value>, Value> {
        match self {
            Value::Record(fields) => match fields.binary_search_by_key(&idx, |(i, _)| *i) {
                Ok(pos) => Ok(Some(std::mem::replace(&mut fields[pos].1, value))),
                Err(pos) => {
                    fields.insert(pos, (idx, value));
                    Ok(None)
                }
            },
            _ => Err(value),
        }
    }

    /// Follow a dot-separated index path ("1", "0.2.1").
    /// Records are indexed by field, sequences by position, `Some` and variants are
    /// stepped through transparently.
    pub fn at_path(&self, path: &str) -> Option<&Value> {
        let mut cur = self;
        for seg in path_segments(path)? {
            cur = cur.unwrap_transparent();
            cur = match cur {
                Value::Record(fields) => fields.iter().find(|(i, _)| *i == seg).map(|(_, v)| v)?,
                Value::Seq(items) => items.get(seg as usize)?,
                _ => return None,
            };
        }
        Some(cur)
    }

    pub fn at_path_mut(&mut self, path: &str) -> Option<&mut Value> {
        let segs = path_segments(path)?;
        let mut cur = self;
        for seg in segs {
            cur = cur.unwrap_transparent_mut();
            cur = match cur {
                Value::Record(fields) => fields
                    .iter_mut()
                    .find(|(i, _)| *i == seg)
                    .map(|(_, v)| v)?,
                Value::Seq(items) => items.get_mut(seg as usize)?,
                _ => return None,
            };
        }
        Some(cur)
    }

    fn unwrap_transparent(&self) -> &Value {
        let mut cur = self;
        loop {
            match cur {
                Value::Some(inner) | Value::Variant(_, inner) => cur = inner,
                _ => return cur,
            }
        }
    }

    fn unwrap_transparent_mut(&mut self) -> &mut Value {
        match self {
            Value::Some(inner) | Value::Variant(_, inner) => inner.unwrap_transparent_mut(),
            other => other,
        }
    }
}

fn path_segments(path: &str) -> Option<Vec<u32>> {
    let path = path.trim();
    if path.is_empty() {
        return Some(Vec::new());
    }
    path.split('.').map(|s| s.trim().parse::<u32>().ok()).collect()
}
