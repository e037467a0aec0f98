//! serde Deserializer reading from an owned `Value`.

use serde::de::value::{U32Deserializer, U64Deserializer};
use serde::de::{self, DeserializeOwned, IntoDeserializer, Visitor};

use super::{CodecError, Value};

/// Rebuild a typed value from its generic form.
pub fn from_value<T: DeserializeOwned>(v: Value) -> Result<T, CodecError> {
    T::deserialize(ValueDeserializer(v))
}

pub(crate) struct ValueDeserializer(pub(crate) Value);

fn type_err(expected: &'static str, found: &Value) -> CodecError {
    CodecError::Type {
        expected,
        found: found.kind(),
    }
}

macro_rules! de_int {
    ($method:ident, $visit:ident, $ty:ty) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
            let v = match self.0 {
                Value::U64(n) => <$ty>::try_from(n).ok(),
                Value::I64(n) => <$ty>::try_from(n).ok(),
                other => return Err(type_err(stringify!($ty), &other)),
            };
            match v {
                Some(n) => visitor.$visit(n),
                None => Err(CodecError::Custom(format!(
                    "integer out of range for {}",
                    stringify!($ty)
                ))),
            }
        }
    };
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = CodecError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::Unit => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::U64(n) => visitor.visit_u64(n),
            Value::I64(n) => visitor.visit_i64(n),
            Value::F64(f) => visitor.visit_f64(f),
            Value::Char(c) => visitor.visit_char(c),
            Value::Str(s) => visitor.visit_string(s),
            Value::Bytes(b) => visitor.visit_byte_buf(b),
            Value::None => visitor.visit_none(),
            Value::Some(inner) => visitor.visit_some(ValueDeserializer(*inner)),
            Value::Seq(items) => visitor.visit_seq(SeqAccess::new(items)),
            Value::Map(entries) => visitor.visit_map(MapAccess::new(entries)),
            Value::Record(fields) => visitor.visit_map(RecordAccess::new(fields)),
            Value::Variant(idx, payload) => visitor.visit_enum(EnumAccess { idx, payload: *payload }),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::Bool(b) => visitor.visit_bool(b),
            other => Err(type_err("bool", &other)),
        }
    }

    de_int!(deserialize_i8, visit_i8, i8);
    de_int!(deserialize_i16, visit_i16, i16);
    de_int!(deserialize_i32, visit_i32, i32);
    de_int!(deserialize_i64, visit_i64, i64);
    de_int!(deserialize_u8, visit_u8, u8);
    de_int!(deserialize_u16, visit_u16, u16);
    de_int!(deserialize_u32, visit_u32, u32);
    de_int!(deserialize_u64, visit_u64, u64);

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::F64(f) => visitor.visit_f32(f as f32),
            other => Err(type_err("f32", &other)),
        }
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::F64(f) => visitor.visit_f64(f),
            other => Err(type_err("f64", &other)),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::Char(c) => visitor.visit_char(c),
            other => Err(type_err("char", &other)),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::Str(s) => visitor.visit_string(s),
            other => Err(type_err("string", &other)),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::Bytes(b) => visitor.visit_byte_buf(b),
            // Vec<u8> without serde_bytes serializes as a sequence of small integers
            Value::Seq(items) => {
                let mut out = Vec::with_capacity(items.len());
                for it in items {
                    match it {
                        Value::U64(n) if n <= u8::MAX as u64 => out.push(n as u8),
                        other => return Err(type_err("byte", &other)),
                    }
                }
                visitor.visit_byte_buf(out)
            }
            other => Err(type_err("bytes", &other)),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::None => visitor.visit_none(),
            Value::Some(inner) => visitor.visit_some(ValueDeserializer(*inner)),
            // tolerate a bare value where an option is now expected
            other => visitor.visit_some(ValueDeserializer(other)),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::Unit => visitor.visit_unit(),
            other => Err(type_err("unit", &other)),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::Seq(items) => visitor.visit_seq(SeqAccess::new(items)),
            Value::Bytes(b) => visitor.visit_seq(SeqAccess::new(
                b.into_iter().map(|x| Value::U64(x as u64)).collect(),
            )),
            other => Err(type_err("seq", &other)),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::Map(entries) => visitor.visit_map(MapAccess::new(entries)),
            other => Err(type_err("map", &other)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::Record(fields) => visitor.visit_map(RecordAccess::new(fields)),
            other => Err(type_err("record", &other)),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::Variant(idx, payload) => visitor.visit_enum(EnumAccess {
                idx,
                payload: *payload,
            }),
            other => Err(type_err("variant", &other)),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::U64(n) => visitor.visit_u64(n),
            Value::Str(s) => visitor.visit_string(s),
            other => Err(type_err("identifier", &other)),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        visitor.visit_unit()
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

struct SeqAccess {
    iter: std::vec::IntoIter<Value>,
}

impl SeqAccess {
    fn new(items: Vec<Value>) -> Self {
        Self {
            iter: items.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqAccess {
    type Error = CodecError;

    fn next_element_seed<T: de::DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, CodecError> {
        match self.iter.next() {
            Some(v) => seed.deserialize(ValueDeserializer(v)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapAccess {
    iter: std::vec::IntoIter<(Value, Value)>,
    pending: Option<Value>,
}

impl MapAccess {
    fn new(entries: Vec<(Value, Value)>) -> Self {
        Self {
            iter: entries.into_iter(),
            pending: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapAccess {
    type Error = CodecError;

    fn next_key_seed<K: de::DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, CodecError> {
        match self.iter.next() {
            Some((k, v)) => {
                self.pending = Some(v);
                seed.deserialize(ValueDeserializer(k)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: de::DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, CodecError> {
        let v = self
            .pending
            .take()
            .ok_or_else(|| CodecError::Custom("map value requested before key".to_string()))?;
        seed.deserialize(ValueDeserializer(v))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

/// Struct fields are presented as a map keyed by field index; the derived field visitor
/// accepts `visit_u64`, and unknown indexes land in its ignore arm.
struct RecordAccess {
    iter: std::vec::IntoIter<(u32, Value)>,
    pending: Option<Value>,
}

impl RecordAccess {
    fn new(fields: Vec<(u32, Value)>) -> Self {
        Self {
            iter: fields.into_iter(),
            pending: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for RecordAccess {
    type Error = CodecError;

    fn next_key_seed<K: de::DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, CodecError> {
        match self.iter.next() {
            Some((idx, v)) => {
                self.pending = Some(v);
                let key: U64Deserializer<CodecError> = (idx as u64).into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: de::DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, CodecError> {
        let v = self
            .pending
            .take()
            .ok_or_else(|| CodecError::Custom("field value requested before index".to_string()))?;
        seed.deserialize(ValueDeserializer(v))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct EnumAccess {
    idx: u32,
    payload: Value,
}

impl<'de> de::EnumAccess<'de> for EnumAccess {
    type Error = CodecError;
    type Variant = VariantAccess;

    fn variant_seed<V: de::DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, VariantAccess), CodecError> {
        let key: U32Deserializer<CodecError> = self.idx.into_deserializer();
        let v = seed.deserialize(key)?;
        Ok((v, VariantAccess(self.payload)))
    }
}

struct VariantAccess(Value);

impl<'de> de::VariantAccess<'de> for VariantAccess {
    type Error = CodecError;

    fn unit_variant(self) -> Result<(), CodecError> {
        match self.0 {
            Value::Unit => Ok(()),
            other => Err(type_err("unit variant", &other)),
        }
    }

    fn newtype_variant_seed<T: de::DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, CodecError> {
        seed.deserialize(ValueDeserializer(self.0))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::Seq(items) => visitor.visit_seq(SeqAccess::new(items)),
            other => Err(type_err("tuple variant", &other)),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        match self.0 {
            Value::Record(fields) => visitor.visit_map(RecordAccess::new(fields)),
            other => Err(type_err("struct variant", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::to_value;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Data {
        field_one: String,
        field_two: u64,
        tags: Vec<u8>,
        nested: Option<Box<Data>>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Op {
        Noop,
        Put(String, i32),
        Move { from: u16, to: u16 },
        Wrap(Meters),
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Meters(f32);

    #[test]
    fn typed_roundtrip_through_value() {
        let d = Data {
            field_one: "Hi World".into(),
            field_two: 55,
            tags: vec![1, 2, 255],
            nested: Some(Box::new(Data {
                field_one: String::new(),
                field_two: u64::MAX,
                tags: vec![],
                nested: None,
            })),
        };
        let back: Data = from_value(to_value(&d).unwrap()).unwrap();
        assert_eq!(back, d);

        let ops = vec![
            Op::Noop,
            Op::Put("k".into(), -3),
            Op::Move { from: 1, to: 9 },
            Op::Wrap(Meters(1.5)),
        ];
        let back: Vec<Op> = from_value(to_value(&ops).unwrap()).unwrap();
        assert_eq!(back, ops);

        let mut m = BTreeMap::new();
        m.insert(3u32, "c".to_string());
        m.insert(1u32, "a".to_string());
        let back: BTreeMap<u32, String> = from_value(to_value(&m).unwrap()).unwrap();
        assert_eq!(back, m);
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Narrow {
        field_one: String,
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Wider {
        field_one: String,
        field_two: u64,
        #[serde(default)]
        field_three: Option<u32>,
    }

    #[test]
    fn unknown_fields_are_ignored_and_missing_fields_reported() {
        let v = Value::Record(vec![(0, Value::Str("x".into())), (1, Value::U64(2))]);
        let n: Narrow = from_value(v.clone()).unwrap();
        assert_eq!(n.field_one, "x");

        let w: Wider = from_value(v).unwrap();
        assert_eq!(w.field_two, 2);
        assert_eq!(w.field_three, None);

        let short = Value::Record(vec![(0, Value::Str("x".into()))]);
        assert!(from_value::<Wider>(short).is_err());
    }

    #[test]
    fn type_mismatch_is_an_error() {
        assert!(matches!(
            from_value::<u8>(Value::U64(300)),
            Err(CodecError::Custom(_))
        ));
        assert!(matches!(
            from_value::<String>(Value::U64(1)),
            Err(CodecError::Type { .. })
        ));
    }
}
