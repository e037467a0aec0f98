//! serde Serializer producing a `Value`.
//!
//! - integers widen to U64/I64, f32 to F64;
//! - newtype structs are transparent, tuples/tuple structs become Seq;
//! - structs become Record with fields numbered in declaration order
//!   (skip_field advances the counter so indexes stay aligned);
//! - maps are sorted by encoded key bytes before they are returned.

use serde::ser::{self, Serialize};

use super::wire::encode_body;
use super::{CodecError, Value};

/// Convert any serde value into the generic `Value` form.
pub fn to_value<T: Serialize + ?Sized>(v: &T) -> Result<Value, CodecError> {
    v.serialize(ValueSerializer)
}

pub(crate) struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = CodecError;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeRecord;
    type SerializeStructVariant = SerializeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<Value, CodecError> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, CodecError> {
        Ok(Value::I64(v as i64))
    }
    fn serialize_i16(self, v: i16) -> Result<Value, CodecError> {
        Ok(Value::I64(v as i64))
    }
    fn serialize_i32(self, v: i32) -> Result<Value, CodecError> {
        Ok(Value::I64(v as i64))
    }
    fn serialize_i64(self, v: i64) -> Result<Value, CodecError> {
        Ok(Value::I64(v))
    }
    fn serialize_i128(self, v: i128) -> Result<Value, CodecError> {
        i64::try_from(v)
            .map(Value::I64)
            .map_err(|_| CodecError::Custom(format!("i128 {} does not fit in 64 bits", v)))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, CodecError> {
        Ok(Value::U64(v as u64))
    }
    fn serialize_u16(self, v: u16) -> Result<Value, CodecError> {
        Ok(Value::U64(v as u64))
    }
    fn serialize_u32(self, v: u32) -> Result<Value, CodecError> {
        Ok(Value::U64(v as u64))
    }
    fn serialize_u64(self, v: u64) -> Result<Value, CodecError> {
        Ok(Value::U64(v))
    }
    fn serialize_u128(self, v: u128) -> Result<Value, CodecError> {
        u64::try_from(v)
            .map(Value::U64)
            .map_err(|_| CodecError::Custom(format!("u128 {} does not fit in 64 bits", v)))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, CodecError> {
        Ok(Value::F64(v as f64))
    }
    fn serialize_f64(self, v: f64) -> Result<Value, CodecError> {
        Ok(Value::F64(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, CodecError> {
        Ok(Value::Char(v))
    }

    fn serialize_str(self, v: &str) -> Result<Value, CodecError> {
        Ok(Value::Str(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, CodecError> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<Value, CodecError> {
        Ok(Value::None)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value, CodecError> {
        Ok(Value::Some(Box::new(value.serialize(ValueSerializer)?)))
    }

    fn serialize_unit(self) -> Result<Value, CodecError> {
        Ok(Value::Unit)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, CodecError> {
        Ok(Value::Unit)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
    ) -> Result<Value, CodecError> {
        Ok(Value::Variant(variant_index, Box::new(Value::Unit)))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, CodecError> {
        value.serialize(ValueSerializer)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<Value, CodecError> {
        Ok(Value::Variant(
            variant_index,
            Box::new(value.serialize(ValueSerializer)?),
        ))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec, CodecError> {
        Ok(SerializeVec {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeVec, CodecError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SerializeVec, CodecError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        len: usize,
    ) -> Result<SerializeTupleVariant, CodecError> {
        Ok(SerializeTupleVariant {
            index: variant_index,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<SerializeMap, CodecError> {
        Ok(SerializeMap {
            entries: Vec::with_capacity(len.unwrap_or(0)),
            next_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SerializeRecord, CodecError> {
        Ok(SerializeRecord::with_capacity(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        len: usize,
    ) -> Result<SerializeStructVariant, CodecError> {
        Ok(SerializeStructVariant {
            index: variant_index,
            record: SerializeRecord::with_capacity(len),
        })
    }
}

pub(crate) struct SerializeVec {
    items: Vec<Value>,
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, CodecError> {
        Ok(Value::Seq(self.items))
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, CodecError> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, CodecError> {
        ser::SerializeSeq::end(self)
    }
}

pub(crate) struct SerializeTupleVariant {
    index: u32,
    items: Vec<Value>,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, CodecError> {
        Ok(Value::Variant(self.index, Box::new(Value::Seq(self.items))))
    }
}

pub(crate) struct SerializeMap {
    entries: Vec<(Value, Value)>,
    next_key: Option<Value>,
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), CodecError> {
        self.next_key = Some(key.serialize(ValueSerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| CodecError::Custom("map value without a key".to_string()))?;
        self.entries.push((key, value.serialize(ValueSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<Value, CodecError> {
        // Canonical order: by encoded key bytes. Iteration order of the source map is irrelevant.
        let mut keyed = Vec::with_capacity(self.entries.len());
        for (k, v) in self.entries {
            let mut kb = Vec::new();
            encode_body(&k, &mut kb)?;
            keyed.push((kb, k, v));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Value::Map(keyed.into_iter().map(|(_, k, v)| (k, v)).collect()))
    }
}

pub(crate) struct SerializeRecord {
    fields: Vec<(u32, Value)>,
    next_index: u32,
}

impl SerializeRecord {
    fn with_capacity(len: usize) -> Self {
        Self {
            fields: Vec::with_capacity(len),
            next_index: 0,
        }
    }

    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        let v = value.serialize(ValueSerializer)?;
        self.fields.push((self.next_index, v));
        self.next_index += 1;
        Ok(())
    }
}

impl ser::SerializeStruct for SerializeRecord {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        self.push(value)
    }

    fn skip_field(&mut self, _key: &'static str) -> Result<(), CodecError> {
        self.next_index += 1;
        Ok(())
    }

    fn end(self) -> Result<Value, CodecError> {
        Ok(Value::Record(self.fields))
    }
}

pub(crate) struct SerializeStructVariant {
    index: u32,
    record: SerializeRecord,
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        self.record.push(value)
    }

    fn skip_field(&mut self, _key: &'static str) -> Result<(), CodecError> {
        self.record.next_index += 1;
        Ok(())
    }

    fn end(self) -> Result<Value, CodecError> {
        Ok(Value::Variant(
            self.index,
            Box::new(Value::Record(self.record.fields)),
        ))
    }
}
