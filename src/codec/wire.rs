//! codec/wire: byte layout of a `Value`.
//!
//! Payload:
//!   [magic "SVB1"][crc32 u32 LE over body][body]
//! Body: one tagged value, no trailing bytes.
//!   0x00 unit
//!   0x01 bool     [u8]
//!   0x02 u64      [u64 LE]
//!   0x03 i64      [i64 LE]
//!   0x04 f64      [u64 LE bits]
//!   0x05 char     [u32 LE]
//!   0x06 str      [len u32 LE][utf-8]
//!   0x07 bytes    [len u32 LE][raw]
//!   0x08 none
//!   0x09 some     [value]
//!   0x0A seq      [count u32 LE][value]*
//!   0x0B map      [count u32 LE]([key][value])*
//!   0x0C record   [count u32 LE]([field u32 LE][value])*
//!   0x0D variant  [index u32 LE][value]

use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher as Crc32;

use crate::consts::{PAYLOAD_HDR_SIZE, PAYLOAD_MAGIC};

use super::{CodecError, Value};

pub const MAX_DEPTH: usize = 128;

const TAG_UNIT: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_U64: u8 = 0x02;
const TAG_I64: u8 = 0x03;
const TAG_F64: u8 = 0x04;
const TAG_CHAR: u8 = 0x05;
const TAG_STR: u8 = 0x06;
const TAG_BYTES: u8 = 0x07;
const TAG_NONE: u8 = 0x08;
const TAG_SOME: u8 = 0x09;
const TAG_SEQ: u8 = 0x0A;
const TAG_MAP: u8 = 0x0B;
const TAG_RECORD: u8 = 0x0C;
const TAG_VARIANT: u8 = 0x0D;

/// Encode a value into a complete payload (magic + crc + body).
pub fn encode_value(v: &Value) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(PAYLOAD_MAGIC);
    out.extend_from_slice(&[0u8; 4]);
    write_value(v, &mut out, 0)?;

    let mut h = Crc32::new();
    h.update(&out[PAYLOAD_HDR_SIZE..]);
    let crc = h.finalize();
    LittleEndian::write_u32(&mut out[4..8], crc);
    Ok(out)
}

/// Decode a complete payload. Validates magic, checksum and exact length.
pub fn decode_value(bytes: &[u8]) -> Result<Value, CodecError> {
    if bytes.len() < PAYLOAD_HDR_SIZE {
        return Err(CodecError::Eof(bytes.len()));
    }
    if &bytes[..4] != PAYLOAD_MAGIC {
        return Err(CodecError::BadMagic);
    }
    let stored = LittleEndian::read_u32(&bytes[4..8]);
    let body = &bytes[PAYLOAD_HDR_SIZE..];
    let mut h = Crc32::new();
    h.update(body);
    let computed = h.finalize();
    if stored != computed {
        return Err(CodecError::Checksum { stored, computed });
    }

    let mut r = Reader {
        buf: body,
        pos: 0,
    };
    let v = r.value(0)?;
    let rest = body.len() - r.pos;
    if rest != 0 {
        return Err(CodecError::Trailing(rest));
    }
    Ok(v)
}

/// Body bytes only (no header). Used to order map keys canonically.
pub(crate) fn encode_body(v: &Value, out: &mut Vec<u8>) -> Result<(), CodecError> {
    write_value(v, out, 0)
}

fn put_u32(out: &mut Vec<u8>, n: u32) {
    let mut b = [0u8; 4];
    LittleEndian::write_u32(&mut b, n);
    out.extend_from_slice(&b);
}

fn put_u64(out: &mut Vec<u8>, n: u64) {
    let mut b = [0u8; 8];
    LittleEndian::write_u64(&mut b, n);
    out.extend_from_slice(&b);
}

fn put_len(out: &mut Vec<u8>, what: &'static str, len: usize) -> Result<(), CodecError> {
    let n = u32::try_from(len).map_err(|_| CodecError::TooLarge { what, len })?;
    put_u32(out, n);
    Ok(())
}

fn write_value(v: &Value, out: &mut Vec<u8>, depth: usize) -> Result<(), CodecError> {
    if depth > MAX_DEPTH {
        return Err(CodecError::TooDeep(MAX_DEPTH));
    }
    match v {
        Value::Unit => out.push(TAG_UNIT),
        Value::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(*b as u8);
        }
        Value::U64(n) => {
            out.push(TAG_U64);
            put_u64(out, *n);
        }
        Value::I64(n) => {
            out.push(TAG_I64);
            put_u64(out, *n as u64);
        }
        Value::F64(f) => {
            out.push(TAG_F64);
            put_u64(out, f.to_bits());
        }
        Value::Char(c) => {
            out.push(TAG_CHAR);
            put_u32(out, *c as u32);
        }
        Value::Str(s) => {
            out.push(TAG_STR);
            put_len(out, "string", s.len())?;
            out.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            out.push(TAG_BYTES);
            put_len(out, "byte string", b.len())?;
            out.extend_from_slice(b);
        }
        Value::None => out.push(TAG_NONE),
        Value::Some(inner) => {
            out.push(TAG_SOME);
            write_value(inner, out, depth + 1)?;
        }
        Value::Seq(items) => {
            out.push(TAG_SEQ);
            put_len(out, "sequence", items.len())?;
            for it in items {
                write_value(it, out, depth + 1)?;
            }
        }
        Value::Map(entries) => {
            out.push(TAG_MAP);
            put_len(out, "map", entries.len())?;
            for (k, val) in entries {
                write_value(k, out, depth + 1)?;
                write_value(val, out, depth + 1)?;
            }
        }
        Value::Record(fields) => {
            out.push(TAG_RECORD);
            put_len(out, "record", fields.len())?;
            for (idx, val) in fields {
                put_u32(out, *idx);
                write_value(val, out, depth + 1)?;
            }
        }
        Value::Variant(idx, payload) => {
            out.push(TAG_VARIANT);
            put_u32(out, *idx);
            write_value(payload, out, depth + 1)?;
        }
    }
    Ok(())
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|e| *e <= self.buf.len())
            .ok_or(CodecError::Eof(self.pos))?;
        let s = &self.buf[self.pos..end];
        self.pos = end;
        Ok(s)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    fn u64(&mut self) -> Result<u64, CodecError> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// Element count, rejected early if it cannot possibly fit in what is left
    /// (every element needs at least one byte).
    fn count(&mut self, what: &'static str) -> Result<usize, CodecError> {
        let n = self.u32()? as usize;
        if n > self.buf.len() - self.pos {
            return Err(CodecError::TooLarge { what, len: n });
        }
        Ok(n)
    }

    fn value(&mut self, depth: usize) -> Result<Value, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::TooDeep(MAX_DEPTH));
        }
        let at = self.pos;
        let tag = self.u8()?;
        let v = match tag {
            TAG_UNIT => Value::Unit,
            TAG_BOOL => match self.u8()? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => return Err(CodecError::BadTag { tag: other, pos: self.pos - 1 }),
            },
            TAG_U64 => Value::U64(self.u64()?),
            TAG_I64 => Value::I64(self.u64()? as i64),
            TAG_F64 => Value::F64(f64::from_bits(self.u64()?)),
            TAG_CHAR => {
                let c = self.u32()?;
                Value::Char(char::from_u32(c).ok_or(CodecError::BadChar(c))?)
            }
            TAG_STR => {
                let n = self.u32()? as usize;
                let start = self.pos;
                let raw = self.take(n)?;
                let s = std::str::from_utf8(raw).map_err(|_| CodecError::Utf8(start))?;
                Value::Str(s.to_owned())
            }
            TAG_BYTES => {
                let n = self.u32()? as usize;
                Value::Bytes(self.take(n)?.to_vec())
            }
            TAG_NONE => Value::None,
            TAG_SOME => Value::Some(Box::new(self.value(depth + 1)?)),
            TAG_SEQ => {
                let n = self.count("sequence")?;
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(self.value(depth + 1)?);
                }
                Value::Seq(items)
            }
            TAG_MAP => {
                let n = self.count("map")?;
                let mut entries = Vec::with_capacity(n);
                for _ in 0..n {
                    let k = self.value(depth + 1)?;
                    let v = self.value(depth + 1)?;
                    entries.push((k, v));
                }
                Value::Map(entries)
            }
            TAG_RECORD => {
                let n = self.count("record")?;
                let mut fields = Vec::with_capacity(n);
                for _ in 0..n {
                    let idx = self.u32()?;
                    fields.push((idx, self.value(depth + 1)?));
                }
                Value::Record(fields)
            }
            TAG_VARIANT => {
                let idx = self.u32()?;
                Value::Variant(idx, Box::new(self.value(depth + 1)?))
            }
            other => return Err(CodecError::BadTag { tag: other, pos: at }),
        };
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        Value::Record(vec![
            (0, Value::Str("Hi World".into())),
            (1, Value::U64(55)),
            (2, Value::Seq(vec![Value::I64(-1), Value::F64(2.5), Value::Char('ж')])),
            (
                3,
                Value::Map(vec![(Value::Str("a".into()), Value::Some(Box::new(Value::Unit)))]),
            ),
            (4, Value::Variant(2, Box::new(Value::Bytes(vec![0, 1, 2])))),
            (5, Value::None),
            (6, Value::Bool(true)),
        ])
    }

    #[test]
    fn payload_layout_and_roundtrip() {
        let bytes = encode_value(&sample()).unwrap();
        assert_eq!(&bytes[..4], PAYLOAD_MAGIC);
        assert_eq!(bytes[PAYLOAD_HDR_SIZE], TAG_RECORD);
        assert_eq!(decode_value(&bytes).unwrap(), sample());
        // deterministic
        assert_eq!(encode_value(&sample()).unwrap(), bytes);
    }

    #[test]
    fn corruption_is_detected() {
        let bytes = encode_value(&sample()).unwrap();

        let mut bad = bytes.clone();
        bad[0] = b'X';
        assert_eq!(decode_value(&bad), Err(CodecError::BadMagic));

        let mut flipped = bytes.clone();
        let last = flipped.len() - 1;
        flipped[last] ^= 0xFF;
        assert!(matches!(
            decode_value(&flipped),
            Err(CodecError::Checksum { .. })
        ));

        assert!(decode_value(&bytes[..bytes.len() - 1]).is_err());
        assert!(matches!(decode_value(b"SV"), Err(CodecError::Eof(_))));
    }

    /// Re-seal a hand-built body with a valid header so the structural checks run.
    fn seal(body: &[u8]) -> Vec<u8> {
        let mut out = PAYLOAD_MAGIC.to_vec();
        let mut h = Crc32::new();
        h.update(body);
        let mut crc = [0u8; 4];
        LittleEndian::write_u32(&mut crc, h.finalize());
        out.extend_from_slice(&crc);
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn structural_errors() {
        assert_eq!(
            decode_value(&seal(&[TAG_UNIT, TAG_UNIT])),
            Err(CodecError::Trailing(1))
        );
        assert_eq!(
            decode_value(&seal(&[0x7F])),
            Err(CodecError::BadTag { tag: 0x7F, pos: 0 })
        );
        // sequence claiming far more elements than bytes remain
        assert!(matches!(
            decode_value(&seal(&[TAG_SEQ, 0xFF, 0xFF, 0xFF, 0x00])),
            Err(CodecError::TooLarge { .. })
        ));
        assert!(matches!(
            decode_value(&seal(&[TAG_STR, 2, 0, 0, 0, 0xC3, 0x28])),
            Err(CodecError::Utf8(_))
        ));

        let mut deep = vec![TAG_SOME; MAX_DEPTH + 2];
        deep.push(TAG_UNIT);
        assert_eq!(
            decode_value(&seal(&deep)),
            Err(CodecError::TooDeep(MAX_DEPTH))
        );
    }
}
