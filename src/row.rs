//! Row representation and the binary/text row codecs.
//!
//! A [`Row`] is one decoded table row: its column values in declared order
//! plus the trailing row id. [`RowCodec`] converts between rows and the
//! binary wire format, and renders rows as delimited text lines.
//!
//! # Wire Format
//!
//! Each row is a sequence of fields, one per declared column, followed by
//! the row id field:
//!
//! ```text
//! +-------------------+
//! | marker (1B)       |  0x00: value follows, 0x01: NULL (nothing follows)
//! +-------------------+
//! | payload           |  bigint/double: 8B, integer/real: 4B,
//! |                   |  date: 10B "YYYY-MM-DD",
//! |                   |  text: i32 length + UTF-8 bytes
//! +-------------------+
//! ```
//!
//! All multi-byte numbers are big-endian. The row id is always a non-null
//! 4-byte integer.

mod error;

pub use error::CodecError;

use bytes::{Buf, BufMut, BytesMut};
use chrono::NaiveDate;

use crate::catalog::Catalog;
use crate::datum::{Type, Value, DATE_FORMAT, DATE_TEXT_LEN};

/// Marker byte preceding a non-null value.
pub const PRESENT_MARKER: u8 = 0;

/// Marker byte standing in for a NULL value.
pub const NULL_MARKER: u8 = 1;

/// Returns `CodecError::BufferTooSmall` if fewer than `$required` bytes remain.
macro_rules! ensure_remaining {
    ($buf:expr, $required:expr) => {
        if $buf.remaining() < $required {
            return Err(CodecError::BufferTooSmall {
                required: $required,
                available: $buf.remaining(),
            });
        }
    };
}

/// A decoded table row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Column values in declared order.
    pub values: Vec<Value>,
    /// Monotonically increasing row identifier assigned by the base table.
    pub id: i32,
}

impl Row {
    /// Creates a new row.
    pub fn new(values: Vec<Value>, id: i32) -> Self {
        Self { values, id }
    }

    /// Returns the value at `index`, or `None` if out of range.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the number of declared columns (excluding the row id).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no declared columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Delimited text output settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFormat {
    /// Separator placed between fields.
    pub delimiter: String,
    /// Token written in place of a NULL value.
    pub null_token: String,
}

impl TextFormat {
    /// Creates a format from a delimiter and a NULL substitute token.
    pub fn new(delimiter: impl Into<String>, null_token: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            null_token: null_token.into(),
        }
    }
}

/// Encoder/decoder for rows of one table.
#[derive(Debug, Clone)]
pub struct RowCodec {
    /// Declared column types. The trailing row id is implicit.
    column_types: Vec<Type>,
}

impl RowCodec {
    /// Creates a codec for the given declared column types.
    ///
    /// `column_types` excludes the trailing row id column.
    pub fn new(column_types: Vec<Type>) -> Self {
        Self { column_types }
    }

    /// Creates a codec from a catalog's column types.
    ///
    /// The catalog reports one extra trailing type for the row id, which is
    /// dropped here.
    pub fn from_catalog(catalog: &dyn Catalog) -> Self {
        let mut types = catalog.column_types().to_vec();
        types.pop();
        Self::new(types)
    }

    /// Returns the declared column types.
    pub fn column_types(&self) -> &[Type] {
        &self.column_types
    }

    /// Returns true if `src` holds at least one more byte to decode.
    pub fn has_more(src: &impl Buf) -> bool {
        src.has_remaining()
    }

    /// Decodes one row from the front of `src`, advancing it past the row.
    pub fn decode(&self, src: &mut impl Buf) -> Result<Row, CodecError> {
        let mut values = Vec::with_capacity(self.column_types.len());
        for &ty in &self.column_types {
            values.push(decode_field(src, ty)?);
        }
        match decode_field(src, Type::Integer)? {
            Value::Int32(id) => Ok(Row::new(values, id)),
            _ => Err(CodecError::NullRowId),
        }
    }

    /// Encodes `row` in the binary wire format, appending to `dst`.
    ///
    /// Returns the number of bytes written. On error `dst` is truncated
    /// back to its length on entry, so rows already in it stay decodable.
    pub fn encode(&self, row: &Row, dst: &mut BytesMut) -> Result<usize, CodecError> {
        if row.values.len() != self.column_types.len() {
            return Err(CodecError::ColumnCountMismatch {
                expected: self.column_types.len(),
                found: row.values.len(),
            });
        }

        let start = dst.len();
        for (column, (value, &ty)) in row.values.iter().zip(&self.column_types).enumerate() {
            if let Err(e) = encode_field(dst, column, value, ty) {
                dst.truncate(start);
                return Err(e);
            }
        }
        dst.put_u8(PRESENT_MARKER);
        dst.put_i32(row.id);
        Ok(dst.len() - start)
    }

    /// Encodes `row` as one delimited text line, appending to `dst`.
    ///
    /// Every declared column and then the row id are written, separated by
    /// the format's delimiter, and followed by `terminator`. Returns the
    /// number of bytes written.
    pub fn encode_text(
        &self,
        row: &Row,
        format: &TextFormat,
        terminator: &str,
        dst: &mut BytesMut,
    ) -> usize {
        let start = dst.len();
        for value in &row.values {
            if value.is_null() {
                dst.put_slice(format.null_token.as_bytes());
            } else {
                dst.put_slice(value.to_text().as_bytes());
            }
            dst.put_slice(format.delimiter.as_bytes());
        }
        dst.put_slice(row.id.to_string().as_bytes());
        dst.put_slice(terminator.as_bytes());
        dst.len() - start
    }
}

fn decode_field(src: &mut impl Buf, ty: Type) -> Result<Value, CodecError> {
    ensure_remaining!(src, 1);
    match src.get_u8() {
        NULL_MARKER => return Ok(Value::Null),
        PRESENT_MARKER => {}
        other => return Err(CodecError::InvalidNullMarker(other)),
    }

    let value = match ty {
        Type::Bigint => {
            ensure_remaining!(src, 8);
            Value::Int64(src.get_i64())
        }
        Type::Date => {
            ensure_remaining!(src, DATE_TEXT_LEN);
            let text = String::from_utf8(src.copy_to_bytes(DATE_TEXT_LEN).to_vec())?;
            let date = NaiveDate::parse_from_str(&text, DATE_FORMAT)
                .map_err(|_| CodecError::InvalidDate(text))?;
            Value::Date(date)
        }
        Type::Double => {
            ensure_remaining!(src, 8);
            Value::Float64(src.get_f64())
        }
        Type::Real => {
            ensure_remaining!(src, 4);
            Value::Float32(src.get_f32())
        }
        Type::Integer => {
            ensure_remaining!(src, 4);
            Value::Int32(src.get_i32())
        }
        Type::Varchar | Type::LongVarchar => {
            ensure_remaining!(src, 4);
            let len = src.get_i32();
            if len < 0 {
                return Err(CodecError::NegativeLength(len));
            }
            let len = len as usize;
            ensure_remaining!(src, len);
            Value::Text(String::from_utf8(src.copy_to_bytes(len).to_vec())?)
        }
    };
    Ok(value)
}

fn encode_field(
    dst: &mut BytesMut,
    column: usize,
    value: &Value,
    ty: Type,
) -> Result<(), CodecError> {
    let mismatch = || CodecError::TypeMismatch {
        column,
        expected: ty,
        found: value.clone(),
    };

    if value.is_null() {
        dst.put_u8(NULL_MARKER);
        return Ok(());
    }
    let coerced = value.coerce_to(ty).ok_or_else(mismatch)?;

    // Validate fully before writing the marker.
    match (ty, &coerced) {
        (Type::Bigint, Value::Int64(n)) => {
            dst.put_u8(PRESENT_MARKER);
            dst.put_i64(*n);
        }
        (Type::Date, Value::Date(d)) => {
            let text = d.format(DATE_FORMAT).to_string();
            if text.len() != DATE_TEXT_LEN {
                return Err(CodecError::InvalidDate(text));
            }
            dst.put_u8(PRESENT_MARKER);
            dst.put_slice(text.as_bytes());
        }
        (Type::Double, Value::Float64(n)) => {
            dst.put_u8(PRESENT_MARKER);
            dst.put_f64(*n);
        }
        (Type::Real, Value::Float32(n)) => {
            dst.put_u8(PRESENT_MARKER);
            dst.put_f32(*n);
        }
        (Type::Integer, Value::Int32(n)) => {
            dst.put_u8(PRESENT_MARKER);
            dst.put_i32(*n);
        }
        (Type::Varchar | Type::LongVarchar, Value::Text(s)) => {
            let len = i32::try_from(s.len()).map_err(|_| mismatch())?;
            dst.put_u8(PRESENT_MARKER);
            dst.put_i32(len);
            dst.put_slice(s.as_bytes());
        }
        _ => return Err(mismatch()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_types() -> Vec<Type> {
        vec![
            Type::Bigint,
            Type::Date,
            Type::Double,
            Type::Real,
            Type::Integer,
            Type::Varchar,
            Type::LongVarchar,
        ]
    }

    fn sample_values() -> Vec<Value> {
        vec![
            Value::Int64(i64::MIN),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
            Value::Float64(std::f64::consts::PI),
            Value::Float32(-1.25),
            Value::Int32(i32::MAX),
            Value::Text("hello".to_string()),
            Value::Text("日本語🎉".to_string()),
        ]
    }

    fn roundtrip(codec: &RowCodec, row: &Row) -> Row {
        let mut buf = BytesMut::new();
        let written = codec.encode(row, &mut buf).unwrap();
        assert_eq!(written, buf.len());
        let mut src = buf.freeze();
        let parsed = codec.decode(&mut src).unwrap();
        assert!(!RowCodec::has_more(&src));
        parsed
    }

    #[test]
    fn test_roundtrip_all_types() {
        let codec = RowCodec::new(all_types());
        let row = Row::new(sample_values(), 17);
        assert_eq!(roundtrip(&codec, &row), row);
    }

    #[test]
    fn test_roundtrip_null_in_every_position() {
        let codec = RowCodec::new(all_types());
        for i in 0..all_types().len() {
            let mut values = sample_values();
            values[i] = Value::Null;
            let row = Row::new(values, i as i32);
            assert_eq!(roundtrip(&codec, &row), row);
        }
    }

    #[test]
    fn test_wire_layout() {
        let codec = RowCodec::new(vec![Type::Integer, Type::Varchar, Type::Bigint]);
        let row = Row::new(
            vec![Value::Int32(1), Value::Text("ab".into()), Value::Null],
            5,
        );
        let mut buf = BytesMut::new();
        codec.encode(&row, &mut buf).unwrap();
        assert_eq!(
            &buf[..],
            &[
                0, 0, 0, 0, 1, // integer 1
                0, 0, 0, 0, 2, b'a', b'b', // text "ab"
                1, // null bigint
                0, 0, 0, 0, 5, // row id
            ]
        );
    }

    #[test]
    fn test_date_wire_is_text() {
        let codec = RowCodec::new(vec![Type::Date]);
        let row = Row::new(
            vec![Value::Date(NaiveDate::from_ymd_opt(1999, 1, 2).unwrap())],
            1,
        );
        let mut buf = BytesMut::new();
        codec.encode(&row, &mut buf).unwrap();
        assert_eq!(&buf[1..11], b"1999-01-02");
    }

    #[test]
    fn test_decode_multiple_rows() {
        let codec = RowCodec::new(vec![Type::Bigint]);
        let mut buf = BytesMut::new();
        for id in 0..3 {
            let row = Row::new(vec![Value::Int64(i64::from(id) * 10)], id);
            codec.encode(&row, &mut buf).unwrap();
        }
        let mut src = buf.freeze();
        let mut ids = Vec::new();
        while RowCodec::has_more(&src) {
            ids.push(codec.decode(&mut src).unwrap().id);
        }
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_decode_truncated() {
        let codec = RowCodec::new(vec![Type::Bigint]);
        let mut src: &[u8] = &[0, 0, 0, 1];
        assert!(matches!(
            codec.decode(&mut src),
            Err(CodecError::BufferTooSmall {
                required: 8,
                available: 3
            })
        ));
    }

    #[test]
    fn test_decode_invalid_marker() {
        let codec = RowCodec::new(vec![Type::Integer]);
        let mut src: &[u8] = &[7, 0, 0, 0, 1];
        assert!(matches!(
            codec.decode(&mut src),
            Err(CodecError::InvalidNullMarker(7))
        ));
    }

    #[test]
    fn test_decode_null_row_id() {
        let codec = RowCodec::new(vec![]);
        let mut src: &[u8] = &[NULL_MARKER];
        assert!(matches!(codec.decode(&mut src), Err(CodecError::NullRowId)));
    }

    #[test]
    fn test_decode_negative_text_length() {
        let codec = RowCodec::new(vec![Type::Varchar]);
        let mut src: &[u8] = &[0, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(matches!(
            codec.decode(&mut src),
            Err(CodecError::NegativeLength(-1))
        ));
    }

    #[test]
    fn test_decode_invalid_date() {
        let codec = RowCodec::new(vec![Type::Date]);
        let mut src: &[u8] = b"\x002024-13-01\x00\x00\x00\x00\x01";
        assert!(matches!(
            codec.decode(&mut src),
            Err(CodecError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_encode_type_mismatch() {
        let codec = RowCodec::new(vec![Type::Bigint]);
        let row = Row::new(vec![Value::Text("1".into())], 1);
        let mut buf = BytesMut::new();
        assert!(matches!(
            codec.encode(&row, &mut buf),
            Err(CodecError::TypeMismatch { column: 0, .. })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_failed_encode_leaves_buffer_decodable() {
        let codec = RowCodec::new(vec![Type::Integer, Type::Bigint]);
        let good = Row::new(vec![Value::Int32(1), Value::Int64(2)], 1);
        let bad = Row::new(vec![Value::Int32(7), Value::Text("x".into())], 2);

        let mut buf = BytesMut::new();
        let len = codec.encode(&good, &mut buf).unwrap();
        assert!(codec.encode(&bad, &mut buf).is_err());
        assert_eq!(buf.len(), len);

        let mut src = buf.freeze();
        assert_eq!(codec.decode(&mut src).unwrap(), good);
        assert!(!RowCodec::has_more(&src));
    }

    #[test]
    fn test_encode_coerces_assignment_width() {
        let codec = RowCodec::new(vec![Type::Integer, Type::Date]);
        let row = Row::new(
            vec![Value::Int64(3), Value::Text("2021-07-04".into())],
            1,
        );
        let mut buf = BytesMut::new();
        codec.encode(&row, &mut buf).unwrap();
        let parsed = codec.decode(&mut buf.freeze()).unwrap();
        assert_eq!(
            parsed.values,
            vec![
                Value::Int32(3),
                Value::Date(NaiveDate::from_ymd_opt(2021, 7, 4).unwrap())
            ]
        );
    }

    #[test]
    fn test_encode_column_count_mismatch() {
        let codec = RowCodec::new(vec![Type::Bigint, Type::Integer]);
        let row = Row::new(vec![Value::Int64(1)], 1);
        let mut buf = BytesMut::new();
        assert!(matches!(
            codec.encode(&row, &mut buf),
            Err(CodecError::ColumnCountMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_encode_text() {
        let codec = RowCodec::new(vec![Type::Integer, Type::Varchar, Type::Date]);
        let row = Row::new(
            vec![
                Value::Int32(1),
                Value::Null,
                Value::Date(NaiveDate::from_ymd_opt(2020, 5, 17).unwrap()),
            ],
            9,
        );
        let mut buf = BytesMut::new();
        let written = codec.encode_text(&row, &TextFormat::new("|", "\\N"), "\n", &mut buf);
        assert_eq!(&buf[..], b"1|\\N|2020-05-17|9\n");
        assert_eq!(written, buf.len());
    }
}
