//! Column types and values.
//!
//! [`Type`] is the closed set of column kinds a replicated table may declare.
//! [`Value`] is a single decoded column value, and [`compare_values`] is the
//! three-way comparator predicates are evaluated with. [`IndexKey`] is the
//! hashable form of a value used to key the indexed-column lookup.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;

/// SQL type codes as reported by the upstream schema service.
///
/// These are the JDBC `java.sql.Types` constants, which is what the catalog
/// hands over on the wire.
pub mod sql_code {
    pub const BIGINT: i32 = -5;
    pub const DATE: i32 = 91;
    pub const DOUBLE: i32 = 8;
    pub const FLOAT: i32 = 6;
    pub const NUMERIC: i32 = 2;
    pub const REAL: i32 = 7;
    pub const INTEGER: i32 = 4;
    pub const VARCHAR: i32 = 12;
    pub const LONGVARCHAR: i32 = -1;
}

/// Length in bytes of an encoded date (`YYYY-MM-DD`).
pub const DATE_TEXT_LEN: usize = 10;

/// Text format used for dates on the wire and in text output.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column data type.
///
/// `Double` covers the DOUBLE, FLOAT and NUMERIC codes, which all travel as
/// an 8-byte IEEE-754 double. The two text variants share an encoding and
/// differ only in the declared width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// 8-byte signed integer.
    Bigint,
    /// Calendar date, encoded as 10 bytes of `YYYY-MM-DD` text.
    Date,
    /// Double-precision float.
    Double,
    /// Single-precision float.
    Real,
    /// 4-byte signed integer. Also the type of the trailing row id.
    Integer,
    /// Variable-length UTF-8 text.
    Varchar,
    /// Variable-length UTF-8 text, long variant.
    LongVarchar,
}

impl Type {
    /// Converts an upstream SQL type code into a [`Type`].
    ///
    /// Returns `None` for codes this store cannot decode.
    pub const fn from_sql_code(code: i32) -> Option<Self> {
        match code {
            sql_code::BIGINT => Some(Type::Bigint),
            sql_code::DATE => Some(Type::Date),
            sql_code::DOUBLE | sql_code::FLOAT | sql_code::NUMERIC => Some(Type::Double),
            sql_code::REAL => Some(Type::Real),
            sql_code::INTEGER => Some(Type::Integer),
            sql_code::VARCHAR => Some(Type::Varchar),
            sql_code::LONGVARCHAR => Some(Type::LongVarchar),
            _ => None,
        }
    }

    /// Returns the canonical SQL type code for this type.
    pub const fn sql_code(self) -> i32 {
        match self {
            Type::Bigint => sql_code::BIGINT,
            Type::Date => sql_code::DATE,
            Type::Double => sql_code::DOUBLE,
            Type::Real => sql_code::REAL,
            Type::Integer => sql_code::INTEGER,
            Type::Varchar => sql_code::VARCHAR,
            Type::LongVarchar => sql_code::LONGVARCHAR,
        }
    }

    /// Parses a lower-case SQL type name (`"bigint"`, `"varchar"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bigint" | "int8" => Some(Type::Bigint),
            "date" => Some(Type::Date),
            "double" | "float" | "numeric" | "float8" => Some(Type::Double),
            "real" | "float4" => Some(Type::Real),
            "int" | "integer" | "int4" => Some(Type::Integer),
            "varchar" | "text" => Some(Type::Varchar),
            "longvarchar" => Some(Type::LongVarchar),
            _ => None,
        }
    }

    /// Returns the fixed encoded size, or `None` for length-prefixed types.
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Type::Bigint | Type::Double => Some(8),
            Type::Real | Type::Integer => Some(4),
            Type::Date => Some(DATE_TEXT_LEN),
            Type::Varchar | Type::LongVarchar => None,
        }
    }

    /// Returns true if a value of `value`'s kind may be stored in this column.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (Type::Bigint, Value::Int64(_))
                | (Type::Date, Value::Date(_))
                | (Type::Double, Value::Float64(_))
                | (Type::Real, Value::Float32(_))
                | (Type::Integer, Value::Int32(_))
                | (Type::Varchar | Type::LongVarchar, Value::Text(_))
        )
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Bigint => "bigint",
            Type::Date => "date",
            Type::Double => "double",
            Type::Real => "real",
            Type::Integer => "integer",
            Type::Varchar => "varchar",
            Type::LongVarchar => "longvarchar",
        };
        write!(f, "{}", name)
    }
}

/// A typed, nullable column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int64(i64),
    Date(NaiveDate),
    Float64(f64),
    Float32(f32),
    Int32(i32),
    Text(String),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the natural type of this value, or `None` for Null.
    pub fn data_type(&self) -> Option<Type> {
        match self {
            Value::Null => None,
            Value::Int64(_) => Some(Type::Bigint),
            Value::Date(_) => Some(Type::Date),
            Value::Float64(_) => Some(Type::Double),
            Value::Float32(_) => Some(Type::Real),
            Value::Int32(_) => Some(Type::Integer),
            Value::Text(_) => Some(Type::Varchar),
        }
    }

    /// Returns the value as an `i64` if it is an integer of either width.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(n) => Some(*n),
            Value::Int32(n) => Some(i64::from(*n)),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(n) => Some(*n as f64),
            Value::Int32(n) => Some(f64::from(*n)),
            Value::Float64(n) => Some(*n),
            Value::Float32(n) => Some(f64::from(*n)),
            _ => None,
        }
    }

    /// Converts the value to the representation `ty` stores, if it can be
    /// done without loss.
    ///
    /// Assignment literals arrive with whatever width the statement used;
    /// this lets a BIGINT literal be written into an INTEGER column when it
    /// fits, and a `YYYY-MM-DD` text literal into a DATE column.
    pub fn coerce_to(&self, ty: Type) -> Option<Value> {
        if ty.accepts(self) {
            return Some(self.clone());
        }
        match (ty, self) {
            (Type::Bigint, Value::Int32(n)) => Some(Value::Int64(i64::from(*n))),
            (Type::Integer, Value::Int64(n)) => i32::try_from(*n).ok().map(Value::Int32),
            (Type::Double, Value::Float32(n)) => Some(Value::Float64(f64::from(*n))),
            (Type::Double, Value::Int32(n)) => Some(Value::Float64(f64::from(*n))),
            (Type::Double, Value::Int64(n)) => {
                let widened = *n as f64;
                (compare_int_float(*n, widened) == Ordering::Equal)
                    .then_some(Value::Float64(widened))
            }
            (Type::Real, Value::Float64(n)) => {
                let narrowed = *n as f32;
                (f64::from(narrowed) == *n).then_some(Value::Float32(narrowed))
            }
            (Type::Real, Value::Int32(n)) => {
                let widened = *n as f32;
                (f64::from(widened) == f64::from(*n)).then_some(Value::Float32(widened))
            }
            (Type::Date, Value::Text(s)) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .map(Value::Date),
            _ => None,
        }
    }

    /// Renders the value in its natural text form.
    ///
    /// Null renders as the empty string; callers that need a substitute
    /// token check [`is_null`](Self::is_null) first.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int64(n) => n.to_string(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::Float64(n) => n.to_string(),
            Value::Float32(n) => n.to_string(),
            Value::Int32(n) => n.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            other => write!(f, "{}", other.to_text()),
        }
    }
}

/// Three-way comparison of two values.
///
/// Returns `None` when either side is NULL or the kinds are not comparable,
/// so a NULL is neither less than, equal to, nor greater than anything.
/// Integers of both widths and floats compare numerically. An integer is
/// compared to a float exactly, without rounding it to `f64` first; two
/// floats use the IEEE-754 total order so that the comparison is always
/// defined.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (a, b) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            (Some(x), None) => Some(compare_int_float(x, b.as_f64()?)),
            (None, Some(y)) => Some(compare_int_float(y, a.as_f64()?).reverse()),
            (None, None) => Some(a.as_f64()?.total_cmp(&b.as_f64()?)),
        },
    }
}

/// 2^63, the first float above every `i64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Exact comparison of an integer against a float.
fn compare_int_float(int: i64, float: f64) -> Ordering {
    if float.is_nan() {
        return (int as f64).total_cmp(&float);
    }
    if float >= I64_BOUND {
        return Ordering::Less;
    }
    if float < -I64_BOUND {
        return Ordering::Greater;
    }
    // In range, so the truncated float is exactly representable as i64.
    let whole = float.trunc();
    int.cmp(&(whole as i64)).then_with(|| {
        if float > whole {
            Ordering::Less
        } else if float < whole {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

/// Hashable equality key for the indexed-column lookup.
///
/// Numeric values that compare equal under [`compare_values`] produce the
/// same key, so a `BIGINT` literal finds rows whose column decoded as
/// either integer width, and an integral float finds the matching integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Int(i64),
    Float(u64),
    Date(NaiveDate),
    Text(String),
}

impl IndexKey {
    /// Derives the key for a value. NULL has no key.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Int64(n) => Some(IndexKey::Int(*n)),
            Value::Int32(n) => Some(IndexKey::Int(i64::from(*n))),
            Value::Float64(n) => Some(Self::from_float(*n)),
            Value::Float32(n) => Some(Self::from_float(f64::from(*n))),
            Value::Date(d) => Some(IndexKey::Date(*d)),
            Value::Text(s) => Some(IndexKey::Text(s.clone())),
        }
    }

    fn from_float(n: f64) -> Self {
        if n.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&n) {
            IndexKey::Int(n as i64)
        } else {
            IndexKey::Float(n.to_bits())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_code_roundtrip() {
        let types = [
            Type::Bigint,
            Type::Date,
            Type::Double,
            Type::Real,
            Type::Integer,
            Type::Varchar,
            Type::LongVarchar,
        ];
        for ty in types {
            assert_eq!(Type::from_sql_code(ty.sql_code()), Some(ty));
        }
    }

    #[test]
    fn test_double_aliases() {
        assert_eq!(Type::from_sql_code(sql_code::FLOAT), Some(Type::Double));
        assert_eq!(Type::from_sql_code(sql_code::NUMERIC), Some(Type::Double));
    }

    #[test]
    fn test_unknown_sql_code() {
        assert_eq!(Type::from_sql_code(16), None); // BOOLEAN
        assert_eq!(Type::from_sql_code(93), None); // TIMESTAMP
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Type::from_name("BIGINT"), Some(Type::Bigint));
        assert_eq!(Type::from_name(" int "), Some(Type::Integer));
        assert_eq!(Type::from_name("numeric"), Some(Type::Double));
        assert_eq!(Type::from_name("blob"), None);
    }

    #[test]
    fn test_accepts() {
        assert!(Type::Bigint.accepts(&Value::Int64(1)));
        assert!(Type::Bigint.accepts(&Value::Null));
        assert!(!Type::Bigint.accepts(&Value::Int32(1)));
        assert!(Type::LongVarchar.accepts(&Value::Text("x".into())));
        assert!(!Type::Date.accepts(&Value::Text("2024-01-01".into())));
    }

    #[test]
    fn test_compare_nulls() {
        assert_eq!(compare_values(&Value::Null, &Value::Null), None);
        assert_eq!(compare_values(&Value::Int32(1), &Value::Null), None);
        assert_eq!(compare_values(&Value::Null, &Value::Text("a".into())), None);
    }

    #[test]
    fn test_compare_numeric_widths() {
        assert_eq!(
            compare_values(&Value::Int32(7), &Value::Int64(7)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            compare_values(&Value::Int64(3), &Value::Float64(3.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_values(&Value::Float32(2.5), &Value::Float64(2.5)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_compare_int_float_is_exact() {
        let big = 9_007_199_254_740_993_i64; // 2^53 + 1
        assert_eq!(
            compare_values(&Value::Int64(big), &Value::Float64(9_007_199_254_740_992.0)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            compare_values(&Value::Float64(9_007_199_254_740_992.0), &Value::Int64(big)),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_values(&Value::Int64(i64::MAX), &Value::Float64(I64_BOUND)),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_values(&Value::Int64(i64::MIN), &Value::Float64(-I64_BOUND)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            compare_values(&Value::Int64(-3), &Value::Float64(-2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_values(&Value::Int32(-2), &Value::Float32(-2.5)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_equal_values_share_index_key() {
        let pairs = [
            (Value::Int64(9_007_199_254_740_993), Value::Float64(9_007_199_254_740_992.0)),
            (Value::Int64(9_007_199_254_740_992), Value::Float64(9_007_199_254_740_992.0)),
            (Value::Int64(i64::MIN), Value::Float64(-I64_BOUND)),
            (Value::Int64(i64::MAX), Value::Float64(I64_BOUND)),
            (Value::Int32(5), Value::Float32(5.0)),
            (Value::Int32(5), Value::Float64(5.5)),
        ];
        for (int, float) in pairs {
            let equal = compare_values(&int, &float) == Some(Ordering::Equal);
            let same_key = IndexKey::from_value(&int) == IndexKey::from_value(&float);
            assert_eq!(equal, same_key, "{:?} vs {:?}", int, float);
        }
    }

    #[test]
    fn test_compare_incomparable_kinds() {
        assert_eq!(compare_values(&Value::Int32(1), &Value::Text("1".into())), None);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(compare_values(&Value::Date(date), &Value::Int64(1)), None);
    }

    #[test]
    fn test_compare_dates_and_text() {
        let a = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            compare_values(&Value::Date(a), &Value::Date(b)),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_values(&Value::Text("b".into()), &Value::Text("a".into())),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_index_key_normalization() {
        assert_eq!(
            IndexKey::from_value(&Value::Int32(5)),
            IndexKey::from_value(&Value::Int64(5))
        );
        assert_eq!(
            IndexKey::from_value(&Value::Float64(5.0)),
            Some(IndexKey::Int(5))
        );
        assert!(matches!(
            IndexKey::from_value(&Value::Float64(5.5)),
            Some(IndexKey::Float(_))
        ));
        assert_eq!(IndexKey::from_value(&Value::Null), None);
    }

    #[test]
    fn test_coerce_to() {
        assert_eq!(Value::Int64(7).coerce_to(Type::Integer), Some(Value::Int32(7)));
        assert_eq!(Value::Int64(i64::MAX).coerce_to(Type::Integer), None);
        assert_eq!(Value::Int32(7).coerce_to(Type::Bigint), Some(Value::Int64(7)));
        assert_eq!(Value::Float64(0.5).coerce_to(Type::Real), Some(Value::Float32(0.5)));
        assert_eq!(Value::Float64(0.1).coerce_to(Type::Real), None);
        assert_eq!(
            Value::Text("2024-01-31".into()).coerce_to(Type::Date),
            Some(Value::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()))
        );
        assert_eq!(Value::Text("x".into()).coerce_to(Type::Bigint), None);
        assert_eq!(
            Value::Int32(16_777_216).coerce_to(Type::Real),
            Some(Value::Float32(16_777_216.0))
        );
        assert_eq!(Value::Int32(16_777_217).coerce_to(Type::Real), None);
        assert_eq!(
            Value::Int64(9_007_199_254_740_992).coerce_to(Type::Double),
            Some(Value::Float64(9_007_199_254_740_992.0))
        );
        assert_eq!(Value::Int64(9_007_199_254_740_993).coerce_to(Type::Double), None);
        assert_eq!(Value::Int64(i64::MAX).coerce_to(Type::Double), None);
        assert_eq!(Value::Null.coerce_to(Type::Date), Some(Value::Null));
    }

    #[test]
    fn test_to_text() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(Value::Date(date).to_text(), "2024-03-09");
        assert_eq!(Value::Int64(-42).to_text(), "-42");
        assert_eq!(Value::Float64(1.5).to_text(), "1.5");
        assert_eq!(Value::Text("abc".into()).to_text(), "abc");
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::Null.to_string(), "NULL");
    }
}
