//! PostgreSQL type mappings.
//!
//! Rows come back from prepared statements in PostgreSQL's binary format and
//! are converted to JSON objects for tool responses.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the column type into a logical category
//! 2. A per-category decoder extracts the value
//!
//! Columns whose category is `Unknown` never reach the decoders: the executor
//! casts them to `text` in SQL first (see [`needs_text_cast`]). A non-null
//! value that still fails to decode is reported as `"<type name>"` so it can
//! not be mistaken for SQL NULL.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use ipnet::IpNet;
use serde_json::Value as JsonValue;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::{Oid, PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgHasArrayType, PgRow, PgTypeInfo, PgTypeKind, PgValueRef};
use sqlx::{Column, Decode, Postgres, Row, Type, TypeInfo, ValueRef};
use tracing::debug;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for PostgreSQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Money,
    Boolean,
    Text,
    Char,
    Binary,
    Json,
    Uuid,
    Oid,
    Network,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    TimeTz,
    Interval,
    Enum,
    Array,
    Unknown,
}

/// Element categories [`decode_array_col`] knows how to read.
const ARRAY_ELEMENT_CATEGORIES: [TypeCategory; 9] = [
    TypeCategory::Integer,
    TypeCategory::Float,
    TypeCategory::Decimal,
    TypeCategory::Boolean,
    TypeCategory::Text,
    TypeCategory::Uuid,
    TypeCategory::Date,
    TypeCategory::Timestamp,
    TypeCategory::TimestampTz,
];

/// Classify a column type, looking at its kind before its name.
pub fn categorize(type_info: &PgTypeInfo) -> TypeCategory {
    match type_info.kind() {
        PgTypeKind::Enum(_) => TypeCategory::Enum,
        PgTypeKind::Array(_) => TypeCategory::Array,
        _ => categorize_type(type_info.name()),
    }
}

/// Classify a PostgreSQL type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let upper = type_name.to_ascii_uppercase();

    match upper.as_str() {
        "INT2" | "INT4" | "INT8" | "SMALLINT" | "INTEGER" | "BIGINT" => TypeCategory::Integer,
        "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE PRECISION" => TypeCategory::Float,
        "NUMERIC" | "DECIMAL" => TypeCategory::Decimal,
        "MONEY" => TypeCategory::Money,
        "BOOL" | "BOOLEAN" => TypeCategory::Boolean,
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" | "UNKNOWN" => {
            TypeCategory::Text
        }
        "\"CHAR\"" => TypeCategory::Char,
        "BYTEA" => TypeCategory::Binary,
        "JSON" | "JSONB" => TypeCategory::Json,
        "UUID" => TypeCategory::Uuid,
        "OID" => TypeCategory::Oid,
        "INET" | "CIDR" => TypeCategory::Network,
        "TIMESTAMP" => TypeCategory::Timestamp,
        "TIMESTAMPTZ" => TypeCategory::TimestampTz,
        "DATE" => TypeCategory::Date,
        "TIME" => TypeCategory::Time,
        "TIMETZ" => TypeCategory::TimeTz,
        "INTERVAL" => TypeCategory::Interval,
        name if name.ends_with("[]") => TypeCategory::Array,
        _ => TypeCategory::Unknown,
    }
}

/// True when a column of this type has to be cast to `text` in SQL before it
/// can be returned: types with no decoder here (xml, aclitem, geometric,
/// ranges, domains, composites) and arrays of such types.
pub fn needs_text_cast(type_info: &PgTypeInfo) -> bool {
    match type_info.kind() {
        PgTypeKind::Array(element) => !ARRAY_ELEMENT_CATEGORIES.contains(&categorize(element)),
        _ => categorize(type_info) == TypeCategory::Unknown,
    }
}

// =============================================================================
// Rendering helpers
// =============================================================================

const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// NaN and the infinities, which `BigDecimal` cannot represent. Reads the
/// sign word of the binary NUMERIC header.
pub fn numeric_special_value(bytes: &[u8]) -> Option<&'static str> {
    let sign = u16::from_be_bytes([*bytes.get(4)?, *bytes.get(5)?]);
    match sign {
        NUMERIC_NAN => Some("NaN"),
        NUMERIC_PINF => Some("Infinity"),
        NUMERIC_NINF => Some("-Infinity"),
        _ => None,
    }
}

/// Render an interval the way PostgreSQL's default `IntervalStyle` does,
/// e.g. `1 year 2 mons 3 days 04:05:06.5`.
pub fn format_interval(interval: &PgInterval) -> String {
    let mut parts = Vec::new();
    push_unit(&mut parts, interval.months / 12, "year");
    push_unit(&mut parts, interval.months % 12, "mon");
    push_unit(&mut parts, interval.days, "day");

    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let micros = interval.microseconds.unsigned_abs();
        let secs = micros / 1_000_000;
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
        let frac = micros % 1_000_000;
        if frac != 0 {
            clock.push('.');
            clock.push_str(format!("{:06}", frac).trim_end_matches('0'));
        }
        parts.push(clock);
    }

    parts.join(" ")
}

fn push_unit(parts: &mut Vec<String>, n: i32, unit: &str) {
    if n != 0 {
        let plural = if n == 1 { "" } else { "s" };
        parts.push(format!("{} {}{}", n, unit, plural));
    }
}

/// `inet` host addresses print without their full-length prefix, like the
/// server's own text output. `cidr` always keeps it.
pub fn format_network(net: &IpNet, is_cidr: bool) -> String {
    if !is_cidr && net.prefix_len() == net.max_prefix_len() {
        net.addr().to_string()
    } else {
        net.to_string()
    }
}

/// NaN and infinities have no JSON number form.
fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// Stand-in for a non-null value that could not be decoded.
pub fn undecodable(type_info: &PgTypeInfo) -> JsonValue {
    JsonValue::String(format!("<{}>", type_info.name().to_ascii_lowercase()))
}

// =============================================================================
// Enum Support
// =============================================================================

/// Label of a user-defined enum value. Enum values travel as their label text
/// in both wire formats.
#[derive(Debug)]
pub struct RawEnumLabel(pub String);

impl Type<Postgres> for RawEnumLabel {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        matches!(ty.kind(), PgTypeKind::Enum(_))
    }
}

impl<'r> Decode<'r, Postgres> for RawEnumLabel {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as Decode<Postgres>>::decode(value)?;
        Ok(RawEnumLabel(s.to_string()))
    }
}

// =============================================================================
// Binary Encoding
// =============================================================================

/// Decode binary data to JSON value: UTF-8 text when valid, base64 otherwise.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue>;
}

impl RowToJson for PgRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let value = decode_column(self, idx, col.type_info());
                (col.name().to_string(), value)
            })
            .collect()
    }
}

// =============================================================================
// Decoders
// =============================================================================

fn decode_column(row: &PgRow, idx: usize, type_info: &PgTypeInfo) -> JsonValue {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return JsonValue::Null,
        Ok(_) => {}
        Err(e) => {
            debug!(column = idx, error = %e, "Column not readable");
            return undecodable(type_info);
        }
    }

    let value = match categorize(type_info) {
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Decimal => decode_decimal(row, idx),
        TypeCategory::Money => decode_with(row, idx, |v: PgMoney| {
            JsonValue::String(v.to_bigdecimal(2).to_string())
        }),
        TypeCategory::Boolean => decode_with(row, idx, JsonValue::Bool),
        TypeCategory::Text => decode_with(row, idx, JsonValue::String),
        TypeCategory::Char => decode_with(row, idx, |v: i8| {
            JsonValue::String(char::from(v as u8).to_string())
        }),
        TypeCategory::Binary => decode_with(row, idx, |v: Vec<u8>| decode_binary_value(&v)),
        TypeCategory::Json => decode_with(row, idx, |v: JsonValue| v),
        TypeCategory::Uuid => decode_with(row, idx, |v: uuid::Uuid| JsonValue::String(v.to_string())),
        TypeCategory::Oid => decode_with(row, idx, |v: Oid| JsonValue::Number(v.0.into())),
        TypeCategory::Network => {
            let is_cidr = type_info.name().eq_ignore_ascii_case("cidr");
            decode_with(row, idx, |v: IpNet| {
                JsonValue::String(format_network(&v, is_cidr))
            })
        }
        TypeCategory::Timestamp => decode_with(row, idx, render_timestamp),
        TypeCategory::TimestampTz => decode_with(row, idx, render_timestamptz),
        TypeCategory::Date => decode_with(row, idx, |v: NaiveDate| JsonValue::String(v.to_string())),
        TypeCategory::Time => decode_with(row, idx, |v: NaiveTime| JsonValue::String(v.to_string())),
        TypeCategory::TimeTz => decode_with(row, idx, |v: PgTimeTz<NaiveTime, FixedOffset>| {
            JsonValue::String(format!("{}{}", v.time, v.offset))
        }),
        TypeCategory::Interval => decode_with(row, idx, |v: PgInterval| {
            JsonValue::String(format_interval(&v))
        }),
        TypeCategory::Enum => decode_with(row, idx, |v: RawEnumLabel| JsonValue::String(v.0)),
        TypeCategory::Array => decode_array_col(row, idx, type_info),
        TypeCategory::Unknown => None,
    };

    value.unwrap_or_else(|| {
        debug!(column = idx, type_name = type_info.name(), "Column value not decodable");
        undecodable(type_info)
    })
}

/// Decode a non-null value as `T`. `None` when `T` does not match the column.
fn decode_with<T>(row: &PgRow, idx: usize, render: impl FnOnce(T) -> JsonValue) -> Option<JsonValue>
where
    T: for<'r> Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<T, _>(idx).ok().map(render)
}

fn render_timestamp(v: NaiveDateTime) -> JsonValue {
    JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

fn render_timestamptz(v: DateTime<Utc>) -> JsonValue {
    JsonValue::String(v.to_rfc3339())
}

fn render_decimal(v: BigDecimal) -> JsonValue {
    JsonValue::String(v.to_string())
}

fn decode_integer(row: &PgRow, idx: usize) -> Option<JsonValue> {
    decode_with(row, idx, |v: i16| JsonValue::Number(v.into()))
        .or_else(|| decode_with(row, idx, |v: i32| JsonValue::Number(v.into())))
        .or_else(|| decode_with(row, idx, |v: i64| JsonValue::Number(v.into())))
}

fn decode_float(row: &PgRow, idx: usize) -> Option<JsonValue> {
    decode_with(row, idx, float_value)
        .or_else(|| decode_with(row, idx, |v: f32| float_value(f64::from(v))))
}

fn decode_decimal(row: &PgRow, idx: usize) -> Option<JsonValue> {
    decode_with(row, idx, render_decimal).or_else(|| {
        let raw = row.try_get_raw(idx).ok()?;
        let bytes = <&[u8] as Decode<Postgres>>::decode(raw).ok()?;
        numeric_special_value(bytes).map(|s| JsonValue::String(s.to_string()))
    })
}

/// One-dimensional arrays of scalar types. `None` when `T` does not match.
fn decode_array<T>(row: &PgRow, idx: usize, render: impl Fn(T) -> JsonValue) -> Option<JsonValue>
where
    T: for<'r> Decode<'r, Postgres> + Type<Postgres> + PgHasArrayType,
{
    let items = row.try_get::<Vec<Option<T>>, _>(idx).ok()?;
    Some(JsonValue::Array(
        items
            .into_iter()
            .map(|item| item.map(&render).unwrap_or(JsonValue::Null))
            .collect(),
    ))
}

fn decode_array_col(row: &PgRow, idx: usize, type_info: &PgTypeInfo) -> Option<JsonValue> {
    let element = match type_info.kind() {
        PgTypeKind::Array(element) => categorize(element),
        _ => TypeCategory::Unknown,
    };

    match element {
        TypeCategory::Integer => decode_array(row, idx, |v: i64| JsonValue::Number(v.into()))
            .or_else(|| decode_array(row, idx, |v: i32| JsonValue::Number(v.into())))
            .or_else(|| decode_array(row, idx, |v: i16| JsonValue::Number(v.into()))),
        TypeCategory::Float => decode_array(row, idx, float_value)
            .or_else(|| decode_array(row, idx, |v: f32| float_value(f64::from(v)))),
        TypeCategory::Decimal => decode_array(row, idx, render_decimal),
        TypeCategory::Boolean => decode_array(row, idx, JsonValue::Bool),
        TypeCategory::Text => decode_array(row, idx, JsonValue::String),
        TypeCategory::Uuid => {
            decode_array(row, idx, |v: uuid::Uuid| JsonValue::String(v.to_string()))
        }
        TypeCategory::Date => decode_array(row, idx, |v: NaiveDate| JsonValue::String(v.to_string())),
        TypeCategory::Timestamp => decode_array(row, idx, render_timestamp),
        TypeCategory::TimestampTz => decode_array(row, idx, render_timestamptz),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(categorize_type("INT4"), TypeCategory::Integer);
        assert_eq!(categorize_type("int8"), TypeCategory::Integer);
        assert_eq!(categorize_type("INT2"), TypeCategory::Integer);
    }

    #[test]
    fn test_categorize_type_does_not_match_substrings() {
        // "POINT" contains "INT" but is not an integer.
        assert_eq!(categorize_type("POINT"), TypeCategory::Unknown);
        assert_eq!(categorize_type("INTERVAL"), TypeCategory::Interval);
    }

    #[test]
    fn test_categorize_type_temporal() {
        assert_eq!(categorize_type("TIMESTAMP"), TypeCategory::Timestamp);
        assert_eq!(categorize_type("TIMESTAMPTZ"), TypeCategory::TimestampTz);
        assert_eq!(categorize_type("DATE"), TypeCategory::Date);
        assert_eq!(categorize_type("TIME"), TypeCategory::Time);
        assert_eq!(categorize_type("TIMETZ"), TypeCategory::TimeTz);
    }

    #[test]
    fn test_categorize_type_misc() {
        assert_eq!(categorize_type("NUMERIC"), TypeCategory::Decimal);
        assert_eq!(categorize_type("MONEY"), TypeCategory::Money);
        assert_eq!(categorize_type("jsonb"), TypeCategory::Json);
        assert_eq!(categorize_type("UUID"), TypeCategory::Uuid);
        assert_eq!(categorize_type("BYTEA"), TypeCategory::Binary);
        assert_eq!(categorize_type("TEXT[]"), TypeCategory::Array);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("\"CHAR\""), TypeCategory::Char);
        assert_eq!(categorize_type("OID"), TypeCategory::Oid);
        assert_eq!(categorize_type("inet"), TypeCategory::Network);
        assert_eq!(categorize_type("aclitem"), TypeCategory::Unknown);
    }

    fn info<T: Type<Postgres>>() -> PgTypeInfo {
        T::type_info()
    }

    #[test]
    fn test_needs_text_cast() {
        use sqlx::postgres::types::{PgPoint, PgRange};

        assert!(!needs_text_cast(&info::<i32>()));
        assert!(!needs_text_cast(&info::<PgInterval>()));
        assert!(!needs_text_cast(&info::<Vec<BigDecimal>>()));
        assert!(!needs_text_cast(&info::<Vec<uuid::Uuid>>()));
        assert!(needs_text_cast(&info::<PgPoint>()));
        assert!(needs_text_cast(&info::<Vec<PgInterval>>()));
        assert!(needs_text_cast(&info::<PgRange<i32>>()));
    }

    #[test]
    fn test_numeric_special_values() {
        let header = |sign: u16| {
            let mut buf = vec![0, 0, 0, 0];
            buf.extend_from_slice(&sign.to_be_bytes());
            buf.extend_from_slice(&[0, 0]);
            buf
        };
        assert_eq!(numeric_special_value(&header(NUMERIC_NAN)), Some("NaN"));
        assert_eq!(numeric_special_value(&header(NUMERIC_PINF)), Some("Infinity"));
        assert_eq!(numeric_special_value(&header(NUMERIC_NINF)), Some("-Infinity"));
        assert_eq!(numeric_special_value(&header(0x4000)), None);
        assert_eq!(numeric_special_value(&[0, 1]), None);
    }

    #[test]
    fn test_format_interval() {
        let iv = |months, days, microseconds| PgInterval {
            months,
            days,
            microseconds,
        };
        assert_eq!(format_interval(&iv(0, 1, 0)), "1 day");
        assert_eq!(format_interval(&iv(0, 0, 0)), "00:00:00");
        assert_eq!(
            format_interval(&iv(14, 3, 4 * 3_600_000_000 + 5_500_000)),
            "1 year 2 mons 3 days 04:00:05.5"
        );
        assert_eq!(format_interval(&iv(0, -2, -90_000_000)), "-2 days -00:01:30");
    }

    #[test]
    fn test_format_network() {
        let host: IpNet = "10.0.0.1/32".parse().unwrap();
        let net: IpNet = "10.0.0.0/8".parse().unwrap();
        assert_eq!(format_network(&host, false), "10.0.0.1");
        assert_eq!(format_network(&host, true), "10.0.0.1/32");
        assert_eq!(format_network(&net, false), "10.0.0.0/8");
    }

    #[test]
    fn test_undecodable_marker() {
        assert_eq!(
            undecodable(&PgTypeInfo::with_name("tsvector")),
            JsonValue::String("<tsvector>".to_string())
        );
    }

    #[test]
    fn test_decode_binary_value_with_valid_utf8() {
        let result = decode_binary_value(b"hello world");
        assert_eq!(result, JsonValue::String("hello world".to_string()));
    }

    #[test]
    fn test_decode_binary_value_with_invalid_utf8() {
        let bytes: &[u8] = &[0xFF, 0xFE, 0x00, 0x01];
        let result = decode_binary_value(bytes);
        assert_eq!(result, JsonValue::String("//4AAQ==".to_string()));
    }

    #[test]
    fn test_float_value_non_finite() {
        assert_eq!(float_value(1.5), serde_json::json!(1.5));
        assert_eq!(float_value(f64::NAN), JsonValue::String("NaN".to_string()));
    }
}
