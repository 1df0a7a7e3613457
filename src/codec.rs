//! Column-value codec: maps driver values, keyed by database type name,
//! into the closed [`SqlValue`] variant set.

use crate::error::CodecError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use sqlx::mysql::{MySql, MySqlRow};
use sqlx::{Column, Decode, Row, TypeInfo, ValueRef};
use std::fmt;

/// A typed application-level value decoded from one result column.
///
/// A database NULL maps to `Null`, never to a zero value. Consumers match
/// exhaustively instead of downcasting.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Bit(u8),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Year(u16),
}

impl SqlValue {
    /// JSON rendition, used when a value is fed back into a filter or a
    /// field list (e.g. sub-result key propagation).
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Int(n) => Value::from(*n),
            SqlValue::BigInt(n) => Value::from(*n),
            SqlValue::Float(n) => serde_json::Number::from_f64(f64::from(*n))
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Double(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Text(s) => Value::from(s.clone()),
            SqlValue::Bit(b) => Value::from(*b),
            SqlValue::Date(d) => Value::from(d.format(DATE_LAYOUT).to_string()),
            SqlValue::DateTime(t) => Value::from(t.format(DATETIME_LAYOUT).to_string()),
            SqlValue::Time(t) => Value::from(t.format(TIME_LAYOUT).to_string()),
            SqlValue::Year(y) => Value::from(*y),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => Ok(()),
            SqlValue::Int(n) => write!(f, "{n}"),
            SqlValue::BigInt(n) => write!(f, "{n}"),
            SqlValue::Float(n) => write!(f, "{n}"),
            SqlValue::Double(n) => write!(f, "{n}"),
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::Bit(b) => write!(f, "{b}"),
            SqlValue::Date(d) => write!(f, "{}", d.format(DATE_LAYOUT)),
            SqlValue::DateTime(t) => write!(f, "{}", t.format(DATETIME_LAYOUT)),
            SqlValue::Time(t) => write!(f, "{}", t.format(TIME_LAYOUT)),
            SqlValue::Year(y) => write!(f, "{y}"),
        }
    }
}

pub const DATE_LAYOUT: &str = "%Y-%m-%d";
pub const DATETIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";
pub const TIME_LAYOUT: &str = "%H:%M:%S";

/// One materialized result row: parallel ordered column names and values.
///
/// Positional on purpose: joined queries can legally repeat a column name
/// and both occurrences must survive. `nested` carries the rows of any
/// sub-result relation resolved for this row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultRow {
    pub columns: Vec<String>,
    pub values: Vec<SqlValue>,
    pub nested: Vec<ResultRow>,
}

impl ResultRow {
    /// Index of the first column with this name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of the first column with this name.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.index_of(name).map(|i| &self.values[i])
    }

    /// Overwrite the first column with this name; returns false when the
    /// column is absent. Used by callers that scrub sensitive fields.
    pub fn set(&mut self, name: &str, value: SqlValue) -> bool {
        match self.index_of(name) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }
}

/// Decode a full driver row into a [`ResultRow`], column by column.
pub fn decode_row(row: &MySqlRow) -> Result<ResultRow, CodecError> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (i, col) in row.columns().iter().enumerate() {
        columns.push(col.name().to_string());
        let raw = row
            .try_get_raw(i)
            .map_err(|source| CodecError::Column { index: i, source })?;
        if raw.is_null() {
            values.push(SqlValue::Null);
            continue;
        }
        values.push(decode_column(row, i, col.type_info().name())?);
    }
    Ok(ResultRow {
        columns,
        values,
        nested: Vec::new(),
    })
}

fn decode_column(row: &MySqlRow, index: usize, type_name: &str) -> Result<SqlValue, CodecError> {
    let unsigned = type_name.ends_with(" UNSIGNED");
    let base = type_name.strip_suffix(" UNSIGNED").unwrap_or(type_name);
    let column = |source| CodecError::Column { index, source };
    let narrow = |literal: String| CodecError::Parse {
        type_name: type_name.to_string(),
        literal,
    };

    Ok(match base {
        "BOOLEAN" => SqlValue::Int(i32::from(row.try_get::<bool, _>(index).map_err(column)?)),
        "INT" | "TINYINT" | "SMALLINT" | "MEDIUMINT" => {
            let wide = decode_int(row, index, unsigned).map_err(column)?;
            SqlValue::Int(i32::try_from(wide).map_err(|_| narrow(wide.to_string()))?)
        }
        "BIGINT" => SqlValue::BigInt(decode_int(row, index, unsigned).map_err(column)?),
        "FLOAT" => SqlValue::Float(row.try_get::<f32, _>(index).map_err(column)?),
        "DOUBLE" => SqlValue::Double(row.try_get::<f64, _>(index).map_err(column)?),
        // DECIMAL travels as text on the wire; parse it like any other
        // literal so bad values fail loudly.
        "DECIMAL" => {
            let raw = row.try_get_raw(index).map_err(column)?;
            let text = <&str as Decode<MySql>>::decode(raw)
                .map_err(|e| column(sqlx::Error::Decode(e)))?;
            decode_literal("DECIMAL", Some(text))?
        }
        "CHAR" | "VARCHAR" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "TEXT" | "ENUM" | "JSON" => {
            SqlValue::Text(row.try_get::<String, _>(index).map_err(column)?)
        }
        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            let bytes = row.try_get::<Vec<u8>, _>(index).map_err(column)?;
            SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        "DATE" => SqlValue::Date(row.try_get::<NaiveDate, _>(index).map_err(column)?),
        "DATETIME" => SqlValue::DateTime(row.try_get::<NaiveDateTime, _>(index).map_err(column)?),
        "TIMESTAMP" => SqlValue::DateTime(
            row.try_get::<chrono::DateTime<chrono::Utc>, _>(index)
                .map_err(column)?
                .naive_utc(),
        ),
        "TIME" => SqlValue::Time(row.try_get::<NaiveTime, _>(index).map_err(column)?),
        "YEAR" => SqlValue::Year(row.try_get::<u16, _>(index).map_err(column)?),
        "BIT" => {
            let wide = row.try_get::<u64, _>(index).map_err(column)?;
            SqlValue::Bit((wide & 0xff) as u8)
        }
        other => return Err(CodecError::UnsupportedType(other.to_string())),
    })
}

fn decode_int(row: &MySqlRow, index: usize, unsigned: bool) -> Result<i64, sqlx::Error> {
    if unsigned {
        let v = row.try_get::<u64, _>(index)?;
        i64::try_from(v).map_err(|_| sqlx::Error::Decode(format!("unsigned value {v} overflows i64").into()))
    } else {
        row.try_get::<i64, _>(index)
    }
}

/// Decode a textual literal against its declared database type name.
///
/// This is the pure half of the codec: `None` is a database NULL, any
/// literal that does not parse against its declared type is a hard error,
/// never a silent default.
pub fn decode_literal(type_name: &str, literal: Option<&str>) -> Result<SqlValue, CodecError> {
    let Some(text) = literal else {
        return Ok(SqlValue::Null);
    };
    let parse_err = || CodecError::Parse {
        type_name: type_name.to_string(),
        literal: text.to_string(),
    };
    let base = type_name.strip_suffix(" UNSIGNED").unwrap_or(type_name);

    Ok(match base {
        "INT" | "TINYINT" | "SMALLINT" | "MEDIUMINT" => {
            SqlValue::Int(text.parse::<i32>().map_err(|_| parse_err())?)
        }
        "BIGINT" => SqlValue::BigInt(text.parse::<i64>().map_err(|_| parse_err())?),
        "FLOAT" | "DECIMAL" => SqlValue::Float(text.parse::<f32>().map_err(|_| parse_err())?),
        "DOUBLE" => SqlValue::Double(text.parse::<f64>().map_err(|_| parse_err())?),
        "CHAR" | "VARCHAR" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "TEXT" | "ENUM" | "JSON"
        | "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            SqlValue::Text(text.to_string())
        }
        "DATE" => SqlValue::Date(NaiveDate::parse_from_str(text, DATE_LAYOUT).map_err(|_| parse_err())?),
        "DATETIME" | "TIMESTAMP" => SqlValue::DateTime(
            NaiveDateTime::parse_from_str(text, DATETIME_LAYOUT).map_err(|_| parse_err())?,
        ),
        "TIME" => SqlValue::Time(NaiveTime::parse_from_str(text, TIME_LAYOUT).map_err(|_| parse_err())?),
        "YEAR" => SqlValue::Year(text.parse::<u16>().map_err(|_| parse_err())?),
        "BIT" => match text.as_bytes().first() {
            Some(b) => SqlValue::Bit(*b),
            None => return Err(parse_err()),
        },
        other => return Err(CodecError::UnsupportedType(other.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_maps_to_null_not_zero() {
        assert_eq!(decode_literal("INT", None).unwrap(), SqlValue::Null);
        assert_eq!(decode_literal("VARCHAR", None).unwrap(), SqlValue::Null);
    }

    #[test]
    fn integer_families() {
        assert_eq!(decode_literal("TINYINT", Some("7")).unwrap(), SqlValue::Int(7));
        assert_eq!(decode_literal("INT", Some("-42")).unwrap(), SqlValue::Int(-42));
        assert_eq!(
            decode_literal("BIGINT", Some("9000000000")).unwrap(),
            SqlValue::BigInt(9_000_000_000)
        );
    }

    #[test]
    fn int_overflow_is_a_hard_error() {
        assert!(matches!(
            decode_literal("INT", Some("9000000000")),
            Err(CodecError::Parse { .. })
        ));
    }

    #[test]
    fn float_families() {
        assert_eq!(decode_literal("FLOAT", Some("1.5")).unwrap(), SqlValue::Float(1.5));
        assert_eq!(decode_literal("DECIMAL", Some("2.25")).unwrap(), SqlValue::Float(2.25));
        assert_eq!(decode_literal("DOUBLE", Some("3.125")).unwrap(), SqlValue::Double(3.125));
    }

    #[test]
    fn text_families_pass_through() {
        assert_eq!(
            decode_literal("VARCHAR", Some("hello")).unwrap(),
            SqlValue::Text("hello".into())
        );
        assert_eq!(
            decode_literal("JSON", Some(r#"{"a":1}"#)).unwrap(),
            SqlValue::Text(r#"{"a":1}"#.into())
        );
    }

    #[test]
    fn temporal_layouts() {
        assert_eq!(
            decode_literal("DATE", Some("2024-03-01")).unwrap(),
            SqlValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
        assert_eq!(
            decode_literal("DATETIME", Some("2024-03-01 10:20:30")).unwrap(),
            SqlValue::DateTime(
                NaiveDate::from_ymd_opt(2024, 3, 1)
                    .unwrap()
                    .and_hms_opt(10, 20, 30)
                    .unwrap()
            )
        );
        assert_eq!(
            decode_literal("TIME", Some("10:20:30")).unwrap(),
            SqlValue::Time(NaiveTime::from_hms_opt(10, 20, 30).unwrap())
        );
        assert_eq!(decode_literal("YEAR", Some("1999")).unwrap(), SqlValue::Year(1999));
    }

    #[test]
    fn bad_temporal_literal_is_a_hard_error() {
        assert!(matches!(
            decode_literal("DATE", Some("03/01/2024")),
            Err(CodecError::Parse { .. })
        ));
        assert!(matches!(
            decode_literal("DATETIME", Some("2024-03-01")),
            Err(CodecError::Parse { .. })
        ));
    }

    #[test]
    fn bit_takes_first_raw_byte() {
        assert_eq!(decode_literal("BIT", Some("\x01")).unwrap(), SqlValue::Bit(1));
        assert!(matches!(decode_literal("BIT", Some("")), Err(CodecError::Parse { .. })));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(matches!(
            decode_literal("GEOMETRY", Some("x")),
            Err(CodecError::UnsupportedType(_))
        ));
    }

    #[test]
    fn unsigned_suffix_is_accepted() {
        assert_eq!(decode_literal("INT UNSIGNED", Some("7")).unwrap(), SqlValue::Int(7));
    }

    #[test]
    fn row_lookup_is_positional_first_match() {
        let row = ResultRow {
            columns: vec!["id".into(), "name".into(), "id".into()],
            values: vec![SqlValue::Int(1), SqlValue::Text("a".into()), SqlValue::Int(2)],
            nested: Vec::new(),
        };
        assert_eq!(row.index_of("id"), Some(0));
        assert_eq!(row.get("name"), Some(&SqlValue::Text("a".into())));
        assert_eq!(row.index_of("missing"), None);
    }

    #[test]
    fn row_set_overwrites_in_place() {
        let mut row = ResultRow {
            columns: vec!["password".into()],
            values: vec![SqlValue::Text("secret".into())],
            nested: Vec::new(),
        };
        assert!(row.set("password", SqlValue::Text(String::new())));
        assert_eq!(row.get("password"), Some(&SqlValue::Text(String::new())));
        assert!(!row.set("missing", SqlValue::Null));
    }

    #[test]
    fn json_rendition_round_trips_shapes() {
        assert_eq!(SqlValue::Int(5).to_json(), serde_json::json!(5));
        assert_eq!(SqlValue::Null.to_json(), serde_json::Value::Null);
        assert_eq!(
            SqlValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()).to_json(),
            serde_json::json!("2024-03-01")
        );
    }
}
