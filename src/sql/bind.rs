//! Convert serde_json::Value to types that sqlx can bind.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::mysql::{MySql, MySqlTypeInfo};
use sqlx::Database;

/// A value that can be bound to a MySQL query. Converts from serde_json::Value.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
}

impl SqlParam {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => SqlParam::Null,
            Value::Bool(b) => SqlParam::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlParam::Int(i)
                } else {
                    SqlParam::Double(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => SqlParam::Text(s.clone()),
            // sequences belong to IN expansion; anything else binds as its
            // JSON text and the server coerces or rejects it
            Value::Array(_) | Value::Object(_) => SqlParam::Text(v.to_string()),
        }
    }
}

impl<'q> Encode<'q, MySql> for SqlParam {
    fn encode_by_ref(
        &self,
        buf: &mut <MySql as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            SqlParam::Null => <Option<i32> as Encode<MySql>>::encode_by_ref(&None, buf)?,
            SqlParam::Bool(b) => <bool as Encode<MySql>>::encode_by_ref(b, buf)?,
            SqlParam::Int(n) => <i64 as Encode<MySql>>::encode_by_ref(n, buf)?,
            SqlParam::Double(n) => <f64 as Encode<MySql>>::encode_by_ref(n, buf)?,
            SqlParam::Text(s) => {
                let s_ref: &str = s.as_str();
                <&str as Encode<MySql>>::encode_by_ref(&s_ref, buf)?
            }
        })
    }

    // the binary protocol carries a type per parameter, so each variant has
    // to advertise the type it actually encoded
    fn produces(&self) -> Option<MySqlTypeInfo> {
        Some(match self {
            SqlParam::Null | SqlParam::Text(_) => <str as sqlx::Type<MySql>>::type_info(),
            SqlParam::Bool(_) => <bool as sqlx::Type<MySql>>::type_info(),
            SqlParam::Int(_) => <i64 as sqlx::Type<MySql>>::type_info(),
            SqlParam::Double(_) => <f64 as sqlx::Type<MySql>>::type_info(),
        })
    }
}

impl sqlx::Type<MySql> for SqlParam {
    fn type_info() -> MySqlTypeInfo {
        <str as sqlx::Type<MySql>>::type_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_scalars_map_to_typed_params() {
        assert_eq!(SqlParam::from_json(&json!(null)), SqlParam::Null);
        assert_eq!(SqlParam::from_json(&json!(true)), SqlParam::Bool(true));
        assert_eq!(SqlParam::from_json(&json!(42)), SqlParam::Int(42));
        assert_eq!(SqlParam::from_json(&json!(1.5)), SqlParam::Double(1.5));
        assert_eq!(SqlParam::from_json(&json!("x")), SqlParam::Text("x".into()));
    }

    #[test]
    fn composite_values_bind_as_json_text() {
        assert_eq!(
            SqlParam::from_json(&json!({"a": 1})),
            SqlParam::Text(r#"{"a":1}"#.into())
        );
    }
}
