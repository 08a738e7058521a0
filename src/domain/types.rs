use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

/// Primary key type shared by every portfolio entity.
pub type RecordId = i64;

/// Isolated customer/site context. Every query and cache key is scoped by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct TenantId(i64);

impl TenantId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TenantId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else if value.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Err(())
        }
    }
}

/// Scalar type of a declared filter or writable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Bool,
    Text,
}

impl FieldKind {
    /// Coerce a raw request string into a typed value, `None` when malformed.
    pub fn coerce(self, raw: &str) -> Option<FieldValue> {
        let raw = raw.trim();
        match self {
            FieldKind::Int => raw.parse::<i64>().ok().map(FieldValue::Int),
            FieldKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(FieldValue::Bool(true)),
                "false" | "0" => Some(FieldValue::Bool(false)),
                _ => None,
            },
            FieldKind::Text => (!raw.is_empty()).then(|| FieldValue::Text(raw.to_string())),
        }
    }
}

/// Typed value bound into filters and changesets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Bool(bool),
    Float(f64),
    Text(String),
    Date(Date),
    Timestamp(OffsetDateTime),
    Null,
}

impl FieldValue {
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            FieldValue::Int(_) => Some(FieldKind::Int),
            FieldValue::Bool(_) => Some(FieldKind::Bool),
            FieldValue::Text(_) => Some(FieldKind::Text),
            FieldValue::Float(_)
            | FieldValue::Date(_)
            | FieldValue::Timestamp(_)
            | FieldValue::Null => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<Date> for FieldValue {
    fn from(value: Date) -> Self {
        FieldValue::Date(value)
    }
}

impl From<OffsetDateTime> for FieldValue {
    fn from(value: OffsetDateTime) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_drops_malformed_values() {
        assert_eq!(FieldKind::Int.coerce("42"), Some(FieldValue::Int(42)));
        assert_eq!(FieldKind::Int.coerce("forty-two"), None);
        assert_eq!(FieldKind::Bool.coerce("TRUE"), Some(FieldValue::Bool(true)));
        assert_eq!(FieldKind::Bool.coerce("0"), Some(FieldValue::Bool(false)));
        assert_eq!(FieldKind::Bool.coerce("yes"), None);
        assert_eq!(FieldKind::Text.coerce("   "), None);
        assert_eq!(
            FieldKind::Text.coerce(" es "),
            Some(FieldValue::Text("es".to_string()))
        );
    }

    #[test]
    fn sort_direction_parses_case_insensitively() {
        assert_eq!("asc".parse::<SortDirection>(), Ok(SortDirection::Asc));
        assert_eq!("DESC".parse::<SortDirection>(), Ok(SortDirection::Desc));
        assert!("sideways".parse::<SortDirection>().is_err());
    }

    #[test]
    fn field_values_serialize_untagged() {
        let json = serde_json::to_string(&vec![
            FieldValue::Int(3),
            FieldValue::Bool(true),
            FieldValue::Text("en".into()),
            FieldValue::Null,
        ])
        .expect("serialize values");
        assert_eq!(json, r#"[3,true,"en",null]"#);
    }
}
