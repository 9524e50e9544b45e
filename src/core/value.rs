use serde::{Deserialize, Serialize};
use chrono::{NaiveDate, NaiveDateTime, DateTime, Utc};
use uuid::Uuid;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::str::FromStr;

use super::params::ParamBag;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    #[default]
    Null,
    // Numeric types
    Integer(i64),
    Real(f64),
    Numeric(Decimal),
    Text(String),
    Boolean(bool),
    // Date/Time types
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Bytea(Vec<u8>),
    // Request shapes: collections for foreach, nested objects for dotted paths
    List(Vec<Value>),
    Object(ParamBag),
}

/// Declared type of a mapped member or constructor argument
///
/// Used as the key of the type-handler registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Integer,
    Real,
    Numeric,
    Text,
    Boolean,
    Date,
    Timestamp,
    TimestampTz,
    Uuid,
    Bytea,
    List,
    Object,
    Any,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_object(&self) -> Option<&ParamBag> {
        match self {
            Self::Object(bag) => Some(bag),
            _ => None,
        }
    }

    /// Name of the variant, used in conversion errors
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "Integer",
            Self::Real(_) => "Real",
            Self::Numeric(_) => "Numeric",
            Self::Text(_) => "Text",
            Self::Boolean(_) => "Boolean",
            Self::Date(_) => "Date",
            Self::Timestamp(_) => "Timestamp",
            Self::TimestampTz(_) => "TimestampTz",
            Self::Uuid(_) => "Uuid",
            Self::Bytea(_) => "Bytea",
            Self::List(_) => "List",
            Self::Object(_) => "Object",
        }
    }

    /// Truthiness used by bare test expressions: NULL, false and '' are false
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Text(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Empty means NULL, an empty string or an empty collection
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Object(bag) => bag.is_empty(),
            Self::Bytea(b) => b.is_empty(),
            _ => false,
        }
    }

    /// Build a value from any serializable request object
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::from)
    }

    /// Plain JSON form; temporal and binary values become strings
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Real(r) => serde_json::Value::from(*r),
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(bag) => serde_json::Value::Object(
                bag.iter().map(|(k, v)| (k.to_string(), v.to_json())).collect(),
            ),
            other => serde_json::Value::String(other.to_string()),
        }
    }

    /// Convert into `kind`; returns the offending variant name on failure
    pub fn coerce(self, kind: ValueKind) -> Result<Self, &'static str> {
        if self.is_null() || kind == ValueKind::Any {
            return Ok(self);
        }
        let found = self.type_name();
        let converted = match (kind, self) {
            (ValueKind::Integer, v @ Self::Integer(_)) => Some(v),
            (ValueKind::Integer, Self::Real(r)) if r.fract() == 0.0 => Some(Self::Integer(r as i64)),
            (ValueKind::Integer, Self::Numeric(d)) if d.fract().is_zero() => d.to_i64().map(Self::Integer),
            (ValueKind::Integer, Self::Boolean(b)) => Some(Self::Integer(i64::from(b))),
            (ValueKind::Integer, Self::Text(s)) => s.trim().parse().ok().map(Self::Integer),

            (ValueKind::Real, v @ Self::Real(_)) => Some(v),
            (ValueKind::Real, Self::Integer(i)) => Some(Self::Real(i as f64)),
            (ValueKind::Real, Self::Numeric(d)) => d.to_f64().map(Self::Real),
            (ValueKind::Real, Self::Text(s)) => s.trim().parse().ok().map(Self::Real),

            (ValueKind::Numeric, v @ Self::Numeric(_)) => Some(v),
            (ValueKind::Numeric, Self::Integer(i)) => Some(Self::Numeric(Decimal::from(i))),
            (ValueKind::Numeric, Self::Real(r)) => Decimal::from_f64(r).map(Self::Numeric),
            (ValueKind::Numeric, Self::Text(s)) => Decimal::from_str(s.trim()).ok().map(Self::Numeric),

            (ValueKind::Text, v @ Self::Text(_)) => Some(v),
            (ValueKind::Text, v @ (Self::List(_) | Self::Object(_))) => Some(Self::Text(v.to_json().to_string())),
            (ValueKind::Text, v) => Some(Self::Text(v.to_string())),

            (ValueKind::Boolean, v @ Self::Boolean(_)) => Some(v),
            (ValueKind::Boolean, Self::Integer(i)) => Some(Self::Boolean(i != 0)),
            (ValueKind::Boolean, Self::Text(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "t" | "1" => Some(Self::Boolean(true)),
                "false" | "f" | "0" => Some(Self::Boolean(false)),
                _ => None,
            },

            (ValueKind::Date, v @ Self::Date(_)) => Some(v),
            (ValueKind::Date, Self::Timestamp(t)) => Some(Self::Date(t.date())),
            (ValueKind::Date, Self::Text(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok().map(Self::Date),

            (ValueKind::Timestamp, v @ Self::Timestamp(_)) => Some(v),
            (ValueKind::Timestamp, Self::TimestampTz(t)) => Some(Self::Timestamp(t.naive_utc())),
            (ValueKind::Timestamp, Self::Text(s)) => {
                NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S").ok().map(Self::Timestamp)
            }

            (ValueKind::TimestampTz, v @ Self::TimestampTz(_)) => Some(v),
            (ValueKind::TimestampTz, Self::Timestamp(t)) => Some(Self::TimestampTz(t.and_utc())),
            (ValueKind::TimestampTz, Self::Text(s)) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|t| Self::TimestampTz(t.with_timezone(&Utc))),

            (ValueKind::Uuid, v @ Self::Uuid(_)) => Some(v),
            (ValueKind::Uuid, Self::Text(s)) => Uuid::parse_str(s.trim()).ok().map(Self::Uuid),

            (ValueKind::Bytea, v @ Self::Bytea(_)) => Some(v),
            (ValueKind::Bytea, Self::Text(s)) => Some(Self::Bytea(s.into_bytes())),

            (ValueKind::List, v @ Self::List(_)) => Some(v),
            (ValueKind::Object, v @ Self::Object(_)) => Some(v),
            _ => None,
        };
        converted.ok_or(found)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Numeric(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
            Self::TimestampTz(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S %Z")),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Bytea(b) => write!(f, "\\x{}", hex::encode(b)),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Object(bag) => {
                write!(f, "{{")?;
                for (i, (key, value)) in bag.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Real))
                .unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(map) => {
                let mut bag = ParamBag::new();
                for (key, value) in map {
                    bag.insert(key, Self::from(value));
                }
                Self::Object(bag)
            }
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    i64 => Integer,
    i32 => Integer,
    i16 => Integer,
    u32 => Integer,
    f64 => Real,
    f32 => Real,
    bool => Boolean,
    String => Text,
    Decimal => Numeric,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    Uuid => Uuid,
    ParamBag => Object,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}
