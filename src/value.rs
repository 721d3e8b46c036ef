use std::{
    fmt::{self, Display, Formatter},
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid as UUID;

use crate::Node;

/// A borrowed view of a single field value.
///
/// Values never own the data they point at, the caller keeps the object graph alive for the duration of a write.
#[derive(Clone)]
pub enum Value<'a> {
    Null,
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Boolean(bool),
    Text(&'a str),
    Path(&'a Path),
    ObjectId(UUID),
    Time(NaiveDateTime),
    UtcTime(DateTime<Utc>),
    Node(&'a dyn Node),
    Sequence(Vec<&'a dyn Node>),
}

impl<'a> Value<'a> {
    /// Wraps an optional nested node.
    pub fn node<N: Node>(value: Option<&'a N>) -> Self {
        match value {
            Some(node) => Value::Node(node),
            None => Value::Null,
        }
    }

    /// Collects a slice of nodes into a sequence value.
    pub fn sequence<N: Node>(values: &'a [N]) -> Self {
        Value::Sequence(values.iter().map(|node| node as &dyn Node).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value as a file path if it can name one.
    pub fn as_path(&self) -> Option<&'a Path> {
        match self {
            Value::Path(path) => Some(*path),
            Value::Text(text) => Some(Path::new(*text)),
            _ => None,
        }
    }

    /// Returns the name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Unsigned(_) => "unsigned",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Text(_) => "text",
            Value::Path(_) => "path",
            Value::ObjectId(_) => "uuid",
            Value::Time(_) | Value::UtcTime(_) => "time",
            Value::Node(_) => "node",
            Value::Sequence(_) => "sequence",
        }
    }
}

impl Display for Value<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(value) => write!(f, "{}", value),
            Value::Unsigned(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Text(value) => f.write_str(value),
            Value::Path(value) => write!(f, "{}", value.display()),
            Value::ObjectId(value) => write!(f, "{}", value.hyphenated()),
            Value::Time(value) => write!(f, "{}", value.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::UtcTime(value) => f.write_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Node(_) | Value::Sequence(_) => Ok(()),
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Node(_) | Value::Sequence(_) => write!(f, "Value::{}", self.kind()),
            _ => write!(f, "Value::{}({})", self.kind(), self),
        }
    }
}

macro_rules! declare_value {
    ($qualifier:ty, $value:path, $cast:ty) => {
        impl<'a> From<&'a $qualifier> for Value<'a> {
            fn from(value: &'a $qualifier) -> Self {
                $value(*value as $cast)
            }
        }

        declare_value!($qualifier);
    };
    ($qualifier:ty, $value:path) => {
        impl<'a> From<&'a $qualifier> for Value<'a> {
            fn from(value: &'a $qualifier) -> Self {
                $value(*value)
            }
        }

        declare_value!($qualifier);
    };
    ($qualifier:ty) => {
        impl<'a> From<&'a Option<$qualifier>> for Value<'a> {
            fn from(value: &'a Option<$qualifier>) -> Self {
                match value {
                    Some(value) => Value::from(value),
                    None => Value::Null,
                }
            }
        }
    };
}

declare_value!(i8, Value::Integer, i64);
declare_value!(i16, Value::Integer, i64);
declare_value!(i32, Value::Integer, i64);
declare_value!(i64, Value::Integer, i64);
declare_value!(u8, Value::Unsigned, u64);
declare_value!(u16, Value::Unsigned, u64);
declare_value!(u32, Value::Unsigned, u64);
declare_value!(u64, Value::Unsigned, u64);
declare_value!(usize, Value::Unsigned, u64);
declare_value!(f32, Value::Float, f64);
declare_value!(f64, Value::Float, f64);
declare_value!(bool, Value::Boolean);
declare_value!(UUID, Value::ObjectId);
declare_value!(NaiveDateTime, Value::Time);
declare_value!(DateTime<Utc>, Value::UtcTime);

impl<'a> From<&'a String> for Value<'a> {
    fn from(value: &'a String) -> Self {
        Value::Text(value)
    }
}

impl<'a> From<&'a &str> for Value<'a> {
    fn from(value: &'a &str) -> Self {
        Value::Text(value)
    }
}

impl<'a> From<&'a PathBuf> for Value<'a> {
    fn from(value: &'a PathBuf) -> Self {
        Value::Path(value)
    }
}

declare_value!(String);
declare_value!(&str);
declare_value!(PathBuf);
