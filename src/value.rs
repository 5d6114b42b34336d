use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};

/// A single table cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Path(Utf8PathBuf),
}

impl Value {
    /// Null, or a float that is NaN.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(value) => value.is_nan(),
            _ => false,
        }
    }

    /// Null or an empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Text(value) => value.is_empty(),
            other => other.is_null(),
        }
    }

    /// Collapses all representations of a missing value into [`Value::Null`].
    pub fn canonical(self) -> Value {
        if self.is_null() { Value::Null } else { self }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            Value::Path(path) => Some(path.as_str()),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Utf8Path> {
        match self {
            Value::Text(value) if !value.is_empty() => Some(Utf8Path::new(value)),
            Value::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Text representation as written to sample tables; null renders empty.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(value) => value.clone(),
            Value::Integer(value) => value.to_string(),
            Value::Float(value) if value.is_nan() => String::new(),
            Value::Float(value) => value.to_string(),
            Value::Path(path) => path.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NA"),
            other => f.write_str(&other.render()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Utf8PathBuf> for Value {
    fn from(value: Utf8PathBuf) -> Self {
        Value::Path(value)
    }
}

impl From<&Utf8Path> for Value {
    fn from(value: &Utf8Path) -> Self {
        Value::Path(value.to_path_buf())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A sample field before tabulation: either one cell or a fixed-size tuple
/// that is later spread over `{name}_1 .. {name}_k` columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Scalar(Value),
    Tuple(Vec<Value>),
}

impl Field {
    pub fn null() -> Self {
        Field::Scalar(Value::Null)
    }

    pub fn pair(first: impl Into<Value>, second: impl Into<Value>) -> Self {
        Field::Tuple(vec![first.into(), second.into()])
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Field::Scalar(value) => Some(value),
            Field::Tuple(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Scalar(value) if value.is_null())
    }
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        Field::Scalar(value)
    }
}
