//! Row values.
//!
//! A row carries one [`RowValue`]: a closed set of primitive kinds plus an
//! opaque custom payload for anything else the call site needs to attach.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// The value bound to a row.
///
/// `Custom` values compare by identity, so two rows share a custom value only
/// if they hold clones of the same `Arc`.
#[derive(Clone)]
pub enum RowValue {
    /// On/off state of a toggle or switch.
    Bool(bool),
    /// Text content, or the value of a radio option.
    Text(String),
    /// A point in time, for date pickers.
    Date(DateTime<Utc>),
    /// Any other payload.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl RowValue {
    /// Wrap an arbitrary payload.
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Self::Custom(Arc::new(value))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Borrow a custom payload as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Custom(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for RowValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for RowValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Date(d) => f.debug_tuple("Date").field(d).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<bool> for RowValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<String> for RowValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for RowValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for RowValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

static_assertions::assert_impl_all!(RowValue: Send, Sync, Clone);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_accessors() {
        assert_eq!(RowValue::from(true).as_bool(), Some(true));
        assert_eq!(RowValue::from("wifi").as_text(), Some("wifi"));
        assert_eq!(RowValue::from(true).as_text(), None);

        let date = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(RowValue::from(date).as_date(), Some(date));
    }

    #[test]
    fn test_custom_compares_by_identity() {
        let a = RowValue::custom(42u32);
        let b = a.clone();
        let c = RowValue::custom(42u32);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.downcast_ref::<u32>(), Some(&42));
        assert_eq!(a.downcast_ref::<String>(), None);
    }

    #[test]
    fn test_mixed_kinds_are_unequal() {
        assert_ne!(RowValue::from("true"), RowValue::from(true));
        assert_eq!(format!("{:?}", RowValue::custom(())), "Custom(..)");
    }
}
