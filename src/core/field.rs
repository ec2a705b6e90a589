//! Structured field model
//!
//! A [`Field`] pairs a key with a tagged [`Value`]. Scalar values are stored
//! inline; list values borrow caller memory for the lifetime of the field (or
//! own an `Arc` copy when the field must outlive the call, as logger-attached
//! fields do). The same [`Value`] type is used for loosely-typed key/value
//! lists, where a flat slice is read two entries at a time.

use crate::core::encoder::{ArrayMarshaler, ObjectMarshaler};
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

/// Either a borrowed reference or shared ownership of a value.
pub enum Shared<'a, T: ?Sized + 'a> {
    Borrowed(&'a T),
    Owned(Arc<T>),
}

impl<T: ?Sized> Deref for Shared<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Shared::Borrowed(value) => value,
            Shared::Owned(value) => value,
        }
    }
}

impl<T: ?Sized> Clone for Shared<'_, T> {
    fn clone(&self) -> Self {
        match self {
            Shared::Borrowed(value) => Shared::Borrowed(value),
            Shared::Owned(value) => Shared::Owned(Arc::clone(value)),
        }
    }
}

/// A homogeneous list of strings in one of the shapes callers commonly hold.
#[derive(Clone)]
pub enum StrList<'a> {
    Strs(&'a [&'a str]),
    Strings(&'a [String]),
    Owned(Arc<[String]>),
}

impl StrList<'_> {
    /// Number of strings.
    pub fn len(&self) -> usize {
        match self {
            StrList::Strs(items) => items.len(),
            StrList::Strings(items) => items.len(),
            StrList::Owned(items) => items.len(),
        }
    }

    /// Whether the list holds no strings.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// String at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        match self {
            StrList::Strs(items) => items.get(index).copied(),
            StrList::Strings(items) => items.get(index).map(String::as_str),
            StrList::Owned(items) => items.get(index).map(String::as_str),
        }
    }

    /// Iterate over the strings in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index))
    }
}

/// Type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Int,
    Uint,
    Float,
    Bool,
    Error,
    Time,
    Duration,
    Any,
    Object,
    Array,
    Ints,
    Strings,
    Times,
}

/// Error values accepted by fields.
pub type DynError<'a> = dyn StdError + Send + Sync + 'a;

/// Values rendered through their `Debug` representation.
pub type DynDebug<'a> = dyn fmt::Debug + Send + Sync + 'a;

/// A tagged structured value.
#[derive(Clone)]
pub enum Value<'a> {
    Str(Cow<'a, str>),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Error(Shared<'a, DynError<'a>>),
    Time(DateTime<Utc>),
    Duration(Duration),
    Any(Shared<'a, DynDebug<'a>>),
    Object(Shared<'a, dyn ObjectMarshaler + 'a>),
    Array(Shared<'a, dyn ArrayMarshaler + 'a>),
    Ints(Cow<'a, [i64]>),
    Strs(StrList<'a>),
    Times(Cow<'a, [DateTime<Utc>]>),
}

impl Value<'_> {
    /// Type tag of this value.
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Str(_) => FieldKind::String,
            Value::Int(_) => FieldKind::Int,
            Value::Uint(_) => FieldKind::Uint,
            Value::Float(_) => FieldKind::Float,
            Value::Bool(_) => FieldKind::Bool,
            Value::Error(_) => FieldKind::Error,
            Value::Time(_) => FieldKind::Time,
            Value::Duration(_) => FieldKind::Duration,
            Value::Any(_) => FieldKind::Any,
            Value::Object(_) => FieldKind::Object,
            Value::Array(_) => FieldKind::Array,
            Value::Ints(_) => FieldKind::Ints,
            Value::Strs(_) => FieldKind::Strings,
            Value::Times(_) => FieldKind::Times,
        }
    }

    /// Borrowed string content, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Box an arbitrary value rendered through `Debug`. Always allocates.
    pub fn any<T: fmt::Debug + Send + Sync + 'static>(value: T) -> Value<'static> {
        Value::Any(Shared::Owned(Arc::new(value)))
    }

    /// Box an error, rendered through `Display`.
    pub fn error<E: StdError + Send + Sync + 'static>(err: E) -> Value<'static> {
        Value::Error(Shared::Owned(Arc::new(err)))
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Value::Uint(v) => f.debug_tuple("Uint").field(v).finish(),
            Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Error(err) => f.debug_tuple("Error").field(&err.to_string()).finish(),
            Value::Time(t) => f.debug_tuple("Time").field(t).finish(),
            Value::Duration(d) => f.debug_tuple("Duration").field(d).finish(),
            Value::Any(v) => f.debug_tuple("Any").field(&&**v).finish(),
            Value::Object(_) => f.write_str("Object(..)"),
            Value::Array(_) => f.write_str("Array(..)"),
            Value::Ints(v) => f.debug_tuple("Ints").field(v).finish(),
            Value::Strs(v) => f.debug_list().entries(v.iter()).finish(),
            Value::Times(v) => f.debug_tuple("Times").field(v).finish(),
        }
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(value: &'a str) -> Self {
        Value::Str(Cow::Borrowed(value))
    }
}

impl<'a> From<&'a String> for Value<'a> {
    fn from(value: &'a String) -> Self {
        Value::Str(Cow::Borrowed(value.as_str()))
    }
}

impl From<String> for Value<'static> {
    fn from(value: String) -> Self {
        Value::Str(Cow::Owned(value))
    }
}

impl<'a> From<Cow<'a, str>> for Value<'a> {
    fn from(value: Cow<'a, str>) -> Self {
        Value::Str(value)
    }
}

macro_rules! impl_from_signed {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Value<'_> {
            fn from(value: $ty) -> Self {
                Value::Int(value as i64)
            }
        }
    )*};
}

macro_rules! impl_from_unsigned {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Value<'_> {
            fn from(value: $ty) -> Self {
                Value::Uint(value as u64)
            }
        }
    )*};
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<f64> for Value<'_> {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<f32> for Value<'_> {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<bool> for Value<'_> {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<DateTime<Utc>> for Value<'_> {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Time(value)
    }
}

impl From<Duration> for Value<'_> {
    fn from(value: Duration) -> Self {
        Value::Duration(value)
    }
}

impl<'a> From<&'a [i64]> for Value<'a> {
    fn from(value: &'a [i64]) -> Self {
        Value::Ints(Cow::Borrowed(value))
    }
}

impl<'a> From<&'a [&'a str]> for Value<'a> {
    fn from(value: &'a [&'a str]) -> Self {
        Value::Strs(StrList::Strs(value))
    }
}

impl<'a> From<&'a [String]> for Value<'a> {
    fn from(value: &'a [String]) -> Self {
        Value::Strs(StrList::Strings(value))
    }
}

impl<'a> From<&'a [DateTime<Utc>]> for Value<'a> {
    fn from(value: &'a [DateTime<Utc>]) -> Self {
        Value::Times(Cow::Borrowed(value))
    }
}

/// One typed key/value pair.
///
/// # Example
///
/// ```
/// use rust_fast_logger::{Field, FieldKind};
/// use std::time::Duration;
///
/// let ids = [3_i64, 5, 8];
/// let fields = [
///     Field::string("user", "alice"),
///     Field::int("attempt", 2),
///     Field::duration("elapsed", Duration::from_millis(15)),
///     Field::ints("ids", &ids),
/// ];
/// assert_eq!(fields[3].kind(), FieldKind::Ints);
/// ```
#[derive(Clone, Debug)]
pub struct Field<'a> {
    key: Cow<'a, str>,
    value: Value<'a>,
}

impl<'a> Field<'a> {
    /// Field from a key and anything convertible to a [`Value`].
    pub fn new(key: impl Into<Cow<'a, str>>, value: impl Into<Value<'a>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Field key.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Field value.
    #[inline]
    pub fn value(&self) -> &Value<'a> {
        &self.value
    }

    /// Type tag of the value.
    #[inline]
    pub fn kind(&self) -> FieldKind {
        self.value.kind()
    }

    /// String field; borrows when given a `&str`.
    pub fn string(key: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) -> Self {
        Self::new(key, Value::Str(value.into()))
    }

    /// Signed integer field.
    pub fn int(key: impl Into<Cow<'a, str>>, value: i64) -> Self {
        Self::new(key, Value::Int(value))
    }

    /// Unsigned integer field.
    pub fn uint(key: impl Into<Cow<'a, str>>, value: u64) -> Self {
        Self::new(key, Value::Uint(value))
    }

    /// Float field. Non-finite values encode as `null` in JSON.
    pub fn float(key: impl Into<Cow<'a, str>>, value: f64) -> Self {
        Self::new(key, Value::Float(value))
    }

    /// Boolean field.
    pub fn bool(key: impl Into<Cow<'a, str>>, value: bool) -> Self {
        Self::new(key, Value::Bool(value))
    }

    /// Timestamp field, rendered in the logger's time format.
    pub fn time(key: impl Into<Cow<'a, str>>, value: DateTime<Utc>) -> Self {
        Self::new(key, Value::Time(value))
    }

    /// Duration field: nanoseconds in JSON, `Debug` form in text.
    pub fn duration(key: impl Into<Cow<'a, str>>, value: Duration) -> Self {
        Self::new(key, Value::Duration(value))
    }

    /// Borrowed error, logged under the key `error`.
    pub fn err<E: StdError + Send + Sync + 'a>(err: &'a E) -> Self {
        Self::new("error", Value::Error(Shared::Borrowed(err)))
    }

    /// Borrowed error under a custom key.
    pub fn named_err<E: StdError + Send + Sync + 'a>(
        key: impl Into<Cow<'a, str>>,
        err: &'a E,
    ) -> Self {
        Self::new(key, Value::Error(Shared::Borrowed(err)))
    }

    /// Shared error, suitable for logger-attached fields.
    pub fn shared_err(key: impl Into<Cow<'a, str>>, err: Arc<DynError<'a>>) -> Self {
        Self::new(key, Value::Error(Shared::Owned(err)))
    }

    /// Arbitrary value rendered through `Debug`. The only allocating constructor.
    pub fn any<T: fmt::Debug + Send + Sync + 'static>(
        key: impl Into<Cow<'a, str>>,
        value: T,
    ) -> Self {
        Self::new(key, Value::any(value))
    }

    /// Nested object, borrowed from `value`.
    pub fn object<T: ObjectMarshaler + 'a>(key: impl Into<Cow<'a, str>>, value: &'a T) -> Self {
        Self::new(key, Value::Object(Shared::Borrowed(value)))
    }

    /// Nested object owned by the field.
    pub fn shared_object(
        key: impl Into<Cow<'a, str>>,
        value: Arc<dyn ObjectMarshaler + 'a>,
    ) -> Self {
        Self::new(key, Value::Object(Shared::Owned(value)))
    }

    /// Nested array, borrowed from `value`.
    pub fn array<T: ArrayMarshaler + 'a>(key: impl Into<Cow<'a, str>>, value: &'a T) -> Self {
        Self::new(key, Value::Array(Shared::Borrowed(value)))
    }

    /// Nested array owned by the field.
    pub fn shared_array(
        key: impl Into<Cow<'a, str>>,
        value: Arc<dyn ArrayMarshaler + 'a>,
    ) -> Self {
        Self::new(key, Value::Array(Shared::Owned(value)))
    }

    /// Borrows `values`; the slice must outlive the field.
    pub fn ints(key: impl Into<Cow<'a, str>>, values: &'a [i64]) -> Self {
        Self::new(key, Value::Ints(Cow::Borrowed(values)))
    }

    /// Borrowed list of string slices.
    pub fn strs(key: impl Into<Cow<'a, str>>, values: &'a [&'a str]) -> Self {
        Self::new(key, Value::Strs(StrList::Strs(values)))
    }

    /// Borrowed list of owned strings.
    pub fn strings(key: impl Into<Cow<'a, str>>, values: &'a [String]) -> Self {
        Self::new(key, Value::Strs(StrList::Strings(values)))
    }

    /// Borrowed list of timestamps.
    pub fn times(key: impl Into<Cow<'a, str>>, values: &'a [DateTime<Utc>]) -> Self {
        Self::new(key, Value::Times(Cow::Borrowed(values)))
    }
}

impl Field<'static> {
    /// Integer list owned by the field.
    pub fn owned_ints(key: impl Into<Cow<'static, str>>, values: Vec<i64>) -> Self {
        Self::new(key, Value::Ints(Cow::Owned(values)))
    }

    /// String list owned by the field.
    pub fn owned_strings(key: impl Into<Cow<'static, str>>, values: Vec<String>) -> Self {
        Self::new(key, Value::Strs(StrList::Owned(values.into())))
    }

    /// Timestamp list owned by the field.
    pub fn owned_times(key: impl Into<Cow<'static, str>>, values: Vec<DateTime<Utc>>) -> Self {
        Self::new(key, Value::Times(Cow::Owned(values)))
    }
}
