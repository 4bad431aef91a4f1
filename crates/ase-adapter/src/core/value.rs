//! Portable value and operand types shared by the dialect and the driver seam.
//!
//! The engine above this adapter never sees native backend types; everything
//! crossing the boundary is expressed as a [`PortableType`] (column shapes) or
//! a [`PortableValue`] (runtime values, including query parameters and rows
//! read back from the backend).

use std::borrow::Cow;

use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Backend-agnostic column type enumeration.
///
/// This is the vocabulary the owning engine speaks; the type mapper translates
/// it to ASE type names for DDL and interprets catalog type codes back into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortableType {
    Boolean,
    Byte,
    SByte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Decimal,
    Char,
    String,
    DateTime,
    Guid,
    ByteArray,
    /// Catalog shapes this adapter cannot express portably.
    Unknown,
}

impl PortableType {
    /// All portable types a column can carry, in declaration order.
    ///
    /// Used by totality checks over the type-name tables.
    pub const ALL: [PortableType; 18] = [
        PortableType::Boolean,
        PortableType::Byte,
        PortableType::SByte,
        PortableType::Int16,
        PortableType::UInt16,
        PortableType::Int32,
        PortableType::UInt32,
        PortableType::Int64,
        PortableType::UInt64,
        PortableType::Single,
        PortableType::Double,
        PortableType::Decimal,
        PortableType::Char,
        PortableType::String,
        PortableType::DateTime,
        PortableType::Guid,
        PortableType::ByteArray,
        PortableType::Unknown,
    ];
}

/// A runtime value crossing the adapter boundary.
///
/// Uses `Cow` for string and byte payloads so transient values (query
/// parameters, literals about to be formatted) can borrow from the caller;
/// values stored past the call (rows, defaults) are converted with
/// [`PortableValue::into_owned`].
///
/// # Example
///
/// ```rust
/// use ase_adapter::PortableValue;
///
/// let borrowed: PortableValue<'_> = "hello".into();
/// let owned: PortableValue<'static> = borrowed.into_owned();
/// assert_eq!(owned.as_str(), Some("hello"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum PortableValue<'a> {
    /// The backend's NULL marker.
    Null,
    Bool(bool),
    Byte(u8),
    SByte(i8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    Char(char),
    /// Text with zero-copy support.
    String(Cow<'a, str>),
    /// Timestamp without timezone, matching the ASE `datetime` type.
    DateTime(NaiveDateTime),
    Guid(Uuid),
    /// Binary payload with zero-copy support.
    Bytes(Cow<'a, [u8]>),
    /// A duration; only meaningful for literal formatting, never a column type.
    TimeSpan(Duration),
}

impl<'a> PortableValue<'a> {
    /// Convert to a fully owned value with `'static` lifetime.
    #[must_use]
    pub fn into_owned(self) -> PortableValue<'static> {
        match self {
            PortableValue::Null => PortableValue::Null,
            PortableValue::Bool(v) => PortableValue::Bool(v),
            PortableValue::Byte(v) => PortableValue::Byte(v),
            PortableValue::SByte(v) => PortableValue::SByte(v),
            PortableValue::Int16(v) => PortableValue::Int16(v),
            PortableValue::UInt16(v) => PortableValue::UInt16(v),
            PortableValue::Int32(v) => PortableValue::Int32(v),
            PortableValue::UInt32(v) => PortableValue::UInt32(v),
            PortableValue::Int64(v) => PortableValue::Int64(v),
            PortableValue::UInt64(v) => PortableValue::UInt64(v),
            PortableValue::Single(v) => PortableValue::Single(v),
            PortableValue::Double(v) => PortableValue::Double(v),
            PortableValue::Decimal(v) => PortableValue::Decimal(v),
            PortableValue::Char(v) => PortableValue::Char(v),
            PortableValue::String(v) => PortableValue::String(Cow::Owned(v.into_owned())),
            PortableValue::DateTime(v) => PortableValue::DateTime(v),
            PortableValue::Guid(v) => PortableValue::Guid(v),
            PortableValue::Bytes(v) => PortableValue::Bytes(Cow::Owned(v.into_owned())),
            PortableValue::TimeSpan(v) => PortableValue::TimeSpan(v),
        }
    }

    /// Check if this value is the NULL marker.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, PortableValue::Null)
    }

    /// The portable column type this value would be stored as.
    ///
    /// `Null` and `TimeSpan` have no storable column shape and report
    /// [`PortableType::Unknown`].
    #[must_use]
    pub fn portable_type(&self) -> PortableType {
        match self {
            PortableValue::Null | PortableValue::TimeSpan(_) => PortableType::Unknown,
            PortableValue::Bool(_) => PortableType::Boolean,
            PortableValue::Byte(_) => PortableType::Byte,
            PortableValue::SByte(_) => PortableType::SByte,
            PortableValue::Int16(_) => PortableType::Int16,
            PortableValue::UInt16(_) => PortableType::UInt16,
            PortableValue::Int32(_) => PortableType::Int32,
            PortableValue::UInt32(_) => PortableType::UInt32,
            PortableValue::Int64(_) => PortableType::Int64,
            PortableValue::UInt64(_) => PortableType::UInt64,
            PortableValue::Single(_) => PortableType::Single,
            PortableValue::Double(_) => PortableType::Double,
            PortableValue::Decimal(_) => PortableType::Decimal,
            PortableValue::Char(_) => PortableType::Char,
            PortableValue::String(_) => PortableType::String,
            PortableValue::DateTime(_) => PortableType::DateTime,
            PortableValue::Guid(_) => PortableType::Guid,
            PortableValue::Bytes(_) => PortableType::ByteArray,
        }
    }

    /// Borrow the text payload, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PortableValue::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Borrow the binary payload, if this is a byte value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PortableValue::Bytes(b) => Some(b.as_ref()),
            _ => None,
        }
    }

    /// Widening read of any integer-shaped value as `i32`.
    ///
    /// Catalog queries return counts, type codes, and bitmasks whose exact
    /// integer width varies by driver; this accessor accepts any of them.
    #[must_use]
    pub fn to_i32(&self) -> Option<i32> {
        match self {
            PortableValue::Bool(v) => Some(i32::from(*v)),
            PortableValue::Byte(v) => Some(i32::from(*v)),
            PortableValue::SByte(v) => Some(i32::from(*v)),
            PortableValue::Int16(v) => Some(i32::from(*v)),
            PortableValue::UInt16(v) => Some(i32::from(*v)),
            PortableValue::Int32(v) => Some(*v),
            PortableValue::UInt32(v) => i32::try_from(*v).ok(),
            PortableValue::Int64(v) => i32::try_from(*v).ok(),
            PortableValue::UInt64(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Widening read of any integer-shaped value as `i64`.
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            PortableValue::Bool(v) => Some(i64::from(*v)),
            PortableValue::Byte(v) => Some(i64::from(*v)),
            PortableValue::SByte(v) => Some(i64::from(*v)),
            PortableValue::Int16(v) => Some(i64::from(*v)),
            PortableValue::UInt16(v) => Some(i64::from(*v)),
            PortableValue::Int32(v) => Some(i64::from(*v)),
            PortableValue::UInt32(v) => Some(i64::from(*v)),
            PortableValue::Int64(v) => Some(*v),
            PortableValue::UInt64(v) => i64::try_from(*v).ok(),
            PortableValue::Decimal(v) => {
                use rust_decimal::prelude::ToPrimitive;
                v.to_i64()
            }
            _ => None,
        }
    }

    /// Create a text value from a borrowed string slice.
    #[must_use]
    pub fn text_borrowed(s: &'a str) -> Self {
        PortableValue::String(Cow::Borrowed(s))
    }

    /// Create a text value from an owned String.
    #[must_use]
    pub fn text_owned(s: String) -> PortableValue<'static> {
        PortableValue::String(Cow::Owned(s))
    }
}

impl From<bool> for PortableValue<'static> {
    fn from(v: bool) -> Self {
        PortableValue::Bool(v)
    }
}

impl From<u8> for PortableValue<'static> {
    fn from(v: u8) -> Self {
        PortableValue::Byte(v)
    }
}

impl From<i8> for PortableValue<'static> {
    fn from(v: i8) -> Self {
        PortableValue::SByte(v)
    }
}

impl From<i16> for PortableValue<'static> {
    fn from(v: i16) -> Self {
        PortableValue::Int16(v)
    }
}

impl From<u16> for PortableValue<'static> {
    fn from(v: u16) -> Self {
        PortableValue::UInt16(v)
    }
}

impl From<i32> for PortableValue<'static> {
    fn from(v: i32) -> Self {
        PortableValue::Int32(v)
    }
}

impl From<u32> for PortableValue<'static> {
    fn from(v: u32) -> Self {
        PortableValue::UInt32(v)
    }
}

impl From<i64> for PortableValue<'static> {
    fn from(v: i64) -> Self {
        PortableValue::Int64(v)
    }
}

impl From<u64> for PortableValue<'static> {
    fn from(v: u64) -> Self {
        PortableValue::UInt64(v)
    }
}

impl From<f32> for PortableValue<'static> {
    fn from(v: f32) -> Self {
        PortableValue::Single(v)
    }
}

impl From<f64> for PortableValue<'static> {
    fn from(v: f64) -> Self {
        PortableValue::Double(v)
    }
}

impl From<Decimal> for PortableValue<'static> {
    fn from(v: Decimal) -> Self {
        PortableValue::Decimal(v)
    }
}

impl From<char> for PortableValue<'static> {
    fn from(v: char) -> Self {
        PortableValue::Char(v)
    }
}

impl From<String> for PortableValue<'static> {
    fn from(v: String) -> Self {
        PortableValue::String(Cow::Owned(v))
    }
}

impl<'a> From<&'a str> for PortableValue<'a> {
    fn from(v: &'a str) -> Self {
        PortableValue::String(Cow::Borrowed(v))
    }
}

impl From<NaiveDateTime> for PortableValue<'static> {
    fn from(v: NaiveDateTime) -> Self {
        PortableValue::DateTime(v)
    }
}

impl From<Uuid> for PortableValue<'static> {
    fn from(v: Uuid) -> Self {
        PortableValue::Guid(v)
    }
}

impl From<Vec<u8>> for PortableValue<'static> {
    fn from(v: Vec<u8>) -> Self {
        PortableValue::Bytes(Cow::Owned(v))
    }
}

impl<'a> From<&'a [u8]> for PortableValue<'a> {
    fn from(v: &'a [u8]) -> Self {
        PortableValue::Bytes(Cow::Borrowed(v))
    }
}

impl From<Duration> for PortableValue<'static> {
    fn from(v: Duration) -> Self {
        PortableValue::TimeSpan(v)
    }
}

/// A query-tree operand as seen by the dialect formatter.
///
/// The distinction decides whether a value is inlined as literal SQL text or
/// sent to the backend as a bound parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand<'a> {
    /// A compile-time constant, eligible for inline literal formatting.
    Constant(PortableValue<'a>),
    /// A runtime value that must travel as a bound parameter.
    Value(PortableValue<'a>),
}

impl<'a> Operand<'a> {
    /// The payload, regardless of operand kind.
    #[must_use]
    pub fn value(&self) -> &PortableValue<'a> {
        match self {
            Operand::Constant(v) | Operand::Value(v) => v,
        }
    }

    /// Whether this operand is a constant eligible for inlining.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        matches!(self, Operand::Constant(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_owned_detaches_borrowed_text() {
        let borrowed: PortableValue<'_> = PortableValue::String(Cow::Borrowed("hello"));
        let owned: PortableValue<'static> = borrowed.into_owned();
        assert_eq!(owned, PortableValue::String(Cow::Owned("hello".to_string())));
    }

    #[test]
    fn test_is_null() {
        assert!(PortableValue::Null.is_null());
        assert!(!PortableValue::Int32(42).is_null());
    }

    #[test]
    fn test_portable_type_of_values() {
        assert_eq!(PortableValue::Bool(true).portable_type(), PortableType::Boolean);
        assert_eq!(
            PortableValue::from("x").portable_type(),
            PortableType::String
        );
        assert_eq!(
            PortableValue::from(vec![1u8, 2]).portable_type(),
            PortableType::ByteArray
        );
        assert_eq!(PortableValue::Null.portable_type(), PortableType::Unknown);
        assert_eq!(
            PortableValue::TimeSpan(Duration::seconds(1)).portable_type(),
            PortableType::Unknown
        );
    }

    #[test]
    fn test_integer_widening_reads() {
        assert_eq!(PortableValue::Byte(38).to_i32(), Some(38));
        assert_eq!(PortableValue::Int16(2048).to_i32(), Some(2048));
        assert_eq!(PortableValue::Int64(7).to_i32(), Some(7));
        assert_eq!(PortableValue::from("x").to_i32(), None);
        assert_eq!(PortableValue::UInt64(u64::MAX).to_i64(), None);
        assert_eq!(PortableValue::Decimal(Decimal::new(42, 0)).to_i64(), Some(42));
    }

    #[test]
    fn test_from_implementations() {
        let v: PortableValue<'static> = 42i32.into();
        assert_eq!(v, PortableValue::Int32(42));

        let v: PortableValue<'static> = "hello".to_string().into();
        assert_eq!(v, PortableValue::String(Cow::Owned("hello".to_string())));
    }

    #[test]
    fn test_operand_accessors() {
        let c = Operand::Constant(PortableValue::Int32(1));
        let v = Operand::Value(PortableValue::Int32(1));
        assert!(c.is_constant());
        assert!(!v.is_constant());
        assert_eq!(c.value(), v.value());
    }
}
