//! Type mapping between portable column types and native ASE types.
//!
//! Four translation surfaces live here: portable type to DDL type name, the
//! catalog's numeric type-code decision table, the driver's generic parameter
//! types, and the per-value conversions applied when binding parameters or
//! normalizing values read back from the backend.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::traits::DbType;
use crate::core::value::{PortableType, PortableValue};
use crate::error::{AseError, Result};

/// Longest string column that still maps to a bounded `univarchar`.
pub const MAXIMUM_STRING_SIZE: i32 = 800;

/// Bound substituted for the unbounded types in procedure metadata batches.
const MAX_VAR_LENGTH: i32 = 16384;

/// Native DDL type declaration for a portable column type.
///
/// String columns are size-sensitive: a bounded length up to
/// [`MAXIMUM_STRING_SIZE`] declares `univarchar(n)`, anything longer or
/// unbounded becomes `unitext`.
pub fn native_type_name(column_type: PortableType, size: i32) -> Result<String> {
    let name = match column_type {
        // Boolean and integer types
        PortableType::Boolean => "bit".to_string(),
        PortableType::Byte => "tinyint".to_string(),
        PortableType::SByte => "numeric(3,0)".to_string(),
        PortableType::Int16 => "smallint".to_string(),
        PortableType::UInt16 => "unsigned smallint".to_string(),
        PortableType::Int32 => "integer".to_string(),
        PortableType::UInt32 => "unsigned integer".to_string(),
        PortableType::Int64 => "bigint".to_string(),
        PortableType::UInt64 => "unsigned bigint".to_string(),

        // Fractional types
        PortableType::Single => "real".to_string(),
        PortableType::Double => "double precision".to_string(),
        PortableType::Decimal => "money".to_string(),

        // Character and string types
        PortableType::Char => "unichar(1)".to_string(),
        PortableType::String => {
            if size > 0 && size <= MAXIMUM_STRING_SIZE {
                format!("univarchar({})", size)
            } else {
                "unitext".to_string()
            }
        }

        // Everything else
        PortableType::DateTime => "datetime".to_string(),
        PortableType::Guid => "char(36)".to_string(),
        PortableType::ByteArray => "image".to_string(),
        PortableType::Unknown => {
            return Err(AseError::TypeMapping(
                "Unknown has no native column type".to_string(),
            ))
        }
    };
    Ok(name)
}

/// Type declaration variant for procedure metadata batches.
///
/// The unbounded types cannot appear in a fake parameter list, so `image`
/// becomes `varbinary(16384)` and `unitext` becomes `varchar(16384)`.
pub fn sproc_native_type_name(column_type: PortableType, size: i32) -> Result<String> {
    let name = native_type_name(column_type, size)?;
    Ok(match name.as_str() {
        "image" => format!("varbinary({})", MAX_VAR_LENGTH),
        "unitext" => format!("varchar({})", MAX_VAR_LENGTH),
        _ => name,
    })
}

/// Decode a catalog type code into a portable type and character length.
///
/// Keyed on `syscolumns.type`, with `prec`, `length`, `usertype`, and the
/// server's `@@ncharsize` deciding the ambiguous rows. Returns the portable
/// type and the column size (0 when the type carries no length).
pub fn type_from_number(
    type_code: u8,
    precision: u8,
    length: i32,
    user_type: i16,
    nchar_size: u8,
) -> (PortableType, i32) {
    // A zero charsize would divide by zero; the server reports at least 1.
    let charsize = i32::from(nchar_size).max(1);
    match type_code {
        // intn: width picks the signed integer type
        38 => match length {
            1 => (PortableType::Byte, 0),
            2 => (PortableType::Int16, 0),
            4 => (PortableType::Int32, 0),
            8 => (PortableType::Int64, 0),
            _ => (PortableType::Unknown, 0),
        },
        // uintn: width picks the unsigned integer type
        68 => match length {
            1 => (PortableType::Byte, 0),
            2 => (PortableType::UInt16, 0),
            4 => (PortableType::UInt32, 0),
            8 => (PortableType::UInt64, 0),
            _ => (PortableType::Unknown, 0),
        },
        56 => (PortableType::Int32, 0),
        66 => (PortableType::UInt32, 0),
        52 => (PortableType::Int16, 0),
        65 => (PortableType::UInt16, 0),
        50 => (PortableType::Boolean, 0),
        // char/varchar: user type 2 counts bytes directly, otherwise length
        // counts charsize-wide units
        39 | 35 => {
            let len = if user_type == 2 {
                length
            } else {
                length / charsize
            };
            (PortableType::String, len)
        }
        // unichar/univarchar store two bytes per character
        174 | 155 => (PortableType::String, length / 2),
        34 | 45 => (PortableType::ByteArray, 0),
        111 | 61 => (PortableType::DateTime, 0),
        109 => (PortableType::Double, 0),
        110 | 60 => (PortableType::Decimal, 0),
        // numeric/decimal: precision picks the narrowest integer that fits
        108 | 63 => {
            if precision <= 3 {
                (PortableType::SByte, 0)
            } else if precision <= 5 {
                (PortableType::Int16, 0)
            } else if precision <= 10 {
                (PortableType::Int32, 0)
            } else {
                (PortableType::Int64, 0)
            }
        }
        _ => (PortableType::Unknown, 0),
    }
}

/// Fold a driver-reported generic parameter type into a portable type.
pub fn db_type_to_portable(db_type: DbType) -> PortableType {
    match db_type {
        DbType::Boolean => PortableType::Boolean,
        DbType::Byte => PortableType::Byte,
        DbType::SByte => PortableType::SByte,
        DbType::Int16 => PortableType::Int16,
        DbType::UInt16 => PortableType::UInt16,
        DbType::Int32 => PortableType::Int32,
        DbType::UInt32 => PortableType::UInt32,
        DbType::Int64 => PortableType::Int64,
        DbType::UInt64 => PortableType::UInt64,
        DbType::Single => PortableType::Single,
        DbType::Double => PortableType::Double,
        DbType::Decimal | DbType::Currency | DbType::VarNumeric => PortableType::Decimal,
        DbType::String
        | DbType::AnsiString
        | DbType::StringFixedLength
        | DbType::AnsiStringFixedLength
        | DbType::Xml => PortableType::String,
        DbType::DateTime
        | DbType::DateTime2
        | DbType::DateTimeOffset
        | DbType::Date
        | DbType::Time => PortableType::DateTime,
        DbType::Guid => PortableType::Guid,
        DbType::Binary => PortableType::ByteArray,
        DbType::Object => PortableType::Unknown,
    }
}

/// Convert an outgoing parameter value into a shape the wire protocol has a
/// native counterpart for.
///
/// Narrow signed and unsigned integers widen to the next signed width, 64-bit
/// integers travel as decimals, and GUIDs travel as their hyphenated text.
pub fn widen_for_binding(value: PortableValue<'static>) -> PortableValue<'static> {
    match value {
        PortableValue::Guid(g) => PortableValue::text_owned(g.to_string()),
        PortableValue::SByte(v) => PortableValue::Int16(i16::from(v)),
        PortableValue::UInt16(v) => PortableValue::Int32(i32::from(v)),
        PortableValue::UInt32(v) => PortableValue::Int64(i64::from(v)),
        PortableValue::Int64(v) => PortableValue::Decimal(Decimal::from(v)),
        PortableValue::UInt64(v) => PortableValue::Decimal(Decimal::from(v)),
        other => other,
    }
}

/// The driver type names whose numeric codes the binder caches per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeTagKind {
    Decimal,
    Image,
    Unitext,
    UniVarChar,
}

impl NativeTagKind {
    /// The driver-side name used to resolve this tag.
    pub fn type_name(self) -> &'static str {
        match self {
            NativeTagKind::Decimal => "Decimal",
            NativeTagKind::Image => "Image",
            NativeTagKind::Unitext => "Unitext",
            NativeTagKind::UniVarChar => "UniVarChar",
        }
    }
}

/// Which explicit native tag a bound value needs, if any.
///
/// Decimal and binary parameters always carry their tag; string parameters
/// pick between the bounded and unbounded wide-character types by length.
pub fn native_tag_kind(value: &PortableValue<'_>) -> Option<NativeTagKind> {
    match value {
        PortableValue::Decimal(_) => Some(NativeTagKind::Decimal),
        PortableValue::Bytes(_) => Some(NativeTagKind::Image),
        PortableValue::String(s) => {
            if s.chars().count() > MAXIMUM_STRING_SIZE as usize {
                Some(NativeTagKind::Unitext)
            } else {
                Some(NativeTagKind::UniVarChar)
            }
        }
        _ => None,
    }
}

fn read_i64(value: &PortableValue<'_>) -> Option<i64> {
    match value {
        PortableValue::String(s) => s.trim().parse::<i64>().ok(),
        other => other.to_i64(),
    }
}

fn read_f64(value: &PortableValue<'_>) -> Option<f64> {
    use rust_decimal::prelude::ToPrimitive;
    match value {
        PortableValue::Single(v) => Some(f64::from(*v)),
        PortableValue::Double(v) => Some(*v),
        PortableValue::Decimal(v) => v.to_f64(),
        PortableValue::String(s) => s.trim().parse::<f64>().ok(),
        other => other.to_i64().map(|n| n as f64),
    }
}

/// Best-effort coercion of a value read from the backend into the shape a
/// column type expects.
///
/// The server types scalar results by expression, not by column, so default
/// values arrive as whatever `select <expr>` produced. Values that cannot be
/// coerced are returned unchanged.
pub fn reformat_read_value(
    value: PortableValue<'static>,
    target: PortableType,
) -> PortableValue<'static> {
    if value.is_null() || value.portable_type() == target {
        return value;
    }
    match target {
        PortableType::Boolean => match read_i64(&value) {
            Some(n) => PortableValue::Bool(n != 0),
            None => value,
        },
        PortableType::Byte => match read_i64(&value).and_then(|n| u8::try_from(n).ok()) {
            Some(n) => PortableValue::Byte(n),
            None => value,
        },
        PortableType::SByte => match read_i64(&value).and_then(|n| i8::try_from(n).ok()) {
            Some(n) => PortableValue::SByte(n),
            None => value,
        },
        PortableType::Int16 => match read_i64(&value).and_then(|n| i16::try_from(n).ok()) {
            Some(n) => PortableValue::Int16(n),
            None => value,
        },
        PortableType::UInt16 => match read_i64(&value).and_then(|n| u16::try_from(n).ok()) {
            Some(n) => PortableValue::UInt16(n),
            None => value,
        },
        PortableType::Int32 => match read_i64(&value).and_then(|n| i32::try_from(n).ok()) {
            Some(n) => PortableValue::Int32(n),
            None => value,
        },
        PortableType::UInt32 => match read_i64(&value).and_then(|n| u32::try_from(n).ok()) {
            Some(n) => PortableValue::UInt32(n),
            None => value,
        },
        PortableType::Int64 => match read_i64(&value) {
            Some(n) => PortableValue::Int64(n),
            None => value,
        },
        PortableType::UInt64 => match read_i64(&value).and_then(|n| u64::try_from(n).ok()) {
            Some(n) => PortableValue::UInt64(n),
            None => value,
        },
        PortableType::Single => match read_f64(&value) {
            Some(f) => PortableValue::Single(f as f32),
            None => value,
        },
        PortableType::Double => match read_f64(&value) {
            Some(f) => PortableValue::Double(f),
            None => value,
        },
        PortableType::Decimal => {
            let converted = match &value {
                PortableValue::Double(v) => Decimal::try_from(*v).ok(),
                PortableValue::Single(v) => Decimal::try_from(f64::from(*v)).ok(),
                PortableValue::String(s) => s.trim().parse::<Decimal>().ok(),
                other => other.to_i64().map(Decimal::from),
            };
            match converted {
                Some(d) => PortableValue::Decimal(d),
                None => value,
            }
        }
        PortableType::Char => {
            let c = match value.as_str() {
                Some(s) => {
                    let mut it = s.chars();
                    match (it.next(), it.next()) {
                        (Some(c), None) => Some(c),
                        _ => None,
                    }
                }
                None => None,
            };
            match c {
                Some(c) => PortableValue::Char(c),
                None => value,
            }
        }
        PortableType::String => match &value {
            PortableValue::Char(c) => PortableValue::text_owned(c.to_string()),
            PortableValue::Guid(g) => PortableValue::text_owned(g.to_string()),
            _ => match value.to_i64() {
                Some(n) => PortableValue::text_owned(n.to_string()),
                None => value,
            },
        },
        PortableType::DateTime => {
            let parsed = value.as_str().and_then(|s| {
                let s = s.trim();
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                    .ok()
                    .or_else(|| {
                        NaiveDate::parse_from_str(s, "%Y-%m-%d")
                            .ok()
                            .map(|d| d.and_time(NaiveTime::MIN))
                    })
            });
            match parsed {
                Some(dt) => PortableValue::DateTime(dt),
                None => value,
            }
        }
        PortableType::Guid => {
            let parsed = value.as_str().and_then(|s| Uuid::parse_str(s.trim()).ok());
            match parsed {
                Some(g) => PortableValue::Guid(g),
                None => value,
            }
        }
        PortableType::ByteArray | PortableType::Unknown => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_type_names() {
        let cases = [
            (PortableType::Boolean, "bit"),
            (PortableType::Byte, "tinyint"),
            (PortableType::SByte, "numeric(3,0)"),
            (PortableType::Int16, "smallint"),
            (PortableType::UInt16, "unsigned smallint"),
            (PortableType::Int32, "integer"),
            (PortableType::UInt32, "unsigned integer"),
            (PortableType::Int64, "bigint"),
            (PortableType::UInt64, "unsigned bigint"),
            (PortableType::Single, "real"),
            (PortableType::Double, "double precision"),
            (PortableType::Decimal, "money"),
            (PortableType::Char, "unichar(1)"),
            (PortableType::DateTime, "datetime"),
            (PortableType::Guid, "char(36)"),
            (PortableType::ByteArray, "image"),
        ];
        for (t, expected) in cases {
            assert_eq!(native_type_name(t, 0).unwrap(), expected, "{t:?}");
        }
    }

    #[test]
    fn test_string_type_is_size_sensitive() {
        assert_eq!(
            native_type_name(PortableType::String, 1).unwrap(),
            "univarchar(1)"
        );
        assert_eq!(
            native_type_name(PortableType::String, 800).unwrap(),
            "univarchar(800)"
        );
        assert_eq!(native_type_name(PortableType::String, 801).unwrap(), "unitext");
        assert_eq!(native_type_name(PortableType::String, 0).unwrap(), "unitext");
    }

    #[test]
    fn test_every_portable_type_has_a_declaration() {
        for t in PortableType::ALL {
            let mapped = native_type_name(t, 10);
            if t == PortableType::Unknown {
                assert!(mapped.is_err());
            } else {
                assert!(mapped.is_ok(), "{t:?}");
            }
        }
    }

    #[test]
    fn test_sproc_type_substitutions() {
        assert_eq!(
            sproc_native_type_name(PortableType::ByteArray, 0).unwrap(),
            "varbinary(16384)"
        );
        assert_eq!(
            sproc_native_type_name(PortableType::String, 0).unwrap(),
            "varchar(16384)"
        );
        assert_eq!(
            sproc_native_type_name(PortableType::String, 100).unwrap(),
            "univarchar(100)"
        );
        assert_eq!(
            sproc_native_type_name(PortableType::Int32, 0).unwrap(),
            "integer"
        );
    }

    #[test]
    fn test_catalog_integer_codes() {
        assert_eq!(type_from_number(38, 0, 1, 0, 1).0, PortableType::Byte);
        assert_eq!(type_from_number(38, 0, 2, 0, 1).0, PortableType::Int16);
        assert_eq!(type_from_number(38, 0, 4, 0, 1).0, PortableType::Int32);
        assert_eq!(type_from_number(38, 0, 8, 0, 1).0, PortableType::Int64);
        assert_eq!(type_from_number(38, 0, 3, 0, 1).0, PortableType::Unknown);

        assert_eq!(type_from_number(68, 0, 2, 0, 1).0, PortableType::UInt16);
        assert_eq!(type_from_number(68, 0, 8, 0, 1).0, PortableType::UInt64);

        assert_eq!(type_from_number(56, 0, 4, 0, 1).0, PortableType::Int32);
        assert_eq!(type_from_number(66, 0, 4, 0, 1).0, PortableType::UInt32);
        assert_eq!(type_from_number(52, 0, 2, 0, 1).0, PortableType::Int16);
        assert_eq!(type_from_number(65, 0, 2, 0, 1).0, PortableType::UInt16);
        assert_eq!(type_from_number(50, 0, 1, 0, 1).0, PortableType::Boolean);
    }

    #[test]
    fn test_catalog_string_codes_compute_length() {
        // user type 2: byte length is the character length
        assert_eq!(type_from_number(39, 0, 10, 2, 2), (PortableType::String, 10));
        // otherwise divide by the character-size divisor
        assert_eq!(type_from_number(39, 0, 10, 0, 2), (PortableType::String, 5));
        assert_eq!(type_from_number(35, 0, 12, 0, 3), (PortableType::String, 4));
        // wide-character types always store two bytes per character
        assert_eq!(type_from_number(174, 0, 20, 0, 1), (PortableType::String, 10));
        assert_eq!(type_from_number(155, 0, 20, 0, 1), (PortableType::String, 10));
    }

    #[test]
    fn test_catalog_numeric_codes_use_precision() {
        assert_eq!(type_from_number(108, 3, 0, 0, 1).0, PortableType::SByte);
        assert_eq!(type_from_number(108, 5, 0, 0, 1).0, PortableType::Int16);
        assert_eq!(type_from_number(108, 10, 0, 0, 1).0, PortableType::Int32);
        assert_eq!(type_from_number(108, 11, 0, 0, 1).0, PortableType::Int64);
        assert_eq!(type_from_number(63, 4, 0, 0, 1).0, PortableType::Int16);
    }

    #[test]
    fn test_catalog_remaining_codes() {
        assert_eq!(type_from_number(34, 0, 0, 0, 1).0, PortableType::ByteArray);
        assert_eq!(type_from_number(45, 0, 0, 0, 1).0, PortableType::ByteArray);
        assert_eq!(type_from_number(111, 0, 0, 0, 1).0, PortableType::DateTime);
        assert_eq!(type_from_number(61, 0, 0, 0, 1).0, PortableType::DateTime);
        assert_eq!(type_from_number(109, 0, 0, 0, 1).0, PortableType::Double);
        assert_eq!(type_from_number(110, 0, 0, 0, 1).0, PortableType::Decimal);
        assert_eq!(type_from_number(60, 0, 0, 0, 1).0, PortableType::Decimal);
        assert_eq!(type_from_number(99, 0, 0, 0, 1).0, PortableType::Unknown);
    }

    #[test]
    fn test_db_type_mapping() {
        assert_eq!(db_type_to_portable(DbType::Currency), PortableType::Decimal);
        assert_eq!(db_type_to_portable(DbType::VarNumeric), PortableType::Decimal);
        assert_eq!(db_type_to_portable(DbType::Xml), PortableType::String);
        assert_eq!(
            db_type_to_portable(DbType::AnsiStringFixedLength),
            PortableType::String
        );
        assert_eq!(db_type_to_portable(DbType::Date), PortableType::DateTime);
        assert_eq!(db_type_to_portable(DbType::Binary), PortableType::ByteArray);
        assert_eq!(db_type_to_portable(DbType::Object), PortableType::Unknown);
    }

    #[test]
    fn test_widening_for_binding() {
        assert_eq!(
            widen_for_binding(PortableValue::SByte(-5)),
            PortableValue::Int16(-5)
        );
        assert_eq!(
            widen_for_binding(PortableValue::UInt16(70_000u32 as u16)),
            PortableValue::Int32(i32::from(70_000u32 as u16))
        );
        assert_eq!(
            widen_for_binding(PortableValue::UInt32(3_000_000_000)),
            PortableValue::Int64(3_000_000_000)
        );
        assert_eq!(
            widen_for_binding(PortableValue::Int64(42)),
            PortableValue::Decimal(Decimal::from(42))
        );
        assert_eq!(
            widen_for_binding(PortableValue::UInt64(42)),
            PortableValue::Decimal(Decimal::from(42))
        );

        let guid = Uuid::parse_str("6f9619ff-8b86-d011-b42d-00c04fc964ff").unwrap();
        assert_eq!(
            widen_for_binding(PortableValue::Guid(guid)),
            PortableValue::text_owned("6f9619ff-8b86-d011-b42d-00c04fc964ff".to_string())
        );

        // Types with native counterparts pass through unchanged
        assert_eq!(
            widen_for_binding(PortableValue::Int32(7)),
            PortableValue::Int32(7)
        );
    }

    #[test]
    fn test_native_tag_selection() {
        assert_eq!(
            native_tag_kind(&PortableValue::Decimal(Decimal::ONE)),
            Some(NativeTagKind::Decimal)
        );
        assert_eq!(
            native_tag_kind(&PortableValue::from(vec![1u8])),
            Some(NativeTagKind::Image)
        );
        assert_eq!(
            native_tag_kind(&PortableValue::from("short")),
            Some(NativeTagKind::UniVarChar)
        );
        let long = "x".repeat(801);
        assert_eq!(
            native_tag_kind(&PortableValue::from(long)),
            Some(NativeTagKind::Unitext)
        );
        assert_eq!(native_tag_kind(&PortableValue::Int32(1)), None);
    }

    #[test]
    fn test_native_tag_names() {
        assert_eq!(NativeTagKind::Decimal.type_name(), "Decimal");
        assert_eq!(NativeTagKind::Image.type_name(), "Image");
        assert_eq!(NativeTagKind::Unitext.type_name(), "Unitext");
        assert_eq!(NativeTagKind::UniVarChar.type_name(), "UniVarChar");
    }

    #[test]
    fn test_reformat_read_value_coercions() {
        assert_eq!(
            reformat_read_value(PortableValue::Int32(1), PortableType::Boolean),
            PortableValue::Bool(true)
        );
        assert_eq!(
            reformat_read_value(PortableValue::text_owned("42".to_string()), PortableType::Int32),
            PortableValue::Int32(42)
        );
        assert_eq!(
            reformat_read_value(PortableValue::Decimal(Decimal::from(5)), PortableType::Int64),
            PortableValue::Int64(5)
        );
        assert_eq!(
            reformat_read_value(PortableValue::Int32(65), PortableType::String),
            PortableValue::text_owned("65".to_string())
        );

        let guid = "6f9619ff-8b86-d011-b42d-00c04fc964ff";
        assert_eq!(
            reformat_read_value(PortableValue::text_owned(guid.to_string()), PortableType::Guid),
            PortableValue::Guid(Uuid::parse_str(guid).unwrap())
        );

        let dt = reformat_read_value(
            PortableValue::text_owned("2024-01-02 03:04:05".to_string()),
            PortableType::DateTime,
        );
        match dt {
            PortableValue::DateTime(v) => {
                assert_eq!(v.to_string(), "2024-01-02 03:04:05");
            }
            other => panic!("expected datetime, got {other:?}"),
        }
    }

    #[test]
    fn test_reformat_read_value_leaves_unconvertible_alone() {
        assert_eq!(
            reformat_read_value(PortableValue::text_owned("abc".to_string()), PortableType::Int32),
            PortableValue::text_owned("abc".to_string())
        );
        assert_eq!(
            reformat_read_value(PortableValue::Null, PortableType::Int32),
            PortableValue::Null
        );
        // Matching types short-circuit
        assert_eq!(
            reformat_read_value(PortableValue::Int32(9), PortableType::Int32),
            PortableValue::Int32(9)
        );
    }
}
