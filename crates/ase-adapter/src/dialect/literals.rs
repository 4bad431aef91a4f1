//! Constant literal formatting for inline SQL.
//!
//! Constants that the dialect chooses to inline (instead of binding) are
//! rendered here. Formatting is injective for strings: embedded quotes are
//! doubled, so re-parsing the literal recovers the original text.

use crate::core::value::PortableValue;
use crate::error::{AseError, Result};

/// Quote a string literal, doubling embedded single quotes.
pub fn format_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Append `.0` to a numeric literal that carries no decimal point or
/// exponent, so the server parses it as a non-integral type.
pub fn fix_non_fixed_text(mut text: String) -> String {
    if !text.contains(['.', 'e', 'E']) {
        text.push_str(".0");
    }
    text
}

/// Render a constant as an inline SQL literal.
///
/// Binary payloads have no literal form and must travel as parameters.
pub fn format_constant(value: &PortableValue<'_>) -> Result<String> {
    let text = match value {
        PortableValue::Null => "NULL".to_string(),
        PortableValue::Bool(v) => if *v { "1" } else { "0" }.to_string(),
        PortableValue::Char(c) => {
            // Control characters have no printable literal form
            let code = *c as u32;
            if code < 32 {
                format!("char({})", code)
            } else {
                format_string(&c.to_string())
            }
        }
        // Seconds precision; the datetime literal form carries no fraction
        PortableValue::DateTime(v) => {
            format!("cast('{}' as datetime)", v.format("%Y-%m-%d %H:%M:%S"))
        }
        PortableValue::String(s) => format_string(s),
        PortableValue::Decimal(v) => fix_non_fixed_text(v.to_string()),
        PortableValue::Double(v) => fix_non_fixed_text(v.to_string()),
        PortableValue::Single(v) => fix_non_fixed_text(v.to_string()),
        PortableValue::Byte(v) => v.to_string(),
        PortableValue::SByte(v) => v.to_string(),
        PortableValue::Int16(v) => v.to_string(),
        PortableValue::UInt16(v) => v.to_string(),
        PortableValue::Int32(v) => v.to_string(),
        PortableValue::UInt32(v) => v.to_string(),
        PortableValue::Int64(v) => v.to_string(),
        PortableValue::UInt64(v) => v.to_string(),
        PortableValue::Guid(v) => format!("'{}'", v),
        PortableValue::TimeSpan(d) => {
            let seconds = match d.num_microseconds() {
                Some(us) => us as f64 / 1_000_000.0,
                None => d.num_milliseconds() as f64 / 1000.0,
            };
            fix_non_fixed_text(seconds.to_string())
        }
        PortableValue::Bytes(_) => {
            return Err(AseError::Format(
                "binary values have no literal form".to_string(),
            ))
        }
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn test_null_and_booleans() {
        assert_eq!(format_constant(&PortableValue::Null).unwrap(), "NULL");
        assert_eq!(format_constant(&PortableValue::Bool(true)).unwrap(), "1");
        assert_eq!(format_constant(&PortableValue::Bool(false)).unwrap(), "0");
    }

    #[test]
    fn test_char_literals() {
        assert_eq!(format_constant(&PortableValue::Char('A')).unwrap(), "'A'");
        assert_eq!(format_constant(&PortableValue::Char('\t')).unwrap(), "char(9)");
        assert_eq!(format_constant(&PortableValue::Char('\'')).unwrap(), "''''");
    }

    #[test]
    fn test_string_quote_doubling_roundtrips() {
        let original = "it's a 'quoted' value";
        let literal = format_string(original);
        assert_eq!(literal, "'it''s a ''quoted'' value'");

        // Re-parse: strip outer quotes, collapse doubled quotes
        let inner = &literal[1..literal.len() - 1];
        assert_eq!(inner.replace("''", "'"), original);
    }

    #[test]
    fn test_datetime_truncates_to_seconds() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_milli_opt(3, 4, 5, 678)
            .unwrap();
        assert_eq!(
            format_constant(&PortableValue::DateTime(dt)).unwrap(),
            "cast('2024-01-02 03:04:05' as datetime)"
        );
    }

    #[test]
    fn test_fractional_literals_always_carry_a_point() {
        assert_eq!(
            format_constant(&PortableValue::Decimal(Decimal::from(42))).unwrap(),
            "42.0"
        );
        assert_eq!(
            format_constant(&PortableValue::Decimal("12.5".parse().unwrap())).unwrap(),
            "12.5"
        );
        assert_eq!(format_constant(&PortableValue::Double(3.0)).unwrap(), "3.0");
        assert_eq!(format_constant(&PortableValue::Double(0.5)).unwrap(), "0.5");
        assert_eq!(format_constant(&PortableValue::Single(2.0)).unwrap(), "2.0");
    }

    #[test]
    fn test_integer_literals() {
        assert_eq!(format_constant(&PortableValue::SByte(-5)).unwrap(), "-5");
        assert_eq!(format_constant(&PortableValue::Int16(300)).unwrap(), "300");
        assert_eq!(format_constant(&PortableValue::Int64(-9)).unwrap(), "-9");
        assert_eq!(
            format_constant(&PortableValue::UInt64(u64::MAX)).unwrap(),
            u64::MAX.to_string()
        );
    }

    #[test]
    fn test_guid_literal_is_quoted_hyphenated() {
        let guid = Uuid::parse_str("6f9619ff-8b86-d011-b42d-00c04fc964ff").unwrap();
        assert_eq!(
            format_constant(&PortableValue::Guid(guid)).unwrap(),
            "'6f9619ff-8b86-d011-b42d-00c04fc964ff'"
        );
    }

    #[test]
    fn test_timespan_formats_as_total_seconds() {
        assert_eq!(
            format_constant(&PortableValue::TimeSpan(Duration::milliseconds(1500))).unwrap(),
            "1.5"
        );
        assert_eq!(
            format_constant(&PortableValue::TimeSpan(Duration::seconds(2))).unwrap(),
            "2.0"
        );
    }

    #[test]
    fn test_bytes_have_no_literal_form() {
        let err = format_constant(&PortableValue::from(vec![1u8, 2])).unwrap_err();
        assert!(err.to_string().contains("no literal form"));
    }
}
