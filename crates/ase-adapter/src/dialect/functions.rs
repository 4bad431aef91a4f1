//! Operator and function template catalog.
//!
//! Criteria expressions arrive as already-rendered operand fragments; this
//! module wraps them in the dialect's spelling of each operator or function.
//! Only operations with a dialect-specific rendering live here; generic
//! functions are rendered upstream by the owning engine.

use crate::core::value::{Operand, PortableValue};
use crate::error::{AseError, Result};

use super::literals::format_string;

/// Binary operators with their dialect spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
}

impl BinaryOperator {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::Greater => ">",
            BinaryOperator::Less => "<",
            BinaryOperator::GreaterOrEqual => ">=",
            BinaryOperator::LessOrEqual => "<=",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::BitwiseXor => "^",
        }
    }
}

/// Render a binary operation.
///
/// Modulo is emitted without parentheses; everything else is parenthesized.
pub fn format_binary(op: BinaryOperator, left: &str, right: &str) -> String {
    match op {
        BinaryOperator::Modulo => format!("{} % {}", left, right),
        other => format!("({} {} {})", left, other.symbol(), right),
    }
}

/// Functions with a dialect-specific rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionOperator {
    Acos,
    Asin,
    Atn,
    Atn2,
    Cosh,
    Sinh,
    Tanh,
    Log,
    Log10,
    Round,
    Sqr,
    ToInt,
    ToLong,
    ToFloat,
    ToDouble,
    ToDecimal,
    BigMul,
    Max,
    Min,
    Rnd,
    CharIndex,
    PadLeft,
    PadRight,
    Remove,
    GetMilliSecond,
    AddTicks,
    AddMilliSeconds,
    AddTimeSpan,
    AddSeconds,
    AddMinutes,
    AddHours,
    AddDays,
    AddMonths,
    AddYears,
    DateDiffYear,
    DateDiffMonth,
    DateDiffDay,
    DateDiffHour,
    DateDiffMinute,
    DateDiffSecond,
    DateDiffMilliSecond,
    DateDiffTick,
    Now,
    UtcNow,
    Today,
    GetDate,
    IsNull,
    IsNullOrEmpty,
    Contains,
    EndsWith,
}

/// The backend's dateadd only takes 32-bit amounts, so fractional amounts in
/// larger units are scaled to milliseconds and split into day and remainder.
fn dateadd_scaled(date: &str, amount: &str, factor: &str) -> String {
    format!(
        "dateadd(ms, cast((cast({1} as numeric(38,19)) * {2}) as bigint) % 86400000, \
         dateadd(day, cast((cast({1} as numeric(38,19)) * {2}) / 86400000 as bigint), {0}))",
        date, amount, factor
    )
}

/// Render a function call from already-rendered operand fragments.
pub fn format_function(op: FunctionOperator, operands: &[&str]) -> Result<String> {
    use FunctionOperator::*;
    let sql = match (op, operands) {
        (Acos, [a]) => format!("acos({})", a),
        (Asin, [a]) => format!("asin({})", a),
        (Atn, [a]) => format!("atan({})", a),
        // The server has no atn2; the half-angle identity covers the full
        // circle except x = 0, which the outer case handles
        (Atn2, [y, x]) => format!(
            "(case when {0} = 0 then (case when {1} >= 0 then 0 else atan(1) * 4 end) \
             else 2 * atan({0} / (sqrt({1} * {1} + {0} * {0}) + {1})) end)",
            y, x
        ),
        (Cosh, [a]) => format!("((exp({0}) + exp({0} * -1)) / 2)", a),
        (Sinh, [a]) => format!("((exp({0}) - exp({0} * -1)) / 2)", a),
        (Tanh, [a]) => format!("((exp({0} * 2) - 1) / (exp({0} * 2) + 1))", a),
        (Log, [a]) => format!("log({})", a),
        (Log, [a, base]) => format!("(log({}) / log({}))", a, base),
        (Log10, [a]) => format!("log10({})", a),
        (Round, [a]) => format!("round({}, 0)", a),
        (Round, [a, digits]) => format!("round({}, {})", a, digits),
        (Sqr, [a]) => format!("sqrt({})", a),
        (ToInt, [a]) => format!("cast({} AS integer)", a),
        (ToLong, [a]) => format!("cast({} AS bigint)", a),
        (ToFloat, [a]) => format!("cast({} AS real)", a),
        (ToDouble, [a]) => format!("cast({} AS double precision)", a),
        (ToDecimal, [a]) => format!("cast({} AS money)", a),
        (BigMul, [a, b]) => format!("cast({} * {} as bigint)", a, b),
        (Max, [a, b]) => format!("(case when {0} > {1} then {0} else {1} end)", a, b),
        (Min, [a, b]) => format!("(case when {0} < {1} then {0} else {1} end)", a, b),
        (Rnd, []) => "Rand()".to_string(),
        // charindex is 1-based; results are shifted to 0-based
        (CharIndex, [needle, haystack]) => format!("(charindex({}, {}) - 1)", needle, haystack),
        (CharIndex, [needle, haystack, start]) => format!(
            "(case when charindex({0}, substring({1}, {2} + 1, char_length({1}) - {2})) > 0 \
             then charindex({0}, substring({1}, {2} + 1, char_length({1}) - {2})) + {2} - 1 \
             else -1 end)",
            needle, haystack, start
        ),
        (CharIndex, [needle, haystack, start, count]) => format!(
            "(case when charindex({0}, substring({1}, {2} + 1, {3} - {2})) > 0 \
             then charindex({0}, substring({1}, {2} + 1, {3} - {2})) + {2} - 1 \
             else -1 end)",
            needle, haystack, start, count
        ),
        (PadLeft, [a, width]) => {
            format!("(replicate(' ', {1} - char_length({0})) + {0})", a, width)
        }
        (PadLeft, [a, width, pad]) => {
            format!("(replicate({2}, {1} - char_length({0})) + {0})", a, width, pad)
        }
        (PadRight, [a, width]) => {
            format!("({0} + replicate(' ', {1} - char_length({0})))", a, width)
        }
        (PadRight, [a, width, pad]) => {
            format!("({0} + replicate({2}, {1} - char_length({0})))", a, width, pad)
        }
        (Remove, [a, start]) => format!("substring({}, 1, {})", a, start),
        (Remove, [a, start, count]) => format!("stuff({0}, {1} + 1, {2}, null)", a, start, count),
        (GetMilliSecond, [a]) => format!("datepart(ms, {})", a),
        (AddTicks, [date, ticks]) => format!(
            "dateadd(ms, (cast({1} as bigint) / 10000) % 86400000, \
             dateadd(day, (cast({1} as bigint) / 10000) / 86400000, {0}))",
            date, ticks
        ),
        (AddMilliSeconds, [date, ms]) => format!("dateadd(ms, {}, {})", ms, date),
        (AddTimeSpan | AddSeconds, [date, amount]) => dateadd_scaled(date, amount, "1000"),
        (AddMinutes, [date, amount]) => dateadd_scaled(date, amount, "60000"),
        (AddHours, [date, amount]) => dateadd_scaled(date, amount, "3600000"),
        (AddDays, [date, amount]) => dateadd_scaled(date, amount, "86400000"),
        (AddMonths, [date, amount]) => format!("dateadd(month, {}, {})", amount, date),
        (AddYears, [date, amount]) => format!("dateadd(year, {}, {})", amount, date),
        (DateDiffYear, [a, b]) => format!("datediff(yy, {}, {})", a, b),
        (DateDiffMonth, [a, b]) => format!("datediff(mm, {}, {})", a, b),
        (DateDiffDay, [a, b]) => format!("datediff(dd, {}, {})", a, b),
        (DateDiffHour, [a, b]) => format!("datediff(hh, {}, {})", a, b),
        (DateDiffMinute, [a, b]) => format!("datediff(mi, {}, {})", a, b),
        (DateDiffSecond, [a, b]) => format!("datediff(ss, {}, {})", a, b),
        (DateDiffMilliSecond, [a, b]) => format!("datediff(ms, {}, {})", a, b),
        (DateDiffTick, [a, b]) => format!("(datediff(ms, {}, {}) * 10000)", a, b),
        (Now, []) => "getdate()".to_string(),
        (UtcNow, []) => "getutcdate()".to_string(),
        (Today, []) => "cast(cast(getdate() as date) as datetime)".to_string(),
        (GetDate, [a]) => format!("cast(cast({} as date) as datetime)", a),
        (IsNull, [a]) => format!("(({}) is null)", a),
        (IsNull, [a, fallback]) => format!("isnull({}, {})", a, fallback),
        (IsNullOrEmpty, [a]) => format!("(({0}) is null or ({0}) = '')", a),
        (Contains, [subject, needle]) => format!("(CharIndex({}, {}) > 0)", needle, subject),
        (EndsWith, [subject, suffix]) => {
            format!("(Right({0}, Len({1})) = ({1}))", subject, suffix)
        }
        _ => {
            return Err(AseError::Format(format!(
                "{:?} cannot take {} operand(s)",
                op,
                operands.len()
            )))
        }
    };
    Ok(sql)
}

/// Pattern characters the backend's `like` treats as wildcards.
const ACHTUNG_CHARS: [char; 4] = ['_', '%', '[', ']'];

/// Render `StartsWith(subject, pattern)`.
///
/// `subject` is the already-rendered subject expression; `process` renders an
/// operand to SQL (inlining a constant or naming a parameter). When the
/// pattern is a string operand its wildcard content decides the shape:
///
/// - no wildcard characters: a plain `like` over the pattern plus `%`
/// - a wildcard after position zero: a prefix `like` combined with an
///   explicit position check over the full pattern
/// - a leading wildcard, or a non-string pattern: the position check alone
pub fn format_starts_with<F>(
    process: &mut F,
    subject: &str,
    pattern: &Operand<'_>,
) -> Result<String>
where
    F: FnMut(&Operand<'_>) -> Result<String>,
{
    if let Some(s) = pattern.value().as_str() {
        match s.find(&ACHTUNG_CHARS[..]) {
            None => {
                let like = process(&Operand::Constant(PortableValue::text_owned(format!(
                    "{}%",
                    s
                ))))?;
                return Ok(format!("({} like {})", subject, like));
            }
            Some(idx) if idx > 0 => {
                let prefix = format!("{}%", &s[..idx]);
                let like = process(&Operand::Constant(PortableValue::text_owned(prefix)))?;
                let full = process(pattern)?;
                return Ok(format!(
                    "(({0} like {1}) And (CharIndex({2}, {0}) = 1))",
                    subject, like, full
                ));
            }
            Some(_) => {}
        }
    }
    let full = process(pattern)?;
    Ok(format!("(CharIndex({}, {}) = 1)", full, subject))
}

/// Decide how a parameter operand appears in SQL.
///
/// Constants of a few cheap kinds inline as literal text; everything else
/// gets a positional placeholder. Returns the SQL fragment and whether a
/// real parameter must be created for it.
pub fn parameter_name(operand: &Operand<'_>, index: usize) -> (String, bool) {
    if operand.is_constant() && !operand.value().is_null() {
        match operand.value() {
            PortableValue::Int32(v) => return (v.to_string(), false),
            PortableValue::Bool(v) => return (if *v { "1" } else { "0" }.to_string(), false),
            PortableValue::String(s) => return (format_string(s), false),
            _ => {}
        }
    }
    (format!("@p{}", index), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::literals::format_constant;

    fn render(op: FunctionOperator, operands: &[&str]) -> String {
        format_function(op, operands).unwrap()
    }

    // Inline constants, name everything else @p0, @p1, ...
    fn process_with_counter() -> impl FnMut(&Operand<'_>) -> crate::error::Result<String> {
        let mut index = 0usize;
        move |operand| {
            let (sql, created) = parameter_name(operand, index);
            if created {
                // parameter_name only inlines cheap constants; for tests,
                // inline the rest of the constants too
                if operand.is_constant() {
                    return format_constant(operand.value());
                }
                index += 1;
            }
            Ok(sql)
        }
    }

    #[test]
    fn test_binary_modulo_has_no_parentheses() {
        assert_eq!(format_binary(BinaryOperator::Modulo, "a", "b"), "a % b");
    }

    #[test]
    fn test_binary_bitwise_and_infix() {
        assert_eq!(format_binary(BinaryOperator::BitwiseAnd, "a", "b"), "(a & b)");
        assert_eq!(format_binary(BinaryOperator::BitwiseOr, "a", "b"), "(a | b)");
        assert_eq!(format_binary(BinaryOperator::BitwiseXor, "a", "b"), "(a ^ b)");
        assert_eq!(format_binary(BinaryOperator::Plus, "a", "b"), "(a + b)");
        assert_eq!(format_binary(BinaryOperator::NotEqual, "a", "b"), "(a <> b)");
    }

    #[test]
    fn test_trig_and_log_functions() {
        assert_eq!(render(FunctionOperator::Acos, &["x"]), "acos(x)");
        assert_eq!(render(FunctionOperator::Atn, &["x"]), "atan(x)");
        assert_eq!(
            render(FunctionOperator::Atn2, &["y", "x"]),
            "(case when y = 0 then (case when x >= 0 then 0 else atan(1) * 4 end) \
             else 2 * atan(y / (sqrt(x * x + y * y) + x)) end)"
        );
        assert_eq!(
            render(FunctionOperator::Cosh, &["x"]),
            "((exp(x) + exp(x * -1)) / 2)"
        );
        assert_eq!(render(FunctionOperator::Log, &["x"]), "log(x)");
        assert_eq!(render(FunctionOperator::Log, &["x", "2"]), "(log(x) / log(2))");
        assert_eq!(render(FunctionOperator::Log10, &["x"]), "log10(x)");
    }

    #[test]
    fn test_round_and_conversions() {
        assert_eq!(render(FunctionOperator::Round, &["x"]), "round(x, 0)");
        assert_eq!(render(FunctionOperator::Round, &["x", "2"]), "round(x, 2)");
        assert_eq!(render(FunctionOperator::Sqr, &["x"]), "sqrt(x)");
        assert_eq!(render(FunctionOperator::ToInt, &["x"]), "cast(x AS integer)");
        assert_eq!(render(FunctionOperator::ToLong, &["x"]), "cast(x AS bigint)");
        assert_eq!(render(FunctionOperator::ToFloat, &["x"]), "cast(x AS real)");
        assert_eq!(
            render(FunctionOperator::ToDouble, &["x"]),
            "cast(x AS double precision)"
        );
        assert_eq!(render(FunctionOperator::ToDecimal, &["x"]), "cast(x AS money)");
        assert_eq!(
            render(FunctionOperator::BigMul, &["a", "b"]),
            "cast(a * b as bigint)"
        );
    }

    #[test]
    fn test_minmax_and_random() {
        assert_eq!(
            render(FunctionOperator::Max, &["a", "b"]),
            "(case when a > b then a else b end)"
        );
        assert_eq!(
            render(FunctionOperator::Min, &["a", "b"]),
            "(case when a < b then a else b end)"
        );
        assert_eq!(render(FunctionOperator::Rnd, &[]), "Rand()");
    }

    #[test]
    fn test_charindex_shifts_to_zero_based() {
        assert_eq!(
            render(FunctionOperator::CharIndex, &["n", "h"]),
            "(charindex(n, h) - 1)"
        );
        let with_start = render(FunctionOperator::CharIndex, &["n", "h", "s"]);
        assert!(with_start.starts_with("(case when charindex(n, substring(h, s + 1, char_length(h) - s)) > 0"));
        let with_count = render(FunctionOperator::CharIndex, &["n", "h", "s", "c"]);
        assert!(with_count.contains("substring(h, s + 1, c - s)"));
    }

    #[test]
    fn test_padding_and_remove() {
        assert_eq!(
            render(FunctionOperator::PadLeft, &["s", "10"]),
            "(replicate(' ', 10 - char_length(s)) + s)"
        );
        assert_eq!(
            render(FunctionOperator::PadLeft, &["s", "10", "'.'"]),
            "(replicate('.', 10 - char_length(s)) + s)"
        );
        assert_eq!(
            render(FunctionOperator::PadRight, &["s", "10"]),
            "(s + replicate(' ', 10 - char_length(s)))"
        );
        assert_eq!(
            render(FunctionOperator::Remove, &["s", "3"]),
            "substring(s, 1, 3)"
        );
        assert_eq!(
            render(FunctionOperator::Remove, &["s", "3", "2"]),
            "stuff(s, 3 + 1, 2, null)"
        );
    }

    #[test]
    fn test_date_arithmetic() {
        assert_eq!(
            render(FunctionOperator::GetMilliSecond, &["d"]),
            "datepart(ms, d)"
        );
        assert_eq!(
            render(FunctionOperator::AddMilliSeconds, &["d", "n"]),
            "dateadd(ms, n, d)"
        );
        assert_eq!(
            render(FunctionOperator::AddSeconds, &["d", "n"]),
            "dateadd(ms, cast((cast(n as numeric(38,19)) * 1000) as bigint) % 86400000, \
             dateadd(day, cast((cast(n as numeric(38,19)) * 1000) / 86400000 as bigint), d))"
        );
        assert_eq!(
            render(FunctionOperator::AddTimeSpan, &["d", "n"]),
            render(FunctionOperator::AddSeconds, &["d", "n"])
        );
        let days = render(FunctionOperator::AddDays, &["d", "n"]);
        assert!(days.contains("* 86400000"));
        let ticks = render(FunctionOperator::AddTicks, &["d", "t"]);
        assert!(ticks.contains("cast(t as bigint) / 10000"));
        assert_eq!(
            render(FunctionOperator::AddMonths, &["d", "n"]),
            "dateadd(month, n, d)"
        );
        assert_eq!(
            render(FunctionOperator::AddYears, &["d", "n"]),
            "dateadd(year, n, d)"
        );
    }

    #[test]
    fn test_datediff_family() {
        let cases = [
            (FunctionOperator::DateDiffYear, "yy"),
            (FunctionOperator::DateDiffMonth, "mm"),
            (FunctionOperator::DateDiffDay, "dd"),
            (FunctionOperator::DateDiffHour, "hh"),
            (FunctionOperator::DateDiffMinute, "mi"),
            (FunctionOperator::DateDiffSecond, "ss"),
            (FunctionOperator::DateDiffMilliSecond, "ms"),
        ];
        for (op, unit) in cases {
            assert_eq!(render(op, &["a", "b"]), format!("datediff({}, a, b)", unit));
        }
        assert_eq!(
            render(FunctionOperator::DateDiffTick, &["a", "b"]),
            "(datediff(ms, a, b) * 10000)"
        );
    }

    #[test]
    fn test_current_date_functions() {
        assert_eq!(render(FunctionOperator::Now, &[]), "getdate()");
        assert_eq!(render(FunctionOperator::UtcNow, &[]), "getutcdate()");
        assert_eq!(
            render(FunctionOperator::Today, &[]),
            "cast(cast(getdate() as date) as datetime)"
        );
        assert_eq!(
            render(FunctionOperator::GetDate, &["d"]),
            "cast(cast(d as date) as datetime)"
        );
    }

    #[test]
    fn test_null_and_string_predicates() {
        assert_eq!(render(FunctionOperator::IsNull, &["a"]), "((a) is null)");
        assert_eq!(render(FunctionOperator::IsNull, &["a", "b"]), "isnull(a, b)");
        assert_eq!(
            render(FunctionOperator::IsNullOrEmpty, &["a"]),
            "((a) is null or (a) = '')"
        );
        assert_eq!(
            render(FunctionOperator::Contains, &["[C]", "'x'"]),
            "(CharIndex('x', [C]) > 0)"
        );
        assert_eq!(
            render(FunctionOperator::EndsWith, &["[C]", "'x'"]),
            "(Right([C], Len('x')) = ('x'))"
        );
    }

    #[test]
    fn test_wrong_arity_is_an_error() {
        assert!(format_function(FunctionOperator::Acos, &["a", "b"]).is_err());
        assert!(format_function(FunctionOperator::Log, &["a", "b", "c"]).is_err());
        assert!(format_function(FunctionOperator::Rnd, &["a"]).is_err());
    }

    #[test]
    fn test_starts_with_plain_pattern() {
        let mut process = process_with_counter();
        let sql = format_starts_with(
            &mut process,
            "[Name]",
            &Operand::Constant(PortableValue::from("abc")),
        )
        .unwrap();
        assert_eq!(sql, "([Name] like 'abc%')");
    }

    #[test]
    fn test_starts_with_interior_wildcard_adds_position_check() {
        let mut process = process_with_counter();
        let sql = format_starts_with(
            &mut process,
            "[Name]",
            &Operand::Constant(PortableValue::from("abc_def")),
        )
        .unwrap();
        assert_eq!(
            sql,
            "(([Name] like 'abc%') And (CharIndex('abc_def', [Name]) = 1))"
        );
    }

    #[test]
    fn test_starts_with_leading_wildcard_uses_position_check_only() {
        let mut process = process_with_counter();
        let sql = format_starts_with(
            &mut process,
            "[Name]",
            &Operand::Constant(PortableValue::from("_abc")),
        )
        .unwrap();
        assert_eq!(sql, "(CharIndex('_abc', [Name]) = 1)");
    }

    #[test]
    fn test_starts_with_non_string_pattern() {
        let mut process = process_with_counter();
        let sql = format_starts_with(
            &mut process,
            "[Code]",
            &Operand::Value(PortableValue::Int32(5)),
        )
        .unwrap();
        assert_eq!(sql, "(CharIndex(@p0, [Code]) = 1)");
    }

    #[test]
    fn test_parameter_name_inlines_cheap_constants() {
        assert_eq!(
            parameter_name(&Operand::Constant(PortableValue::Int32(123)), 0),
            ("123".to_string(), false)
        );
        assert_eq!(
            parameter_name(&Operand::Constant(PortableValue::Bool(true)), 0),
            ("1".to_string(), false)
        );
        assert_eq!(
            parameter_name(&Operand::Constant(PortableValue::from("o'hare")), 0),
            ("'o''hare'".to_string(), false)
        );
    }

    #[test]
    fn test_parameter_name_creates_placeholders_for_the_rest() {
        assert_eq!(
            parameter_name(&Operand::Value(PortableValue::Int32(123)), 0),
            ("@p0".to_string(), true)
        );
        assert_eq!(
            parameter_name(&Operand::Constant(PortableValue::Int64(1)), 3),
            ("@p3".to_string(), true)
        );
        assert_eq!(
            parameter_name(&Operand::Constant(PortableValue::Null), 2),
            ("@p2".to_string(), true)
        );
    }
}
