// ABOUTME: SQL text encoding for identifiers, schema statements and cell values
// ABOUTME: Every INSERT value in a dump passes through format_literal

use crate::db::Value;
use crate::error::{Error, Result};

/// SQLite keywords; a table named after one of these must be quoted
const KEYWORDS: &[&str] = &[
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS", "ASC",
    "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE", "CAST",
    "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS",
    "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DEFAULT",
    "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH", "DISTINCT", "DO", "DROP", "EACH",
    "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE", "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL",
    "FILTER", "FIRST", "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB",
    "GROUP", "GROUPS", "HAVING", "IF", "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED",
    "INITIALLY", "INNER", "INSERT", "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN",
    "KEY", "LAST", "LEFT", "LIKE", "LIMIT", "MATCH", "MATERIALIZED", "NATURAL", "NO", "NOT",
    "NOTHING", "NOTNULL", "NULL", "NULLS", "OF", "OFFSET", "ON", "OR", "ORDER", "OTHERS",
    "OUTER", "OVER", "PARTITION", "PLAN", "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE",
    "RANGE", "RECURSIVE", "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPLACE",
    "RESTRICT", "RETURNING", "RIGHT", "ROLLBACK", "ROW", "ROWS", "SAVEPOINT", "SELECT", "SET",
    "TABLE", "TEMP", "TEMPORARY", "THEN", "TIES", "TO", "TRANSACTION", "TRIGGER", "UNBOUNDED",
    "UNION", "UNIQUE", "UPDATE", "USING", "VACUUM", "VALUES", "VIEW", "VIRTUAL", "WHEN",
    "WHERE", "WINDOW", "WITH", "WITHOUT",
];

/// Render a table name so it can be embedded in a statement.
///
/// Plain names are emitted bare so that ordinary dumps stay readable; anything
/// else is double-quoted with embedded `"` doubled.
///
/// # Examples
///
/// ```
/// # use sqlite_dumper::export::literal::format_identifier;
/// assert_eq!(format_identifier("users"), "users");
/// assert_eq!(format_identifier("order"), "\"order\"");
/// assert_eq!(format_identifier("my \"t\""), "\"my \"\"t\"\"\"");
/// ```
pub fn format_identifier(name: &str) -> String {
    if is_plain_identifier(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');

    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(name))
}

/// Pass through a catalog cell that already holds valid SQL (a `CREATE ...`
/// body). No quoting or escaping is applied.
pub fn format_sql_text(value: &Value) -> Result<String> {
    match value {
        Value::Text(sql) => Ok(sql.clone()),
        other => Err(Error::UnsupportedValue(format!(
            "expected SQL text, found {}",
            other.kind_name()
        ))),
    }
}

/// Quote a string as an SQL text literal
///
/// A NUL cannot appear between quotes, so it is concatenated in as `char(0)`.
///
/// ```
/// # use sqlite_dumper::export::literal::format_text_literal;
/// assert_eq!(format_text_literal("b's"), "'b''s'");
/// assert_eq!(format_text_literal("a\0b"), "'a'||char(0)||'b'");
/// ```
pub fn format_text_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\0' => out.push_str("'||char(0)||'"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Encode one cell value as an SQL literal for an `INSERT ... VALUES` list
///
/// - Null → `NULL`
/// - Integer → decimal
/// - Real → 17 significant digits with trailing zeros dropped, always with a
///   `.` or exponent so it stays a real; infinities use SQLite's `1e999`
/// - Text → single-quoted, `'` doubled; NUL characters are spliced in with
///   `char(0)` since SQLite's tokenizer stops at a raw NUL
/// - Blob → `X'..'` with lowercase hex
///
/// # Errors
///
/// NaN has no literal form and yields [`Error::UnrepresentableFloat`].
pub fn format_literal(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok("NULL".to_string()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Real(f) => format_real(*f),
        Value::Text(s) => Ok(format_text_literal(s)),
        Value::Blob(bytes) => Ok(format!("X'{}'", hex::encode(bytes))),
    }
}

/// Significant digits in a real literal. Fewer can land on a neighbouring
/// double when SQLite parses the literal back.
const REAL_DIGITS: usize = 17;

fn format_real(f: f64) -> Result<String> {
    if f.is_nan() {
        return Err(Error::UnrepresentableFloat(f));
    }
    if f.is_infinite() {
        let text = if f.is_sign_positive() { "1e999" } else { "-1e999" };
        return Ok(text.to_string());
    }

    let scientific = format!("{:.*e}", REAL_DIGITS - 1, f.abs());
    let (mantissa, exponent) = scientific
        .split_once('e')
        .ok_or(Error::UnrepresentableFloat(f))?;
    let exponent: i32 = exponent
        .parse()
        .map_err(|_| Error::UnrepresentableFloat(f))?;

    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let digits = match digits.trim_end_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };

    let mut out = String::with_capacity(REAL_DIGITS + 8);
    if f.is_sign_negative() {
        out.push('-');
    }

    // Same layout rules as printf's %g, but always with a '.' or exponent
    match exponent {
        0..=16 => {
            let int_len = exponent as usize + 1;
            if digits.len() <= int_len {
                out.push_str(digits);
                out.push_str(&"0".repeat(int_len - digits.len()));
                out.push_str(".0");
            } else {
                out.push_str(&digits[..int_len]);
                out.push('.');
                out.push_str(&digits[int_len..]);
            }
        }
        -5..=-1 => {
            out.push_str("0.");
            out.push_str(&"0".repeat((-exponent - 1) as usize));
            out.push_str(digits);
        }
        _ => {
            out.push_str(&digits[..1]);
            if digits.len() > 1 {
                out.push('.');
                out.push_str(&digits[1..]);
            }
            out.push('e');
            out.push_str(&exponent.to_string());
        }
    }

    Ok(out)
}

/// Encode a whole row, one literal per cell in column order
pub fn format_row(row: &[Value]) -> Result<Vec<String>> {
    row.iter().map(format_literal).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_identifiers_are_bare() {
        assert_eq!(format_identifier("t"), "t");
        assert_eq!(format_identifier("user_events2"), "user_events2");
        assert_eq!(format_identifier("_private"), "_private");
    }

    #[test]
    fn test_unusual_identifiers_are_quoted() {
        assert_eq!(format_identifier("my table"), "\"my table\"");
        assert_eq!(format_identifier("2fast"), "\"2fast\"");
        assert_eq!(format_identifier("Select"), "\"Select\"");
        assert_eq!(format_identifier(""), "\"\"");
        assert_eq!(format_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(format_identifier("café"), "\"café\"");
    }

    #[test]
    fn test_sql_text_passes_through() {
        let sql = Value::Text("CREATE TABLE \"x y\" (name TEXT DEFAULT 'it''s')".to_string());
        assert_eq!(
            format_sql_text(&sql).unwrap(),
            "CREATE TABLE \"x y\" (name TEXT DEFAULT 'it''s')"
        );
        assert!(format_sql_text(&Value::Integer(1)).is_err());
    }

    #[test]
    fn test_format_null_and_numbers() {
        assert_eq!(format_literal(&Value::Null).unwrap(), "NULL");
        assert_eq!(format_literal(&Value::Integer(0)).unwrap(), "0");
        assert_eq!(format_literal(&Value::Integer(-42)).unwrap(), "-42");
        assert_eq!(
            format_literal(&Value::Integer(i64::MIN)).unwrap(),
            "-9223372036854775808"
        );
    }

    #[test]
    fn test_format_reals() {
        let cases = [
            (0.0, "0.0"),
            (-0.0, "-0.0"),
            (1.0, "1.0"),
            (-2.5, "-2.5"),
            (100.0, "100.0"),
            (123456.789, "123456.789"),
            (0.000125, "0.000125"),
            (0.1, "0.10000000000000001"),
            (1e16, "10000000000000000.0"),
            (1e17, "1e17"),
            (1e300, "1.0000000000000001e300"),
            (5e-324, "4.9406564584124654e-324"),
            (1.509641529021288e141, "1.5096415290212881e141"),
            (-3.444418313650998e-109, "-3.4444183136509978e-109"),
        ];
        for (f, expected) in cases {
            let literal = format_literal(&Value::Real(f)).unwrap();
            assert_eq!(literal, expected);
            assert_eq!(literal.parse::<f64>().unwrap().to_bits(), f.to_bits());
        }
    }

    #[test]
    fn test_format_non_finite_reals() {
        assert_eq!(format_literal(&Value::Real(f64::INFINITY)).unwrap(), "1e999");
        assert_eq!(
            format_literal(&Value::Real(f64::NEG_INFINITY)).unwrap(),
            "-1e999"
        );
        let err = format_literal(&Value::Real(f64::NAN)).unwrap_err();
        assert!(matches!(err, Error::UnrepresentableFloat(_)));
    }

    #[test]
    fn test_format_text() {
        assert_eq!(format_literal(&Value::from("a")).unwrap(), "'a'");
        assert_eq!(format_literal(&Value::from("b's")).unwrap(), "'b''s'");
        assert_eq!(format_literal(&Value::from("")).unwrap(), "''");
        assert_eq!(format_literal(&Value::from("''")).unwrap(), "''''''");
        assert_eq!(
            format_literal(&Value::from("line\nbreak\\")).unwrap(),
            "'line\nbreak\\'"
        );
    }

    #[test]
    fn test_format_text_with_nul() {
        assert_eq!(
            format_literal(&Value::from("a\0b")).unwrap(),
            "'a'||char(0)||'b'"
        );
        assert_eq!(format_text_literal("\0"), "''||char(0)||''");
        assert_eq!(format_text_literal("'\0"), "''''||char(0)||''");
    }

    #[test]
    fn test_format_blob() {
        assert_eq!(
            format_literal(&Value::Blob(vec![0x00, 0xab, 0xff])).unwrap(),
            "X'00abff'"
        );
        assert_eq!(format_literal(&Value::Blob(vec![])).unwrap(), "X''");
    }

    #[test]
    fn test_format_row_preserves_order() {
        let row = vec![Value::Integer(1), Value::Null, Value::from("x")];
        assert_eq!(format_row(&row).unwrap(), vec!["1", "NULL", "'x'"]);
        assert!(format_row(&[Value::Real(f64::NAN)]).is_err());
    }
}
