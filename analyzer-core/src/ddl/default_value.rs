use super::identifier::string_literal;
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").expect("valid regex")
});

/// 等价于当前时间戳的源库写法（大写）
const TIMESTAMP_FUNCTIONS: &[&str] = &[
    "NOW()",
    "GETDATE()",
    "SYSDATETIME()",
    "LOCALTIMESTAMP",
    "LOCALTIMESTAMP()",
    "TRANSACTION_TIMESTAMP()",
    "STATEMENT_TIMESTAMP()",
];

const NUMERIC_TARGETS: &[&str] = &["NUMBER", "INTEGER", "BIGINT", "SMALLINT", "FLOAT", "DOUBLE"];

/// 把源库默认值翻译为目标库写法；函数调用、序列等无法翻译的返回 None
pub(crate) fn translate_default(raw: &str, target_type: &str) -> Option<String> {
    let value = unwrap_parens(strip_cast(unwrap_parens(raw.trim())));
    let upper = value.to_uppercase();

    if upper == "NULL" {
        return Some("NULL".to_string());
    }
    if upper.starts_with("CURRENT_TIMESTAMP") || TIMESTAMP_FUNCTIONS.contains(&upper.as_str()) {
        return Some("CURRENT_TIMESTAMP()".to_string());
    }
    if upper == "CURRENT_DATE" || upper == "CURRENT_DATE()" {
        return Some("CURRENT_DATE()".to_string());
    }
    if upper == "TRUE" || upper == "FALSE" {
        return Some(upper);
    }

    let is_boolean = target_type == "BOOLEAN";
    let is_numeric = NUMERIC_TARGETS.iter().any(|t| target_type.starts_with(t));

    if let Some(text) = unquote(value) {
        if is_boolean {
            return boolean_literal(&text);
        }
        if is_numeric {
            // MySQL dump 会给数值默认值加引号
            return NUMBER_LITERAL.is_match(&text).then_some(text);
        }
        return Some(string_literal(&text));
    }

    if NUMBER_LITERAL.is_match(value) {
        if is_boolean {
            return boolean_literal(value);
        }
        return Some(value.to_string());
    }

    None
}

/// MySQL information_schema 中的默认值：字符串字面量不带引号，表达式形如 `uuid()`；
/// MariaDB 的目录值已带引号
pub(crate) fn translate_catalog_default(raw: &str, target_type: &str) -> Option<String> {
    let value = raw.trim();
    let upper = value.to_uppercase();
    if value.starts_with('\'')
        || value.ends_with(')')
        || upper == "NULL"
        || upper.starts_with("CURRENT_")
    {
        return translate_default(value, target_type);
    }
    translate_default(&format!("'{}'", value.replace('\'', "''")), target_type)
}

fn boolean_literal(text: &str) -> Option<String> {
    match text.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "y" | "yes" => Some("TRUE".to_string()),
        "0" | "false" | "f" | "n" | "no" => Some("FALSE".to_string()),
        _ => None,
    }
}

/// `'it''s'` / `N'abc'` -> 去引号后的文本；引号不成对时返回 None
fn unquote(value: &str) -> Option<String> {
    let body = match value.strip_prefix(&['N', 'n'][..]) {
        Some(rest) if rest.starts_with('\'') => rest,
        _ => value,
    };
    let inner = body.strip_prefix('\'')?.strip_suffix('\'')?;

    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\'' && chars.next() != Some('\'') {
            return None;
        }
        text.push(ch);
    }
    Some(text)
}

/// 去掉包住整个表达式的括号：`((0))` -> `0`
fn unwrap_parens(mut value: &str) -> &str {
    while value.starts_with('(') && value.ends_with(')') && wraps_whole(value) {
        value = value[1..value.len() - 1].trim();
    }
    value
}

fn wraps_whole(value: &str) -> bool {
    let mut depth = 0usize;
    let mut in_quote = false;
    let last = value.len() - 1;
    for (idx, ch) in value.char_indices() {
        match ch {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth = depth.saturating_sub(1);
                if depth == 0 && idx != last {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// 去掉 PostgreSQL 的 `::type` 类型转换
fn strip_cast(value: &str) -> &str {
    let mut in_quote = false;
    let bytes = value.as_bytes();
    for idx in 0..bytes.len() {
        match bytes[idx] {
            b'\'' => in_quote = !in_quote,
            b':' if !in_quote && bytes.get(idx + 1) == Some(&b':') => {
                return value[..idx].trim_end();
            }
            _ => {}
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_defaults() {
        for raw in ["CURRENT_TIMESTAMP", "now()", "(getdate())", "CURRENT_TIMESTAMP(6)"] {
            assert_eq!(
                translate_default(raw, "TIMESTAMP_NTZ").as_deref(),
                Some("CURRENT_TIMESTAMP()"),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_numeric_and_boolean_defaults() {
        assert_eq!(translate_default("'0.00'", "NUMBER(10,2)").as_deref(), Some("0.00"));
        assert_eq!(translate_default("((0))", "NUMBER(19,4)").as_deref(), Some("0"));
        assert_eq!(translate_default("-1", "INTEGER").as_deref(), Some("-1"));
        assert_eq!(translate_default("'1'", "BOOLEAN").as_deref(), Some("TRUE"));
        assert_eq!(translate_default("((0))", "BOOLEAN").as_deref(), Some("FALSE"));
        assert_eq!(translate_default("false", "BOOLEAN").as_deref(), Some("FALSE"));
        assert_eq!(translate_default("'abc'", "INTEGER"), None);
    }

    #[test]
    fn test_string_defaults() {
        assert_eq!(
            translate_default("'pending'::public.order_status", "VARCHAR").as_deref(),
            Some("'pending'")
        );
        assert_eq!(translate_default("N'it''s'", "VARCHAR").as_deref(), Some("'it''s'"));
        assert_eq!(translate_default("NULL", "VARCHAR").as_deref(), Some("NULL"));
    }

    #[test]
    fn test_untranslatable_defaults() {
        assert_eq!(translate_default("uuid()", "VARCHAR(36)"), None);
        assert_eq!(
            translate_default("nextval('users_id_seq'::regclass)", "INTEGER"),
            None
        );
        assert_eq!(translate_default("(newid())", "VARCHAR(36)"), None);
        assert_eq!(translate_default("b'1'", "BINARY"), None);
    }

    #[test]
    fn test_catalog_defaults_are_unquoted_literals() {
        let cases = [
            ("active", "VARCHAR(20)", Some("'active'")),
            ("it's", "VARCHAR(20)", Some("'it''s'")),
            ("5", "VARCHAR(20)", Some("'5'")),
            ("0.00", "NUMBER(10,2)", Some("0.00")),
            ("1", "BOOLEAN", Some("TRUE")),
            ("CURRENT_TIMESTAMP", "TIMESTAMP_NTZ", Some("CURRENT_TIMESTAMP()")),
            ("'quoted'", "VARCHAR(20)", Some("'quoted'")),
            ("uuid()", "VARCHAR(36)", None),
            ("abc", "INTEGER", None),
        ];
        for (raw, target, expected) in cases {
            assert_eq!(translate_catalog_default(raw, target).as_deref(), expected, "{raw}");
        }
    }

    #[test]
    fn test_unwrap_parens_keeps_partial_groups() {
        assert_eq!(unwrap_parens("((0))"), "0");
        assert_eq!(unwrap_parens("(a) + (b)"), "(a) + (b)");
        assert_eq!(unwrap_parens("('(x)')"), "'(x)'");
    }
}
