use crate::constants::snowflake::RESERVED_WORDS;
use once_cell::sync::Lazy;
use regex::Regex;

static SIMPLE_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("valid regex"));

/// 简单且非保留字的标识符原样输出，否则加双引号
pub(crate) fn quote_identifier(name: &str) -> String {
    if SIMPLE_IDENTIFIER.is_match(name) && !is_reserved(name) {
        return name.to_string();
    }
    format!("\"{}\"", strip_control(name).replace('"', "\"\""))
}

pub(crate) fn quote_identifiers(names: &[String]) -> String {
    names
        .iter()
        .map(|name| quote_identifier(name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_reserved(name: &str) -> bool {
    let upper = name.to_uppercase();
    RESERVED_WORDS.contains(&upper.as_str())
}

/// 单引号字符串字面量
pub(crate) fn string_literal(text: &str) -> String {
    format!(
        "'{}'",
        strip_control(text).replace('\\', "\\\\").replace('\'', "''")
    )
}

/// 控制字符（含换行）替换为空格
pub(crate) fn strip_control(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}
