use serde::{Deserialize, Serialize};

/// 源库列类型描述
///
/// `raw` 保留适配器拿到的原始文本，其余字段是从中拆出的结构化信息，
/// 供类型映射使用。解析不做任何语义解释。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SourceType {
    pub raw: String,
    /// 小写、去掉修饰后的类型名，如 `varchar`、`timestamp with time zone`
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// ENUM / SET 的取值
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub unsigned: bool,
    #[serde(default)]
    pub array: bool,
    /// MSSQL `(max)` 长度
    #[serde(default)]
    pub max: bool,
}

/// 括号内数字表示长度的类型
const LENGTH_TYPES: &[&str] = &[
    "char",
    "varchar",
    "nchar",
    "nvarchar",
    "character",
    "character varying",
    "national character",
    "national character varying",
    "bpchar",
    "binary",
    "varbinary",
    "bit",
    "bit varying",
    "varbit",
    "tinyint",
    "smallint",
    "mediumint",
    "int",
    "integer",
    "bigint",
    "text",
    "blob",
];

/// 括号内数字表示精度/小数位的类型
const PRECISION_TYPES: &[&str] = &[
    "decimal",
    "numeric",
    "number",
    "dec",
    "fixed",
    "float",
    "double",
    "double precision",
    "real",
    "time",
    "timetz",
    "timestamp",
    "timestamptz",
    "datetime",
    "datetime2",
    "datetimeoffset",
    "time with time zone",
    "time without time zone",
    "timestamp with time zone",
    "timestamp without time zone",
    "interval",
];

impl SourceType {
    /// 从类型文本解析，如 `decimal(10,2) unsigned`、`nvarchar(max)`、`integer[]`、
    /// `enum('a','b')`、`timestamp(6) with time zone`、`[varchar](50)`
    pub fn parse(raw: &str) -> Self {
        let mut source_type = SourceType {
            raw: raw.trim().to_string(),
            ..Default::default()
        };

        let mut text = raw.trim().to_string();

        // 字符集/排序规则不属于类型本身
        let lower = text.to_lowercase();
        if let Some(cut) = [" character set ", " charset ", " collate "]
            .iter()
            .filter_map(|kw| lower.find(kw))
            .min()
        {
            text.truncate(cut);
        }

        // 数组：integer[] / _int4 以外的 ARRAY 写法
        while let Some(stripped) = text.strip_suffix("[]") {
            source_type.array = true;
            text = stripped.trim_end().to_string();
        }
        let lower_text = text.to_lowercase();
        if let Some(inner) = lower_text.strip_prefix("array<").and_then(|s| s.strip_suffix('>')) {
            source_type.array = true;
            text = inner.to_string();
        }

        // 括号参数与前后缀
        let (head, args, tail) = match text.find('(') {
            Some(open) => {
                let close = find_closing_paren(&text, open).unwrap_or(text.len());
                let args = text[open + 1..close.min(text.len())].to_string();
                let tail = if close < text.len() {
                    text[close + 1..].to_string()
                } else {
                    String::new()
                };
                (text[..open].to_string(), Some(args), tail)
            }
            None => (text.clone(), None, String::new()),
        };

        // 修饰词
        let mut words: Vec<String> = Vec::new();
        for word in format!("{head} {tail}").split_whitespace() {
            let word = word
                .trim_matches(|c| c == '[' || c == ']' || c == '"' || c == '`')
                .to_lowercase();
            match word.as_str() {
                "unsigned" => source_type.unsigned = true,
                "signed" | "zerofill" | "" => {}
                _ => words.push(word),
            }
        }
        source_type.name = words.join(" ");

        // pg_catalog.int4 之类的限定名
        if let Some((_, last)) = source_type.name.rsplit_once('.') {
            source_type.name = last.to_string();
        }

        if let Some(args) = args {
            source_type.apply_args(&args);
        }

        source_type
    }

    fn apply_args(&mut self, args: &str) {
        if matches!(self.name.as_str(), "enum" | "set") {
            self.values = split_quoted_values(args);
            return;
        }

        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() == 1 && parts[0].eq_ignore_ascii_case("max") {
            self.max = true;
            return;
        }

        let numbers: Vec<Option<u64>> = parts.iter().map(|p| p.parse::<u64>().ok()).collect();
        let name = self.name.as_str();
        match numbers.as_slice() {
            [Some(n)] if LENGTH_TYPES.contains(&name) => self.length = Some(*n),
            [Some(n)] if PRECISION_TYPES.contains(&name) => self.precision = u32::try_from(*n).ok(),
            [Some(n)] => self.length = Some(*n),
            [Some(p), Some(s)] => {
                self.precision = u32::try_from(*p).ok();
                self.scale = u32::try_from(*s).ok();
            }
            _ => {}
        }
    }

    /// 是否带有可判断的声明长度
    pub fn declared_length(&self) -> Option<u64> {
        if self.max { None } else { self.length }
    }
}

fn find_closing_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quote = false;
    for (idx, ch) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match ch {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// 拆分 `'a','b''c'` 形式的取值列表
fn split_quoted_values(args: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = args.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' if in_quote && chars.peek() == Some(&'\'') => {
                current.push('\'');
                chars.next();
            }
            '\'' => {
                if in_quote {
                    values.push(std::mem::take(&mut current));
                }
                in_quote = !in_quote;
            }
            '\\' if in_quote => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            _ if in_quote => current.push(ch),
            _ => {}
        }
    }

    values
}
