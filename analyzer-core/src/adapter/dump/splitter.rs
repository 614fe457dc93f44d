use crate::dialect::DialectFamily;
use once_cell::sync::Lazy;
use regex::Regex;

static DELIMITER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^DELIMITER\s+(\S+)\s*$").expect("valid regex"));

static GO_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^GO(?:\s+\d+)?\s*;?\s*$").expect("valid regex"));

static COPY_STDIN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^COPY\b.*\bFROM\s+stdin\b").expect("valid regex"));

// MSSQL 中这些语句体内的分号不结束语句，只有 GO 才结束
static MSSQL_ROUTINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:CREATE|ALTER)\s+(?:OR\s+ALTER\s+)?(?:PROC|PROCEDURE|FUNCTION|TRIGGER)\b")
        .expect("valid regex")
});

static DOLLAR_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$(?:[A-Za-z_][A-Za-z0-9_]*)?\$").expect("valid regex"));

/// dump 中切分出的一条语句
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    /// 去掉注释后的语句文本，不含结束符
    pub text: String,
    /// 语句起始行（从 1 开始）
    pub line: usize,
}

/// 将 dump 文本切分为语句
///
/// 注释被去掉，MySQL 可执行注释 `/*!40101 ... */` 的内容保留；
/// 支持 DELIMITER、PostgreSQL 美元引号与 COPY 数据块、MSSQL 的 GO 批分隔符，
/// psql 元命令（`\connect` 等）整行忽略。
pub fn split_statements(content: &str, family: DialectFamily) -> Vec<SqlStatement> {
    Splitter::new(content, family).run()
}

struct Splitter<'a> {
    content: &'a str,
    family: DialectFamily,
    pos: usize,
    line: usize,
    delimiter: String,
    current: String,
    current_line: usize,
    statements: Vec<SqlStatement>,
    at_line_start: bool,
    in_copy_data: bool,
    exec_comment_depth: usize,
    has_go_batches: bool,
}

impl<'a> Splitter<'a> {
    fn new(content: &'a str, family: DialectFamily) -> Self {
        let has_go_batches = family == DialectFamily::Mssql
            && content.lines().any(|line| GO_REGEX.is_match(line.trim()));

        Self {
            content,
            family,
            pos: 0,
            line: 1,
            delimiter: ";".to_string(),
            current: String::new(),
            current_line: 1,
            statements: Vec::new(),
            at_line_start: true,
            in_copy_data: false,
            exec_comment_depth: 0,
            has_go_batches,
        }
    }

    fn run(mut self) -> Vec<SqlStatement> {
        while self.pos < self.content.len() {
            if self.at_line_start {
                self.at_line_start = false;
                if self.handle_line_directive() {
                    continue;
                }
            }

            let content = self.content;
            let rest = &content[self.pos..];

            if rest.starts_with("--") {
                self.skip_line_comment();
                continue;
            }
            if rest.starts_with('#') && self.family == DialectFamily::Mysql {
                self.skip_line_comment();
                continue;
            }
            if rest.starts_with("/*!") || rest.starts_with("/*M!") {
                self.open_exec_comment();
                continue;
            }
            if rest.starts_with("*/") && self.exec_comment_depth > 0 {
                self.exec_comment_depth -= 1;
                self.pos += 2;
                self.current.push(' ');
                continue;
            }
            if rest.starts_with("/*") {
                self.skip_block_comment();
                continue;
            }
            if self.at_delimiter(rest) {
                let delimiter_len = self.delimiter.len();
                self.pos += delimiter_len;
                self.finish_statement();
                continue;
            }

            let Some(ch) = rest.chars().next() else {
                break;
            };
            match ch {
                '\'' => self.copy_quoted('\'', '\''),
                '"' => self.copy_quoted('"', '"'),
                '`' if self.family == DialectFamily::Mysql => self.copy_quoted('`', '`'),
                '[' if self.family == DialectFamily::Mssql => self.copy_quoted('[', ']'),
                '$' if self.family == DialectFamily::Postgres && self.copy_dollar_quoted() => {}
                _ => self.push_char(ch),
            }
        }

        self.flush();
        self.statements
    }

    /// 处理行首的指令行，返回 true 表示整行已消费
    fn handle_line_directive(&mut self) -> bool {
        let content = self.content;
        let line_end = content[self.pos..]
            .find('\n')
            .map(|p| self.pos + p)
            .unwrap_or(content.len());
        let trimmed = content[self.pos..line_end].trim();

        let consumed = if self.in_copy_data {
            if trimmed == "\\." {
                self.in_copy_data = false;
            }
            true
        } else {
            match self.family {
                DialectFamily::Mysql => match DELIMITER_REGEX.captures(trimmed) {
                    Some(caps) => {
                        self.flush();
                        self.delimiter = caps[1].to_string();
                        true
                    }
                    None => false,
                },
                DialectFamily::Mssql => {
                    if GO_REGEX.is_match(trimmed) {
                        self.flush();
                        true
                    } else {
                        false
                    }
                }
                DialectFamily::Postgres => trimmed.starts_with('\\') && self.current.trim().is_empty(),
            }
        };

        if consumed {
            self.pos = (line_end + 1).min(content.len());
            self.line += 1;
            self.at_line_start = true;
        }
        consumed
    }

    fn at_delimiter(&self, rest: &str) -> bool {
        if !rest.starts_with(self.delimiter.as_str()) {
            return false;
        }
        if self.delimiter == ";" && self.has_go_batches {
            return !MSSQL_ROUTINE_REGEX.is_match(self.current.trim_start());
        }
        true
    }

    fn push_char(&mut self, ch: char) {
        if self.current.trim().is_empty() && !ch.is_whitespace() {
            self.current_line = self.line;
        }
        if ch == '\n' {
            self.line += 1;
            self.at_line_start = true;
        }
        self.current.push(ch);
        self.pos += ch.len_utf8();
    }

    fn skip_line_comment(&mut self) {
        match self.content[self.pos..].find('\n') {
            Some(offset) => self.pos += offset,
            None => self.pos = self.content.len(),
        }
    }

    fn skip_block_comment(&mut self) {
        let body_start = self.pos + 2;
        let end = self.content[body_start..]
            .find("*/")
            .map(|p| body_start + p + 2)
            .unwrap_or(self.content.len());
        self.line += self.content[self.pos..end].matches('\n').count();
        self.pos = end;
        self.current.push(' ');
    }

    /// `/*!40101` 或 `/*M!100316`：跳过前缀与版本号，内容按普通 SQL 处理
    fn open_exec_comment(&mut self) {
        let prefix = if self.content[self.pos..].starts_with("/*M!") { 4 } else { 3 };
        self.pos += prefix;
        while let Some(ch) = self.content[self.pos..].chars().next() {
            if !ch.is_ascii_digit() {
                break;
            }
            self.pos += 1;
        }
        self.exec_comment_depth += 1;
        self.current.push(' ');
    }

    /// 原样复制引号内容，`''` 形式的转义与 MySQL 反斜杠转义都保留
    fn copy_quoted(&mut self, open: char, close: char) {
        self.push_char(open);
        let backslash_escapes = open == '\'' && self.family == DialectFamily::Mysql;

        while let Some(ch) = self.content[self.pos..].chars().next() {
            if backslash_escapes && ch == '\\' {
                self.push_char(ch);
                if let Some(next) = self.content[self.pos..].chars().next() {
                    self.push_char(next);
                }
                continue;
            }
            self.push_char(ch);
            if ch == close {
                if self.content[self.pos..].starts_with(close) {
                    self.push_char(close);
                    continue;
                }
                break;
            }
        }
    }

    /// `$tag$ ... $tag$`；不是美元引号时返回 false
    fn copy_dollar_quoted(&mut self) -> bool {
        let rest = &self.content[self.pos..];
        let Some(tag) = DOLLAR_TAG_REGEX.find(rest).map(|m| m.as_str().to_string()) else {
            return false;
        };

        let body_start = self.pos + tag.len();
        let end = self.content[body_start..]
            .find(tag.as_str())
            .map(|p| body_start + p + tag.len())
            .unwrap_or(self.content.len());

        let quoted = &self.content[self.pos..end];
        if self.current.trim().is_empty() {
            self.current_line = self.line;
        }
        self.line += quoted.matches('\n').count();
        self.current.push_str(quoted);
        self.pos = end;
        true
    }

    fn finish_statement(&mut self) {
        if self.family == DialectFamily::Postgres && COPY_STDIN_REGEX.is_match(self.current.trim()) {
            self.in_copy_data = true;
        }
        self.flush();
    }

    fn flush(&mut self) {
        let text = self.current.trim();
        if !text.is_empty() {
            self.statements.push(SqlStatement {
                text: text.to_string(),
                line: self.current_line,
            });
        }
        self.current.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(content: &str, family: DialectFamily) -> Vec<String> {
        split_statements(content, family)
            .into_iter()
            .map(|s| s.text)
            .collect()
    }

    #[test]
    fn test_split_strips_comments_and_tracks_lines() {
        let sql = "-- header\n/* block\ncomment */\nCREATE TABLE a (id INT);\n\n# mysql comment\nCREATE TABLE b (id INT);\n";
        let statements = split_statements(sql, DialectFamily::Mysql);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].text, "CREATE TABLE a (id INT)");
        assert_eq!(statements[0].line, 4);
        assert_eq!(statements[1].line, 7);
    }

    #[test]
    fn test_split_keeps_semicolons_in_strings() {
        let sql = "CREATE TABLE t (a VARCHAR(10) DEFAULT 'x;y', b TEXT COMMENT 'it''s; fine');SET x = 1;";
        let statements = texts(sql, DialectFamily::Mysql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("'x;y'"));
        assert!(statements[0].contains("'it''s; fine'"));
    }

    #[test]
    fn test_split_unwraps_mysql_executable_comments() {
        let sql = "/*!40101 SET NAMES utf8mb4 */;\n/*!50001 CREATE ALGORITHM=UNDEFINED */\n/*!50001 VIEW `v` AS select 1 AS `id` */;\n";
        let statements = texts(sql, DialectFamily::Mysql);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "SET NAMES utf8mb4");
        assert!(statements[1].starts_with("CREATE ALGORITHM=UNDEFINED"));
        assert!(statements[1].contains("VIEW `v` AS select 1"));
    }

    #[test]
    fn test_split_honours_delimiter_directive() {
        let sql = "DELIMITER ;;\nCREATE TRIGGER trg BEFORE INSERT ON t FOR EACH ROW BEGIN SET NEW.a = 1; END ;;\nDELIMITER ;\nCREATE TABLE t (a INT);\n";
        let statements = texts(sql, DialectFamily::Mysql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("SET NEW.a = 1; END"));
        assert_eq!(statements[1], "CREATE TABLE t (a INT)");
    }

    #[test]
    fn test_split_postgres_dollar_quotes_copy_and_meta_commands() {
        let sql = r#"\connect shop
CREATE FUNCTION f() RETURNS trigger AS $$
BEGIN
  NEW.updated = now(); RETURN NEW;
END;
$$ LANGUAGE plpgsql;
COPY public.users (id, name) FROM stdin;
1	alice; bob
\.
CREATE TABLE public.users (id integer);
"#;
        let statements = texts(sql, DialectFamily::Postgres);
        assert_eq!(statements.len(), 3);
        assert!(statements[0].contains("RETURN NEW;"));
        assert!(statements[1].starts_with("COPY public.users"));
        assert_eq!(statements[2], "CREATE TABLE public.users (id integer)");
    }

    #[test]
    fn test_split_mssql_go_batches() {
        let sql = "SET ANSI_NULLS ON\nGO\nCREATE PROCEDURE dbo.p AS BEGIN SELECT 1; SELECT 2; END\nGO\nCREATE TABLE [dbo].[t] ([id] [int] NOT NULL)\nGO\n";
        let statements = texts(sql, DialectFamily::Mssql);
        assert_eq!(statements.len(), 3);
        assert!(statements[1].contains("SELECT 1; SELECT 2; END"));
        assert!(statements[2].starts_with("CREATE TABLE [dbo].[t]"));
    }

    #[test]
    fn test_split_trailing_statement_without_terminator() {
        let statements = texts("CREATE TABLE a (id INT)", DialectFamily::Postgres);
        assert_eq!(statements, vec!["CREATE TABLE a (id INT)"]);
    }
}
