//! Statements and their read/write classification.

use crate::value::Value;

/// Whether a statement produces a row set or a change count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Read,
    Write,
}

const READ_PREFIXES: &[&str] = &["SELECT", "PRAGMA"];

/// Statements whose change count the engine actually updates.
const DML_PREFIXES: &[&str] = &["INSERT", "UPDATE", "DELETE", "REPLACE", "WITH"];

/// Case-insensitive prefix test on the trimmed text.
fn starts_with_any(text: &str, prefixes: &[&str]) -> bool {
    let head = text.trim_start();
    prefixes.iter().any(|prefix| {
        head.get(..prefix.len())
            .is_some_and(|start| start.eq_ignore_ascii_case(prefix))
    })
}

impl StatementKind {
    /// A statement is a read when its trimmed text starts with `SELECT` or
    /// `PRAGMA`, in any case. Everything else is a write.
    pub fn classify(text: &str) -> Self {
        if starts_with_any(text, READ_PREFIXES) {
            Self::Read
        } else {
            Self::Write
        }
    }
}

/// SQL text with positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Append the next positional parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    pub fn kind(&self) -> StatementKind {
        StatementKind::classify(&self.text)
    }

    /// True for data-modifying statements. DDL and transaction control leave
    /// the engine's change counter untouched.
    pub(crate) fn is_dml(&self) -> bool {
        starts_with_any(&self.text, DML_PREFIXES)
    }

    /// Single-line, length-capped rendering for log lines.
    pub(crate) fn preview(&self) -> String {
        let flat = self.text.split_whitespace().collect::<Vec<_>>().join(" ");
        match flat.char_indices().nth(80) {
            Some((cut, _)) => format!("{}...", &flat[..cut]),
            None => flat,
        }
    }
}

impl From<&str> for Statement {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_whitespace_and_case_are_ignored() {
        assert_eq!(StatementKind::classify("  select * from products"), StatementKind::Read);
        assert_eq!(StatementKind::classify("\n\tPragma table_info(products)"), StatementKind::Read);
        assert_eq!(StatementKind::classify("SELECT 1"), StatementKind::Read);
    }

    #[test]
    fn everything_else_is_a_write() {
        assert_eq!(StatementKind::classify("INSERT INTO t VALUES (1)"), StatementKind::Write);
        assert_eq!(StatementKind::classify("UPDATE t SET a = 1"), StatementKind::Write);
        assert_eq!(StatementKind::classify("WITH x AS (SELECT 1) SELECT * FROM x"), StatementKind::Write);
        assert_eq!(StatementKind::classify("sel"), StatementKind::Write);
        assert_eq!(StatementKind::classify(""), StatementKind::Write);
    }

    #[test]
    fn only_data_changes_count_as_dml() {
        assert!(Statement::new(" insert into t values (1)").is_dml());
        assert!(Statement::new("DELETE FROM t").is_dml());
        assert!(!Statement::new("CREATE TABLE t (a)").is_dml());
        assert!(!Statement::new("BEGIN").is_dml());
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        assert_eq!(StatementKind::classify("ééé"), StatementKind::Write);
    }

    #[test]
    fn bind_keeps_parameter_order() {
        let stmt = Statement::new("INSERT INTO t VALUES (?, ?, ?)")
            .bind(1)
            .bind("two")
            .bind(None::<i64>);
        assert_eq!(
            stmt.params,
            vec![Value::Integer(1), Value::Text("two".into()), Value::Null]
        );
    }

    #[test]
    fn preview_flattens_and_truncates() {
        let stmt = Statement::new(format!("SELECT\n  {}", "x".repeat(200)));
        let preview = stmt.preview();
        assert!(!preview.contains('\n'));
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 83);
    }
}
