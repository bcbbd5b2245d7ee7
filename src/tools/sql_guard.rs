//! SELECT-only statement guard for `execute_query`.
//!
//! Two layers run before any database access:
//! 1. the trimmed, upper-cased text must start with `SELECT`;
//! 2. the text is parsed with sqlparser's PostgreSQL dialect and must be
//!    exactly one query statement.
//!
//! Text sqlparser cannot parse is passed through. It still runs as a single
//! prepared statement inside a `READ ONLY` transaction, so the server has the
//! final word.

use crate::error::{DbError, DbResult};
use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

mod error_messages {
    pub const NOT_SELECT: &str = "This tool only supports SELECT queries";
    pub const MULTIPLE_STATEMENTS: &str =
        "Only a single SELECT statement is allowed per query";
    pub const SELECT_INTO: &str = "SELECT INTO creates a table and is not allowed";
}

/// Validate SQL for the read-only query tool.
///
/// # Examples
///
/// ```
/// use pg_mcp_server::tools::sql_guard::validate_select;
///
/// assert!(validate_select("  select * from users").is_ok());
/// assert!(validate_select("DELETE FROM users").is_err());
/// ```
pub fn validate_select(sql: &str) -> DbResult<()> {
    if !has_select_prefix(sql) {
        return Err(DbError::query_validation(error_messages::NOT_SELECT));
    }

    let statements = match Parser::parse_sql(&PostgreSqlDialect {}, sql) {
        Ok(statements) => statements,
        Err(e) => {
            debug!(error = %e, "sqlparser could not parse query, deferring to the server");
            return Ok(());
        }
    };

    match statements.as_slice() {
        [statement] => validate_statement(statement),
        _ => Err(DbError::query_validation(
            error_messages::MULTIPLE_STATEMENTS,
        )),
    }
}

/// True iff the trimmed, upper-cased text begins with `SELECT`.
pub fn has_select_prefix(sql: &str) -> bool {
    sql.trim().to_uppercase().starts_with("SELECT")
}

fn validate_statement(statement: &Statement) -> DbResult<()> {
    match statement {
        Statement::Query(query) => match query.body.as_ref() {
            SetExpr::Select(select) if select.into.is_some() => {
                Err(DbError::query_validation(error_messages::SELECT_INTO))
            }
            _ => Ok(()),
        },
        _ => Err(DbError::query_validation(error_messages::NOT_SELECT)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(sql: &str) -> String {
        match validate_select(sql) {
            Err(DbError::QueryValidation { message }) => message,
            other => panic!("expected validation error for {:?}, got {:?}", sql, other),
        }
    }

    #[test]
    fn test_select_accepted() {
        assert!(validate_select("SELECT 1").is_ok());
        assert!(validate_select("select * from users where id = $1").is_ok());
        assert!(validate_select("\n\t  SeLeCt now()").is_ok());
        assert!(validate_select("SELECT 1;").is_ok());
    }

    #[test]
    fn test_union_accepted() {
        assert!(validate_select("SELECT 1 UNION ALL SELECT 2").is_ok());
    }

    #[test]
    fn test_non_select_rejected() {
        assert_eq!(rejected("DELETE FROM t"), error_messages::NOT_SELECT);
        assert_eq!(rejected("INSERT INTO t VALUES (1)"), error_messages::NOT_SELECT);
        assert_eq!(rejected("UPDATE t SET a = 1"), error_messages::NOT_SELECT);
        assert_eq!(rejected("DROP TABLE t"), error_messages::NOT_SELECT);
        assert_eq!(rejected(""), error_messages::NOT_SELECT);
    }

    #[test]
    fn test_cte_rejected_by_prefix() {
        assert_eq!(
            rejected("WITH x AS (SELECT 1) SELECT * FROM x"),
            error_messages::NOT_SELECT
        );
    }

    #[test]
    fn test_multiple_statements_rejected() {
        assert_eq!(
            rejected("SELECT 1; DELETE FROM users"),
            error_messages::MULTIPLE_STATEMENTS
        );
        assert_eq!(
            rejected("SELECT 1; SELECT 2"),
            error_messages::MULTIPLE_STATEMENTS
        );
    }

    #[test]
    fn test_select_into_rejected() {
        assert_eq!(
            rejected("SELECT * INTO new_table FROM users"),
            error_messages::SELECT_INTO
        );
    }

    #[test]
    fn test_unparseable_select_deferred() {
        // The server reports the syntax error.
        assert!(validate_select("SELECT FROM WHERE ((").is_ok());
    }

    #[test]
    fn test_prefix_only_checks_start() {
        assert!(has_select_prefix("  SELECT"));
        assert!(!has_select_prefix("EXPLAIN SELECT 1"));
        assert!(!has_select_prefix("-- comment\nSELECT 1"));
    }
}
