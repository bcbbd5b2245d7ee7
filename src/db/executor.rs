//! Read-only statement execution.
//!
//! Every tool statement runs through [`fetch_read_only`]: one connection is
//! checked out, a `READ ONLY` transaction is opened, the statement is executed
//! as a prepared statement with positional binds, and the transaction is
//! committed. The whole unit is bounded by the pool's command timeout.
//!
//! Rows are read in binary format. Column types with no binary output (such
//! as `aclitem`) or no JSON mapping are cast to `text` by wrapping the
//! statement, after a describe round trip reveals the result columns.

use crate::db::params::{bind_all, param_types};
use crate::db::pool::ConnectionPool;
use crate::db::types::needs_text_cast;
use crate::error::{DbError, DbResult};
use crate::models::QueryParam;
use sqlx::postgres::PgRow;
use sqlx::{Column, Connection, Executor, Statement};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// Run one statement in a read-only transaction and return every row.
///
/// The connection goes back to the pool on every exit path. If the returned
/// future is dropped mid-statement the transaction is rolled back before the
/// connection is reused.
pub async fn fetch_read_only(
    pool: &ConnectionPool,
    sql: &str,
    params: &[QueryParam],
) -> DbResult<Vec<PgRow>> {
    let command_timeout = pool.command_timeout();
    let start = Instant::now();

    debug!(
        params = params.len(),
        timeout_secs = command_timeout.as_secs(),
        "Executing read-only statement"
    );

    let mut conn = pool.acquire().await?;

    let work = async {
        // Outside the transaction, so a failed describe cannot abort it
        let describe = describe_sql(sql);
        let described = (&mut *conn)
            .prepare_with(&describe, &param_types(params))
            .await?;
        let columns: Vec<(&str, bool)> = described
            .columns()
            .iter()
            .map(|col| (col.name(), needs_text_cast(col.type_info())))
            .collect();
        let rewritten = cast_columns_to_text(sql, &columns);
        if rewritten.is_some() {
            debug!("Casting undecodable columns to text");
        }
        let statement = rewritten.as_deref().unwrap_or(sql);

        let mut tx = conn.begin().await?;
        (&mut *tx)
            .execute(transaction_preamble(command_timeout).as_str())
            .await?;
        let rows = bind_all(statement, params).fetch_all(&mut *tx).await?;
        tx.commit().await?;
        Ok::<_, sqlx::Error>(rows)
    };

    let rows = match timeout(command_timeout, work).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(DbError::timeout(
                "query execution",
                command_timeout.as_secs(),
            ));
        }
    };

    debug!(
        rows = rows.len(),
        execution_time_ms = start.elapsed().as_millis() as u64,
        "Statement completed"
    );
    Ok(rows)
}

/// Session settings applied at the start of every tool transaction.
///
/// The server-side `statement_timeout` mirrors the client-side bound so an
/// abandoned statement does not keep running on the server.
fn transaction_preamble(command_timeout: Duration) -> String {
    format!(
        "SET TRANSACTION READ ONLY; SET LOCAL statement_timeout = {}",
        command_timeout.as_millis()
    )
}

/// Text used for the describe round trip. It differs from `sql` so the
/// cached describe statement is never picked up by the execution itself.
fn describe_sql(sql: &str) -> String {
    format!("{}\n-- describe", sql)
}

/// Wrap `sql` so the flagged columns come back as `text`, keeping every
/// column's name and position. `None` when no column is flagged.
fn cast_columns_to_text(sql: &str, columns: &[(&str, bool)]) -> Option<String> {
    if !columns.iter().any(|(_, cast)| *cast) {
        return None;
    }

    let select: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, (name, cast))| {
            let cast = if *cast { "::text" } else { "" };
            format!("\"_c{}\"{} AS {}", i + 1, cast, quote_ident(name))
        })
        .collect();
    let aliases: Vec<String> = (1..=columns.len())
        .map(|i| format!("\"_c{}\"", i))
        .collect();
    let inner = sql.trim_end().trim_end_matches(';').trim_end();

    Some(format!(
        "SELECT {} FROM (\n{}\n) AS _q({})",
        select.join(", "),
        inner,
        aliases.join(", ")
    ))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
