//! Schema introspection against `information_schema`.
//!
//! SQL lives in the `queries` submodule; table and schema names are always
//! bound as parameters, never interpolated.

use crate::db::executor::fetch_read_only;
use crate::db::pool::ConnectionPool;
use crate::error::{DbError, DbResult};
use crate::models::{ColumnDescriptor, ForeignKeyRef, QueryParam, TableSummary};
use sqlx::Row;
use sqlx::postgres::PgRow;
use std::collections::HashSet;
use tracing::debug;

/// Schema inspector for catalog metadata.
pub struct SchemaInspector;

impl SchemaInspector {
    /// Describe every column of `schema_name.table_name`, ordered by position.
    ///
    /// Fails with [`DbError::TableNotFound`] when the catalog has no columns
    /// for the table.
    pub async fn describe_table(
        pool: &ConnectionPool,
        schema_name: &str,
        table_name: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        let params = [
            QueryParam::from(schema_name),
            QueryParam::from(table_name),
        ];
        let rows = fetch_read_only(pool, queries::DESCRIBE_TABLE, &params).await?;

        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let column = column_from_row(row)?;
            if seen.insert(column.ordinal_position) {
                columns.push(column);
            }
        }

        if columns.is_empty() {
            return Err(DbError::table_not_found(schema_name, table_name));
        }

        debug!(
            schema = schema_name,
            table = table_name,
            columns = columns.len(),
            "Described table"
        );
        Ok(columns)
    }

    /// List the tables and views of a schema, ordered by name.
    pub async fn list_tables(
        pool: &ConnectionPool,
        schema_name: &str,
    ) -> DbResult<Vec<TableSummary>> {
        let params = [QueryParam::from(schema_name)];
        let rows = fetch_read_only(pool, queries::LIST_TABLES, &params).await?;

        rows.iter()
            .map(|row| -> DbResult<TableSummary> {
                Ok(TableSummary::new(
                    row.try_get::<String, _>("table_name")?,
                    row.try_get::<String, _>("table_type")?,
                ))
            })
            .collect()
    }
}

fn column_from_row(row: &PgRow) -> DbResult<ColumnDescriptor> {
    let is_nullable: String = row.try_get("is_nullable")?;
    let is_foreign_key: bool = row.try_get("is_foreign_key")?;

    let foreign_key = if is_foreign_key {
        Some(ForeignKeyRef {
            table_schema: optional_text(row, "foreign_table_schema")?,
            table_name: optional_text(row, "foreign_table_name")?,
            column_name: optional_text(row, "foreign_column_name")?,
            constraint_name: optional_text(row, "fk_constraint_name")?,
        })
    } else {
        None
    };

    Ok(ColumnDescriptor {
        column_name: row.try_get("column_name")?,
        data_type: row.try_get("full_data_type")?,
        is_nullable: is_nullable == "YES",
        column_default: row.try_get("column_default")?,
        ordinal_position: row.try_get("ordinal_position")?,
        is_primary_key: row.try_get("is_primary_key")?,
        is_foreign_key,
        is_unique: row.try_get("is_unique")?,
        max_length: ColumnDescriptor::reported(row.try_get("character_maximum_length")?),
        precision: ColumnDescriptor::reported(row.try_get("numeric_precision")?),
        scale: ColumnDescriptor::reported(row.try_get("numeric_scale")?),
        foreign_key,
    })
}

fn optional_text(row: &PgRow, column: &str) -> DbResult<String> {
    Ok(row
        .try_get::<Option<String>, _>(column)?
        .unwrap_or_default())
}

mod queries {
    /// `$1` = schema, `$2` = table.
    pub const DESCRIBE_TABLE: &str = r#"
        WITH column_info AS (
            SELECT
                c.column_name::text AS column_name,
                CASE
                    WHEN c.data_type = 'USER-DEFINED' THEN c.udt_name::text
                    ELSE c.data_type::text
                END AS full_data_type,
                c.is_nullable::text AS is_nullable,
                c.column_default::text AS column_default,
                c.character_maximum_length::int4 AS character_maximum_length,
                c.numeric_precision::int4 AS numeric_precision,
                c.numeric_scale::int4 AS numeric_scale,
                c.ordinal_position::int4 AS ordinal_position
            FROM information_schema.columns c
            WHERE c.table_schema = $1
              AND c.table_name = $2
        ),
        primary_keys AS (
            SELECT DISTINCT kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
             AND tc.table_name = kcu.table_name
            WHERE tc.constraint_type = 'PRIMARY KEY'
              AND tc.table_schema = $1
              AND tc.table_name = $2
        ),
        foreign_keys AS (
            SELECT DISTINCT ON (kcu.column_name)
                kcu.column_name::text AS column_name,
                rkcu.table_schema::text AS foreign_table_schema,
                rkcu.table_name::text AS foreign_table_name,
                rkcu.column_name::text AS foreign_column_name,
                tc.constraint_name::text AS fk_constraint_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
             AND tc.table_name = kcu.table_name
            JOIN information_schema.referential_constraints rc
              ON rc.constraint_name = tc.constraint_name
             AND rc.constraint_schema = tc.constraint_schema
            JOIN information_schema.key_column_usage rkcu
              ON rkcu.constraint_name = rc.unique_constraint_name
             AND rkcu.constraint_schema = rc.unique_constraint_schema
             AND rkcu.ordinal_position = kcu.position_in_unique_constraint
            WHERE tc.constraint_type = 'FOREIGN KEY'
              AND tc.table_schema = $1
              AND tc.table_name = $2
            ORDER BY kcu.column_name, tc.constraint_name
        ),
        unique_constraints AS (
            SELECT DISTINCT kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
             AND tc.table_name = kcu.table_name
            WHERE tc.constraint_type = 'UNIQUE'
              AND tc.table_schema = $1
              AND tc.table_name = $2
        )
        SELECT
            ci.column_name,
            ci.full_data_type,
            ci.is_nullable,
            ci.column_default,
            ci.character_maximum_length,
            ci.numeric_precision,
            ci.numeric_scale,
            ci.ordinal_position,
            (pk.column_name IS NOT NULL) AS is_primary_key,
            (fk.column_name IS NOT NULL) AS is_foreign_key,
            (uc.column_name IS NOT NULL) AS is_unique,
            fk.foreign_table_schema,
            fk.foreign_table_name,
            fk.foreign_column_name,
            fk.fk_constraint_name
        FROM column_info ci
        LEFT JOIN primary_keys pk ON ci.column_name = pk.column_name
        LEFT JOIN foreign_keys fk ON ci.column_name = fk.column_name
        LEFT JOIN unique_constraints uc ON ci.column_name = uc.column_name
        ORDER BY ci.ordinal_position
    "#;

    /// `$1` = schema.
    pub const LIST_TABLES: &str = r#"
        SELECT
            table_name::text AS table_name,
            table_type::text AS table_type
        FROM information_schema.tables
        WHERE table_schema = $1
        ORDER BY table_name
    "#;
}
