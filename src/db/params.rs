//! Parameter binding for PostgreSQL statements.
//!
//! Binds `QueryParam` values positionally onto a sqlx query. Statements are
//! never cached: a cached statement keeps the parameter types of its first
//! use, while JSON parameters may change type between calls of the same SQL.

use crate::models::QueryParam;
use serde_json::Value as JsonValue;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgTypeInfo};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Encode, Postgres, Type};

/// A NULL sent with parameter type 0, leaving the server to infer the type
/// from the statement. `$1 IS NULL OR id = $1` then works for integer `id`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

/// Bind a parameter to a PostgreSQL query.
pub(crate) fn bind_param<'q>(
    query: Query<'q, Postgres, PgArguments>,
    param: &'q QueryParam,
) -> Query<'q, Postgres, PgArguments> {
    match param {
        QueryParam::Null => query.bind(UntypedNull),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Json(v) => query.bind(Json(v)),
    }
}

/// Declared type of a bound parameter, as sent in the Parse message.
pub(crate) fn param_type(param: &QueryParam) -> PgTypeInfo {
    match param {
        QueryParam::Null => UntypedNull::type_info(),
        QueryParam::Bool(_) => <bool as Type<Postgres>>::type_info(),
        QueryParam::Int(_) => <i64 as Type<Postgres>>::type_info(),
        QueryParam::Float(_) => <f64 as Type<Postgres>>::type_info(),
        QueryParam::String(_) => <String as Type<Postgres>>::type_info(),
        QueryParam::Json(_) => <Json<JsonValue> as Type<Postgres>>::type_info(),
    }
}

pub(crate) fn param_types(params: &[QueryParam]) -> Vec<PgTypeInfo> {
    params.iter().map(param_type).collect()
}

/// Bind every parameter in order, `params[0]` becoming `$1`.
pub(crate) fn bind_all<'q>(
    sql: &'q str,
    params: &'q [QueryParam],
) -> Query<'q, Postgres, PgArguments> {
    params
        .iter()
        .fold(sqlx::query(sql).persistent(false), |query, param| {
            bind_param(query, param)
        })
}
