//! Renders query blocks as document SQL dialect text.

use crate::config::QueryConfig;
use crate::select_plan::{OrderingExpr, ProjectionExpr, SelectExpr};

mod common;
mod to_sql;
mod to_sql_query;

pub use to_sql::ToSql;
pub use to_sql_query::debug_view;

pub fn generate_sql(select: &SelectExpr, config: &QueryConfig) -> String {
    select.to_sql(config)
}

pub(crate) fn projection_expr_to_sql(expr: &ProjectionExpr) -> String {
    expr.to_sql(&QueryConfig::default())
}

pub(crate) fn orderings_to_sql(orderings: &[OrderingExpr]) -> String {
    let config = QueryConfig::default();
    orderings
        .iter()
        .map(|o| o.to_sql(&config))
        .collect::<Vec<_>>()
        .join(", ")
}
