use std::fmt;

use super::common::{literal, nest, property_key};
use crate::config::QueryConfig;
use crate::query_planner::logical_expr::{SqlExpr, SubqueryKind, UnaryOperator};
use crate::select_plan::{OrderingExpr, ProjectionExpr, SourceExpr};

/// Convert a plan node to dialect text
pub trait ToSql {
    fn to_sql(&self, config: &QueryConfig) -> String;
}

impl ToSql for SqlExpr {
    fn to_sql(&self, config: &QueryConfig) -> String {
        match self {
            SqlExpr::Constant(constant) => literal(&constant.value),

            SqlExpr::Parameter(param) => format!("@{}", param.name),

            SqlExpr::Binary(binary) => format!(
                "({} {} {})",
                binary.left.to_sql(config),
                binary.operator.sql_symbol(),
                binary.right.to_sql(config)
            ),

            SqlExpr::Unary(unary) => match unary.operator {
                UnaryOperator::Not => format!("NOT({})", unary.operand.to_sql(config)),
                UnaryOperator::Negate => {
                    let operand = unary.operand.to_sql(config);
                    // `--` opens a line comment in the dialect
                    if SourceExpr::is_compatible(&unary.operand) || matches!(*unary.operand, SqlExpr::Parameter(_)) {
                        format!("-{}", operand)
                    } else {
                        format!("-({})", operand)
                    }
                }
            },

            SqlExpr::PropertyAccess(prop) => {
                format!("{}{}", prop.base.to_sql(config), property_key(&prop.name))
            }

            SqlExpr::ArrayIndex(index) => {
                format!("{}[{}]", index.array.to_sql(config), index.index.to_sql(config))
            }

            SqlExpr::FunctionCall(call) => format!("{}({})", call.name, join(&call.args, config)),

            SqlExpr::InlineArray(items) => format!("[{}]", join(items, config)),

            SqlExpr::In(in_expr) => format!(
                "{} {}IN ({})",
                in_expr.item.to_sql(config),
                if in_expr.negated { "NOT " } else { "" },
                join(&in_expr.values, config)
            ),

            SqlExpr::Subquery(subquery) => {
                let block = nest(&subquery.select.to_sql(config), config.indent_width);
                match subquery.kind {
                    SubqueryKind::Array => format!("ARRAY{}", block),
                    SubqueryKind::Exists => format!("EXISTS {}", block),
                    SubqueryKind::Scalar => block,
                }
            }

            SqlExpr::ScalarReference(r) => r.alias.clone(),
            SqlExpr::ObjectReference(r) => r.alias.clone(),
            SqlExpr::Fragment(text) => text.clone(),
        }
    }
}

fn join(items: &[SqlExpr], config: &QueryConfig) -> String {
    items
        .iter()
        .map(|item| item.to_sql(config))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ToSql for ProjectionExpr {
    fn to_sql(&self, config: &QueryConfig) -> String {
        match self {
            ProjectionExpr::Scalar(expr) => expr.to_sql(config),
            ProjectionExpr::Object(object) => object.access.to_sql(config),
        }
    }
}

impl ToSql for OrderingExpr {
    fn to_sql(&self, config: &QueryConfig) -> String {
        if self.ascending {
            self.expression.to_sql(config)
        } else {
            format!("{} DESC", self.expression.to_sql(config))
        }
    }
}

impl fmt::Display for SqlExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql(&QueryConfig::default()))
    }
}
