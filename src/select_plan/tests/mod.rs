//! Scenario tests for query block construction, composition and rendering.

use crate::config::QueryConfig;
use crate::query_planner::logical_expr::{JsonType, Operator, SqlExpr};
use crate::select_plan::SelectExpr;


fn config() -> QueryConfig {
    QueryConfig::default()
}

fn entity(name: &str) -> SelectExpr {
    SelectExpr::for_entity(name, &config())
}

fn root(entity_type: &str) -> SqlExpr {
    SqlExpr::object_ref(entity_type, "c")
}

fn prop(entity_type: &str, name: &str, ty: JsonType) -> SqlExpr {
    SqlExpr::property(root(entity_type), name, ty)
}

fn discriminator(entity_type: &str) -> SqlExpr {
    SqlExpr::equal(
        prop(entity_type, "Discriminator", JsonType::String),
        SqlExpr::constant(entity_type),
    )
}

fn greater(left: SqlExpr, right: SqlExpr) -> SqlExpr {
    SqlExpr::binary(Operator::GreaterThan, left, right)
}

fn int_var(alias: &str) -> SqlExpr {
    SqlExpr::scalar_ref(alias, JsonType::Number)
}
