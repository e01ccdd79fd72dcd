use std::io::Write;

use docsql::config::QueryConfig;
use docsql::query_planner::logical_expr::{JsonType, Operator, SqlExpr};
use docsql::select_plan::{ErrorKind, OrderingExpr, PropertyRef, ReadItemInfo, SelectExpr};
use docsql::sql_generator::{debug_view, generate_sql};

fn joined_block(config: &QueryConfig) -> SelectExpr {
    let root = SqlExpr::object_ref("Blog", config.root_alias.as_str());
    let mut select = SelectExpr::for_entity("Blog", config);
    select.apply_predicate(SqlExpr::equal(
        SqlExpr::property(root.clone(), "Discriminator", JsonType::String),
        SqlExpr::constant("Blog"),
    ));

    let mut inner = SelectExpr::create_for_collection(
        SqlExpr::property(root.clone(), "Ints", JsonType::Array),
        "i",
        SqlExpr::scalar_ref("i", JsonType::Number),
    );
    inner.apply_predicate(SqlExpr::binary(
        Operator::GreaterThan,
        SqlExpr::scalar_ref("i", JsonType::Number),
        SqlExpr::parameter("floor", JsonType::Number),
    ));
    select.add_join(inner, config).expect("join");
    select
        .apply_ordering(OrderingExpr::new(
            SqlExpr::property(root, "Id", JsonType::Number),
            false,
        ))
        .expect("order");
    select.add_partition_key(PropertyRef::new("Region"), SqlExpr::constant("west"));
    select
}

#[test]
fn test_plan_round_trips_through_a_file() {
    let config = QueryConfig::default();
    let select = joined_block(&config);

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("plan.json");
    std::fs::write(&path, serde_json::to_string_pretty(&select).expect("serialize"))
        .expect("write");

    let content = std::fs::read_to_string(&path).expect("read");
    let loaded: SelectExpr = serde_json::from_str(&content).expect("deserialize");

    assert!(loaded.validate().is_ok());
    assert_eq!(loaded, select);
    assert_eq!(generate_sql(&loaded, &config), generate_sql(&select, &config));
    assert_eq!(
        debug_view(&loaded, &config),
        "Projection Mapping:\n    \
         Outer -> c\n    \
         Inner -> a\n\
         SELECT c AS Outer, a AS Inner\n\
         FROM root c\n\
         JOIN (\n    SELECT VALUE i\n    FROM i IN c[\"Ints\"]\n    WHERE (i > @floor)) a\n\
         WHERE (c[\"Discriminator\"] = \"Blog\")\n\
         ORDER BY c[\"Id\"] DESC"
    );
}

#[test]
fn test_sparse_plan_uses_defaults() {
    let loaded: SelectExpr = serde_json::from_str("{}").expect("deserialize");
    assert!(loaded.validate().is_ok());
    assert_eq!(generate_sql(&loaded, &QueryConfig::default()), "SELECT 1");
}

#[test]
fn test_point_read_with_join_fails_validation() {
    let config = QueryConfig::default();
    let mut value = serde_json::to_value(joined_block(&config)).expect("serialize");
    value["read_item"] = serde_json::to_value(
        ReadItemInfo::new("Blog").with_property(PropertyRef::new("id"), "id"),
    )
    .expect("serialize route");

    let loaded: SelectExpr = serde_json::from_value(value).expect("deserialize");
    assert_eq!(loaded.validate().map_err(|e| e.kind()), Err(ErrorKind::InvalidPlan));
}

#[test]
fn test_yaml_configuration_changes_rendering() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("docsql.yaml");
    let mut file = std::fs::File::create(&path).expect("create");
    writeln!(file, "root_alias: d\nroot_container: blogs\njoin_alias: j\nindent_width: 2")
        .expect("write");

    let config = QueryConfig::from_yaml_file(&path).expect("load");
    let select = joined_block(&config);

    assert_eq!(
        generate_sql(&select, &config),
        "SELECT d AS Outer, j AS Inner\n\
         FROM blogs d\n\
         JOIN (\n  SELECT VALUE i\n  FROM i IN d[\"Ints\"]\n  WHERE (i > @floor)) j\n\
         WHERE (d[\"Discriminator\"] = \"Blog\")\n\
         ORDER BY d[\"Id\"] DESC"
    );
}
