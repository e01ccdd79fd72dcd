use std::sync::Arc;

use docsql::config::QueryConfig;
use docsql::query_planner::logical_expr::{JsonType, Operator, SqlExpr, SubqueryKind};
use docsql::select_plan::{
    MappedProjection, MemberStep, OrderingExpr, ParameterInliner, ParameterValues, PartitionKey,
    ProjectionMember, PropertyRef, SelectExpr, SourcePayload,
};
use docsql::sql_generator::generate_sql;
use serde_json::json;

fn config() -> QueryConfig {
    QueryConfig::default()
}

fn order_property(name: &str, ty: JsonType) -> SqlExpr {
    SqlExpr::property(SqlExpr::object_ref("Order", "c"), name, ty)
}

#[test]
fn test_where_clauses_conjoin() {
    let mut select = SelectExpr::for_entity("Order", &config());
    select.apply_predicate(SqlExpr::equal(
        order_property("Discriminator", JsonType::String),
        SqlExpr::constant("Order"),
    ));
    select.apply_predicate(SqlExpr::binary(
        Operator::GreaterThanEqual,
        order_property("Total", JsonType::Number),
        SqlExpr::parameter("minTotal", JsonType::Number),
    ));

    assert_eq!(
        generate_sql(&select, &config()),
        "SELECT c\n\
         FROM root c\n\
         WHERE ((c[\"Discriminator\"] = \"Order\") AND (c[\"Total\"] >= @minTotal))"
    );
    assert_eq!(select.parameter_names(), vec!["minTotal"]);
}

#[test]
fn test_parameter_collection_is_legalized() {
    let ids = SqlExpr::parameter("ids", JsonType::Array);
    let select = SelectExpr::create_for_collection(
        ids,
        "i",
        SqlExpr::scalar_ref("i", JsonType::Number),
    );

    let SourcePayload::Select(wrapper) = select.sources()[0].payload() else {
        panic!("parameter collections must be wrapped");
    };
    assert!(wrapper.uses_single_value_projection());
    assert_eq!(
        generate_sql(&select, &config()),
        "SELECT VALUE i\nFROM i IN (SELECT VALUE @ids)"
    );
}

#[test]
fn test_partition_key_resolution() {
    let mut select = SelectExpr::for_entity("Order", &config());
    assert_eq!(select.partition_key_value(&ParameterValues::new()), PartitionKey::None);

    select.add_partition_key(
        PropertyRef::new("Region"),
        SqlExpr::parameter("region", JsonType::String),
    );
    select.add_partition_key(PropertyRef::new("Year"), SqlExpr::constant(2024));

    let values = ParameterValues::from([("region".to_string(), json!("west"))]);
    let key = select.partition_key_value(&values);
    assert_eq!(key, PartitionKey::Composite(vec![json!("west"), json!(2024)]));
    assert_eq!(key.to_string(), "[\"west\", 2024]");

    let missing = select.partition_key_value(&ParameterValues::new());
    assert_eq!(missing, PartitionKey::Composite(vec![json!(null), json!(2024)]));
}

#[test]
fn test_join_freeze_and_print() {
    let mut customer = SelectExpr::for_entity("Customer", &config());
    customer.apply_predicate(SqlExpr::equal(
        SqlExpr::property(SqlExpr::object_ref("Customer", "c"), "Discriminator", JsonType::String),
        SqlExpr::constant("Customer"),
    ));

    let tags = SqlExpr::property(SqlExpr::object_ref("Customer", "c"), "Tags", JsonType::Array);
    let inner = SelectExpr::create_for_collection(tags, "t", SqlExpr::scalar_ref("t", JsonType::String));
    let remap = customer.add_join(inner, &config()).expect("join");

    let name = SqlExpr::property(SqlExpr::object_ref("Customer", "c"), "Name", JsonType::String);
    customer
        .bind_projection(
            ProjectionMember::root().append(MemberStep::field("Name")),
            name.clone(),
        )
        .expect("bind");
    customer
        .apply_ordering(OrderingExpr::new(name, true))
        .expect("order");
    customer.apply_projection().expect("freeze");

    let inner_member = remap
        .remap_inner(&ProjectionMember::root())
        .expect("inner moved")
        .clone();
    assert_eq!(
        customer.get_mapped_projection(&inner_member),
        Ok(MappedProjection::Column(1))
    );
    assert_eq!(
        generate_sql(&customer, &config()),
        "SELECT c AS Outer, a AS Inner, c[\"Name\"]\n\
         FROM root c\n\
         JOIN a IN c[\"Tags\"]\n\
         WHERE (c[\"Discriminator\"] = \"Customer\")\n\
         ORDER BY c[\"Name\"]"
    );
    assert!(customer.validate().is_ok());
}

#[test]
fn test_exists_filter_with_inlined_parameters() {
    let mut matching = SelectExpr::create_for_collection(
        order_property("Lines", JsonType::Array),
        "l",
        SqlExpr::scalar_ref("l", JsonType::Object),
    );
    matching.apply_predicate(SqlExpr::equal(
        SqlExpr::property(SqlExpr::scalar_ref("l", JsonType::Object), "Sku", JsonType::String),
        SqlExpr::parameter("sku", JsonType::String),
    ));

    let mut select = SelectExpr::for_entity("Order", &config());
    select.apply_predicate(SqlExpr::subquery(SubqueryKind::Exists, matching));
    select
        .apply_limit(SqlExpr::parameter("take", JsonType::Number))
        .expect("limit");
    let select = Arc::new(select);

    let values = ParameterValues::from([
        ("sku".to_string(), json!("A-1")),
        ("take".to_string(), json!(20)),
    ]);
    let inlined = ParameterInliner::inline(&select, &values).expect("inline");

    assert_eq!(
        inlined.to_string(),
        "SELECT c\n\
         FROM root c\n\
         WHERE EXISTS (\n    SELECT VALUE l\n    FROM l IN c[\"Lines\"]\n    WHERE (l[\"Sku\"] = \"A-1\"))\n\
         OFFSET 0 ROWS FETCH NEXT 20 ROWS ONLY"
    );
    assert_eq!(select.parameter_names(), vec!["sku", "take"]);
    assert!(inlined.parameter_names().is_empty());
    assert_eq!(select.sources(), inlined.sources());
}
