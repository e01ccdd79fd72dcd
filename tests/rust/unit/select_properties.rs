//! Property-based tests for query block mutators
//!
//! - Freezing a projection is idempotent and yields unique column aliases
//! - Adding a structurally equal column reuses the existing one
//! - LIMIT/OFFSET follow the dialect's one-way paging rules
//! - Sort keys cannot be changed once DISTINCT or paging is applied
//! - An identity rewrite shares the whole tree

use std::sync::Arc;

use docsql::config::QueryConfig;
use docsql::query_planner::logical_expr::{JsonType, SqlExpr};
use docsql::select_plan::{
    MemberStep, OrderingExpr, ProjectionExpr, ProjectionMapping, ProjectionMember, SelectExpr,
    SelectVisitor,
};
use proptest::prelude::*;

struct Identity;

impl SelectVisitor for Identity {}

/// Strategy for JSON property names, mixed case so aliases can collide
fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][a-z]{0,4}"
}

fn property(name: &str) -> SqlExpr {
    SqlExpr::property(SqlExpr::object_ref("Blog", "c"), name, JsonType::String)
}

/// A block whose shape binds each member name to a property
fn shaped(members: &[String], properties: &[String]) -> SelectExpr {
    let mut select = SelectExpr::for_entity("Blog", &QueryConfig::default());
    let mapping: ProjectionMapping<ProjectionExpr> = members
        .iter()
        .zip(properties)
        .map(|(member, name)| {
            (
                ProjectionMember::root().append(MemberStep::field(member.as_str())),
                ProjectionExpr::from(property(name)),
            )
        })
        .collect();
    select
        .replace_projection_mapping(mapping)
        .expect("pending block accepts a mapping");
    select
}

#[derive(Debug, Clone)]
enum PagingOp {
    Limit(i64),
    Offset(i64),
}

fn paging_strategy() -> impl Strategy<Value = PagingOp> {
    prop_oneof![
        (0i64..100).prop_map(PagingOp::Limit),
        (0i64..100).prop_map(PagingOp::Offset),
    ]
}

proptest! {
    #[test]
    fn prop_freeze_is_idempotent(
        members in prop::collection::vec(name_strategy(), 1..8),
        properties in prop::collection::vec(name_strategy(), 8),
    ) {
        let mut select = shaped(&members, &properties);
        select.apply_projection().unwrap();
        let first = select.clone();
        select.apply_projection().unwrap();

        prop_assert_eq!(&select, &first);
        prop_assert!(select.validate().is_ok(), "column aliases must be unique");
    }

    #[test]
    fn prop_equal_columns_are_shared(
        properties in prop::collection::vec(name_strategy(), 1..10),
    ) {
        let mut select = SelectExpr::for_entity("Blog", &QueryConfig::default());
        select.clear_projection_mapping();

        let first: Vec<usize> = properties
            .iter()
            .map(|name| select.add_to_projection(property(name), None).unwrap())
            .collect();
        let second: Vec<usize> = properties
            .iter()
            .map(|name| select.add_to_projection(property(name), None).unwrap())
            .collect();

        let mut distinct = properties.clone();
        distinct.sort();
        distinct.dedup();

        prop_assert_eq!(first, second);
        prop_assert_eq!(select.projection().len(), distinct.len());

        let mut aliases: Vec<String> = select
            .projection()
            .iter()
            .map(|column| column.alias.to_lowercase())
            .collect();
        aliases.sort();
        aliases.dedup();
        prop_assert_eq!(aliases.len(), distinct.len());
    }

    #[test]
    fn prop_paging_rules(ops in prop::collection::vec(paging_strategy(), 1..6)) {
        let mut select = SelectExpr::for_entity("Blog", &QueryConfig::default());
        let mut has_limit = false;
        let mut has_offset = false;

        for op in ops {
            match op {
                PagingOp::Limit(n) => {
                    let result = select.apply_limit(SqlExpr::constant(n));
                    prop_assert_eq!(result.is_ok(), !has_limit);
                    has_limit = true;
                }
                PagingOp::Offset(n) => {
                    let result = select.apply_offset(SqlExpr::constant(n));
                    prop_assert_eq!(result.is_ok(), !has_limit && !has_offset);
                    has_offset |= result.is_ok();
                }
            }
        }

        prop_assert_eq!(select.limit().is_some(), has_limit);
        prop_assert_eq!(select.offset().is_some(), has_offset);
    }

    #[test]
    fn prop_ordering_frozen_after_paging_or_distinct(
        key in name_strategy(),
        distinct in any::<bool>(),
        limit in prop::option::of(0i64..10),
        offset in prop::option::of(0i64..10),
    ) {
        let mut select = SelectExpr::for_entity("Blog", &QueryConfig::default());
        if distinct {
            select.apply_distinct();
        }
        if let Some(offset) = offset {
            select.apply_offset(SqlExpr::constant(offset)).unwrap();
        }
        if let Some(limit) = limit {
            select.apply_limit(SqlExpr::constant(limit)).unwrap();
        }

        let blocked = distinct || limit.is_some() || offset.is_some();
        let applied = select.apply_ordering(OrderingExpr::new(property(&key), true));
        prop_assert_eq!(applied.is_err(), blocked);
        prop_assert_eq!(select.reverse_orderings().is_err(), blocked);
        prop_assert_eq!(select.orderings().is_empty(), blocked);
    }

    #[test]
    fn prop_identity_rewrite_shares_tree(
        members in prop::collection::vec(name_strategy(), 1..5),
        properties in prop::collection::vec(name_strategy(), 5),
        filter in name_strategy(),
        freeze in any::<bool>(),
    ) {
        let mut select = shaped(&members, &properties);
        select.apply_predicate(SqlExpr::equal(property(&filter), SqlExpr::parameter("p", JsonType::String)));
        if freeze {
            select.apply_projection().unwrap();
        }
        let select = Arc::new(select);

        let result = Identity.visit_select(&select).unwrap();
        prop_assert!(!result.is_yes());
        prop_assert!(Arc::ptr_eq(&result.get_plan(), &select));
    }
}
