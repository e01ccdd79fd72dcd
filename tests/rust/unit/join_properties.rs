//! Property-based tests for join composition
//!
//! For any outer shape, joining an inner block moves every outer position
//! under `Outer` and the inner value under `Inner`, so the two key spaces
//! never overlap and every old position can still be found.

use docsql::config::QueryConfig;
use docsql::query_planner::logical_expr::{JsonType, SqlExpr};
use docsql::select_plan::{
    MemberStep, ProjectionExpr, ProjectionMapping, ProjectionMember, ProjectionState, SelectExpr,
    INNER_MEMBER, OUTER_MEMBER,
};
use proptest::prelude::*;

fn path_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Z][a-z]{0,4}", 0..3)
}

fn outer_block(paths: &[Vec<String>]) -> SelectExpr {
    let mut select = SelectExpr::for_entity("Entity", &QueryConfig::default());
    let mapping: ProjectionMapping<ProjectionExpr> = paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let member = ProjectionMember::from_steps(
                path.iter().map(|step| MemberStep::field(step.as_str())).collect(),
            );
            let expr = SqlExpr::property(
                SqlExpr::object_ref("Entity", "c"),
                format!("P{}", i),
                JsonType::Number,
            );
            (member, ProjectionExpr::from(expr))
        })
        .collect();
    select.replace_projection_mapping(mapping).unwrap();
    select
}

fn members(select: &SelectExpr) -> Vec<ProjectionMember> {
    match select.projection_state() {
        ProjectionState::Pending(mapping) => mapping.members().cloned().collect(),
        ProjectionState::Frozen { bindings, .. } => bindings.members().cloned().collect(),
    }
}

proptest! {
    #[test]
    fn prop_join_key_spaces_are_disjoint(
        paths in prop::collection::vec(path_strategy(), 1..6),
        filtered in any::<bool>(),
    ) {
        let mut select = outer_block(&paths);
        let before = members(&select);

        let ints = SqlExpr::property(SqlExpr::object_ref("Entity", "c"), "Ints", JsonType::Array);
        let mut inner = SelectExpr::create_for_collection(
            ints,
            "i",
            SqlExpr::scalar_ref("i", JsonType::Number),
        );
        if filtered {
            inner.apply_predicate(SqlExpr::equal(
                SqlExpr::scalar_ref("i", JsonType::Number),
                SqlExpr::constant(1),
            ));
        }

        let remap = select.add_join(inner, &QueryConfig::default()).unwrap();
        let after = members(&select);

        prop_assert_eq!(after.len(), before.len() + 1);
        for member in &after {
            let head = member.steps().first().and_then(|step| step.name());
            prop_assert!(head == Some(OUTER_MEMBER) || head == Some(INNER_MEMBER));
        }
        for member in &before {
            let moved = remap.remap_outer(member);
            prop_assert!(moved.is_some());
            prop_assert!(after.contains(moved.unwrap()));
        }
        prop_assert_eq!(
            remap.remap_inner(&ProjectionMember::root()).map(ToString::to_string),
            Some(INNER_MEMBER.to_string())
        );

        select.apply_projection().unwrap();
        prop_assert!(select.validate().is_ok());
        prop_assert_eq!(select.sources().len(), 2);
    }
}
