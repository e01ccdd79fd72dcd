//! Join composition.
//!
//! The dialect's only join is correlated iteration, so composing an inner
//! block means adding it (or the bare array it re-exposes) as one more
//! source and pairing the two projection shapes under `Outer`/`Inner`.

use std::sync::Arc;

use super::errors::{DialectLimitation, PlanResult, SelectPlanError};
use super::projection::{
    alias_eq, MemberStep, ProjectionExpr, ProjectionMapping, ProjectionMember, ProjectionState,
};
use super::source::{SourceExpr, SourcePayload};
use super::SelectExpr;
use crate::config::QueryConfig;
use crate::query_planner::logical_expr::SqlExpr;

pub const OUTER_MEMBER: &str = "Outer";
pub const INNER_MEMBER: &str = "Inner";

/// How every shape position moved during a join, so the shaper can follow.
#[derive(Debug, PartialEq, Clone)]
pub struct JoinRemapping {
    /// Alias of the source that was added.
    pub alias: String,
    pub outer: Vec<(ProjectionMember, ProjectionMember)>,
    pub inner: Vec<(ProjectionMember, ProjectionMember)>,
}

impl JoinRemapping {
    pub fn remap_outer(&self, member: &ProjectionMember) -> Option<&ProjectionMember> {
        self.outer.iter().find(|(old, _)| old == member).map(|(_, new)| new)
    }

    pub fn remap_inner(&self, member: &ProjectionMember) -> Option<&ProjectionMember> {
        self.inner.iter().find(|(old, _)| old == member).map(|(_, new)| new)
    }
}

impl SelectExpr {
    /// Recognizes `SELECT VALUE i FROM i IN <array>` with nothing else
    /// applied and returns `<array>`.
    pub fn try_extract_bare_array(&self) -> Option<&SqlExpr> {
        if self.predicate.is_some()
            || !self.orderings.is_empty()
            || self.limit.is_some()
            || self.offset.is_some()
            || self.distinct
            || !self.single_value_projection
        {
            return None;
        }

        let [source] = self.sources.as_slice() else {
            return None;
        };
        if !source.with_in() {
            return None;
        }

        let projected = match &self.projection {
            ProjectionState::Pending(mapping) if mapping.len() == 1 => {
                mapping.get(&ProjectionMember::root())?
            }
            ProjectionState::Frozen { columns, .. } if columns.len() == 1 => &columns[0].expression,
            _ => return None,
        };
        match projected {
            ProjectionExpr::Scalar(SqlExpr::ScalarReference(r)) if alias_eq(&r.alias, source.alias()) => {}
            _ => return None,
        }

        match source.payload() {
            SourcePayload::Collection(array) => Some(array),
            _ => None,
        }
    }

    /// Merges `inner` into this block as a correlated source.
    ///
    /// Outer positions move under `Outer`, inner positions under `Inner`.
    /// A point read cannot be joined. Only inner positions at the root of
    /// the inner shape can be re-exposed; anything deeper would need a
    /// property path into an object the inner block never materialized,
    /// and is rejected. Every check happens before this block is touched.
    pub fn add_join(&mut self, inner: SelectExpr, config: &QueryConfig) -> PlanResult<JoinRemapping> {
        if let Some(read_item) = &self.read_item {
            return Err(self.reject(
                format!("JOIN on point read of {}", read_item.entity_type),
                DialectLimitation::JoinOnPointRead,
            ));
        }
        let ProjectionState::Pending(outer_mapping) = &self.projection else {
            return Err(self.reject("JOIN".to_string(), DialectLimitation::ProjectionAlreadyApplied));
        };
        let ProjectionState::Pending(inner_mapping) = &inner.projection else {
            return Err(inner.reject("JOIN".to_string(), DialectLimitation::ProjectionAlreadyApplied));
        };

        let alias = self.unique_source_alias(&config.join_alias);

        let mut merged = ProjectionMapping::new();
        let mut outer = Vec::with_capacity(outer_mapping.len());
        for (member, expression) in outer_mapping.iter() {
            let remapped = member.prepend(MemberStep::field(OUTER_MEMBER));
            outer.push((member.clone(), remapped.clone()));
            merged.insert(remapped, expression.clone());
        }

        let mut inner_remap = Vec::with_capacity(inner_mapping.len());
        for (member, expression) in inner_mapping.iter() {
            if !member.is_root() {
                log::warn!("Cannot join inner query projecting into nested member '{}'", member);
                return Err(SelectPlanError::ComplexProjectionInSubquery(member.to_string()));
            }

            let reference = match expression {
                ProjectionExpr::Scalar(expr) => ProjectionExpr::Scalar(SqlExpr::scalar_ref(&alias, expr.ty())),
                ProjectionExpr::Object(object) => ProjectionExpr::object(
                    object.entity_type.clone(),
                    SqlExpr::object_ref(&object.entity_type, &alias),
                ),
            };
            let remapped = member.prepend(MemberStep::field(INNER_MEMBER));
            inner_remap.push((member.clone(), remapped.clone()));
            merged.insert(remapped, reference);
        }

        let bare_array = inner
            .try_extract_bare_array()
            .filter(|array| SourceExpr::is_compatible(array))
            .cloned();

        let source = match bare_array {
            Some(array) => {
                log::debug!("Joining bare array directly as '{}'", alias);
                SourceExpr::iterate(array, alias.clone())
            }
            None => {
                let mut inner = inner;
                inner.apply_projection()?;
                inner.clear_projection_mapping();
                log::debug!(
                    "Joining nested query as '{}' with {} column(s)",
                    alias,
                    inner.projection().len()
                );
                SourceExpr::nested(Arc::new(inner), alias.clone())
            }
        };

        self.sources.push(source);
        self.projection = ProjectionState::Pending(merged);

        Ok(JoinRemapping {
            alias,
            outer,
            inner: inner_remap,
        })
    }
}
