//! FROM/JOIN contributors.
//!
//! The dialect has no relational joins: every source after the first is a
//! correlated iteration (`JOIN a IN c["Tags"]`) or a nested query block. An
//! iteration source must be a container reference or a property path;
//! anything else is wrapped into `(SELECT VALUE <expr>)` on the way in.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::errors::{PlanResult, SelectPlanError};
use super::SelectExpr;
use crate::query_planner::logical_expr::{ObjectReference, SqlExpr};

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FromSql {
    pub entity_type: String,
    pub sql: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum SourcePayload {
    /// The document container itself (`root`).
    Root(ObjectReference),
    /// A nested query block.
    Select(Arc<SelectExpr>),
    /// A collection computed from an expression; always iterated.
    Collection(SqlExpr),
    /// Caller-supplied query text.
    Raw(FromSql),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SourceExpr {
    payload: SourcePayload,
    alias: String,
    with_in: bool,
}

impl SourceExpr {
    /// `FROM root c`
    pub fn root(entity_type: impl Into<String>, container: &str, alias: impl Into<String>) -> Self {
        Self {
            payload: SourcePayload::Root(ObjectReference {
                entity_type: entity_type.into(),
                alias: container.to_string(),
            }),
            alias: alias.into(),
            with_in: false,
        }
    }

    /// `FROM (SELECT ...) a`
    pub fn nested(select: Arc<SelectExpr>, alias: impl Into<String>) -> Self {
        Self {
            payload: SourcePayload::Select(select),
            alias: alias.into(),
            with_in: false,
        }
    }

    /// `FROM (<sql>) c`
    pub fn from_sql(entity_type: impl Into<String>, sql: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            payload: SourcePayload::Raw(FromSql {
                entity_type: entity_type.into(),
                sql: sql.into(),
            }),
            alias: alias.into(),
            with_in: false,
        }
    }

    /// `alias IN <collection>`. Collections the dialect refuses to iterate
    /// directly are wrapped: `alias IN (SELECT VALUE <collection>)`.
    pub fn iterate(collection: SqlExpr, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        if Self::is_compatible(&collection) {
            return Self {
                payload: SourcePayload::Collection(collection),
                alias,
                with_in: true,
            };
        }

        log::debug!("Wrapping non-iterable collection source '{}' in a VALUE subquery", alias);
        Self {
            payload: SourcePayload::Select(Arc::new(SelectExpr::single_value(collection))),
            alias,
            with_in: true,
        }
    }

    /// Whether `expr` may appear directly after `IN`: a bound reference or
    /// a property path rooted at one.
    pub fn is_compatible(expr: &SqlExpr) -> bool {
        match expr {
            SqlExpr::ObjectReference(_) | SqlExpr::ScalarReference(_) => true,
            SqlExpr::PropertyAccess(access) => Self::is_compatible(&access.base),
            SqlExpr::ArrayIndex(index) => Self::is_compatible(&index.array),
            _ => false,
        }
    }

    pub fn payload(&self) -> &SourcePayload {
        &self.payload
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn with_in(&self) -> bool {
        self.with_in
    }

    /// Same alias and iteration mode over a new payload.
    pub(crate) fn with_payload(&self, payload: SourcePayload) -> Self {
        Self {
            payload,
            alias: self.alias.clone(),
            with_in: self.with_in,
        }
    }

    pub fn validate(&self) -> PlanResult<()> {
        match (&self.payload, self.with_in) {
            (SourcePayload::Collection(expr), true) if Self::is_compatible(expr) => Ok(()),
            (SourcePayload::Collection(_), _) => Err(SelectPlanError::InvalidPlan(format!(
                "source '{}' iterates a collection the dialect cannot iterate directly",
                self.alias
            ))),
            (SourcePayload::Select(select), true) if !select.uses_single_value_projection() => {
                Err(SelectPlanError::InvalidPlan(format!(
                    "source '{}' iterates a subquery without a VALUE projection",
                    self.alias
                )))
            }
            (SourcePayload::Select(select), _) => select.validate(),
            (SourcePayload::Root(_) | SourcePayload::Raw(_), true) => {
                Err(SelectPlanError::InvalidPlan(format!(
                    "source '{}' cannot iterate a container or raw query",
                    self.alias
                )))
            }
            (SourcePayload::Root(_) | SourcePayload::Raw(_), false) => Ok(()),
        }
    }
}
