//! The query block: one `SELECT` of the document SQL dialect.
//!
//! A [`SelectExpr`] is built by the translator through the mutators below,
//! optionally composed with correlated inner blocks via
//! [`SelectExpr::add_join`], frozen with [`SelectExpr::apply_projection`]
//! and finally rendered by [`crate::sql_generator`]. Once a block is placed
//! inside another one (as a source or subquery) it sits behind an `Arc` and
//! is only ever replaced, never mutated; see [`rewrite`].

use serde::{Deserialize, Serialize};

use crate::config::QueryConfig;
use crate::query_planner::logical_expr::visitors::ParameterCollector;
use crate::query_planner::logical_expr::SqlExpr;

pub mod errors;
pub mod join_builder;
pub mod partition_key;
pub mod projection;
pub mod rewrite;
pub mod source;

#[cfg(test)]
mod tests;

pub use errors::{DialectLimitation, ErrorKind, PlanResult, SelectPlanError};
pub use join_builder::{JoinRemapping, INNER_MEMBER, OUTER_MEMBER};
pub use partition_key::{
    ParameterValues, PartitionKey, PartitionKeyBinding, PropertyRef, ReadItemInfo,
};
pub use projection::{
    MappedProjection, MemberStep, ObjectProjection, ProjectionColumn, ProjectionExpr,
    ProjectionMapping, ProjectionMember, ProjectionState,
};
pub use rewrite::{ParameterInliner, SelectVisitor};
pub use source::{FromSql, SourceExpr, SourcePayload};

/// Column alias used when neither the shape position nor the expression
/// provides a name.
pub const DEFAULT_COLUMN_ALIAS: &str = "c";

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OrderingExpr {
    pub expression: SqlExpr,
    pub ascending: bool,
}

impl OrderingExpr {
    pub fn new(expression: SqlExpr, ascending: bool) -> Self {
        Self {
            expression,
            ascending,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectExpr {
    sources: Vec<SourceExpr>,
    projection: ProjectionState,
    predicate: Option<SqlExpr>,
    orderings: Vec<OrderingExpr>,
    limit: Option<SqlExpr>,
    offset: Option<SqlExpr>,
    distinct: bool,
    single_value_projection: bool,
    partition_key_bindings: Vec<PartitionKeyBinding>,
    read_item: Option<ReadItemInfo>,
}

impl SelectExpr {
    /// `SELECT c FROM root c`, with the whole document bound to the empty
    /// shape position.
    pub fn for_entity(entity_type: &str, config: &QueryConfig) -> Self {
        let root = SourceExpr::root(entity_type, &config.root_container, &config.root_alias);
        Self {
            sources: vec![root],
            projection: ProjectionState::Pending(
                [(
                    ProjectionMember::root(),
                    ProjectionExpr::object(
                        entity_type,
                        SqlExpr::object_ref(entity_type, &config.root_alias),
                    ),
                )]
                .into_iter()
                .collect(),
            ),
            ..Default::default()
        }
    }

    /// Like [`SelectExpr::for_entity`], routed as a direct point read.
    pub fn for_point_read(entity_type: &str, read_item: ReadItemInfo, config: &QueryConfig) -> Self {
        Self {
            read_item: Some(read_item),
            ..Self::for_entity(entity_type, config)
        }
    }

    /// `SELECT c FROM (<sql>) c`
    pub fn from_sql(entity_type: &str, sql: &str, config: &QueryConfig) -> Self {
        Self {
            sources: vec![SourceExpr::from_sql(entity_type, sql, &config.root_alias)],
            ..Self::for_entity(entity_type, config)
        }
    }

    /// A block without sources projecting a single value.
    pub fn for_value(projection: impl Into<ProjectionExpr>) -> Self {
        Self {
            projection: ProjectionState::Pending(
                [(ProjectionMember::root(), projection.into())]
                    .into_iter()
                    .collect(),
            ),
            ..Default::default()
        }
    }

    /// `SELECT VALUE <expr>`, already frozen. This is the wrapper used to
    /// make an arbitrary collection expression iterable.
    pub fn single_value(expr: SqlExpr) -> Self {
        let mut columns = Vec::with_capacity(1);
        projection::push_column(&mut columns, expr.into(), None, DEFAULT_COLUMN_ALIAS);
        Self {
            projection: ProjectionState::Frozen {
                columns,
                bindings: ProjectionMapping::new(),
            },
            single_value_projection: true,
            ..Default::default()
        }
    }

    /// `SELECT VALUE <projection> FROM <alias> IN <collection>`
    pub fn create_for_collection(
        collection: SqlExpr,
        alias: &str,
        projection: impl Into<ProjectionExpr>,
    ) -> Self {
        Self {
            sources: vec![SourceExpr::iterate(collection, alias)],
            single_value_projection: true,
            ..Self::for_value(projection)
        }
    }

    pub fn sources(&self) -> &[SourceExpr] {
        &self.sources
    }

    /// Frozen output columns; empty until the projection is applied.
    pub fn projection(&self) -> &[ProjectionColumn] {
        self.projection.columns()
    }

    pub fn projection_state(&self) -> &ProjectionState {
        &self.projection
    }

    pub fn predicate(&self) -> Option<&SqlExpr> {
        self.predicate.as_ref()
    }

    pub fn orderings(&self) -> &[OrderingExpr] {
        &self.orderings
    }

    pub fn limit(&self) -> Option<&SqlExpr> {
        self.limit.as_ref()
    }

    pub fn offset(&self) -> Option<&SqlExpr> {
        self.offset.as_ref()
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn uses_single_value_projection(&self) -> bool {
        self.single_value_projection
    }

    pub fn read_item(&self) -> Option<&ReadItemInfo> {
        self.read_item.as_ref()
    }

    // ---- projection binding -------------------------------------------------

    pub fn get_mapped_projection(&self, member: &ProjectionMember) -> PlanResult<MappedProjection<'_>> {
        self.projection.get_mapped(member).ok_or_else(|| {
            log::error!("Projection member '{}' requested but never bound", member);
            SelectPlanError::UnresolvedBinding(member.to_string())
        })
    }

    /// Binds (or rebinds) one shape position.
    pub fn bind_projection(&mut self, member: ProjectionMember, expression: impl Into<ProjectionExpr>) -> PlanResult<()> {
        if self.projection.is_frozen() {
            return Err(self.reject(member.to_string(), DialectLimitation::ProjectionAlreadyApplied));
        }
        if let ProjectionState::Pending(mapping) = &mut self.projection {
            mapping.insert(member, expression.into());
        }
        Ok(())
    }

    /// Swaps the whole binding set at once.
    pub fn replace_projection_mapping(&mut self, mapping: ProjectionMapping<ProjectionExpr>) -> PlanResult<()> {
        if self.projection.is_frozen() {
            let members: Vec<String> = mapping.members().map(|m| m.to_string()).collect();
            return Err(self.reject(members.join(", "), DialectLimitation::ProjectionAlreadyApplied));
        }
        self.projection = ProjectionState::Pending(mapping);
        Ok(())
    }

    pub fn clear_projection_mapping(&mut self) {
        self.projection.clear_mapping();
    }

    /// Freezes the pending bindings into output columns. Calling it again
    /// once frozen does nothing. A VALUE block must freeze to exactly one
    /// column.
    pub fn apply_projection(&mut self) -> PlanResult<()> {
        if self.projection.is_frozen() {
            return Ok(());
        }

        let mut frozen = self.projection.clone();
        frozen.freeze(DEFAULT_COLUMN_ALIAS);
        if self.single_value_projection && frozen.columns().len() != 1 {
            return Err(self.reject(column_list(frozen.columns()), DialectLimitation::SingleValueArity));
        }
        self.projection = frozen;
        Ok(())
    }

    /// Adds a concrete output column, freezing pending bindings first.
    /// A structurally equal column is reused rather than duplicated.
    pub fn add_to_projection(&mut self, expression: impl Into<ProjectionExpr>, alias: Option<&str>) -> PlanResult<usize> {
        let expression = expression.into();
        let nothing_bound = matches!(&self.projection, ProjectionState::Pending(m) if m.is_empty());
        if nothing_bound {
            // start from an empty column list; a VALUE block gets its one column here
            self.projection = ProjectionState::Frozen {
                columns: Vec::new(),
                bindings: ProjectionMapping::new(),
            };
        } else {
            self.apply_projection()?;
        }

        let columns = self.projection.columns();
        let is_new = !columns.iter().any(|c| c.expression == expression);
        if self.single_value_projection && is_new && !columns.is_empty() {
            return Err(self.reject(
                crate::sql_generator::projection_expr_to_sql(&expression),
                DialectLimitation::SingleValueArity,
            ));
        }

        match &mut self.projection {
            ProjectionState::Frozen { columns, .. } => {
                Ok(projection::push_column(columns, expression, alias, DEFAULT_COLUMN_ALIAS))
            }
            ProjectionState::Pending(_) => Err(SelectPlanError::InvalidPlan(
                "projection is still pending after being applied".to_string(),
            )),
        }
    }

    // ---- predicate / ordering / paging ---------------------------------------

    pub fn apply_distinct(&mut self) {
        self.distinct = true;
    }

    /// ANDs `expression` onto the existing predicate; a literal `true` is
    /// dropped.
    pub fn apply_predicate(&mut self, expression: SqlExpr) {
        if expression.is_true_constant() {
            return;
        }

        self.predicate = Some(match self.predicate.take() {
            None => expression,
            Some(existing) => SqlExpr::and(existing, expression),
        });
        log::debug!("Applied predicate, now: {}", self.predicate.as_ref().map(|p| p.to_string()).unwrap_or_default());
    }

    pub fn apply_limit(&mut self, expression: SqlExpr) -> PlanResult<()> {
        if self.limit.is_some() {
            return Err(self.reject(expression.to_string(), DialectLimitation::NoSubqueryPushdown));
        }
        log::debug!("Applied LIMIT {}", expression);
        self.limit = Some(expression);
        Ok(())
    }

    pub fn apply_offset(&mut self, expression: SqlExpr) -> PlanResult<()> {
        if self.limit.is_some() || self.offset.is_some() {
            return Err(self.reject(expression.to_string(), DialectLimitation::NoSubqueryPushdown));
        }
        log::debug!("Applied OFFSET {}", expression);
        self.offset = Some(expression);
        Ok(())
    }

    /// Replaces all sort keys with `ordering`.
    pub fn apply_ordering(&mut self, ordering: OrderingExpr) -> PlanResult<()> {
        self.check_ordering_allowed(&ordering)?;
        self.orderings.clear();
        self.orderings.push(ordering);
        Ok(())
    }

    /// Adds a secondary sort key unless the same expression is already a key.
    pub fn append_ordering(&mut self, ordering: OrderingExpr) -> PlanResult<()> {
        self.check_ordering_allowed(&ordering)?;
        if !self
            .orderings
            .iter()
            .any(|o| o.expression == ordering.expression)
        {
            self.orderings.push(ordering);
        }
        Ok(())
    }

    pub fn reverse_orderings(&mut self) -> PlanResult<()> {
        let keys = crate::sql_generator::orderings_to_sql(&self.orderings);
        if self.limit.is_some() || self.offset.is_some() {
            return Err(self.reject(keys, DialectLimitation::ReverseAfterPaging));
        }
        if self.distinct {
            return Err(self.reject(keys, DialectLimitation::NoSubqueryPushdown));
        }
        for ordering in &mut self.orderings {
            ordering.ascending = !ordering.ascending;
        }
        Ok(())
    }

    pub fn clear_ordering(&mut self) {
        self.orderings.clear();
    }

    fn check_ordering_allowed(&self, ordering: &OrderingExpr) -> PlanResult<()> {
        if self.distinct || self.limit.is_some() || self.offset.is_some() {
            let printed = crate::sql_generator::orderings_to_sql(std::slice::from_ref(ordering));
            return Err(self.reject(printed, DialectLimitation::NoSubqueryPushdown));
        }
        Ok(())
    }

    fn reject(&self, expression: String, limitation: DialectLimitation) -> SelectPlanError {
        log::warn!("Rejecting '{}': {}", expression, limitation);
        SelectPlanError::structural(expression, limitation)
    }

    // ---- copies ---------------------------------------------------------------

    pub fn with_single_value_projection(&self) -> Self {
        Self {
            single_value_projection: true,
            ..self.clone()
        }
    }

    /// Copy with new children. Flags, partition key bindings and the
    /// point-read route carry over.
    pub fn update(
        &self,
        projection: ProjectionState,
        sources: Vec<SourceExpr>,
        predicate: Option<SqlExpr>,
        orderings: Vec<OrderingExpr>,
        limit: Option<SqlExpr>,
        offset: Option<SqlExpr>,
    ) -> Self {
        Self {
            sources,
            projection,
            predicate,
            orderings,
            limit,
            offset,
            distinct: self.distinct,
            single_value_projection: self.single_value_projection,
            partition_key_bindings: self.partition_key_bindings.clone(),
            read_item: self.read_item.clone(),
        }
    }

    // ---- inspection -------------------------------------------------------------

    /// Names of every runtime parameter referenced anywhere in the tree,
    /// nested blocks included, in first-seen order.
    pub fn parameter_names(&self) -> Vec<String> {
        ParameterCollector::collect_select(self)
    }

    /// Re-checks the structural invariants, for blocks that did not come
    /// out of the mutators (e.g. deserialized ones).
    pub fn validate(&self) -> PlanResult<()> {
        for source in &self.sources {
            source.validate()?;
        }

        for (i, source) in self.sources.iter().enumerate() {
            if self.sources[..i]
                .iter()
                .any(|s| projection::alias_eq(s.alias(), source.alias()))
            {
                return Err(SelectPlanError::InvalidPlan(format!(
                    "source alias '{}' is used more than once",
                    source.alias()
                )));
            }
        }

        let duplicate = match &self.projection {
            ProjectionState::Pending(mapping) => mapping.duplicate_member(),
            ProjectionState::Frozen { bindings, .. } => bindings.duplicate_member(),
        };
        if let Some(member) = duplicate {
            return Err(SelectPlanError::InvalidPlan(format!(
                "projection member '{}' is bound more than once",
                member
            )));
        }

        if let ProjectionState::Frozen { columns, bindings } = &self.projection {
            if self.single_value_projection && columns.len() != 1 {
                return Err(SelectPlanError::structural(
                    column_list(columns),
                    DialectLimitation::SingleValueArity,
                ));
            }
            if let Some((member, index)) = bindings.iter().find(|(_, idx)| **idx >= columns.len()) {
                return Err(SelectPlanError::InvalidPlan(format!(
                    "member '{}' is bound to missing column #{}",
                    member, index
                )));
            }
            for (i, column) in columns.iter().enumerate() {
                if columns[..i].iter().any(|c| projection::alias_eq(&c.alias, &column.alias)) {
                    return Err(SelectPlanError::InvalidPlan(format!(
                        "column alias '{}' is used more than once",
                        column.alias
                    )));
                }
            }
        }

        if self.read_item.is_some() && self.sources.len() > 1 {
            return Err(SelectPlanError::InvalidPlan(
                "a point read cannot carry joined sources".to_string(),
            ));
        }

        Ok(())
    }

    /// An alias for a new source, unique among the existing ones.
    pub(crate) fn unique_source_alias(&self, base: &str) -> String {
        projection::unique_alias(base, |candidate| {
            self.sources.iter().any(|s| projection::alias_eq(s.alias(), candidate))
        })
    }
}

fn column_list(columns: &[ProjectionColumn]) -> String {
    columns
        .iter()
        .map(|c| crate::sql_generator::projection_expr_to_sql(&c.expression))
        .collect::<Vec<_>>()
        .join(", ")
}
