//! Copy-on-write rewriting of query trees.
//!
//! A [`SelectVisitor`] returns `Ok(None)` for every node it leaves alone.
//! [`SelectExpr::visit_children`] only allocates a new block when at least
//! one child came back changed; otherwise it hands back the same `Arc`, so
//! untouched subtrees stay shared between the old and the new tree.

use std::sync::Arc;

use super::errors::PlanResult;
use super::partition_key::ParameterValues;
use super::projection::{ProjectionColumn, ProjectionExpr, ProjectionMapping, ProjectionState};
use super::source::{SourceExpr, SourcePayload};
use super::{OrderingExpr, SelectExpr};
use crate::query_planner::logical_expr::{
    ArrayIndex, BinaryExpr, FunctionCall, InExpr, PropertyAccess, SqlExpr, Subquery, UnaryExpr,
};
use crate::query_planner::transformed::Transformed;

pub trait SelectVisitor {
    fn visit_expr(&mut self, expr: &SqlExpr) -> PlanResult<Option<SqlExpr>> {
        walk_expr(self, expr)
    }

    fn visit_projection(&mut self, expr: &ProjectionExpr) -> PlanResult<Option<ProjectionExpr>> {
        walk_projection(self, expr)
    }

    fn visit_source(&mut self, source: &SourceExpr) -> PlanResult<Option<SourceExpr>> {
        walk_source(self, source)
    }

    fn visit_select(&mut self, select: &Arc<SelectExpr>) -> PlanResult<Transformed<Arc<SelectExpr>>> {
        select.visit_children(self)
    }
}

fn visit_boxed<V: SelectVisitor + ?Sized>(visitor: &mut V, expr: &SqlExpr) -> PlanResult<Option<Box<SqlExpr>>> {
    Ok(visitor.visit_expr(expr)?.map(Box::new))
}

fn visit_list<V: SelectVisitor + ?Sized>(visitor: &mut V, items: &[SqlExpr]) -> PlanResult<Option<Vec<SqlExpr>>> {
    let visited = items
        .iter()
        .map(|item| visitor.visit_expr(item))
        .collect::<PlanResult<Vec<_>>>()?;
    Ok(merge(items, visited))
}

fn visit_optional<V: SelectVisitor + ?Sized>(visitor: &mut V, expr: Option<&SqlExpr>) -> PlanResult<Option<SqlExpr>> {
    match expr {
        Some(expr) => visitor.visit_expr(expr),
        None => Ok(None),
    }
}

/// Rebuilds the list only if some element changed.
fn merge<T: Clone>(originals: &[T], visited: Vec<Option<T>>) -> Option<Vec<T>> {
    if visited.iter().all(Option::is_none) {
        return None;
    }
    Some(
        originals
            .iter()
            .zip(visited)
            .map(|(original, new)| new.unwrap_or_else(|| original.clone()))
            .collect(),
    )
}

/// Rewrites the children of `expr`, rebuilding the node only if one of
/// them changed.
pub fn walk_expr<V: SelectVisitor + ?Sized>(visitor: &mut V, expr: &SqlExpr) -> PlanResult<Option<SqlExpr>> {
    let rebuilt = match expr {
        SqlExpr::Binary(binary) => {
            let left = visit_boxed(visitor, &binary.left)?;
            let right = visit_boxed(visitor, &binary.right)?;
            if left.is_none() && right.is_none() {
                return Ok(None);
            }
            SqlExpr::Binary(BinaryExpr {
                operator: binary.operator,
                left: left.unwrap_or_else(|| binary.left.clone()),
                right: right.unwrap_or_else(|| binary.right.clone()),
                ty: binary.ty,
            })
        }

        SqlExpr::Unary(unary) => match visit_boxed(visitor, &unary.operand)? {
            Some(operand) => SqlExpr::Unary(UnaryExpr {
                operator: unary.operator,
                operand,
                ty: unary.ty,
            }),
            None => return Ok(None),
        },

        SqlExpr::PropertyAccess(prop) => match visit_boxed(visitor, &prop.base)? {
            Some(base) => SqlExpr::PropertyAccess(PropertyAccess {
                base,
                name: prop.name.clone(),
                ty: prop.ty,
            }),
            None => return Ok(None),
        },

        SqlExpr::ArrayIndex(index) => {
            let array = visit_boxed(visitor, &index.array)?;
            let idx = visit_boxed(visitor, &index.index)?;
            if array.is_none() && idx.is_none() {
                return Ok(None);
            }
            SqlExpr::ArrayIndex(ArrayIndex {
                array: array.unwrap_or_else(|| index.array.clone()),
                index: idx.unwrap_or_else(|| index.index.clone()),
                ty: index.ty,
            })
        }

        SqlExpr::FunctionCall(call) => match visit_list(visitor, &call.args)? {
            Some(args) => SqlExpr::FunctionCall(FunctionCall {
                name: call.name.clone(),
                args,
                ty: call.ty,
            }),
            None => return Ok(None),
        },

        SqlExpr::InlineArray(items) => match visit_list(visitor, items)? {
            Some(items) => SqlExpr::InlineArray(items),
            None => return Ok(None),
        },

        SqlExpr::In(in_expr) => {
            let item = visit_boxed(visitor, &in_expr.item)?;
            let values = visit_list(visitor, &in_expr.values)?;
            if item.is_none() && values.is_none() {
                return Ok(None);
            }
            SqlExpr::In(InExpr {
                item: item.unwrap_or_else(|| in_expr.item.clone()),
                values: values.unwrap_or_else(|| in_expr.values.clone()),
                negated: in_expr.negated,
            })
        }

        SqlExpr::Subquery(subquery) => match visitor.visit_select(&subquery.select)?.into_changed() {
            Some(select) => SqlExpr::Subquery(Subquery {
                kind: subquery.kind,
                select,
            }),
            None => return Ok(None),
        },

        SqlExpr::Constant(_)
        | SqlExpr::Parameter(_)
        | SqlExpr::ScalarReference(_)
        | SqlExpr::ObjectReference(_)
        | SqlExpr::Fragment(_) => return Ok(None),
    };

    Ok(Some(rebuilt))
}

pub fn walk_projection<V: SelectVisitor + ?Sized>(
    visitor: &mut V,
    expr: &ProjectionExpr,
) -> PlanResult<Option<ProjectionExpr>> {
    Ok(match expr {
        ProjectionExpr::Scalar(scalar) => visitor.visit_expr(scalar)?.map(ProjectionExpr::Scalar),
        ProjectionExpr::Object(object) => visitor
            .visit_expr(&object.access)?
            .map(|access| ProjectionExpr::object(object.entity_type.clone(), access)),
    })
}

/// Rewrites the payload of `source`. A rewritten iteration collection is
/// legalized again, so it may come back wrapped.
pub fn walk_source<V: SelectVisitor + ?Sized>(visitor: &mut V, source: &SourceExpr) -> PlanResult<Option<SourceExpr>> {
    match source.payload() {
        SourcePayload::Collection(collection) => Ok(visitor
            .visit_expr(collection)?
            .map(|new| SourceExpr::iterate(new, source.alias()))),
        SourcePayload::Select(nested) => Ok(visitor
            .visit_select(nested)?
            .into_changed()
            .map(|select| source.with_payload(SourcePayload::Select(select)))),
        SourcePayload::Root(_) | SourcePayload::Raw(_) => Ok(None),
    }
}

impl SelectExpr {
    /// Runs `visitor` over projection, sources, predicate, orderings,
    /// offset and limit, in that order.
    pub fn visit_children<V: SelectVisitor + ?Sized>(
        self: &Arc<Self>,
        visitor: &mut V,
    ) -> PlanResult<Transformed<Arc<SelectExpr>>> {
        let projection = match &self.projection {
            ProjectionState::Pending(mapping) => {
                let visited = mapping
                    .iter()
                    .map(|(_, expr)| visitor.visit_projection(expr))
                    .collect::<PlanResult<Vec<_>>>()?;
                if visited.iter().all(Option::is_none) {
                    None
                } else {
                    Some(ProjectionState::Pending(
                        mapping
                            .iter()
                            .zip(visited)
                            .map(|((member, expr), new)| {
                                (member.clone(), new.unwrap_or_else(|| expr.clone()))
                            })
                            .collect::<ProjectionMapping<_>>(),
                    ))
                }
            }
            ProjectionState::Frozen { columns, bindings } => {
                let visited = columns
                    .iter()
                    .map(|column| {
                        Ok(visitor.visit_projection(&column.expression)?.map(|expression| {
                            ProjectionColumn {
                                expression,
                                alias: column.alias.clone(),
                            }
                        }))
                    })
                    .collect::<PlanResult<Vec<_>>>()?;
                merge(columns, visited).map(|columns| ProjectionState::Frozen {
                    columns,
                    bindings: bindings.clone(),
                })
            }
        };

        let visited_sources = self
            .sources
            .iter()
            .map(|source| visitor.visit_source(source))
            .collect::<PlanResult<Vec<_>>>()?;
        let sources = merge(&self.sources, visited_sources);

        let predicate = visit_optional(visitor, self.predicate.as_ref())?;

        let visited_orderings = self
            .orderings
            .iter()
            .map(|ordering| {
                Ok(visitor
                    .visit_expr(&ordering.expression)?
                    .map(|expression| OrderingExpr::new(expression, ordering.ascending)))
            })
            .collect::<PlanResult<Vec<_>>>()?;
        let orderings = merge(&self.orderings, visited_orderings);

        let offset = visit_optional(visitor, self.offset.as_ref())?;
        let limit = visit_optional(visitor, self.limit.as_ref())?;

        let changed = projection.is_some()
            || sources.is_some()
            || predicate.is_some()
            || orderings.is_some()
            || offset.is_some()
            || limit.is_some();
        if !changed {
            log::trace!("Rewrite left query block unchanged");
            return Ok(Transformed::No(Arc::clone(self)));
        }

        log::trace!("Rewrite produced a new query block");
        Ok(Transformed::Yes(Arc::new(self.update(
            projection.unwrap_or_else(|| self.projection.clone()),
            sources.unwrap_or_else(|| self.sources.clone()),
            predicate.or_else(|| self.predicate.clone()),
            orderings.unwrap_or_else(|| self.orderings.clone()),
            limit.or_else(|| self.limit.clone()),
            offset.or_else(|| self.offset.clone()),
        ))))
    }
}

/// Replaces every parameter that has a supplied value with a constant.
pub struct ParameterInliner<'a> {
    values: &'a ParameterValues,
    inlined: usize,
}

impl<'a> ParameterInliner<'a> {
    pub fn new(values: &'a ParameterValues) -> Self {
        Self { values, inlined: 0 }
    }

    pub fn inline(select: &Arc<SelectExpr>, values: &ParameterValues) -> PlanResult<Arc<SelectExpr>> {
        let mut inliner = ParameterInliner::new(values);
        let result = inliner.visit_select(select)?;
        log::debug!("Inlined {} parameter reference(s)", inliner.inlined);
        Ok(result.get_plan())
    }
}

impl SelectVisitor for ParameterInliner<'_> {
    fn visit_expr(&mut self, expr: &SqlExpr) -> PlanResult<Option<SqlExpr>> {
        if let SqlExpr::Parameter(param) = expr {
            return Ok(self.values.get(&param.name).map(|value| {
                self.inlined += 1;
                SqlExpr::constant(value.clone())
            }));
        }
        walk_expr(self, expr)
    }
}
