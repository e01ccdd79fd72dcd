//! Read-only expression walker.
//!
//! [`walk_expression`] owns the recursion; implementors of
//! [`ExpressionVisitor`] override only the `visit_*` hooks they care about.
//! Nested query blocks (subqueries and nested sources) are descended into
//! through [`walk_select`], so a collector sees the whole tree.
//!
//! Rewriting passes live in [`crate::select_plan::rewrite`]; this module
//! never builds new nodes.
//!
//! # Example
//!
//! ```ignore
//! let names = ParameterCollector::collect(&expr);
//! // names = ["region", "ids"]
//! ```

use super::{FunctionCall, Parameter, PropertyAccess, SqlExpr, Subquery};
use crate::select_plan::{ProjectionExpr, ProjectionState, SelectExpr, SourcePayload};

/// Trait for visiting SqlExpr nodes.
///
/// The default implementations do nothing, allowing visitors to be selective.
pub trait ExpressionVisitor {
    /// Called for each property access (e.g. `c["Name"]`), before its base
    fn visit_property_access(&mut self, _prop: &PropertyAccess) {}

    /// Called for each runtime parameter (e.g. `@region`)
    fn visit_parameter(&mut self, _param: &Parameter) {}

    /// Called for each function call, before its arguments
    fn visit_function(&mut self, _call: &FunctionCall) {}

    /// Called for each subquery, before its block is walked
    fn visit_subquery(&mut self, _subquery: &Subquery) {}

    /// Called for alias references (`c`, `i`, `a`)
    fn visit_reference(&mut self, _alias: &str) {}

    /// Called for leaf expressions not handled by specific methods
    fn visit_leaf(&mut self, _expr: &SqlExpr) {}
}

/// Walk an expression tree, calling visitor methods for each node.
pub fn walk_expression<V: ExpressionVisitor>(expr: &SqlExpr, visitor: &mut V) {
    match expr {
        SqlExpr::Parameter(param) => visitor.visit_parameter(param),

        SqlExpr::PropertyAccess(prop) => {
            visitor.visit_property_access(prop);
            walk_expression(&prop.base, visitor);
        }

        SqlExpr::Binary(binary) => {
            walk_expression(&binary.left, visitor);
            walk_expression(&binary.right, visitor);
        }

        SqlExpr::Unary(unary) => walk_expression(&unary.operand, visitor),

        SqlExpr::ArrayIndex(index) => {
            walk_expression(&index.array, visitor);
            walk_expression(&index.index, visitor);
        }

        SqlExpr::FunctionCall(call) => {
            visitor.visit_function(call);
            for arg in &call.args {
                walk_expression(arg, visitor);
            }
        }

        SqlExpr::InlineArray(items) => {
            for item in items {
                walk_expression(item, visitor);
            }
        }

        SqlExpr::In(in_expr) => {
            walk_expression(&in_expr.item, visitor);
            for value in &in_expr.values {
                walk_expression(value, visitor);
            }
        }

        SqlExpr::Subquery(subquery) => {
            visitor.visit_subquery(subquery);
            walk_select(&subquery.select, visitor);
        }

        SqlExpr::ScalarReference(r) => visitor.visit_reference(&r.alias),
        SqlExpr::ObjectReference(r) => visitor.visit_reference(&r.alias),

        // Leaf nodes - no children to traverse
        SqlExpr::Constant(_) | SqlExpr::Fragment(_) => visitor.visit_leaf(expr),
    }
}

fn walk_projection_expr<V: ExpressionVisitor>(expr: &ProjectionExpr, visitor: &mut V) {
    match expr {
        ProjectionExpr::Scalar(scalar) => walk_expression(scalar, visitor),
        ProjectionExpr::Object(object) => walk_expression(&object.access, visitor),
    }
}

/// Walk every expression of a query block in clause order: projection,
/// sources, predicate, orderings, offset, limit.
pub fn walk_select<V: ExpressionVisitor>(select: &SelectExpr, visitor: &mut V) {
    match select.projection_state() {
        ProjectionState::Pending(mapping) => {
            for (_, expr) in mapping.iter() {
                walk_projection_expr(expr, visitor);
            }
        }
        ProjectionState::Frozen { columns, .. } => {
            for column in columns {
                walk_projection_expr(&column.expression, visitor);
            }
        }
    }

    for source in select.sources() {
        match source.payload() {
            SourcePayload::Collection(expr) => walk_expression(expr, visitor),
            SourcePayload::Select(nested) => walk_select(nested, visitor),
            SourcePayload::Root(_) | SourcePayload::Raw(_) => {}
        }
    }

    if let Some(predicate) = select.predicate() {
        walk_expression(predicate, visitor);
    }
    for ordering in select.orderings() {
        walk_expression(&ordering.expression, visitor);
    }
    if let Some(offset) = select.offset() {
        walk_expression(offset, visitor);
    }
    if let Some(limit) = select.limit() {
        walk_expression(limit, visitor);
    }
}

// =============================================================================
// Common Visitor Implementations
// =============================================================================

/// Collects parameter names in first-seen order, without duplicates.
#[derive(Default)]
pub struct ParameterCollector {
    pub names: Vec<String>,
}

impl ParameterCollector {
    pub fn collect(expr: &SqlExpr) -> Vec<String> {
        let mut collector = Self::default();
        walk_expression(expr, &mut collector);
        collector.names
    }

    pub fn collect_select(select: &SelectExpr) -> Vec<String> {
        let mut collector = Self::default();
        walk_select(select, &mut collector);
        collector.names
    }
}

impl ExpressionVisitor for ParameterCollector {
    fn visit_parameter(&mut self, param: &Parameter) {
        if !self.names.contains(&param.name) {
            self.names.push(param.name.clone());
        }
    }
}
