//! Projection binding layer.
//!
//! The translator binds abstract shape positions ([`ProjectionMember`]) to
//! expressions while it walks the query. Nothing is materialized until
//! [`ProjectionState::freeze`], which turns every binding into a concrete,
//! uniquely aliased output column and leaves behind a column index per
//! member so the result shaper can find its slot.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::query_planner::logical_expr::{JsonType, SqlExpr};

/// One step of a path through the client-side result shape.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
pub enum MemberStep {
    Field(String),
    Index(usize),
}

impl MemberStep {
    pub fn field(name: impl Into<String>) -> Self {
        MemberStep::Field(name.into())
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            MemberStep::Field(name) => Some(name),
            MemberStep::Index(_) => None,
        }
    }
}

impl fmt::Display for MemberStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberStep::Field(name) => write!(f, "{}", name),
            MemberStep::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A shape position. The empty path addresses the whole result.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default, Serialize, Deserialize)]
pub struct ProjectionMember(Vec<MemberStep>);

impl ProjectionMember {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_steps(steps: Vec<MemberStep>) -> Self {
        Self(steps)
    }

    pub fn append(&self, step: MemberStep) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }

    pub fn prepend(&self, step: MemberStep) -> Self {
        let mut steps = Vec::with_capacity(self.0.len() + 1);
        steps.push(step);
        steps.extend(self.0.iter().cloned());
        Self(steps)
    }

    pub fn last(&self) -> Option<&MemberStep> {
        self.0.last()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> &[MemberStep] {
        &self.0
    }
}

impl fmt::Display for ProjectionMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(root)");
        }
        let parts: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Projection of a whole document (or an owned nested document).
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ObjectProjection {
    pub entity_type: String,
    /// An object reference or a property path reaching the nested document.
    pub access: SqlExpr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum ProjectionExpr {
    Scalar(SqlExpr),
    Object(ObjectProjection),
}

impl ProjectionExpr {
    pub fn object(entity_type: impl Into<String>, access: SqlExpr) -> Self {
        ProjectionExpr::Object(ObjectProjection {
            entity_type: entity_type.into(),
            access,
        })
    }

    pub fn access_name(&self) -> Option<&str> {
        match self {
            ProjectionExpr::Scalar(expr) => expr.access_name(),
            ProjectionExpr::Object(obj) => obj.access.access_name(),
        }
    }

    pub fn ty(&self) -> JsonType {
        match self {
            ProjectionExpr::Scalar(expr) => expr.ty(),
            ProjectionExpr::Object(_) => JsonType::Object,
        }
    }
}

impl From<SqlExpr> for ProjectionExpr {
    fn from(expr: SqlExpr) -> Self {
        ProjectionExpr::Scalar(expr)
    }
}

/// A materialized output column.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ProjectionColumn {
    pub expression: ProjectionExpr,
    pub alias: String,
}

/// Insertion-ordered map keyed by shape position.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ProjectionMapping<V>(Vec<(ProjectionMember, V)>);

impl<V> Default for ProjectionMapping<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> ProjectionMapping<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `member`; an existing binding is replaced in place and returned.
    pub fn insert(&mut self, member: ProjectionMember, value: V) -> Option<V> {
        match self.0.iter_mut().find(|(m, _)| *m == member) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.0.push((member, value));
                None
            }
        }
    }

    pub fn get(&self, member: &ProjectionMember) -> Option<&V> {
        self.0.iter().find(|(m, _)| m == member).map(|(_, v)| v)
    }

    pub fn contains(&self, member: &ProjectionMember) -> bool {
        self.get(member).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProjectionMember, &V)> {
        self.0.iter().map(|(m, v)| (m, v))
    }

    pub fn members(&self) -> impl Iterator<Item = &ProjectionMember> {
        self.0.iter().map(|(m, _)| m)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// First member bound more than once. Only a mapping that bypassed
    /// [`ProjectionMapping::insert`] (e.g. a deserialized one) can have one.
    pub fn duplicate_member(&self) -> Option<&ProjectionMember> {
        self.0
            .iter()
            .enumerate()
            .find(|(i, (member, _))| self.0[..*i].iter().any(|(m, _)| m == member))
            .map(|(_, (member, _))| member)
    }
}

impl<V> FromIterator<(ProjectionMember, V)> for ProjectionMapping<V> {
    fn from_iter<I: IntoIterator<Item = (ProjectionMember, V)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (member, value) in iter {
            mapping.insert(member, value);
        }
        mapping
    }
}

impl<V> IntoIterator for ProjectionMapping<V> {
    type Item = (ProjectionMember, V);
    type IntoIter = std::vec::IntoIter<(ProjectionMember, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Either the lazily accumulated bindings, or the frozen column list plus
/// the member -> column index table left behind by the freeze.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum ProjectionState {
    Pending(ProjectionMapping<ProjectionExpr>),
    Frozen {
        columns: Vec<ProjectionColumn>,
        bindings: ProjectionMapping<usize>,
    },
}

impl Default for ProjectionState {
    fn default() -> Self {
        ProjectionState::Pending(ProjectionMapping::new())
    }
}

/// What a shape position resolves to at the current stage.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum MappedProjection<'a> {
    Expression(&'a ProjectionExpr),
    Column(usize),
}

impl ProjectionState {
    pub fn is_frozen(&self) -> bool {
        matches!(self, ProjectionState::Frozen { .. })
    }

    pub fn columns(&self) -> &[ProjectionColumn] {
        match self {
            ProjectionState::Pending(_) => &[],
            ProjectionState::Frozen { columns, .. } => columns,
        }
    }

    pub fn get_mapped(&self, member: &ProjectionMember) -> Option<MappedProjection<'_>> {
        match self {
            ProjectionState::Pending(mapping) => {
                mapping.get(member).map(MappedProjection::Expression)
            }
            ProjectionState::Frozen { bindings, .. } => {
                bindings.get(member).map(|idx| MappedProjection::Column(*idx))
            }
        }
    }

    /// Materializes every pending binding into a column. A frozen state is
    /// left untouched.
    pub fn freeze(&mut self, default_alias: &str) {
        let mapping = match self {
            ProjectionState::Frozen { .. } => return,
            ProjectionState::Pending(mapping) => std::mem::take(mapping),
        };

        let mut columns = Vec::with_capacity(mapping.len());
        let mut bindings = ProjectionMapping::new();
        for (member, expression) in mapping {
            let hint = member.last().and_then(MemberStep::name);
            let index = push_column(&mut columns, expression, hint, default_alias);
            bindings.insert(member, index);
        }

        log::debug!(
            "Froze projection into {} column(s): {:?}",
            columns.len(),
            columns.iter().map(|c| c.alias.as_str()).collect::<Vec<_>>()
        );
        *self = ProjectionState::Frozen { columns, bindings };
    }

    /// Drops the bindings (pending expressions or member -> column indexes),
    /// keeping any frozen columns.
    pub fn clear_mapping(&mut self) {
        match self {
            ProjectionState::Pending(mapping) => mapping.clear(),
            ProjectionState::Frozen { bindings, .. } => bindings.clear(),
        }
    }
}

/// Appends `expression` unless a structurally equal column already exists,
/// returning the column index either way.
pub(crate) fn push_column(
    columns: &mut Vec<ProjectionColumn>,
    expression: ProjectionExpr,
    alias: Option<&str>,
    default_alias: &str,
) -> usize {
    if let Some(existing) = columns.iter().position(|c| c.expression == expression) {
        return existing;
    }

    let base = alias
        .or_else(|| expression.access_name())
        .unwrap_or(default_alias)
        .to_string();
    let alias = unique_alias(&base, |candidate| {
        columns.iter().any(|c| alias_eq(&c.alias, candidate))
    });

    columns.push(ProjectionColumn { expression, alias });
    columns.len() - 1
}

/// First of `base`, `base0`, `base1`, ... that `is_taken` rejects.
pub(crate) fn unique_alias(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let mut candidate = base.to_string();
    let mut counter = 0;
    while is_taken(&candidate) {
        candidate = format!("{}{}", base, counter);
        counter += 1;
    }
    candidate
}

/// Aliases collide case-insensitively.
pub(crate) fn alias_eq(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
