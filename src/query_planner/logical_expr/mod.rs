//! Scalar expression model for the document SQL dialect.
//!
//! Every node exclusively owns its children, so a tree can be cloned or
//! compared without worrying about aliasing. Equality is structural; the
//! projection layer relies on it to de-duplicate columns and sort keys.
//!
//! Field names that reach this layer have already been mapped from the
//! object model by the translator; [`PropertyAccess::name`] is the JSON key.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::select_plan::SelectExpr;

pub mod visitors;

/// JSON type of the value an expression produces.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, Default)]
pub enum JsonType {
    Boolean,
    Number,
    String,
    Array,
    Object,
    Null,
    #[default]
    Unknown,
}

impl JsonType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Boolean,
            Value::Number(_) => JsonType::Number,
            Value::String(_) => JsonType::String,
            Value::Array(_) => JsonType::Array,
            Value::Object(_) => JsonType::Object,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum SqlExpr {
    /// A literal JSON value, e.g. `3`, `"west"`, `[1,2]`.
    Constant(Constant),

    /// A named runtime parameter, printed as `@name`.
    Parameter(Parameter),

    Binary(BinaryExpr),

    Unary(UnaryExpr),

    /// Property access over a document or nested object: `c["Name"]`.
    PropertyAccess(PropertyAccess),

    /// Array element access: `c["Ints"][0]`.
    ArrayIndex(ArrayIndex),

    FunctionCall(FunctionCall),

    /// An array literal built from expressions: `[1, c["Int"], @p]`.
    InlineArray(Vec<SqlExpr>),

    /// `item IN (v1, v2)` or `item NOT IN (v1, v2)`.
    In(InExpr),

    /// A nested query block used as a value.
    Subquery(Subquery),

    /// Reference to an iteration variable or join alias holding a scalar.
    ScalarReference(ScalarReference),

    /// Reference to a whole document bound to an alias.
    ObjectReference(ObjectReference),

    /// Raw JSON/SQL text emitted verbatim.
    Fragment(String),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Constant {
    pub value: Value,
    pub ty: JsonType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Name without the `@` sigil.
    pub name: String,
    pub ty: JsonType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub operator: Operator,
    pub left: Box<SqlExpr>,
    pub right: Box<SqlExpr>,
    pub ty: JsonType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub operator: UnaryOperator,
    pub operand: Box<SqlExpr>,
    pub ty: JsonType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PropertyAccess {
    pub base: Box<SqlExpr>,
    pub name: String,
    pub ty: JsonType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ArrayIndex {
    pub array: Box<SqlExpr>,
    pub index: Box<SqlExpr>,
    pub ty: JsonType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<SqlExpr>,
    pub ty: JsonType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InExpr {
    pub item: Box<SqlExpr>,
    pub values: Vec<SqlExpr>,
    pub negated: bool,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum SubqueryKind {
    /// `ARRAY(SELECT ...)`
    Array,
    /// `EXISTS (SELECT ...)`
    Exists,
    /// `(SELECT ...)`, a single scalar
    Scalar,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Subquery {
    pub kind: SubqueryKind,
    pub select: Arc<SelectExpr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ScalarReference {
    pub alias: String,
    pub ty: JsonType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ObjectReference {
    pub entity_type: String,
    pub alias: String,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Operator {
    And,
    Or,
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Modulo,
    /// String concatenation `||`
    Concat,
    /// Null coalescing `??`
    Coalesce,
}

impl Operator {
    pub fn sql_symbol(&self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessThanEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanEqual => ">=",
            Operator::Addition => "+",
            Operator::Subtraction => "-",
            Operator::Multiplication => "*",
            Operator::Division => "/",
            Operator::Modulo => "%",
            Operator::Concat => "||",
            Operator::Coalesce => "??",
        }
    }

    /// True for logical and comparison operators, which always yield a boolean.
    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            Operator::And
                | Operator::Or
                | Operator::Equal
                | Operator::NotEqual
                | Operator::LessThan
                | Operator::LessThanEqual
                | Operator::GreaterThan
                | Operator::GreaterThanEqual
        )
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Negate,
}

impl SqlExpr {
    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        SqlExpr::Constant(Constant {
            ty: JsonType::of(&value),
            value,
        })
    }

    pub fn parameter(name: impl Into<String>, ty: JsonType) -> Self {
        SqlExpr::Parameter(Parameter {
            name: name.into(),
            ty,
        })
    }

    /// Builds `left <op> right`; the result type follows the operator for
    /// logical/comparison operators and the left operand otherwise.
    pub fn binary(operator: Operator, left: SqlExpr, right: SqlExpr) -> Self {
        let ty = if operator.is_boolean() {
            JsonType::Boolean
        } else if operator == Operator::Concat {
            JsonType::String
        } else {
            left.ty()
        };
        SqlExpr::Binary(BinaryExpr {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        })
    }

    pub fn and(left: SqlExpr, right: SqlExpr) -> Self {
        Self::binary(Operator::And, left, right)
    }

    pub fn equal(left: SqlExpr, right: SqlExpr) -> Self {
        Self::binary(Operator::Equal, left, right)
    }

    pub fn not(operand: SqlExpr) -> Self {
        SqlExpr::Unary(UnaryExpr {
            operator: UnaryOperator::Not,
            operand: Box::new(operand),
            ty: JsonType::Boolean,
        })
    }

    pub fn negate(operand: SqlExpr) -> Self {
        let ty = operand.ty();
        SqlExpr::Unary(UnaryExpr {
            operator: UnaryOperator::Negate,
            operand: Box::new(operand),
            ty,
        })
    }

    pub fn property(base: SqlExpr, name: impl Into<String>, ty: JsonType) -> Self {
        SqlExpr::PropertyAccess(PropertyAccess {
            base: Box::new(base),
            name: name.into(),
            ty,
        })
    }

    pub fn index(array: SqlExpr, index: SqlExpr, ty: JsonType) -> Self {
        SqlExpr::ArrayIndex(ArrayIndex {
            array: Box::new(array),
            index: Box::new(index),
            ty,
        })
    }

    pub fn function(name: impl Into<String>, args: Vec<SqlExpr>, ty: JsonType) -> Self {
        SqlExpr::FunctionCall(FunctionCall {
            name: name.into(),
            args,
            ty,
        })
    }

    pub fn array(items: Vec<SqlExpr>) -> Self {
        SqlExpr::InlineArray(items)
    }

    pub fn in_list(item: SqlExpr, values: Vec<SqlExpr>, negated: bool) -> Self {
        SqlExpr::In(InExpr {
            item: Box::new(item),
            values,
            negated,
        })
    }

    pub fn subquery(kind: SubqueryKind, select: SelectExpr) -> Self {
        SqlExpr::Subquery(Subquery {
            kind,
            select: Arc::new(select),
        })
    }

    pub fn scalar_ref(alias: impl Into<String>, ty: JsonType) -> Self {
        SqlExpr::ScalarReference(ScalarReference {
            alias: alias.into(),
            ty,
        })
    }

    pub fn object_ref(entity_type: impl Into<String>, alias: impl Into<String>) -> Self {
        SqlExpr::ObjectReference(ObjectReference {
            entity_type: entity_type.into(),
            alias: alias.into(),
        })
    }

    pub fn fragment(text: impl Into<String>) -> Self {
        SqlExpr::Fragment(text.into())
    }

    pub fn ty(&self) -> JsonType {
        match self {
            SqlExpr::Constant(c) => c.ty,
            SqlExpr::Parameter(p) => p.ty,
            SqlExpr::Binary(b) => b.ty,
            SqlExpr::Unary(u) => u.ty,
            SqlExpr::PropertyAccess(p) => p.ty,
            SqlExpr::ArrayIndex(a) => a.ty,
            SqlExpr::FunctionCall(f) => f.ty,
            SqlExpr::InlineArray(_) => JsonType::Array,
            SqlExpr::In(_) => JsonType::Boolean,
            SqlExpr::Subquery(s) => match s.kind {
                SubqueryKind::Array => JsonType::Array,
                SubqueryKind::Exists => JsonType::Boolean,
                SubqueryKind::Scalar => JsonType::Unknown,
            },
            SqlExpr::ScalarReference(r) => r.ty,
            SqlExpr::ObjectReference(_) => JsonType::Object,
            SqlExpr::Fragment(_) => JsonType::Unknown,
        }
    }

    /// The name a projection of this expression is known by without an
    /// explicit alias: the accessed property, or the bound alias.
    pub fn access_name(&self) -> Option<&str> {
        match self {
            SqlExpr::PropertyAccess(p) => Some(&p.name),
            SqlExpr::ScalarReference(r) => Some(&r.alias),
            SqlExpr::ObjectReference(o) => Some(&o.alias),
            _ => None,
        }
    }

    pub fn is_true_constant(&self) -> bool {
        matches!(self, SqlExpr::Constant(Constant { value: Value::Bool(true), .. }))
    }
}
