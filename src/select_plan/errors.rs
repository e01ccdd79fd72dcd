use thiserror::Error;

/// Dialect restrictions a rejected operation ran into.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DialectLimitation {
    #[error("the document SQL dialect cannot push an ordered, paged or distinct query into a subquery")]
    NoSubqueryPushdown,

    #[error("reversing the ordering is not supported once OFFSET or LIMIT has been applied")]
    ReverseAfterPaging,

    #[error("the projection has already been applied and can no longer be rebound")]
    ProjectionAlreadyApplied,

    #[error("a VALUE projection must contain exactly one column")]
    SingleValueArity,

    #[error("a point read addresses a single document and cannot be joined")]
    JoinOnPointRead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    StructuralViolation,
    UnresolvedBinding,
    UnsupportedShape,
    InvalidPlan,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SelectPlanError {
    #[error("Translation of '{expression}' failed: {limitation}")]
    Structural {
        expression: String,
        limitation: DialectLimitation,
    },

    #[error("Projection member '{0}' is not bound (internal translator error)")]
    UnresolvedBinding(String),

    #[error("Complex projections in subqueries are not supported: member '{0}' of the joined query projects into an unmaterialized object")]
    ComplexProjectionInSubquery(String),

    #[error("Invalid select plan: {0}")]
    InvalidPlan(String),
}

impl SelectPlanError {
    pub fn structural(expression: impl Into<String>, limitation: DialectLimitation) -> Self {
        SelectPlanError::Structural {
            expression: expression.into(),
            limitation,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SelectPlanError::Structural { .. } => ErrorKind::StructuralViolation,
            SelectPlanError::UnresolvedBinding(_) => ErrorKind::UnresolvedBinding,
            SelectPlanError::ComplexProjectionInSubquery(_) => ErrorKind::UnsupportedShape,
            SelectPlanError::InvalidPlan(_) => ErrorKind::InvalidPlan,
        }
    }
}

pub type PlanResult<T> = Result<T, SelectPlanError>;
