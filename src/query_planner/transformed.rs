use std::sync::Arc;

/// Result of a rewrite pass over a shared node.
///
/// `No` always carries the node that was handed in, so callers can keep
/// sharing it instead of reallocating.
#[derive(Debug, PartialEq, Clone)]
pub enum Transformed<T> {
    Yes(T),
    No(T),
}

impl<T> Transformed<T> {
    pub fn get_plan(self) -> T {
        match self {
            Transformed::Yes(plan) | Transformed::No(plan) => plan,
        }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, Transformed::Yes(_))
    }
}

impl<T> Transformed<Arc<T>> {
    /// The rewritten node, or `None` when the original is still current.
    pub fn into_changed(self) -> Option<Arc<T>> {
        match self {
            Transformed::Yes(plan) => Some(plan),
            Transformed::No(_) => None,
        }
    }
}
