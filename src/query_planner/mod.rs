pub mod logical_expr;
pub mod transformed;
