//! docsql - query IR and builder for a JSON document store SQL dialect
//!
//! This crate provides:
//! - A scalar expression model with structural equality
//! - Query blocks with lazy projection binding, joins and paging rules
//! - Copy-on-write tree rewriting
//! - Partition key extraction for routed reads
//! - Dialect text generation

pub mod config;
pub mod query_planner;
pub mod select_plan;
pub mod sql_generator;
