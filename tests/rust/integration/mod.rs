//! Integration tests - build, compose, rewrite and print whole query trees
//!
//! These go through the public API only, the way a LINQ-style translator
//! front end would drive the crate.

mod plan_serialization;
mod query_scenarios;
