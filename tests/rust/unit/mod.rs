//! Unit tests - property checks over the public query block API
//!
//! These run without any container; every block is built and printed in memory.

mod join_properties;
mod select_properties;
