//! Regex heuristics that pull CTEs and table names out of a SQL query.

mod cte;
mod normalize;
mod tables;

pub use cte::{CteDefinition, extract_ctes, extract_main_query};
pub use normalize::normalize_query;
pub use tables::extract_tables;
