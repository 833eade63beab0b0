//! Query builder utilities
//!
//! Filter and search inputs become a [`Predicate`]; executors turn predicates
//! into SQL through [`SqlGenerator`] or evaluate them directly.

pub mod filter;
pub mod predicate;
pub mod search;
pub mod sql_generation;


pub use filter::{FieldFilter, FilterExpression, FilterOperator, PredicateBuilder};
pub use predicate::{Comparison, ComparisonOp, Operand, Predicate};
pub use search::{SearchPredicateBuilder, SearchShape};
pub use sql_generation::SqlGenerator;
