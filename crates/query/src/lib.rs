//! Cohort Query Crate
//!
//! Turns caller-supplied filter expressions into structured predicates that
//! are always conjoined with a role-derived scope clause. The predicates never
//! carry raw SQL; storage backends render them through their own
//! parameterised query mechanism.

pub mod builder;
pub mod error;
pub mod parser;
pub mod predicate;
pub mod role;
pub mod schema;

pub use builder::{build_filter, scope_clause, CompiledPredicate, FilterBuilder, DEFAULT_MAX_FILTER_LENGTH};
pub use error::{QueryError, QueryResult};
pub use predicate::{Comparison, Field, Predicate, Value};
pub use role::{Caller, Role};
pub use schema::QuerySchema;
