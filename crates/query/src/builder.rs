//! Role-scoped filter compilation

use std::fmt;

use tracing::{debug, warn};

use crate::error::{QueryError, QueryResult};
use crate::parser;
use crate::predicate::{Predicate, Value};
use crate::role::Caller;
use crate::schema::QuerySchema;

pub const DEFAULT_MAX_FILTER_LENGTH: usize = 2048;

/// A caller filter conjoined with its mandatory scope clause.
///
/// The same value feeds both the list and the count path of a query backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    predicate: Predicate,
    scope: Predicate,
    has_caller_filter: bool,
}

impl CompiledPredicate {
    fn scope_only(scope: Predicate) -> Self {
        Self {
            predicate: scope.clone(),
            scope,
            has_caller_filter: false,
        }
    }

    fn with_filter(filter: Predicate, scope: Predicate) -> Self {
        Self {
            predicate: Predicate::And(vec![filter, scope.clone()]),
            scope,
            has_caller_filter: true,
        }
    }

    /// The full predicate to execute.
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn scope(&self) -> &Predicate {
        &self.scope
    }

    pub fn has_caller_filter(&self) -> bool {
        self.has_caller_filter
    }
}

impl fmt::Display for CompiledPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate)
    }
}

/// Scope clause for a caller: below the researcher threshold only
/// self-authored records of the resource, otherwise every record of it.
pub fn scope_clause(caller: &Caller, scope_id: &str, schema: &QuerySchema) -> Predicate {
    let resource = Predicate::eq(schema.scope_field(), Value::Text(scope_id.to_string()));

    if caller.role.sees_all_records() {
        resource
    } else {
        Predicate::And(vec![
            resource,
            Predicate::eq(schema.creator_field(), Value::Text(caller.id.to_string())),
        ])
    }
}

#[derive(Debug, Clone)]
pub struct FilterBuilder {
    max_length: usize,
}

impl Default for FilterBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILTER_LENGTH)
    }
}

impl FilterBuilder {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Parse `raw` and conjoin it with the caller's scope clause.
    ///
    /// An absent, empty or blank filter yields the scope clause alone.
    pub fn build(
        &self,
        raw: Option<&str>,
        caller: &Caller,
        scope_id: &str,
        schema: &QuerySchema,
    ) -> QueryResult<CompiledPredicate> {
        let scope = scope_clause(caller, scope_id, schema);

        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Ok(CompiledPredicate::scope_only(scope));
        };

        if raw.len() > self.max_length {
            warn!(length = raw.len(), max = self.max_length, "rejected oversized filter expression");
            return Err(QueryError::TooLong {
                length: raw.len(),
                max: self.max_length,
            });
        }

        let filter = parser::parse(raw, schema).map_err(|error| {
            warn!(fragment = error.fragment(), %error, "rejected filter expression");
            error
        })?;

        let compiled = CompiledPredicate::with_filter(filter, scope);
        debug!(predicate = %compiled, role = %caller.role, "compiled filter expression");
        Ok(compiled)
    }
}

/// [`FilterBuilder::build`] with the default length limit.
pub fn build_filter(
    raw: Option<&str>,
    caller: &Caller,
    scope_id: &str,
    schema: &QuerySchema,
) -> QueryResult<CompiledPredicate> {
    FilterBuilder::default().build(raw, caller, scope_id, schema)
}
