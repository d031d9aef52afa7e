//! Rendering of structured predicates into parameterised SQLite statements

use cohort_query::{Field, Predicate, QueryError, QueryResult, QuerySchema, Value};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::types::DatabaseResult;

/// Append `predicate` to `builder`. Column names come from a static schema;
/// every value and JSON path is bound as a parameter.
pub fn push_predicate(builder: &mut QueryBuilder<'_, Sqlite>, predicate: &Predicate) {
    match predicate {
        Predicate::And(terms) => push_terms(builder, terms, " AND ", "1 = 1"),
        Predicate::Or(terms) => push_terms(builder, terms, " OR ", "1 = 0"),
        Predicate::Compare { field, op, value } => {
            push_field(builder, field);
            builder.push(" ").push(op.sql()).push(" ");
            push_value(builder, value);
        }
        Predicate::In {
            field,
            values,
            negated,
        } => {
            if values.is_empty() {
                builder.push(if *negated { "1 = 1" } else { "1 = 0" });
                return;
            }
            push_field(builder, field);
            builder.push(if *negated { " NOT IN (" } else { " IN (" });
            for (index, value) in values.iter().enumerate() {
                if index > 0 {
                    builder.push(", ");
                }
                push_value(builder, value);
            }
            builder.push(")");
        }
        Predicate::IsNull { field, negated } => {
            push_field(builder, field);
            builder.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
        }
    }
}

fn push_terms(
    builder: &mut QueryBuilder<'_, Sqlite>,
    terms: &[Predicate],
    connector: &str,
    empty: &str,
) {
    if terms.is_empty() {
        builder.push(empty);
        return;
    }
    builder.push("(");
    for (index, term) in terms.iter().enumerate() {
        if index > 0 {
            builder.push(connector);
        }
        push_predicate(builder, term);
    }
    builder.push(")");
}

fn push_field(builder: &mut QueryBuilder<'_, Sqlite>, field: &Field) {
    match field {
        Field::Column(column) => {
            builder.push(*column);
        }
        Field::Document { column, .. } => {
            builder.push("json_extract(").push(*column).push(", ");
            builder.push_bind(field.json_path().unwrap_or_default());
            builder.push(")");
        }
    }
}

fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::Text(text) => builder.push_bind(text.clone()),
        Value::Integer(number) => builder.push_bind(*number),
        Value::Real(number) => builder.push_bind(*number),
        Value::Boolean(flag) => builder.push_bind(*flag),
    };
}

/// Ordering requested by a caller, resolved against a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: Field,
    pub descending: bool,
}

impl Sort {
    /// Parse `field`, `-field`, `field,asc` or `field,desc`.
    pub fn parse(raw: &str, schema: &QuerySchema) -> QueryResult<Self> {
        let raw = raw.trim();
        if let Some(name) = raw.strip_prefix('-') {
            return Ok(Self {
                field: schema.resolve(name.trim())?,
                descending: true,
            });
        }
        let (name, direction) = match raw.split_once(',') {
            Some((name, direction)) => (name.trim(), direction.trim()),
            None => (raw, "asc"),
        };
        let descending = match direction.to_ascii_lowercase().as_str() {
            "asc" => false,
            "desc" => true,
            _ => {
                return Err(QueryError::UnsupportedValue {
                    field: name.to_string(),
                    value: direction.to_string(),
                })
            }
        };
        Ok(Self {
            field: schema.resolve(name)?,
            descending,
        })
    }
}

/// Zero-based page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: Option<Sort>,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            sort: None,
        }
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Bound the page size to `1..=max_size`.
    pub fn clamped(mut self, max_size: u32) -> Self {
        self.size = self.size.clamp(1, max_size.max(1));
        self
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }
}

/// Append `ORDER BY ... LIMIT ? OFFSET ?`. Ties always break on `id` so
/// consecutive pages never overlap.
pub fn push_page(builder: &mut QueryBuilder<'_, Sqlite>, page: &PageRequest) {
    builder.push(" ORDER BY ");
    if let Some(sort) = &page.sort {
        push_field(builder, &sort.field);
        builder.push(if sort.descending { " DESC, " } else { " ASC, " });
    }
    builder.push("id ASC LIMIT ");
    builder.push_bind(i64::from(page.size));
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());
}

/// `DELETE FROM table WHERE column IN (...)`; an empty key list touches nothing.
pub async fn delete_where_in<T>(
    conn: &mut SqliteConnection,
    table: &'static str,
    column: &'static str,
    keys: &[T],
) -> DatabaseResult<u64>
where
    T: for<'q> sqlx::Encode<'q, Sqlite> + sqlx::Type<Sqlite> + Clone + Send + 'static,
{
    if keys.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM ");
    builder.push(table).push(" WHERE ").push(column);
    push_key_list(&mut builder, keys);
    let result = builder.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

pub async fn count_where_in<T>(
    conn: &mut SqliteConnection,
    table: &'static str,
    column: &'static str,
    keys: &[T],
) -> DatabaseResult<i64>
where
    T: for<'q> sqlx::Encode<'q, Sqlite> + sqlx::Type<Sqlite> + Clone + Send + 'static,
{
    if keys.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM ");
    builder.push(table).push(" WHERE ").push(column);
    push_key_list(&mut builder, keys);
    let count = builder
        .build_query_scalar::<i64>()
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

fn push_key_list<T>(builder: &mut QueryBuilder<'_, Sqlite>, keys: &[T])
where
    T: for<'q> sqlx::Encode<'q, Sqlite> + sqlx::Type<Sqlite> + Clone + Send + 'static,
{
    builder.push(" IN (");
    let mut separated = builder.separated(", ");
    for key in keys {
        separated.push_bind(key.clone());
    }
    separated.push_unseparated(")");
}
