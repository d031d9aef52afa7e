//! Field catalogues for queryable record types

use crate::error::{QueryError, QueryResult};
use crate::predicate::Field;

/// Describes which fields of a record type callers may filter and sort on,
/// and which fields carry the resource scope and the record's creator.
#[derive(Debug, Clone, Copy)]
pub struct QuerySchema {
    columns: &'static [&'static str],
    documents: &'static [&'static str],
    scope_field: &'static str,
    creator_field: &'static str,
}

impl QuerySchema {
    pub const fn new(
        columns: &'static [&'static str],
        documents: &'static [&'static str],
        scope_field: &'static str,
        creator_field: &'static str,
    ) -> Self {
        Self {
            columns,
            documents,
            scope_field,
            creator_field,
        }
    }

    pub fn scope_field(&self) -> Field {
        Field::Column(self.scope_field)
    }

    pub fn creator_field(&self) -> Field {
        Field::Column(self.creator_field)
    }

    /// Resolve a caller-supplied field name.
    ///
    /// Plain names must match a column exactly; dotted names must start with
    /// a document column and continue with identifier segments.
    pub fn resolve(&self, name: &str) -> QueryResult<Field> {
        if let Some(column) = self.columns.iter().find(|column| **column == name) {
            return Ok(Field::Column(*column));
        }

        let unknown = || QueryError::UnknownField {
            field: name.to_string(),
        };

        let (head, rest) = name.split_once('.').ok_or_else(unknown)?;
        let column = self
            .documents
            .iter()
            .find(|column| **column == head)
            .ok_or_else(unknown)?;

        let path = rest
            .split('.')
            .map(|segment| {
                if is_identifier(segment) {
                    Ok(segment.to_string())
                } else {
                    Err(unknown())
                }
            })
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(Field::Document {
            column: *column,
            path,
        })
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: QuerySchema = QuerySchema::new(
        &["id", "deployment_id", "created_by"],
        &["carp_header"],
        "deployment_id",
        "created_by",
    );

    #[test]
    fn resolves_plain_columns() {
        assert_eq!(SCHEMA.resolve("deployment_id").unwrap(), Field::Column("deployment_id"));
    }

    #[test]
    fn resolves_document_paths() {
        let field = SCHEMA.resolve("carp_header.data_format.namespace").unwrap();
        assert_eq!(
            field,
            Field::Document {
                column: "carp_header",
                path: vec!["data_format".into(), "namespace".into()],
            }
        );
    }

    #[test]
    fn rejects_unknown_and_malformed_fields() {
        for name in [
            "password",
            "carp_body.x",
            "carp_header",
            "carp_header.",
            "carp_header..a",
            "carp_header.a'b",
            "carp_header.1a",
            "id.sub",
        ] {
            assert!(
                matches!(SCHEMA.resolve(name), Err(QueryError::UnknownField { .. })),
                "expected {name} to be rejected"
            );
        }
    }
}
