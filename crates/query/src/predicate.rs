//! Structured predicate tree produced by the filter builder

use std::fmt;

/// A record field a predicate may address.
///
/// Column names are always taken from a [`crate::QuerySchema`], never from
/// caller input, so backends may splice them into statements verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Column(&'static str),
    /// A dotted path inside a structured document column.
    Document {
        column: &'static str,
        path: Vec<String>,
    },
}

impl Field {
    /// JSON path expression (`$.a.b`) for document fields.
    pub fn json_path(&self) -> Option<String> {
        match self {
            Field::Column(_) => None,
            Field::Document { path, .. } => Some(format!("$.{}", path.join("."))),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Column(column) => f.write_str(column),
            Field::Document { column, path } => write!(f, "{}.{}", column, path.join(".")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => write!(f, "'{}'", text.replace('\'', "\\'")),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Real(value) => write!(f, "{value}"),
            Value::Boolean(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Comparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Gt => ">",
            Comparison::Lt => "<",
            Comparison::Ge => ">=",
            Comparison::Le => "<=",
        }
    }

    /// SQL spelling of the operator.
    pub fn sql(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Ne => "<>",
            Comparison::Gt => ">",
            Comparison::Lt => "<",
            Comparison::Ge => ">=",
            Comparison::Le => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Compare {
        field: Field,
        op: Comparison,
        value: Value,
    },
    In {
        field: Field,
        values: Vec<Value>,
        negated: bool,
    },
    IsNull {
        field: Field,
        negated: bool,
    },
}

impl Predicate {
    pub fn eq(field: Field, value: Value) -> Self {
        Predicate::Compare {
            field,
            op: Comparison::Eq,
            value,
        }
    }

    /// Conjunction that collapses to the single term when only one is given.
    pub fn and(mut terms: Vec<Predicate>) -> Self {
        if terms.len() == 1 {
            terms.remove(0)
        } else {
            Predicate::And(terms)
        }
    }

    pub fn or(mut terms: Vec<Predicate>) -> Self {
        if terms.len() == 1 {
            terms.remove(0)
        } else {
            Predicate::Or(terms)
        }
    }

    /// Nesting depth of the tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Predicate::And(terms) | Predicate::Or(terms) => {
                1 + terms.iter().map(Predicate::depth).max().unwrap_or(0)
            }
            _ => 1,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::And(terms) => write_joined(f, terms, ";"),
            Predicate::Or(terms) => write_joined(f, terms, ","),
            Predicate::Compare { field, op, value } => write!(f, "{}{}{}", field, op.as_str(), value),
            Predicate::In {
                field,
                values,
                negated,
            } => {
                let operator = if *negated { "=out=" } else { "=in=" };
                write!(f, "{field}{operator}(")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str(")")
            }
            Predicate::IsNull { field, negated } => {
                let operator = if *negated { "!=" } else { "==" };
                write!(f, "{field}{operator}null")
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, terms: &[Predicate], separator: &str) -> fmt::Result {
    f.write_str("(")?;
    for (index, term) in terms.iter().enumerate() {
        if index > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{term}")?;
    }
    f.write_str(")")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_of_single_term_collapses() {
        let term = Predicate::eq(Field::Column("id"), Value::Integer(1));
        assert_eq!(Predicate::and(vec![term.clone()]), term);
    }

    #[test]
    fn document_fields_expose_json_paths() {
        let field = Field::Document {
            column: "carp_header",
            path: vec!["data_format".into(), "name".into()],
        };
        assert_eq!(field.json_path().as_deref(), Some("$.data_format.name"));
        assert_eq!(Field::Column("id").json_path(), None);
    }

    #[test]
    fn display_renders_canonical_expression() {
        let predicate = Predicate::And(vec![
            Predicate::Or(vec![
                Predicate::eq(Field::Column("storage_name"), Value::Text("a".into())),
                Predicate::IsNull {
                    field: Field::Column("storage_name"),
                    negated: false,
                },
            ]),
            Predicate::In {
                field: Field::Column("id"),
                values: vec![Value::Integer(1), Value::Integer(2)],
                negated: true,
            },
        ]);

        assert_eq!(
            predicate.to_string(),
            "((storage_name=='a',storage_name==null);id=out=(1,2))"
        );
        assert_eq!(predicate.depth(), 3);
    }
}
