//! Parser for the comparison grammar accepted in caller filters.
//!
//! ```text
//! or-expr    := and-expr ( ("," | "or") and-expr )*
//! and-expr   := primary ( (";" | "and") primary )*
//! primary    := "(" or-expr ")" | comparison
//! comparison := field op value | field ("=in=" | "=out=") "(" value ("," value)* ")"
//! op         := "==" | "!=" | ">" | "<" | ">=" | "<=" | "=gt=" | "=lt=" | "=ge=" | "=le="
//! ```

use crate::error::{QueryError, QueryResult};
use crate::predicate::{Comparison, Field, Predicate, Value};
use crate::schema::QuerySchema;

const MAX_NESTING: usize = 16;

/// Operators ordered so that longer spellings are tried first.
const OPERATORS: &[(&str, Operator)] = &[
    ("=out=", Operator::Out),
    ("=in=", Operator::In),
    ("=gt=", Operator::Compare(Comparison::Gt)),
    ("=ge=", Operator::Compare(Comparison::Ge)),
    ("=lt=", Operator::Compare(Comparison::Lt)),
    ("=le=", Operator::Compare(Comparison::Le)),
    ("==", Operator::Compare(Comparison::Eq)),
    ("!=", Operator::Compare(Comparison::Ne)),
    (">=", Operator::Compare(Comparison::Ge)),
    ("<=", Operator::Compare(Comparison::Le)),
    (">", Operator::Compare(Comparison::Gt)),
    ("<", Operator::Compare(Comparison::Lt)),
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Operator {
    Compare(Comparison),
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    LParen,
    RParen,
    Semicolon,
    Comma,
    Operator(Operator),
    Word(String),
    Quoted(String),
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    position: usize,
}

enum Literal {
    Null,
    Scalar(Value),
}

/// Parse a non-empty filter expression into a predicate tree.
pub fn parse(input: &str, schema: &QuerySchema) -> QueryResult<Predicate> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(QueryError::syntax(input, 0, "empty expression"));
    }

    let mut parser = Parser {
        input,
        tokens,
        cursor: 0,
        depth: 0,
        schema,
    };

    let predicate = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(QueryError::syntax(
            input,
            token.position,
            "unexpected token after complete expression",
        ));
    }

    Ok(predicate)
}

fn tokenize(input: &str) -> QueryResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut position = 0;

    while let Some(c) = input[position..].chars().next() {
        let rest = &input[position..];

        if c.is_whitespace() {
            position += c.len_utf8();
            continue;
        }

        let single = match c {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            ';' => Some(TokenKind::Semicolon),
            ',' => Some(TokenKind::Comma),
            _ => None,
        };
        if let Some(kind) = single {
            tokens.push(Token { kind, position });
            position += 1;
            continue;
        }

        if c == '\'' || c == '"' {
            let (text, consumed) = read_quoted(input, position, c)?;
            tokens.push(Token {
                kind: TokenKind::Quoted(text),
                position,
            });
            position += consumed;
            continue;
        }

        if matches!(c, '=' | '!' | '<' | '>') {
            let (spelling, operator) = OPERATORS
                .iter()
                .find(|(spelling, _)| rest.starts_with(spelling))
                .ok_or_else(|| QueryError::syntax(input, position, "unknown operator"))?;
            tokens.push(Token {
                kind: TokenKind::Operator(*operator),
                position,
            });
            position += spelling.len();
            continue;
        }

        let length = rest
            .char_indices()
            .find(|(_, c)| c.is_whitespace() || is_reserved(*c))
            .map(|(index, _)| index)
            .unwrap_or(rest.len());
        tokens.push(Token {
            kind: TokenKind::Word(rest[..length].to_string()),
            position,
        });
        position += length;
    }

    Ok(tokens)
}

fn is_reserved(c: char) -> bool {
    matches!(c, '(' | ')' | ';' | ',' | '\'' | '"' | '=' | '!' | '<' | '>')
}

/// Returns the unescaped text and the number of bytes consumed including quotes.
fn read_quoted(input: &str, start: usize, quote: char) -> QueryResult<(String, usize)> {
    let mut text = String::new();
    let mut escaped = false;

    for (offset, c) in input[start..].char_indices().skip(1) {
        if escaped {
            text.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok((text, offset + c.len_utf8()));
        } else {
            text.push(c);
        }
    }

    Err(QueryError::syntax(input, start, "unterminated quoted value"))
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
    schema: &'a QuerySchema,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn end_position(&self) -> usize {
        self.input.len()
    }

    fn error_at(&self, position: usize, message: &str) -> QueryError {
        QueryError::syntax(self.input, position, message)
    }

    fn next_is_connector(&self, symbol: &TokenKind, keyword: &str) -> bool {
        match self.peek() {
            Some(token) if token.kind == *symbol => true,
            Some(Token {
                kind: TokenKind::Word(word),
                ..
            }) => word.eq_ignore_ascii_case(keyword),
            _ => false,
        }
    }

    fn parse_or(&mut self) -> QueryResult<Predicate> {
        let mut terms = vec![self.parse_and()?];
        while self.next_is_connector(&TokenKind::Comma, "or") {
            self.next();
            terms.push(self.parse_and()?);
        }
        Ok(Predicate::or(terms))
    }

    fn parse_and(&mut self) -> QueryResult<Predicate> {
        let mut terms = vec![self.parse_primary()?];
        while self.next_is_connector(&TokenKind::Semicolon, "and") {
            self.next();
            terms.push(self.parse_primary()?);
        }
        Ok(Predicate::and(terms))
    }

    fn parse_primary(&mut self) -> QueryResult<Predicate> {
        let Some(token) = self.next() else {
            return Err(self.error_at(self.end_position(), "unexpected end of expression"));
        };

        match token.kind {
            TokenKind::LParen => {
                self.depth += 1;
                if self.depth > MAX_NESTING {
                    return Err(self.error_at(token.position, "expression is nested too deeply"));
                }
                let inner = self.parse_or()?;
                self.expect_closing(token.position)?;
                self.depth -= 1;
                Ok(inner)
            }
            TokenKind::Word(name) => self.parse_comparison(&name, token.position),
            _ => Err(self.error_at(token.position, "expected a field name or '('")),
        }
    }

    fn expect_closing(&mut self, opened_at: usize) -> QueryResult<()> {
        match self.next() {
            Some(Token {
                kind: TokenKind::RParen,
                ..
            }) => Ok(()),
            Some(token) => Err(self.error_at(token.position, "expected ')'")),
            None => Err(self.error_at(opened_at, "unbalanced '('")),
        }
    }

    fn parse_comparison(&mut self, name: &str, position: usize) -> QueryResult<Predicate> {
        let field = self.schema.resolve(name)?;

        let operator = match self.next() {
            Some(Token {
                kind: TokenKind::Operator(operator),
                ..
            }) => operator,
            Some(token) => return Err(self.error_at(token.position, "expected an operator")),
            None => return Err(self.error_at(position, "expected an operator after field")),
        };

        match operator {
            Operator::Compare(op) => match self.parse_literal()? {
                Literal::Null => match op {
                    Comparison::Eq => Ok(Predicate::IsNull {
                        field,
                        negated: false,
                    }),
                    Comparison::Ne => Ok(Predicate::IsNull {
                        field,
                        negated: true,
                    }),
                    _ => Err(unsupported(&field, "null")),
                },
                Literal::Scalar(value) => Ok(Predicate::Compare { field, op, value }),
            },
            Operator::In | Operator::Out => {
                let values = self.parse_list(&field)?;
                Ok(Predicate::In {
                    field,
                    values,
                    negated: operator == Operator::Out,
                })
            }
        }
    }

    fn parse_list(&mut self, field: &Field) -> QueryResult<Vec<Value>> {
        let opened_at = match self.next() {
            Some(Token {
                kind: TokenKind::LParen,
                position,
            }) => position,
            Some(token) => return Err(self.error_at(token.position, "expected '(' to open a value list")),
            None => return Err(self.error_at(self.end_position(), "expected '(' to open a value list")),
        };

        let mut values = Vec::new();
        loop {
            match self.parse_literal()? {
                Literal::Null => return Err(unsupported(field, "null")),
                Literal::Scalar(value) => values.push(value),
            }

            match self.next() {
                Some(Token {
                    kind: TokenKind::Comma,
                    ..
                }) => continue,
                Some(Token {
                    kind: TokenKind::RParen,
                    ..
                }) => break,
                Some(token) => return Err(self.error_at(token.position, "expected ',' or ')' in value list")),
                None => return Err(self.error_at(opened_at, "unterminated value list")),
            }
        }

        Ok(values)
    }

    fn parse_literal(&mut self) -> QueryResult<Literal> {
        match self.next() {
            Some(Token {
                kind: TokenKind::Quoted(text),
                ..
            }) => Ok(Literal::Scalar(Value::Text(text))),
            Some(Token {
                kind: TokenKind::Word(word),
                ..
            }) => Ok(classify(word)),
            Some(token) => Err(self.error_at(token.position, "expected a value")),
            None => Err(self.error_at(self.end_position(), "expected a value")),
        }
    }
}

fn unsupported(field: &Field, value: &str) -> QueryError {
    QueryError::UnsupportedValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn classify(word: String) -> Literal {
    match word.as_str() {
        "null" => return Literal::Null,
        "true" => return Literal::Scalar(Value::Boolean(true)),
        "false" => return Literal::Scalar(Value::Boolean(false)),
        _ => {}
    }

    if let Ok(integer) = word.parse::<i64>() {
        return Literal::Scalar(Value::Integer(integer));
    }

    let numeric_start = word
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
        .unwrap_or(false);
    if numeric_start {
        if let Ok(real) = word.parse::<f64>() {
            if real.is_finite() {
                return Literal::Scalar(Value::Real(real));
            }
        }
    }

    Literal::Scalar(Value::Text(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: QuerySchema = QuerySchema::new(
        &["id", "deployment_id", "created_by", "storage_name"],
        &["carp_header", "carp_body"],
        "deployment_id",
        "created_by",
    );

    fn column_eq(column: &'static str, value: Value) -> Predicate {
        Predicate::eq(Field::Column(column), value)
    }

    #[test]
    fn parses_single_comparison() {
        let predicate = parse("storage_name==heartrate", &SCHEMA).unwrap();
        assert_eq!(
            predicate,
            column_eq("storage_name", Value::Text("heartrate".into()))
        );
    }

    #[test]
    fn semicolon_binds_tighter_than_comma() {
        let predicate = parse("id==1;storage_name==a,id==2", &SCHEMA).unwrap();
        assert_eq!(
            predicate,
            Predicate::Or(vec![
                Predicate::And(vec![
                    column_eq("id", Value::Integer(1)),
                    column_eq("storage_name", Value::Text("a".into())),
                ]),
                column_eq("id", Value::Integer(2)),
            ])
        );
    }

    #[test]
    fn keywords_and_parentheses_group_terms() {
        let predicate = parse("(id==1 or id==2) and storage_name!='x y'", &SCHEMA).unwrap();
        assert_eq!(
            predicate,
            Predicate::And(vec![
                Predicate::Or(vec![
                    column_eq("id", Value::Integer(1)),
                    column_eq("id", Value::Integer(2)),
                ]),
                Predicate::Compare {
                    field: Field::Column("storage_name"),
                    op: Comparison::Ne,
                    value: Value::Text("x y".into()),
                },
            ])
        );
    }

    #[test]
    fn parses_all_comparison_spellings() {
        let cases = [
            ("id>1", Comparison::Gt),
            ("id<1", Comparison::Lt),
            ("id>=1", Comparison::Ge),
            ("id<=1", Comparison::Le),
            ("id=gt=1", Comparison::Gt),
            ("id=lt=1", Comparison::Lt),
            ("id=ge=1", Comparison::Ge),
            ("id=le=1", Comparison::Le),
            ("id!=1", Comparison::Ne),
        ];
        for (input, expected) in cases {
            match parse(input, &SCHEMA).unwrap() {
                Predicate::Compare { op, .. } => assert_eq!(op, expected, "{input}"),
                other => panic!("unexpected predicate for {input}: {other:?}"),
            }
        }
    }

    #[test]
    fn parses_in_and_out_lists() {
        let predicate = parse("id=in=(1,2,'three')", &SCHEMA).unwrap();
        assert_eq!(
            predicate,
            Predicate::In {
                field: Field::Column("id"),
                values: vec![
                    Value::Integer(1),
                    Value::Integer(2),
                    Value::Text("three".into())
                ],
                negated: false,
            }
        );

        let predicate = parse("storage_name=out=(a)", &SCHEMA).unwrap();
        assert!(matches!(predicate, Predicate::In { negated: true, .. }));
    }

    #[test]
    fn null_comparisons_become_null_checks() {
        assert_eq!(
            parse("storage_name==null", &SCHEMA).unwrap(),
            Predicate::IsNull {
                field: Field::Column("storage_name"),
                negated: false
            }
        );
        assert_eq!(
            parse("storage_name!=null", &SCHEMA).unwrap(),
            Predicate::IsNull {
                field: Field::Column("storage_name"),
                negated: true
            }
        );
        assert!(matches!(
            parse("storage_name>null", &SCHEMA),
            Err(QueryError::UnsupportedValue { .. })
        ));
        assert!(matches!(
            parse("id=in=(1,null)", &SCHEMA),
            Err(QueryError::UnsupportedValue { .. })
        ));
    }

    #[test]
    fn classifies_bare_values() {
        assert_eq!(
            parse("id==-4", &SCHEMA).unwrap(),
            column_eq("id", Value::Integer(-4))
        );
        assert_eq!(
            parse("id==2.5", &SCHEMA).unwrap(),
            column_eq("id", Value::Real(2.5))
        );
        assert_eq!(
            parse("storage_name==true", &SCHEMA).unwrap(),
            column_eq("storage_name", Value::Boolean(true))
        );
        assert_eq!(
            parse("storage_name==inf", &SCHEMA).unwrap(),
            column_eq("storage_name", Value::Text("inf".into()))
        );
        assert_eq!(
            parse("created_by==6f1c2a8e-0000-4000-8000-000000000001", &SCHEMA).unwrap(),
            column_eq(
                "created_by",
                Value::Text("6f1c2a8e-0000-4000-8000-000000000001".into())
            )
        );
    }

    #[test]
    fn quoted_values_support_escapes() {
        assert_eq!(
            parse(r#"storage_name=="say \"hi\"""#, &SCHEMA).unwrap(),
            column_eq("storage_name", Value::Text("say \"hi\"".into()))
        );
        assert_eq!(
            parse("storage_name=='it\\'s'", &SCHEMA).unwrap(),
            column_eq("storage_name", Value::Text("it's".into()))
        );
    }

    #[test]
    fn document_paths_are_resolved() {
        let predicate = parse("carp_header.data_format.name==location", &SCHEMA).unwrap();
        assert_eq!(
            predicate,
            Predicate::eq(
                Field::Document {
                    column: "carp_header",
                    path: vec!["data_format".into(), "name".into()],
                },
                Value::Text("location".into())
            )
        );
    }

    #[test]
    fn rejects_malformed_expressions() {
        for input in [
            "id",
            "id==",
            "==1",
            "id==1;",
            "id==1,",
            "(id==1",
            "id==1)",
            "id=in=1",
            "id=in=(1,2",
            "id=xx=1",
            "storage_name=='open",
            "id==1 id==2",
            "id = = 1",
            "!",
        ] {
            let result = parse(input, &SCHEMA);
            assert!(
                matches!(result, Err(QueryError::Syntax { .. })),
                "expected syntax error for {input:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn rejects_sql_injection_attempts_as_unknown_fields_or_syntax() {
        let attempts = [
            "id==1 OR 1=1",
            "id==1); DROP TABLE datapoints; --",
            "password==x",
        ];
        for input in attempts {
            assert!(parse(input, &SCHEMA).is_err(), "expected {input:?} to be rejected");
        }
    }

    #[test]
    fn sql_fragments_inside_quotes_stay_plain_text() {
        let predicate = parse("storage_name=='x'' OR ''1''=''1'", &SCHEMA);
        assert!(predicate.is_err());

        let predicate = parse(r"storage_name=='x\' OR 1=1 --'", &SCHEMA).unwrap();
        assert_eq!(
            predicate,
            column_eq("storage_name", Value::Text("x' OR 1=1 --".into()))
        );
    }

    #[test]
    fn rejects_excessive_nesting() {
        let input = format!("{}id==1{}", "(".repeat(40), ")".repeat(40));
        let error = parse(&input, &SCHEMA).unwrap_err();
        assert!(error.to_string().contains("nested too deeply"));
    }

    #[test]
    fn error_reports_offending_fragment() {
        let error = parse("id==1;;storage_name==a", &SCHEMA).unwrap_err();
        assert_eq!(error.fragment(), ";storage_name==a");
    }
}
