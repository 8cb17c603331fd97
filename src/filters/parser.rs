//! Filter query parser for conversation selection.
//!
//! # Syntax
//!
//! ```text
//! filter_expr := field_filter (operator? field_filter)*
//! field_filter := field_name:value | field_name:"quoted value"
//! operator := AND | OR (case-insensitive)
//! field_name := title | plugin | content | model | since | until (case-insensitive)
//! ```
//!
//! Without an explicit operator, terms on the same field are OR'd and terms on
//! different fields are AND'd.
//!
//! # Examples
//!
//! ```rust
//! # use chat_export_analyzer::filters::parser::parse_filter;
//! let expr = parse_filter("plugin:weather content:code").unwrap();
//! let expr = parse_filter("title:\"trip plan\" OR title:itinerary").unwrap();
//! let expr = parse_filter("since:2024-01-01 until:2024-03-31").unwrap();
//! ```

use std::iter::Peekable;
use std::str::Chars;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;

use super::ast::{FieldFilter, FilterExpr, FilterField, FilterOperator};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    FieldValue { field: String, value: String },
    And,
    Or,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let word = read_word(&mut chars);
        match word.to_uppercase().as_str() {
            "AND" => tokens.push(Token::And),
            "OR" => tokens.push(Token::Or),
            _ => {
                let Some((field, value)) = word.split_once(':') else {
                    return Err(anyhow!(
                        "Invalid token: '{}' (expected field:value or AND/OR)",
                        word
                    ));
                };
                let value = if value.starts_with('"') {
                    read_quoted_value(&mut chars, value)?
                } else {
                    value.to_string()
                };

                if field.is_empty() || value.trim().is_empty() {
                    return Err(anyhow!("Invalid field:value format: {}", word));
                }
                tokens.push(Token::FieldValue { field: field.to_string(), value });
            }
        }
    }

    Ok(tokens)
}

fn read_word(chars: &mut Peekable<Chars>) -> String {
    let mut word = String::new();
    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            break;
        }
        word.push(ch);
        chars.next();
    }
    word
}

/// `initial` is the part of the word after the colon, opening quote included
fn read_quoted_value(chars: &mut Peekable<Chars>, initial: &str) -> Result<String> {
    let mut value = initial[1..].to_string();

    if let Some(quote_pos) = value.find('"') {
        value.truncate(quote_pos);
        return Ok(value);
    }

    for ch in chars.by_ref() {
        if ch == '"' {
            return Ok(value);
        }
        value.push(ch);
    }

    Err(anyhow!("Unterminated quoted string"))
}

fn parse_field(field: &str) -> Result<FilterField> {
    FilterField::from_name(field).ok_or_else(|| {
        anyhow!("Unknown field: '{}' (valid fields: {})", field, FilterField::NAMES.join(", "))
    })
}

/// Parse a filter string into a [`FilterExpr`]
///
/// An empty or blank input yields an empty expression, which matches everything.
///
/// # Errors
///
/// Returns an error for unknown fields, malformed terms, dangling operators,
/// unterminated quotes and dates that are not valid `YYYY-MM-DD`.
pub fn parse_filter(input: &str) -> Result<FilterExpr> {
    let tokens = tokenize(input).with_context(|| format!("Failed to parse filter '{}'", input))?;

    let mut expr = FilterExpr::new();
    let mut expecting_filter = true;
    let mut last_field: Option<FilterField> = None;

    for token in tokens {
        match token {
            Token::FieldValue { field, value } => {
                let filter_field = parse_field(&field)?;
                validate_value(filter_field, &value)?;

                // No explicit operator since the previous term
                if !expecting_filter {
                    let implicit_op = match last_field {
                        Some(prev) if prev == filter_field => FilterOperator::Or,
                        _ => FilterOperator::And,
                    };
                    expr.add_operator(implicit_op);
                }

                expr.add_filter(FieldFilter::new(filter_field, value));
                last_field = Some(filter_field);
                expecting_filter = false;
            }
            Token::And | Token::Or if expecting_filter => {
                return Err(anyhow!("Unexpected operator (expected field:value)"));
            }
            Token::And => {
                expr.add_operator(FilterOperator::And);
                expecting_filter = true;
            }
            Token::Or => {
                expr.add_operator(FilterOperator::Or);
                expecting_filter = true;
            }
        }
    }

    if expecting_filter && !expr.is_empty() {
        return Err(anyhow!("Filter ended with operator (expected field:value)"));
    }

    Ok(expr)
}

fn validate_value(field: FilterField, value: &str) -> Result<()> {
    if field.is_date() && parse_date(value).is_none() {
        return Err(anyhow!("Invalid date for {}: '{}' (expected YYYY-MM-DD)", field, value));
    }
    Ok(())
}

/// Strict `YYYY-MM-DD`; rejects dates that do not exist (2023-02-29)
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}
