//! Parameterized filter expressions for collection queries.
//!
//! DESIGN
//! ======
//! Filters are built as a small expression tree and rendered in one place.
//! Field names are `&'static str` so they can only come from code; values are
//! always rendered as quoted literals through [`quote`], never spliced in.
//!
//! The backend grammar reads a quoted literal up to the next unescaped
//! matching quote, with `\` as the escape character. Both `\` and `'` are
//! therefore backslash-escaped inside single-quoted literals.

use std::fmt;

use serde_json::Value;

/// A literal value on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for Literal {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl Literal {
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Text(expected), Value::String(actual)) => expected == actual,
            // A missing or null field compares equal to the empty string.
            (Self::Text(expected), Value::Null) => expected.is_empty(),
            (Self::Int(expected), Value::Number(actual)) => actual.as_i64() == Some(*expected),
            (Self::Bool(expected), Value::Bool(actual)) => expected == actual,
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(&quote(text)),
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Quote a text literal for the filter grammar.
#[must_use]
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        if ch == '\\' || ch == '\'' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

// =============================================================================
// FILTER
// =============================================================================

/// A filter expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: &'static str, value: Literal },
    Or(Vec<Filter>),
    And(Vec<Filter>),
}

impl Filter {
    /// `field = value`.
    pub fn eq(field: &'static str, value: impl Into<Literal>) -> Self {
        Self::Eq { field, value: value.into() }
    }

    /// `field = v1 || field = v2 || ...`, one clause per value in order.
    pub fn any_of<I, V>(field: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        Self::Or(values.into_iter().map(|v| Self::eq(field, v)).collect())
    }

    #[must_use]
    pub fn or(self, other: Filter) -> Self {
        match self {
            Self::Or(mut clauses) => {
                clauses.push(other);
                Self::Or(clauses)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::And(mut clauses) => {
                clauses.push(other);
                Self::And(clauses)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Render the expression in the backend filter grammar.
    #[must_use]
    pub fn render(&self) -> String {
        self.render_inner(false)
    }

    fn render_inner(&self, nested: bool) -> String {
        match self {
            Self::Eq { field, value } => format!("{field} = {value}"),
            Self::Or(clauses) => join_clauses(clauses, " || ", nested),
            Self::And(clauses) => join_clauses(clauses, " && ", nested),
        }
    }

    /// Evaluate the expression against a JSON record.
    ///
    /// An empty `Or` matches nothing and an empty `And` matches everything.
    #[must_use]
    pub fn matches(&self, record: &Value) -> bool {
        match self {
            Self::Eq { field, value } => value.matches(record.get(*field).unwrap_or(&Value::Null)),
            Self::Or(clauses) => clauses.iter().any(|c| c.matches(record)),
            Self::And(clauses) => clauses.iter().all(|c| c.matches(record)),
        }
    }
}

fn join_clauses(clauses: &[Filter], sep: &str, nested: bool) -> String {
    if clauses.len() == 1 {
        return clauses[0].render_inner(nested);
    }
    let joined = clauses
        .iter()
        .map(|c| c.render_inner(true))
        .collect::<Vec<_>>()
        .join(sep);
    if nested { format!("({joined})") } else { joined }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// =============================================================================
// SORT
// =============================================================================

/// Sort order for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    Asc(&'static str),
    Desc(&'static str),
}

impl Sort {
    #[must_use]
    pub fn asc(field: &'static str) -> Self {
        Self::Asc(field)
    }

    #[must_use]
    pub fn desc(field: &'static str) -> Self {
        Self::Desc(field)
    }

    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Asc(field) => (*field).to_owned(),
            Self::Desc(field) => format!("-{field}"),
        }
    }

    /// Field the order is taken from.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::Asc(field) | Self::Desc(field) => *field,
        }
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
