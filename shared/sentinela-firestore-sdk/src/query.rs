//! Collection query translation
//!
//! Ordering and page size are forwarded to the REST API as query parameters.
//! The `where` filter is not: it is evaluated here, over documents that have
//! already been fetched and decoded.

use serde::Deserialize;
use std::cmp::Ordering;

use crate::types::Document;
use crate::value::{Fields, Value};

/// Sort direction for `orderBy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// `desc` in any case selects descending; anything else is ascending.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }
}

/// Filter comparison operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    ArrayContains,
    /// Unknown operators are kept so that they can fail open
    Other(String),
}

impl Operator {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "==" => Operator::Eq,
            "!=" => Operator::Ne,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            "in" => Operator::In,
            "array-contains" => Operator::ArrayContains,
            other => Operator::Other(other.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct RawFilter {
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    operator: Option<String>,
    #[serde(default)]
    value: Value,
}

/// A single `{field, operator, value}` predicate
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl QueryFilter {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Parse the client-supplied JSON filter.
    ///
    /// Returns `None` (no filtering) for malformed JSON, non-objects, or a
    /// missing/empty `field` or `operator`.
    pub fn parse(raw: &str) -> Option<Self> {
        let parsed: RawFilter = match serde_json::from_str(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed where filter");
                return None;
            }
        };

        let field = parsed.field.filter(|f| !f.is_empty())?;
        let operator = parsed.operator.filter(|o| !o.is_empty())?;

        Some(Self {
            field,
            operator: Operator::parse(&operator),
            value: parsed.value,
        })
    }

    /// Evaluate against a document's fields. A missing field reads as null.
    pub fn matches(&self, data: &Fields) -> bool {
        let doc_value = data.get(&self.field).unwrap_or(&Value::Null);

        match &self.operator {
            Operator::Eq => doc_value.loose_eq(&self.value),
            Operator::Ne => !doc_value.loose_eq(&self.value),
            Operator::Gt => ordered(doc_value, &self.value, |o| o == Ordering::Greater),
            Operator::Ge => ordered(doc_value, &self.value, |o| o != Ordering::Less),
            Operator::Lt => ordered(doc_value, &self.value, |o| o == Ordering::Less),
            Operator::Le => ordered(doc_value, &self.value, |o| o != Ordering::Greater),
            Operator::In => match self.value.as_list() {
                Some(candidates) => candidates.iter().any(|c| doc_value.loose_eq(c)),
                None => false,
            },
            Operator::ArrayContains => match doc_value.as_list() {
                Some(items) => items.iter().any(|item| item.loose_eq(&self.value)),
                None => false,
            },
            Operator::Other(op) => {
                tracing::debug!(operator = %op, "Unknown filter operator, passing document");
                true
            }
        }
    }
}

/// Incomparable pairs keep the document.
fn ordered(left: &Value, right: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    left.compare(right).map_or(true, accept)
}

/// Parameters of a collection listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionQuery {
    pub order_by: Option<String>,
    pub direction: Direction,
    pub page_size: Option<String>,
    pub filter: Option<QueryFilter>,
}

impl CollectionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(field.into());
        self.direction = direction;
        self
    }

    /// Forwarded verbatim as `pageSize`
    pub fn page_size(mut self, size: impl Into<String>) -> Self {
        self.page_size = Some(size.into());
        self
    }

    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Query parameters for the remote list call, excluding the API key
    pub fn remote_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        if let Some(field) = self.order_by.as_deref().filter(|f| !f.is_empty()) {
            let order = match self.direction {
                Direction::Desc => format!("{} desc", field),
                Direction::Asc => field.to_string(),
            };
            params.push(("orderBy", order));
        }

        if let Some(size) = self.page_size.as_deref().filter(|s| !s.is_empty()) {
            params.push(("pageSize", size.to_string()));
        }

        params
    }

    /// Apply the client-side filter, keeping document order
    pub fn apply(&self, documents: Vec<Document>) -> Vec<Document> {
        let Some(filter) = &self.filter else {
            return documents;
        };

        documents
            .into_iter()
            .filter(|doc| doc.data.as_ref().map_or(true, |data| filter.matches(data)))
            .collect()
    }
}
