//! Search filter construction
//!
//! Translates the optional content-type and year constraints of a search
//! request into a conjunctive predicate over payload fields.
//!
//! Filter values are not validated: an unknown content type builds a
//! perfectly valid predicate that simply matches nothing. A read-only search
//! endpoint degrades to an empty result set instead of an error.

use biosem_core::{Metadata, VectorStoreConfig};
use serde_json::Value;

/// Value compared by an equality condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Keyword(String),
    Integer(i64),
}

impl FilterValue {
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Keyword(expected), Value::String(actual)) => expected == actual,
            (Self::Integer(expected), Value::Number(actual)) => actual.as_i64() == Some(*expected),
            _ => false,
        }
    }
}

/// Equality condition on one payload field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCondition {
    /// Payload key; dots address nested objects (`metadata.year`)
    pub key: String,
    pub value: FilterValue,
}

impl FieldCondition {
    pub fn keyword(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: FilterValue::Keyword(value.into()),
        }
    }

    pub fn integer(key: impl Into<String>, value: i64) -> Self {
        Self {
            key: key.into(),
            value: FilterValue::Integer(value),
        }
    }

    /// Evaluate against a payload
    pub fn matches(&self, payload: &Metadata) -> bool {
        lookup_path(payload, &self.key)
            .map(|value| self.value.matches(value))
            .unwrap_or(false)
    }
}

/// Predicate passed to the vector store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchFilter {
    /// Unfiltered search
    #[default]
    None,
    /// Every condition must hold
    All(Vec<FieldCondition>),
}

impl SearchFilter {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn conditions(&self) -> &[FieldCondition] {
        match self {
            Self::None => &[],
            Self::All(conditions) => conditions,
        }
    }

    /// Evaluate against a payload
    pub fn matches(&self, payload: &Metadata) -> bool {
        self.conditions().iter().all(|c| c.matches(payload))
    }
}

/// Builds search filters using the configured payload keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterBuilder {
    content_type_field: String,
    year_field: String,
}

impl Default for FilterBuilder {
    fn default() -> Self {
        Self::new("content_type", "year")
    }
}

impl FilterBuilder {
    pub fn new(content_type_field: impl Into<String>, year_field: impl Into<String>) -> Self {
        Self {
            content_type_field: content_type_field.into(),
            year_field: year_field.into(),
        }
    }

    pub fn from_config(config: &VectorStoreConfig) -> Self {
        Self::new(&config.content_type_field, &config.year_field)
    }

    /// Payload key holding the content type
    pub fn content_type_field(&self) -> &str {
        &self.content_type_field
    }

    /// Build a conjunctive filter; returns `SearchFilter::None` when nothing is set.
    ///
    /// An empty content type counts as absent.
    pub fn build(&self, content_type: Option<&str>, year: Option<i64>) -> SearchFilter {
        let mut conditions = Vec::with_capacity(2);

        if let Some(content_type) = content_type.filter(|c| !c.is_empty()) {
            conditions.push(FieldCondition::keyword(
                &self.content_type_field,
                content_type,
            ));
        }

        if let Some(year) = year {
            conditions.push(FieldCondition::integer(&self.year_field, year));
        }

        if conditions.is_empty() {
            SearchFilter::None
        } else {
            SearchFilter::All(conditions)
        }
    }
}

/// Resolve a dotted key inside a JSON payload
pub fn lookup_path<'a>(payload: &'a Metadata, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut current = payload.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_no_conditions_is_explicit_none() {
        let filter = FilterBuilder::default().build(None, None);
        assert_eq!(filter, SearchFilter::None);
        assert!(filter.is_none());
        assert!(filter.matches(&payload(json!({"content_type": "image"}))));
    }

    #[test]
    fn test_empty_content_type_is_absent() {
        let filter = FilterBuilder::default().build(Some(""), None);
        assert!(filter.is_none());
    }

    #[test]
    fn test_conjunction() {
        let filter = FilterBuilder::default().build(Some("text"), Some(2020));
        assert_eq!(filter.conditions().len(), 2);

        assert!(filter.matches(&payload(json!({"content_type": "text", "year": 2020}))));
        assert!(!filter.matches(&payload(json!({"content_type": "text", "year": 2021}))));
        assert!(!filter.matches(&payload(json!({"content_type": "image", "year": 2020}))));
        assert!(!filter.matches(&payload(json!({"content_type": "text"}))));
    }

    #[test]
    fn test_unknown_content_type_matches_nothing() {
        let filter = FilterBuilder::default().build(Some("protein-structure"), None);
        for ct in ["text", "image", "sequence", "experiment"] {
            assert!(!filter.matches(&payload(json!({ "content_type": ct }))));
        }
    }

    #[test]
    fn test_year_type_must_match() {
        let filter = FilterBuilder::default().build(None, Some(2021));
        assert!(!filter.matches(&payload(json!({"year": "2021"}))));
        assert!(filter.matches(&payload(json!({"year": 2021}))));
    }

    #[test]
    fn test_nested_year_field() {
        let builder = FilterBuilder::new("content_type", "metadata.year");
        let filter = builder.build(None, Some(2021));

        assert!(filter.matches(&payload(json!({"metadata": {"year": 2021}}))));
        assert!(!filter.matches(&payload(json!({"metadata": {"year": 2019}}))));
        assert!(!filter.matches(&payload(json!({"year": 2021}))));
    }
}
