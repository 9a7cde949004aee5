//! Request DTOs for the cache maintenance API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::cache::{CacheQuery, ExtraParams};

/// Identifies one cached search (POST /get, POST /del)
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    /// Data source, e.g. "indeed"
    pub source: String,
    /// Main search term
    pub primary_term: String,
    /// Secondary term, typically a location
    #[serde(default)]
    pub secondary_term: String,
    /// Extra search parameters
    #[serde(default)]
    pub params: ExtraParams,
}

impl QueryRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.source.trim().is_empty() {
            return Some("Source cannot be empty".to_string());
        }
        if !self
            .source
            .trim()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Some(format!("Source '{}' is not a valid name", self.source));
        }
        if self.primary_term.trim().is_empty() {
            return Some("Primary term cannot be empty".to_string());
        }
        None
    }

    /// Converts into the cache's query type.
    pub fn to_query(&self) -> CacheQuery {
        CacheQuery {
            source: self.source.clone(),
            primary_term: self.primary_term.clone(),
            secondary_term: self.secondary_term.clone(),
            params: self.params.clone(),
        }
    }
}

/// Request body for the SET operation (PUT /set)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// Which search the data belongs to
    #[serde(flatten)]
    pub query: QueryRequest,
    /// Payload to cache
    pub data: Value,
    /// Optional caller metadata stored alongside the payload
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl SetRequest {
    /// Validates the request data
    pub fn validate(&self) -> Option<String> {
        self.query.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_request_deserialize() {
        let json = r#"{"source": "indeed", "primary_term": "rust", "secondary_term": "remote"}"#;
        let req: QueryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.source, "indeed");
        assert_eq!(req.primary_term, "rust");
        assert!(req.params.is_empty());
    }

    #[test]
    fn test_set_request_flattened() {
        let json = r#"{
            "source": "indeed",
            "primary_term": "rust",
            "params": {"hours": 24},
            "data": {"jobs": []}
        }"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.query.secondary_term, "");
        assert_eq!(req.query.params["hours"], json!(24));
        assert_eq!(req.data, json!({"jobs": []}));
        assert!(req.metadata.is_none());
    }

    #[test]
    fn test_validate_empty_source() {
        let req = QueryRequest {
            source: "  ".to_string(),
            primary_term: "rust".to_string(),
            secondary_term: String::new(),
            params: ExtraParams::new(),
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_path_like_source() {
        let req = QueryRequest {
            source: "../etc".to_string(),
            primary_term: "rust".to_string(),
            secondary_term: String::new(),
            params: ExtraParams::new(),
        };
        assert!(req.validate().unwrap().contains("../etc"));
    }

    #[test]
    fn test_validate_valid_request() {
        let req = QueryRequest {
            source: "indeed".to_string(),
            primary_term: "rust".to_string(),
            secondary_term: "remote".to_string(),
            params: ExtraParams::new(),
        };
        assert!(req.validate().is_none());
        assert_eq!(req.to_query().key(), CacheQuery::new("indeed", "rust", "remote").key());
    }
}
