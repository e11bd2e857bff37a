//! Remote management API.
//!
//! The reconciler only depends on the [`RemoteApi`] capability: read a schema
//! snapshot, list a resource collection, create an item, patch an item.
//! [`HttpClient`] is the reqwest-backed implementation.

mod error;
mod http;

pub use error::{ApiError, ApiResult, extract_error_message};
pub use http::HttpClient;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Resource collections read as entity lists.
pub mod resource {
    pub const ROLES: &str = "roles";
    pub const POLICIES: &str = "policies";
    pub const FLOWS: &str = "flows";
    pub const OPERATIONS: &str = "operations";
    pub const PERMISSIONS: &str = "permissions";
    pub const COLLECTIONS: &str = "collections";
    pub const RELATIONS: &str = "relations";

    /// Creation path for fields of one collection.
    pub fn fields(collection: &str) -> String {
        format!("fields/{}", collection)
    }
}

/// Authenticated create/read/patch access to one instance.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Full schema snapshot document, envelope included.
    async fn snapshot(&self) -> ApiResult<Value>;

    /// Every item of a resource collection.
    async fn list(&self, resource: &str) -> ApiResult<Vec<Value>>;

    /// Create one item; returns the created item.
    async fn create(&self, path: &str, body: &Value) -> ApiResult<Value>;

    /// Partially update the item `id` of `path`; returns the updated item.
    async fn patch(&self, path: &str, id: &str, body: &Value) -> ApiResult<Value>;
}

/// List a resource and decode every item as `T`.
pub async fn list_as<T: DeserializeOwned>(
    api: &dyn RemoteApi,
    resource: &str,
) -> ApiResult<Vec<T>> {
    api.list(resource)
        .await?
        .into_iter()
        .map(|item| {
            serde_json::from_value(item)
                .map_err(|e| ApiError::Parse(format!("invalid {} item: {}", resource, e)))
        })
        .collect()
}

/// Identifier of a created item, as a string.
pub fn created_id(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_created_id_string_and_number() {
        assert_eq!(created_id(&json!({ "id": "abc" })), Some("abc".to_string()));
        assert_eq!(created_id(&json!({ "id": 42 })), Some("42".to_string()));
        assert_eq!(created_id(&json!({ "id": null })), None);
        assert_eq!(created_id(&json!({})), None);
    }

    #[test]
    fn test_fields_path() {
        assert_eq!(resource::fields("articles"), "fields/articles");
    }
}
