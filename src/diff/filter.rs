//! Reserved-namespace field filter.
//!
//! New fields on `directus_*` collections are platform-standard and must not
//! be re-created, except for custom extensions whose name carries one of a
//! small set of markers.

use crate::models::Field;

/// Markers identifying custom fields on reserved collections.
pub const DEFAULT_MARKERS: &[&str] = &["tenant", "custom_", "app_"];

/// Decides which new reserved-namespace fields are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemFieldFilter {
    markers: Vec<String>,
    enabled: bool,
}

impl Default for SystemFieldFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect())
    }
}

impl SystemFieldFilter {
    /// Filter keeping reserved fields whose name contains any of `markers`.
    pub fn new(markers: Vec<String>) -> Self {
        Self {
            markers,
            enabled: true,
        }
    }

    /// Filter that keeps every field.
    pub fn disabled() -> Self {
        Self {
            markers: Vec::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Whether `field` survives the filter. Regular fields always do.
    pub fn retains(&self, field: &Field) -> bool {
        if !self.enabled || !field.is_system() {
            return true;
        }
        self.markers
            .iter()
            .any(|marker| field.field.contains(marker.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn field(collection: &str, name: &str) -> Field {
        Field {
            collection: collection.to_string(),
            field: name.to_string(),
            field_type: None,
            schema: None,
            meta: None,
            rest: Map::new(),
        }
    }

    #[test]
    fn test_regular_fields_always_retained() {
        let filter = SystemFieldFilter::default();
        assert!(filter.retains(&field("articles", "email")));
    }

    #[test]
    fn test_reserved_field_without_marker_dropped() {
        let filter = SystemFieldFilter::default();
        assert!(!filter.retains(&field("directus_users", "email")));
        assert!(!filter.retains(&field("directus_files", "focal_point_x")));
    }

    #[test]
    fn test_reserved_field_with_marker_retained() {
        let filter = SystemFieldFilter::default();
        assert!(filter.retains(&field("directus_users", "tenant")));
        assert!(filter.retains(&field("directus_users", "tenant_id")));
        assert!(filter.retains(&field("directus_files", "custom_label")));
        assert!(filter.retains(&field("directus_roles", "app_scope")));
    }

    #[test]
    fn test_marker_matches_anywhere_in_name() {
        let filter = SystemFieldFilter::default();
        assert!(filter.retains(&field("directus_users", "my_custom_flag")));
    }

    #[test]
    fn test_custom_markers() {
        let filter = SystemFieldFilter::new(vec!["acme".to_string()]);
        assert!(filter.retains(&field("directus_users", "acme_region")));
        assert!(!filter.retains(&field("directus_users", "tenant")));
    }

    #[test]
    fn test_disabled_filter_keeps_everything() {
        let filter = SystemFieldFilter::disabled();
        assert!(!filter.is_enabled());
        assert!(filter.retains(&field("directus_users", "email")));
    }
}
