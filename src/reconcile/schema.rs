//! Schema phases: collections, fields, relations.

use tracing::info;

use super::{Outcome, Phase, PhaseReport, Reconciler};
use crate::client::{created_id, resource};
use crate::models::{Collection, Field, Keyed, Relation};

impl Reconciler<'_> {
    pub(super) async fn create_collections(&self, collections: &[Collection]) -> PhaseReport {
        let mut report = PhaseReport::new(Phase::Collections);
        for collection in collections {
            let body = match serde_json::to_value(collection) {
                Ok(body) => body,
                Err(e) => {
                    report.failed(collection.key(), e.to_string());
                    continue;
                }
            };
            match self
                .create(resource::COLLECTIONS, &collection.collection, &body)
                .await
            {
                Ok(item) => report.applied(collection.key(), created_id(&item)),
                Err(reason) => report.failed(collection.key(), reason),
            }
        }
        info!(
            created = report.succeeded(),
            failed = report.failed_count(),
            "collections phase done"
        );
        report
    }

    /// Fields are created one at a time on `fields/<collection>`: regular
    /// collections first, grouped by collection in first-seen order, then
    /// fields of reserved-namespace collections.
    pub(super) async fn create_fields(&self, fields: &[Field]) -> PhaseReport {
        let mut report = PhaseReport::new(Phase::Fields);
        for (collection, group) in creation_groups(fields) {
            let path = resource::fields(collection);
            for field in group {
                let outcome = match serde_json::to_value(field) {
                    Ok(body) => match self.create(&path, &field.key(), &body).await {
                        Ok(_) => Outcome::Applied { target_id: None },
                        Err(reason) => Outcome::Failed { reason },
                    },
                    Err(e) => Outcome::Failed {
                        reason: e.to_string(),
                    },
                };
                report.record_in_group(field.key(), collection, outcome);
            }
        }
        info!(
            created = report.succeeded(),
            failed = report.failed_count(),
            "fields phase done"
        );
        report
    }

    pub(super) async fn create_relations(&self, relations: &[Relation]) -> PhaseReport {
        let mut report = PhaseReport::new(Phase::Relations);
        for relation in relations {
            let entity = relation.describe();
            match self
                .create(resource::RELATIONS, &entity, &relation.creation_payload())
                .await
            {
                Ok(_) => report.applied(entity, None),
                Err(reason) => report.failed(entity, reason),
            }
        }
        info!(
            created = report.succeeded(),
            failed = report.failed_count(),
            "relations phase done"
        );
        report
    }
}

/// Group fields by owning collection: regular collections first, reserved
/// namespace last, each in first-seen order.
fn creation_groups(fields: &[Field]) -> Vec<(&str, Vec<&Field>)> {
    let mut regular: Vec<(&str, Vec<&Field>)> = Vec::new();
    let mut system: Vec<(&str, Vec<&Field>)> = Vec::new();

    for field in fields {
        let groups = if field.is_system() {
            &mut system
        } else {
            &mut regular
        };
        match groups.iter_mut().find(|(c, _)| *c == field.collection) {
            Some((_, group)) => group.push(field),
            None => groups.push((field.collection.as_str(), vec![field])),
        }
    }

    regular.extend(system);
    regular
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockApi;
    use serde_json::json;

    fn field(collection: &str, name: &str) -> Field {
        serde_json::from_value(json!({
            "collection": collection,
            "field": name,
            "type": "string",
            "meta": { "interface": "input" }
        }))
        .unwrap()
    }

    #[test]
    fn test_creation_groups_order() {
        let fields = vec![
            field("directus_users", "tenant_id"),
            field("articles", "title"),
            field("pages", "slug"),
            field("articles", "body"),
        ];
        let groups = creation_groups(&fields);
        let order: Vec<(&str, Vec<&str>)> = groups
            .iter()
            .map(|(c, g)| (*c, g.iter().map(|f| f.field.as_str()).collect()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("articles", vec!["title", "body"]),
                ("pages", vec!["slug"]),
                ("directus_users", vec!["tenant_id"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_fields_posted_to_collection_path_with_full_definition() {
        let api = MockApi::new("prod");
        let reconciler = Reconciler::new(None, &api);
        let report = reconciler.create_fields(&[field("articles", "title")]).await;

        let bodies = api.created("fields/articles");
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["field"], "title");
        assert_eq!(bodies[0]["meta"]["interface"], "input");
        assert_eq!(report.succeeded(), 1);
    }

    #[tokio::test]
    async fn test_relation_created_without_schema() {
        let relation: Relation = serde_json::from_value(json!({
            "collection": "articles",
            "field": "author",
            "related_collection": "authors",
            "schema": { "on_delete": "SET NULL" }
        }))
        .unwrap();

        let api = MockApi::new("prod");
        let reconciler = Reconciler::new(None, &api);
        let report = reconciler.create_relations(&[relation]).await;

        let bodies = api.created("relations");
        assert!(bodies[0].get("schema").is_none());
        assert_eq!(report.entities(), vec!["articles.author -> authors"]);
    }

    #[tokio::test]
    async fn test_collection_failure_recorded() {
        let collection: Collection =
            serde_json::from_value(json!({ "collection": "articles", "meta": {} })).unwrap();
        let api =
            MockApi::new("prod").failing_create("collections", "collection", json!("articles"));
        let reconciler = Reconciler::new(None, &api);

        let report = reconciler.create_collections(&[collection]).await;
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.succeeded(), 0);
    }
}
