//! Access-control phases: roles, policies, permissions.

use std::collections::HashSet;

use serde_json::json;
use tracing::{debug, info, warn};

use super::{NO_SOURCE_REASON, Phase, PhaseReport, Reconciler};
use crate::client::{created_id, list_as, resource};
use crate::models::{Permission, Policy, Role};
use crate::registry::EntityKind;

impl Reconciler<'_> {
    /// Create new roles, then map them by name onto the target's roles so
    /// creations whose response carried no id still resolve.
    pub(super) async fn create_roles(
        &mut self,
        roles: &[Role],
        target_roles: &[Role],
    ) -> PhaseReport {
        let mut report = PhaseReport::new(Phase::Roles);
        for role in roles {
            match self
                .create(resource::ROLES, &role.name, &role.creation_payload())
                .await
            {
                Ok(item) => {
                    let id = created_id(&item);
                    if let Some(id) = &id {
                        self.registry.set(EntityKind::Role, &role.id, id);
                    }
                    report.applied(&role.name, id);
                }
                Err(reason) => report.failed(&role.name, reason),
            }
        }

        self.registry.match_by_name(
            EntityKind::Role,
            roles.iter().map(|r| (r.id.as_str(), r.name.as_str())),
            target_roles.iter().map(|r| (r.id.as_str(), r.name.as_str())),
        );
        info!(
            created = report.succeeded(),
            failed = report.failed_count(),
            "roles phase done"
        );
        report
    }

    /// Create new policies with role references rewritten to target ids.
    ///
    /// Every source role is first matched by name against the target's
    /// pre-existing roles, so references to roles that already existed
    /// resolve too. Unresolvable references are dropped.
    pub(super) async fn create_policies(
        &mut self,
        policies: &[Policy],
        source_roles: &[Role],
        target_roles: &[Role],
        target_policies: &[Policy],
    ) -> PhaseReport {
        self.registry.match_by_name(
            EntityKind::Role,
            source_roles.iter().map(|r| (r.id.as_str(), r.name.as_str())),
            target_roles.iter().map(|r| (r.id.as_str(), r.name.as_str())),
        );

        let mut report = PhaseReport::new(Phase::Policies);
        for policy in policies {
            let roles = self.rewrite_role_refs(policy);
            let body = json!({
                "name": policy.name,
                "icon": policy.icon,
                "description": policy.description,
                "ip_access": policy.ip_access,
                "enforce_tfa": policy.enforce_tfa,
                "admin_access": policy.admin_access,
                "app_access": policy.app_access,
                "roles": roles,
            });
            match self.create(resource::POLICIES, &policy.name, &body).await {
                Ok(item) => {
                    let id = created_id(&item);
                    if let Some(id) = &id {
                        self.registry.set(EntityKind::Policy, &policy.id, id);
                    }
                    report.applied(&policy.name, id);
                }
                Err(reason) => report.failed(&policy.name, reason),
            }
        }

        self.registry.match_by_name(
            EntityKind::Policy,
            policies.iter().map(|p| (p.id.as_str(), p.name.as_str())),
            target_policies.iter().map(|p| (p.id.as_str(), p.name.as_str())),
        );
        info!(
            created = report.succeeded(),
            failed = report.failed_count(),
            "policies phase done"
        );
        report
    }

    fn rewrite_role_refs(&self, policy: &Policy) -> Vec<String> {
        let mut roles = Vec::new();
        for role_id in policy.role_ids() {
            match self.registry.get(EntityKind::Role, &role_id) {
                Some(target_id) => roles.push(target_id.to_string()),
                None => warn!(
                    policy = %policy.name,
                    role = %role_id,
                    "dropping unresolved role reference"
                ),
            }
        }
        roles
    }

    /// Create permissions the target lacks.
    ///
    /// Both permission lists are read live. A source permission is a
    /// candidate only if its policy resolves to a target policy (by this
    /// run's creations or by name); it is created unless the target already
    /// holds one with the same `policy:collection:action` key.
    pub(super) async fn create_permissions(
        &mut self,
        source_policies: &[Policy],
        target_policies: &[Policy],
    ) -> PhaseReport {
        let Some(source) = self.source else {
            return PhaseReport::skipped(Phase::Permissions, NO_SOURCE_REASON);
        };

        let lists = tokio::try_join!(
            list_as::<Permission>(source, resource::PERMISSIONS),
            list_as::<Permission>(self.target, resource::PERMISSIONS),
        );
        let (source_permissions, target_permissions) = match lists {
            Ok(lists) => lists,
            Err(e) => {
                warn!(error = %e, "could not list permissions");
                return PhaseReport::skipped(
                    Phase::Permissions,
                    format!("could not list permissions: {}", e),
                );
            }
        };

        self.registry.match_by_name(
            EntityKind::Policy,
            source_policies.iter().map(|p| (p.id.as_str(), p.name.as_str())),
            target_policies.iter().map(|p| (p.id.as_str(), p.name.as_str())),
        );

        let mut existing: HashSet<String> = target_permissions
            .iter()
            .filter_map(|p| {
                p.policy
                    .as_deref()
                    .map(|policy| Permission::structural_key(policy, &p.collection, &p.action))
            })
            .collect();

        let mut report = PhaseReport::new(Phase::Permissions);
        for permission in &source_permissions {
            let Some(policy) = permission
                .policy
                .as_deref()
                .and_then(|id| self.registry.get(EntityKind::Policy, id))
            else {
                continue;
            };
            let key =
                Permission::structural_key(policy, &permission.collection, &permission.action);
            if existing.contains(&key) {
                continue;
            }

            let entity = format!("{}:{}", permission.collection, permission.action);
            let body = json!({
                "collection": permission.collection,
                "action": permission.action,
                "permissions": permission.permissions,
                "validation": permission.validation,
                "presets": permission.presets,
                "fields": permission.fields,
                "policy": policy,
            });
            match self.create(resource::PERMISSIONS, &entity, &body).await {
                Ok(item) => {
                    existing.insert(key);
                    report.applied(entity, created_id(&item));
                }
                Err(reason) => report.failed(entity, reason),
            }
        }
        debug!(
            source = source_permissions.len(),
            target = target_permissions.len(),
            "permission lists compared"
        );
        info!(
            created = report.succeeded(),
            failed = report.failed_count(),
            "permissions phase done"
        );
        report
    }
}
