use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::{
    core::{error::AppError, permission_cache::PermissionCache},
    model::role::Role,
    repository::role_permission::{
        count_granted_permissions, role_has_any_permission, role_has_permission,
    },
};

/// Where grants are looked up. Postgres in production, an in-memory table
/// in tests.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    async fn has_permission(&self, role: Role, permission_name: &str) -> anyhow::Result<bool>;

    async fn has_any_permission(
        &self,
        role: Role,
        permission_names: &[String],
    ) -> anyhow::Result<bool>;

    /// Number of distinct names from `permission_names` granted to `role`.
    async fn count_granted(&self, role: Role, permission_names: &[String])
        -> anyhow::Result<i64>;
}

pub struct PgPermissionSource {
    db: PgPool,
}

impl PgPermissionSource {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PermissionSource for PgPermissionSource {
    async fn has_permission(&self, role: Role, permission_name: &str) -> anyhow::Result<bool> {
        role_has_permission(&self.db, role, permission_name).await
    }

    async fn has_any_permission(
        &self,
        role: Role,
        permission_names: &[String],
    ) -> anyhow::Result<bool> {
        role_has_any_permission(&self.db, role, permission_names).await
    }

    async fn count_granted(
        &self,
        role: Role,
        permission_names: &[String],
    ) -> anyhow::Result<i64> {
        count_granted_permissions(&self.db, role, permission_names).await
    }
}

/// Request-time authorization decisions.
pub struct PermissionGate {
    source: Arc<dyn PermissionSource>,
    cache: Arc<PermissionCache>,
}

impl PermissionGate {
    pub fn new(source: Arc<dyn PermissionSource>, cache: Arc<PermissionCache>) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &Arc<PermissionCache> {
        &self.cache
    }

    /// Drop every cached decision. Call after any grant or permission change.
    pub fn invalidate(&self) {
        self.cache.clear();
        debug!("permission cache invalidated");
    }

    pub async fn check(&self, role: Role, permission_name: &str) -> anyhow::Result<bool> {
        if role.is_super_admin() {
            return Ok(true);
        }
        self.cache
            .get_or_try_load(role, permission_name, || {
                self.source.has_permission(role, permission_name)
            })
            .await
    }

    pub async fn authorize(&self, role: Role, permission_name: &str) -> Result<(), AppError> {
        if self.check(role, permission_name).await? {
            Ok(())
        } else {
            debug!("role {} denied {}", role, permission_name);
            Err(AppError::forbidden(permission_name))
        }
    }

    pub async fn authorize_any(
        &self,
        role: Role,
        permission_names: &[&str],
    ) -> Result<(), AppError> {
        if role.is_super_admin() {
            return Ok(());
        }
        let names = dedup(permission_names);
        if !names.is_empty() && self.source.has_any_permission(role, &names).await? {
            return Ok(());
        }
        Err(AppError::Forbidden {
            required_permissions: names,
        })
    }

    /// Requested names are deduplicated before counting, otherwise a list
    /// with repeats could never match, or match a smaller grant set.
    pub async fn authorize_all(
        &self,
        role: Role,
        permission_names: &[&str],
    ) -> Result<(), AppError> {
        if role.is_super_admin() {
            return Ok(());
        }
        let names = dedup(permission_names);
        if names.is_empty() {
            return Ok(());
        }
        let granted = self.source.count_granted(role, &names).await?;
        if granted == names.len() as i64 {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                required_permissions: names,
            })
        }
    }
}

fn dedup(permission_names: &[&str]) -> Vec<String> {
    permission_names
        .iter()
        .map(|name| name.to_string())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
pub mod tests {
    use std::{
        collections::HashSet,
        sync::{
            atomic::{AtomicUsize, Ordering},
            RwLock,
        },
        time::Duration,
    };

    use super::*;

    /// In-memory grant table that counts lookups.
    #[derive(Default)]
    pub struct MemoryPermissionSource {
        grants: RwLock<HashSet<(Role, String)>>,
        pub lookups: AtomicUsize,
    }

    impl MemoryPermissionSource {
        pub fn with_grants(grants: &[(Role, &str)]) -> Self {
            let source = Self::default();
            source.replace(grants);
            source
        }

        pub fn replace(&self, grants: &[(Role, &str)]) {
            let mut table = self.grants.write().unwrap();
            table.clear();
            for (role, name) in grants {
                table.insert((*role, name.to_string()));
            }
        }

        fn granted(&self, role: Role, name: &str) -> bool {
            self.grants
                .read()
                .unwrap()
                .contains(&(role, name.to_string()))
        }
    }

    #[async_trait]
    impl PermissionSource for MemoryPermissionSource {
        async fn has_permission(&self, role: Role, permission_name: &str) -> anyhow::Result<bool> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.granted(role, permission_name))
        }

        async fn has_any_permission(
            &self,
            role: Role,
            permission_names: &[String],
        ) -> anyhow::Result<bool> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(permission_names.iter().any(|name| self.granted(role, name)))
        }

        async fn count_granted(
            &self,
            role: Role,
            permission_names: &[String],
        ) -> anyhow::Result<i64> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let distinct: HashSet<&String> = permission_names
                .iter()
                .filter(|name| self.granted(role, name))
                .collect();
            Ok(distinct.len() as i64)
        }
    }

    fn gate(source: Arc<MemoryPermissionSource>) -> PermissionGate {
        PermissionGate::new(
            source,
            Arc::new(PermissionCache::new(Duration::from_secs(300))),
        )
    }

    fn required(err: AppError) -> Vec<String> {
        match err {
            AppError::Forbidden {
                required_permissions,
            } => required_permissions,
            other => panic!("expected forbidden, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_authorize_matches_grants_for_regular_roles() {
        let source = Arc::new(MemoryPermissionSource::with_grants(&[
            (Role::Admin, "employees.view"),
            (Role::Admin, "employees.edit"),
            (Role::User, "employees.view"),
        ]));
        let gate = gate(source);
        let names = ["employees.view", "employees.edit", "users.delete"];
        let table = [
            (Role::Admin, [true, true, false]),
            (Role::Manager, [false, false, false]),
            (Role::User, [true, false, false]),
        ];
        for (role, expected) in table {
            for (name, allowed) in names.iter().zip(expected) {
                assert_eq!(
                    gate.authorize(role, name).await.is_ok(),
                    allowed,
                    "{} {}",
                    role,
                    name
                );
            }
        }
    }

    #[tokio::test]
    async fn test_super_admin_always_allowed_without_lookup() {
        let source = Arc::new(MemoryPermissionSource::default());
        let gate = gate(source.clone());
        assert!(gate
            .authorize(Role::SuperAdmin, "does.not.exist")
            .await
            .is_ok());
        assert!(gate
            .authorize_any(Role::SuperAdmin, &["a", "b"])
            .await
            .is_ok());
        assert!(gate
            .authorize_all(Role::SuperAdmin, &["a", "b"])
            .await
            .is_ok());
        assert_eq!(source.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deny_reports_required_permission() {
        let gate = gate(Arc::new(MemoryPermissionSource::default()));
        let err = gate.authorize(Role::User, "users.view").await.unwrap_err();
        assert_eq!(required(err), vec!["users.view".to_string()]);
    }

    #[tokio::test]
    async fn test_repeated_checks_hit_the_cache() {
        let source = Arc::new(MemoryPermissionSource::with_grants(&[(
            Role::Manager,
            "employees.view",
        )]));
        let gate = gate(source.clone());
        for _ in 0..5 {
            assert!(gate.check(Role::Manager, "employees.view").await.unwrap());
        }
        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_reflects_new_grants() {
        let source = Arc::new(MemoryPermissionSource::with_grants(&[(
            Role::Manager,
            "employees.view",
        )]));
        let gate = gate(source.clone());
        assert!(gate.authorize(Role::Manager, "employees.view").await.is_ok());
        assert!(gate.authorize(Role::Manager, "users.view").await.is_err());

        source.replace(&[(Role::Manager, "users.view")]);
        gate.invalidate();

        assert!(gate.authorize(Role::Manager, "employees.view").await.is_err());
        assert!(gate.authorize(Role::Manager, "users.view").await.is_ok());
    }

    #[tokio::test]
    async fn test_authorize_any() {
        let source = Arc::new(MemoryPermissionSource::with_grants(&[(
            Role::User,
            "employees.view",
        )]));
        let gate = gate(source);
        assert!(gate
            .authorize_any(Role::User, &["users.view", "employees.view"])
            .await
            .is_ok());
        let err = gate
            .authorize_any(Role::User, &["users.view", "users.edit"])
            .await
            .unwrap_err();
        assert_eq!(
            required(err),
            vec!["users.edit".to_string(), "users.view".to_string()]
        );
        assert!(gate.authorize_any(Role::User, &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_authorize_all_dedupes_requested_names() {
        let source = Arc::new(MemoryPermissionSource::with_grants(&[
            (Role::Admin, "users.view"),
            (Role::Admin, "users.edit"),
        ]));
        let gate = gate(source);
        assert!(gate
            .authorize_all(Role::Admin, &["users.view", "users.edit"])
            .await
            .is_ok());
        // repeats must neither fail a satisfied request ...
        assert!(gate
            .authorize_all(Role::Admin, &["users.view", "users.view", "users.edit"])
            .await
            .is_ok());
        // ... nor let a partially satisfied one through
        assert!(gate
            .authorize_all(Role::Admin, &["users.view", "users.view", "users.delete"])
            .await
            .is_err());
        assert!(gate.authorize_all(Role::Admin, &[]).await.is_ok());
    }
}
