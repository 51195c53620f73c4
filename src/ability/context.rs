use async_trait::async_trait;
use std::sync::Arc;

use super::{define_ability_for, Ability};
use crate::error::ClientResult;
use crate::models::RolePermission;

/// Anything that can produce the permission tree for a role
#[async_trait]
pub trait PermissionSource: Send + Sync {
    async fn role_permissions(&self, role_id: &str) -> ClientResult<Vec<RolePermission>>;
}

/// Per-session holder of the current ability snapshot.
///
/// Constructed once per session and passed down explicitly. Each `refresh`
/// installs a fresh immutable snapshot; snapshots handed out earlier are not
/// touched.
pub struct AbilityContext<S> {
    source: Arc<S>,
    role_id: String,
    current: Arc<Ability>,
}

impl<S: PermissionSource> AbilityContext<S> {
    /// Context with the deny-all ability; call [`refresh`](Self::refresh) to load
    pub fn new(source: Arc<S>, role_id: impl Into<String>) -> Self {
        Self {
            source,
            role_id: role_id.into(),
            current: Arc::new(Ability::empty()),
        }
    }

    /// Build and load in one step
    pub async fn load(source: Arc<S>, role_id: impl Into<String>) -> ClientResult<Self> {
        let mut ctx = Self::new(source, role_id);
        ctx.refresh().await?;
        Ok(ctx)
    }

    pub fn role_id(&self) -> &str {
        &self.role_id
    }

    pub fn snapshot(&self) -> Arc<Ability> {
        Arc::clone(&self.current)
    }

    pub fn can(&self, action: &str, subject: &str) -> bool {
        self.current.can(action, subject)
    }

    /// Re-fetch the tree and replace the snapshot. On a fetch error the
    /// previous snapshot stays in place.
    pub async fn refresh(&mut self) -> ClientResult<Arc<Ability>> {
        let permissions = self.source.role_permissions(&self.role_id).await?;
        let ability = define_ability_for(permissions.first());

        tracing::debug!(
            role_id = %self.role_id,
            rules = ability.len(),
            "ability snapshot rebuilt"
        );

        self.current = Arc::new(ability);
        Ok(self.snapshot())
    }

    /// Switch to another role (e.g. after re-login) and reload
    pub async fn switch_role(&mut self, role_id: impl Into<String>) -> ClientResult<Arc<Ability>> {
        self.role_id = role_id.into();
        self.current = Arc::new(Ability::empty());
        self.refresh().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::models::{Access, Menu};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeSource {
        calls: AtomicUsize,
        fail: AtomicBool,
        grant_create: AtomicBool,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                grant_create: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl PermissionSource for FakeSource {
        async fn role_permissions(&self, role_id: &str) -> ClientResult<Vec<RolePermission>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ClientError::api(500, "permission service down"));
            }
            if role_id == "nobody" {
                return Ok(Vec::new());
            }
            Ok(vec![RolePermission {
                id: Some("rp".into()),
                role: None,
                menus: vec![Menu {
                    id: "m-1".into(),
                    name: "Video".into(),
                    parent_id: None,
                    sequence_no: 1,
                    accesses: vec![
                        Access { id: "a-1".into(), name: "read".into(), is_active: Some(true) },
                        Access {
                            id: "a-2".into(),
                            name: "create".into(),
                            is_active: Some(self.grant_create.load(Ordering::SeqCst)),
                        },
                    ],
                }],
            }])
        }
    }

    #[tokio::test]
    async fn refresh_replaces_snapshot_without_touching_old_one() {
        let source = Arc::new(FakeSource::new());
        let mut ctx = AbilityContext::load(Arc::clone(&source), "admin").await.unwrap();
        let before = ctx.snapshot();
        assert!(before.can("read", "Video"));
        assert!(!before.can("create", "Video"));

        source.grant_create.store(true, Ordering::SeqCst);
        let after = ctx.refresh().await.unwrap();

        assert!(after.can("create", "Video"));
        assert!(!before.can("create", "Video"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let source = Arc::new(FakeSource::new());
        let mut ctx = AbilityContext::load(Arc::clone(&source), "admin").await.unwrap();

        source.fail.store(true, Ordering::SeqCst);
        assert!(ctx.refresh().await.is_err());
        assert!(ctx.can("read", "Video"));
    }

    #[tokio::test]
    async fn empty_permission_list_denies_all() {
        let source = Arc::new(FakeSource::new());
        let ctx = AbilityContext::load(source, "nobody").await.unwrap();
        assert!(ctx.snapshot().is_empty());
        assert!(!ctx.can("read", "Video"));
    }
}
