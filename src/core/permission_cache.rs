use std::{
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use tokio::{sync::OnceCell, task::JoinHandle, time::interval};
use tracing::debug;

use crate::model::role::Role;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

type CacheKey = (Role, String);

struct Slot {
    created_at: Instant,
    value: OnceCell<bool>,
}

impl Slot {
    fn new(created_at: Instant) -> Self {
        Self {
            created_at,
            value: OnceCell::new(),
        }
    }
}

/// Process-wide memo of `(role, permission)` lookups.
///
/// The whole map is dropped on every sweep tick and on every permission
/// mutation. Independently of the sweeper, an entry older than one interval
/// is treated as a miss. Concurrent misses on the same key share a single
/// load; a failed load leaves the key empty.
pub struct PermissionCache {
    entries: DashMap<CacheKey, Arc<Slot>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl PermissionCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get_or_try_load<F, Fut>(
        &self,
        role: Role,
        permission_name: &str,
        load: F,
    ) -> anyhow::Result<bool>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<bool>>,
    {
        let slot = self.slot(role, permission_name);
        let value = slot.value.get_or_try_init(load).await?;
        Ok(*value)
    }

    /// Cached value without loading.
    pub fn get(&self, role: Role, permission_name: &str) -> Option<bool> {
        let entry = self.entries.get(&(role, permission_name.to_string()))?;
        if self.is_expired(&entry) {
            return None;
        }
        entry.value.get().copied()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear the whole cache on every tick of the sweep interval. Abort the
    /// returned handle to stop sweeping.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(cache.ttl);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let swept = cache.len();
                cache.clear();
                debug!("permission cache swept, {} entries dropped", swept);
            }
        })
    }

    fn is_expired(&self, slot: &Slot) -> bool {
        self.clock.now().saturating_duration_since(slot.created_at) >= self.ttl
    }

    fn slot(&self, role: Role, permission_name: &str) -> Arc<Slot> {
        let key = (role, permission_name.to_string());
        if let Some(existing) = self.entries.get(&key) {
            if !self.is_expired(&existing) {
                return Arc::clone(existing.value());
            }
        }
        let now = self.clock.now();
        let mut entry = self
            .entries
            .entry(key)
            .or_insert_with(|| Arc::new(Slot::new(now)));
        if self.is_expired(entry.value()) {
            *entry = Arc::new(Slot::new(now));
        }
        Arc::clone(entry.value())
    }
}

#[cfg(test)]
pub mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use super::*;

    pub struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn test_miss_loads_then_hit_is_served_from_cache() {
        let cache = PermissionCache::new(Duration::from_secs(300));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let allowed = cache
                .get_or_try_load(Role::Admin, "employees.view", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(true)
                })
                .await
                .unwrap();
            assert!(allowed);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(Role::Admin, "employees.view"), Some(true));
        assert_eq!(cache.get(Role::User, "employees.view"), None);
    }

    #[tokio::test]
    async fn test_deny_is_cached_too() {
        let cache = PermissionCache::new(Duration::from_secs(300));
        let allowed = cache
            .get_or_try_load(Role::User, "users.delete", || async { Ok(false) })
            .await
            .unwrap();
        assert!(!allowed);
        assert_eq!(cache.get(Role::User, "users.delete"), Some(false));
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache = PermissionCache::new(Duration::from_secs(300));
        let res = cache
            .get_or_try_load(Role::Admin, "menus.manage", || async {
                Err(anyhow::anyhow!("connection refused"))
            })
            .await;
        assert!(res.is_err());
        assert_eq!(cache.get(Role::Admin, "menus.manage"), None);

        let allowed = cache
            .get_or_try_load(Role::Admin, "menus.manage", || async { Ok(true) })
            .await
            .unwrap();
        assert!(allowed);
    }

    #[tokio::test]
    async fn test_clear_forces_reload() {
        let cache = PermissionCache::new(Duration::from_secs(300));
        cache
            .get_or_try_load(Role::Manager, "employees.edit", || async { Ok(true) })
            .await
            .unwrap();
        cache.clear();
        assert!(cache.is_empty());
        let allowed = cache
            .get_or_try_load(Role::Manager, "employees.edit", || async { Ok(false) })
            .await
            .unwrap();
        assert!(!allowed);
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl_without_sweeper() {
        let clock = Arc::new(ManualClock::new());
        let cache = PermissionCache::with_clock(Duration::from_secs(60), clock.clone());
        cache
            .get_or_try_load(Role::Admin, "users.view", || async { Ok(true) })
            .await
            .unwrap();

        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get(Role::Admin, "users.view"), Some(true));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(Role::Admin, "users.view"), None);
        let allowed = cache
            .get_or_try_load(Role::Admin, "users.view", || async { Ok(false) })
            .await
            .unwrap();
        assert!(!allowed);
    }

    #[tokio::test]
    async fn test_concurrent_cold_lookups_share_one_load() {
        let cache = Arc::new(PermissionCache::new(Duration::from_secs(300)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_try_load(Role::User, "employees.view", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(true)
                    })
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sweeper_clears_everything() {
        let cache = Arc::new(PermissionCache::new(Duration::from_millis(50)));
        cache
            .get_or_try_load(Role::Admin, "users.view", || async { Ok(true) })
            .await
            .unwrap();
        cache
            .get_or_try_load(Role::User, "users.view", || async { Ok(false) })
            .await
            .unwrap();
        assert_eq!(cache.len(), 2);

        let sweeper = cache.spawn_sweeper();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.is_empty());
        sweeper.abort();
    }
}
