//! Slack user cache and directory.
//!
//! [`UserCache`] indexes every known user both by opaque id (`U6CRHMXK4`)
//! and by case-folded nick. [`UserDirectory`] adds lazy remote fill on top:
//! a miss may be resolved through the Web API when the caller allows it.
//!
//! Entries are never evicted.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::api::SlackApi;

/// Maximum concurrent `users.info` calls during bulk population.
const POPULATE_CONCURRENCY: usize = 8;

/// A Slack user as seen by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackUser {
    pub id: String,
    pub nick: String,
    pub avatar: Option<String>,
}

impl SlackUser {
    pub fn new(id: impl Into<String>, nick: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nick: nick.into(),
            avatar: None,
        }
    }
}

#[derive(Default)]
struct Indexes {
    by_id: HashMap<String, Arc<SlackUser>>,
    by_nick: HashMap<String, Arc<SlackUser>>,
}

/// Bidirectional id/nick cache.
#[derive(Default)]
pub struct UserCache {
    indexes: RwLock<Indexes>,
}

impl UserCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `user` into both indexes at once.
    ///
    /// A nick already owned by another id is taken over by `user`.
    pub fn cache_user(&self, user: SlackUser) -> Arc<SlackUser> {
        let user = Arc::new(user);
        let mut indexes = self.indexes.write();
        indexes.by_id.insert(user.id.clone(), Arc::clone(&user));
        indexes
            .by_nick
            .insert(user.nick.to_lowercase(), Arc::clone(&user));
        user
    }

    pub fn by_id(&self, id: &str) -> Option<Arc<SlackUser>> {
        self.indexes.read().by_id.get(id).cloned()
    }

    /// Looks up a user by nick, ignoring case.
    pub fn by_nick(&self, nick: &str) -> Option<Arc<SlackUser>> {
        self.indexes.read().by_nick.get(&nick.to_lowercase()).cloned()
    }

    /// Returns the number of cached ids.
    pub fn len(&self) -> usize {
        self.indexes.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether a lookup may leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Answer from the cache or not at all. Never performs I/O.
    CacheOnly,
    /// Fall back to the Web API on a cache miss.
    Remote,
}

/// A [`UserCache`] with optional Web API fallback.
#[derive(Default)]
pub struct UserDirectory {
    cache: UserCache,
    api: RwLock<Option<Arc<dyn SlackApi>>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory that can resolve misses through `api`.
    pub fn with_api(api: Arc<dyn SlackApi>) -> Self {
        let directory = Self::new();
        directory.set_api(api);
        directory
    }

    pub fn set_api(&self, api: Arc<dyn SlackApi>) {
        *self.api.write() = Some(api);
    }

    pub fn api(&self) -> Option<Arc<dyn SlackApi>> {
        self.api.read().clone()
    }

    pub fn cache(&self) -> &UserCache {
        &self.cache
    }

    /// Returns the cached record for `id`.
    pub fn user(&self, id: &str) -> Option<Arc<SlackUser>> {
        self.cache.by_id(id)
    }

    /// Resolves a user id to a nick.
    pub async fn user_nick(&self, id: &str, lookup: Lookup) -> Option<String> {
        if let Some(user) = self.cache.by_id(id) {
            return Some(user.nick.clone());
        }
        if lookup == Lookup::CacheOnly {
            return None;
        }
        let api = self.api()?;
        match api.user_info(id).await {
            Ok(user) => Some(self.cache.cache_user(user).nick.clone()),
            Err(e) => {
                warn!(user = %id, error = %e, "Failed to fetch user");
                None
            }
        }
    }

    /// Resolves a nick to a user id, ignoring case.
    pub async fn user_id(&self, nick: &str, lookup: Lookup) -> Option<String> {
        if let Some(user) = self.cache.by_nick(nick) {
            return Some(user.id.clone());
        }
        if lookup == Lookup::CacheOnly {
            return None;
        }
        let api = self.api()?;
        match api.user_by_nick(nick).await {
            Ok(Some(user)) => Some(self.cache.cache_user(user).id.clone()),
            Ok(None) => None,
            Err(e) => {
                warn!(nick = %nick, error = %e, "Failed to look up nick");
                None
            }
        }
    }

    /// Fetches and caches every id in `members`.
    ///
    /// Individual failures are logged and skipped. Returns the number of
    /// users cached.
    pub async fn populate(&self, members: &[String]) -> usize {
        let Some(api) = self.api() else {
            return 0;
        };

        let fetched: Vec<_> = stream::iter(members.iter().cloned())
            .map(|id| {
                let api = Arc::clone(&api);
                async move {
                    let info = api.user_info(&id).await;
                    (id, info)
                }
            })
            .buffer_unordered(POPULATE_CONCURRENCY)
            .collect()
            .await;

        let mut cached = 0;
        for (id, result) in fetched {
            match result {
                Ok(user) => {
                    self.cache.cache_user(user);
                    cached += 1;
                }
                Err(e) => warn!(user = %id, error = %e, "Failed to fetch channel member"),
            }
        }
        debug!(members = members.len(), cached, "User cache populated");
        cached
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{SlackError, SlackResult};
    use crate::model::{AuthIdentity, OutgoingMessage, SlackChannel};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory Slack used across this crate's tests.
    #[derive(Default)]
    pub(crate) struct FakeSlack {
        pub users: Vec<SlackUser>,
        pub channels: Vec<SlackChannel>,
        pub members: Vec<String>,
        pub identity: AuthIdentity,
        pub posted: Mutex<Vec<OutgoingMessage>>,
        pub remote_calls: AtomicUsize,
    }

    #[async_trait]
    impl SlackApi for FakeSlack {
        async fn auth_test(&self) -> SlackResult<AuthIdentity> {
            Ok(self.identity.clone())
        }

        async fn find_channel(&self, name: &str) -> SlackResult<Option<SlackChannel>> {
            Ok(self.channels.iter().find(|c| c.name == name).cloned())
        }

        async fn channel_members(&self, _channel_id: &str) -> SlackResult<Vec<String>> {
            Ok(self.members.clone())
        }

        async fn user_info(&self, user_id: &str) -> SlackResult<SlackUser> {
            self.remote_calls.fetch_add(1, Ordering::SeqCst);
            self.users
                .iter()
                .find(|u| u.id == user_id)
                .cloned()
                .ok_or_else(|| SlackError::Api {
                    method: "users.info".into(),
                    error: "user_not_found".into(),
                })
        }

        async fn user_by_nick(&self, nick: &str) -> SlackResult<Option<SlackUser>> {
            self.remote_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .users
                .iter()
                .find(|u| u.nick.eq_ignore_ascii_case(nick))
                .cloned())
        }

        async fn post_message(&self, message: &OutgoingMessage) -> SlackResult<()> {
            self.posted.lock().push(message.clone());
            Ok(())
        }
    }

    #[test]
    fn cached_user_is_found_both_ways() {
        let cache = UserCache::new();
        cache.cache_user(SlackUser::new("U1", "Bob"));

        assert_eq!(cache.by_id("U1").unwrap().nick, "Bob");
        assert_eq!(cache.by_nick("bob").unwrap().id, "U1");
        assert_eq!(cache.by_nick("BOB").unwrap().id, "U1");
        assert!(cache.by_id("U2").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn nick_collision_is_last_write_wins() {
        let cache = UserCache::new();
        cache.cache_user(SlackUser::new("U1", "sam"));
        cache.cache_user(SlackUser::new("U2", "Sam"));

        assert_eq!(cache.by_nick("sam").unwrap().id, "U2");
        assert_eq!(cache.by_id("U1").unwrap().nick, "sam");
    }

    #[tokio::test]
    async fn cache_only_never_calls_api() {
        let api = Arc::new(FakeSlack {
            users: vec![SlackUser::new("U9", "zed")],
            ..FakeSlack::default()
        });
        let directory = UserDirectory::with_api(api.clone());
        directory.cache().cache_user(SlackUser::new("U1", "Bob"));

        assert_eq!(
            directory.user_nick("U1", Lookup::CacheOnly).await.as_deref(),
            Some("Bob")
        );
        assert_eq!(
            directory.user_id("bob", Lookup::CacheOnly).await.as_deref(),
            Some("U1")
        );
        assert_eq!(directory.user_nick("U9", Lookup::CacheOnly).await, None);
        assert_eq!(directory.user_id("zed", Lookup::CacheOnly).await, None);
        assert_eq!(api.remote_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_lookup_fills_cache() {
        let api = Arc::new(FakeSlack {
            users: vec![SlackUser::new("U9", "zed"), SlackUser::new("U8", "amy")],
            ..FakeSlack::default()
        });
        let directory = UserDirectory::with_api(api.clone());

        assert_eq!(
            directory.user_nick("U9", Lookup::Remote).await.as_deref(),
            Some("zed")
        );
        assert_eq!(
            directory.user_id("AMY", Lookup::Remote).await.as_deref(),
            Some("U8")
        );
        assert_eq!(directory.user_nick("U404", Lookup::Remote).await, None);
        assert_eq!(api.remote_calls.load(Ordering::SeqCst), 3);

        // now served from cache
        assert_eq!(
            directory.user_nick("U9", Lookup::CacheOnly).await.as_deref(),
            Some("zed")
        );
        assert_eq!(
            directory.user_id("zed", Lookup::CacheOnly).await.as_deref(),
            Some("U9")
        );
    }

    #[tokio::test]
    async fn populate_skips_failures() {
        let api = Arc::new(FakeSlack {
            users: vec![SlackUser::new("U1", "bob"), SlackUser::new("U2", "amy")],
            ..FakeSlack::default()
        });
        let directory = UserDirectory::with_api(api);

        let cached = directory
            .populate(&["U1".to_string(), "U2".to_string(), "U3".to_string()])
            .await;
        assert_eq!(cached, 2);
        assert_eq!(directory.cache().len(), 2);

        assert_eq!(UserDirectory::new().populate(&["U1".to_string()]).await, 0);
    }
}
