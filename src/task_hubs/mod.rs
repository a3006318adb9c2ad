//! # Task Hub Validation
//!
//! Every hub-scoped request passes [`TaskHubValidator::validate`] before
//! storage is touched:
//!
//! 1. the name must match `^[\w-]{3,128}$`
//! 2. the name must be in the cached allow-list; on a miss the list is
//!    reloaded once and checked again
//!
//! The allow-list is held as a shared future. Replacing it never disturbs
//! callers already awaiting the previous one. It is also replaced once it
//! is older than the refresh interval.
//!
//! When the storage scan fails the list is unknown and validation passes;
//! an explicitly configured list is always enforced.

pub mod allow_list;

pub use allow_list::{AllowList, AllowListLoader, KnownHubs};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::RwLock;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{MonitorError, Result};

static TASK_HUB_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[\w-]{3,128}$").expect("task hub pattern is valid"));

type SharedAllowList = Shared<BoxFuture<'static, AllowList>>;

struct CachedAllowList {
    list: SharedAllowList,
    loaded_at: Instant,
    generation: u64,
}

pub fn is_valid_task_hub_name(hub_name: &str) -> bool {
    TASK_HUB_NAME_REGEX.is_match(hub_name)
}

pub struct TaskHubValidator {
    loader: Arc<AllowListLoader>,
    refresh_interval: Duration,
    cache: RwLock<CachedAllowList>,
}

impl std::fmt::Debug for TaskHubValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHubValidator")
            .field("loader", &self.loader)
            .field("refresh_interval", &self.refresh_interval)
            .finish_non_exhaustive()
    }
}

impl TaskHubValidator {
    /// The first load starts lazily, on first poll
    pub fn new(loader: AllowListLoader, refresh_interval: Duration) -> Self {
        let loader = Arc::new(loader);
        let cache = RwLock::new(CachedAllowList {
            list: start_load(&loader),
            loaded_at: Instant::now(),
            generation: 0,
        });
        Self {
            loader,
            refresh_interval,
            cache,
        }
    }

    pub async fn validate(&self, hub_name: &str) -> Result<()> {
        if !is_valid_task_hub_name(hub_name) {
            return Err(MonitorError::InvalidTaskHubName(hub_name.to_string()));
        }

        let (list, generation) = self.current();
        let list = list.await;
        if list.contains(hub_name) {
            return Ok(());
        }
        if list == AllowList::Unknown {
            self.fail_open(hub_name);
            return Ok(());
        }

        debug!(hub = %hub_name, "Task hub not in allow-list, reloading");
        match self.reload(generation).await {
            AllowList::Unknown => {
                self.fail_open(hub_name);
                Ok(())
            }
            list if list.contains(hub_name) => Ok(()),
            _ => Err(MonitorError::TaskHubNotAllowed(hub_name.to_string())),
        }
    }

    /// Current allow-list contents; `None` when storage could not be scanned
    pub async fn task_hub_names(&self) -> Option<Vec<String>> {
        self.current().0.await.names()
    }

    fn fail_open(&self, hub_name: &str) {
        warn!(hub = %hub_name, "Task hub allow-list unknown, skipping validation");
    }

    /// Cached list, replaced first when stale
    fn current(&self) -> (SharedAllowList, u64) {
        {
            let cache = self.cache.read();
            if cache.loaded_at.elapsed() < self.refresh_interval {
                return (cache.list.clone(), cache.generation);
            }
        }

        let mut cache = self.cache.write();
        if cache.loaded_at.elapsed() >= self.refresh_interval {
            debug!("Task hub allow-list stale, refreshing");
            self.replace(&mut cache);
        }
        (cache.list.clone(), cache.generation)
    }

    /// Reload unless someone already did since `seen_generation`
    async fn reload(&self, seen_generation: u64) -> AllowList {
        let list = {
            let mut cache = self.cache.write();
            if cache.generation == seen_generation {
                self.replace(&mut cache);
            }
            cache.list.clone()
        };
        list.await
    }

    fn replace(&self, cache: &mut CachedAllowList) {
        cache.list = start_load(&self.loader);
        cache.loaded_at = Instant::now();
        cache.generation += 1;
    }
}

fn start_load(loader: &Arc<AllowListLoader>) -> SharedAllowList {
    let loader = Arc::clone(loader);
    async move { loader.load().await }.boxed().shared()
}
