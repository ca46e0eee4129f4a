//! Per-guild mutual exclusion.
//!
//! A `next` command holds its guild's lock from history read to challenge
//! install, and the evictor takes the same lock before deleting, so the two
//! never interleave on one guild. Waiters are served in FIFO order, which keeps
//! history appends in the order commands arrived. Distinct guilds never
//! contend.

use std::collections::HashMap;
use std::sync::Arc;

use codeit_schema::GuildId;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct GuildLocks {
    locks: Arc<Mutex<HashMap<GuildId, Arc<Mutex<()>>>>>,
}

impl GuildLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock_for(&self, guild: &GuildId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(guild.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquire exclusive access to a guild.
    /// Returns a guard that releases the lock when dropped.
    pub async fn acquire(&self, guild: &GuildId) -> GuildLockGuard {
        let lock = self.lock_for(guild).await;
        GuildLockGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Returns None if the guild is already locked.
    pub async fn try_acquire(&self, guild: &GuildId) -> Option<GuildLockGuard> {
        let lock = self.lock_for(guild).await;
        lock.try_lock_owned()
            .ok()
            .map(|guard| GuildLockGuard { _guard: guard })
    }

    /// Drop lock entries nobody holds or waits on.
    pub async fn prune_idle(&self) -> usize {
        let mut locks = self.locks.lock().await;
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

pub struct GuildLockGuard {
    _guard: OwnedMutexGuard<()>,
}
