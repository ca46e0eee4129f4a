use chrono::{DateTime, TimeDelta, Utc};
use codeit_schema::{ChallengeRecord, GuildId};

use crate::guild_lock::{GuildLockGuard, GuildLocks};
use crate::ledger::{ConversationLedger, ConversationSession};
use crate::store::ChallengeStore;

/// Outcome of trying to evict one guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eviction {
    Removed,
    /// Activity was recorded after the snapshot.
    StillActive,
    /// A command currently holds the guild.
    Busy,
}

/// The ledger and store for all guilds, plus the locks that pair them.
///
/// A guild's session and challenge are created and removed together; readers
/// treat a guild with only one of the two halves as having neither.
pub struct SessionRegistry {
    ledger: ConversationLedger,
    store: ChallengeStore,
    locks: GuildLocks,
}

impl SessionRegistry {
    pub fn new(ledger: ConversationLedger, store: ChallengeStore) -> Self {
        Self {
            ledger,
            store,
            locks: GuildLocks::new(),
        }
    }

    pub fn ledger(&self) -> &ConversationLedger {
        &self.ledger
    }

    pub fn store(&self) -> &ChallengeStore {
        &self.store
    }

    pub fn locks(&self) -> &GuildLocks {
        &self.locks
    }

    pub async fn lock(&self, guild: &GuildId) -> GuildLockGuard {
        self.locks.acquire(guild).await
    }

    /// The guild's challenge, if both its session and record exist.
    pub async fn loaded_record(&self, guild: &GuildId) -> Option<ChallengeRecord> {
        let record = self.store.get(guild).await?;
        if !self.ledger.contains(guild).await {
            tracing::warn!(guild = %guild, "challenge without session, treating as absent");
            return None;
        }
        Some(record)
    }

    /// The guild's session, created if missing. Creating one also drops any
    /// challenge left in the store without a session. Callers hold the guild
    /// lock.
    pub async fn open_session(&self, guild: &GuildId) -> ConversationSession {
        let (session, created) = self.ledger.get_or_create(guild).await;
        if created && self.store.remove(guild).await {
            tracing::warn!(guild = %guild, "dropped challenge left without a session");
        }
        session
    }

    /// Explicitly drop a guild's session and challenge. Idempotent.
    pub async fn remove(&self, guild: &GuildId) -> bool {
        let _guard = self.locks.acquire(guild).await;
        let had_session = self.ledger.remove(guild).await;
        let had_record = self.store.remove(guild).await;
        had_session || had_record
    }

    /// Evict a guild found idle by a snapshot, re-checking its activity
    /// while holding the guild lock.
    pub async fn evict_if_idle(
        &self,
        guild: &GuildId,
        threshold: TimeDelta,
        now: DateTime<Utc>,
    ) -> Eviction {
        let Some(_guard) = self.locks.try_acquire(guild).await else {
            return Eviction::Busy;
        };
        if !self.ledger.remove_if_idle(guild, threshold, now).await {
            return Eviction::StillActive;
        }
        self.store.remove(guild).await;
        Eviction::Removed
    }
}
