use std::collections::HashMap;

use codeit_schema::{ChallengeRecord, GuildId};
use tokio::sync::RwLock;

/// Latest challenge per guild. Records are only ever replaced whole.
#[derive(Default)]
pub struct ChallengeStore {
    records: RwLock<HashMap<GuildId, ChallengeRecord>>,
}

impl ChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn install(&self, guild: &GuildId, record: ChallengeRecord) {
        self.records.write().await.insert(guild.clone(), record);
    }

    pub async fn get(&self, guild: &GuildId) -> Option<ChallengeRecord> {
        self.records.read().await.get(guild).cloned()
    }

    pub async fn remove(&self, guild: &GuildId) -> bool {
        self.records.write().await.remove(guild).is_some()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeit_schema::Language;

    fn record(tag: &str) -> ChallengeRecord {
        ChallengeRecord {
            language: Language::Go,
            challenge: format!("challenge {tag}"),
            clue: format!("clue {tag}"),
            solution: format!("solution {tag}"),
        }
    }

    #[tokio::test]
    async fn install_replaces_whole_record() {
        let store = ChallengeStore::new();
        let guild = GuildId::guild(1);
        assert!(store.get(&guild).await.is_none());

        store.install(&guild, record("a")).await;
        store.install(&guild, record("b")).await;
        assert_eq!(store.get(&guild).await, Some(record("b")));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn records_are_per_guild() {
        let store = ChallengeStore::new();
        store.install(&GuildId::guild(1), record("a")).await;
        store.install(&GuildId::guild(2), record("b")).await;
        assert_eq!(store.get(&GuildId::guild(1)).await, Some(record("a")));
        assert_eq!(store.get(&GuildId::guild(2)).await, Some(record("b")));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = ChallengeStore::new();
        let guild = GuildId::guild(1);
        store.install(&guild, record("a")).await;
        assert!(store.remove(&guild).await);
        assert!(!store.remove(&guild).await);
        assert!(store.is_empty().await);
    }
}
