//! Per-guild conversation history replayed to the backend on every `next`.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, TimeDelta, Utc};
use codeit_schema::{GuildId, HistoryEntry, Role};
use tokio::sync::RwLock;

use crate::error::LedgerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSession {
    /// Always starts with exactly one system entry.
    pub history: Vec<HistoryEntry>,
    pub last_activity: DateTime<Utc>,
}

impl ConversationSession {
    fn new(system_prompt: &str, now: DateTime<Utc>) -> Self {
        Self {
            history: vec![HistoryEntry::system(system_prompt)],
            last_activity: now,
        }
    }

    /// Strictly longer than `threshold` since the last append.
    pub fn is_expired(&self, threshold: TimeDelta, now: DateTime<Utc>) -> bool {
        now - self.last_activity > threshold
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// Number of completed user/assistant exchanges.
    pub fn turns(&self) -> usize {
        self.history
            .iter()
            .filter(|entry| entry.role == Role::User)
            .count()
    }
}

pub struct ConversationLedger {
    sessions: RwLock<HashMap<GuildId, ConversationSession>>,
    system_prompt: String,
    /// Maximum exchanges kept after the system entry; `None` keeps everything.
    turn_limit: Option<usize>,
}

impl ConversationLedger {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            system_prompt: system_prompt.into(),
            turn_limit: None,
        }
    }

    pub fn with_turn_limit(mut self, turn_limit: Option<usize>) -> Self {
        self.turn_limit = turn_limit;
        self
    }

    /// Returns a snapshot of the guild's session, creating a fresh
    /// system-seeded one when none exists. The flag is `true` when the
    /// session was created by this call.
    pub async fn get_or_create(&self, guild: &GuildId) -> (ConversationSession, bool) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(guild) {
            return (session.clone(), false);
        }
        tracing::debug!(guild = %guild, "creating conversation session");
        let session = ConversationSession::new(&self.system_prompt, Utc::now());
        sessions.insert(guild.clone(), session.clone());
        (session, true)
    }

    pub async fn get(&self, guild: &GuildId) -> Option<ConversationSession> {
        self.sessions.read().await.get(guild).cloned()
    }

    pub async fn contains(&self, guild: &GuildId) -> bool {
        self.sessions.read().await.contains_key(guild)
    }

    pub async fn append_exchange(
        &self,
        guild: &GuildId,
        user_msg: &str,
        assistant_msg: &str,
    ) -> Result<(), LedgerError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(guild)
            .ok_or_else(|| LedgerError::SessionNotFound(guild.clone()))?;

        session.history.push(HistoryEntry::user(user_msg));
        session.history.push(HistoryEntry::assistant(assistant_msg));

        if let Some(limit) = self.turn_limit {
            // Index 0 is the system entry; trim whole exchanges after it.
            let max_messages = limit * 2;
            let exchanges = session.history.len() - 1;
            if exchanges > max_messages {
                session.history.drain(1..1 + exchanges - max_messages);
            }
        }

        session.touch(Utc::now());
        Ok(())
    }

    /// Idempotent. Returns whether a session was present.
    pub async fn remove(&self, guild: &GuildId) -> bool {
        self.sessions.write().await.remove(guild).is_some()
    }

    /// Guilds idle for longer than `threshold` at `now`. Does not mutate.
    pub async fn snapshot_expired(
        &self,
        threshold: TimeDelta,
        now: DateTime<Utc>,
    ) -> BTreeSet<GuildId> {
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .filter(|(_, session)| session.is_expired(threshold, now))
            .map(|(guild, _)| guild.clone())
            .collect()
    }

    /// Removes the session only if it is still expired under the write lock,
    /// so activity recorded after a snapshot keeps the session alive.
    pub async fn remove_if_idle(
        &self,
        guild: &GuildId,
        threshold: TimeDelta,
        now: DateTime<Utc>,
    ) -> bool {
        let mut sessions = self.sessions.write().await;
        let expired = sessions
            .get(guild)
            .is_some_and(|session| session.is_expired(threshold, now));
        if expired {
            sessions.remove(guild);
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild(id: u64) -> GuildId {
        GuildId::guild(id)
    }

    fn hours(n: i64) -> TimeDelta {
        TimeDelta::try_hours(n).unwrap()
    }

    #[tokio::test]
    async fn get_or_create_seeds_single_system_entry() {
        let ledger = ConversationLedger::new("rules");
        let (session, created) = ledger.get_or_create(&guild(1)).await;
        assert!(created);
        assert_eq!(session.history, vec![HistoryEntry::system("rules")]);

        let (again, created) = ledger.get_or_create(&guild(1)).await;
        assert!(!created);
        assert_eq!(again.history.len(), 1);
        assert_eq!(again.last_activity, session.last_activity);
    }

    #[tokio::test]
    async fn append_exchange_keeps_order_and_touches() {
        let ledger = ConversationLedger::new("rules");
        let (before, _) = ledger.get_or_create(&guild(1)).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        ledger.append_exchange(&guild(1), "q1", "a1").await.unwrap();
        ledger.append_exchange(&guild(1), "q2", "a2").await.unwrap();

        let session = ledger.get(&guild(1)).await.unwrap();
        let contents: Vec<&str> = session.history.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["rules", "q1", "a1", "q2", "a2"]);
        assert_eq!(session.history[1].role, Role::User);
        assert_eq!(session.history[2].role, Role::Assistant);
        assert_eq!(session.turns(), 2);
        assert!(session.last_activity > before.last_activity);
    }

    #[tokio::test]
    async fn append_without_session_fails() {
        let ledger = ConversationLedger::new("rules");
        let err = ledger.append_exchange(&guild(9), "q", "a").await.unwrap_err();
        assert_eq!(err, LedgerError::SessionNotFound(guild(9)));
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let ledger = ConversationLedger::new("rules");
        ledger.get_or_create(&guild(1)).await;
        assert!(ledger.remove(&guild(1)).await);
        assert!(!ledger.remove(&guild(1)).await);
        assert!(!ledger.contains(&guild(1)).await);
    }

    #[tokio::test]
    async fn turn_limit_keeps_system_entry() {
        let ledger = ConversationLedger::new("rules").with_turn_limit(Some(2));
        ledger.get_or_create(&guild(1)).await;
        for i in 1..=4 {
            ledger
                .append_exchange(&guild(1), &format!("q{i}"), &format!("a{i}"))
                .await
                .unwrap();
        }

        let session = ledger.get(&guild(1)).await.unwrap();
        let contents: Vec<&str> = session.history.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["rules", "q3", "a3", "q4", "a4"]);
        assert_eq!(
            session
                .history
                .iter()
                .filter(|e| e.role == Role::System)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn snapshot_expired_is_strict_and_read_only() {
        let ledger = ConversationLedger::new("rules");
        let (session, _) = ledger.get_or_create(&guild(1)).await;
        ledger.get_or_create(&guild(2)).await;

        let at_threshold = session.last_activity + hours(24);
        assert!(ledger.snapshot_expired(hours(24), at_threshold).await.is_empty());

        let later = at_threshold + TimeDelta::try_seconds(1).unwrap();
        let expired = ledger.snapshot_expired(hours(24), later).await;
        assert!(expired.contains(&guild(1)));
        assert_eq!(ledger.len().await, 2);
    }

    #[tokio::test]
    async fn remove_if_idle_rechecks_activity() {
        let ledger = ConversationLedger::new("rules");
        ledger.get_or_create(&guild(1)).await;

        let now = Utc::now();
        assert!(!ledger.remove_if_idle(&guild(1), hours(1), now).await);
        assert!(ledger.contains(&guild(1)).await);

        assert!(ledger.remove_if_idle(&guild(1), hours(1), now + hours(2)).await);
        assert!(!ledger.contains(&guild(1)).await);
        assert!(!ledger.remove_if_idle(&guild(1), hours(1), now + hours(2)).await);
    }

    #[test]
    fn session_is_expired() {
        let now = Utc::now();
        let mut session = ConversationSession::new("rules", now - TimeDelta::try_seconds(100).unwrap());
        assert!(session.is_expired(TimeDelta::try_seconds(50).unwrap(), now));
        session.touch(now);
        assert!(!session.is_expired(TimeDelta::try_seconds(50).unwrap(), now));
    }
}
