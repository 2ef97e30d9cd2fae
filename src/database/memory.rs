//! In-process stores with the same contracts as the Postgres ones.
//!
//! Nothing here survives a restart; they back the test-suite and single-process
//! embedding. Per-session `Mutex`es give the same serialization guarantee as
//! the `FOR UPDATE` row lock.

use super::leaderboard::{LeaderboardEntry, LeaderboardStore};
use super::sessions::SessionStore;
use crate::error::GameError;
use crate::game::{Session, SessionId};
use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

type Slot = Arc<Mutex<Session>>;

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<AHashMap<SessionId, Slot>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn slot(&self, id: &SessionId) -> Option<Slot> {
        self.sessions.read().await.get(id).cloned()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, deck: Vec<String>, now: DateTime<Utc>) -> Result<Session, GameError> {
        let session = Session::new(Uuid::new_v4(), deck, now);
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::new(Mutex::new(session.clone())));
        Ok(session)
    }

    async fn get(&self, id: SessionId) -> Result<Option<Session>, GameError> {
        match self.slot(&id).await {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn update<F, T>(&self, id: SessionId, mutator: F) -> Result<T, GameError>
    where
        F: FnOnce(&mut Session) -> Result<T, GameError> + Send,
        T: Send,
    {
        let slot = self.slot(&id).await.ok_or(GameError::InvalidSession)?;
        let mut current = slot.lock().await;
        let mut draft = current.clone();
        let out = mutator(&mut draft)?;
        *current = draft;
        Ok(out)
    }

    async fn delete(&self, id: SessionId) -> Result<bool, GameError> {
        Ok(self.sessions.write().await.remove(&id).is_some())
    }

    async fn sweep_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, GameError> {
        let mut sessions = self.sessions.write().await;
        let mut expired = Vec::new();
        for (id, slot) in sessions.iter() {
            // A slot busy with an update is live by definition.
            let Ok(session) = slot.try_lock() else {
                continue;
            };
            if session.is_retired() || session.last_activity() < cutoff {
                expired.push(*id);
            }
        }
        for id in &expired {
            sessions.remove(id);
        }
        Ok(expired.len() as u64)
    }
}

/// Entries kept sorted by rank; `submitted` guards exactly-once insertion.
#[derive(Default)]
pub struct MemoryLeaderboardStore {
    inner: RwLock<Board>,
}

#[derive(Default)]
struct Board {
    ranked: Vec<LeaderboardEntry>,
    submitted: AHashSet<SessionId>,
}

impl MemoryLeaderboardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeaderboardStore for MemoryLeaderboardStore {
    async fn insert(&self, entry: &LeaderboardEntry) -> Result<bool, GameError> {
        let mut board = self.inner.write().await;
        if !board.submitted.insert(entry.session_id) {
            return Ok(false);
        }
        let at = board
            .ranked
            .partition_point(|e| e.rank_cmp(entry).is_lt());
        board.ranked.insert(at, entry.clone());
        Ok(true)
    }

    async fn count(&self, as_of: DateTime<Utc>) -> Result<u64, GameError> {
        let board = self.inner.read().await;
        Ok(board
            .ranked
            .iter()
            .filter(|e| e.submitted_at <= as_of)
            .count() as u64)
    }

    async fn page(
        &self,
        offset: u64,
        limit: u64,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<LeaderboardEntry>, GameError> {
        let board = self.inner.read().await;
        Ok(board
            .ranked
            .iter()
            .filter(|e| e.submitted_at <= as_of)
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[tokio::test]
    async fn failed_mutator_leaves_session_untouched() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        let created = store.create(vec!["A".into(), "A".into()], now).await.unwrap();
        let res: Result<(), _> = store
            .update(created.id, |s| {
                s.move_count = 99;
                Err(GameError::NotCompleted)
            })
            .await;
        assert!(matches!(res, Err(GameError::NotCompleted)));
        let stored = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(stored, created);
    }

    #[tokio::test]
    async fn unknown_ids_are_invalid_sessions() {
        let store = MemorySessionStore::new();
        let res = store.update(Uuid::new_v4(), |_| Ok(())).await;
        assert!(matches!(res, Err(GameError::InvalidSession)));
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
        assert!(!store.delete(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn sweep_drops_idle_and_retired_sessions() {
        let store = MemorySessionStore::new();
        let t0 = Utc::now();
        let idle = store.create(vec!["A".into(), "A".into()], t0).await.unwrap();
        let fresh = store
            .create(vec!["A".into(), "A".into()], t0 + TimeDelta::minutes(20))
            .await
            .unwrap();
        let retired = store
            .create(vec!["A".into(), "A".into()], t0 + TimeDelta::minutes(25))
            .await
            .unwrap();
        store
            .update(retired.id, |s| {
                s.matched = vec![0, 1];
                s.completed_at = Some(t0 + TimeDelta::minutes(26));
                s.retire(t0 + TimeDelta::minutes(27))
            })
            .await
            .unwrap();

        let removed = store
            .sweep_expired(t0 + TimeDelta::minutes(10))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(store.get(idle.id).await.unwrap().is_none());
        assert!(store.get(retired.id).await.unwrap().is_none());
        assert!(store.get(fresh.id).await.unwrap().is_some());
        assert_eq!(store.len().await, 1);
    }
}
