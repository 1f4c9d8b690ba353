//! In-memory session registry

use crate::infrastructure::entities::SessionRecord;
use crate::infrastructure::traits::SessionRepository;
use async_trait::async_trait;
use di::{inject, injectable};
use log::debug;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Maximum number of live sessions per visitor
pub const MAX_SESSIONS_PER_VISITOR: usize = 5;

struct Slot {
    /// Insertion order, used for oldest-first listing and eviction.
    seq: u64,
    record: SessionRecord,
}

#[derive(Default)]
struct Registry {
    next_seq: u64,
    slots: HashMap<Uuid, Slot>,
}

impl Registry {
    /// The owner's slots, oldest first.
    fn owned_by(&self, owner: Uuid) -> Vec<&Slot> {
        let mut slots: Vec<&Slot> = self
            .slots
            .values()
            .filter(|slot| slot.record.owner == owner)
            .collect();
        slots.sort_by_key(|slot| slot.seq);
        slots
    }
}

/// Sessions live only as long as the process.
pub struct InMemorySessionRepository {
    registry: RwLock<Registry>,
    max_per_visitor: usize,
}

#[injectable(SessionRepository)]
impl InMemorySessionRepository {
    #[inject]
    pub fn create() -> InMemorySessionRepository {
        InMemorySessionRepository::with_limit(MAX_SESSIONS_PER_VISITOR)
    }
}

impl InMemorySessionRepository {
    /// A limit of zero is treated as one; the session being inserted always stays.
    pub fn with_limit(max_per_visitor: usize) -> Self {
        InMemorySessionRepository {
            registry: RwLock::new(Registry::default()),
            max_per_visitor: max_per_visitor.max(1),
        }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert_session(&self, record: SessionRecord) -> Vec<SessionRecord> {
        let mut registry = self.registry.write().await;

        let owned: Vec<Uuid> = registry
            .owned_by(record.owner)
            .iter()
            .map(|slot| slot.record.id())
            .collect();
        let excess = (owned.len() + 1).saturating_sub(self.max_per_visitor);
        let evicted: Vec<SessionRecord> = owned
            .into_iter()
            .take(excess)
            .filter_map(|id| registry.slots.remove(&id))
            .map(|slot| slot.record)
            .collect();

        let seq = registry.next_seq;
        registry.next_seq += 1;
        registry.slots.insert(record.id(), Slot { seq, record: record.clone() });

        debug!(
            "registered session {} for {}, evicted {}",
            record.id(),
            record.owner,
            evicted.len()
        );
        evicted
    }

    async fn find_session(&self, owner: Uuid, session_id: Uuid) -> Option<SessionRecord> {
        self.registry
            .read()
            .await
            .slots
            .get(&session_id)
            .map(|slot| &slot.record)
            .filter(|record| record.owner == owner)
            .cloned()
    }

    async fn list_sessions(&self, owner: Uuid) -> Vec<SessionRecord> {
        self.registry
            .read()
            .await
            .owned_by(owner)
            .into_iter()
            .map(|slot| slot.record.clone())
            .collect()
    }

    async fn remove_session(&self, owner: Uuid, session_id: Uuid) -> Option<SessionRecord> {
        let mut registry = self.registry.write().await;
        match registry.slots.get(&session_id) {
            Some(slot) if slot.record.owner == owner => {
                registry.slots.remove(&session_id).map(|slot| slot.record)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::knowledge::KnowledgeBase;
    use crate::core::session::ConversationSession;
    use std::sync::Arc;
    use std::time::Duration;

    fn record(owner: Uuid) -> SessionRecord {
        let session =
            ConversationSession::new(Arc::new(KnowledgeBase::portfolio()), Duration::ZERO);
        SessionRecord::new(owner, session)
    }

    async fn ids(repo: &InMemorySessionRepository, owner: Uuid) -> Vec<Uuid> {
        repo.list_sessions(owner)
            .await
            .iter()
            .map(SessionRecord::id)
            .collect()
    }

    #[tokio::test]
    async fn test_sessions_are_scoped_to_owner() {
        let repo = InMemorySessionRepository::create();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let session = record(alice);
        assert!(repo.insert_session(session.clone()).await.is_empty());

        assert!(repo.find_session(alice, session.id()).await.is_some());
        assert!(repo.find_session(bob, session.id()).await.is_none());
        assert_eq!(repo.list_sessions(alice).await.len(), 1);
        assert!(repo.list_sessions(bob).await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_requires_owner() {
        let repo = InMemorySessionRepository::create();
        let alice = Uuid::new_v4();
        let session = record(alice);
        repo.insert_session(session.clone()).await;

        assert!(repo.remove_session(Uuid::new_v4(), session.id()).await.is_none());
        assert!(repo.remove_session(alice, session.id()).await.is_some());
        assert!(repo.find_session(alice, session.id()).await.is_none());
        assert!(repo.remove_session(alice, session.id()).await.is_none());
    }

    #[tokio::test]
    async fn test_list_is_oldest_first() {
        let repo = InMemorySessionRepository::create();
        let owner = Uuid::new_v4();

        let first = record(owner);
        let second = record(owner);
        repo.insert_session(first.clone()).await;
        repo.insert_session(second.clone()).await;

        assert_eq!(ids(&repo, owner).await, [first.id(), second.id()]);
    }

    #[tokio::test]
    async fn test_oldest_session_is_evicted_at_limit() {
        let repo = InMemorySessionRepository::with_limit(2);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let bobs = record(bob);
        repo.insert_session(bobs.clone()).await;

        let sessions: Vec<SessionRecord> = (0..3).map(|_| record(alice)).collect();
        assert!(repo.insert_session(sessions[0].clone()).await.is_empty());
        assert!(repo.insert_session(sessions[1].clone()).await.is_empty());

        let evicted = repo.insert_session(sessions[2].clone()).await;
        let evicted: Vec<Uuid> = evicted.iter().map(SessionRecord::id).collect();

        assert_eq!(evicted, [sessions[0].id()]);
        assert_eq!(ids(&repo, alice).await, [sessions[1].id(), sessions[2].id()]);
        assert!(repo.find_session(alice, sessions[0].id()).await.is_none());
        // Other visitors do not count towards alice's limit.
        assert_eq!(ids(&repo, bob).await, [bobs.id()]);
    }

    #[tokio::test]
    async fn test_default_limit_holds_under_many_opens() {
        let repo = InMemorySessionRepository::create();
        let owner = Uuid::new_v4();

        let mut evicted = 0;
        for _ in 0..(MAX_SESSIONS_PER_VISITOR * 3) {
            evicted += repo.insert_session(record(owner)).await.len();
        }

        assert_eq!(repo.list_sessions(owner).await.len(), MAX_SESSIONS_PER_VISITOR);
        assert_eq!(evicted, MAX_SESSIONS_PER_VISITOR * 2);
    }
}
