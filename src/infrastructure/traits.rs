//! Infrastructure traits, used for DI on higher levels

use crate::infrastructure::entities::SessionRecord;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Registers the session. When the owner is at the session limit, their oldest sessions are
    /// taken out and returned; the caller tears them down.
    async fn insert_session(&self, record: SessionRecord) -> Vec<SessionRecord>;

    async fn find_session(&self, owner: Uuid, session_id: Uuid) -> Option<SessionRecord>;

    async fn list_sessions(&self, owner: Uuid) -> Vec<SessionRecord>;

    /// Takes the session out of the registry. The caller decides how to tear it down.
    async fn remove_session(&self, owner: Uuid, session_id: Uuid) -> Option<SessionRecord>;
}
