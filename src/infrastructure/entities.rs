//! Registry entities

use crate::core::session::ConversationSession;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct SessionRecord {
    /// Visitor that opened the session.
    pub owner: Uuid,
    pub session: Arc<ConversationSession>,
}

impl SessionRecord {
    pub fn new(owner: Uuid, session: ConversationSession) -> Self {
        SessionRecord {
            owner,
            session: Arc::new(session),
        }
    }

    pub fn id(&self) -> Uuid {
        self.session.id()
    }
}
