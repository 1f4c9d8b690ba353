//! DI "Interfaces"

use crate::core::error::AssistantError;
use crate::core::session::{ConversationSession, Message, Sender, SessionEvent, SubmitOutcome};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

/// Result of classifying a piece of text without a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// `None` when the fallback answer was used.
    pub topic: Option<String>,
    pub answer: String,
}

/// An accepted visitor message plus a subscription that will carry the reply.
#[derive(Debug)]
pub struct PendingReply {
    pub message: Message,
    pub events: broadcast::Receiver<SessionEvent>,
}

impl PendingReply {
    /// Waits for the assistant answer to `message`.
    ///
    /// Events raised before `message` was appended (an earlier reply, a reset) are skipped.
    /// Returns `None` if the session is reset or closed before the answer lands.
    pub async fn reply(&mut self) -> Option<Message> {
        let mut seen_own = false;
        loop {
            match self.events.recv().await {
                Ok(SessionEvent::Appended(appended)) if appended.id == self.message.id => {
                    seen_own = true;
                }
                Ok(SessionEvent::Appended(appended))
                    if appended.sender == Sender::Assistant && appended.id > self.message.id =>
                {
                    return Some(appended);
                }
                Ok(SessionEvent::Appended(_)) => {}
                Ok(SessionEvent::Reset | SessionEvent::Closed) if seen_own => return None,
                Ok(SessionEvent::Reset | SessionEvent::Closed) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!("reply wait skipped {skipped} events");
                    seen_own = true;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[async_trait]
pub trait AssistantService: Send + Sync {
    /// Opens a new session for the given visitor, already holding the greeting.
    async fn open_session(&self, visitor_id: Uuid) -> Arc<ConversationSession>;

    /// Lists the visitor's live sessions, oldest first.
    async fn list_sessions(&self, visitor_id: Uuid) -> Vec<Arc<ConversationSession>>;

    /// Returns `Err` if the session does not exist or belongs to another visitor.
    async fn find_session(
        &self,
        visitor_id: Uuid,
        session_id: Uuid,
    ) -> Result<Arc<ConversationSession>, AssistantError>;

    /// Removes the session and cancels any reply it is still composing.
    async fn close_session(
        &self,
        visitor_id: Uuid,
        session_id: Uuid,
    ) -> Result<(), AssistantError>;

    /// Classifies `text` against the knowledge base.
    fn classify(&self, text: &str) -> Classification;

    /// Topic names in matching order.
    fn topics(&self) -> Vec<String>;

    async fn reset_session(
        &self,
        visitor_id: Uuid,
        session_id: Uuid,
    ) -> Result<Arc<ConversationSession>, AssistantError> {
        let session = self.find_session(visitor_id, session_id).await?;
        session.reset();
        Ok(session)
    }

    async fn set_draft(
        &self,
        visitor_id: Uuid,
        session_id: Uuid,
        text: String,
    ) -> Result<Arc<ConversationSession>, AssistantError> {
        let session = self.find_session(visitor_id, session_id).await?;
        session.set_draft(text);
        Ok(session)
    }

    /// Submits a visitor message.
    ///
    /// Returns `Err` if the text is blank, a reply is still pending, or the session is gone.
    async fn submit_message(
        &self,
        visitor_id: Uuid,
        session_id: Uuid,
        text: String,
    ) -> Result<PendingReply, AssistantError> {
        let session = self.find_session(visitor_id, session_id).await?;

        // Subscribe first so the reply cannot slip past the receiver.
        let events = session.subscribe();
        match session.submit(&text) {
            SubmitOutcome::Accepted(message) => Ok(PendingReply { message, events }),
            SubmitOutcome::Empty => Err(AssistantError::EmptyMessage),
            SubmitOutcome::Busy => Err(AssistantError::ReplyPending),
            SubmitOutcome::Closed => Err(AssistantError::SessionNotFound(session_id)),
        }
    }
}
