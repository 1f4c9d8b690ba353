//! Errors surfaced by the assistant service.

use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AssistantError {
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("a reply is still pending")]
    ReplyPending,
}
