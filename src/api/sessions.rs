//! Chat session endpoints

use crate::api::ExtractVisitor;
use crate::core::error::AssistantError;
use crate::core::traits::AssistantService;
use async_stream::stream;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use di_axum::Inject;
use futures_util::Stream;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sessions).post(open_session))
        .route("/:id", get(session_state).delete(close_session))
        .route("/:id/reset", post(reset_session))
        .route("/:id/draft", put(update_draft))
        .route("/:id/messages", post(post_message))
}

async fn list_sessions(
    Inject(assistant): Inject<dyn AssistantService>,
    ExtractVisitor(visitor): ExtractVisitor,
) -> (StatusCode, Json<schemas::SessionList>) {
    let sessions = assistant.list_sessions(visitor).await;

    (
        StatusCode::OK,
        schemas::SessionList {
            sessions: sessions
                .iter()
                .map(|session| schemas::SessionSummary::from(session.as_ref()))
                .collect(),
        }
        .into(),
    )
}

async fn open_session(
    Inject(assistant): Inject<dyn AssistantService>,
    ExtractVisitor(visitor): ExtractVisitor,
) -> (StatusCode, Json<schemas::Session>) {
    let session = assistant.open_session(visitor).await;
    (StatusCode::CREATED, Json(session.as_ref().into()))
}

async fn session_state(
    Inject(assistant): Inject<dyn AssistantService>,
    ExtractVisitor(visitor): ExtractVisitor,
    Path(session_id): Path<Uuid>,
) -> Result<Json<schemas::Session>, AssistantError> {
    let session = assistant.find_session(visitor, session_id).await?;
    Ok(Json(session.as_ref().into()))
}

async fn close_session(
    Inject(assistant): Inject<dyn AssistantService>,
    ExtractVisitor(visitor): ExtractVisitor,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AssistantError> {
    assistant.close_session(visitor, session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reset_session(
    Inject(assistant): Inject<dyn AssistantService>,
    ExtractVisitor(visitor): ExtractVisitor,
    Path(session_id): Path<Uuid>,
) -> Result<Json<schemas::Session>, AssistantError> {
    let session = assistant.reset_session(visitor, session_id).await?;
    Ok(Json(session.as_ref().into()))
}

async fn update_draft(
    Inject(assistant): Inject<dyn AssistantService>,
    ExtractVisitor(visitor): ExtractVisitor,
    Path(session_id): Path<Uuid>,
    Json(draft): Json<schemas::UpdateDraft>,
) -> Result<Json<schemas::Session>, AssistantError> {
    let session = assistant
        .set_draft(visitor, session_id, draft.text)
        .await?;
    Ok(Json(session.as_ref().into()))
}

/// Streams the accepted visitor message, then the assistant reply once it is delivered.
///
/// If the session is reset or closed before the reply lands, a `cancelled` event ends the
/// stream instead.
async fn post_message(
    Inject(assistant): Inject<dyn AssistantService>,
    ExtractVisitor(visitor): ExtractVisitor,
    Path(session_id): Path<Uuid>,
    Json(message): Json<schemas::CreateMessage>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AssistantError> {
    let mut pending = assistant
        .submit_message(visitor, session_id, message.text)
        .await?;

    let stream = stream! {
        yield Event::default()
            .event("new_message")
            .json_data(schemas::Message::from(pending.message.clone()));

        match pending.reply().await {
            Some(reply) => {
                yield Event::default().event("reply").json_data(schemas::Message::from(reply));
            }
            None => {
                yield Ok(Event::default().event("cancelled").data("reply cancelled"));
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub mod schemas {
    use crate::core::render::render_html;
    use crate::core::session::{self, ConversationSession};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum Sender {
        Visitor,
        Assistant,
    }

    impl From<session::Sender> for Sender {
        fn from(sender: session::Sender) -> Self {
            match sender {
                session::Sender::Visitor => Sender::Visitor,
                session::Sender::Assistant => Sender::Assistant,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct Message {
        pub id: u64,
        pub sender: Sender,
        pub text: String,
        /// `text` rendered as markdown with raw HTML removed.
        pub html: String,
        pub timestamp: DateTime<Utc>,
    }

    impl From<session::Message> for Message {
        fn from(message: session::Message) -> Self {
            Message {
                id: message.id,
                sender: message.sender.into(),
                html: render_html(&message.text),
                text: message.text,
                timestamp: message.timestamp,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct Session {
        pub id: Uuid,
        pub created_at: DateTime<Utc>,
        pub composing: bool,
        pub draft: String,
        pub messages: Vec<Message>,
    }

    impl From<&ConversationSession> for Session {
        fn from(session: &ConversationSession) -> Self {
            let state = session.snapshot();
            Session {
                id: session.id(),
                created_at: session.created_at(),
                composing: state.composing,
                draft: state.draft,
                messages: state.messages.into_iter().map(Message::from).collect(),
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct SessionSummary {
        pub id: Uuid,
        pub created_at: DateTime<Utc>,
        pub composing: bool,
        pub message_count: usize,
    }

    impl From<&ConversationSession> for SessionSummary {
        fn from(session: &ConversationSession) -> Self {
            let state = session.snapshot();
            SessionSummary {
                id: session.id(),
                created_at: session.created_at(),
                composing: state.composing,
                message_count: state.messages.len(),
            }
        }
    }

    #[derive(Serialize, Debug, Default)]
    pub struct SessionList {
        pub sessions: Vec<SessionSummary>,
    }

    #[derive(Deserialize, Debug)]
    pub struct CreateMessage {
        pub text: String,
    }

    #[derive(Deserialize, Debug)]
    pub struct UpdateDraft {
        pub text: String,
    }
}
