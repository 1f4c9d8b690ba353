use crate::core::error::AssistantError;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use std::str::FromStr;
use uuid::Uuid;

pub mod assistant;
pub mod pages;
pub mod sessions;

const X_VISITOR_ID: &str = "X-Visitor-ID";

const MISSING_VISITOR: &str = "`X-Visitor-ID` header is missing";
const INVALID_VISITOR: &str = "`X-Visitor-ID` is not a valid visitor id";

/// Anonymous visitor identity, generated and kept by the chat page.
///
/// Any textual UUID form is accepted (hyphenated, simple, braced, any case) and maps to the same
/// visitor. The nil UUID is refused so clients cannot end up sharing one identity.
#[derive(Debug)]
pub struct ExtractVisitor(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractVisitor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, (StatusCode, &'static str)> {
        let header = parts
            .headers
            .get(X_VISITOR_ID)
            .ok_or((StatusCode::BAD_REQUEST, MISSING_VISITOR))?;

        header
            .to_str()
            .ok()
            .and_then(|value| Uuid::from_str(value.trim()).ok())
            .filter(|visitor_id| !visitor_id.is_nil())
            .map(ExtractVisitor)
            .ok_or((StatusCode::BAD_REQUEST, INVALID_VISITOR))
    }
}

impl IntoResponse for AssistantError {
    fn into_response(self) -> Response {
        let status = match self {
            AssistantError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AssistantError::EmptyMessage => StatusCode::BAD_REQUEST,
            AssistantError::ReplyPending => StatusCode::CONFLICT,
        };
        (status, self.to_string()).into_response()
    }
}
