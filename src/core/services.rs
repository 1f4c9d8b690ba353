//! Implementations for the service the app needs.
//!

use crate::core::config::AssistantConfig;
use crate::core::error::AssistantError;
use crate::core::knowledge::KnowledgeBase;
use crate::core::session::ConversationSession;
use crate::core::traits::{AssistantService, Classification};
use crate::infrastructure::entities::SessionRecord;
use crate::infrastructure::traits::SessionRepository;
use async_trait::async_trait;
use di::{Ref, injectable};
use log::info;
use std::sync::Arc;
use uuid::Uuid;

#[injectable(AssistantService)]
pub struct PortfolioAssistantService {
    repo: Ref<dyn SessionRepository>,
    knowledge: Ref<KnowledgeBase>,
    config: Ref<AssistantConfig>,
}

#[async_trait]
impl AssistantService for PortfolioAssistantService {
    async fn open_session(&self, visitor_id: Uuid) -> Arc<ConversationSession> {
        let record = SessionRecord::new(
            visitor_id,
            ConversationSession::new(self.knowledge.clone(), self.config.reply_delay),
        );
        let session = record.session.clone();
        let evicted = self.repo.insert_session(record).await;

        for record in evicted {
            info!("visitor {} at session limit, closing {}", visitor_id, record.id());
            record.session.close();
        }

        info!("opened session {} for visitor {}", session.id(), visitor_id);
        session
    }

    async fn list_sessions(&self, visitor_id: Uuid) -> Vec<Arc<ConversationSession>> {
        self.repo
            .list_sessions(visitor_id)
            .await
            .into_iter()
            .map(|record| record.session)
            .collect()
    }

    async fn find_session(
        &self,
        visitor_id: Uuid,
        session_id: Uuid,
    ) -> Result<Arc<ConversationSession>, AssistantError> {
        self.repo
            .find_session(visitor_id, session_id)
            .await
            .map(|record| record.session)
            .ok_or(AssistantError::SessionNotFound(session_id))
    }

    async fn close_session(
        &self,
        visitor_id: Uuid,
        session_id: Uuid,
    ) -> Result<(), AssistantError> {
        let record = self
            .repo
            .remove_session(visitor_id, session_id)
            .await
            .ok_or(AssistantError::SessionNotFound(session_id))?;

        // Other handles may still hold the session, so tear it down explicitly.
        record.session.close();
        Ok(())
    }

    fn classify(&self, text: &str) -> Classification {
        Classification {
            topic: self
                .knowledge
                .match_topic(text)
                .map(|entry| entry.name().to_owned()),
            answer: self.knowledge.classify(text).to_owned(),
        }
    }

    fn topics(&self) -> Vec<String> {
        self.knowledge.topics().map(str::to_owned).collect()
    }
}
