//! Interactive policy assistant: one session over the shared retriever and generator.

use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::errors::RagError;
use crate::rag::{AnswerGenerator, GroundedAnswer, Retriever, SearchHit};
use crate::session::{ConversationSession, ConversationTurn, Role};

pub struct PolicyAssistant {
    generator: Arc<AnswerGenerator>,
    session: RwLock<ConversationSession>,
}

impl PolicyAssistant {
    pub fn new(generator: Arc<AnswerGenerator>, max_turns: usize) -> Self {
        Self {
            generator,
            session: RwLock::new(ConversationSession::new(max_turns)),
        }
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        self.generator.retriever()
    }

    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, RagError> {
        self.retriever().retrieve(query, k).await
    }

    /// Stateless answer; the session is left untouched.
    pub async fn generate(&self, query: &str) -> Result<GroundedAnswer, RagError> {
        self.generator.answer(query).await
    }

    /// Answers `query` and records the exchange. Failed exchanges are not recorded.
    pub async fn ask(&self, query: &str) -> Result<GroundedAnswer, RagError> {
        let grounded = self.generator.answer(query).await?;

        let mut session = self.session.write().await;
        session.append_turn(Role::User, query);
        session.append_turn(Role::Assistant, grounded.answer.clone());
        tracing::debug!(session_id = %session.id(), turns = session.len(), "Recorded exchange");

        Ok(grounded)
    }

    pub async fn session_id(&self) -> Uuid {
        self.session.read().await.id()
    }

    pub async fn transcript(&self) -> Vec<ConversationTurn> {
        self.session.read().await.transcript()
    }

    pub async fn render_transcript(&self) -> String {
        self.session.read().await.render_transcript()
    }

    pub async fn evicted_turns(&self) -> usize {
        self.session.read().await.evicted()
    }
}
