use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::agents::memory::ThreadMemory;
use crate::agents::tools;
use crate::db;
use crate::llm::ProviderChain;
use crate::models::{ChatRequest, ChatResponse};

/// How the agent answers, decided once at construction time: the real
/// provider chain when at least one provider is configured, otherwise the
/// canned learning-path responder.
enum Responder {
    Chain(Arc<ProviderChain>),
    Canned,
}

/// Learning mentor agent with a per-thread rolling context window.
pub struct LearningAgent {
    responder: Responder,
    memory: ThreadMemory,
    db: SqlitePool,
}

impl LearningAgent {
    pub async fn new(chain: Arc<ProviderChain>, db: SqlitePool) -> Result<Self> {
        db::ping(&db)
            .await
            .context("learning agent could not reach the database")?;

        let responder = if chain.configured_providers().is_empty() {
            warn!("[learning] no LLM providers configured, using canned learning paths");
            Responder::Canned
        } else {
            Responder::Chain(chain)
        };

        Ok(Self {
            responder,
            memory: ThreadMemory::new(),
            db,
        })
    }

    pub async fn handle(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let topic = req.message.trim();
        let context = self
            .memory
            .recent_context(&req.thread_id)
            .unwrap_or_else(|| "No previous context".to_string());

        let (reply, degraded) = match &self.responder {
            Responder::Canned => (tools::learning_path(topic), true),
            Responder::Chain(chain) => {
                let prompt = format!(
                    "You are a helpful learning mentor.\n\
                     Previous:\n{context}\n\
                     Question: \"{topic}\"\n\
                     Answer briefly (under 300 words) with clear explanations \
                     and actionable steps."
                );
                let reply = chain.invoke(&prompt).await;
                (reply.text().to_string(), reply.is_degraded())
            }
        };

        self.memory.append(
            &req.thread_id,
            format!("User: {topic}\nAssistant: {reply}"),
        );

        if let Err(e) = db::save_learning_chat(&self.db, &req.thread_id, topic, &reply).await {
            warn!("[learning] failed to persist chat history: {e}");
        }

        info!("[learning] answered thread '{}'", req.thread_id);
        Ok(ChatResponse {
            reply,
            intent: Some("learning".to_string()),
            degraded,
        })
    }
}
