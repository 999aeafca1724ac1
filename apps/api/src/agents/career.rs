use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::agents::tools;
use crate::db;
use crate::llm::ProviderChain;
use crate::models::{ChatRequest, ChatResponse};

/// Resume analysis and job-matching agent. Constructed lazily through a
/// `Deferred` loader: construction verifies the database is reachable, so a
/// broken data volume shows up as a degraded subsystem instead of a crash.
pub struct CareerAgent {
    chain: Arc<ProviderChain>,
    db: SqlitePool,
}

impl CareerAgent {
    pub async fn new(chain: Arc<ProviderChain>, db: SqlitePool) -> Result<Self> {
        db::ping(&db)
            .await
            .context("career agent could not reach the database")?;
        Ok(Self { chain, db })
    }

    pub async fn handle(&self, req: &ChatRequest) -> Result<ChatResponse> {
        // The handler rejects empty resume text before we get here.
        let resume_text = req.resume_text.as_deref().unwrap_or("").trim();

        let analysis = tools::analyze_resume(resume_text);
        let ranked = tools::match_jobs(&analysis.skills, &req.job_posts);
        let top_jobs: Vec<String> = ranked
            .iter()
            .take(3)
            .filter(|r| r.match_score > 0)
            .map(|r| match &r.post.company {
                Some(company) => format!("{} at {}", r.post.title, company),
                None => r.post.title.clone(),
            })
            .collect();

        let prompt = format!(
            "You are a career coach.\n\
             User: {}\n\
             Resume: {}\n\
             Detected skills: {:?}\n\
             Suggestions: {:?}\n\
             Top matching jobs: {:?}\n\
             Write a short actionable reply.",
            req.message, resume_text, analysis.skills, analysis.suggestions, top_jobs
        );

        let reply = self.chain.invoke(&prompt).await;
        if let Some(provider) = reply.provider() {
            debug!("[career] reply from {provider}");
        }

        // History is best-effort; a write failure must not fail the request.
        if let Err(e) =
            db::save_career_chat(&self.db, &req.thread_id, &req.message, reply.text()).await
        {
            warn!("[career] failed to persist chat history: {e}");
        }

        Ok(ChatResponse {
            reply: reply.text().to_string(),
            intent: Some("analyze".to_string()),
            degraded: reply.is_degraded(),
        })
    }
}
