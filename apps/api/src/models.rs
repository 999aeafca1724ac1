use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub fn default_thread() -> String {
    "default".to_string()
}

/// Request body shared by the career and learning endpoints.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_thread")]
    pub thread_id: String,
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub job_posts: Vec<JobPost>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobPost {
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    /// True when the reply came from the terminal fallback rather than a
    /// real provider. Clients may surface a "degraded service" notice.
    pub degraded: bool,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ChatHistoryRow {
    pub id: i64,
    pub message: String,
    pub reply: String,
    pub timestamp: NaiveDateTime,
}
