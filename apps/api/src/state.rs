use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;

use crate::agents::{CareerAgent, LearningAgent};
use crate::config::Config;
use crate::db;
use crate::deferred::Deferred;
use crate::llm::ProviderChain;

/// Shared application state injected into all route handlers via Axum
/// extractors. Every fallible subsystem sits behind a `Deferred` loader
/// owned here; handlers and health probes reach them only through `get()`.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub chain: Arc<ProviderChain>,
    pub db: Arc<Deferred<SqlitePool>>,
    pub career: Arc<Deferred<CareerAgent>>,
    pub learning: Arc<Deferred<LearningAgent>>,
}

impl AppState {
    /// Pure composition: registers loaders without running any factory.
    /// Nothing here performs I/O, so the HTTP listener can bind before any
    /// subsystem is forced into existence.
    pub fn from_config(config: Config) -> Result<Self> {
        let chain = Arc::new(ProviderChain::from_config(&config)?);
        let policy = config.agent_retry_policy;

        let db = Arc::new(Deferred::new("database", policy, {
            let db_path = config.db_path();
            move || {
                let db_path = db_path.clone();
                async move { db::create_pool(&db_path).await }
            }
        }));

        let career = Arc::new(Deferred::new("career_agent", policy, {
            let chain = Arc::clone(&chain);
            let db = Arc::clone(&db);
            move || {
                let chain = Arc::clone(&chain);
                let db = Arc::clone(&db);
                async move {
                    let pool = db.get().await?;
                    CareerAgent::new(chain, (*pool).clone()).await
                }
            }
        }));

        let learning = Arc::new(Deferred::new("learning_agent", policy, {
            let chain = Arc::clone(&chain);
            let db = Arc::clone(&db);
            move || {
                let chain = Arc::clone(&chain);
                let db = Arc::clone(&db);
                async move {
                    let pool = db.get().await?;
                    LearningAgent::new(chain, (*pool).clone()).await
                }
            }
        }));

        Ok(Self {
            config,
            chain,
            db,
            career,
            learning,
        })
    }
}
