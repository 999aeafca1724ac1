use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::db;
use crate::probe::{probe, HealthReport, SubsystemResult};
use crate::state::AppState;

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Career Navigator AI backend active"
    }))
}

/// GET /health
///
/// Liveness only: proves the process is up and the listener is bound.
/// Deliberately takes no state and touches no subsystem, so restart probes
/// never confuse a degraded dependency with a dead process.
pub async fn liveness_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "API is running"
    }))
}

/// GET /health/detailed
pub async fn detailed_health_handler(State(state): State<AppState>) -> Json<Value> {
    let report = HealthReport::from_components(collect_components(&state).await);
    Json(report.to_flat_json())
}

/// Probes every registered subsystem. Shared by the detailed-health
/// endpoint and the pre-flight verification run; failures are returned as
/// data, never raised.
pub async fn collect_components(state: &AppState) -> Vec<SubsystemResult> {
    let budget = state.config.probe_timeout;

    let database = probe("database", budget, async {
        let pool = state.db.get().await?;
        db::ping(&pool).await
    })
    .await;

    let career = probe("career_agent", budget, async {
        state.career.get().await?;
        Ok(())
    })
    .await;

    let learning = probe("learning_agent", budget, async {
        state.learning.get().await?;
        Ok(())
    })
    .await;

    vec![database, career, learning]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RetryPolicy};
    use std::time::Duration;

    fn test_config(data_root: &str) -> Config {
        Config {
            data_root: data_root.to_string(),
            openrouter_api_key: None,
            hf_api_key: None,
            llm_timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            agent_retry_policy: RetryPolicy::RetryEveryCall,
            frontend_origins: None,
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    fn temp_data_root(tag: &str) -> String {
        std::env::temp_dir()
            .join(format!("navigator-api-{tag}-{}", std::process::id()))
            .to_string_lossy()
            .into_owned()
    }

    // Liveness must not depend on any subsystem: the handler takes no state
    // at all, so it cannot fail even with every loader in FAILED state.
    #[tokio::test]
    async fn liveness_is_unconditional() {
        let Json(body) = liveness_handler().await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn report_is_healthy_when_every_subsystem_constructs() {
        let state = AppState::from_config(test_config(&temp_data_root("healthy"))).unwrap();
        let report = HealthReport::from_components(collect_components(&state).await);
        let flat = report.to_flat_json();
        assert_eq!(flat["status"], "healthy");
        assert_eq!(flat["database"], "ok");
        assert_eq!(flat["career_agent"], "ok");
        assert_eq!(flat["learning_agent"], "ok");
    }

    #[tokio::test]
    async fn broken_database_degrades_every_dependent_subsystem() {
        // A data root under a regular file: create_dir_all cannot succeed.
        let file = std::env::temp_dir().join(format!("navigator-api-f-{}", std::process::id()));
        std::fs::write(&file, b"x").unwrap();
        let data_root = file.join("data").to_string_lossy().into_owned();

        let state = AppState::from_config(test_config(&data_root)).unwrap();
        let components = collect_components(&state).await;

        let report = HealthReport::from_components(components);
        assert!(report.components.iter().all(|c| !c.is_ok()));
        assert_eq!(report.to_flat_json()["status"], "degraded");

        // The process itself is still "alive".
        let Json(body) = liveness_handler().await;
        assert_eq!(body["status"], "healthy");
    }
}
