//! Capability probes: run a subsystem check under a timeout and report the
//! outcome as data. A probe never propagates the checked error and never
//! hangs the caller; a check that outlives its budget is reported as
//! `error: timed out`.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Ok,
    Error,
}

/// Outcome of probing one subsystem. A fresh value is produced per probe
/// invocation; nothing caches these across health queries.
#[derive(Debug, Clone, Serialize)]
pub struct SubsystemResult {
    pub name: String,
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SubsystemResult {
    pub fn ok(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: ProbeStatus::Ok,
            detail: None,
        }
    }

    pub fn error(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: ProbeStatus::Error,
            detail: Some(detail.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ProbeStatus::Ok
    }

    /// The `"ok"` / `"error: <detail>"` string used in the detailed health
    /// payload.
    pub fn summary(&self) -> String {
        match (&self.status, &self.detail) {
            (ProbeStatus::Ok, _) => "ok".to_string(),
            (ProbeStatus::Error, Some(detail)) => format!("error: {detail}"),
            (ProbeStatus::Error, None) => "error".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
}

/// Aggregate of all subsystem probes, recomputed on every health query.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub overall: OverallStatus,
    pub components: Vec<SubsystemResult>,
}

impl HealthReport {
    /// Healthy iff every component probe came back ok.
    pub fn from_components(components: Vec<SubsystemResult>) -> Self {
        let overall = if components.iter().all(SubsystemResult::is_ok) {
            OverallStatus::Healthy
        } else {
            OverallStatus::Degraded
        };
        Self {
            overall,
            components,
        }
    }

    /// Detailed-health wire shape:
    /// `{"status": "healthy"|"degraded", "<name>": "ok"|"error: <detail>", ...}`.
    pub fn to_flat_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        let status = match self.overall {
            OverallStatus::Healthy => "healthy",
            OverallStatus::Degraded => "degraded",
        };
        map.insert("status".to_string(), serde_json::Value::String(status.to_string()));
        for component in &self.components {
            map.insert(
                component.name.clone(),
                serde_json::Value::String(component.summary()),
            );
        }
        serde_json::Value::Object(map)
    }
}

/// Runs `check` for at most `budget`, converting both errors and timeouts
/// into a `SubsystemResult`.
pub async fn probe<F>(name: &str, budget: Duration, check: F) -> SubsystemResult
where
    F: Future<Output = anyhow::Result<()>>,
{
    match tokio::time::timeout(budget, check).await {
        Ok(Ok(())) => {
            debug!("probe '{name}' ok");
            SubsystemResult::ok(name)
        }
        Ok(Err(e)) => {
            warn!("probe '{name}' failed: {e:#}");
            SubsystemResult::error(name, format!("{e:#}"))
        }
        Err(_) => {
            warn!("probe '{name}' timed out after {}s", budget.as_secs());
            SubsystemResult::error(name, "timed out")
        }
    }
}
