mod agents;
mod config;
mod db;
mod deferred;
mod errors;
mod llm;
mod models;
mod preflight;
mod probe;
mod routes;
mod state;

use std::net::SocketAddr;
use std::process::ExitCode;

use anyhow::Result;
use axum::http::HeaderValue;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_directive(&config.rust_log))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Career Navigator API v{}",
        env!("CARGO_PKG_VERSION")
    );

    if std::env::args().nth(1).as_deref() == Some("preflight") {
        return preflight::run(config).await;
    }

    // Composition only: no factory runs, no I/O. Agents and the database
    // are constructed on first use through their deferred loaders.
    let state = AppState::from_config(config.clone())?;

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&config));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    // The listener binds before any deferred subsystem can be forced; a
    // broken agent or database never keeps the port closed.
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(ExitCode::SUCCESS)
}

/// Default `EnvFilter` directive scoped to this crate. Tracing targets use
/// the crate name (`navigator_api`), not the hyphenated package name, so
/// the hyphen must be normalized or the directive matches nothing.
fn default_log_directive(level: &str) -> String {
    format!("{}={level}", env!("CARGO_PKG_NAME").replace('-', "_"))
}

fn build_cors(config: &Config) -> CorsLayer {
    match &config.frontend_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_subscriber::layer::{Context, Layer};

    struct CountingLayer(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for CountingLayer {
        fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    // The chain and loaders log under `navigator_api::*` targets; the
    // default directive must let those through when RUST_LOG is unset.
    #[test]
    fn default_log_directive_matches_crate_targets() {
        assert_eq!(default_log_directive("info"), "navigator_api=info");

        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new(default_log_directive("info")))
            .with(CountingLayer(Arc::clone(&count)));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(
                target: "navigator_api::llm",
                "skipping openrouter: OPENROUTER_API_KEY is not configured"
            );
            tracing::warn!(target: "unrelated_crate", "must be filtered out");
        });

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
