//! # clerkflow: Clerk operations and webhook triggers for workflow automation
//!
//! `clerkflow` connects a workflow automation host to [Clerk](https://clerk.com), the identity
//! platform. It has two halves:
//!
//! - **Triggers**: Clerk delivers webhooks through SVIX. Each configured trigger exposes
//!   `POST /webhooks/{trigger}`, verifies the `svix-*` headers and HMAC-SHA256 signature, checks the
//!   event type against the trigger's selection and hands admitted events to a
//!   [`WorkflowDispatcher`](webhooks::WorkflowDispatcher).
//! - **Operations**: `POST /operations/{resource}/{operation}` runs one of the Clerk Backend API
//!   operations (users, organizations, sessions, invitations...) over a batch of items.
//!
//! ## Architecture
//!
//! ```text
//!   Clerk (SVIX) ──► /webhooks/{trigger} ──► admission::evaluate ──► WorkflowDispatcher ──► workflow
//!
//!   workflow ──► /operations/{resource}/{operation} ──► OperationExecutor ──► Clerk Backend API
//! ```
//!
//! Admission is synchronous and stateless, so the receiver scales with the HTTP server. Forwarding
//! to the workflow happens inside the request: Clerk only hears "processed" once the workflow has
//! accepted the event, and any failure becomes a 503 that Clerk redelivers.
//!
//! ## Modules
//!
//! - [`webhooks`]: signing, admission, event envelopes and dispatchers
//! - [`clerk`]: operation table, request shaping and the API client
//! - [`config`]: YAML + environment configuration
//! - [`telemetry`]: tracing and OTLP export
//!
//! ## Embedding
//!
//! Hosts that run their own HTTP server can use [`webhooks::evaluate`] directly, or build the
//! router with a [`ChannelDispatcher`](webhooks::ChannelDispatcher) and receive envelopes from its
//! channel:
//!
//! ```ignore
//! let (dispatcher, mut events) = ChannelDispatcher::new(100);
//! let state = AppState::from_config(config, Arc::new(dispatcher))?;
//! let router = clerkflow::build_router(state);
//! ```

pub mod api;
pub mod clerk;
pub mod config;
pub mod errors;
pub mod telemetry;
pub mod types;
pub mod webhooks;

#[cfg(test)]
mod test_utils;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info, warn};

use crate::clerk::{ClerkClient, OperationExecutor, OperationTable};
use crate::webhooks::{HttpWorkflowDispatcher, LogDispatcher, VerificationConfig, WorkflowDispatcher};

// rustls needs a process-wide crypto provider before any reqwest client is built.
#[cfg(test)]
#[ctor::ctor]
unsafe fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Application state shared across all request handlers.
///
/// - `config`: the loaded configuration
/// - `triggers`: verification settings per trigger name, resolved once at startup
/// - `dispatcher`: receives every admitted webhook envelope
/// - `operations`: Clerk operation executor, absent when no secret key is configured
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub triggers: Arc<HashMap<String, VerificationConfig>>,
    pub dispatcher: Arc<dyn WorkflowDispatcher>,
    pub operations: Option<OperationExecutor>,
}

impl AppState {
    /// Resolve trigger settings and the operation executor from configuration.
    pub fn from_config(config: Config, dispatcher: Arc<dyn WorkflowDispatcher>) -> anyhow::Result<Self> {
        let triggers = config
            .triggers
            .iter()
            .map(|(name, trigger)| (name.clone(), trigger.verification_config()))
            .collect::<HashMap<_, _>>();

        let operations = if config.clerk.secret_key.is_empty() {
            None
        } else {
            let client = ClerkClient::new(&config.clerk)?;
            Some(OperationExecutor::new(client, Arc::new(OperationTable::new())))
        };

        Ok(Self::builder()
            .config(config)
            .triggers(Arc::new(triggers))
            .dispatcher(dispatcher)
            .maybe_operations(operations)
            .build())
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let enable_metrics = state.config.enable_metrics;

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/webhooks/{trigger}", post(api::handlers::trigger::receive_webhook))
        .route(
            "/operations/{resource}/{operation}",
            post(api::handlers::operations::run_operation),
        )
        .with_state(state);

    if enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// The HTTP server and its workflow dispatcher.
///
/// 1. **Create**: [`Application::new`] resolves triggers, builds the dispatcher and logs the
///    startup notice
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: when the shutdown future resolves, in-flight requests (and their deliveries)
///    finish, then the dispatcher refuses anything further
pub struct Application {
    router: Router,
    config: Config,
    shutdown_token: CancellationToken,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting clerkflow with configuration: {:#?}", config);

        let shutdown_token = CancellationToken::new();

        let dispatcher: Arc<dyn WorkflowDispatcher> = match &config.dispatch.workflow_url {
            Some(url) => Arc::new(HttpWorkflowDispatcher::new(
                url.clone(),
                &config.dispatch,
                shutdown_token.clone(),
            )?),
            None => {
                warn!("No dispatch.workflow_url configured, admitted webhook events will only be logged");
                Arc::new(LogDispatcher)
            }
        };

        let app_state = AppState::from_config(config.clone(), dispatcher)?;
        log_startup_notice(&app_state);

        let router = build_router(app_state);

        Ok(Self {
            router,
            config,
            shutdown_token,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, tokio_util::sync::DropGuard) {
        let server = axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server");
        (server, self.shutdown_token.drop_guard())
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "clerkflow listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Stopping workflow dispatcher...");
        self.shutdown_token.cancel();

        telemetry::shutdown_telemetry();

        Ok(())
    }
}

/// Emitted once per process, when the application is constructed.
fn log_startup_notice(state: &AppState) {
    let operation_count = state.operations.as_ref().map_or(0, |ops| ops.table().len());
    let mut trigger_names = state.triggers.keys().map(String::as_str).collect::<Vec<_>>();
    trigger_names.sort_unstable();

    info!(
        operations = operation_count,
        triggers = ?trigger_names,
        "clerkflow ready: {} Clerk operations, {} webhook triggers",
        operation_count,
        trigger_names.len()
    );

    if state.operations.is_none() {
        warn!("No clerk.secret_key configured, /operations routes are disabled");
    }

    for name in &trigger_names {
        if state.triggers[*name].skip_verification {
            warn!(trigger = %name, "Signature verification is disabled for this trigger; do not use in production");
        }
    }
}
