//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with a single catch-all handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Hand every request to the pipeline
//! - Record per-request metrics
//! - Serve until shutdown is triggered

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::request::{request_span, AxumRequest, MakeRequestUuid, X_REQUEST_ID};
use crate::observability::metrics;
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::routing::{RouteError, RouteNode};

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub max_body_bytes: usize,
}

/// HTTP front end for a route tree.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
    pipeline: Pipeline,
}

impl HttpServer {
    /// Compile `tree` and build the server. Malformed trees are rejected here.
    pub fn new(config: AppConfig, tree: RouteNode) -> Result<Self, RouteError> {
        let pipeline = Pipeline::new(tree, PipelineOptions::from_config(&config))?;
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Build the server around an already compiled pipeline.
    pub fn with_pipeline(config: AppConfig, pipeline: Pipeline) -> Self {
        let state = AppState {
            pipeline: pipeline.clone(),
            max_body_bytes: config.limits.max_body_bytes,
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config: Arc::new(config),
            pipeline,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(dispatch))
            .route("/{*path}", any(dispatch))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.limits.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.pipeline.router().routes().len(),
            schema_path = %self.config.routing.schema_path,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();

    let response = state
        .pipeline
        .handle(AxumRequest::new(request, state.max_body_bytes))
        .await;

    metrics::record_request(
        &method,
        response.status.as_u16(),
        response.route.as_deref().unwrap_or("none"),
        start_time,
    );

    response.into_response()
}
