//! somnolence server.
//!
//! Serves a small demo route tree over HTTP.
//!
//! ```text
//! GET  /hello?name=World     → "Hello, World!"
//! GET  /hello/:name          → "Hello, {name}!"
//! POST /echo {"message": …}  → the body, as JSON
//! GET  /private              → requires `Authorization: Bearer <token>`
//! GET  /__schema             → every route's declared schemas
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use somnolence::config::{load_config, AppConfig};
use somnolence::observability::{init_logging, metrics};
use somnolence::routing::RouteError;
use somnolence::{
    FinishOutcome, HandlerInput, HttpServer, RequestContext, RouteDefinition, RouteNode, Shutdown,
};

#[derive(Parser)]
#[command(name = "somnolence")]
#[command(about = "RPC-style routing and validation server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bearer token accepted by the `/private` route.
    #[arg(long, default_value = "letmein")]
    token: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    init_logging(&config.observability)?;

    tracing::info!("somnolence v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        schema_path = %config.routing.schema_path,
        envelope = ?config.response.envelope,
        request_timeout_secs = config.limits.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::new(config.clone(), demo_routes(args.token)?)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_routes(token: String) -> Result<RouteNode, RouteError> {
    let hello = RouteDefinition::builder()
        .query(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}}
        }))
        .response(json!({"type": "string"}))
        .handler_fn(|input: HandlerInput| {
            format!("Hello, {}!", input.query["name"].as_str().unwrap_or("World"))
        })
        .build()?;

    let hello_named = RouteDefinition::builder()
        .response(json!({"type": "string"}))
        .handler_fn(|input: HandlerInput| {
            let name = input.params.get("name").map(String::as_str).unwrap_or("World");
            format!("Hello, {}!", name)
        })
        .build()?;

    let echo = RouteDefinition::builder()
        .body(json!({
            "type": "object",
            "properties": {"message": {"type": "string"}},
            "required": ["message"]
        }))
        .response(json!({
            "type": "object",
            "properties": {"message": {"type": "string"}}
        }))
        .handler_fn(|input: HandlerInput| input.body)
        .on_start(|ctx: Arc<RequestContext>| async move {
            tracing::debug!(route = %ctx.route, "Echo started");
        })
        .on_finish(|ctx: Arc<RequestContext>, outcome: FinishOutcome| async move {
            tracing::info!(
                route = %ctx.route,
                success = outcome.is_success(),
                outcome = %outcome.as_value(),
                "Echo finished"
            );
        })
        .build()?;

    let private = RouteDefinition::builder()
        .response(json!({"type": "string"}))
        .authorizer(move |ctx: Arc<RequestContext>| {
            let allowed = ctx.bearer_token() == Some(token.as_str());
            async move { allowed }
        })
        .handler_fn(|_| "You are in.")
        .build()?;

    Ok(RouteNode::segments()
        .route(
            "hello",
            RouteNode::segments()
                .get(hello)
                .route(":name", RouteNode::methods().get(hello_named)),
        )
        .route("echo", RouteNode::methods().post(echo))
        .route("private", RouteNode::methods().get(private)))
}
