//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use somnolence::{
    AppConfig, HandlerInput, HttpServer, RequestContext, RouteDefinition, RouteNode, Shutdown,
};

pub const TOKEN: &str = "s3cret";

/// A server running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    /// Trigger graceful shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        self.handle
            .await
            .expect("server task panicked")
            .expect("server failed");
    }
}

pub async fn spawn_server(config: AppConfig, tree: RouteNode) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config, tree).expect("route tree should compile");
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(server.run(listener, server_shutdown));

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// hello (GET, query), hello/:name (GET), echo (POST, body), private (GET, bearer).
pub fn demo_tree() -> RouteNode {
    let hello = RouteDefinition::builder()
        .query(json!({"type": "object", "properties": {"name": {"type": "string"}}}))
        .response(json!({"type": "string"}))
        .handler_fn(|input: HandlerInput| {
            format!("Hello, {}!", input.query["name"].as_str().unwrap_or("World"))
        })
        .build()
        .unwrap();
    let named = RouteDefinition::builder()
        .response(json!({"type": "string"}))
        .handler_fn(|input: HandlerInput| format!("Hello, {}!", input.params["name"]))
        .build()
        .unwrap();
    let echo = RouteDefinition::builder()
        .body(json!({
            "type": "object",
            "properties": {"message": {"type": "string"}},
            "required": ["message"]
        }))
        .response(json!({"type": "object"}))
        .handler_fn(|input: HandlerInput| input.body)
        .build()
        .unwrap();
    let private = RouteDefinition::builder()
        .response(json!({"type": "string"}))
        .authorizer(|ctx: Arc<RequestContext>| {
            let allowed = ctx.bearer_token() == Some(TOKEN);
            async move { allowed }
        })
        .handler_fn(|_| "You are in.")
        .build()
        .unwrap();

    RouteNode::segments()
        .route(
            "hello",
            RouteNode::segments()
                .get(hello)
                .route(":name", RouteNode::methods().get(named)),
        )
        .route("echo", RouteNode::methods().post(echo))
        .route("private", RouteNode::methods().get(private))
}
