//! Request pipeline orchestration.
//!
//! # Stages
//! ```text
//! 1. introspection   canonical path == schema path → 200 schema
//! 2. resolution      no route → 404 (sibling finish hook on method mismatch)
//! 3. context         parse query + body, run start hook
//! 4. authorization   false → 401
//! 5. validation      query, then body → 400
//! 6. handler
//! 7. finish hook
//! 8. shaping         JSON for structured values, raw text for scalars
//! ```
//!
//! # Design Decisions
//! - Expected failures (404/401/400) become responses at the stage that
//!   detects them and still reach the finish hook
//! - Everything else, panics included, is caught once in `handle` and
//!   becomes a 500 carrying the failure message
//! - The pipeline never sees the transport, only `TransportRequest`
//! - Input schemas are compiled once at construction, never per request

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::Value;

use crate::config::{AppConfig, ResponseEnvelope};
use crate::pipeline::context::{RequestContext, RequestHead};
use crate::pipeline::outcome::{
    shape_response, FinishOutcome, InputField, PipelineError, PipelineResponse,
};
use crate::pipeline::query::parse_query;
use crate::pipeline::transport::TransportRequest;
use crate::routing::{path, Method, RouteDefinition, RouteError, RouteNode, Router};
use crate::schema::{
    aggregate, CompiledSchema, JsonSchemaEngine, Schema, SchemaEngine, SchemaError,
};

/// Construction options for a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Path serving the aggregated schemas. Compared after normalization.
    pub schema_path: String,
    pub envelope: ResponseEnvelope,
    pub engine: Arc<dyn SchemaEngine>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            schema_path: "/__schema".to_string(),
            envelope: ResponseEnvelope::Bare,
            engine: Arc::new(JsonSchemaEngine::new()),
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            schema_path: config.routing.schema_path.clone(),
            envelope: config.response.envelope,
            ..Self::default()
        }
    }
}

/// The request pipeline. Cheap to clone; all state is shared and immutable.
#[derive(Debug, Clone)]
pub struct Pipeline {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    router: Router,
    schema: Schema,
    /// Compiled input schemas per route key.
    validators: HashMap<String, InputValidators>,
    schema_path: String,
    envelope: ResponseEnvelope,
}

#[derive(Debug)]
struct InputValidators {
    query: Option<Arc<dyn CompiledSchema>>,
    body: Option<Arc<dyn CompiledSchema>>,
}

impl Pipeline {
    /// Compile a route tree into a pipeline. Malformed trees are rejected here.
    pub fn new(tree: RouteNode, options: PipelineOptions) -> Result<Self, RouteError> {
        Self::from_router(Router::new(tree)?, options)
    }

    /// Build a pipeline over a compiled router. Every declared query and
    /// body schema is compiled here; one the engine rejects fails the build.
    pub fn from_router(router: Router, options: PipelineOptions) -> Result<Self, RouteError> {
        let engine = options.engine.as_ref();
        let mut validators = HashMap::with_capacity(router.routes().len());
        for route in router.routes() {
            let definition = route.definition();
            let key = route.key();
            let compiled = InputValidators {
                query: compile_input(engine, key, InputField::Query, definition.query_schema())?,
                body: compile_input(engine, key, InputField::Body, definition.body_schema())?,
            };
            validators.insert(key.to_string(), compiled);
        }

        let schema = aggregate(router.routes());
        tracing::info!(
            routes = router.routes().len(),
            schema_path = %options.schema_path,
            "Pipeline ready"
        );
        Ok(Self {
            inner: Arc::new(Inner {
                router,
                schema,
                validators,
                schema_path: path::normalize(&options.schema_path),
                envelope: options.envelope,
            }),
        })
    }

    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    /// Aggregated schemas, as served at the introspection path.
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Run one request through every stage. Never fails: every outcome,
    /// including a panic in user code, is shaped into a response.
    pub async fn handle<R: TransportRequest>(&self, request: R) -> PipelineResponse {
        let method = request.method().to_string();
        let path = path::normalize(request.path());

        let result = match AssertUnwindSafe(self.run(request)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(PipelineError::Internal(panic_message(&*panic))),
        };

        match result {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(
                    method = %method,
                    path = %path,
                    error = %err,
                    "Request failed"
                );
                PipelineResponse::from_error(&err)
            }
        }
    }

    async fn run<R: TransportRequest>(&self, mut request: R) -> Result<PipelineResponse, PipelineError> {
        let path = path::normalize(request.path());

        // 1. Introspection
        if path == self.inner.schema_path {
            let schema = serde_json::to_value(&self.inner.schema).map_err(PipelineError::internal)?;
            return shape_response(schema, self.inner.envelope);
        }

        // 2. Resolution
        let method = request.method().to_string();
        let resolved = method
            .parse::<Method>()
            .ok()
            .and_then(|m| self.inner.router.find(&path, m.as_str()))
            .map(|m| (m.key.to_string(), Arc::clone(m.route.definition()), m.params));

        let Some((route, definition, params)) = resolved else {
            let head = request_head(&request);
            let query = parse_query(request.query());
            return Ok(self.not_found(head, query, &path, &method).await);
        };

        tracing::debug!(
            method = %method,
            path = %path,
            route = %route,
            "Dispatching request"
        );

        // 3. Context
        let query = parse_query(request.query());
        let raw_body = request.read_body().await.map_err(PipelineError::internal)?;
        let (body, malformed_body) = parse_body(&raw_body);

        let ctx = Arc::new(RequestContext {
            request: request_head(&request),
            route: route.clone(),
            params,
            query,
            body,
        });

        if let Some(on_start) = definition.on_start() {
            on_start(Arc::clone(&ctx)).await;
        }

        // 4. Authorization
        if let Some(authorizer) = definition.authorizer() {
            let allowed = authorizer(Arc::clone(&ctx))
                .await
                .map_err(PipelineError::internal)?;
            if !allowed {
                return Ok(self.reject(&definition, &ctx, PipelineError::Unauthorized).await);
            }
        }

        // 5. Validation
        match self.validate(&ctx, malformed_body) {
            Ok(()) => {}
            Err(err @ PipelineError::ValidationFailed { .. }) => {
                return Ok(self.reject(&definition, &ctx, err).await);
            }
            Err(err) => return Err(err),
        }

        // 6. Handler
        let output = (definition.handler())(ctx.handler_input())
            .await
            .map_err(PipelineError::internal)?;

        // 7. Finish hook
        if let Some(on_finish) = definition.on_finish() {
            on_finish(Arc::clone(&ctx), FinishOutcome::Response(output.clone())).await;
        }

        // 8. Shaping
        Ok(shape_response(output, self.inner.envelope)?.with_route(&route))
    }

    fn validate(&self, ctx: &RequestContext, malformed_body: Option<String>) -> Result<(), PipelineError> {
        let Some(validators) = self.inner.validators.get(&ctx.route) else {
            return Err(PipelineError::Internal(format!(
                "no compiled schemas for route: {}",
                ctx.route
            )));
        };

        if let Some(schema) = &validators.query {
            check(InputField::Query, schema.as_ref(), &ctx.query)?;
        }
        if let Some(message) = malformed_body {
            return Err(PipelineError::ValidationFailed {
                field: InputField::Body,
                message,
            });
        }
        if let Some(schema) = &validators.body {
            check(InputField::Body, schema.as_ref(), &ctx.body)?;
        }
        Ok(())
    }

    /// Report an expected failure to the finish hook and shape it.
    async fn reject(
        &self,
        definition: &RouteDefinition,
        ctx: &Arc<RequestContext>,
        err: PipelineError,
    ) -> PipelineResponse {
        tracing::warn!(
            method = %ctx.request.method,
            path = %path::normalize(&ctx.request.path),
            route = %ctx.route,
            status = err.status().as_u16(),
            reason = %err,
            "Request rejected"
        );
        if let Some(on_finish) = definition.on_finish() {
            on_finish(Arc::clone(ctx), FinishOutcome::rejected(&err)).await;
        }
        PipelineResponse::from_error(&err).with_route(&ctx.route)
    }

    async fn not_found(
        &self,
        head: RequestHead,
        query: Value,
        path: &str,
        method: &str,
    ) -> PipelineResponse {
        let err = PipelineError::RouteNotFound {
            path: path.to_string(),
        };

        // The path exists under other methods: let the first sibling with a
        // finish hook observe the miss.
        let sibling = self
            .inner
            .router
            .siblings(path)
            .into_iter()
            .find(|route| route.definition().on_finish().is_some());

        match sibling {
            Some(sibling) => {
                tracing::warn!(
                    method = %method,
                    path = %path,
                    route = %sibling.key(),
                    "Method not allowed"
                );
                let params = self
                    .inner
                    .router
                    .find(path, sibling.method().as_str())
                    .map(|m| m.params)
                    .unwrap_or_default();
                let ctx = Arc::new(RequestContext {
                    request: head,
                    route: sibling.key().to_string(),
                    params,
                    query,
                    body: Value::Null,
                });
                let outcome = FinishOutcome::Rejected {
                    status: err.status(),
                    message: format!("Method {} not allowed for route: {}", method, path),
                };
                if let Some(on_finish) = sibling.definition().on_finish() {
                    on_finish(ctx, outcome).await;
                }
            }
            None => {
                tracing::warn!(method = %method, path = %path, "Route not found");
            }
        }

        PipelineResponse::from_error(&err)
    }
}

fn compile_input(
    engine: &dyn SchemaEngine,
    route: &str,
    field: InputField,
    schema: Option<&Value>,
) -> Result<Option<Arc<dyn CompiledSchema>>, RouteError> {
    let Some(schema) = schema else {
        return Ok(None);
    };
    engine
        .compile(schema)
        .map(Some)
        .map_err(|err| RouteError::InvalidSchema {
            route: route.to_string(),
            field: field.to_string(),
            message: err.to_string(),
        })
}

fn check(field: InputField, schema: &dyn CompiledSchema, value: &Value) -> Result<(), PipelineError> {
    schema.validate(value).map_err(|err| match err {
        SchemaError::Mismatch(message) => PipelineError::ValidationFailed { field, message },
        engine @ SchemaError::Engine(_) => PipelineError::internal(engine),
    })
}

fn request_head<R: TransportRequest>(request: &R) -> RequestHead {
    RequestHead {
        method: request.method().to_string(),
        path: request.path().to_string(),
        query: request.query().map(str::to_string),
        headers: request.headers().clone(),
    }
}

/// Empty bodies are `Null`. A malformed body is also `Null`, with the parse
/// error kept for validation to report.
fn parse_body(raw: &[u8]) -> (Value, Option<String>) {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return (Value::Null, None);
    }
    match serde_json::from_slice(raw) {
        Ok(value) => (value, None),
        Err(err) => (Value::Null, Some(err.to_string())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
