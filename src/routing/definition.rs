//! Route definitions: schemas, handler and lifecycle hooks for one
//! (path, method) pair.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::Value;
use tower::BoxError;

use crate::pipeline::context::RequestContext;
use crate::pipeline::outcome::FinishOutcome;
use crate::routing::error::RouteError;

/// Path parameters extracted from a request path, always as strings.
pub type PathParams = HashMap<String, String>;

/// What a handler receives.
#[derive(Debug, Clone, Default)]
pub struct HandlerInput {
    pub params: PathParams,
    pub query: Value,
    pub body: Value,
}

pub type HandlerFn =
    Arc<dyn Fn(HandlerInput) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync>;
pub type AuthorizerFn =
    Arc<dyn Fn(Arc<RequestContext>) -> BoxFuture<'static, Result<bool, BoxError>> + Send + Sync>;
pub type StartHookFn = Arc<dyn Fn(Arc<RequestContext>) -> BoxFuture<'static, ()> + Send + Sync>;
pub type FinishHookFn =
    Arc<dyn Fn(Arc<RequestContext>, FinishOutcome) -> BoxFuture<'static, ()> + Send + Sync>;

/// A handler plus its schemas and optional hooks.
///
/// Response schema and handler are always present; use
/// [`RouteDefinition::builder`] to construct one.
#[derive(Clone)]
pub struct RouteDefinition {
    query: Option<Value>,
    body: Option<Value>,
    response: Value,
    handler: HandlerFn,
    authorizer: Option<AuthorizerFn>,
    on_start: Option<StartHookFn>,
    on_finish: Option<FinishHookFn>,
}

impl RouteDefinition {
    pub fn builder() -> RouteDefinitionBuilder {
        RouteDefinitionBuilder::default()
    }

    pub fn query_schema(&self) -> Option<&Value> {
        self.query.as_ref()
    }

    pub fn body_schema(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn response_schema(&self) -> &Value {
        &self.response
    }

    pub fn handler(&self) -> &HandlerFn {
        &self.handler
    }

    pub fn authorizer(&self) -> Option<&AuthorizerFn> {
        self.authorizer.as_ref()
    }

    pub fn on_start(&self) -> Option<&StartHookFn> {
        self.on_start.as_ref()
    }

    pub fn on_finish(&self) -> Option<&FinishHookFn> {
        self.on_finish.as_ref()
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("query", &self.query)
            .field("body", &self.body)
            .field("response", &self.response)
            .field("authorizer", &self.authorizer.is_some())
            .field("on_start", &self.on_start.is_some())
            .field("on_finish", &self.on_finish.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`RouteDefinition`].
#[derive(Default)]
pub struct RouteDefinitionBuilder {
    query: Option<Value>,
    body: Option<Value>,
    response: Option<Value>,
    handler: Option<HandlerFn>,
    authorizer: Option<AuthorizerFn>,
    on_start: Option<StartHookFn>,
    on_finish: Option<FinishHookFn>,
}

impl RouteDefinitionBuilder {
    /// Schema the parsed query string must satisfy.
    pub fn query(mut self, schema: Value) -> Self {
        self.query = Some(schema);
        self
    }

    /// Schema the parsed JSON body must satisfy.
    pub fn body(mut self, schema: Value) -> Self {
        self.body = Some(schema);
        self
    }

    /// Schema describing the handler's output. Published through the
    /// introspection endpoint; responses are not validated against it.
    pub fn response(mut self, schema: Value) -> Self {
        self.response = Some(schema);
        self
    }

    /// Attach an async, fallible handler. Its output is serialized to JSON.
    pub fn handler<F, Fut, R, E>(mut self, handler: F) -> Self
    where
        F: Fn(HandlerInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Serialize,
        E: Into<BoxError>,
    {
        self.handler = Some(Arc::new(move |input: HandlerInput| {
            let fut = handler(input);
            async move {
                let output = fut.await.map_err(Into::<BoxError>::into)?;
                serde_json::to_value(output).map_err(BoxError::from)
            }
            .boxed()
        }));
        self
    }

    /// Attach a synchronous, infallible handler.
    pub fn handler_fn<F, R>(mut self, handler: F) -> Self
    where
        F: Fn(HandlerInput) -> R + Send + Sync + 'static,
        R: Serialize,
    {
        self.handler = Some(Arc::new(move |input: HandlerInput| {
            let output = serde_json::to_value(handler(input)).map_err(BoxError::from);
            futures_util::future::ready(output).boxed()
        }));
        self
    }

    /// Attach an authorizer. Returning `false` rejects the request.
    pub fn authorizer<F, Fut>(mut self, authorizer: F) -> Self
    where
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.authorizer = Some(Arc::new(move |ctx: Arc<RequestContext>| {
            authorizer(ctx).map(Ok::<bool, BoxError>).boxed()
        }));
        self
    }

    /// Attach an authorizer that may fail. Failures are reported as internal errors.
    pub fn try_authorizer<F, Fut, E>(mut self, authorizer: F) -> Self
    where
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.authorizer = Some(Arc::new(move |ctx: Arc<RequestContext>| {
            authorizer(ctx)
                .map(|res| res.map_err(Into::<BoxError>::into))
                .boxed()
        }));
        self
    }

    pub fn on_start<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_start = Some(Arc::new(move |ctx: Arc<RequestContext>| hook(ctx).boxed()));
        self
    }

    pub fn on_finish<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<RequestContext>, FinishOutcome) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_finish = Some(Arc::new(move |ctx: Arc<RequestContext>, outcome: FinishOutcome| {
            hook(ctx, outcome).boxed()
        }));
        self
    }

    pub fn build(self) -> Result<RouteDefinition, RouteError> {
        let response = self.response.ok_or(RouteError::MissingResponse)?;
        let handler = self.handler.ok_or(RouteError::MissingHandler)?;
        Ok(RouteDefinition {
            query: self.query,
            body: self.body,
            response,
            handler,
            authorizer: self.authorizer,
            on_start: self.on_start,
            on_finish: self.on_finish,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_requires_response_and_handler() {
        let missing_response = RouteDefinition::builder().handler_fn(|_| "ok").build();
        assert!(matches!(missing_response, Err(RouteError::MissingResponse)));

        let missing_handler = RouteDefinition::builder()
            .response(json!({"type": "string"}))
            .build();
        assert!(matches!(missing_handler, Err(RouteError::MissingHandler)));
    }

    #[tokio::test]
    async fn test_sync_and_async_handlers_are_awaited_alike() {
        let sync_route = RouteDefinition::builder()
            .response(json!({"type": "string"}))
            .handler_fn(|input: HandlerInput| format!("Hello, {}!", input.query["name"].as_str().unwrap_or("")))
            .build()
            .unwrap();
        let async_route = RouteDefinition::builder()
            .response(json!({"type": "string"}))
            .handler(|input: HandlerInput| async move {
                Ok::<_, BoxError>(format!("Hello, {}!", input.query["name"].as_str().unwrap_or("")))
            })
            .build()
            .unwrap();

        let input = HandlerInput {
            query: json!({"name": "World"}),
            ..Default::default()
        };
        let a = (sync_route.handler())(input.clone()).await.unwrap();
        let b = (async_route.handler())(input).await.unwrap();
        assert_eq!(a, json!("Hello, World!"));
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_handler_error_is_boxed() {
        let route = RouteDefinition::builder()
            .response(json!({"type": "string"}))
            .handler(|_| async { Err::<String, _>("database offline") })
            .build()
            .unwrap();
        let err = (route.handler())(HandlerInput::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "database offline");
    }
}
