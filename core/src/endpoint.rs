//! Callable leaf nodes and the mock override.
//!
//! # Design
//! An [`Endpoint`] binds one method and URL template to a merged
//! [`EndpointConfig`]. Its only mutable state is [`EndpointState`]:
//!
//! - `Live`: request pipeline, then transport, then response pipeline.
//! - `Mocked`: request pipeline, then the handler, whose `Response` is
//!   returned as is.
//!
//! The state is read once per call, before dispatch, by cloning the handler
//! handle out of the lock. A concurrent `mock`/`unmock` is seen either fully
//! or not at all, and the lock is never held across an await.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;

use crate::config::EndpointConfig;
use crate::error::{BoxError, ClientError};
use crate::http::HttpMethod;
use crate::request::{build_request, Request};
use crate::response::{interpret, validate, Response};
use crate::transport::Transport;

/// A mock handler: receives the validated request, returns the response.
pub type MockHandler =
    Arc<dyn Fn(Request) -> BoxFuture<'static, Result<Response, BoxError>> + Send + Sync>;

/// Dispatch mode of an endpoint.
#[derive(Clone, Default)]
pub enum EndpointState {
    #[default]
    Live,
    Mocked(MockHandler),
}

impl fmt::Debug for EndpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointState::Live => f.write_str("Live"),
            EndpointState::Mocked(_) => f.write_str("Mocked(..)"),
        }
    }
}

/// Handle to a declared endpoint. Clones share the same mock slot.
#[derive(Clone)]
pub struct Endpoint {
    inner: Arc<EndpointInner>,
}

struct EndpointInner {
    method: HttpMethod,
    url: String,
    config: EndpointConfig,
    transport: Arc<dyn Transport>,
    state: RwLock<EndpointState>,
}

impl Endpoint {
    pub(crate) fn new(
        method: HttpMethod,
        url: String,
        config: EndpointConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            inner: Arc::new(EndpointInner {
                method,
                url,
                config,
                transport,
                state: RwLock::new(EndpointState::Live),
            }),
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.inner.method
    }

    /// The absolute URL template, placeholders unresolved.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// The config after merging every ancestor's.
    pub fn config(&self) -> &EndpointConfig {
        &self.inner.config
    }

    /// Validate `req`, dispatch it, and return the (validated) response.
    ///
    /// # Errors
    /// - [`ClientError::Validation`] when a request slot fails its validator;
    ///   nothing is dispatched.
    /// - [`ClientError::Transport`] / [`ClientError::Handler`] carrying the
    ///   dispatcher's own error.
    /// - [`ClientError::Decode`], [`ClientError::UnknownStatus`] or
    ///   [`ClientError::Validation`] from the response pipeline (live only).
    pub async fn invoke(&self, req: Request) -> Result<Response, ClientError> {
        let inner = &self.inner;
        let prepared = build_request(&inner.config, inner.method, &inner.url, req)?;
        let state = self.state();

        match state {
            EndpointState::Mocked(handler) => {
                tracing::debug!(
                    method = %inner.method,
                    url = %prepared.http.url,
                    "dispatching to mock handler"
                );
                handler(prepared.request).await.map_err(ClientError::Handler)
            }
            EndpointState::Live => {
                tracing::debug!(
                    method = %inner.method,
                    url = %prepared.http.url,
                    "dispatching request"
                );
                let raw = inner
                    .transport
                    .send(prepared.http)
                    .await
                    .map_err(ClientError::Transport)?;
                tracing::trace!(status = raw.status, url = %inner.url, "response received");
                validate(&inner.config, interpret(raw)?)
            }
        }
    }

    /// Route future calls to `handler` instead of the transport. Replaces any
    /// handler already installed.
    pub fn mock<F, Fut, E>(&self, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let handler: MockHandler = Arc::new(move |req: Request| {
            handler(req)
                .map(|res| res.map_err(Into::<BoxError>::into))
                .boxed()
        });
        self.set_state(EndpointState::Mocked(handler));
    }

    /// Answer every future call with a clone of `response`.
    pub fn mock_response(&self, response: Response) {
        self.mock(move |_req| {
            let response = response.clone();
            async move { Ok::<_, BoxError>(response) }
        });
    }

    /// Return to transport dispatch. No-op when already live.
    pub fn unmock(&self) {
        self.set_state(EndpointState::Live);
    }

    pub fn is_mocked(&self) -> bool {
        matches!(*self.inner.state.read(), EndpointState::Mocked(_))
    }

    /// Snapshot of the current dispatch mode.
    pub fn state(&self) -> EndpointState {
        self.inner.state.read().clone()
    }

    fn set_state(&self, state: EndpointState) {
        tracing::debug!(
            method = %self.inner.method,
            url = %self.inner.url,
            mocked = matches!(state, EndpointState::Mocked(_)),
            "endpoint dispatch mode changed"
        );
        *self.inner.state.write() = state;
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.inner.method)
            .field("url", &self.inner.url)
            .field("state", &*self.inner.state.read())
            .finish()
    }
}
