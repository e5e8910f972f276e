//! The network boundary.
//!
//! # Design
//! The core never performs I/O itself: an endpoint hands its built
//! [`HttpRequest`] to a [`Transport`] and interprets whatever comes back.
//! Transports return non-2xx statuses as data; only failures to complete the
//! exchange are errors, and those reach the caller unchanged.
//!
//! [`UreqTransport`] (feature `ureq`) is the default. ureq is blocking, so
//! each call runs on tokio's blocking pool.

use std::future::Future;

use async_trait::async_trait;

use crate::error::BoxError;
use crate::http::{HttpRequest, HttpResponse};

/// Sends one request and returns one response. No retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError>;
}

/// Transport backed by an async closure.
pub struct FnTransport<F> {
    f: F,
}

/// Build a [`Transport`] from a closure returning a future.
pub fn transport_fn<F, Fut, E>(f: F) -> FnTransport<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    FnTransport { f }
}

#[async_trait]
impl<F, Fut, E> Transport for FnTransport<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        (self.f)(request).await.map_err(Into::into)
    }
}

#[cfg(feature = "ureq")]
pub use self::blocking::UreqTransport;

#[cfg(feature = "ureq")]
mod blocking {
    use async_trait::async_trait;
    use ureq::typestate::WithBody;
    use ureq::RequestBuilder;

    use super::Transport;
    use crate::error::BoxError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    /// Executes requests with a `ureq::Agent` on tokio's blocking pool.
    ///
    /// Requires a tokio runtime at call time.
    #[derive(Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl UreqTransport {
        /// An agent that returns 4xx/5xx responses as data.
        pub fn new() -> Self {
            let agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .new_agent();
            Self { agent }
        }

        /// Use a preconfigured agent (timeouts, proxy, TLS).
        ///
        /// The agent should be built with `http_status_as_error(false)`,
        /// otherwise error statuses surface as transport failures instead of
        /// reaching the response schemas.
        pub fn with_agent(agent: ureq::Agent) -> Self {
            Self { agent }
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Transport for UreqTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
            let agent = self.agent.clone();
            tokio::task::spawn_blocking(move || execute(&agent, request)).await?
        }
    }

    fn execute(agent: &ureq::Agent, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;
        let url = url.as_str();

        let mut response = match method {
            HttpMethod::Get => with_headers(agent.get(url), &headers).call()?,
            HttpMethod::Delete => with_headers(agent.delete(url), &headers).call()?,
            HttpMethod::Post => send_body(with_headers(agent.post(url), &headers), body)?,
            HttpMethod::Put => send_body(with_headers(agent.put(url), &headers), body)?,
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_vec()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn with_headers<B>(
        mut builder: RequestBuilder<B>,
        headers: &[(String, String)],
    ) -> RequestBuilder<B> {
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    fn send_body(
        builder: RequestBuilder<WithBody>,
        body: Option<String>,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        match body {
            Some(body) => builder.send(body.as_bytes()),
            None => builder.send_empty(),
        }
    }
}
