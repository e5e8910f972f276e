//! Client construction and the group tree.
//!
//! # Design
//! A [`Client`] is the root [`Group`]: a base URL, a root config and a
//! transport. Declaring a child folds the parent's config into the child's
//! ([`EndpointConfig::merge`]) and joins the URLs, so each node holds its
//! fully resolved config from birth and nothing is looked up through
//! ancestors at call time.
//!
//! Each group owns the list of children it created. Children never point
//! back at their parent, so the tree has no cycles. The list exists for
//! [`Group::unmock`], which broadcasts to every descendant endpoint.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::EndpointConfig;
use crate::endpoint::Endpoint;
use crate::error::ConfigError;
use crate::http::HttpMethod;
use crate::path;
use crate::transport::Transport;

#[derive(Clone)]
enum Node {
    Group(Group),
    Endpoint(Endpoint),
}

/// A composite node that merges its config into every child it declares.
#[derive(Clone)]
pub struct Group {
    inner: Arc<GroupInner>,
}

struct GroupInner {
    url: String,
    config: EndpointConfig,
    transport: Arc<dyn Transport>,
    children: Mutex<Vec<Node>>,
}

impl Group {
    fn new(url: String, config: EndpointConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                url,
                config,
                transport,
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// The config after merging every ancestor's.
    pub fn config(&self) -> &EndpointConfig {
        &self.inner.config
    }

    /// Declare a nested group at `path`.
    ///
    /// `config` may be `None`, in which case the child inherits this group's
    /// config unchanged.
    pub fn group(&self, path: &str, config: impl Into<Option<EndpointConfig>>) -> Group {
        let (url, config) = self.resolve(path, config.into());
        let group = Group::new(url, config, self.inner.transport.clone());
        self.inner.children.lock().push(Node::Group(group.clone()));
        group
    }

    pub fn get(&self, path: &str, config: impl Into<Option<EndpointConfig>>) -> Endpoint {
        self.endpoint(HttpMethod::Get, path, config)
    }

    pub fn post(&self, path: &str, config: impl Into<Option<EndpointConfig>>) -> Endpoint {
        self.endpoint(HttpMethod::Post, path, config)
    }

    pub fn put(&self, path: &str, config: impl Into<Option<EndpointConfig>>) -> Endpoint {
        self.endpoint(HttpMethod::Put, path, config)
    }

    pub fn delete(&self, path: &str, config: impl Into<Option<EndpointConfig>>) -> Endpoint {
        self.endpoint(HttpMethod::Delete, path, config)
    }

    /// Declare an endpoint for an arbitrary method.
    pub fn endpoint(
        &self,
        method: HttpMethod,
        path: &str,
        config: impl Into<Option<EndpointConfig>>,
    ) -> Endpoint {
        let (url, config) = self.resolve(path, config.into());
        tracing::trace!(%method, %url, "endpoint declared");
        let endpoint = Endpoint::new(method, url, config, self.inner.transport.clone());
        self.inner.children.lock().push(Node::Endpoint(endpoint.clone()));
        endpoint
    }

    /// Put every descendant endpoint back on the transport.
    pub fn unmock(&self) {
        let children = self.inner.children.lock().clone();
        for child in children {
            match child {
                Node::Group(group) => group.unmock(),
                Node::Endpoint(endpoint) => endpoint.unmock(),
            }
        }
    }

    /// Every descendant endpoint, depth first in declaration order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let children = self.inner.children.lock().clone();
        let mut out = Vec::new();
        for child in children {
            match child {
                Node::Group(group) => out.extend(group.endpoints()),
                Node::Endpoint(endpoint) => out.push(endpoint),
            }
        }
        out
    }

    fn resolve(&self, path: &str, config: Option<EndpointConfig>) -> (String, EndpointConfig) {
        let config = match config {
            Some(child) => self.inner.config.merge(&child),
            None => self.inner.config.clone(),
        };
        (path::join(&self.inner.url, path), config)
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("url", &self.inner.url)
            .field("children", &self.inner.children.lock().len())
            .finish()
    }
}

/// Root of an endpoint tree.
#[derive(Clone, Debug)]
pub struct Client {
    root: Group,
}

impl Client {
    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            base_url: base_url.into(),
            config: EndpointConfig::default(),
            transport: None,
        }
    }

    /// Build a client with an explicit transport and an empty root config.
    ///
    /// # Errors
    /// [`ConfigError::InvalidBaseUrl`] when `base_url` is not absolute.
    pub fn with_transport(
        base_url: impl Into<String>,
        transport: impl Transport + 'static,
    ) -> Result<Client, ConfigError> {
        Client::builder(base_url).transport(transport).build()
    }

    pub fn url(&self) -> &str {
        self.root.url()
    }

    pub fn config(&self) -> &EndpointConfig {
        self.root.config()
    }

    pub fn group(&self, path: &str, config: impl Into<Option<EndpointConfig>>) -> Group {
        self.root.group(path, config)
    }

    pub fn get(&self, path: &str, config: impl Into<Option<EndpointConfig>>) -> Endpoint {
        self.root.get(path, config)
    }

    pub fn post(&self, path: &str, config: impl Into<Option<EndpointConfig>>) -> Endpoint {
        self.root.post(path, config)
    }

    pub fn put(&self, path: &str, config: impl Into<Option<EndpointConfig>>) -> Endpoint {
        self.root.put(path, config)
    }

    pub fn delete(&self, path: &str, config: impl Into<Option<EndpointConfig>>) -> Endpoint {
        self.root.delete(path, config)
    }

    pub fn endpoint(
        &self,
        method: HttpMethod,
        path: &str,
        config: impl Into<Option<EndpointConfig>>,
    ) -> Endpoint {
        self.root.endpoint(method, path, config)
    }

    /// Put every endpoint in the tree back on the transport.
    pub fn unmock(&self) {
        self.root.unmock();
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.root.endpoints()
    }
}

/// Configures a [`Client`].
pub struct ClientBuilder {
    base_url: String,
    config: EndpointConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Root config inherited by every group and endpoint.
    pub fn config(mut self, config: EndpointConfig) -> Self {
        self.config = config;
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Use [`UreqTransport`](crate::UreqTransport) with a preconfigured agent.
    #[cfg(feature = "ureq")]
    pub fn ureq_agent(self, agent: ureq::Agent) -> Self {
        self.transport(crate::transport::UreqTransport::with_agent(agent))
    }

    /// # Errors
    /// - [`ConfigError::InvalidBaseUrl`] when the base URL is not absolute.
    /// - [`ConfigError::MissingTransport`] when no transport was supplied
    ///   and the `ureq` feature is off.
    pub fn build(self) -> Result<Client, ConfigError> {
        if let Err(source) = url::Url::parse(&self.base_url) {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url,
                source,
            });
        }
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };
        let url = path::join(&self.base_url, "");
        tracing::debug!(%url, "client built");
        Ok(Client {
            root: Group::new(url, self.config, transport),
        })
    }
}

#[cfg(feature = "ureq")]
fn default_transport() -> Result<Arc<dyn Transport>, ConfigError> {
    Ok(Arc::new(crate::transport::UreqTransport::new()))
}

#[cfg(not(feature = "ureq"))]
fn default_transport() -> Result<Arc<dyn Transport>, ConfigError> {
    Err(ConfigError::MissingTransport)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::ResponseSchema;
    use crate::error::BoxError;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::request::Request;
    use crate::response::Response;
    use crate::schema::{number, object, string};
    use crate::transport::transport_fn;

    fn client() -> Client {
        let echo = transport_fn(|req: HttpRequest| async move {
            let body = json!({"url": req.url, "method": req.method.as_str()});
            Ok::<_, BoxError>(HttpResponse::new(200).with_body(body.to_string()))
        });
        Client::with_transport("http://localhost:3000/", echo).unwrap()
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let echo = transport_fn(|_req| async { Ok::<_, BoxError>(HttpResponse::new(200)) });
        let err = Client::with_transport("not a url", echo).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[cfg(not(feature = "ureq"))]
    #[test]
    fn missing_transport_is_a_config_error() {
        let err = Client::builder("http://localhost:3000").build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingTransport));
    }

    #[cfg(feature = "ureq")]
    #[test]
    fn default_transport_is_used_when_none_given() {
        assert!(Client::builder("http://localhost:3000").build().is_ok());
    }

    #[test]
    fn urls_are_joined_through_groups() {
        let c = client();
        assert_eq!(c.url(), "http://localhost:3000");
        let users = c.group("/users/", EndpointConfig::new());
        let user = users.group(":user_id", EndpointConfig::new());
        let tasks = user.get("/tasks", EndpointConfig::new());
        assert_eq!(tasks.url(), "http://localhost:3000/users/:user_id/tasks");
        assert_eq!(tasks.method(), HttpMethod::Get);
    }

    #[test]
    fn configs_fold_down_the_tree() {
        let c = Client::builder("http://localhost:3000")
            .config(
                EndpointConfig::new()
                    .headers(object().field("token", string()))
                    .response(500, ResponseSchema::new()),
            )
            .transport(transport_fn(|_req| async {
                Ok::<_, BoxError>(HttpResponse::new(200))
            }))
            .build()
            .unwrap();
        let users = c.group(
            "/users/:id",
            EndpointConfig::new()
                .params(object().field("id", number()))
                .response(401, ResponseSchema::new()),
        );
        let ep = users.post(
            "/tasks",
            EndpointConfig::new()
                .headers(object().field("lang", string()))
                .response(201, ResponseSchema::new()),
        );

        let config = ep.config();
        let headers: Vec<&str> = config.headers.as_ref().unwrap().field_names().collect();
        assert_eq!(headers, vec!["lang", "token"]);
        assert!(config.params.as_ref().unwrap().has_field("id"));
        assert_eq!(config.responses.keys().copied().collect::<Vec<_>>(), vec![201, 401, 500]);
    }

    #[tokio::test]
    async fn endpoints_dispatch_to_their_own_url() {
        let c = client();
        let tasks = c.group("/tasks", EndpointConfig::new());
        let remove = tasks.delete("/:id", EndpointConfig::new());

        let res = remove
            .invoke(Request::new().params(json!({"id": 7})))
            .await
            .unwrap();
        assert_eq!(
            res.body,
            json!({"url": "http://localhost:3000/tasks/7", "method": "DELETE"})
        );
    }

    #[tokio::test]
    async fn unmock_broadcasts_to_every_descendant() {
        let c = client();
        let tasks = c.group("/tasks", EndpointConfig::new());
        let list = tasks.get("", EndpointConfig::new());
        let create = tasks.post("", EndpointConfig::new());
        let nested = tasks.group("/:id", EndpointConfig::new());
        let show = nested.get("", EndpointConfig::new());
        let health = c.get("/health", EndpointConfig::new());

        list.mock_response(Response::new(200));
        show.mock_response(Response::new(200));
        health.mock_response(Response::new(200));

        tasks.unmock();
        assert!(!list.is_mocked());
        assert!(!create.is_mocked());
        assert!(!show.is_mocked());
        assert!(health.is_mocked(), "unmock on a group stays inside that group");

        tasks.unmock();
        c.unmock();
        assert!(c.endpoints().iter().all(|e| !e.is_mocked()));

        let res = list.invoke(Request::new()).await.unwrap();
        assert_eq!(res.body["url"], "http://localhost:3000/tasks");
    }

    #[test]
    fn config_is_optional_on_every_factory() {
        let c = Client::builder("http://localhost:3000")
            .config(EndpointConfig::new().response(401, ResponseSchema::new()))
            .transport(transport_fn(|_req| async {
                Ok::<_, BoxError>(HttpResponse::new(200))
            }))
            .build()
            .unwrap();
        let tasks = c.group("/tasks", None);
        let list = tasks.get("", None);
        let create = tasks.post("", EndpointConfig::new().response(201, ResponseSchema::new()));

        assert_eq!(list.url(), "http://localhost:3000/tasks");
        assert_eq!(list.config().responses.keys().copied().collect::<Vec<_>>(), vec![401]);
        assert_eq!(
            create.config().responses.keys().copied().collect::<Vec<_>>(),
            vec![201, 401]
        );
        assert_eq!(c.endpoints().len(), 2);
    }

    #[test]
    fn endpoints_lists_descendants_in_declaration_order() {
        let c = client();
        let a = c.get("/a", EndpointConfig::new());
        let g = c.group("/g", EndpointConfig::new());
        let b = g.put("/b", EndpointConfig::new());
        let urls: Vec<String> = c.endpoints().iter().map(|e| e.url().to_string()).collect();
        assert_eq!(urls, vec![a.url().to_string(), b.url().to_string()]);
    }
}
