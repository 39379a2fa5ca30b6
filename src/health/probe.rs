//! Health probe capability interface.
//!
//! The monitor depends only on this narrow check capability, never on a
//! concrete client type, so any dependency can be probed uniformly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::error::ResilienceError;

/// A lightweight dependency check. `Ok(())` means reachable and sane.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Service name this probe reports on.
    fn service(&self) -> &str;

    async fn check(&self) -> Result<(), ResilienceError>;
}

/// HTTP GET probe: any 2xx is healthy.
pub struct HttpProbe {
    service: String,
    url: Uri,
    client: Client<HttpConnector, Body>,
}

impl HttpProbe {
    pub fn new(service: impl Into<String>, url: &str) -> Result<Self, ResilienceError> {
        let url: Uri = url
            .parse()
            .map_err(|_| ResilienceError::Configuration(format!("invalid probe url '{}'", url)))?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            service: service.into(),
            url,
            client,
        })
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    fn service(&self) -> &str {
        &self.service
    }

    async fn check(&self) -> Result<(), ResilienceError> {
        let request = Request::builder()
            .method("GET")
            .uri(self.url.clone())
            .header("user-agent", "resilience-core-health-check")
            .body(Body::empty())
            .map_err(|e| ResilienceError::MalformedProbe(e.to_string()))?;

        match self.client.request(request).await {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(ResilienceError::Operation(format!(
                "probe returned status {}",
                response.status()
            ))),
            Err(e) => Err(ResilienceError::Operation(format!(
                "probe connection error: {}",
                e
            ))),
        }
    }
}

pub type ProbeFuture = Pin<Box<dyn Future<Output = Result<(), ResilienceError>> + Send>>;

/// Closure-backed probe for in-process checks and tests.
pub struct FnProbe {
    service: String,
    check: Arc<dyn Fn() -> ProbeFuture + Send + Sync>,
}

impl FnProbe {
    pub fn new<F, Fut>(service: impl Into<String>, check: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ResilienceError>> + Send + 'static,
    {
        Self {
            service: service.into(),
            check: Arc::new(move || Box::pin(check())),
        }
    }
}

#[async_trait]
impl HealthProbe for FnProbe {
    fn service(&self) -> &str {
        &self.service
    }

    async fn check(&self) -> Result<(), ResilienceError> {
        (self.check)().await
    }
}
