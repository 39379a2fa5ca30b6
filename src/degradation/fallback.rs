//! Fallback configuration for wrapped operations.
//!
//! # Design Decisions
//! - A fallback is a static value XOR a function re-invoked per failure
//! - Fallback functions are async and may themselves fail; a failed
//!   fallback surfaces the original operation error, not its own
//! - Per-service fallbacks are stored JSON-typed for the named wrappers

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ResilienceError;

pub type FallbackFuture<T> = Pin<Box<dyn Future<Output = Result<T, ResilienceError>> + Send>>;

/// Substitute result used when the primary operation fails or is blocked
/// by an open circuit.
#[derive(Clone)]
pub enum Fallback<T> {
    /// Static substitute returned on every failure.
    Value(T),
    /// Function re-invoked on every failure.
    Function(Arc<dyn Fn() -> FallbackFuture<T> + Send + Sync>),
}

impl<T: Clone> Fallback<T> {
    pub fn value(value: T) -> Self {
        Fallback::Value(value)
    }

    pub fn function<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ResilienceError>> + Send + 'static,
    {
        Fallback::Function(Arc::new(move || Box::pin(f())))
    }

    /// Produce the substitute result.
    pub async fn resolve(&self) -> Result<T, ResilienceError> {
        match self {
            Fallback::Value(value) => Ok(value.clone()),
            Fallback::Function(f) => f().await,
        }
    }
}

impl<T> fmt::Debug for Fallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::Value(_) => f.write_str("Fallback::Value"),
            Fallback::Function(_) => f.write_str("Fallback::Function"),
        }
    }
}

/// Per-call execution options. Unset fields fall back to the service's
/// configuration, then to the degradation defaults.
#[derive(Debug)]
pub struct ExecuteOptions<T> {
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
    pub fallback: Option<Fallback<T>>,
}

impl<T> Default for ExecuteOptions<T> {
    fn default() -> Self {
        Self {
            timeout: None,
            max_retries: None,
            fallback: None,
        }
    }
}

impl<T: Clone> ExecuteOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn fallback_value(mut self, value: T) -> Self {
        self.fallback = Some(Fallback::value(value));
        self
    }

    pub fn fallback_fn<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ResilienceError>> + Send + 'static,
    {
        self.fallback = Some(Fallback::function(f));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn value_fallback_clones() {
        let fallback = Fallback::value(7);
        assert_eq!(fallback.resolve().await.unwrap(), 7);
        assert_eq!(fallback.resolve().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn function_fallback_is_reinvoked() {
        use std::sync::atomic::{AtomicU32, Ordering};
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let fallback = Fallback::function(move || {
            let counter = counter.clone();
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) }
        });
        assert_eq!(fallback.resolve().await.unwrap(), 0);
        assert_eq!(fallback.resolve().await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_fallback_reports_error() {
        let fallback: Fallback<u32> =
            Fallback::function(|| async { Err(ResilienceError::Operation("cache cold".into())) });
        assert!(fallback.resolve().await.is_err());
    }
}
