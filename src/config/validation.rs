//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (dependencies reference tracked services)
//! - Validate value ranges (intervals > 0, addresses parseable)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ResilienceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ResilienceConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// One semantic problem with a supplied configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    ZeroInterval(&'static str),
    ZeroThreshold(&'static str),
    InvalidBindAddress(String),
    InvalidMetricsAddress(String),
    InvalidLogLevel(String),
    InvalidWebhookUrl(String),
    EmptyServiceName,
    DuplicateService(String),
    InvalidProbeUrl { service: String, url: String },
    ZeroServiceTimeout(String),
    SelfDependency(String),
    UnknownDependency { service: String, dependency: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::ZeroInterval(field) => {
                write!(f, "{} must be greater than zero", field)
            }
            ValidationError::ZeroThreshold(field) => {
                write!(f, "{} must be greater than zero", field)
            }
            ValidationError::InvalidBindAddress(addr) => {
                write!(f, "server.bind_address '{}' is not a socket address", addr)
            }
            ValidationError::InvalidMetricsAddress(addr) => write!(
                f,
                "observability.metrics_address '{}' is not a socket address",
                addr
            ),
            ValidationError::InvalidLogLevel(level) => {
                write!(f, "observability.log_level '{}' is not a log level", level)
            }
            ValidationError::InvalidWebhookUrl(url) => {
                write!(f, "events.webhook_url '{}' is not a valid URL", url)
            }
            ValidationError::EmptyServiceName => write!(f, "service name must not be empty"),
            ValidationError::DuplicateService(name) => {
                write!(f, "service '{}' is defined more than once", name)
            }
            ValidationError::InvalidProbeUrl { service, url } => {
                write!(f, "service '{}' probe_url '{}' is not a valid URL", service, url)
            }
            ValidationError::ZeroServiceTimeout(name) => {
                write!(f, "service '{}' timeout_ms must be greater than zero", name)
            }
            ValidationError::SelfDependency(name) => {
                write!(f, "service '{}' depends on itself", name)
            }
            ValidationError::UnknownDependency {
                service,
                dependency,
            } => write!(
                f,
                "service '{}' depends on unknown service '{}'",
                service, dependency
            ),
        }
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ResilienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.monitor.interval_ms == 0 {
        errors.push(ValidationError::ZeroInterval("monitor.interval_ms"));
    }
    if config.monitor.probe_timeout_ms == 0 {
        errors.push(ValidationError::ZeroInterval("monitor.probe_timeout_ms"));
    }
    if config.breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold("breaker.failure_threshold"));
    }
    if config.breaker.open_duration_ms == 0 {
        errors.push(ValidationError::ZeroInterval("breaker.open_duration_ms"));
    }
    if config.breaker.half_open_trials == 0 {
        errors.push(ValidationError::ZeroThreshold("breaker.half_open_trials"));
    }
    if config.degradation.default_timeout_ms == 0 {
        errors.push(ValidationError::ZeroInterval(
            "degradation.default_timeout_ms",
        ));
    }
    if config.degradation.recovery_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold(
            "degradation.recovery_threshold",
        ));
    }
    if config.degradation.health_window == 0 {
        errors.push(ValidationError::ZeroThreshold("degradation.health_window"));
    }

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.server.bind_address.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if let Some(url) = &config.events.webhook_url {
        if Url::parse(url).is_err() {
            errors.push(ValidationError::InvalidWebhookUrl(url.clone()));
        }
    }

    let mut seen = HashSet::new();
    let names: HashSet<&str> = config
        .services
        .iter()
        .map(|service| service.name.as_str())
        .collect();

    for service in &config.services {
        if service.name.is_empty() {
            errors.push(ValidationError::EmptyServiceName);
            continue;
        }
        if !seen.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }
        if let Some(url) = &service.probe_url {
            if Url::parse(url).is_err() {
                errors.push(ValidationError::InvalidProbeUrl {
                    service: service.name.clone(),
                    url: url.clone(),
                });
            }
        }
        if service.timeout_ms == Some(0) {
            errors.push(ValidationError::ZeroServiceTimeout(service.name.clone()));
        }
        if service.failure_threshold == Some(0) {
            errors.push(ValidationError::ZeroThreshold("service failure_threshold"));
        }
        if service.half_open_trials == Some(0) {
            errors.push(ValidationError::ZeroThreshold("service half_open_trials"));
        }
        for dependency in &service.depends_on {
            if dependency == &service.name {
                errors.push(ValidationError::SelfDependency(service.name.clone()));
            } else if !names.contains(dependency.as_str()) {
                errors.push(ValidationError::UnknownDependency {
                    service: service.name.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServiceConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ResilienceConfig::default()).is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = ResilienceConfig::default();
        config.monitor.interval_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroInterval("monitor.interval_ms")));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = ResilienceConfig::default();
        config.monitor.interval_ms = 0;
        config.breaker.failure_threshold = 0;
        config.server.bind_address = "not-an-address".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let mut config = ResilienceConfig::default();
        let mut database = ServiceConfig::new("database");
        database.depends_on = vec!["vault".to_string()];
        config.services.push(database);
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::UnknownDependency { .. }
        ));
    }

    #[test]
    fn self_dependency_is_rejected() {
        let mut config = ResilienceConfig::default();
        let mut redis = ServiceConfig::new("redis");
        redis.depends_on = vec!["redis".to_string()];
        config.services.push(redis);
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::SelfDependency(_)));
    }

    #[test]
    fn duplicate_service_is_rejected() {
        let mut config = ResilienceConfig::default();
        config.services.push(ServiceConfig::new("database"));
        config.services.push(ServiceConfig::new("database"));
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::DuplicateService(_)));
    }

    #[test]
    fn bad_probe_url_is_rejected() {
        let mut config = ResilienceConfig::default();
        let mut database = ServiceConfig::new("database");
        database.probe_url = Some("::not a url::".to_string());
        config.services.push(database);
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidProbeUrl { .. }));
    }
}
