//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the active network has a parseable contract address and API URL
//! - Validate value ranges (lengths and intervals > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuestbookConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::clarity::StacksAddress;
use crate::config::schema::{GuestbookConfig, Network};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &GuestbookConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.app.message_max_length == 0 {
        errors.push(ValidationError::new("app.message_max_length", "must be greater than 0"));
    }
    if config.app.refresh_interval_ms == 0 {
        errors.push(ValidationError::new("app.refresh_interval_ms", "must be greater than 0"));
    }

    let prefix = format!("networks.{}", config.app.network);
    let network = config.current_network();

    match network.contract_address.parse::<StacksAddress>() {
        Ok(address) => {
            let expect_mainnet = config.app.network == Network::Mainnet;
            if address.is_mainnet() != expect_mainnet {
                errors.push(ValidationError::new(
                    format!("{}.contract_address", prefix),
                    format!("address is not a {} address", config.app.network),
                ));
            }
        }
        Err(e) => errors.push(ValidationError::new(
            format!("{}.contract_address", prefix),
            e.to_string(),
        )),
    }

    for (field, name) in [
        ("contract_name", &network.contract_name),
        ("tipping_contract_name", &network.tipping_contract_name),
    ] {
        if name.is_empty() || name.len() > 128 || !name.is_ascii() {
            errors.push(ValidationError::new(
                format!("{}.{}", prefix, field),
                "must be 1-128 ASCII characters",
            ));
        }
    }

    let urls = std::iter::once(("api_url".to_string(), &network.api_url)).chain(
        network
            .failover_urls
            .iter()
            .enumerate()
            .map(|(i, u)| (format!("failover_urls[{}]", i), u)),
    );
    for (field, value) in urls {
        if let Err(e) = url::Url::parse(value) {
            errors.push(ValidationError::new(format!("{}.{}", prefix, field), e.to_string()));
        }
    }

    if let Err(e) = url::Url::parse(&config.wallet.signer_url) {
        errors.push(ValidationError::new("wallet.signer_url", e.to_string()));
    }

    if config.node.timeout_secs == 0 {
        errors.push(ValidationError::new("node.timeout_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
