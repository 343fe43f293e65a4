use std::fmt;

use snapfit_contracts::schema::SchemaError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    Connect,
    Status(u16),
    Body,
    Other,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Connect => f.write_str("connect"),
            Self::Status(code) => write!(f, "{code}"),
            Self::Body => f.write_str("body"),
            Self::Other => f.write_str("request"),
        }
    }
}

/// Failure of one identification call.
///
/// Transport failures are worth retrying. Empty, unparseable and
/// schema-violating replies mean the model or service drifted from its
/// contract and should be surfaced instead.
#[derive(Debug, Clone, Error)]
pub enum IdentifyError {
    #[error("{0}")]
    Configuration(String),
    #[error("{service} request failed ({kind}): {message}")]
    Transport {
        service: &'static str,
        kind: TransportKind,
        message: String,
    },
    #[error("No content in {service} response")]
    EmptyResponse { service: &'static str },
    #[error("Could not parse JSON from {service} response: {message}")]
    Parse {
        service: &'static str,
        message: String,
    },
    #[error("{service} response failed validation: {source}")]
    Schema {
        service: &'static str,
        #[source]
        source: SchemaError,
    },
    #[error("An identification is already in progress")]
    Busy,
}

impl IdentifyError {
    pub fn missing_credential(variable: &str) -> Self {
        Self::Configuration(format!("{variable} not configured"))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Transport { .. } => "transport",
            Self::EmptyResponse { .. } => "empty_response",
            Self::Parse { .. } => "parse",
            Self::Schema { .. } => "schema",
            Self::Busy => "busy",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Model output that broke the reply contract rather than the network.
    pub fn is_contract_breach(&self) -> bool {
        matches!(
            self,
            Self::EmptyResponse { .. } | Self::Parse { .. } | Self::Schema { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use snapfit_contracts::schema::SchemaError;

    use super::{IdentifyError, TransportKind};

    #[test]
    fn transport_errors_are_retryable_and_render_status() {
        let err = IdentifyError::Transport {
            service: "OpenAI",
            kind: TransportKind::Status(503),
            message: "upstream busy".to_string(),
        };
        assert!(err.is_retryable());
        assert!(!err.is_contract_breach());
        assert_eq!(err.kind(), "transport");
        assert_eq!(err.to_string(), "OpenAI request failed (503): upstream busy");
    }

    #[test]
    fn contract_breaches_are_not_retryable() {
        let schema = IdentifyError::Schema {
            service: "OpenAI",
            source: SchemaError::new("confidence.brand", "one of high|medium|low|none", "\"unsure\""),
        };
        assert!(!schema.is_retryable());
        assert!(schema.is_contract_breach());
        assert!(schema.to_string().contains("confidence.brand"));

        let empty = IdentifyError::EmptyResponse { service: "OpenAI" };
        assert_eq!(empty.to_string(), "No content in OpenAI response");
        assert_eq!(empty.kind(), "empty_response");
    }

    #[test]
    fn missing_credential_names_the_variable() {
        let err = IdentifyError::missing_credential("XIMILAR_API_KEY");
        assert_eq!(err.to_string(), "XIMILAR_API_KEY not configured");
        assert_eq!(err.kind(), "configuration");
        assert!(!err.is_retryable());
    }
}
