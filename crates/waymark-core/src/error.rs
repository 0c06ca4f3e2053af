// ── Core error types ──
//
// User-facing errors from waymark-core. Consumers never see HTTP status
// codes or JSON parse failures directly: the `From<waymark_api::Error>`
// impl folds transport-layer errors into the domain taxonomy
// (transport / validation / not-found / sensor).

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    // ── Remote store ─────────────────────────────────────────────────
    /// Network failure, unreachable server, or an unexpected non-2xx answer.
    #[error("Marker service unavailable: {message}")]
    Transport {
        message: String,
        /// HTTP status code, when the server answered at all.
        status: Option<u16>,
    },

    /// The server did not answer within the configured request timeout.
    #[error("Marker service timed out")]
    Timeout,

    /// Malformed marker fields, rejected locally or by the server.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// The addressed entity does not exist (any more).
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Device ───────────────────────────────────────────────────────
    /// No position fix could be obtained (permission denied, no sensor).
    #[error("Position unavailable: {reason}")]
    SensorUnavailable { reason: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    /// The map view was torn down; the request was not processed.
    #[error("Map view has been closed")]
    ViewClosed,

    /// The component is not in a state that accepts this call.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns `true` for network/server failures, timeouts included.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout)
    }

    /// Returns `true` if the addressed entity was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Attach a concrete entity to a generic not-found error.
    ///
    /// Repositories know which identifier they asked for; the transport
    /// layer only knows the status code.
    pub(crate) fn for_entity(self, entity_type: &str, identifier: &str) -> Self {
        match self {
            Self::NotFound { .. } => Self::NotFound {
                entity_type: entity_type.into(),
                identifier: identifier.into(),
            },
            other => other,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<waymark_api::Error> for CoreError {
    fn from(err: waymark_api::Error) -> Self {
        if err.is_not_found() {
            let message = match err {
                waymark_api::Error::Api { message, .. } => message,
                other => other.to_string(),
            };
            return CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: message,
            };
        }

        if err.is_validation() {
            let message = match err {
                waymark_api::Error::Api { message, .. } => message,
                other => other.to_string(),
            };
            return CoreError::Validation { message };
        }

        if err.is_timeout() {
            return CoreError::Timeout;
        }

        match err {
            waymark_api::Error::Transport(e) => CoreError::Transport {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            waymark_api::Error::Api { status, message } => CoreError::Transport {
                message: format!("HTTP {status}: {message}"),
                status: Some(status),
            },
            waymark_api::Error::Deserialization { message, body: _ } => CoreError::Transport {
                message: format!("unexpected response: {message}"),
                status: None,
            },
            waymark_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            waymark_api::Error::UnsupportedBaseUrl(url) => CoreError::Config {
                message: format!("Unsupported API URL: {url}"),
            },
            waymark_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_404_maps_to_not_found() {
        let err = CoreError::from(waymark_api::Error::Api {
            status: 404,
            message: "Marker not found".into(),
        });
        assert!(err.is_not_found());
    }

    #[test]
    fn api_422_maps_to_validation() {
        let err = CoreError::from(waymark_api::Error::Api {
            status: 422,
            message: "latitude out of range".into(),
        });
        assert_eq!(
            err,
            CoreError::Validation {
                message: "latitude out of range".into()
            }
        );
    }

    #[test]
    fn api_503_maps_to_transport() {
        let err = CoreError::from(waymark_api::Error::Api {
            status: 503,
            message: "maintenance".into(),
        });
        assert!(err.is_transport());
        assert_eq!(
            err,
            CoreError::Transport {
                message: "HTTP 503: maintenance".into(),
                status: Some(503),
            }
        );
    }

    #[test]
    fn undecodable_body_maps_to_transport() {
        let err = CoreError::from(waymark_api::Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        });
        assert!(err.is_transport());
    }

    #[test]
    fn for_entity_only_rewrites_not_found() {
        let nf = CoreError::NotFound {
            entity_type: "resource".into(),
            identifier: "Marker not found".into(),
        }
        .for_entity("marker", "abc");
        assert_eq!(
            nf,
            CoreError::NotFound {
                entity_type: "marker".into(),
                identifier: "abc".into(),
            }
        );

        let other = CoreError::ViewClosed.for_entity("marker", "abc");
        assert_eq!(other, CoreError::ViewClosed);
    }
}
