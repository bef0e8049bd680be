//! Error types for fetching, configuration loading, and mail delivery.
//!
//! The three enums follow the three failure domains of the application:
//!
//! - [`FetchError`]: network or payload problems while talking to a content
//!   API. These never escape a [`ContentService`](crate::services::ContentService);
//!   they are logged and turned into "no content".
//! - [`ConfigError`]: anything wrong with `creds.yaml` or `targets.yaml`.
//!   Fatal at startup.
//! - [`DeliveryError`]: the mail transport refused or failed. Caught per
//!   recipient by the scheduler.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while fetching from a remote content API.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while loading credentials or recipients.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("recipient {recipient:?} references unknown service {service:?}")]
    UnknownService { recipient: String, service: String },

    #[error("{} does not list any recipients", .path.display())]
    Empty { path: PathBuf },
}

/// Failure while handing a digest to the mail transport.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("could not read attachment {}: {source}", .path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("smtp transport failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_service_message_names_both_sides() {
        let err = ConfigError::UnknownService {
            recipient: "Alice".to_string(),
            service: "dogpics".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Alice"));
        assert!(msg.contains("dogpics"));
    }

    #[test]
    fn test_status_error_display() {
        let err = FetchError::Status {
            url: "https://example.com".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "unexpected status 404 from https://example.com");
    }
}
