//! client::errors
//!
//! Error types for the read client.
//!
//! # Design
//!
//! Every failure carries a distinguishable kind so callers can decide what
//! to do without string matching. [`ClientError::rejection`] translates the
//! kind into the category an API consumer sees, and
//! [`ClientError::public_message`] gives text for that consumer that never
//! includes wire details.
//!
//! # Example
//!
//! ```
//! use gitread::client::{ClientError, ErrorKind, Rejection};
//!
//! let err = ClientError::NotFound("no merge base between 'a' and 'b'".to_string());
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//! assert_eq!(err.rejection(), Rejection::NotFound);
//! assert_eq!(err.rejection().status_code(), 404);
//! ```

use thiserror::Error;

use crate::rpc::{Code, Status};

/// Errors from read client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request was malformed; nothing was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The transport or stream failed.
    #[error("{context}: {source}")]
    Communication {
        context: String,
        #[source]
        source: Status,
    },

    /// The server answered with a message that breaks the contract.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A wire value could not be converted into the domain model.
    #[error("failed to map rpc response: {0}")]
    Mapping(#[from] MappingError),

    /// The requested thing does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller canceled the operation or its deadline passed.
    #[error("operation canceled")]
    Canceled,
}

/// Errors converting wire values into domain types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("rpc commit has an empty sha")]
    EmptySha,

    #[error("rpc commit {sha} has no {role} signature")]
    MissingSignature { sha: String, role: &'static str },

    #[error("rpc signature has no identity")]
    MissingIdentity,

    #[error("rpc signature timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    #[error("rpc divergence count {0} is negative")]
    NegativeCount(i32),
}

/// The kind of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Communication,
    ProtocolViolation,
    Mapping,
    NotFound,
    Canceled,
}

/// How a failure is presented to API consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The caller sent something unusable.
    BadRequest,
    /// The requested thing does not exist.
    NotFound,
    /// The caller went away or gave up.
    Canceled,
    /// The backend could not be reached.
    Unavailable,
    /// The backend misbehaved.
    Internal,
}

impl Rejection {
    /// HTTP status code for this rejection.
    pub fn status_code(&self) -> u16 {
        match self {
            Rejection::BadRequest => 400,
            Rejection::NotFound => 404,
            Rejection::Canceled => 499,
            Rejection::Unavailable => 503,
            Rejection::Internal => 500,
        }
    }
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ClientError::Communication { .. } => ErrorKind::Communication,
            ClientError::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
            ClientError::Mapping(_) => ErrorKind::Mapping,
            ClientError::NotFound(_) => ErrorKind::NotFound,
            ClientError::Canceled => ErrorKind::Canceled,
        }
    }

    pub fn rejection(&self) -> Rejection {
        match self.kind() {
            ErrorKind::InvalidArgument => Rejection::BadRequest,
            ErrorKind::NotFound => Rejection::NotFound,
            ErrorKind::Canceled => Rejection::Canceled,
            ErrorKind::Communication => Rejection::Unavailable,
            ErrorKind::ProtocolViolation | ErrorKind::Mapping => Rejection::Internal,
        }
    }

    /// Message safe to return to API consumers.
    ///
    /// Caller-facing kinds keep their detail (it describes the caller's own
    /// input); server-side kinds are reduced to a fixed sentence.
    pub fn public_message(&self) -> String {
        match self {
            ClientError::InvalidArgument(msg) => msg.clone(),
            ClientError::NotFound(msg) => msg.clone(),
            ClientError::Canceled => "request canceled".to_string(),
            ClientError::Communication { .. } => "repository service unavailable".to_string(),
            ClientError::ProtocolViolation(_) | ClientError::Mapping(_) => {
                "internal error reading repository".to_string()
            }
        }
    }

    /// Check if retrying the same request might succeed.
    ///
    /// The client never retries on its own; this is for callers.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Communication { .. })
    }

    /// Translate a wire status into a client error.
    ///
    /// Statuses that describe the request (not found, invalid argument,
    /// cancellation) keep their kind; everything else is a communication
    /// failure.
    pub fn from_status(status: Status, context: &str) -> Self {
        match status.code() {
            Code::NotFound => ClientError::NotFound(format!("{}: {}", context, status.message())),
            Code::InvalidArgument => {
                ClientError::InvalidArgument(format!("{}: {}", context, status.message()))
            }
            Code::Cancelled | Code::DeadlineExceeded => ClientError::Canceled,
            _ => ClientError::Communication {
                context: context.to_string(),
                source: status,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_kinds() {
        let cases = [
            (Code::NotFound, ErrorKind::NotFound),
            (Code::InvalidArgument, ErrorKind::InvalidArgument),
            (Code::Cancelled, ErrorKind::Canceled),
            (Code::DeadlineExceeded, ErrorKind::Canceled),
            (Code::Unavailable, ErrorKind::Communication),
            (Code::Internal, ErrorKind::Communication),
            (Code::Unknown, ErrorKind::Communication),
        ];

        for (code, kind) in cases {
            let err = ClientError::from_status(Status::new(code, "detail"), "ctx");
            assert_eq!(err.kind(), kind, "code {:?}", code);
        }
    }

    #[test]
    fn rejection_categories() {
        assert_eq!(
            ClientError::InvalidArgument("x".into()).rejection(),
            Rejection::BadRequest
        );
        assert_eq!(
            ClientError::ProtocolViolation("x".into()).rejection(),
            Rejection::Internal
        );
        assert_eq!(
            ClientError::Mapping(MappingError::EmptySha).rejection(),
            Rejection::Internal
        );
        assert_eq!(ClientError::Canceled.rejection().status_code(), 499);
    }

    #[test]
    fn public_message_hides_wire_details() {
        let err = ClientError::from_status(
            Status::internal("dial tcp 10.0.0.7:3001: connection refused"),
            "failed to get commit",
        );
        assert!(err.to_string().contains("10.0.0.7"));
        assert!(!err.public_message().contains("10.0.0.7"));
        assert_eq!(err.rejection(), Rejection::Unavailable);
        assert!(err.is_transient());
    }

    #[test]
    fn communication_display_includes_context() {
        let err = ClientError::from_status(Status::unavailable("reset"), "failed to get commit");
        assert_eq!(err.to_string(), "failed to get commit: unavailable: reset");
    }
}
