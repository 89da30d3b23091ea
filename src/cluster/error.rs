//! Error types for the cluster API boundary.

use thiserror::Error;

use crate::kind::ResourceKind;

/// Errors raised by [`super::ClusterApi`] implementations.
///
/// Not-found responses never surface here; they are reported as
/// [`super::Lookup::NotFound`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ClusterError {
    /// The API answered with a non-success status other than 404.
    #[error("{verb} {kind} failed with status {code}: {message}")]
    Api {
        /// Operation attempted (`list`, `get` or `delete`).
        verb: String,
        /// Kind addressed by the request.
        kind: ResourceKind,
        /// HTTP status code returned by the API.
        code: u16,
        /// Message returned by the API.
        message: String,
    },
    /// The request could not be completed at the transport level.
    #[error("{verb} {kind} failed: {message}")]
    Transport {
        /// Operation attempted (`list`, `get` or `delete`).
        verb: String,
        /// Kind addressed by the request.
        kind: ResourceKind,
        /// Underlying error message.
        message: String,
    },
    /// A returned object could not be converted into a structured record.
    #[error("failed to decode {kind} response: {message}")]
    Decode {
        /// Kind whose response failed to decode.
        kind: ResourceKind,
        /// Decoder error message.
        message: String,
    },
    /// The API client could not be constructed.
    #[error("failed to build API client: {message}")]
    Client {
        /// Underlying error message.
        message: String,
    },
}
