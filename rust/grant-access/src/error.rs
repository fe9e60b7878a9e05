//! Error types for authorization resolution.

use grant_query::QueryError;
use ipld_core::cid::Cid;
use thiserror::Error;

/// Errors surfaced by the authorization layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessError {
    /// No delegation in the database grants the requested abilities.
    ///
    /// This is an expected outcome that callers branch on, not a fault.
    #[error("The {authority} has no access to {can:?} on {subject}")]
    AccessDenied {
        /// Principal access was requested for
        authority: String,
        /// Resource access was requested on
        subject: String,
        /// Abilities that were requested
        can: Vec<String>,
    },

    /// Evaluating a query failed
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A delegation or archive could not be encoded
    #[error("Failed to encode: {0}")]
    Encode(String),

    /// A delegation or archive could not be decoded
    #[error("Failed to decode: {0}")]
    Decode(String),

    /// A delegation in the proof chain has an effective revocation
    #[error("Delegation {ucan} was revoked by {scope} in {cause}")]
    Revoked {
        /// The revoked delegation
        ucan: Cid,
        /// Principal that issued the revocation
        scope: String,
        /// Revocation receipt
        cause: Cid,
    },
}
