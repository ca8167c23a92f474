//! Unified error types for the kgem core.
//!
//! Framework-level errors (validation, manager tree) live in `kgem-framework`.

use thiserror::Error;

/// Type-erased error returned by executables, callbacks and filters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Client Errors
// =============================================================================

/// Errors that can occur when the dispatch core asks the client for data.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The peer is not known to the client (never seen, no access hash, ...).
    #[error("unknown peer: {peer_id}")]
    UnknownPeer {
        /// The id that failed to resolve.
        peer_id: i64,
    },

    /// The remote API call failed for any other reason.
    #[error("API error: {0}")]
    Api(String),
}

impl ClientError {
    /// Creates an unknown-peer error.
    pub fn unknown_peer(peer_id: i64) -> Self {
        Self::UnknownPeer { peer_id }
    }

    /// Creates a generic API error.
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Returns `true` if this error means the peer could not be resolved.
    pub fn is_unknown_peer(&self) -> bool {
        matches!(self, Self::UnknownPeer { .. })
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for client calls.
pub type ClientResult<T> = Result<T, ClientError>;
