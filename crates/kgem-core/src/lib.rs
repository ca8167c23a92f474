//! # kgem core
//!
//! Foundation of the kgem dispatch managers.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! Value types and control flow:
//! - **Protocol types**: [`Account`], [`User`], [`Chat`], [`Message`]
//! - **Raw updates**: [`RawUpdate`], [`RawMessage`], [`Peer`]
//! - **Outcomes**: [`Outcome`] and [`Propagation`], the explicit replacement
//!   for skip/stop signals
//! - **Filters**: [`Filter`] and the composable [`Predicate`]
//!
//! ### Integration Layer
//!
//! Seams for external collaborators:
//! - **Client**: the account identity and remote chat lookups ([`Client`])
//! - **Named locks**: per-key async mutual exclusion ([`NamedLock`])

pub mod error;
pub mod foundation;
pub mod integration;

pub use error::{BoxError, ClientError, ClientResult};
pub use foundation::{
    Account, Chat, ChatKind, Filter, IntoOutcome, Message, Outcome, Peer, Predicate, Propagation,
    RawMessage, RawUpdate, User, channel_chat_id,
};
pub use integration::{BoxedClient, Client, NamedLock, NamedLockGuard};

/// Boxed `Send` future used for every stored callback.
pub use futures::future::BoxFuture;

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::integration::{BoxedClient, Client};
    pub use super::{BoxError, BoxFuture, ClientError};
}
