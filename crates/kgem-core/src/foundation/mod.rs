//! Foundation layer - core value types and control-flow primitives.
//!
//! - Protocol value types (account, user, chat, message)
//! - Raw updates as delivered by the transport
//! - Execution outcomes and propagation directives
//! - Composable filter predicates

pub mod filter;
pub mod outcome;
pub mod types;
pub mod update;

pub use filter::{Filter, Predicate};
pub use outcome::{IntoOutcome, Outcome, Propagation};
pub use types::{Account, Chat, ChatKind, Message, User, channel_chat_id};
pub use update::{Peer, RawMessage, RawUpdate};
