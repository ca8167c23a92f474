//! Client trait.
//!
//! The transport owns connecting, authenticating and receiving updates. The
//! managers only need to know who the account is and, occasionally, to fetch a
//! chat the update did not carry in its lookup tables.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::foundation::types::{Account, Chat, Message};

/// The client collaborator seen by the managers.
///
/// # Example
///
/// ```rust,ignore
/// struct MyClient { account: Account, api: Api }
///
/// #[async_trait]
/// impl Client for MyClient {
///     fn account(&self) -> &Account {
///         &self.account
///     }
///
///     async fn get_chat(&self, chat_id: i64) -> ClientResult<Chat> {
///         self.api.get_chat(chat_id).await.map_err(into_client_error)
///     }
///
///     async fn get_discussion_message(&self, chat_id: i64, message_id: i32) -> ClientResult<Message> {
///         self.api.get_discussion_message(chat_id, message_id).await.map_err(into_client_error)
///     }
/// }
/// ```
#[async_trait]
pub trait Client: Send + Sync + 'static {
    /// The identity operating this client.
    fn account(&self) -> &Account;

    /// Fetches a chat by (marked) id.
    ///
    /// Must fail with [`ClientError::UnknownPeer`](crate::ClientError::UnknownPeer)
    /// when the peer cannot be resolved.
    async fn get_chat(&self, chat_id: i64) -> ClientResult<Chat>;

    /// Fetches the discussion-thread root for `message_id` in `chat_id`.
    async fn get_discussion_message(&self, chat_id: i64, message_id: i32) -> ClientResult<Message>;
}

/// A shared, type-erased client.
pub type BoxedClient = Arc<dyn Client>;
