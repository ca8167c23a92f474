//! Raw protocol notifications as delivered by the transport.
//!
//! A [`RawUpdate`] is opaque to the rest of the system: only the event
//! resolver looks inside it and turns the interesting shapes into typed
//! events. Everything the resolver does not understand ends up as
//! [`RawUpdate::Other`].

use serde::{Deserialize, Serialize};

use super::types::channel_chat_id;

/// The peer a raw update or raw message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Peer {
    User(i64),
    Chat(i64),
    Channel(i64),
}

impl Peer {
    /// Returns the bare id, as used for the update lookup tables.
    pub fn id(&self) -> i64 {
        match *self {
            Peer::User(id) | Peer::Chat(id) | Peer::Channel(id) => id,
        }
    }

    /// Returns the marked chat id used for remote lookups.
    ///
    /// Users keep their id, basic groups are negated and channels get the
    /// `-100` prefix.
    pub fn marked_id(&self) -> i64 {
        match *self {
            Peer::User(id) => id,
            Peer::Chat(id) => -id,
            Peer::Channel(id) => channel_chat_id(id),
        }
    }
}

/// A message as embedded in a raw update, before lookup-table resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: i32,
    /// Where the message was posted.
    pub peer: Peer,
    /// Sender user id, absent for anonymous channel posts.
    #[serde(default)]
    pub from_id: Option<i64>,
    /// Set when the message was sent by this session.
    #[serde(default)]
    pub out: bool,
    #[serde(default)]
    pub text: Option<String>,
}

/// A raw protocol notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_", rename_all = "snake_case")]
pub enum RawUpdate {
    /// The account read incoming messages in a private chat or basic group.
    ReadHistoryInbox { peer: Peer, max_id: i32 },
    /// Someone read the account's messages in a private chat or basic group.
    ReadHistoryOutbox { peer: Peer, max_id: i32 },
    ReadChannelInbox { channel_id: i64, max_id: i32 },
    ReadChannelOutbox { channel_id: i64, max_id: i32 },
    ReadChannelDiscussionInbox {
        channel_id: i64,
        top_msg_id: i32,
        read_max_id: i32,
    },
    ReadChannelDiscussionOutbox {
        channel_id: i64,
        top_msg_id: i32,
        read_max_id: i32,
    },
    NewMessage { message: RawMessage },
    NewChannelMessage { message: RawMessage },
    DeleteMessages { messages: Vec<i32> },
    DeleteChannelMessages { channel_id: i64, messages: Vec<i32> },
    EditMessage { message: RawMessage },
    EditChannelMessage { message: RawMessage },
    /// Any notification kind the managers do not interpret.
    Other { name: String },
}

impl RawUpdate {
    /// Returns a short, stable name for logging.
    pub fn name(&self) -> &str {
        match self {
            RawUpdate::ReadHistoryInbox { .. } => "read_history_inbox",
            RawUpdate::ReadHistoryOutbox { .. } => "read_history_outbox",
            RawUpdate::ReadChannelInbox { .. } => "read_channel_inbox",
            RawUpdate::ReadChannelOutbox { .. } => "read_channel_outbox",
            RawUpdate::ReadChannelDiscussionInbox { .. } => "read_channel_discussion_inbox",
            RawUpdate::ReadChannelDiscussionOutbox { .. } => "read_channel_discussion_outbox",
            RawUpdate::NewMessage { .. } => "new_message",
            RawUpdate::NewChannelMessage { .. } => "new_channel_message",
            RawUpdate::DeleteMessages { .. } => "delete_messages",
            RawUpdate::DeleteChannelMessages { .. } => "delete_channel_messages",
            RawUpdate::EditMessage { .. } => "edit_message",
            RawUpdate::EditChannelMessage { .. } => "edit_channel_message",
            RawUpdate::Other { name } => name,
        }
    }
}
