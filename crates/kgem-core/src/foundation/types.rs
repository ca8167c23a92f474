//! Protocol-level value types shared by the dispatch managers.
//!
//! These are deliberately small: the transport owns the full protocol model,
//! the managers only need enough of it to match commands, resolve chats and
//! decide directionality.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Offset used by the protocol to turn a bare channel id into a chat id.
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// Converts a bare channel id into its marked chat id (`-100<channel_id>`).
pub fn channel_chat_id(channel_id: i64) -> i64 {
    -(CHANNEL_ID_OFFSET + channel_id)
}

// ============================================================================
// Account
// ============================================================================

/// The authenticated identity operating a client connection.
///
/// Its `id` is the "own id" every directionality check compares against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    /// Numeric user id of the account.
    pub id: i64,
    /// Optional display name, used only in diagnostics.
    #[serde(default)]
    pub name: Option<String>,
}

impl Account {
    /// Creates an account with the given id and no name.
    pub fn new(id: i64) -> Self {
        Self { id, name: None }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Account({name}, id={})", self.id),
            None => write!(f, "Account(id={})", self.id),
        }
    }
}

// ============================================================================
// User / Chat
// ============================================================================

/// A protocol user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

impl User {
    pub fn new(id: i64, first_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: None,
            username: None,
            is_bot: false,
        }
    }
}

/// Classification of a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Private,
    Bot,
    Group,
    Supergroup,
    Channel,
}

/// A chat as seen by the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub kind: ChatKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl Chat {
    /// Creates a chat with no title or username.
    pub fn new(id: i64, kind: ChatKind) -> Self {
        Self {
            id,
            kind,
            title: None,
            username: None,
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Builds the private chat the account shares with `user`.
    pub fn private(user: &User) -> Self {
        Self {
            id: user.id,
            kind: if user.is_bot {
                ChatKind::Bot
            } else {
                ChatKind::Private
            },
            title: Some(match &user.last_name {
                Some(last) => format!("{} {last}", user.first_name),
                None => user.first_name.clone(),
            }),
            username: user.username.clone(),
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// A parsed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i32,
    pub chat: Chat,
    /// Sender id as carried by the update, absent for anonymous channel posts.
    #[serde(default)]
    pub sender_id: Option<i64>,
    /// Sender details, when the update shipped them.
    #[serde(default)]
    pub from_user: Option<User>,
    /// `true` when the message was sent by this account's session.
    #[serde(default)]
    pub outgoing: bool,
    #[serde(default)]
    pub text: Option<String>,
}

impl Message {
    /// Creates a message with no sender and no text.
    pub fn new(id: i32, chat: Chat) -> Self {
        Self {
            id,
            chat,
            sender_id: None,
            from_user: None,
            outgoing: false,
            text: None,
        }
    }

    /// Sets the text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the sender.
    pub fn with_sender(mut self, user: User) -> Self {
        self.sender_id = Some(user.id);
        self.from_user = Some(user);
        self
    }

    /// Sets the sender id without sender details.
    pub fn with_sender_id(mut self, id: i64) -> Self {
        self.sender_id = Some(id);
        self
    }

    /// Marks the message as outgoing.
    pub fn outgoing(mut self, outgoing: bool) -> Self {
        self.outgoing = outgoing;
        self
    }

    /// Returns the id of the chat this message belongs to.
    pub fn chat_id(&self) -> i64 {
        self.chat.id
    }

    /// Returns `true` if the message has a sender whose id differs from `account_id`.
    pub fn is_from_other(&self, account_id: i64) -> bool {
        self.sender_id.is_some_and(|id| id != account_id)
    }

    /// Returns `true` if the message was authored by the account itself.
    ///
    /// The message must be outgoing and, when a sender is present, the sender
    /// must be the account.
    pub fn is_own(&self, account_id: i64) -> bool {
        self.outgoing && !self.is_from_other(account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_chat_id() {
        assert_eq!(channel_chat_id(1234567890), -1001234567890);
    }

    #[test]
    fn test_private_chat_from_user() {
        let mut user = User::new(7, "Ada");
        user.last_name = Some("Lovelace".into());
        let chat = Chat::private(&user);
        assert_eq!(chat.id, 7);
        assert_eq!(chat.kind, ChatKind::Private);
        assert_eq!(chat.title.as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn test_message_ownership() {
        let chat = Chat::new(1, ChatKind::Private);
        let me = User::new(10, "me");
        let other = User::new(11, "other");

        let own = Message::new(1, chat.clone()).with_sender(me).outgoing(true);
        assert!(own.is_own(10));

        let incoming = Message::new(2, chat.clone()).with_sender(other);
        assert!(!incoming.is_own(10));
        assert!(incoming.is_from_other(10));

        // The id alone decides, with or without sender details.
        let bare = Message::new(4, chat.clone()).with_sender_id(11).outgoing(true);
        assert!(bare.is_from_other(10));
        assert!(!bare.is_own(10));

        // Outgoing channel post without a sender still counts as own.
        let anonymous = Message::new(3, chat).outgoing(true);
        assert!(anonymous.is_own(10));
        assert!(!anonymous.is_from_other(10));
    }
}
