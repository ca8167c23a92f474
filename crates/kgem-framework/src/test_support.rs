//! Shared fixtures for the framework tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use kgem_core::{Account, BoxedClient, Chat, ChatKind, Client, ClientError, ClientResult, Message, User};

pub(crate) const OWN_ID: i64 = 1000;
pub(crate) const OTHER_ID: i64 = 2000;

/// A client that answers lookups from in-memory tables.
pub(crate) struct MockClient {
    account: Account,
    chats: HashMap<i64, Chat>,
    discussions: HashMap<(i64, i32), Message>,
    failing: bool,
    lookups: AtomicUsize,
}

impl MockClient {
    pub(crate) fn new() -> Self {
        Self {
            account: Account::new(OWN_ID).with_name("tester"),
            chats: HashMap::new(),
            discussions: HashMap::new(),
            failing: false,
            lookups: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_chat(mut self, chat: Chat) -> Self {
        self.chats.insert(chat.id, chat);
        self
    }

    pub(crate) fn with_discussion(mut self, chat_id: i64, top_msg_id: i32, message: Message) -> Self {
        self.discussions.insert((chat_id, top_msg_id), message);
        self
    }

    /// Makes every lookup fail with an API error.
    pub(crate) fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn boxed(self) -> BoxedClient {
        Arc::new(self)
    }
}

#[async_trait]
impl Client for MockClient {
    fn account(&self) -> &Account {
        &self.account
    }

    async fn get_chat(&self, chat_id: i64) -> ClientResult<Chat> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(ClientError::api("flood wait"));
        }
        self.chats
            .get(&chat_id)
            .cloned()
            .ok_or(ClientError::unknown_peer(chat_id))
    }

    async fn get_discussion_message(&self, chat_id: i64, message_id: i32) -> ClientResult<Message> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(ClientError::api("flood wait"));
        }
        self.discussions
            .get(&(chat_id, message_id))
            .cloned()
            .ok_or(ClientError::unknown_peer(chat_id))
    }
}

pub(crate) fn me() -> User {
    User::new(OWN_ID, "me")
}

pub(crate) fn other() -> User {
    User::new(OTHER_ID, "other")
}

/// A message the account sent into chat `chat_id`.
pub(crate) fn own_message(chat_id: i64, text: &str) -> Arc<Message> {
    Arc::new(
        Message::new(1, Chat::new(chat_id, ChatKind::Supergroup))
            .with_text(text)
            .with_sender(me())
            .outgoing(true),
    )
}

/// A message somebody else sent into chat `chat_id`.
pub(crate) fn incoming_message(chat_id: i64, text: &str) -> Arc<Message> {
    Arc::new(
        Message::new(2, Chat::new(chat_id, ChatKind::Supergroup))
            .with_text(text)
            .with_sender(other()),
    )
}
