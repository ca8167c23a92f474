//! Raw update resolution.
//!
//! [`resolve_event`] turns the raw update shapes the managers care about into
//! an [`Event`]. Chats come from the lookup tables shipped with the update
//! first, and from the client only on a miss. A peer the client does not know
//! drops the update; any other client failure is an error.

use std::collections::HashMap;
use std::sync::Arc;

use kgem_core::{Chat, Client, ClientResult, Message, Peer, RawMessage, RawUpdate, User};
use tracing::debug;

use super::model::{DeletedMessages, EditedMessage, Event, EventKind, MessageRead, NewMessage};

/// Users and chats shipped alongside a raw update, keyed by bare id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateLookups {
    pub users: HashMap<i64, User>,
    pub chats: HashMap<i64, Chat>,
}

impl UpdateLookups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id, user);
        self
    }

    /// Adds a chat under its bare (unmarked) id.
    pub fn with_chat(mut self, bare_id: i64, chat: Chat) -> Self {
        self.chats.insert(bare_id, chat);
        self
    }

    pub fn user(&self, id: i64) -> Option<&User> {
        self.users.get(&id)
    }

    /// The chat `peer` refers to, if the tables know it.
    ///
    /// User ids and chat ids are separate spaces, so only the table matching
    /// the peer type is consulted.
    pub fn peer_chat(&self, peer: Peer) -> Option<Chat> {
        match peer {
            Peer::User(id) => self.users.get(&id).map(Chat::private),
            Peer::Chat(id) | Peer::Channel(id) => self.chats.get(&id).cloned(),
        }
    }
}

/// Resolves a raw update into an event.
///
/// Returns `Ok(None)` for update kinds without an event and for updates
/// whose chat the client does not know.
pub async fn resolve_event(
    client: &dyn Client,
    update: &RawUpdate,
    lookups: &UpdateLookups,
) -> ClientResult<Option<Event>> {
    let kind = match update {
        RawUpdate::ReadHistoryInbox { peer, max_id } => {
            let chat = peer_chat(client, lookups, *peer).await?;
            message_read(chat, *max_id, true)
        }
        RawUpdate::ReadHistoryOutbox { peer, max_id } => {
            let chat = peer_chat(client, lookups, *peer).await?;
            message_read(chat, *max_id, false)
        }
        RawUpdate::ReadChannelInbox { channel_id, max_id } => {
            let chat = peer_chat(client, lookups, Peer::Channel(*channel_id)).await?;
            message_read(chat, *max_id, true)
        }
        RawUpdate::ReadChannelOutbox { channel_id, max_id } => {
            let chat = peer_chat(client, lookups, Peer::Channel(*channel_id)).await?;
            message_read(chat, *max_id, false)
        }
        RawUpdate::ReadChannelDiscussionInbox {
            channel_id,
            top_msg_id,
            read_max_id,
        }
        | RawUpdate::ReadChannelDiscussionOutbox {
            channel_id,
            top_msg_id,
            read_max_id,
        } => {
            let chat = discussion_chat(client, *channel_id, *top_msg_id).await?;
            message_read(chat, *read_max_id, true)
        }
        RawUpdate::NewMessage { message } | RawUpdate::NewChannelMessage { message } => {
            parse_message(client, lookups, message)
                .await?
                .map(|message| EventKind::NewMessage(Arc::new(NewMessage { message })))
        }
        RawUpdate::DeleteMessages { messages } => Some(EventKind::DeletedMessages(Arc::new(DeletedMessages {
            message_ids: messages.clone(),
            chat: None,
        }))),
        RawUpdate::DeleteChannelMessages { channel_id, messages } => {
            peer_chat(client, lookups, Peer::Channel(*channel_id))
                .await?
                .map(|chat| {
                    EventKind::DeletedMessages(Arc::new(DeletedMessages {
                        message_ids: messages.clone(),
                        chat: Some(chat),
                    }))
                })
        }
        RawUpdate::EditMessage { message } | RawUpdate::EditChannelMessage { message } => {
            parse_message(client, lookups, message)
                .await?
                .map(|message| EventKind::EditedMessage(Arc::new(EditedMessage { message })))
        }
        RawUpdate::Other { .. } => None,
    };

    if kind.is_none() {
        debug!(update = update.name(), "Update resolved to no event");
    }

    Ok(kind.map(|kind| Event::new(client.account().clone(), kind)))
}

fn message_read(chat: Option<Chat>, last_read_id: i32, by_me: bool) -> Option<EventKind> {
    chat.map(|chat| {
        EventKind::MessageRead(Arc::new(MessageRead {
            chat,
            last_read_id,
            by_me,
        }))
    })
}

/// Maps an unknown-peer failure to `None`.
fn known<T>(result: ClientResult<T>) -> ClientResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(error) if error.is_unknown_peer() => {
            debug!(error = %error, "Dropping update for unknown peer");
            Ok(None)
        }
        Err(error) => Err(error),
    }
}

async fn peer_chat(client: &dyn Client, lookups: &UpdateLookups, peer: Peer) -> ClientResult<Option<Chat>> {
    if let Some(chat) = lookups.peer_chat(peer) {
        return Ok(Some(chat));
    }
    known(client.get_chat(peer.marked_id()).await)
}

async fn discussion_chat(client: &dyn Client, channel_id: i64, top_msg_id: i32) -> ClientResult<Option<Chat>> {
    let chat_id = Peer::Channel(channel_id).marked_id();
    let message = known(client.get_discussion_message(chat_id, top_msg_id).await)?;
    Ok(message.map(|message| message.chat))
}

async fn parse_message(
    client: &dyn Client,
    lookups: &UpdateLookups,
    raw: &RawMessage,
) -> ClientResult<Option<Message>> {
    let Some(chat) = peer_chat(client, lookups, raw.peer).await? else {
        return Ok(None);
    };

    Ok(Some(Message {
        id: raw.id,
        chat,
        sender_id: raw.from_id,
        from_user: raw.from_id.and_then(|id| lookups.user(id).cloned()),
        outgoing: raw.out,
        text: raw.text.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockClient, OTHER_ID, OWN_ID, me, other};
    use kgem_core::{ChatKind, channel_chat_id};

    fn raw_message(peer: Peer, from_id: Option<i64>, out: bool) -> RawMessage {
        RawMessage {
            id: 7,
            peer,
            from_id,
            out,
            text: Some("hi".into()),
        }
    }

    fn read_payload(event: &Event) -> &MessageRead {
        match &event.kind {
            EventKind::MessageRead(read) => read,
            other => panic!("expected a read event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_history_read_uses_lookups() {
        let client = MockClient::new();
        let lookups = UpdateLookups::new().with_user(other());
        let update = RawUpdate::ReadHistoryInbox {
            peer: Peer::User(OTHER_ID),
            max_id: 10,
        };

        let event = resolve_event(&client, &update, &lookups).await.unwrap().unwrap();
        let read = read_payload(&event);
        assert_eq!(read.chat.id, OTHER_ID);
        assert_eq!(read.chat.kind, ChatKind::Private);
        assert_eq!(read.last_read_id, 10);
        assert!(read.by_me);
        assert_eq!(event.account.id, OWN_ID);
        assert_eq!(client.lookups(), 0);
    }

    #[tokio::test]
    async fn test_read_directions() {
        let channel = Chat::new(channel_chat_id(5), ChatKind::Channel);
        let group = Chat::new(-9, ChatKind::Group);
        let client = MockClient::new().with_chat(channel).with_chat(group);
        let lookups = UpdateLookups::new();

        let cases = [
            (RawUpdate::ReadHistoryInbox { peer: Peer::Chat(9), max_id: 1 }, true),
            (RawUpdate::ReadHistoryOutbox { peer: Peer::Chat(9), max_id: 1 }, false),
            (RawUpdate::ReadChannelInbox { channel_id: 5, max_id: 1 }, true),
            (RawUpdate::ReadChannelOutbox { channel_id: 5, max_id: 1 }, false),
        ];

        for (update, by_me) in cases {
            let event = resolve_event(&client, &update, &lookups).await.unwrap().unwrap();
            assert_eq!(read_payload(&event).by_me, by_me, "{}", update.name());
        }
    }

    #[tokio::test]
    async fn test_lookups_respect_peer_type() {
        let channel = Chat::new(channel_chat_id(5), ChatKind::Channel);
        let lookups = UpdateLookups::new()
            .with_user(User::new(5, "five"))
            .with_chat(5, channel.clone());

        assert_eq!(lookups.peer_chat(Peer::Channel(5)), Some(channel.clone()));
        assert_eq!(lookups.peer_chat(Peer::User(5)).map(|c| c.kind), Some(ChatKind::Private));

        let client = MockClient::new();
        let update = RawUpdate::ReadChannelOutbox {
            channel_id: 5,
            max_id: 2,
        };
        let event = resolve_event(&client, &update, &lookups).await.unwrap().unwrap();
        assert_eq!(read_payload(&event).chat, channel);
        assert_eq!(client.lookups(), 0);

        // A user-only table never answers for a basic group with the same id.
        let users_only = UpdateLookups::new().with_user(User::new(9, "nine"));
        assert_eq!(users_only.peer_chat(Peer::Chat(9)), None);
    }

    #[tokio::test]
    async fn test_channel_read_fetches_marked_id() {
        let channel = Chat::new(channel_chat_id(5), ChatKind::Channel);
        let client = MockClient::new().with_chat(channel.clone());
        let update = RawUpdate::ReadChannelOutbox {
            channel_id: 5,
            max_id: 3,
        };

        let event = resolve_event(&client, &update, &UpdateLookups::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read_payload(&event).chat, channel);
        assert_eq!(client.lookups(), 1);
    }

    #[tokio::test]
    async fn test_discussion_reads_take_the_thread_chat() {
        let thread_chat = Chat::new(channel_chat_id(77), ChatKind::Supergroup);
        let root = Message::new(100, thread_chat.clone());
        let client = MockClient::new().with_discussion(channel_chat_id(5), 100, root);

        for update in [
            RawUpdate::ReadChannelDiscussionInbox {
                channel_id: 5,
                top_msg_id: 100,
                read_max_id: 120,
            },
            RawUpdate::ReadChannelDiscussionOutbox {
                channel_id: 5,
                top_msg_id: 100,
                read_max_id: 120,
            },
        ] {
            let event = resolve_event(&client, &update, &UpdateLookups::new())
                .await
                .unwrap()
                .unwrap();
            let read = read_payload(&event);
            assert_eq!(read.chat, thread_chat);
            assert_eq!(read.last_read_id, 120);
            assert!(read.by_me);
        }
    }

    #[tokio::test]
    async fn test_unknown_peer_yields_no_event() {
        let client = MockClient::new();
        let lookups = UpdateLookups::new();
        let updates = [
            RawUpdate::ReadHistoryInbox {
                peer: Peer::User(404),
                max_id: 1,
            },
            RawUpdate::ReadChannelDiscussionInbox {
                channel_id: 404,
                top_msg_id: 1,
                read_max_id: 1,
            },
            RawUpdate::DeleteChannelMessages {
                channel_id: 404,
                messages: vec![1],
            },
            RawUpdate::NewMessage {
                message: raw_message(Peer::Chat(404), None, false),
            },
        ];

        for update in updates {
            let event = resolve_event(&client, &update, &lookups).await.unwrap();
            assert!(event.is_none(), "{}", update.name());
        }
    }

    #[tokio::test]
    async fn test_other_client_errors_propagate() {
        let client = MockClient::new().failing();
        let update = RawUpdate::ReadChannelInbox {
            channel_id: 5,
            max_id: 1,
        };
        let err = resolve_event(&client, &update, &UpdateLookups::new())
            .await
            .unwrap_err();
        assert!(!err.is_unknown_peer());
    }

    #[tokio::test]
    async fn test_new_and_edited_messages_are_parsed() {
        let client = MockClient::new();
        let group = Chat::new(-9, ChatKind::Group);
        let lookups = UpdateLookups::new().with_user(me()).with_chat(9, group.clone());

        let update = RawUpdate::NewMessage {
            message: raw_message(Peer::Chat(9), Some(OWN_ID), true),
        };
        let event = resolve_event(&client, &update, &lookups).await.unwrap().unwrap();
        let EventKind::NewMessage(new) = &event.kind else {
            panic!("expected a new message");
        };
        assert_eq!(new.message.chat, group);
        assert_eq!(new.message.from_user, Some(me()));
        assert_eq!(new.message.sender_id, Some(OWN_ID));
        assert!(new.message.outgoing);
        assert_eq!(new.message.text.as_deref(), Some("hi"));

        let update = RawUpdate::EditChannelMessage {
            message: raw_message(Peer::Chat(9), None, false),
        };
        let event = resolve_event(&client, &update, &lookups).await.unwrap().unwrap();
        assert_eq!(event.name(), "edited_message");
    }

    #[tokio::test]
    async fn test_deletions() {
        let channel = Chat::new(channel_chat_id(5), ChatKind::Channel);
        let client = MockClient::new().with_chat(channel.clone());
        let lookups = UpdateLookups::new();

        let plain = RawUpdate::DeleteMessages { messages: vec![1, 2] };
        let event = resolve_event(&client, &plain, &lookups).await.unwrap().unwrap();
        let EventKind::DeletedMessages(deleted) = &event.kind else {
            panic!("expected a deletion");
        };
        assert_eq!(deleted.message_ids, vec![1, 2]);
        assert!(deleted.chat.is_none());

        let scoped = RawUpdate::DeleteChannelMessages {
            channel_id: 5,
            messages: vec![3],
        };
        let event = resolve_event(&client, &scoped, &lookups).await.unwrap().unwrap();
        let EventKind::DeletedMessages(deleted) = &event.kind else {
            panic!("expected a deletion");
        };
        assert_eq!(deleted.chat, Some(channel));
    }

    #[tokio::test]
    async fn test_other_updates_have_no_event() {
        let client = MockClient::new();
        let update = RawUpdate::Other {
            name: "user_typing".into(),
        };
        assert!(
            resolve_event(&client, &update, &UpdateLookups::new())
                .await
                .unwrap()
                .is_none()
        );
    }
}
