//! 📨 The raw update, as the host hands it to us.
//!
//! 🧠 Knowledge graph:
//! - [`Update`]: typed view of one Bot API update. Exactly one payload field is set.
//! - [`IncomingUpdate`]: the typed view plus the original JSON, kept verbatim for the
//!   record's `payload` field.
//! - [`BotIdentity`]: who *we* are. Fills the receiver (`to_*`) fields.
//! - The `effective_*` accessors flatten "which payload is this" into the handful of
//!   questions the normalizer actually asks (who sent it, in which chat, which message).

pub mod types;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::value::RawValue;

pub use types::{
    BusinessConnection, BusinessMessagesDeleted, CallbackQuery, Chat, ChatBoostRemoved,
    ChatBoostUpdated, ChatJoinRequest, ChatMember, ChatMemberUpdated, ChosenInlineResult,
    InlineQuery, Message, MessageOrigin, MessageReactionCountUpdated, MessageReactionUpdated,
    User,
};

/// 🤖 The bot receiving the updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: String,
}

/// 📨 One incoming update. Exactly one of the payload fields is expected to be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub edited_message: Option<Message>,
    pub channel_post: Option<Message>,
    pub edited_channel_post: Option<Message>,
    pub business_connection: Option<BusinessConnection>,
    pub business_message: Option<Message>,
    pub edited_business_message: Option<Message>,
    pub deleted_business_messages: Option<BusinessMessagesDeleted>,
    pub message_reaction: Option<MessageReactionUpdated>,
    pub message_reaction_count: Option<MessageReactionCountUpdated>,
    pub inline_query: Option<InlineQuery>,
    pub chosen_inline_result: Option<ChosenInlineResult>,
    pub callback_query: Option<CallbackQuery>,
    pub chat_boost: Option<ChatBoostUpdated>,
    pub removed_chat_boost: Option<ChatBoostRemoved>,
    pub chat_member: Option<ChatMemberUpdated>,
    pub my_chat_member: Option<ChatMemberUpdated>,
    pub chat_join_request: Option<ChatJoinRequest>,
}

impl Update {
    /// ✉️ The message this update is about, whichever slot it arrived in.
    ///
    /// A callback query counts: its attached message is the effective one.
    pub fn effective_message(&self) -> Option<&Message> {
        self.message
            .as_ref()
            .or(self.edited_message.as_ref())
            .or(self.channel_post.as_ref())
            .or(self.edited_channel_post.as_ref())
            .or(self.business_message.as_ref())
            .or(self.edited_business_message.as_ref())
            .or_else(|| self.callback_query.as_ref()?.message.as_ref())
    }

    /// 🙋 The user who caused this update, if a user did.
    pub fn effective_sender(&self) -> Option<&User> {
        if let Some(query) = &self.callback_query {
            return query.from.as_ref();
        }
        if let Some(query) = &self.inline_query {
            return query.from.as_ref();
        }
        if let Some(chosen) = &self.chosen_inline_result {
            return chosen.from.as_ref();
        }
        if let Some(message) = self.effective_message() {
            return message.from.as_ref();
        }
        if let Some(member) = self.my_chat_member.as_ref().or(self.chat_member.as_ref()) {
            return member.from.as_ref();
        }
        if let Some(request) = &self.chat_join_request {
            return request.from.as_ref();
        }
        if let Some(connection) = &self.business_connection {
            return connection.user.as_ref();
        }
        if let Some(reaction) = &self.message_reaction {
            return reaction.user.as_ref();
        }
        if let Some(boost) = &self.chat_boost {
            return boost.boost.source.user.as_ref();
        }
        self.removed_chat_boost.as_ref()?.source.user.as_ref()
    }

    /// 📢 The chat that sent this on its own behalf (channel posts, anonymous admins).
    ///
    /// Only a message carries one. An anonymous reaction's `actor_chat` is not a sender.
    pub fn effective_sender_chat(&self) -> Option<&Chat> {
        self.effective_message()?.sender_chat.as_ref()
    }

    /// 💬 The conversation this update happened in.
    pub fn effective_chat(&self) -> Option<&Chat> {
        if let Some(message) = self.effective_message() {
            return message.chat.as_ref();
        }
        self.deleted_business_messages
            .as_ref()
            .and_then(|deleted| deleted.chat.as_ref())
            .or_else(|| self.message_reaction.as_ref()?.chat.as_ref())
            .or_else(|| self.message_reaction_count.as_ref()?.chat.as_ref())
            .or_else(|| self.my_chat_member.as_ref()?.chat.as_ref())
            .or_else(|| self.chat_member.as_ref()?.chat.as_ref())
            .or_else(|| self.chat_join_request.as_ref()?.chat.as_ref())
            .or_else(|| self.chat_boost.as_ref()?.chat.as_ref())
            .or_else(|| self.removed_chat_boost.as_ref()?.chat.as_ref())
    }

    /// 🔢 The conversation id, falling back to the business connection's private chat.
    pub fn effective_chat_id(&self) -> Option<i64> {
        self.effective_chat()
            .map(|chat| chat.id)
            .or_else(|| self.business_connection.as_ref().map(|c| c.user_chat_id))
    }

    /// 🔢 The message id, including reactions which point at a message without carrying it.
    pub fn effective_message_id(&self) -> Option<i64> {
        self.effective_message()
            .map(|message| message.message_id)
            .or_else(|| self.message_reaction.as_ref().map(|r| r.message_id))
            .or_else(|| self.message_reaction_count.as_ref().map(|r| r.message_id))
    }

    /// 💼 The business connection this update travelled through, if any.
    pub fn business_connection_id(&self) -> Option<&str> {
        self.effective_message()
            .and_then(|message| message.business_connection_id.as_deref())
            .or_else(|| self.business_connection.as_ref().map(|c| c.id.as_str()))
            .or_else(|| {
                self.deleted_business_messages
                    .as_ref()
                    .map(|d| d.business_connection_id.as_str())
            })
    }
}

/// 📦 An update plus the exact JSON it arrived as.
#[derive(Debug, Clone)]
pub struct IncomingUpdate {
    update: Update,
    raw: Box<RawValue>,
}

impl IncomingUpdate {
    /// 🚀 Parse one update from its JSON text.
    ///
    /// This is the only fallible step on the way in. Once parsed, normalization
    /// never fails; it either produces a record or quietly declines.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw = RawValue::from_string(json.trim().to_owned())
            .context("💀 The update isn't JSON. Not malformed-update JSON. Not JSON at all.")?;
        Self::from_raw(raw)
    }

    /// 🔄 Build from an already-boxed raw value (e.g. borrowed out of a larger envelope).
    pub fn from_raw(raw: Box<RawValue>) -> Result<Self> {
        let update: Update = serde_json::from_str(raw.get())
            .context("💀 The update is JSON, but not shaped like a Bot API update")?;
        Ok(Self { update, raw })
    }

    /// 🧪 Build from a `serde_json::Value`. Handy in tests and for hosts that already parsed.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Self::from_json(&value.to_string())
    }

    pub fn update(&self) -> &Update {
        &self.update
    }

    /// 📜 The update exactly as received.
    pub fn raw_json(&self) -> &str {
        self.raw.get()
    }
}
