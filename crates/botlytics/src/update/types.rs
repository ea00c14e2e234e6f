//! 🧩 Bot API object shapes, as much of them as the normalizer reads.
//!
//! Everything is `#[serde(default)]` and lenient: unknown fields are ignored and missing
//! ones fall back to zero values, because a malformed corner of one update must not cost
//! us the whole record. Fields the classifier only tests for presence are typed as
//! [`IgnoredAny`], so we never pay to build a photo array we are about to throw away.

use serde::Deserialize;
use serde::de::IgnoredAny;

/// 🙋 A user (or bot) account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub is_premium: Option<bool>,
}

/// 💬 A chat: private, group, supergroup, or channel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Chat {
    pub id: i64,
    /// `"private"`, `"group"`, `"supergroup"` or `"channel"`
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_forum: Option<bool>,
}

/// ↪️ Where a forwarded message originally came from.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageOrigin {
    User {
        #[serde(default)]
        date: i64,
        #[serde(default)]
        sender_user: User,
    },
    HiddenUser {
        #[serde(default)]
        date: i64,
        #[serde(default)]
        sender_user_name: String,
    },
    Chat {
        #[serde(default)]
        date: i64,
        #[serde(default)]
        sender_chat: Chat,
        #[serde(default)]
        author_signature: Option<String>,
    },
    Channel {
        #[serde(default)]
        date: i64,
        #[serde(default)]
        chat: Chat,
        #[serde(default)]
        message_id: i64,
        #[serde(default)]
        author_signature: Option<String>,
    },
    /// 🤷 An origin type newer than this crate.
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkPreviewOptions {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExternalReplyInfo {
    pub message_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TextQuote {
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Dice {
    pub emoji: String,
    pub value: i64,
}

/// ✉️ A message, an edited message, a channel post, a business message... same shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Message {
    pub message_id: i64,
    pub message_thread_id: Option<i64>,
    pub from: Option<User>,
    pub sender_chat: Option<Chat>,
    pub sender_boost_count: Option<i64>,
    pub business_connection_id: Option<String>,
    /// Unix seconds
    pub date: i64,
    pub chat: Option<Chat>,
    pub forward_origin: Option<MessageOrigin>,
    pub is_topic_message: Option<bool>,
    pub is_automatic_forward: Option<bool>,
    pub external_reply: Option<ExternalReplyInfo>,
    pub quote: Option<TextQuote>,
    pub author_signature: Option<String>,
    pub effect_id: Option<String>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub link_preview_options: Option<LinkPreviewOptions>,
    pub dice: Option<Dice>,

    // presence-only payloads, in classification order
    pub photo: Option<IgnoredAny>,
    pub document: Option<IgnoredAny>,
    pub video: Option<IgnoredAny>,
    pub sticker: Option<IgnoredAny>,
    pub animation: Option<IgnoredAny>,
    pub voice: Option<IgnoredAny>,
    pub audio: Option<IgnoredAny>,
    pub video_note: Option<IgnoredAny>,
    pub contact: Option<IgnoredAny>,
    pub game: Option<IgnoredAny>,
    pub poll: Option<IgnoredAny>,
    pub invoice: Option<IgnoredAny>,
    pub venue: Option<IgnoredAny>,
    pub location: Option<IgnoredAny>,
    pub new_chat_members: Option<IgnoredAny>,
    pub left_chat_member: Option<IgnoredAny>,
    pub new_chat_title: Option<IgnoredAny>,
    pub new_chat_photo: Option<IgnoredAny>,
    pub delete_chat_photo: Option<IgnoredAny>,
    pub group_chat_created: Option<IgnoredAny>,
    pub supergroup_chat_created: Option<IgnoredAny>,
    pub channel_chat_created: Option<IgnoredAny>,
    pub message_auto_delete_timer_changed: Option<IgnoredAny>,
    pub migrate_to_chat_id: Option<IgnoredAny>,
    pub migrate_from_chat_id: Option<IgnoredAny>,
    pub pinned_message: Option<IgnoredAny>,
    pub users_shared: Option<IgnoredAny>,
    pub write_access_allowed: Option<IgnoredAny>,
    pub forum_topic_created: Option<IgnoredAny>,
    pub forum_topic_edited: Option<IgnoredAny>,
    pub forum_topic_closed: Option<IgnoredAny>,
    pub forum_topic_reopened: Option<IgnoredAny>,
    pub video_chat_scheduled: Option<IgnoredAny>,
    pub video_chat_started: Option<IgnoredAny>,
    pub video_chat_ended: Option<IgnoredAny>,
    pub giveaway: Option<IgnoredAny>,
    pub successful_payment: Option<IgnoredAny>,
    pub refunded_payment: Option<IgnoredAny>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CallbackQuery {
    pub id: String,
    pub from: Option<User>,
    pub message: Option<Message>,
    pub inline_message_id: Option<String>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InlineQuery {
    pub id: String,
    pub from: Option<User>,
    pub query: String,
    pub offset: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChosenInlineResult {
    pub result_id: String,
    pub from: Option<User>,
    pub query: String,
    pub inline_message_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatJoinRequest {
    pub chat: Option<Chat>,
    pub from: Option<User>,
    pub date: i64,
}

/// 🚪 One side of a membership change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatMember {
    /// `"creator"`, `"administrator"`, `"member"`, `"restricted"`, `"left"`, `"kicked"`
    pub status: String,
    pub user: User,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatMemberUpdated {
    pub chat: Option<Chat>,
    pub from: Option<User>,
    pub date: i64,
    pub old_chat_member: ChatMember,
    pub new_chat_member: ChatMember,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatBoostSource {
    pub source: String,
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatBoost {
    pub boost_id: String,
    pub source: ChatBoostSource,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatBoostUpdated {
    pub chat: Option<Chat>,
    pub boost: ChatBoost,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatBoostRemoved {
    pub chat: Option<Chat>,
    pub boost_id: String,
    pub source: ChatBoostSource,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageReactionUpdated {
    pub chat: Option<Chat>,
    pub message_id: i64,
    pub user: Option<User>,
    pub actor_chat: Option<Chat>,
    pub date: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageReactionCountUpdated {
    pub chat: Option<Chat>,
    pub message_id: i64,
    pub date: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BusinessConnection {
    pub id: String,
    pub user: Option<User>,
    pub user_chat_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BusinessMessagesDeleted {
    pub business_connection_id: String,
    pub chat: Option<Chat>,
    pub message_ids: Vec<i64>,
}
