//! 🏷️ The four closed classification domains.
//!
//! Every enum here is `#[repr(u8)]` and goes over the wire as its ordinal, not its name.
//! The collector on the other side keeps its own copy of these tables, so the order of
//! variants IS the contract. Append at the end or don't touch it. 🦆

use serde::{Serialize, Serializer};

/// 🔢 Serialize a fieldless `#[repr(u8)]` enum as its ordinal.
macro_rules! ordinal_serialize {
    ($($kind:ty),+ $(,)?) => {
        $(
            impl Serialize for $kind {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_u8(*self as u8)
                }
            }
        )+
    };
}

/// 📨 Which shape of update produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum UpdateKind {
    #[default]
    Unknown = 0,

    // messages
    Message,
    MessageEdited,
    MessagesDeleted,
    CallbackQuery,

    // boosts
    ChatBoost,
    ChatBoostRemoved,

    // inline
    InlineQuery,
    InlineResultChosen,

    // chat members
    JoinRequest,
    ChatMember,
    ChatMemberMy,

    // reactions
    MessageReactionCount,
    MessageReactions,
}

/// 💬 What kind of party is on the other end: a person, or some flavour of chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ChatKind {
    #[default]
    Unknown = 0,
    User,
    Channel,
    Group,
    Supergroup,
    Forum,
}

/// 🧾 What the message carries.
///
/// Declared in the same order the classifier tests the message fields, so
/// `Text < Link < Photo < ...` is also the precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MessageKind {
    #[default]
    Unsupported = 0,
    Text,
    Link,
    Photo,
    Document,
    Video,
    Sticker,
    Animation,
    Voice,
    Audio,
    Dice,
    VideoNote,
    Contact,
    Game,
    Poll,
    Invoice,
    Venue,
    Location,
    NewChatMembers,
    LeftChatMember,
    NewChatTitle,
    NewChatPhoto,
    DeletedChatPhoto,
    GroupCreated,
    SupergroupCreated,
    ChannelCreated,
    AutoDeleteTimerChanged,
    ChatMigratedTo,
    ChatMigratedFrom,
    PinnedMessage,
    UserShared,
    WriteAccessAllowed,
    ForumTopicCreated,
    ForumTopicEdited,
    ForumTopicClosed,
    ForumTopicReopened,
    VideoChatScheduled,
    VideoChatStarted,
    VideoChatEnded,
    Giveaway,
    SuccessfulPayment,
    RefundedPayment,
}

/// 🚪 Where a member stands in a chat, before or after a membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MemberStatusKind {
    #[default]
    Unknown = 0,
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Banned,
}

ordinal_serialize!(UpdateKind, ChatKind, MessageKind, MemberStatusKind);
