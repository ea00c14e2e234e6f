//! 📜 Classification cascades.
//!
//! Each cascade is an ordered table of `(predicate, kind)` pairs. The first predicate that
//! says yes wins and nothing below it is consulted. Order in these tables IS precedence;
//! reordering rows changes what gets recorded.

use crate::schema::{ChatKind, MemberStatusKind, MessageKind, UpdateKind};
use crate::update::{Chat, ChatMember, Message, Update};

type Rule<T, K> = (fn(&T) -> bool, K);

/// 📨 Which update shape is this. Message slots first, reactions last.
pub(crate) const UPDATE_KIND_RULES: &[Rule<Update, UpdateKind>] = &[
    (
        |u| u.message.is_some() || u.channel_post.is_some() || u.business_message.is_some(),
        UpdateKind::Message,
    ),
    (
        |u| {
            u.edited_message.is_some()
                || u.edited_channel_post.is_some()
                || u.edited_business_message.is_some()
        },
        UpdateKind::MessageEdited,
    ),
    (|u| u.deleted_business_messages.is_some(), UpdateKind::MessagesDeleted),
    (|u| u.callback_query.is_some(), UpdateKind::CallbackQuery),
    (|u| u.chat_boost.is_some(), UpdateKind::ChatBoost),
    (|u| u.removed_chat_boost.is_some(), UpdateKind::ChatBoostRemoved),
    (|u| u.inline_query.is_some(), UpdateKind::InlineQuery),
    (|u| u.chosen_inline_result.is_some(), UpdateKind::InlineResultChosen),
    (|u| u.chat_join_request.is_some(), UpdateKind::JoinRequest),
    (|u| u.chat_member.is_some(), UpdateKind::ChatMember),
    (|u| u.my_chat_member.is_some(), UpdateKind::ChatMemberMy),
    (|u| u.message_reaction_count.is_some(), UpdateKind::MessageReactionCount),
    (|u| u.message_reaction.is_some(), UpdateKind::MessageReactions),
];

/// 🧾 What the message carries. Text beats everything; payments come last.
pub(crate) const MESSAGE_KIND_RULES: &[Rule<Message, MessageKind>] = &[
    (
        |m| m.text.as_deref().is_some_and(|text| !text.is_empty()),
        MessageKind::Text,
    ),
    (
        |m| {
            m.link_preview_options
                .as_ref()
                .and_then(|options| options.url.as_deref())
                .is_some_and(|url| !url.is_empty())
        },
        MessageKind::Link,
    ),
    (|m| m.photo.is_some(), MessageKind::Photo),
    (|m| m.document.is_some(), MessageKind::Document),
    (|m| m.video.is_some(), MessageKind::Video),
    (|m| m.sticker.is_some(), MessageKind::Sticker),
    (|m| m.animation.is_some(), MessageKind::Animation),
    (|m| m.voice.is_some(), MessageKind::Voice),
    (|m| m.audio.is_some(), MessageKind::Audio),
    (|m| m.dice.is_some(), MessageKind::Dice),
    (|m| m.video_note.is_some(), MessageKind::VideoNote),
    (|m| m.contact.is_some(), MessageKind::Contact),
    (|m| m.game.is_some(), MessageKind::Game),
    (|m| m.poll.is_some(), MessageKind::Poll),
    (|m| m.invoice.is_some(), MessageKind::Invoice),
    (|m| m.venue.is_some(), MessageKind::Venue),
    (|m| m.location.is_some(), MessageKind::Location),
    (|m| m.new_chat_members.is_some(), MessageKind::NewChatMembers),
    (|m| m.left_chat_member.is_some(), MessageKind::LeftChatMember),
    (|m| m.new_chat_title.is_some(), MessageKind::NewChatTitle),
    (|m| m.new_chat_photo.is_some(), MessageKind::NewChatPhoto),
    (|m| m.delete_chat_photo.is_some(), MessageKind::DeletedChatPhoto),
    (|m| m.group_chat_created.is_some(), MessageKind::GroupCreated),
    (|m| m.supergroup_chat_created.is_some(), MessageKind::SupergroupCreated),
    (|m| m.channel_chat_created.is_some(), MessageKind::ChannelCreated),
    (
        |m| m.message_auto_delete_timer_changed.is_some(),
        MessageKind::AutoDeleteTimerChanged,
    ),
    (|m| m.migrate_to_chat_id.is_some(), MessageKind::ChatMigratedTo),
    (|m| m.migrate_from_chat_id.is_some(), MessageKind::ChatMigratedFrom),
    (|m| m.pinned_message.is_some(), MessageKind::PinnedMessage),
    (|m| m.users_shared.is_some(), MessageKind::UserShared),
    (|m| m.write_access_allowed.is_some(), MessageKind::WriteAccessAllowed),
    (|m| m.forum_topic_created.is_some(), MessageKind::ForumTopicCreated),
    (|m| m.forum_topic_edited.is_some(), MessageKind::ForumTopicEdited),
    (|m| m.forum_topic_closed.is_some(), MessageKind::ForumTopicClosed),
    (|m| m.forum_topic_reopened.is_some(), MessageKind::ForumTopicReopened),
    (|m| m.video_chat_scheduled.is_some(), MessageKind::VideoChatScheduled),
    (|m| m.video_chat_started.is_some(), MessageKind::VideoChatStarted),
    (|m| m.video_chat_ended.is_some(), MessageKind::VideoChatEnded),
    (|m| m.giveaway.is_some(), MessageKind::Giveaway),
    (|m| m.successful_payment.is_some(), MessageKind::SuccessfulPayment),
    (|m| m.refunded_payment.is_some(), MessageKind::RefundedPayment),
];

/// 🎯 Walk a cascade top to bottom; first hit wins.
pub(crate) fn first_match<T, K: Copy>(rules: &[Rule<T, K>], subject: &T) -> Option<K> {
    rules
        .iter()
        .find(|(matches, _)| matches(subject))
        .map(|(_, kind)| *kind)
}

pub(crate) fn update_kind(update: &Update) -> Option<UpdateKind> {
    first_match(UPDATE_KIND_RULES, update)
}

pub(crate) fn message_kind(message: Option<&Message>) -> MessageKind {
    message
        .and_then(|m| first_match(MESSAGE_KIND_RULES, m))
        .unwrap_or_default()
}

/// 💬 Forum flag outranks the type string; then supergroup, channel, group, private.
pub(crate) fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_forum.unwrap_or(false) {
        return ChatKind::Forum;
    }
    match chat.kind.as_str() {
        "supergroup" => ChatKind::Supergroup,
        "channel" => ChatKind::Channel,
        "group" => ChatKind::Group,
        "private" => ChatKind::User,
        _ => ChatKind::Unknown,
    }
}

/// 🙋 Who spoke. A user if there is one; otherwise the chat speaking for itself.
///
/// A private chat never speaks without a user, so it does not count as an originator.
pub(crate) fn originator_kind(update: &Update) -> Option<ChatKind> {
    if update.effective_sender().is_some() {
        return Some(ChatKind::User);
    }
    let chat = update
        .effective_sender_chat()
        .or_else(|| update.effective_chat())?;
    match chat_kind(chat) {
        ChatKind::User | ChatKind::Unknown => None,
        resolved => Some(resolved),
    }
}

pub(crate) fn member_status(member: Option<&ChatMember>) -> MemberStatusKind {
    match member.map(|m| m.status.as_str()) {
        Some("creator") => MemberStatusKind::Creator,
        Some("administrator") => MemberStatusKind::Administrator,
        Some("member") => MemberStatusKind::Member,
        Some("restricted") => MemberStatusKind::Restricted,
        Some("left") => MemberStatusKind::Left,
        Some("kicked") => MemberStatusKind::Banned,
        _ => MemberStatusKind::Unknown,
    }
}
