//! 🧭 The normalizer: one raw update in, zero or one flat record out.
//!
//! 🧠 Knowledge graph:
//! - [`rules`]: the ordered `(predicate, kind)` cascades. First match wins.
//! - [`forward`]: the forward-origin projection.
//! - [`Normalizer`]: holds the bot identity (the `to_*` columns) and a pair of counters.
//!   It never errors and never panics. An update it cannot place is dropped, counted,
//!   and mentioned at `trace!` level, and that's the whole story.
//!
//! 🦆 The duck asked what happens to updates with no sender. They go where the socks go.

pub(crate) mod forward;
pub(crate) mod rules;

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use chrono::Utc;
use tracing::trace;

use crate::config::ConfigError;
use crate::schema::NormalizedRecord;
use crate::update::{BotIdentity, IncomingUpdate};
use self::forward::{ForwardFields, unix_seconds};

/// 🗑️ Why an update did not become a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// None of the known payload fields was set.
    UnknownUpdateKind,
    /// No user, and the chat that spoke is private or unrecognised.
    UnresolvedOriginator,
    /// Everything that could name the originator was missing or zero.
    MissingOriginatorId,
}

impl DropReason {
    fn as_str(self) -> &'static str {
        match self {
            DropReason::UnknownUpdateKind => "no recognised payload",
            DropReason::UnresolvedOriginator => "originator kind unresolved",
            DropReason::MissingOriginatorId => "originator id missing",
        }
    }
}

/// 📊 How many updates went each way, since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizerStats {
    pub normalized: u64,
    pub dropped: u64,
}

/// 🧭 Turns updates into records on behalf of one bot.
#[derive(Debug)]
pub struct Normalizer {
    me: BotIdentity,
    normalized: AtomicU64,
    dropped: AtomicU64,
}

impl Normalizer {
    /// 🏗️ Bind a normalizer to the bot receiving the updates.
    ///
    /// A zero bot id would make every record's `to` zero, which the collector treats
    /// as "absent". That is refused here rather than discovered downstream.
    pub fn new(me: BotIdentity) -> Result<Self> {
        if me.id == 0 {
            return Err(ConfigError::ZeroBotId.into());
        }
        Ok(Self {
            me,
            normalized: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    pub fn me(&self) -> &BotIdentity {
        &self.me
    }

    pub fn stats(&self) -> NormalizerStats {
        NormalizerStats {
            normalized: self.normalized.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    /// 🎯 Classify and flatten one update. `None` means "not analytics-worthy".
    pub fn normalize(&self, incoming: &IncomingUpdate) -> Option<NormalizedRecord> {
        match flatten(incoming, &self.me) {
            Ok(record) => {
                self.normalized.fetch_add(1, Ordering::Relaxed);
                Some(record)
            }
            Err(reason) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!(
                    update_id = incoming.update().update_id,
                    "🗑️ update dropped: {}",
                    reason.as_str()
                );
                None
            }
        }
    }
}

/// 🎯 One-shot normalization without keeping a [`Normalizer`] around.
///
/// Same rules, no counters. A bot with a zero id cannot address a record, so every
/// update comes back `None`, exactly as if nobody had sent it.
pub fn normalize(incoming: &IncomingUpdate, me: &BotIdentity) -> Option<NormalizedRecord> {
    if me.id == 0 {
        return None;
    }
    flatten(incoming, me).ok()
}

fn non_zero(id: i64) -> Option<i64> {
    (id != 0).then_some(id)
}

/// 🏗️ The projection itself. Every field is a direct read with a zero-value fallback.
fn flatten(
    incoming: &IncomingUpdate,
    me: &BotIdentity,
) -> std::result::Result<NormalizedRecord, DropReason> {
    let update = incoming.update();

    let update_type = rules::update_kind(update).ok_or(DropReason::UnknownUpdateKind)?;
    let from_type = rules::originator_kind(update).ok_or(DropReason::UnresolvedOriginator)?;

    let sender = update.effective_sender();
    let sender_chat = update.effective_sender_chat();
    let chat = update.effective_chat();
    let message = update.effective_message();

    let from = sender
        .and_then(|user| non_zero(user.id))
        .or_else(|| sender_chat.and_then(|c| non_zero(c.id)))
        .or_else(|| chat.and_then(|c| non_zero(c.id)))
        .ok_or(DropReason::MissingOriginatorId)?;

    let forward = ForwardFields::from_origin(message.and_then(|m| m.forward_origin.as_ref()));
    let member = update.chat_member.as_ref();
    let member_user = member.map(|m| &m.new_chat_member.user);
    let callback = update.callback_query.as_ref();
    let inline = update.inline_query.as_ref();
    let chosen = update.chosen_inline_result.as_ref();
    let dice = message.and_then(|m| m.dice.as_ref());

    Ok(NormalizedRecord {
        timestamp: Utc::now(),
        update_type,
        to: me.id,
        from,

        from_bot: sender.is_some_and(|u| u.is_bot),
        from_firstname: sender.map(|u| u.first_name.clone()).unwrap_or_default(),
        from_lastname: sender.and_then(|u| u.last_name.clone()).unwrap_or_default(),
        from_username: sender
            .and_then(|u| u.username.clone())
            .or_else(|| sender_chat.and_then(|c| c.username.clone()))
            .unwrap_or_default(),
        from_languagecode: sender
            .and_then(|u| u.language_code.clone())
            .unwrap_or_default(),
        from_premium: sender.and_then(|u| u.is_premium).unwrap_or(false),
        from_type,
        from_title: sender_chat.and_then(|c| c.title.clone()).unwrap_or_default(),
        from_businessconnection: update
            .business_connection_id()
            .map(str::to_owned)
            .unwrap_or_default(),
        from_boostcount: message.and_then(|m| m.sender_boost_count).unwrap_or(0),
        from_signature: message
            .and_then(|m| m.author_signature.clone())
            .unwrap_or_default(),

        to_bot: true,
        to_firstname: me.first_name.clone(),
        to_lastname: me.last_name.clone().unwrap_or_default(),
        to_username: me.username.clone(),

        chat_id: update.effective_chat_id().unwrap_or(0),
        chat_username: chat.and_then(|c| c.username.clone()).unwrap_or_default(),
        chat_title: chat.and_then(|c| c.title.clone()).unwrap_or_default(),
        chat_firstname: chat.and_then(|c| c.first_name.clone()).unwrap_or_default(),
        chat_lastname: chat.and_then(|c| c.last_name.clone()).unwrap_or_default(),
        chat_type: chat.map(rules::chat_kind).unwrap_or_default(),

        message_type: rules::message_kind(message),
        message_id: update.effective_message_id().unwrap_or(0),
        message_threadid: message.and_then(|m| m.message_thread_id).unwrap_or(0),
        message_date: unix_seconds(message.map(|m| m.date).unwrap_or(0)),
        message_topic: message.and_then(|m| m.is_topic_message).unwrap_or(false),
        message_automaticforward: message
            .and_then(|m| m.is_automatic_forward)
            .unwrap_or(false),
        message_effectid: message.and_then(|m| m.effect_id.clone()).unwrap_or_default(),
        message_replytomessageid: message
            .and_then(|m| m.external_reply.as_ref())
            .and_then(|reply| reply.message_id)
            .unwrap_or(0),
        message_quotetext: message
            .and_then(|m| m.quote.as_ref())
            .map(|quote| quote.text.clone())
            .unwrap_or_default(),

        forward_date: forward.date,
        forward_from: forward.from,
        forward_messageid: forward.message_id,
        forward_signature: forward.signature,
        forward_bot: forward.bot,
        forward_name: forward.name,

        message_text: message
            .and_then(|m| m.text.clone().or_else(|| m.caption.clone()))
            .unwrap_or_default(),
        message_url: message
            .and_then(|m| m.link_preview_options.as_ref())
            .and_then(|preview| preview.url.clone())
            .unwrap_or_default(),

        dice_emoji: dice.map(|d| d.emoji.clone()).unwrap_or_default(),
        dice_value: dice.map(|d| d.value).unwrap_or(0),

        callbackquery_id: callback.map(|q| q.id.clone()).unwrap_or_default(),
        callbackquery_inlinemessageid: callback
            .and_then(|q| q.inline_message_id.clone())
            .unwrap_or_default(),
        callbackquery_data: callback.and_then(|q| q.data.clone()).unwrap_or_default(),

        inlinequery_id: inline.map(|q| q.id.clone()).unwrap_or_default(),
        inlinequery_text: inline.map(|q| q.query.clone()).unwrap_or_default(),
        inlinequery_offset: inline.map(|q| q.offset.clone()).unwrap_or_default(),

        inlineresultchosen_id: chosen.map(|r| r.result_id.clone()).unwrap_or_default(),
        inlineresultchosen_query: chosen.map(|r| r.query.clone()).unwrap_or_default(),
        inlineresultchosen_inlinemessageid: chosen
            .and_then(|r| r.inline_message_id.clone())
            .unwrap_or_default(),

        chatmember_id: member_user.map(|u| u.id).unwrap_or(0),
        chatmember_bot: member_user.is_some_and(|u| u.is_bot),
        chatmember_firstname: member_user.map(|u| u.first_name.clone()).unwrap_or_default(),
        chatmember_lastname: member_user
            .and_then(|u| u.last_name.clone())
            .unwrap_or_default(),
        chatmember_username: member_user
            .and_then(|u| u.username.clone())
            .unwrap_or_default(),
        chatmember_premium: member_user.and_then(|u| u.is_premium).unwrap_or(false),
        chatmember_oldstatus: rules::member_status(member.map(|m| &m.old_chat_member)),
        chatmember_newstatus: rules::member_status(member.map(|m| &m.new_chat_member)),

        payload: incoming.raw_json().to_owned(),
    })
}
