//! 📦 The flat record. One row per update, no nesting, no nulls.
//!
//! Absence is spelled with zero values: `""`, `0`, `false`, and the Unix epoch.
//! The collector never has to ask "is this field there?", only "is it zero?".

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::kinds::{ChatKind, MemberStatusKind, MessageKind, UpdateKind};

/// 📋 Every wire field name, in schema order.
///
/// Allow-lists and deny-lists are validated against this table at construction,
/// so a typo in config is an error and not a silently empty column.
pub const FIELD_NAMES: &[&str] = &[
    // generic
    "timestamp",
    "type",
    "to",
    "from",
    // sender
    "from_bot",
    "from_firstname",
    "from_lastname",
    "from_username",
    "from_languagecode",
    "from_premium",
    "from_type",
    "from_title",
    "from_businessconnection",
    "from_boostcount",
    "from_signature",
    // receiver
    "to_bot",
    "to_firstname",
    "to_lastname",
    "to_username",
    // chat
    "chat_id",
    "chat_username",
    "chat_title",
    "chat_firstname",
    "chat_lastname",
    "chat_type",
    // message
    "message_type",
    "message_id",
    "message_threadid",
    "message_date",
    "message_topic",
    "message_automaticforward",
    "message_effectid",
    "message_replytomessageid",
    "message_quotetext",
    // forward
    "forward_date",
    "forward_from",
    "forward_messageid",
    "forward_signature",
    "forward_bot",
    "forward_name",
    // text / captions
    "message_text",
    // link preview
    "message_url",
    // dice
    "dice_emoji",
    "dice_value",
    // callback query
    "callbackquery_id",
    "callbackquery_inlinemessageid",
    "callbackquery_data",
    // inline query
    "inlinequery_id",
    "inlinequery_text",
    "inlinequery_offset",
    // chosen inline result
    "inlineresultchosen_id",
    "inlineresultchosen_query",
    "inlineresultchosen_inlinemessageid",
    // chat member
    "chatmember_id",
    "chatmember_bot",
    "chatmember_firstname",
    "chatmember_lastname",
    "chatmember_username",
    "chatmember_premium",
    "chatmember_oldstatus",
    "chatmember_newstatus",
    // raw
    "payload",
];

/// 🔍 Is `name` one of ours?
pub fn is_known_field(name: &str) -> bool {
    FIELD_NAMES.contains(&name)
}

/// 📦 A normalized analytics record.
///
/// Field order matches [`FIELD_NAMES`]. `Default` is the all-zero record, which is
/// never emitted as-is: the normalizer always sets `type`, `to` and `from`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NormalizedRecord {
    // generic
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub update_type: UpdateKind,
    pub to: i64,
    pub from: i64,

    // sender
    pub from_bot: bool,
    pub from_firstname: String,
    pub from_lastname: String,
    pub from_username: String,
    pub from_languagecode: String,
    pub from_premium: bool,
    pub from_type: ChatKind,
    pub from_title: String,
    pub from_businessconnection: String,
    pub from_boostcount: i64,
    pub from_signature: String,

    // receiver
    pub to_bot: bool,
    pub to_firstname: String,
    pub to_lastname: String,
    pub to_username: String,

    // chat
    pub chat_id: i64,
    pub chat_username: String,
    pub chat_title: String,
    pub chat_firstname: String,
    pub chat_lastname: String,
    pub chat_type: ChatKind,

    // message
    pub message_type: MessageKind,
    pub message_id: i64,
    pub message_threadid: i64,
    pub message_date: DateTime<Utc>,
    pub message_topic: bool,
    pub message_automaticforward: bool,
    pub message_effectid: String,
    pub message_replytomessageid: i64,
    pub message_quotetext: String,

    // forward
    pub forward_date: DateTime<Utc>,
    pub forward_from: i64,
    pub forward_messageid: i64,
    pub forward_signature: String,
    pub forward_bot: bool,
    pub forward_name: String,

    // text message / media captions
    pub message_text: String,

    // link preview-only message
    pub message_url: String,

    // dice
    pub dice_emoji: String,
    pub dice_value: i64,

    // callback query
    pub callbackquery_id: String,
    pub callbackquery_inlinemessageid: String,
    pub callbackquery_data: String,

    // inline query
    pub inlinequery_id: String,
    pub inlinequery_text: String,
    pub inlinequery_offset: String,

    // chosen inline result
    pub inlineresultchosen_id: String,
    pub inlineresultchosen_query: String,
    pub inlineresultchosen_inlinemessageid: String,

    // chat member updates
    pub chatmember_id: i64,
    pub chatmember_bot: bool,
    pub chatmember_firstname: String,
    pub chatmember_lastname: String,
    pub chatmember_username: String,
    pub chatmember_premium: bool,
    pub chatmember_oldstatus: MemberStatusKind,
    pub chatmember_newstatus: MemberStatusKind,

    // the update, verbatim, for forensic replay
    pub payload: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_field_names_and_serde_agree_on_everything() -> anyhow::Result<()> {
        // 🧪 FIELD_NAMES is hand-maintained; serde is the truth. They must match, in order.
        let rendered = serde_json::to_value(NormalizedRecord::default())?;
        let serde_keys: Vec<&str> = rendered
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("💀 a record rendered as something other than an object"))?
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(serde_keys, FIELD_NAMES);
        assert_eq!(FIELD_NAMES.len(), 62);
        Ok(())
    }

    #[test]
    fn the_one_where_the_zero_record_is_actually_zero() -> anyhow::Result<()> {
        let rendered = serde_json::to_value(NormalizedRecord::default())?;
        assert_eq!(rendered["type"], 0);
        assert_eq!(rendered["from"], 0);
        assert_eq!(rendered["from_firstname"], "");
        assert_eq!(rendered["forward_bot"], false);
        assert_eq!(rendered["message_date"], "1970-01-01T00:00:00Z");
        Ok(())
    }

    #[test]
    fn the_one_where_typos_are_not_fields() {
        assert!(is_known_field("from"));
        assert!(is_known_field("chatmember_newstatus"));
        assert!(!is_known_field("form"));
        assert!(!is_known_field(""));
    }
}
