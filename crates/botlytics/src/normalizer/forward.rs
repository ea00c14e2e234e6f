//! ↪️ Forward origin → the six `forward_*` columns.

use chrono::{DateTime, Utc};

use crate::update::{MessageOrigin, User};

/// The forward columns, zeroed when the message was not forwarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ForwardFields {
    pub date: DateTime<Utc>,
    pub from: i64,
    pub message_id: i64,
    pub signature: String,
    pub bot: bool,
    pub name: String,
}

impl ForwardFields {
    pub(crate) fn from_origin(origin: Option<&MessageOrigin>) -> Self {
        let Some(origin) = origin else {
            return Self::default();
        };
        match origin {
            MessageOrigin::User { date, sender_user } => Self {
                date: unix_seconds(*date),
                from: sender_user.id,
                bot: sender_user.is_bot,
                name: display_name(sender_user),
                ..Self::default()
            },
            // 🙈 the sender opted out of being linked: a name, and nothing to join on
            MessageOrigin::HiddenUser {
                date,
                sender_user_name,
            } => Self {
                date: unix_seconds(*date),
                name: sender_user_name.clone(),
                ..Self::default()
            },
            MessageOrigin::Chat {
                date,
                sender_chat,
                author_signature,
            } => Self {
                date: unix_seconds(*date),
                from: sender_chat.id,
                signature: author_signature.clone().unwrap_or_default(),
                name: sender_chat.title.clone().unwrap_or_default(),
                ..Self::default()
            },
            MessageOrigin::Channel {
                date,
                chat,
                message_id,
                author_signature,
            } => Self {
                date: unix_seconds(*date),
                from: chat.id,
                message_id: *message_id,
                signature: author_signature.clone().unwrap_or_default(),
                name: chat.title.clone().unwrap_or_default(),
                ..Self::default()
            },
            MessageOrigin::Unrecognized => Self::default(),
        }
    }
}

/// "First Last", or just "First" when there is no last name.
pub(crate) fn display_name(user: &User) -> String {
    match user.last_name.as_deref() {
        Some(last) if !last.is_empty() => format!("{} {}", user.first_name, last)
            .trim()
            .to_string(),
        _ => user.first_name.clone(),
    }
}

/// 🕰️ Bot API dates are Unix seconds; out-of-range values collapse to the epoch.
pub(crate) fn unix_seconds(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or_default()
}
