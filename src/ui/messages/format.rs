//! Header and body text for a single message.

use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};

use crate::buffer::{ActionLink, MessageRecord, RoomInfo, Viewer};
use crate::config::Settings;

/// Shown in place of the editor when the edit has no recorded author.
pub const UNKNOWN_EDITOR: &str = "?";

/// Long date and time, e.g. "October 16, 2026 3:04 PM".
pub fn format_long_date<Tz>(ts: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    ts.with_timezone(tz).format("%B %-d, %Y %-I:%M %p").to_string()
}

/// Short time for message headers, e.g. "15:04".
pub fn format_time<Tz>(ts: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    ts.with_timezone(tz).format("%H:%M").to_string()
}

/// Date for day separators, e.g. "October 16, 2026".
pub fn format_date<Tz>(ts: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    ts.with_timezone(tz).format("%B %-d, %Y").to_string()
}

pub fn format_date_and_time<Tz>(ts: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    ts.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string()
}

/// Name shown in the message header.
///
/// Alias wins, then the real name if enabled, then the username.
pub fn display_name<'a>(msg: &'a MessageRecord, settings: &Settings) -> &'a str {
    if let Some(alias) = msg.alias.as_deref().filter(|a| !a.is_empty()) {
        return alias;
    }
    if settings.use_real_name {
        if let Some(name) = msg.author.name.as_deref().filter(|n| !n.is_empty()) {
            return name;
        }
    }
    &msg.author.username
}

/// Whether the header shows `@username` next to the display name.
pub fn shows_username(msg: &MessageRecord, settings: &Settings) -> bool {
    msg.alias.as_deref().is_some_and(|a| !a.is_empty())
        || (settings.use_real_name && msg.author.name.as_deref().is_some_and(|n| !n.is_empty()))
}

/// Role descriptions shown next to the author, without blanks or repeats.
/// Empty when roles are hidden or the author is unknown.
pub fn role_tags<'a>(msg: &'a MessageRecord, settings: &Settings) -> Vec<&'a str> {
    if settings.hide_roles || msg.author.id.is_empty() {
        return Vec::new();
    }
    let mut tags: Vec<&str> = Vec::new();
    for role in msg.roles.iter().map(|r| r.trim()) {
        if !role.is_empty() && !tags.contains(&role) {
            tags.push(role);
        }
    }
    tags
}

/// Action links with their ids, in id order.
pub fn action_links(msg: &MessageRecord) -> Vec<(&str, &ActionLink)> {
    msg.action_links
        .iter()
        .map(|(id, link)| (id.as_str(), link))
        .collect()
}

pub fn hides_action_links(msg: &MessageRecord) -> bool {
    msg.action_links.is_empty()
}

/// Avatars given as "@username" point at another user's avatar.
pub fn avatar_from_username(msg: &MessageRecord) -> Option<&str> {
    msg.avatar.as_deref().and_then(|a| a.strip_prefix('@'))
}

pub fn i18n_key_message(msg: &MessageRecord) -> &'static str {
    if msg.dcount > 1 {
        "messages"
    } else {
        "message"
    }
}

pub fn i18n_key_reply(msg: &MessageRecord) -> &'static str {
    if msg.tcount > 1 {
        "replies"
    } else {
        "reply"
    }
}

pub fn is_own(msg: &MessageRecord, viewer: &Viewer) -> bool {
    viewer.is_author_of(msg)
}

pub fn is_decrypting(msg: &MessageRecord) -> bool {
    msg.e2e == Some(crate::buffer::E2eState::Pending)
}

pub fn is_chatops(msg: &MessageRecord, settings: &Settings) -> bool {
    settings
        .chatops_username
        .as_deref()
        .is_some_and(|name| name == msg.author.username)
}

/// Broadcast rooms offer a private reply to other people's regular messages.
pub fn shows_broadcast_reply(msg: &MessageRecord, room: &RoomInfo, viewer: &Viewer) -> bool {
    room.broadcast && !msg.private && !msg.is_system() && !is_own(msg, viewer)
}

/// System messages are not considered edited.
pub fn was_edited(msg: &MessageRecord) -> bool {
    msg.edited_at.is_some() && !msg.is_system()
}

pub fn edited_by(msg: &MessageRecord) -> &str {
    if !was_edited(msg) {
        return "";
    }
    msg.edited_by
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_EDITOR)
}

/// "(edited by bob at 2026-10-16 15:04)" or `None` when hidden or unedited.
pub fn edited_status<Tz>(msg: &MessageRecord, settings: &Settings, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if !settings.show_edited_status || !was_edited(msg) {
        return None;
    }
    let when = msg.edited_at.map(|ts| format_date_and_time(ts, tz))?;
    Some(format!("(edited by {} at {})", edited_by(msg), when))
}
