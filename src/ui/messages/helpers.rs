//! Helper predicates shared by the classifier and the renderer.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::buffer::MessageRecord;
use crate::config::Settings;

/// Check whether two instants fall on the same calendar date in `tz`.
pub fn same_calendar_day<Tz: TimeZone>(tz: &Tz, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.with_timezone(tz).date_naive() == b.with_timezone(tz).date_naive()
}

/// Check if `current` follows `previous` closely enough to be grouped.
/// A gap equal to the period still groups.
pub fn within_grouping_period(previous: DateTime<Utc>, current: DateTime<Utc>, period: Duration) -> bool {
    current.signed_duration_since(previous) <= period
}

/// Whether the message may be merged with its neighbours at all.
///
/// System messages render as a single headerless line, so they never join
/// or anchor a run whatever their own flag says. Room and settings switches
/// live in [`GroupingOptions::for_room`](super::GroupingOptions::for_room).
pub fn is_groupable(msg: &MessageRecord) -> bool {
    msg.is_groupable() && !msg.is_system()
}

/// Whole minutes elapsed since the message was sent, or `None` without a timestamp.
pub fn minutes_since(msg: &MessageRecord, now: DateTime<Utc>) -> Option<i64> {
    msg.timestamp.map(|ts| now.signed_duration_since(ts).num_minutes())
}

/// Whether link previews should be rendered for this message.
pub fn has_embed(msg: &MessageRecord, settings: &Settings) -> bool {
    if msg.urls.is_empty() || !settings.embed_enabled {
        return false;
    }

    // Authors listed in embed_disabled_for never get previews
    !settings
        .embed_disabled_for
        .split(',')
        .map(str::trim)
        .any(|username| username == msg.author.username)
}
