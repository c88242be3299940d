//! Edit and delete affordances for a message.
//!
//! Moderators may edit or delete anything; authors may touch their own
//! messages when the feature is enabled. Either way a configured block
//! window closes the action once the message is old enough.

use chrono::{DateTime, Utc};

use crate::buffer::{MessageRecord, Viewer};
use crate::config::Settings;
use crate::ui::messages::helpers::minutes_since;

pub fn can_edit(msg: &MessageRecord, viewer: &Viewer, settings: &Settings, now: DateTime<Utc>) -> bool {
    allowed(
        msg,
        viewer,
        settings.allow_editing,
        settings.edit_block_minutes,
        now,
    )
}

pub fn can_delete(msg: &MessageRecord, viewer: &Viewer, settings: &Settings, now: DateTime<Utc>) -> bool {
    allowed(
        msg,
        viewer,
        settings.allow_deleting,
        settings.delete_block_minutes,
        now,
    )
}

fn allowed(
    msg: &MessageRecord,
    viewer: &Viewer,
    feature_enabled: bool,
    block_minutes: u32,
    now: DateTime<Utc>,
) -> bool {
    if !(viewer.moderator || (feature_enabled && viewer.is_author_of(msg))) {
        return false;
    }
    if block_minutes == 0 {
        return true;
    }
    // Without a timestamp the age is unknown, so the window is treated as closed
    minutes_since(msg, now).is_some_and(|elapsed| elapsed < i64::from(block_minutes))
}
