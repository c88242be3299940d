//! Day separators and sequential grouping.
//!
//! Each message is compared with the nearest earlier message that the server
//! has confirmed. Pending messages are never used as that anchor, so a
//! pending message being swapped for its confirmed copy does not reshuffle
//! the grouping of whatever follows it.
//!
//! The classification is a pure function of the message, its anchor and
//! [`GroupingOptions`]; the renderer turns the result into separators and
//! collapsed headers.

use chrono::{Duration, Local, TimeZone};

use crate::buffer::{MessageRecord, RoomInfo};
use crate::config::Settings;

use super::helpers::{is_groupable, same_calendar_day, within_grouping_period};

/// How a message relates to the one before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    /// Render a day separator above this message.
    pub starts_new_day: bool,
    /// Render without a header, merged into the previous message.
    pub is_sequential: bool,
}

impl Classification {
    /// A fresh visual block: separator shown, header shown.
    pub const NEW_DAY: Self = Self {
        starts_new_day: true,
        is_sequential: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupingOptions {
    /// Maximum gap between two messages of one author that still groups.
    pub period: Duration,
    /// Insert a day separator regardless of dates, e.g. at the top of a page.
    pub force_new_day: bool,
    /// When false no message is ever sequential.
    pub allow_group: bool,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self {
            period: Duration::seconds(crate::config::DEFAULT_GROUPING_PERIOD_SECS as i64),
            force_new_day: false,
            allow_group: true,
        }
    }
}

impl GroupingOptions {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }

    /// Options for a room: broadcast rooms and disabled grouping never merge.
    pub fn for_room(settings: &Settings, room: &RoomInfo) -> Self {
        Self {
            period: settings.grouping_period(),
            force_new_day: false,
            allow_group: settings.allow_group && !room.broadcast,
        }
    }

    pub fn with_force_new_day(mut self, force: bool) -> Self {
        self.force_new_day = force;
        self
    }
}

/// First confirmed record among `predecessors` (nearest first).
pub fn nearest_confirmed<'a, I>(predecessors: I) -> Option<&'a MessageRecord>
where
    I: IntoIterator<Item = &'a MessageRecord>,
{
    predecessors.into_iter().find(|m| !m.pending)
}

/// Classify `current` using the local time zone for day boundaries.
pub fn classify<'a, I>(current: &MessageRecord, predecessors: I, options: &GroupingOptions) -> Classification
where
    I: IntoIterator<Item = &'a MessageRecord>,
{
    classify_in(&Local, current, predecessors, options)
}

/// Classify `current` against the records before it, nearest first.
pub fn classify_in<'a, Tz, I>(
    tz: &Tz,
    current: &MessageRecord,
    predecessors: I,
    options: &GroupingOptions,
) -> Classification
where
    Tz: TimeZone,
    I: IntoIterator<Item = &'a MessageRecord>,
{
    let Some(previous) = nearest_confirmed(predecessors) else {
        return Classification::NEW_DAY;
    };

    let (Some(previous_ts), Some(current_ts)) = (previous.timestamp, current.timestamp) else {
        tracing::debug!(
            message = %current.id,
            previous = %previous.id,
            "missing timestamp, starting a new block"
        );
        return Classification::NEW_DAY;
    };

    // A new day always resets grouping
    if options.force_new_day || !same_calendar_day(tz, previous_ts, current_ts) {
        return Classification::NEW_DAY;
    }

    let is_sequential = options.allow_group
        && previous.author.id == current.author.id
        && within_grouping_period(previous_ts, current_ts, options.period)
        && is_groupable(previous)
        && is_groupable(current);

    Classification {
        starts_new_day: false,
        is_sequential,
    }
}

/// Classify every record of `records` in display order.
pub fn classify_sequence_in<Tz: TimeZone>(
    tz: &Tz,
    records: &[MessageRecord],
    options: &GroupingOptions,
) -> Vec<Classification> {
    classify_range_in(tz, records, 0, options)
}

pub fn classify_sequence(records: &[MessageRecord], options: &GroupingOptions) -> Vec<Classification> {
    classify_sequence_in(&Local, records, options)
}

/// Classify `records[start..]`, still anchoring on earlier records.
///
/// `force_new_day` applies to the first classified record only: it is the
/// top of the visible page even when older history exists above it.
pub fn classify_range_in<Tz: TimeZone>(
    tz: &Tz,
    records: &[MessageRecord],
    start: usize,
    options: &GroupingOptions,
) -> Vec<Classification> {
    let start = start.min(records.len());
    let rest = options.with_force_new_day(false);

    (start..records.len())
        .map(|idx| {
            let opts = if idx == start { options } else { &rest };
            classify_in(tz, &records[idx], records[..idx].iter().rev(), opts)
        })
        .collect()
}
