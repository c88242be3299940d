//! Transcript rendering with day separators and grouped headers.

use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};

use crate::buffer::{MessageKind, MessageRecord};
use crate::parents::{needs_parent, ParentLookup};
use crate::permissions::{can_delete, can_edit};
use crate::state::ViewSession;

use super::format::{
    action_links, display_name, edited_status, format_date, format_time, hides_action_links,
    i18n_key_message, i18n_key_reply, is_chatops, is_decrypting, is_own, role_tags,
    shows_broadcast_reply, shows_username,
};
use super::helpers::has_embed;
use super::reactions::{hides_reactions, summarize_reactions};
use super::sequence::{classify_range_in, Classification};

const INDENT: &str = "    ";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Skip classification: every message gets a header, no separators.
    pub no_date: bool,
    /// Force a day separator above the first rendered message.
    pub force_new_day: bool,
    /// Index of the first buffered message to render.
    pub start: usize,
    /// Show edit/delete/reply affordances in headers.
    pub show_actions: bool,
}

/// Render the session's buffer as terminal lines.
///
/// Thread replies whose parent is unknown trigger a background fetch; the
/// line reads "loading" until a later render finds the parent.
pub fn render_messages<Tz>(
    session: &ViewSession,
    options: &RenderOptions,
    tz: &Tz,
    now: DateTime<Utc>,
) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let messages = &session.buffer.messages;
    let start = options.start.min(messages.len());

    let classifications = if options.no_date {
        vec![Classification::default(); messages.len() - start]
    } else {
        let grouping = session
            .grouping_options()
            .with_force_new_day(options.force_new_day);
        classify_range_in(tz, messages, start, &grouping)
    };

    let mut lines = Vec::new();
    for (msg, class) in messages[start..].iter().zip(classifications) {
        if class.starts_new_day {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(day_separator(msg, tz));
        }

        if msg.is_system() {
            lines.push(render_system_message(msg, session, tz));
            continue;
        }

        if !class.is_sequential {
            lines.push(render_header(msg, session, options, tz, now));
        }
        render_body(&mut lines, msg, session, tz);
    }
    lines
}

fn day_separator<Tz>(msg: &MessageRecord, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let date = msg
        .timestamp
        .map(|ts| format_date(ts, tz))
        .unwrap_or_else(|| "Unknown date".to_string());
    format!("──── {} ────", date)
}

fn time_or_placeholder<Tz>(msg: &MessageRecord, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    msg.timestamp
        .map(|ts| format_time(ts, tz))
        .unwrap_or_else(|| "--:--".to_string())
}

/// Render a system message (join, leave, rename, etc.) on one line
fn render_system_message<Tz>(msg: &MessageRecord, session: &ViewSession, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let name = display_name(msg, &session.settings);
    let (icon, text) = match msg.kind {
        MessageKind::UserJoined => ("→", format!("{} joined the room", name)),
        MessageKind::UserLeft => ("←", format!("{} left the room", name)),
        MessageKind::UserRemoved => ("✕", format!("{} was removed", name)),
        MessageKind::RoomRenamed => ("~", format!("{} renamed the room to {}", name, msg.text)),
        MessageKind::TopicChanged => ("★", format!("{} changed the topic to {}", name, msg.text)),
        MessageKind::System | MessageKind::Regular => ("•", msg.text.clone()),
    };
    format!("{}{} {} [{}]", INDENT, icon, text, time_or_placeholder(msg, tz))
}

fn render_header<Tz>(
    msg: &MessageRecord,
    session: &ViewSession,
    options: &RenderOptions,
    tz: &Tz,
    now: DateTime<Utc>,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let settings = &session.settings;
    let mut header = format!(
        "[{}] {}",
        time_or_placeholder(msg, tz),
        display_name(msg, settings)
    );

    if shows_username(msg, settings) {
        header.push_str(&format!(" @{}", msg.author.username));
    }
    for role in role_tags(msg, settings) {
        header.push_str(&format!(" <{}>", role));
    }
    if msg.bot {
        header.push_str(" (bot)");
    }
    if is_own(msg, &session.viewer) {
        header.push_str(" (you)");
    }
    if is_chatops(msg, settings) {
        header.push_str(" (chatops)");
    }
    if let Some(label) = &msg.label {
        header.push_str(&format!(" [{}]", label));
    }
    if msg.pending {
        header.push_str(" [sending]");
    }

    if options.show_actions {
        let viewer = &session.viewer;
        if can_edit(msg, viewer, settings, now) {
            header.push_str(" [edit]");
        }
        if can_delete(msg, viewer, settings, now) {
            header.push_str(" [delete]");
        }
        if shows_broadcast_reply(msg, &session.buffer.room, viewer) {
            header.push_str(" [reply]");
        }
    }
    header
}

fn render_body<Tz>(lines: &mut Vec<String>, msg: &MessageRecord, session: &ViewSession, tz: &Tz)
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if let Some(line) = thread_line(msg, session) {
        lines.push(line);
    }

    if msg.ignored {
        lines.push(format!("{}<message ignored>", INDENT));
    } else if is_decrypting(msg) {
        lines.push(format!("{}<decrypting…>", INDENT));
    } else {
        for text_line in msg.text.lines() {
            lines.push(format!("{}{}", INDENT, text_line));
        }
    }

    if let Some(status) = edited_status(msg, &session.settings, tz) {
        lines.push(format!("{}{}", INDENT, status));
    }

    if has_embed(msg, &session.settings) {
        for url in &msg.urls {
            lines.push(format!("{}link: {}", INDENT, url));
        }
    }

    if !hides_action_links(msg) {
        for (_, link) in action_links(msg) {
            lines.push(format!("{}▸ {}", INDENT, link.label));
        }
    }

    if msg.tcount > 0 {
        lines.push(format!("{}{} {}", INDENT, msg.tcount, i18n_key_reply(msg)));
    }
    if msg.dcount > 0 {
        lines.push(format!("{}{} {}", INDENT, msg.dcount, i18n_key_message(msg)));
    }

    if !hides_reactions(msg) {
        for summary in summarize_reactions(msg, &session.viewer) {
            let mark = if summary.user_reacted { "*" } else { " " };
            lines.push(format!(
                "{}{}{} {} · {}{}",
                INDENT, mark, summary.emoji, summary.count, summary.usernames, summary.reaction
            ));
        }
    }
}

fn thread_line(msg: &MessageRecord, session: &ViewSession) -> Option<String> {
    if let Some(excerpt) = &msg.thread_excerpt {
        return Some(format!("{}↳ replying to: {}", INDENT, excerpt));
    }
    let tmid = needs_parent(msg)?;
    let line = match session.parents.request(tmid) {
        ParentLookup::Available(parent) => format!(
            "{}↳ replying to {}: {}",
            INDENT,
            display_name(&parent, &session.settings),
            parent.text
        ),
        ParentLookup::InFlight | ParentLookup::Requested => {
            format!("{}↳ loading thread parent…", INDENT)
        }
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Author, ChannelBuffer, RoomInfo, Viewer};
    use crate::config::Settings;
    use crate::parents::ArchiveFetcher;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, h, m, 0).unwrap()
    }

    fn msg(id: &str, ts: DateTime<Utc>, user: &str, text: &str) -> MessageRecord {
        MessageRecord::new(id, Some(ts), Author::new(user, user)).with_text(text)
    }

    fn session_with(messages: Vec<MessageRecord>, archive: Vec<MessageRecord>) -> ViewSession {
        let mut buffer = ChannelBuffer::new(RoomInfo::default());
        for m in messages {
            buffer.add_message(m);
        }
        ViewSession::new(
            Viewer::new("alice", "alice"),
            Settings::default(),
            buffer,
            Arc::new(ArchiveFetcher::new(archive)),
            Handle::current(),
        )
    }

    #[tokio::test]
    async fn test_sequential_messages_share_a_header() {
        let session = session_with(
            vec![
                msg("a", at(12, 0), "alice", "Hello"),
                msg("b", at(12, 2), "alice", "Still here"),
                // 10 minute gap - should start new group
                msg("c", at(12, 12), "alice", "Back again"),
                msg("d", at(12, 13), "bob", "Hi!"),
            ],
            vec![],
        );
        let lines = render_messages(&session, &RenderOptions::default(), &Utc, at(13, 0));
        assert_eq!(
            lines,
            vec![
                "──── October 16, 2026 ────",
                "[12:00] alice (you)",
                "    Hello",
                "    Still here",
                "[12:12] alice (you)",
                "    Back again",
                "[12:13] bob",
                "    Hi!",
            ]
        );
    }

    #[tokio::test]
    async fn test_new_day_inserts_separator() {
        let next_day = Utc.with_ymd_and_hms(2026, 10, 17, 0, 1, 0).unwrap();
        let session = session_with(
            vec![
                msg("a", at(23, 59), "alice", "night"),
                msg("b", next_day, "alice", "morning"),
            ],
            vec![],
        );
        let lines = render_messages(&session, &RenderOptions::default(), &Utc, next_day);
        assert!(lines.contains(&"──── October 17, 2026 ────".to_string()));
        assert_eq!(lines.iter().filter(|l| l.starts_with("[")).count(), 2);
        assert!(lines.contains(&String::new()));
    }

    #[tokio::test]
    async fn test_no_date_renders_every_header() {
        let session = session_with(
            vec![
                msg("a", at(12, 0), "alice", "one"),
                msg("b", at(12, 1), "alice", "two"),
            ],
            vec![],
        );
        let options = RenderOptions {
            no_date: true,
            ..RenderOptions::default()
        };
        let lines = render_messages(&session, &options, &Utc, at(13, 0));
        assert!(!lines.iter().any(|l| l.starts_with("────")));
        assert_eq!(lines.iter().filter(|l| l.starts_with("[")).count(), 2);
    }

    #[tokio::test]
    async fn test_page_start_forces_separator() {
        let session = session_with(
            vec![
                msg("a", at(12, 0), "alice", "one"),
                msg("b", at(12, 1), "alice", "two"),
                msg("c", at(12, 2), "alice", "three"),
            ],
            vec![],
        );
        let options = RenderOptions {
            start: 1,
            force_new_day: true,
            ..RenderOptions::default()
        };
        let lines = render_messages(&session, &options, &Utc, at(13, 0));
        assert_eq!(
            lines,
            vec![
                "──── October 16, 2026 ────",
                "[12:01] alice (you)",
                "    two",
                "    three",
            ]
        );
    }

    #[tokio::test]
    async fn test_thread_parent_loads_then_renders() {
        let parent = msg("p", at(9, 0), "carol", "what is the plan?");
        let reply = msg("r", at(12, 0), "bob", "ship it").with_thread_parent("p");
        let session = session_with(vec![reply], vec![parent]);

        let first = render_messages(&session, &RenderOptions::default(), &Utc, at(13, 0));
        assert!(first.contains(&"    ↳ loading thread parent…".to_string()));

        // A second render while the fetch runs must not start another one
        render_messages(&session, &RenderOptions::default(), &Utc, at(13, 0));
        assert_eq!(session.parents.in_flight_count(), 1);

        assert!(session.parents.settle(Duration::from_secs(2)).await);
        let second = render_messages(&session, &RenderOptions::default(), &Utc, at(13, 0));
        assert!(second.contains(&"    ↳ replying to carol: what is the plan?".to_string()));
    }

    #[tokio::test]
    async fn test_system_message_and_markers() {
        let mut edited = msg("b", at(12, 1), "bob", "fixed typo");
        edited.edited_at = Some(at(12, 5));
        edited.edited_by = Some("bob".into());
        edited.reactions.insert(":+1:".into(), vec!["alice".into(), "carol".into()]);
        edited.tcount = 3;

        let session = session_with(
            vec![
                msg("a", at(12, 0), "carol", "").with_kind(MessageKind::UserJoined),
                edited,
            ],
            vec![],
        );
        let options = RenderOptions {
            show_actions: true,
            ..RenderOptions::default()
        };
        let lines = render_messages(&session, &options, &Utc, at(13, 0));
        assert_eq!(
            lines,
            vec![
                "──── October 16, 2026 ────",
                "    → carol joined the room [12:00]",
                "[12:01] bob",
                "    fixed typo",
                "    (edited by bob at 2026-10-16 12:05)",
                "    3 replies",
                "    *:+1: 2 · You and @carol reacted with :+1:",
            ]
        );
    }

    #[tokio::test]
    async fn test_message_after_own_join_keeps_header() {
        let session = session_with(
            vec![
                msg("a", at(12, 0), "carol", "").with_kind(MessageKind::UserJoined),
                msg("b", at(12, 1), "carol", "hi all"),
                msg("c", at(12, 2), "carol", "anyone here?"),
            ],
            vec![],
        );
        let lines = render_messages(&session, &RenderOptions::default(), &Utc, at(13, 0));
        assert_eq!(
            lines,
            vec![
                "──── October 16, 2026 ────",
                "    → carol joined the room [12:00]",
                "[12:01] carol",
                "    hi all",
                "    anyone here?",
            ]
        );
    }

    #[tokio::test]
    async fn test_role_tags_and_action_links() {
        let mut m = msg("a", at(12, 0), "bob", "deploy?");
        m.roles = vec!["Admin".into(), "Moderator".into()];
        m.action_links.insert(
            "approve".into(),
            crate::buffer::ActionLink {
                label: "Approve".into(),
                icon: None,
            },
        );
        let mut session = session_with(vec![m], vec![]);

        let lines = render_messages(&session, &RenderOptions::default(), &Utc, at(13, 0));
        assert_eq!(
            lines,
            vec![
                "──── October 16, 2026 ────",
                "[12:00] bob <Admin> <Moderator>",
                "    deploy?",
                "    ▸ Approve",
            ]
        );

        session.settings.hide_roles = true;
        let lines = render_messages(&session, &RenderOptions::default(), &Utc, at(13, 0));
        assert_eq!(lines[1], "[12:00] bob");
    }

    #[tokio::test]
    async fn test_own_message_shows_actions() {
        let session = session_with(vec![msg("a", at(12, 0), "alice", "mine")], vec![]);
        let options = RenderOptions {
            show_actions: true,
            ..RenderOptions::default()
        };
        let lines = render_messages(&session, &options, &Utc, at(13, 0));
        assert_eq!(lines[1], "[12:00] alice (you) [edit] [delete]");
    }
}
