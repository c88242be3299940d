use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::LoadError;

/// Maximum messages to keep in a buffer before trimming
const MAX_BUFFER_MESSAGES: usize = 2000;
/// Number of oldest messages to remove when trimming
const BUFFER_TRIM_COUNT: usize = 500;

/// Who wrote a message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
    /// Real name, shown instead of the username when enabled in settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Author {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            name: None,
        }
    }
}

/// Message kind. Anything other than `Regular` is a system message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    #[default]
    Regular,
    UserJoined,
    UserLeft,
    UserRemoved,
    RoomRenamed,
    TopicChanged,
    #[serde(other)]
    System,
}

/// End-to-end encryption state of a message body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum E2eState {
    Pending,
    Done,
}

/// A button attached to a message, e.g. by an integration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLink {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A single message as the view sees it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    /// `None` when the source timestamp was missing or unreadable.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    pub author: Author,
    #[serde(default)]
    pub text: String,
    /// Tri-state: absent means groupable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groupable: Option<bool>,
    /// Sent by this client but not yet confirmed by the server.
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub ignored: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e2e: Option<E2eState>,
    /// Id of the thread parent this message replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmid: Option<String>,
    /// Parent text shipped inline with the reply, if the server sent it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_excerpt: Option<String>,
    /// Discussion message count.
    #[serde(default)]
    pub dcount: u32,
    /// Thread reply count.
    #[serde(default)]
    pub tcount: u32,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_by: Option<String>,
    /// Emoji -> usernames that reacted with it.
    #[serde(default)]
    pub reactions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Role descriptions of the author, user-wide then room-scoped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    /// Action id -> link. Server-side call details are not kept.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub action_links: BTreeMap<String, ActionLink>,
}

impl MessageRecord {
    pub fn new(id: impl Into<String>, timestamp: Option<DateTime<Utc>>, author: Author) -> Self {
        Self {
            id: id.into(),
            timestamp,
            author,
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_groupable(mut self, groupable: bool) -> Self {
        self.groupable = Some(groupable);
        self
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_thread_parent(mut self, tmid: impl Into<String>) -> Self {
        self.tmid = Some(tmid.into());
        self
    }

    pub fn as_pending(mut self) -> Self {
        self.pending = true;
        self
    }

    /// Absent `groupable` counts as groupable.
    pub fn is_groupable(&self) -> bool {
        self.groupable != Some(false)
    }

    pub fn is_system(&self) -> bool {
        self.kind != MessageKind::Regular
    }
}

/// Room the buffer belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Direct,
    #[default]
    Channel,
    Group,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: RoomKind,
    /// Broadcast rooms never group messages.
    #[serde(default)]
    pub broadcast: bool,
}

/// The local user looking at the buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: String,
    pub username: String,
    /// Holds the permission to edit and delete any message.
    pub moderator: bool,
}

impl Viewer {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            moderator: false,
        }
    }

    pub fn is_author_of(&self, msg: &MessageRecord) -> bool {
        !msg.author.id.is_empty() && msg.author.id == self.user_id
    }
}

/// Ordered display list for one room.
#[derive(Default, Clone, Debug)]
pub struct ChannelBuffer {
    pub room: RoomInfo,
    pub messages: Vec<MessageRecord>,
}

impl ChannelBuffer {
    pub fn new(room: RoomInfo) -> Self {
        Self {
            room,
            messages: Vec::new(),
        }
    }

    pub fn add_message(&mut self, msg: MessageRecord) {
        self.messages.push(msg);
        // Trim old messages if buffer gets too large
        if self.messages.len() > MAX_BUFFER_MESSAGES {
            self.messages.drain(0..BUFFER_TRIM_COUNT);
        }
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&MessageRecord> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Replace a pending message with its server-confirmed version in place.
    /// Appends the confirmed message if no pending copy is buffered.
    /// Returns the index the confirmed message now lives at.
    pub fn confirm(&mut self, mut confirmed: MessageRecord) -> usize {
        confirmed.pending = false;
        match self.position(&confirmed.id) {
            Some(idx) => {
                self.messages[idx] = confirmed;
                idx
            }
            None => {
                self.add_message(confirmed);
                self.messages.len() - 1
            }
        }
    }

    /// Records before `index`, nearest first.
    pub fn predecessors(&self, index: usize) -> impl Iterator<Item = &MessageRecord> {
        self.messages[..index.min(self.messages.len())].iter().rev()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryFile {
    Room {
        #[serde(default)]
        room: RoomInfo,
        messages: Vec<MessageRecord>,
    },
    Bare(Vec<MessageRecord>),
}

/// Parse a history document: either `{ "room": .., "messages": [..] }` or a bare array.
pub fn parse_history(json: &str) -> Result<ChannelBuffer, LoadError> {
    let file: HistoryFile = serde_json::from_str(json)?;
    let (room, messages) = match file {
        HistoryFile::Room { room, messages } => (room, messages),
        HistoryFile::Bare(messages) => (RoomInfo::default(), messages),
    };
    // Loaded history is kept whole; only live additions are trimmed
    tracing::debug!(room = %room.name, messages = messages.len(), "parsed history");
    Ok(ChannelBuffer { room, messages })
}

pub fn load_history(path: &Path) -> Result<ChannelBuffer, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_history(&content)
}

/// Parse epoch milliseconds or an RFC 3339 string.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(ms).single();
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::String(s) => parse_timestamp(s),
        // Extended JSON: { "$date": 1700000000000 }
        Value::Object(map) => map.get("$date").and_then(timestamp_from_value),
        _ => None,
    }
}

/// Unreadable timestamps become `None` instead of failing the record.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(timestamp_from_value))
}
