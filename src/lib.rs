//! Chatline library.
//!
//! Presentation layer for a chat message list: day separators, sequential
//! grouping, header and reaction text, edit/delete affordances and
//! thread-parent resolution. This module re-exports the core components for
//! testing and extension.

pub mod buffer;
pub mod config;
pub mod error;
pub mod logging;
pub mod parents;
pub mod permissions;
pub mod state;
pub mod ui;


pub use buffer::{ActionLink, Author, ChannelBuffer, MessageKind, MessageRecord, RoomInfo, Viewer};
pub use config::Settings;
pub use error::{ConfigError, FetchError, LoadError};
pub use parents::{ArchiveFetcher, ParentCache, ParentEvent, ParentFetcher, ParentLookup};
pub use state::ViewSession;
pub use ui::messages::{classify, classify_sequence, Classification, GroupingOptions};
