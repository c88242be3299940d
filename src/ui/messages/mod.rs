//! Message list presentation.
//! Features: day separators, sequential grouping, headers, reactions, thread parents.

mod format;
pub mod helpers;
mod reactions;
mod render;
mod sequence;

// Re-export public API
pub use format::{
    action_links, avatar_from_username, display_name, edited_by, edited_status, format_date,
    format_date_and_time, format_long_date, format_time, hides_action_links, i18n_key_message,
    i18n_key_reply, is_chatops, is_decrypting, is_own, role_tags, shows_broadcast_reply,
    shows_username, was_edited, UNKNOWN_EDITOR,
};
pub use reactions::{hides_reactions, summarize_reactions, ReactionSummary, MAX_LISTED_REACTORS};
pub use render::{render_messages, RenderOptions};
pub use sequence::{
    classify, classify_in, classify_range_in, classify_sequence, classify_sequence_in,
    nearest_confirmed, Classification, GroupingOptions,
};
