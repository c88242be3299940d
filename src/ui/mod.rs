//! Presentation code for the chat client.
//!
//! - `messages`: message list classification, formatting and rendering

pub mod messages;
