//! Reaction summaries ("You and @bob reacted with :+1:").

use once_cell::sync::Lazy;
use regex::Regex;

use crate::buffer::{MessageRecord, Viewer};

/// Reactors listed by name before collapsing into "and N more".
pub const MAX_LISTED_REACTORS: usize = 15;

static LAST_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r",([^,]+)$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionSummary {
    pub emoji: String,
    pub count: usize,
    /// Who reacted, ready for display.
    pub usernames: String,
    /// " reacted with :emoji:"
    pub reaction: String,
    pub user_reacted: bool,
}

/// Summaries for every reaction on the message, ordered by emoji.
pub fn summarize_reactions(msg: &MessageRecord, viewer: &Viewer) -> Vec<ReactionSummary> {
    msg.reactions
        .iter()
        .map(|(emoji, usernames)| ReactionSummary {
            emoji: emoji.clone(),
            count: usernames.len(),
            usernames: reactor_list(usernames, &viewer.username),
            reaction: format!(" reacted with {}", emoji),
            user_reacted: usernames.iter().any(|u| *u == viewer.username),
        })
        .collect()
}

pub fn hides_reactions(msg: &MessageRecord) -> bool {
    msg.reactions.is_empty()
}

fn reactor_list(usernames: &[String], own_username: &str) -> String {
    let listed = usernames
        .iter()
        .take(MAX_LISTED_REACTORS)
        .map(|u| {
            if u == own_username {
                "you".to_string()
            } else {
                format!("@{}", u)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    let list = if usernames.len() > MAX_LISTED_REACTORS {
        format!("{} and {} more", listed, usernames.len() - MAX_LISTED_REACTORS)
    } else {
        LAST_SEPARATOR.replace(&listed, " and$1").into_owned()
    };

    capitalize_unless_mention(list)
}

fn capitalize_unless_mention(list: String) -> String {
    let mut chars = list.chars();
    match chars.next() {
        Some(first) if first != '@' => first.to_uppercase().chain(chars).collect(),
        _ => list,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Author;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn with_reactions(reactions: &[(&str, Vec<&str>)]) -> MessageRecord {
        let mut msg = MessageRecord::new("m", None, Author::new("u1", "alice"));
        for (emoji, users) in reactions {
            msg.reactions.insert(emoji.to_string(), names(users));
        }
        msg
    }

    #[test]
    fn test_reactor_list_small() {
        assert_eq!(reactor_list(&names(&["bob"]), "alice"), "@bob");
        assert_eq!(reactor_list(&names(&["bob", "carol"]), "alice"), "@bob and @carol");
        assert_eq!(
            reactor_list(&names(&["bob", "carol", "dave"]), "alice"),
            "@bob, @carol and @dave"
        );
    }

    #[test]
    fn test_reactor_list_self_is_capitalized() {
        assert_eq!(reactor_list(&names(&["alice"]), "alice"), "You");
        assert_eq!(reactor_list(&names(&["alice", "bob"]), "alice"), "You and @bob");
        assert_eq!(reactor_list(&names(&["bob", "alice"]), "alice"), "@bob and you");
    }

    #[test]
    fn test_reactor_list_overflow() {
        let many: Vec<String> = (0..18).map(|i| format!("user{}", i)).collect();
        let list = reactor_list(&many, "alice");
        assert!(list.starts_with("@user0, @user1, "));
        assert!(list.ends_with("@user14 and 3 more"));
        assert!(!list.contains("@user15"));

        // Exactly the limit lists everyone
        let exact: Vec<String> = (0..15).map(|i| format!("user{}", i)).collect();
        assert!(reactor_list(&exact, "alice").ends_with(", @user13 and @user14"));
    }

    #[test]
    fn test_summarize_reactions() {
        let msg = with_reactions(&[(":tada:", vec!["bob"]), (":+1:", vec!["alice", "bob"])]);
        let viewer = Viewer::new("u1", "alice");
        let summaries = summarize_reactions(&msg, &viewer);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].emoji, ":+1:");
        assert_eq!(summaries[0].count, 2);
        assert_eq!(summaries[0].usernames, "You and @bob");
        assert_eq!(summaries[0].reaction, " reacted with :+1:");
        assert!(summaries[0].user_reacted);

        assert_eq!(summaries[1].emoji, ":tada:");
        assert!(!summaries[1].user_reacted);
    }

    #[test]
    fn test_hides_reactions() {
        assert!(hides_reactions(&with_reactions(&[])));
        assert!(!hides_reactions(&with_reactions(&[(":+1:", vec!["bob"])])));
    }
}
