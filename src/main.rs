//! Chatline - render a chat history the way a message list shows it
//!
//! Reads a JSON history, classifies day boundaries and sequential runs,
//! resolves thread parents from an optional archive and prints the
//! transcript to stdout. Diagnostics go to stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use clap::Parser;
use tokio::runtime::Handle;

use chatline::buffer::{load_history, ChannelBuffer, Viewer};
use chatline::config::{load_settings, load_settings_from, Settings};
use chatline::logging;
use chatline::parents::ArchiveFetcher;
use chatline::state::ViewSession;
use chatline::ui::messages::{render_messages, RenderOptions};

/// How long to wait for thread parents before printing anyway.
const PARENT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "chatline", version, about = "Render a chat history with day separators and grouped messages")]
struct Args {
    /// History JSON: {"room": {..}, "messages": [..]} or a bare array
    history: PathBuf,

    /// JSON array of messages used to resolve thread parents
    #[arg(long)]
    archive: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Grouping period in seconds, overriding settings
    #[arg(long)]
    grouping_period: Option<u64>,

    /// Always put a day separator above the first rendered message
    #[arg(long)]
    force_new_day: bool,

    /// Only render the last N messages
    #[arg(long)]
    tail: Option<usize>,

    /// Skip day separators and grouping
    #[arg(long)]
    no_date: bool,

    /// Use UTC instead of the local time zone
    #[arg(long)]
    utc: bool,

    /// Username of the person viewing the history
    #[arg(long)]
    viewer: Option<String>,

    /// Show edit/delete/reply markers
    #[arg(long)]
    actions: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let mut settings = match &args.settings {
        Some(path) => load_settings_from(path)
            .with_context(|| format!("load settings {}", path.display()))?,
        None => load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default settings");
            Settings::default()
        }),
    };
    if let Some(secs) = args.grouping_period {
        settings.grouping_period_secs = secs;
    }

    let buffer = load_history(&args.history)
        .with_context(|| format!("load history {}", args.history.display()))?;
    let archive = match &args.archive {
        Some(path) => {
            load_history(path)
                .with_context(|| format!("load archive {}", path.display()))?
                .messages
        }
        None => Vec::new(),
    };
    tracing::info!(
        messages = buffer.messages.len(),
        archived = archive.len(),
        room = %buffer.room.name,
        "loaded history"
    );

    let viewer = viewer_for(&buffer, args.viewer.as_deref());
    let start = args
        .tail
        .map(|n| buffer.messages.len().saturating_sub(n))
        .unwrap_or(0);
    let options = RenderOptions {
        no_date: args.no_date,
        // A tail cuts into history, so its first message opens a new block
        force_new_day: args.force_new_day || args.tail.is_some(),
        start,
        show_actions: args.actions,
    };

    let session = ViewSession::new(
        viewer,
        settings,
        buffer,
        Arc::new(ArchiveFetcher::new(archive)),
        Handle::current(),
    );
    let now = Utc::now();

    // First pass kicks off parent fetches; render again once they land
    render(&session, &options, args.utc, now);
    if session.parents.in_flight_count() > 0 {
        if !session.parents.settle(PARENT_TIMEOUT).await {
            tracing::warn!(
                pending = session.parents.in_flight_count(),
                "thread parents still loading"
            );
        }
        for event in session.drain_events() {
            tracing::debug!(?event, "parent fetch finished");
        }
    }

    for line in render(&session, &options, args.utc, now) {
        println!("{}", line);
    }
    Ok(())
}

fn render(session: &ViewSession, options: &RenderOptions, utc: bool, now: DateTime<Utc>) -> Vec<String> {
    if utc {
        render_messages(session, options, &Utc, now)
    } else {
        render_messages(session, options, &Local, now)
    }
}

/// Resolve the viewer's user id from the history; unknown names view anonymously.
fn viewer_for(buffer: &ChannelBuffer, username: Option<&str>) -> Viewer {
    let Some(username) = username else {
        return Viewer::default();
    };
    let user_id = buffer
        .messages
        .iter()
        .find(|m| m.author.username == username)
        .map(|m| m.author.id.clone())
        .unwrap_or_default();
    Viewer::new(user_id, username)
}
