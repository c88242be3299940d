//! Rendering session state, separated from the rendering code.
//!
//! `ViewSession` owns everything one open message list needs: the buffer,
//! the viewer, the settings in effect and the thread-parent cache. The cache
//! lives and dies with the session rather than being shared globally.

use std::sync::Arc;

use chrono::TimeZone;
use crossbeam_channel::{unbounded, Receiver};
use tokio::runtime::Handle;

use crate::buffer::{ChannelBuffer, MessageRecord, Viewer};
use crate::config::Settings;
use crate::parents::{ParentCache, ParentEvent, ParentFetcher};
use crate::ui::messages::{classify_sequence_in, Classification, GroupingOptions};

pub struct ViewSession {
    pub viewer: Viewer,
    pub settings: Settings,
    pub buffer: ChannelBuffer,
    pub parents: ParentCache,
    events: Receiver<ParentEvent>,
}

impl ViewSession {
    /// Create a session; fetches for missing thread parents run on `runtime`.
    pub fn new(
        viewer: Viewer,
        settings: Settings,
        buffer: ChannelBuffer,
        fetcher: Arc<dyn ParentFetcher>,
        runtime: Handle,
    ) -> Self {
        let (tx, rx) = unbounded();
        let parents = ParentCache::new(fetcher, runtime, tx);
        parents.seed(buffer.messages.iter().filter(|m| !m.pending).cloned());

        Self {
            viewer,
            settings,
            buffer,
            parents,
            events: rx,
        }
    }

    pub fn grouping_options(&self) -> GroupingOptions {
        GroupingOptions::for_room(&self.settings, &self.buffer.room)
    }

    /// Classification of every buffered message, in display order.
    pub fn classify_in<Tz: TimeZone>(&self, tz: &Tz) -> Vec<Classification> {
        classify_sequence_in(tz, &self.buffer.messages, &self.grouping_options())
    }

    pub fn add_message(&mut self, msg: MessageRecord) {
        if !msg.pending {
            self.parents.seed([msg.clone()]);
        }
        self.buffer.add_message(msg);
    }

    /// Swap a pending message for the server's copy. Returns its index.
    pub fn confirm(&mut self, msg: MessageRecord) -> usize {
        let idx = self.buffer.confirm(msg);
        self.parents.seed([self.buffer.messages[idx].clone()]);
        idx
    }

    /// Completion events from parent fetches since the last call.
    pub fn drain_events(&self) -> Vec<ParentEvent> {
        self.events.try_iter().collect()
    }
}
