use std::sync::Arc;

use arc_swap::ArcSwap;
use futures::StreamExt;

use crate::chat::events::ChatEvent;
use crate::chat::state::{ChatConfig, ConversationState};
use crate::chat::view_model::ChatViewModel;
use crate::history::HistoryStore;
use crate::host::{EventSink, EventStream, HostCapabilities};

/// Drives one view-model from its event stream.
///
/// Events are handled one at a time in arrival order. After each one the new
/// state is published as an immutable snapshot and handed to the render step.
pub struct ChatSession {
    view_model: ChatViewModel,
    events: EventStream,
    snapshot: Arc<ArcSwap<ConversationState>>,
}

impl ChatSession {
    /// `sink` and `events` must be the two halves of one [`EventSink::channel`].
    pub fn start(
        config: ChatConfig,
        host: HostCapabilities,
        history: HistoryStore,
        sink: EventSink,
        events: EventStream,
    ) -> Self {
        let view_model = ChatViewModel::activate(config, host, history, sink);
        let snapshot = Arc::new(ArcSwap::from_pointee(view_model.state().clone()));
        Self {
            view_model,
            events,
            snapshot,
        }
    }

    /// Shared handle to the latest published state.
    pub fn snapshot(&self) -> Arc<ArcSwap<ConversationState>> {
        Arc::clone(&self.snapshot)
    }

    /// Runs until [`ChatEvent::Deactivate`] or until every sender is gone.
    /// Returns the final state.
    pub async fn run(mut self, mut render: impl FnMut(&ConversationState)) -> ConversationState {
        render(self.view_model.state());

        while let Some(event) = self.events.next().await {
            let closing = matches!(event, ChatEvent::Deactivate);
            self.view_model.handle(event);
            self.publish(&mut render);
            if closing {
                break;
            }
        }

        if self.view_model.is_active() {
            tracing::debug!("event stream closed, deactivating chat view");
            self.view_model.deactivate();
            self.publish(&mut render);
        }

        self.view_model.state().clone()
    }

    fn publish(&self, render: &mut impl FnMut(&ConversationState)) {
        let state = self.view_model.state();
        self.snapshot.store(Arc::new(state.clone()));
        render(state);
    }
}
