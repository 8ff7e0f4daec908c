use std::collections::HashSet;
use std::time::Duration;

use crate::chat::events::{
    ChatEvent, HostEvent, ReplyId, ReplyTrigger, TimerFired, TimerKey, UserAction,
};
use crate::chat::message::{IMAGE_PLACEHOLDER, Message, MessageClock, PHOTO_PLACEHOLDER, Sender};
use crate::chat::recording::{RecordingOutcome, RecordingState, RecordingTransition};
use crate::chat::reply::simulated_reply;
use crate::chat::state::{
    ChatConfig, ConversationState, DEFAULT_INPUT_HEIGHT, InputMode, MAX_INPUT_HEIGHT,
};
use crate::history::HistoryStore;
use crate::host::{
    Capability, ConfirmRequest, EventSink, HostCapabilities, HostError, ImageSource,
    RecorderOptions,
};
use crate::scheduler::TaskScheduler;

/// Entries of the "more" action sheet.
pub const MORE_ACTIONS: [&str; 4] = ["File", "Favorites", "Transfer", "Contact card"];
const RECORDING_TICK: Duration = Duration::from_secs(1);

/// Owns one conversation view: its state, host capabilities and timers.
///
/// Created at view activation, mutated only through [`ChatViewModel::handle`],
/// flushed and frozen by [`ChatViewModel::deactivate`]. Every event after
/// deactivation is ignored.
pub struct ChatViewModel {
    state: ConversationState,
    config: ChatConfig,
    host: HostCapabilities,
    history: HistoryStore,
    scheduler: TaskScheduler,
    clock: MessageClock,
    /// Duration of a committed take waiting for the recorder's output handle.
    pending_take: Option<u32>,
    pending_replies: HashSet<ReplyId>,
    next_reply_id: u64,
    active: bool,
}

impl ChatViewModel {
    /// Builds the view-model and restores persisted history.
    pub fn activate(
        config: ChatConfig,
        host: HostCapabilities,
        history: HistoryStore,
        sink: EventSink,
    ) -> Self {
        let mut view_model = Self {
            state: ConversationState::new(config.dark_mode),
            config,
            host,
            history,
            scheduler: TaskScheduler::new(sink),
            clock: MessageClock::default(),
            pending_take: None,
            pending_replies: HashSet::new(),
            next_reply_id: 1,
            active: true,
        };
        view_model.restore_history();
        view_model
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Runs one event to completion.
    pub fn handle(&mut self, event: ChatEvent) {
        if !self.active {
            tracing::trace!(?event, "ignoring event after deactivation");
            return;
        }

        match event {
            ChatEvent::User(action) => self.handle_action(action),
            ChatEvent::Host(event) => self.handle_host_event(event),
            ChatEvent::Timer(timer) => self.handle_timer(timer),
            ChatEvent::Deactivate => self.deactivate(),
        }
    }

    /// Stops recording and playback, drops every timer and flushes history.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }

        if self.state.recording.is_recording() {
            let _ = self
                .state
                .recording
                .apply(RecordingTransition::Cancel, &self.config.recording);
            if let Err(error) = self.host.recorder.stop() {
                tracing::debug!("recorder stop failed during deactivation: {error}");
            }
        }
        self.stop_voice_play();
        self.scheduler.cancel_all();
        self.pending_replies.clear();
        self.sync_loading();
        self.pending_take = None;
        self.persist();
        self.active = false;
        tracing::info!(
            message_count = self.state.messages.len(),
            "chat view deactivated"
        );
    }

    fn handle_action(&mut self, action: UserAction) {
        match action {
            UserAction::EditInput(text) => self.state.input_text = text,
            UserAction::AdjustInputHeight(height) => {
                self.state.input_height = height.min(MAX_INPUT_HEIGHT);
            }
            UserAction::SendText => self.send_text(),
            UserAction::ToggleInputMode => self.toggle_input_mode(),
            UserAction::FocusInput => {
                self.state.input_focused = true;
                self.state.tray_open = false;
            }
            UserAction::BlurInput => self.state.input_focused = false,
            UserAction::PressStart { y } => self.press_start(y),
            UserAction::PressMove { y } => self.press_move(y),
            UserAction::PressRelease { y } => {
                self.finish_recording(RecordingTransition::Release { y });
            }
            UserAction::CancelRecording => self.finish_recording(RecordingTransition::Cancel),
            UserAction::PlayVoice { index } => self.play_voice(index),
            UserAction::ToggleFunctionTray => self.toggle_function_tray(),
            UserAction::ChooseImage => self.pick_image(ImageSource::Album),
            UserAction::TakePhoto => self.pick_image(ImageSource::Camera),
            UserAction::ShareLocation => self.share_location(),
            UserAction::ShowMore => self.show_more(),
            UserAction::ToggleSidebar => self.toggle_sidebar(),
            UserAction::ClearHistory => self.request_clear_history(),
            UserAction::SwitchTheme => self.switch_theme(),
            UserAction::ShowSettings => {
                self.host.notifier.toast("Settings");
                self.toggle_sidebar();
            }
            UserAction::ShowAbout => {
                let about = format!("About Parley v{}", env!("CARGO_PKG_VERSION"));
                self.host.notifier.toast(&about);
                self.toggle_sidebar();
            }
            UserAction::Scrolled { offset, max_offset } => {
                self.state.tray_open = false;
                self.state.scroll.observe(offset, max_offset);
            }
        }
    }

    fn handle_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::RecorderStopped { resource } => self.commit_take(resource),
            HostEvent::PlaybackEnded => self.stop_voice_play(),
            HostEvent::ImagePicked { source, resource } => {
                let label = match source {
                    ImageSource::Album => IMAGE_PLACEHOLDER,
                    ImageSource::Camera => PHOTO_PLACEHOLDER,
                };
                self.append(|timestamp| Message::image(label, resource, timestamp));
            }
            HostEvent::LocationPicked { label } => {
                self.append(|timestamp| Message::location(&label, timestamp));
            }
            HostEvent::ConfirmResolved { request, confirmed } => match request {
                ConfirmRequest::ClearHistory if confirmed => self.clear_history(),
                ConfirmRequest::ClearHistory => tracing::debug!("history clear declined"),
            },
            HostEvent::ActionSheetSelected { index } => match MORE_ACTIONS.get(index) {
                Some(item) => self.host.notifier.toast(&format!("Selected {item}")),
                None => tracing::debug!(index, "action sheet index out of range"),
            },
            HostEvent::CapabilityFailed {
                capability,
                details,
            } => {
                tracing::warn!(%capability, %details, "host capability failed");
                self.host.notifier.toast(failure_toast(capability));
            }
        }
    }

    fn handle_timer(&mut self, timer: TimerFired) {
        self.scheduler.sweep_finished();
        match timer {
            TimerFired::Reply { id, trigger } => self.deliver_reply(id, &trigger),
            TimerFired::RecordingTick => self.recording_tick(),
            TimerFired::RecordingSettle => {
                if let Err(rejection) = self
                    .state
                    .recording
                    .apply(RecordingTransition::Settle, &self.config.recording)
                {
                    tracing::trace!(?rejection, "stale settle timer");
                }
            }
            TimerFired::PlaybackElapsed { index } => {
                if self.state.playing_index == Some(index) {
                    self.stop_voice_play();
                }
            }
        }
    }

    fn send_text(&mut self) {
        if self.state.input_mode != InputMode::Text {
            tracing::trace!("send ignored outside text mode");
            return;
        }

        let content = self.state.input_text.trim().to_string();
        if content.is_empty() {
            return;
        }

        self.state.input_text.clear();
        self.state.input_height = DEFAULT_INPUT_HEIGHT;
        let trigger = ReplyTrigger::Text(content.clone());
        self.append(|timestamp| Message::text(Sender::User, content, timestamp));
        self.request_reply(trigger);
    }

    fn request_reply(&mut self, trigger: ReplyTrigger) {
        let id = ReplyId(self.next_reply_id);
        self.next_reply_id += 1;
        self.pending_replies.insert(id);
        self.sync_loading();
        self.scheduler
            .schedule(self.config.reply_delay, TimerFired::Reply { id, trigger });
    }

    fn deliver_reply(&mut self, id: ReplyId, trigger: &ReplyTrigger) {
        if !self.pending_replies.remove(&id) {
            tracing::trace!(?id, "dropping reply that is no longer pending");
            return;
        }

        self.sync_loading();
        let content = simulated_reply(trigger);
        self.append(|timestamp| Message::text(Sender::Assistant, content, timestamp));
    }

    fn toggle_input_mode(&mut self) {
        if self.state.recording.is_recording() {
            self.finish_recording(RecordingTransition::Cancel);
        }

        self.state.input_mode = match self.state.input_mode {
            InputMode::Text => InputMode::Voice,
            InputMode::Voice => InputMode::Text,
        };
        self.state.input_text.clear();
        self.state.tray_open = false;
    }

    fn press_start(&mut self, y: f32) {
        if self.state.input_mode != InputMode::Voice {
            tracing::trace!("press ignored outside voice mode");
            return;
        }

        if let Err(rejection) = self.state.recording.apply(
            RecordingTransition::Start { origin_y: y },
            &self.config.recording,
        ) {
            tracing::trace!(?rejection, "recording start rejected");
            return;
        }

        self.scheduler.cancel(TimerKey::RecordingSettle);
        self.pending_take = None;

        let options = RecorderOptions {
            max_duration_ms: u64::from(self.config.recording.max_duration_secs) * 1_000,
            format: self.config.audio_format.clone(),
        };
        if let Err(error) = self.host.recorder.start(&options) {
            self.state.recording = RecordingState::default();
            self.report_host_failure("recording-start", &error);
            return;
        }

        self.scheduler
            .schedule_every(RECORDING_TICK, TimerFired::RecordingTick);
        tracing::debug!(origin_y = y, "recording started");
    }

    fn press_move(&mut self, y: f32) {
        if let Err(rejection) = self
            .state
            .recording
            .apply(RecordingTransition::Track { y }, &self.config.recording)
        {
            tracing::trace!(?rejection, "move ignored");
        }
    }

    fn recording_tick(&mut self) {
        match self
            .state
            .recording
            .apply(RecordingTransition::Tick, &self.config.recording)
        {
            Ok(RecordingOutcome::Ticked {
                ceiling_reached: true,
                ..
            }) => self.finish_recording(RecordingTransition::Release { y: None }),
            Ok(_) => {}
            Err(rejection) => tracing::trace!(?rejection, "stale recording tick"),
        }
    }

    fn finish_recording(&mut self, transition: RecordingTransition) {
        let outcome = match self
            .state
            .recording
            .apply(transition, &self.config.recording)
        {
            Ok(outcome) => outcome,
            Err(rejection) => {
                tracing::trace!(?rejection, "release ignored");
                return;
            }
        };

        self.scheduler.cancel(TimerKey::RecordingTick);
        match outcome {
            RecordingOutcome::Cancelled => {
                self.pending_take = None;
                self.host.notifier.toast("Cancelled");
            }
            RecordingOutcome::TooShort => {
                self.pending_take = None;
                self.host.notifier.toast("Recording too short");
            }
            RecordingOutcome::Kept { duration_secs } => self.pending_take = Some(duration_secs),
            other => tracing::debug!(?other, "unexpected recording outcome on release"),
        }

        if let Err(error) = self.host.recorder.stop() {
            self.pending_take = None;
            self.report_host_failure("recording-stop", &error);
        }
        self.scheduler
            .schedule(self.config.settle_delay, TimerFired::RecordingSettle);
    }

    fn commit_take(&mut self, resource: String) {
        let Some(duration_secs) = self.pending_take.take() else {
            tracing::debug!(%resource, "discarding recorder output");
            return;
        };

        self.append(|timestamp| Message::voice(duration_secs, Some(resource), timestamp));
        self.request_reply(ReplyTrigger::Voice);
    }

    fn play_voice(&mut self, index: usize) {
        let Some(clip) = self
            .state
            .messages
            .get(index)
            .and_then(|message| message.voice.clone())
        else {
            tracing::trace!(index, "playback requested for a non-voice entry");
            return;
        };

        if self.state.playing_index == Some(index) {
            self.stop_voice_play();
            return;
        }

        self.stop_voice_play();
        self.state.playing_index = Some(index);
        self.state.messages[index].is_playing = true;

        match clip.resource {
            Some(resource) => {
                if let Err(error) = self.host.audio.play(&resource) {
                    self.stop_voice_play();
                    self.report_host_failure("playback-start", &error);
                }
            }
            None => self.scheduler.schedule(
                Duration::from_secs(u64::from(clip.duration_secs)),
                TimerFired::PlaybackElapsed { index },
            ),
        }
    }

    fn stop_voice_play(&mut self) {
        let Some(index) = self.state.playing_index.take() else {
            return;
        };

        if let Some(message) = self.state.messages.get_mut(index) {
            message.is_playing = false;
        }
        self.scheduler.cancel(TimerKey::PlaybackElapsed);
        if let Err(error) = self.host.audio.stop() {
            tracing::debug!("audio stop failed: {error}");
        }
    }

    fn toggle_function_tray(&mut self) {
        if self.state.input_focused {
            self.host.notifier.hide_keyboard();
            self.state.input_focused = false;
        }
        self.state.tray_open = !self.state.tray_open;
    }

    fn pick_image(&mut self, source: ImageSource) {
        self.state.tray_open = false;
        if let Err(error) = self.host.picker.pick_image(source) {
            self.report_host_failure("pick-image", &error);
        }
    }

    fn share_location(&mut self) {
        self.state.tray_open = false;
        if let Err(error) = self.host.picker.pick_location() {
            self.report_host_failure("pick-location", &error);
        }
    }

    fn show_more(&mut self) {
        self.state.tray_open = false;
        if let Err(error) = self.host.notifier.action_sheet(&MORE_ACTIONS) {
            self.report_host_failure("show-more", &error);
        }
    }

    fn toggle_sidebar(&mut self) {
        self.state.sidebar_open = !self.state.sidebar_open;
        self.state.tray_open = false;
    }

    fn request_clear_history(&mut self) {
        if let Err(error) = self.host.notifier.confirm(
            ConfirmRequest::ClearHistory,
            "Notice",
            "Clear all chat history?",
        ) {
            self.report_host_failure("clear-history-confirm", &error);
        }
    }

    fn clear_history(&mut self) {
        self.stop_voice_play();
        let dropped_replies = self
            .scheduler
            .cancel_where(|key| matches!(key, TimerKey::Reply(_)));
        self.pending_replies.clear();
        self.sync_loading();
        self.state.messages.clear();

        if let Err(error) = self.history.clear() {
            tracing::warn!("failed to clear stored chat history: {error}");
            self.host.notifier.toast("Could not clear stored history");
        }

        self.state.scroll.reset();
        self.state.sidebar_open = false;
        tracing::info!(dropped_replies, "chat history cleared");
    }

    fn switch_theme(&mut self) {
        self.state.dark_mode = !self.state.dark_mode;
        let text = if self.state.dark_mode {
            "Dark mode on"
        } else {
            "Light mode on"
        };
        self.host.notifier.toast(text);
    }

    fn append(&mut self, build: impl FnOnce(u64) -> Message) {
        let timestamp = self.clock.next_timestamp();
        self.state.messages.push(build(timestamp));
        self.persist();
        self.state.scroll.request_scroll_to_bottom();
    }

    fn persist(&mut self) {
        if let Err(error) = self.history.save(&self.state.messages) {
            tracing::warn!("failed to save chat history: {error}");
            self.host.notifier.toast("Could not save chat history");
        }
    }

    fn restore_history(&mut self) {
        match self.history.load() {
            Ok(messages) if !messages.is_empty() => {
                tracing::info!(
                    key = %self.history.key(),
                    message_count = messages.len(),
                    "restored chat history"
                );
                self.clock = MessageClock::resume_after(&messages);
                self.state.messages = messages;
                self.state.show_time_divider = false;
                self.state.scroll.request_scroll_to_bottom();
            }
            Ok(_) => tracing::debug!(key = %self.history.key(), "no stored chat history"),
            Err(error) => {
                tracing::warn!("starting with empty history: {error}");
                self.host.notifier.toast("Could not load chat history");
            }
        }
    }

    fn sync_loading(&mut self) {
        self.state.pending_replies = self.pending_replies.len();
    }

    fn report_host_failure(&mut self, stage: &'static str, error: &HostError) {
        tracing::warn!(stage, capability = %error.capability(), "host call failed: {error}");
        self.host.notifier.toast(failure_toast(error.capability()));
    }
}

fn failure_toast(capability: Capability) -> &'static str {
    match capability {
        Capability::Recorder => "Recording is unavailable",
        Capability::AudioPlayer => "Playback failed",
        Capability::ImagePicker => "Could not open images",
        Capability::LocationPicker => "Could not get location",
        Capability::Notifier => "Action failed",
    }
}
