use std::time::Duration;

use crate::chat::message::Message;
use crate::chat::recording::{RecordingLimits, RecordingState};
use crate::chat::scroll_manager::ScrollManager;

/// One-line height of the text input.
pub const DEFAULT_INPUT_HEIGHT: f32 = 36.0;
/// Growth ceiling of the text input.
pub const MAX_INPUT_HEIGHT: f32 = 108.0;
pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(1_500);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_AUDIO_FORMAT: &str = "mp3";
pub const DEFAULT_HISTORY_KEY: &str = "chat_history";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Text,
    Voice,
}

/// Timing and threshold knobs for one view-model.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub reply_delay: Duration,
    pub settle_delay: Duration,
    pub recording: RecordingLimits,
    pub audio_format: String,
    pub history_key: String,
    pub dark_mode: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            reply_delay: DEFAULT_REPLY_DELAY,
            settle_delay: DEFAULT_SETTLE_DELAY,
            recording: RecordingLimits::default(),
            audio_format: DEFAULT_AUDIO_FORMAT.to_string(),
            history_key: DEFAULT_HISTORY_KEY.to_string(),
            dark_mode: false,
        }
    }
}

/// The mutable view-model state read by the render step.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    /// Insertion order is display order.
    pub messages: Vec<Message>,
    pub input_text: String,
    pub input_height: f32,
    pub input_mode: InputMode,
    pub recording: RecordingState,
    pub playing_index: Option<usize>,
    pub pending_replies: usize,
    pub sidebar_open: bool,
    pub tray_open: bool,
    pub input_focused: bool,
    pub dark_mode: bool,
    pub show_time_divider: bool,
    pub scroll: ScrollManager,
}

impl ConversationState {
    pub fn new(dark_mode: bool) -> Self {
        Self {
            messages: Vec::new(),
            input_text: String::new(),
            input_height: DEFAULT_INPUT_HEIGHT,
            input_mode: InputMode::Text,
            recording: RecordingState::default(),
            playing_index: None,
            pending_replies: 0,
            sidebar_open: false,
            tray_open: false,
            input_focused: false,
            dark_mode,
            show_time_divider: true,
            scroll: ScrollManager::new(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending_replies > 0
    }

    /// The message list scrolls only while the sidebar is closed.
    pub fn scroll_enabled(&self) -> bool {
        !self.sidebar_open
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn playing_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| message.is_playing)
            .count()
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(false)
    }
}
