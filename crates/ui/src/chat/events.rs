use crate::host::{Capability, ConfirmRequest, ImageSource};

/// Identifier for one scheduled simulated reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplyId(pub u64);

/// What a simulated reply answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyTrigger {
    Text(String),
    Voice,
}

/// User input dispatched by the render layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    EditInput(String),
    /// Measured content height of the text input.
    AdjustInputHeight(f32),
    SendText,
    ToggleInputMode,
    FocusInput,
    BlurInput,
    PressStart { y: f32 },
    PressMove { y: f32 },
    PressRelease { y: Option<f32> },
    CancelRecording,
    PlayVoice { index: usize },
    ToggleFunctionTray,
    ChooseImage,
    TakePhoto,
    ShareLocation,
    ShowMore,
    ToggleSidebar,
    ClearHistory,
    SwitchTheme,
    ShowSettings,
    ShowAbout,
    Scrolled {
        offset: f32,
        max_offset: f32,
    },
}

/// Completion callbacks delivered by host capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    RecorderStopped { resource: String },
    PlaybackEnded,
    ImagePicked {
        source: ImageSource,
        resource: String,
    },
    LocationPicked { label: String },
    ConfirmResolved {
        request: ConfirmRequest,
        confirmed: bool,
    },
    ActionSheetSelected { index: usize },
    CapabilityFailed {
        capability: Capability,
        details: String,
    },
}

/// Deferred tasks firing back into the view-model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerFired {
    Reply {
        id: ReplyId,
        trigger: ReplyTrigger,
    },
    RecordingTick,
    RecordingSettle,
    PlaybackElapsed { index: usize },
}

/// Scheduler slot. Scheduling into an occupied slot supersedes the previous task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    Reply(ReplyId),
    RecordingTick,
    RecordingSettle,
    PlaybackElapsed,
}

impl TimerFired {
    pub fn key(&self) -> TimerKey {
        match self {
            Self::Reply { id, .. } => TimerKey::Reply(*id),
            Self::RecordingTick => TimerKey::RecordingTick,
            Self::RecordingSettle => TimerKey::RecordingSettle,
            Self::PlaybackElapsed { .. } => TimerKey::PlaybackElapsed,
        }
    }
}

/// Everything the view-model reacts to, in host dispatch order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    User(UserAction),
    Host(HostEvent),
    Timer(TimerFired),
    /// View is going away; flush and stop reacting.
    Deactivate,
}

impl From<UserAction> for ChatEvent {
    fn from(action: UserAction) -> Self {
        Self::User(action)
    }
}

impl From<HostEvent> for ChatEvent {
    fn from(event: HostEvent) -> Self {
        Self::Host(event)
    }
}

impl From<TimerFired> for ChatEvent {
    fn from(timer: TimerFired) -> Self {
        Self::Timer(timer)
    }
}
