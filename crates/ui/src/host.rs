//! Host capability contracts consumed by the chat view-model.
//!
//! Every capability call returns synchronously; completions arrive later as
//! [`HostEvent`]s pushed through an [`EventSink`].

use std::fmt;

use futures::channel::mpsc;
use snafu::Snafu;

use crate::chat::events::{ChatEvent, HostEvent};

/// Receiving half of the view-model event channel.
pub type EventStream = mpsc::UnboundedReceiver<ChatEvent>;

/// Cloneable sending half of the view-model event channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ChatEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, EventStream) {
        let (tx, rx) = mpsc::unbounded();
        (Self { tx }, rx)
    }

    /// Queues one event. Returns false once the view-model side is gone.
    pub fn send(&self, event: impl Into<ChatEvent>) -> bool {
        match self.tx.unbounded_send(event.into()) {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!("dropping event for closed view-model: {:?}", error.into_inner());
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Host capability names used in logs and failure events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Recorder,
    AudioPlayer,
    ImagePicker,
    LocationPicker,
    Notifier,
}

impl fmt::Display for Capability {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Recorder => "recorder",
            Self::AudioPlayer => "audio player",
            Self::ImagePicker => "image picker",
            Self::LocationPicker => "location picker",
            Self::Notifier => "notifier",
        };
        formatter.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSource {
    Album,
    Camera,
}

/// Modal confirmations the view-model can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfirmRequest {
    ClearHistory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderOptions {
    pub max_duration_ms: u64,
    pub format: String,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum HostError {
    #[snafu(display("{capability} is unavailable on `{stage}`: {details}"))]
    Unavailable {
        stage: &'static str,
        capability: Capability,
        details: String,
    },
    #[snafu(display("{capability} request was denied on `{stage}`"))]
    Denied {
        stage: &'static str,
        capability: Capability,
    },
}

impl HostError {
    pub fn capability(&self) -> Capability {
        match self {
            Self::Unavailable { capability, .. } | Self::Denied { capability, .. } => *capability,
        }
    }
}

pub type HostResult<T> = Result<T, HostError>;

/// Audio capture. `stop` answers with [`HostEvent::RecorderStopped`].
pub trait Recorder: Send {
    fn start(&mut self, options: &RecorderOptions) -> HostResult<()>;
    fn stop(&mut self) -> HostResult<()>;
}

/// Audio output. Natural end of a clip answers with [`HostEvent::PlaybackEnded`].
pub trait AudioPlayer: Send {
    fn play(&mut self, resource: &str) -> HostResult<()>;
    fn stop(&mut self) -> HostResult<()>;
}

/// Single-selection pickers answering with `ImagePicked` / `LocationPicked`.
pub trait MediaPicker: Send {
    fn pick_image(&mut self, source: ImageSource) -> HostResult<()>;
    fn pick_location(&mut self) -> HostResult<()>;
}

/// Toasts, modal confirmation, action sheets and the soft keyboard.
pub trait Notifier: Send {
    fn toast(&mut self, text: &str);
    fn confirm(&mut self, request: ConfirmRequest, title: &str, body: &str) -> HostResult<()>;
    fn action_sheet(&mut self, items: &[&str]) -> HostResult<()>;
    fn hide_keyboard(&mut self);
}

/// Capability bundle owned by one view-model.
pub struct HostCapabilities {
    pub recorder: Box<dyn Recorder>,
    pub audio: Box<dyn AudioPlayer>,
    pub picker: Box<dyn MediaPicker>,
    pub notifier: Box<dyn Notifier>,
}

impl HostCapabilities {
    pub fn new(
        recorder: impl Recorder + 'static,
        audio: impl AudioPlayer + 'static,
        picker: impl MediaPicker + 'static,
        notifier: impl Notifier + 'static,
    ) -> Self {
        Self {
            recorder: Box::new(recorder),
            audio: Box::new(audio),
            picker: Box::new(picker),
            notifier: Box::new(notifier),
        }
    }
}

impl fmt::Debug for HostCapabilities {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("HostCapabilities").finish_non_exhaustive()
    }
}

impl From<HostError> for HostEvent {
    fn from(error: HostError) -> Self {
        HostEvent::CapabilityFailed {
            capability: error.capability(),
            details: error.to_string(),
        }
    }
}
