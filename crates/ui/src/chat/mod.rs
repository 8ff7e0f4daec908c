/// Event contracts feeding the view-model loop.
pub mod events;
/// Persisted chat entries and their timestamps.
pub mod message;
pub mod recording;
pub mod reply;
pub mod scroll_manager;
pub mod state;
pub mod view_model;

pub use events::{ChatEvent, HostEvent, ReplyId, ReplyTrigger, TimerFired, TimerKey, UserAction};
pub use message::{Message, MessageClock, MessageKind, Sender, VoiceClip};
pub use recording::{
    RecordingLimits, RecordingOutcome, RecordingPhase, RecordingRejection, RecordingResult,
    RecordingState, RecordingTransition,
};
pub use scroll_manager::ScrollManager;
pub use state::{ChatConfig, ConversationState, InputMode};
pub use view_model::{ChatViewModel, MORE_ACTIONS};
