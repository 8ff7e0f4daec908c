use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Content label shown for every voice message.
pub const VOICE_PLACEHOLDER: &str = "[Voice message]";
/// Content label for images picked from the album.
pub const IMAGE_PLACEHOLDER: &str = "[Image]";
/// Content label for images captured with the camera.
pub const PHOTO_PLACEHOLDER: &str = "[Photo]";

/// Chat speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// Payload kind of one chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Voice,
    Image,
    Location,
}

/// Recorded or synthetic audio attached to a voice message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceClip {
    pub duration_secs: u32,
    /// Host audio handle. `None` marks a synthetic clip that plays on a timer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

/// One chat entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
    pub sender: Sender,
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceClip>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_resource: Option<String>,
    /// Playback flag; never persisted.
    #[serde(skip)]
    pub is_playing: bool,
    pub timestamp_ms: u64,
}

impl Message {
    pub fn text(sender: Sender, content: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            content: content.into(),
            sender,
            kind: MessageKind::Text,
            voice: None,
            image_resource: None,
            is_playing: false,
            timestamp_ms,
        }
    }

    /// Creates a user voice message. Durations below one second are raised to one.
    pub fn voice(duration_secs: u32, resource: Option<String>, timestamp_ms: u64) -> Self {
        Self {
            content: VOICE_PLACEHOLDER.to_string(),
            sender: Sender::User,
            kind: MessageKind::Voice,
            voice: Some(VoiceClip {
                duration_secs: duration_secs.max(1),
                resource,
            }),
            image_resource: None,
            is_playing: false,
            timestamp_ms,
        }
    }

    pub fn image(label: impl Into<String>, resource: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            content: label.into(),
            sender: Sender::User,
            kind: MessageKind::Image,
            voice: None,
            image_resource: Some(resource.into()),
            is_playing: false,
            timestamp_ms,
        }
    }

    pub fn location(label: &str, timestamp_ms: u64) -> Self {
        Self {
            content: format!("[Location: {label}]"),
            sender: Sender::User,
            kind: MessageKind::Location,
            voice: None,
            image_resource: None,
            is_playing: false,
            timestamp_ms,
        }
    }

    /// Repairs an entry read back from storage so it satisfies the same rules
    /// as one built by the constructors above.
    fn repaired(mut self) -> Self {
        self.is_playing = false;
        match self.kind {
            MessageKind::Voice => {
                let clip = self.voice.get_or_insert(VoiceClip {
                    duration_secs: 1,
                    resource: None,
                });
                clip.duration_secs = clip.duration_secs.max(1);
                self.content = VOICE_PLACEHOLDER.to_string();
                self.image_resource = None;
            }
            MessageKind::Image => self.voice = None,
            MessageKind::Text | MessageKind::Location => {
                self.voice = None;
                self.image_resource = None;
            }
        }
        self
    }
}

/// Restores entry invariants on a decoded history: voice entries carry the
/// placeholder and a duration of at least one second, only voice entries keep
/// a clip, and timestamps never decrease in list order.
pub fn repair_history(messages: Vec<Message>) -> Vec<Message> {
    let mut floor = 0;
    messages
        .into_iter()
        .map(|message| {
            let mut message = message.repaired();
            floor = floor.max(message.timestamp_ms);
            message.timestamp_ms = floor;
            message
        })
        .collect()
}

/// Wall-clock source for message timestamps, clamped so list order never goes backwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageClock {
    last_ms: u64,
}

impl MessageClock {
    /// Seeds the clock from already-present messages.
    pub fn resume_after(messages: &[Message]) -> Self {
        Self {
            last_ms: messages
                .iter()
                .map(|message| message.timestamp_ms)
                .max()
                .unwrap_or(0),
        }
    }

    pub fn next_timestamp(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_millis() as u64);
        self.last_ms = self.last_ms.max(now);
        self.last_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_messages_use_placeholder_and_minimum_duration() {
        let message = Message::voice(0, None, 10);
        assert_eq!(message.content, VOICE_PLACEHOLDER);
        assert_eq!(message.voice.as_ref().map(|clip| clip.duration_secs), Some(1));
        assert_eq!(message.sender, Sender::User);
        assert_eq!(message.kind, MessageKind::Voice);
    }

    #[test]
    fn playback_flag_is_not_persisted() {
        let mut message = Message::voice(4, Some("tmp://a.mp3".to_string()), 42);
        message.is_playing = true;

        let json = serde_json::to_string(&message).unwrap();
        assert!(!json.contains("is_playing"));

        let restored: Message = serde_json::from_str(&json).unwrap();
        assert!(!restored.is_playing);
        assert_eq!(restored.voice, message.voice);
        assert_eq!(restored.timestamp_ms, 42);
    }

    #[test]
    fn clock_never_goes_backwards() {
        let future_ms = u64::MAX / 2;
        let seeded = vec![Message::text(Sender::User, "later", future_ms)];
        let mut clock = MessageClock::resume_after(&seeded);

        let first = clock.next_timestamp();
        let second = clock.next_timestamp();
        assert_eq!(first, future_ms);
        assert!(second >= first);
    }

    #[test]
    fn clock_resumes_after_the_latest_timestamp_not_the_last_entry() {
        let seeded = vec![
            Message::text(Sender::User, "late", u64::MAX / 2),
            Message::text(Sender::Assistant, "early", 10),
        ];
        let mut clock = MessageClock::resume_after(&seeded);
        assert_eq!(clock.next_timestamp(), u64::MAX / 2);
    }

    #[test]
    fn repair_fixes_voice_entries_and_clamps_timestamps() {
        let mut voice = Message::voice(3, None, 50);
        voice.content = "hi".to_string();
        voice.voice = Some(VoiceClip {
            duration_secs: 0,
            resource: None,
        });
        let mut bare_voice = Message::text(Sender::User, "no clip", 60);
        bare_voice.kind = MessageKind::Voice;
        let mut text_with_clip = Message::text(Sender::Assistant, "reply", 10);
        text_with_clip.voice = Some(VoiceClip {
            duration_secs: 9,
            resource: None,
        });

        let repaired = repair_history(vec![voice, text_with_clip, bare_voice]);

        assert_eq!(repaired[0].content, VOICE_PLACEHOLDER);
        assert_eq!(repaired[0].voice.as_ref().map(|clip| clip.duration_secs), Some(1));
        assert_eq!(repaired[1].voice, None);
        assert_eq!(repaired[1].content, "reply");
        assert_eq!(repaired[2].content, VOICE_PLACEHOLDER);
        assert_eq!(repaired[2].voice.as_ref().map(|clip| clip.duration_secs), Some(1));
        let timestamps = repaired
            .iter()
            .map(|message| message.timestamp_ms)
            .collect::<Vec<_>>();
        assert_eq!(timestamps, vec![50, 50, 60]);
    }

    #[test]
    fn location_label_is_embedded() {
        let message = Message::location("Harbor Park", 1);
        assert_eq!(message.content, "[Location: Harbor Park]");
        assert_eq!(message.kind, MessageKind::Location);
    }
}
