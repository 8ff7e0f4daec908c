//! Line-oriented demo host: capabilities print to stderr and answer through
//! the event sink, commands come from stdin.

use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use tokio::task::JoinHandle;

use crate::chat::events::{ChatEvent, HostEvent, UserAction};
use crate::chat::message::{MessageKind, Sender};
use crate::chat::recording::RecordingPhase;
use crate::chat::state::{ConversationState, InputMode};
use crate::host::{
    AudioPlayer, ConfirmRequest, EventSink, HostCapabilities, HostResult, ImageSource,
    MediaPicker, Notifier, Recorder, RecorderOptions,
};

/// How long a console "clip" plays before reporting its natural end.
pub const CONSOLE_CLIP_LENGTH: Duration = Duration::from_secs(3);
/// Vertical press position used when `/hold` omits one.
pub const DEFAULT_PRESS_Y: f32 = 400.0;
const CONSOLE_LOCATION: &str = "Current location";

/// A question waiting for the next input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingPrompt {
    Confirm(ConfirmRequest),
    ActionSheet { items: usize },
}

type SharedPrompt = Arc<Mutex<Option<PendingPrompt>>>;

fn set_prompt(prompt: &SharedPrompt, value: PendingPrompt) {
    match prompt.lock() {
        Ok(mut slot) => *slot = Some(value),
        Err(poisoned) => *poisoned.into_inner() = Some(value),
    }
}

fn take_prompt(prompt: &SharedPrompt) -> Option<PendingPrompt> {
    match prompt.lock() {
        Ok(mut slot) => slot.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

/// Builds the console capability bundle and the matching input interpreter.
pub fn console_host(sink: &EventSink) -> (HostCapabilities, ConsoleInput) {
    let prompt = SharedPrompt::default();
    let host = HostCapabilities::new(
        ConsoleRecorder {
            sink: sink.clone(),
            takes: 0,
            format: String::new(),
        },
        ConsoleAudio {
            sink: sink.clone(),
            playing: None,
        },
        ConsolePicker {
            sink: sink.clone(),
            picked: 0,
        },
        ConsoleNotifier {
            prompt: Arc::clone(&prompt),
        },
    );
    (host, ConsoleInput { prompt })
}

struct ConsoleRecorder {
    sink: EventSink,
    takes: u32,
    format: String,
}

impl Recorder for ConsoleRecorder {
    fn start(&mut self, options: &RecorderOptions) -> HostResult<()> {
        self.format = options.format.clone();
        eprintln!(
            "(recording, up to {}s; /release to send, /move <y> to drag)",
            options.max_duration_ms / 1_000
        );
        Ok(())
    }

    fn stop(&mut self) -> HostResult<()> {
        self.takes += 1;
        self.sink.send(HostEvent::RecorderStopped {
            resource: format!("console://voice-{}.{}", self.takes, self.format),
        });
        Ok(())
    }
}

struct ConsoleAudio {
    sink: EventSink,
    playing: Option<JoinHandle<()>>,
}

impl AudioPlayer for ConsoleAudio {
    fn play(&mut self, resource: &str) -> HostResult<()> {
        self.stop()?;
        eprintln!("(playing {resource})");
        let sink = self.sink.clone();
        self.playing = Some(tokio::spawn(async move {
            tokio::time::sleep(CONSOLE_CLIP_LENGTH).await;
            sink.send(HostEvent::PlaybackEnded);
        }));
        Ok(())
    }

    fn stop(&mut self) -> HostResult<()> {
        if let Some(handle) = self.playing.take() {
            handle.abort();
        }
        Ok(())
    }
}

struct ConsolePicker {
    sink: EventSink,
    picked: u32,
}

impl MediaPicker for ConsolePicker {
    fn pick_image(&mut self, source: ImageSource) -> HostResult<()> {
        self.picked += 1;
        let prefix = match source {
            ImageSource::Album => "album",
            ImageSource::Camera => "camera",
        };
        self.sink.send(HostEvent::ImagePicked {
            source,
            resource: format!("console://{prefix}-{}.jpg", self.picked),
        });
        Ok(())
    }

    fn pick_location(&mut self) -> HostResult<()> {
        self.sink.send(HostEvent::LocationPicked {
            label: CONSOLE_LOCATION.to_string(),
        });
        Ok(())
    }
}

struct ConsoleNotifier {
    prompt: SharedPrompt,
}

impl Notifier for ConsoleNotifier {
    fn toast(&mut self, text: &str) {
        eprintln!("[{text}]");
    }

    fn confirm(&mut self, request: ConfirmRequest, title: &str, body: &str) -> HostResult<()> {
        eprintln!("{title}: {body} (y/n)");
        set_prompt(&self.prompt, PendingPrompt::Confirm(request));
        Ok(())
    }

    fn action_sheet(&mut self, items: &[&str]) -> HostResult<()> {
        for (position, item) in items.iter().enumerate() {
            eprintln!("  {}. {item}", position + 1);
        }
        eprintln!("choose 1-{} (anything else dismisses)", items.len());
        set_prompt(&self.prompt, PendingPrompt::ActionSheet { items: items.len() });
        Ok(())
    }

    fn hide_keyboard(&mut self) {}
}

/// What one input line asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Events(Vec<ChatEvent>),
    Quit,
    Unknown(String),
}

/// Turns stdin lines into events, answering an open prompt first.
#[derive(Debug, Clone)]
pub struct ConsoleInput {
    prompt: SharedPrompt,
}

impl ConsoleInput {
    pub fn interpret(&self, line: &str) -> ConsoleCommand {
        let line = line.trim();
        match take_prompt(&self.prompt) {
            Some(PendingPrompt::Confirm(request)) => {
                let confirmed = matches!(line.to_ascii_lowercase().as_str(), "y" | "yes");
                ConsoleCommand::Events(vec![
                    HostEvent::ConfirmResolved { request, confirmed }.into(),
                ])
            }
            Some(PendingPrompt::ActionSheet { items }) => match line.parse::<usize>() {
                Ok(choice) if (1..=items).contains(&choice) => {
                    ConsoleCommand::Events(vec![
                        HostEvent::ActionSheetSelected { index: choice - 1 }.into(),
                    ])
                }
                _ => {
                    tracing::debug!(line, "action sheet dismissed");
                    ConsoleCommand::Events(Vec::new())
                }
            },
            None => parse_command(line),
        }
    }
}

/// Parses one line with no prompt open.
pub fn parse_command(line: &str) -> ConsoleCommand {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleCommand::Events(Vec::new());
    }

    let Some(command) = line.strip_prefix('/') else {
        return ConsoleCommand::Events(vec![
            UserAction::EditInput(line.to_string()).into(),
            UserAction::SendText.into(),
        ]);
    };

    let mut words = command.split_whitespace();
    let name = words.next().unwrap_or_default();
    let argument = words.next();
    let action = match (name, argument) {
        ("voice", _) => UserAction::ToggleInputMode,
        ("hold", y) => match parse_y(y) {
            Some(y) => UserAction::PressStart {
                y: y.unwrap_or(DEFAULT_PRESS_Y),
            },
            None => return ConsoleCommand::Unknown(line.to_string()),
        },
        ("move", Some(y)) => match y.parse() {
            Ok(y) => UserAction::PressMove { y },
            Err(_) => return ConsoleCommand::Unknown(line.to_string()),
        },
        ("release", y) => match parse_y(y) {
            Some(y) => UserAction::PressRelease { y },
            None => return ConsoleCommand::Unknown(line.to_string()),
        },
        ("cancel", _) => UserAction::CancelRecording,
        ("play", Some(number)) => match number.parse::<usize>() {
            Ok(number) if number > 0 => UserAction::PlayVoice { index: number - 1 },
            _ => return ConsoleCommand::Unknown(line.to_string()),
        },
        ("image", _) => UserAction::ChooseImage,
        ("photo", _) => UserAction::TakePhoto,
        ("location", _) => UserAction::ShareLocation,
        ("more", _) => UserAction::ShowMore,
        ("tray", _) => UserAction::ToggleFunctionTray,
        ("sidebar", _) => UserAction::ToggleSidebar,
        ("clear", _) => UserAction::ClearHistory,
        ("theme", _) => UserAction::SwitchTheme,
        ("settings", _) => UserAction::ShowSettings,
        ("about", _) => UserAction::ShowAbout,
        ("quit", _) => return ConsoleCommand::Quit,
        _ => return ConsoleCommand::Unknown(line.to_string()),
    };
    ConsoleCommand::Events(vec![action.into()])
}

/// `None` on a malformed coordinate, `Some(None)` when it was omitted.
fn parse_y(argument: Option<&str>) -> Option<Option<f32>> {
    match argument {
        None => Some(None),
        Some(raw) => raw.parse().ok().map(Some),
    }
}

/// `HH:MM` wall-clock time of an epoch-millisecond timestamp in `zone`.
pub fn format_clock<Tz>(timestamp_ms: u64, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|utc| utc.with_timezone(zone).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

/// Plain-text rendering of the conversation in local time.
pub fn render_transcript(state: &ConversationState) -> String {
    render_transcript_in(state, &Local)
}

pub fn render_transcript_in<Tz>(state: &ConversationState, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut out = String::new();
    let theme = if state.dark_mode { "dark" } else { "light" };
    let _ = writeln!(out, "== Parley ({theme}) ==");

    if state.is_empty() {
        let _ = writeln!(out, "  Start a conversation");
    } else if state.show_time_divider
        && let Some(first) = state.messages.first()
    {
        let _ = writeln!(out, "  -- {} --", format_clock(first.timestamp_ms, zone));
    }

    for (position, message) in state.messages.iter().enumerate() {
        let who = match message.sender {
            Sender::User => "you",
            Sender::Assistant => "assistant",
        };
        let _ = write!(
            out,
            "#{:<3} {} {who}: {}",
            position + 1,
            format_clock(message.timestamp_ms, zone),
            message.content
        );
        if message.kind == MessageKind::Voice
            && let Some(clip) = &message.voice
        {
            let _ = write!(out, " {}\"", clip.duration_secs);
            if message.is_playing {
                let _ = write!(out, " (playing)");
            }
        }
        out.push('\n');
    }

    if state.is_loading() {
        let _ = writeln!(out, "  assistant is typing...");
    }

    match state.recording.phase {
        RecordingPhase::Recording if state.recording.cancel_intent => {
            let _ = writeln!(out, "  [{}s] release to cancel", state.recording.elapsed_secs);
        }
        RecordingPhase::Recording => {
            let _ = writeln!(
                out,
                "  [{}s] release to send, drag up to cancel",
                state.recording.elapsed_secs
            );
        }
        _ => {}
    }

    let mode = match state.input_mode {
        InputMode::Text => "text",
        InputMode::Voice => "voice",
    };
    let _ = write!(out, "-- mode: {mode}");
    if state.tray_open {
        let _ = write!(out, " | tray: image photo location more");
    }
    if state.sidebar_open {
        let _ = write!(out, " | sidebar: theme settings about clear");
    }
    out.push('\n');
    out
}

/// Prints the transcript only when it changed since the last call.
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    last: String,
}

impl TranscriptPrinter {
    pub fn print(&mut self, state: &ConversationState) {
        let transcript = render_transcript(state);
        if transcript != self.last {
            eprint!("{transcript}");
            self.last = transcript;
        }
    }
}
