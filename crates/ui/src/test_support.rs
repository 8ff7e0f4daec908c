//! In-memory host fakes and a paused-clock harness for view-model tests.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use parley_storage::MemoryStore;

use crate::chat::events::{ChatEvent, HostEvent, UserAction};
use crate::chat::state::{ChatConfig, ConversationState};
use crate::chat::view_model::ChatViewModel;
use crate::history::HistoryStore;
use crate::host::{
    AudioPlayer, Capability, ConfirmRequest, DeniedSnafu, EventSink, EventStream,
    HostCapabilities, HostResult, ImageSource, MediaPicker, Notifier, Recorder, RecorderOptions,
    UnavailableSnafu,
};

/// Everything the fakes were asked to do.
#[derive(Debug, Default)]
pub(crate) struct HostLog {
    pub toasts: Vec<String>,
    pub recorder_starts: Vec<RecorderOptions>,
    pub recorder_stops: usize,
    pub played: Vec<String>,
    pub audio_stops: usize,
    pub image_requests: Vec<ImageSource>,
    pub location_requests: usize,
    pub confirms: Vec<ConfirmRequest>,
    pub keyboard_hides: usize,
}

pub(crate) type SharedLog = Arc<Mutex<HostLog>>;

fn lock(log: &SharedLog) -> MutexGuard<'_, HostLog> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct HostOptions {
    pub fail_recorder: bool,
    pub deny_picker: bool,
    /// Answer given to every confirmation dialog.
    pub confirm: bool,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            fail_recorder: false,
            deny_picker: false,
            confirm: true,
        }
    }
}

pub(crate) struct FakeRecorder {
    log: SharedLog,
    sink: EventSink,
    takes: u32,
    fail_start: bool,
}

impl Recorder for FakeRecorder {
    fn start(&mut self, options: &RecorderOptions) -> HostResult<()> {
        if self.fail_start {
            return UnavailableSnafu {
                stage: "fake-recorder-start",
                capability: Capability::Recorder,
                details: "no microphone",
            }
            .fail();
        }
        lock(&self.log).recorder_starts.push(options.clone());
        Ok(())
    }

    fn stop(&mut self) -> HostResult<()> {
        lock(&self.log).recorder_stops += 1;
        self.takes += 1;
        self.sink.send(HostEvent::RecorderStopped {
            resource: format!("tmp://voice-{}.mp3", self.takes),
        });
        Ok(())
    }
}

pub(crate) struct FakeAudio {
    log: SharedLog,
}

impl AudioPlayer for FakeAudio {
    fn play(&mut self, resource: &str) -> HostResult<()> {
        lock(&self.log).played.push(resource.to_string());
        Ok(())
    }

    fn stop(&mut self) -> HostResult<()> {
        lock(&self.log).audio_stops += 1;
        Ok(())
    }
}

pub(crate) struct FakePicker {
    log: SharedLog,
    sink: EventSink,
    picked: u32,
    deny: bool,
}

impl MediaPicker for FakePicker {
    fn pick_image(&mut self, source: ImageSource) -> HostResult<()> {
        if self.deny {
            return DeniedSnafu {
                stage: "fake-pick-image",
                capability: Capability::ImagePicker,
            }
            .fail();
        }
        lock(&self.log).image_requests.push(source);
        self.picked += 1;
        self.sink.send(HostEvent::ImagePicked {
            source,
            resource: format!("tmp://image-{}.jpg", self.picked),
        });
        Ok(())
    }

    fn pick_location(&mut self) -> HostResult<()> {
        if self.deny {
            return DeniedSnafu {
                stage: "fake-pick-location",
                capability: Capability::LocationPicker,
            }
            .fail();
        }
        lock(&self.log).location_requests += 1;
        self.sink.send(HostEvent::LocationPicked {
            label: "Harbor Park".to_string(),
        });
        Ok(())
    }
}

pub(crate) struct FakeNotifier {
    log: SharedLog,
    sink: EventSink,
    confirm: bool,
}

impl Notifier for FakeNotifier {
    fn toast(&mut self, text: &str) {
        lock(&self.log).toasts.push(text.to_string());
    }

    fn confirm(&mut self, request: ConfirmRequest, _title: &str, _body: &str) -> HostResult<()> {
        lock(&self.log).confirms.push(request);
        self.sink.send(HostEvent::ConfirmResolved {
            request,
            confirmed: self.confirm,
        });
        Ok(())
    }

    fn action_sheet(&mut self, _items: &[&str]) -> HostResult<()> {
        self.sink.send(HostEvent::ActionSheetSelected { index: 1 });
        Ok(())
    }

    fn hide_keyboard(&mut self) {
        lock(&self.log).keyboard_hides += 1;
    }
}

pub(crate) fn fake_host(sink: &EventSink, options: HostOptions) -> (HostCapabilities, SharedLog) {
    let log = SharedLog::default();
    let host = HostCapabilities::new(
        FakeRecorder {
            log: log.clone(),
            sink: sink.clone(),
            takes: 0,
            fail_start: options.fail_recorder,
        },
        FakeAudio { log: log.clone() },
        FakePicker {
            log: log.clone(),
            sink: sink.clone(),
            picked: 0,
            deny: options.deny_picker,
        },
        FakeNotifier {
            log: log.clone(),
            sink: sink.clone(),
            confirm: options.confirm,
        },
    );
    (host, log)
}

/// A view-model wired to fakes, driven the way a session loop drives it.
pub(crate) struct Harness {
    pub vm: ChatViewModel,
    pub events: EventStream,
    pub store: Arc<MemoryStore>,
    log: SharedLog,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), HostOptions::default())
    }

    pub fn with_store(store: Arc<MemoryStore>, options: HostOptions) -> Self {
        let config = ChatConfig::default();
        let (sink, events) = EventSink::channel();
        let (host, log) = fake_host(&sink, options);
        let history = HistoryStore::new(store.clone(), config.history_key.clone());
        let vm = ChatViewModel::activate(config, host, history, sink);
        Self {
            vm,
            events,
            store,
            log,
        }
    }

    pub fn act(&mut self, action: UserAction) {
        self.act_event(ChatEvent::User(action));
    }

    pub fn act_event(&mut self, event: ChatEvent) {
        self.vm.handle(event);
        self.drain();
    }

    /// Feeds every queued event, including ones queued while handling.
    pub fn drain(&mut self) {
        while let Ok(Some(event)) = self.events.try_next() {
            self.vm.handle(event);
        }
    }

    pub async fn advance(&mut self, millis: u64) {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        self.drain();
    }

    pub fn state(&self) -> &ConversationState {
        self.vm.state()
    }

    pub fn log(&self) -> MutexGuard<'_, HostLog> {
        lock(&self.log)
    }

    pub fn toasts(&self) -> Vec<String> {
        self.log().toasts.clone()
    }
}
