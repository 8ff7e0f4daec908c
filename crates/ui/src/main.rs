use std::sync::Arc;

use parley_storage::{SqliteStorage, StorageError};
use parley_ui::chat::ChatEvent;
use parley_ui::console::{ConsoleCommand, ConsoleInput, TranscriptPrinter, console_host};
use parley_ui::history::HistoryStore;
use parley_ui::host::EventSink;
use parley_ui::session::ChatSession;
use parley_ui::settings::{SettingsStore, ThemeMode};
use snafu::{ResultExt, Snafu};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Snafu)]
enum AppError {
    #[snafu(display("failed to open chat history at {location} on `{stage}`: {source}"))]
    OpenHistory {
        stage: &'static str,
        location: String,
        source: StorageError,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings_store = SettingsStore::load();
    let settings = settings_store.settings();
    let database = settings
        .history_database_path(settings_store.config_path())
        .to_string_lossy()
        .into_owned();
    let storage = SqliteStorage::open(&database)
        .await
        .context(OpenHistorySnafu {
            stage: "open-history-database",
            location: database.clone(),
        })?;
    tracing::info!(database = %storage.database_url(), "chat history ready");

    let config = settings.to_chat_config();
    let history = HistoryStore::new(Arc::new(storage), config.history_key.clone());
    let (sink, events) = EventSink::channel();
    let (host, input) = console_host(&sink);
    let session = ChatSession::start(config, host, history, sink.clone(), events);

    let reader = tokio::spawn(read_commands(input, sink));

    let mut printer = TranscriptPrinter::default();
    let mut dark_mode = settings.theme_mode.is_dark();
    session
        .run(|state| {
            printer.print(state);
            if state.dark_mode != dark_mode {
                dark_mode = state.dark_mode;
                if let Err(error) = settings_store.set_theme_mode(ThemeMode::from_dark(dark_mode)) {
                    tracing::warn!("failed to persist theme: {error}");
                }
            }
        })
        .await;

    reader.abort();
    Ok(())
}

/// Forwards stdin lines until `/quit` or end of input, then deactivates the view.
async fn read_commands(input: ConsoleInput, sink: EventSink) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                tracing::warn!("failed to read console input: {error}");
                break;
            }
        };

        match input.interpret(&line) {
            ConsoleCommand::Events(events) => {
                for event in events {
                    sink.send(event);
                }
            }
            ConsoleCommand::Quit => break,
            ConsoleCommand::Unknown(line) => eprintln!("unknown command: {line}"),
        }
    }

    sink.send(ChatEvent::Deactivate);
}
