use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::{ResultExt, Snafu};

use crate::chat::recording::RecordingLimits;
use crate::chat::state::{ChatConfig, DEFAULT_AUDIO_FORMAT, DEFAULT_HISTORY_KEY};

pub const SETTINGS_DIRECTORY_NAME: &str = "parley";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const HISTORY_DATABASE_FILE_NAME: &str = "history.db";

const DEFAULT_REPLY_DELAY_MS: u64 = 1_500;
const DEFAULT_SETTLE_DELAY_MS: u64 = 500;
const DEFAULT_MAX_RECORDING_SECS: u32 = 60;
const DEFAULT_CANCEL_THRESHOLD: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn is_dark(self) -> bool {
        self == Self::Dark
    }

    pub fn from_dark(dark: bool) -> Self {
        if dark { Self::Dark } else { Self::Light }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(
        default,
        serialize_with = "serialize_theme_mode",
        deserialize_with = "deserialize_theme_mode"
    )]
    pub theme_mode: ThemeMode,
    /// SQLite file holding chat history. Empty means next to the settings file.
    #[serde(default)]
    pub history_database: String,
    #[serde(default = "default_history_key")]
    pub history_key: String,
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
    #[serde(default = "default_max_recording_secs")]
    pub max_recording_secs: u32,
    #[serde(default = "default_cancel_threshold")]
    pub cancel_threshold: f32,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            theme_mode: ThemeMode::Light,
            history_database: String::new(),
            history_key: default_history_key(),
            reply_delay_ms: DEFAULT_REPLY_DELAY_MS,
            max_recording_secs: DEFAULT_MAX_RECORDING_SECS,
            cancel_threshold: DEFAULT_CANCEL_THRESHOLD,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            audio_format: default_audio_format(),
        }
    }
}

impl ChatSettings {
    pub fn normalized(mut self) -> Self {
        self.history_database = self.history_database.trim().to_string();
        self.history_key = match self.history_key.trim() {
            "" => default_history_key(),
            key => key.to_string(),
        };
        self.audio_format = match self.audio_format.trim() {
            "" => default_audio_format(),
            format => format.to_ascii_lowercase(),
        };
        if self.max_recording_secs == 0 {
            self.max_recording_secs = DEFAULT_MAX_RECORDING_SECS;
        }
        if !self.cancel_threshold.is_finite() || self.cancel_threshold <= 0.0 {
            self.cancel_threshold = DEFAULT_CANCEL_THRESHOLD;
        }

        self
    }

    pub fn to_chat_config(&self) -> ChatConfig {
        ChatConfig {
            reply_delay: Duration::from_millis(self.reply_delay_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            recording: RecordingLimits {
                max_duration_secs: self.max_recording_secs,
                cancel_threshold: self.cancel_threshold,
                ..RecordingLimits::default()
            },
            audio_format: self.audio_format.clone(),
            history_key: self.history_key.clone(),
            dark_mode: self.theme_mode.is_dark(),
        }
    }

    /// Resolves the history database, defaulting to a file beside `config_path`.
    pub fn history_database_path(&self, config_path: &Path) -> PathBuf {
        if !self.history_database.is_empty() {
            return PathBuf::from(&self.history_database);
        }

        config_path
            .parent()
            .map(|parent| parent.join(HISTORY_DATABASE_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(HISTORY_DATABASE_FILE_NAME))
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<ChatSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".parley"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<ChatSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: ChatSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    /// Persists a theme change; a no-op when the mode is unchanged.
    pub fn set_theme_mode(&self, theme_mode: ThemeMode) -> Result<bool, SettingsError> {
        let current = self.settings();
        if current.theme_mode == theme_mode {
            return Ok(false);
        }

        let mut next = ChatSettings::clone(&current);
        next.theme_mode = theme_mode;
        self.update(next)?;
        Ok(true)
    }

    fn load_from_disk(path: &Path) -> ChatSettings {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
            return ChatSettings::default();
        }

        let figment =
            Figment::from(Serialized::defaults(ChatSettings::default())).merge(Json::file(path));

        match figment.extract::<ChatSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                ChatSettings::default()
            }
        }
    }

    fn persist(&self, settings: &ChatSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!("saved settings to {:?}", self.config_path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

fn default_history_key() -> String {
    DEFAULT_HISTORY_KEY.to_string()
}

fn default_audio_format() -> String {
    DEFAULT_AUDIO_FORMAT.to_string()
}

fn default_reply_delay_ms() -> u64 {
    DEFAULT_REPLY_DELAY_MS
}

fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

fn default_max_recording_secs() -> u32 {
    DEFAULT_MAX_RECORDING_SECS
}

fn default_cancel_threshold() -> f32 {
    DEFAULT_CANCEL_THRESHOLD
}

fn serialize_theme_mode<S>(value: &ThemeMode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.name())
}

fn deserialize_theme_mode<'de, D>(deserializer: D) -> Result<ThemeMode, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(parse_theme_mode(&value))
}

fn parse_theme_mode(value: &str) -> ThemeMode {
    if value.trim().eq_ignore_ascii_case("dark") {
        ThemeMode::Dark
    } else {
        ThemeMode::Light
    }
}
