//! Configuration management for the landmark collector

use crate::constants::{
    DEFAULT_COUNTDOWN_SECONDS, DEFAULT_FRAME_DELAY_MS, DEFAULT_PAUSE_POLL_MS, DEFAULT_SEQUENCE_START_DELAY_MS,
};
use crate::{Error, Result};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Collector configuration
///
/// The top-level keys mirror the `config.json` the collector has always read,
/// so existing configuration files load unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root folder of the recorded dataset
    pub data_path: PathBuf,

    /// Ordered list of action labels
    pub actions: Vec<String>,

    /// Number of sequences recorded per session
    pub no_sequences: usize,

    /// Number of frames in each sequence
    pub sequence_length: usize,

    /// Index of the first sequence folder
    pub start_folder: usize,

    /// Webcam index passed to the capture backend
    pub camera_index: i32,

    /// Record from a video file instead of the webcam
    pub video_file: Option<PathBuf>,

    /// Minimum score for a landmark group to be detected
    pub min_detection_confidence: f32,

    /// Minimum score for a landmark group to keep being tracked
    pub min_tracking_confidence: f32,

    /// Keypoint file format
    pub file_format: FileFormat,

    /// Also write the raw camera frames as `.jpg`
    pub save_images: bool,

    /// WAV file played on each countdown tick
    pub cue_sound: Option<PathBuf>,

    /// Landmark model paths
    pub models: ModelConfig,

    /// Collection loop timings
    pub timing: TimingConfig,
}

/// Keypoint file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// `NumPy` `.npy` array
    #[default]
    Npy,
    /// Python pickle (`.pkl`) holding a flat list of floats
    Pickle,
}

impl FileFormat {
    /// Parse a format name; anything other than `pickle` selects `.npy`
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("pickle") {
            return Self::Pickle;
        }
        if !name.trim().eq_ignore_ascii_case("npy") {
            warn!("Unknown file_format '{name}', writing .npy files");
        }
        Self::Npy
    }

    /// File extension written for this format
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Npy => "npy",
            Self::Pickle => "pkl",
        }
    }
}

impl<'de> Deserialize<'de> for FileFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// ONNX landmark model paths
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Full-body pose landmark model (33 landmarks)
    pub pose_landmark: PathBuf,

    /// Face mesh landmark model (468 landmarks)
    pub face_landmark: PathBuf,

    /// Hand landmark model (21 landmarks)
    pub hand_landmark: PathBuf,
}

/// Collection loop timings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Seconds counted down before the first frame
    pub countdown_seconds: u32,

    /// Hold after the first frame of each sequence
    pub sequence_start_delay_ms: u64,

    /// Delay between consecutive frames
    pub frame_delay_ms: u64,

    /// Poll interval while paused
    pub pause_poll_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("MP_Data"),
            actions: Vec::new(),
            no_sequences: 30,
            sequence_length: 30,
            start_folder: 0,
            camera_index: 0,
            video_file: None,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            file_format: FileFormat::Npy,
            save_images: false,
            cue_sound: Some(PathBuf::from("note.wav")),
            models: ModelConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            pose_landmark: PathBuf::from("assets/pose_landmark.onnx"),
            face_landmark: PathBuf::from("assets/face_landmark.onnx"),
            hand_landmark: PathBuf::from("assets/hand_landmark.onnx"),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            sequence_start_delay_ms: DEFAULT_SEQUENCE_START_DELAY_MS,
            frame_delay_ms: DEFAULT_FRAME_DELAY_MS,
            pause_poll_ms: DEFAULT_PAUSE_POLL_MS,
        }
    }
}

impl TimingConfig {
    /// Timings with every delay disabled, for scripted runs
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            countdown_seconds: 0,
            sequence_start_delay_ms: 0,
            frame_delay_ms: 0,
            pause_poll_ms: 5,
        }
    }

    /// Hold after the first frame of a sequence
    #[must_use]
    pub fn sequence_start_delay(&self) -> Duration {
        Duration::from_millis(self.sequence_start_delay_ms)
    }

    /// Delay between frames
    #[must_use]
    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }

    /// Poll interval while paused
    #[must_use]
    pub fn pause_poll(&self) -> Duration {
        Duration::from_millis(self.pause_poll_ms.max(1))
    }
}

/// Serialization format, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(Error::ConfigError(format!(
                "Unsupported config file extension: {}",
                path.display()
            ))),
        }
    }
}

impl Config {
    /// Load configuration from a JSON or YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => Self::from_json(&content),
            ConfigFormat::Yaml => Self::from_yaml(&content),
        }
    }

    /// Parse configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a JSON or YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Yaml => serde_yaml::to_string(self)?,
        };

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Sequence indices covered by one session
    #[must_use]
    pub fn sequence_range(&self) -> std::ops::Range<usize> {
        self.start_folder..self.start_folder.saturating_add(self.no_sequences)
    }

    /// Number of frames one full session records
    #[must_use]
    pub fn frames_per_session(&self) -> usize {
        self.no_sequences.saturating_mul(self.sequence_length)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            return Err(Error::ConfigError(
                "min_detection_confidence must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_tracking_confidence) {
            return Err(Error::ConfigError(
                "min_tracking_confidence must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.no_sequences == 0 {
            return Err(Error::ConfigError("no_sequences must be greater than 0".to_string()));
        }
        if self.sequence_length == 0 {
            return Err(Error::ConfigError("sequence_length must be greater than 0".to_string()));
        }
        if self.start_folder.checked_add(self.no_sequences).is_none() {
            return Err(Error::ConfigError(
                "start_folder + no_sequences exceeds the largest sequence index".to_string(),
            ));
        }
        if self.no_sequences.checked_mul(self.sequence_length).is_none() {
            return Err(Error::ConfigError(
                "no_sequences * sequence_length is too large".to_string(),
            ));
        }

        if self.actions.is_empty() {
            return Err(Error::ConfigError("At least one action must be configured".to_string()));
        }
        for action in &self.actions {
            validate_action_label(action)?;
        }

        Ok(())
    }
}

/// Check that an action label can be used as a folder name
pub fn validate_action_label(action: &str) -> Result<()> {
    if action.trim().is_empty() {
        return Err(Error::ConfigError("Action labels must not be empty".to_string()));
    }
    if action.contains(['/', '\\']) || action == "." || action == ".." {
        return Err(Error::ConfigError(format!(
            "Action label is not a valid folder name: {action}"
        )));
    }
    Ok(())
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"{
  "data_path": "MP_Data",
  "actions": ["hello", "thanks", "iloveyou"],
  "no_sequences": 30,
  "sequence_length": 30,
  "start_folder": 0,
  "camera_index": 0,
  "min_detection_confidence": 0.5,
  "min_tracking_confidence": 0.5,
  "file_format": "npy",
  "save_images": false,
  "cue_sound": "note.wav",
  "models": {
    "pose_landmark": "assets/pose_landmark.onnx",
    "face_landmark": "assets/face_landmark.onnx",
    "hand_landmark": "assets/hand_landmark.onnx"
  },
  "timing": {
    "countdown_seconds": 3,
    "sequence_start_delay_ms": 500,
    "frame_delay_ms": 10,
    "pause_poll_ms": 100
  }
}
"#;
