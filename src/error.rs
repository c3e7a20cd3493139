//! Error types for the landmark collector.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// `ONNX` Runtime inference failed
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::OrtError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON configuration could not be parsed or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration could not be parsed or written
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Keypoint vector could not be pickled
    #[error("Pickle error: {0}")]
    Pickle(#[from] serde_pickle::Error),

    /// Keypoint vector could not be written as `.npy`
    #[error("NPY write error: {0}")]
    Npy(#[from] ndarray_npy::WriteNpyError),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model loading or inference error
    #[error("Model error: {0}")]
    ModelError(String),

    /// Model output processing error
    #[error("Model output error: {0}")]
    ModelOutputError(String),

    /// Capture device could not be opened or read
    #[error("Capture error: {0}")]
    Capture(String),

    /// Dataset layout or persistence error
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Countdown cue playback error
    #[error("Audio error: {0}")]
    Audio(String),

    /// Worker thread communication error
    #[error("Worker error: {0}")]
    Worker(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
