//! Landmark sequence collector for action recognition datasets.
//!
//! This library records labeled sequences of body, face and hand landmarks
//! from a webcam or a video file using:
//! - ONNX Runtime for the pose, face and hand landmark models
//! - `OpenCV` for capture, drawing and the preview window
//! - `ndarray` for fixed-length keypoint vectors written as `.npy` or `.pkl`
//!
//! The collection pipeline consists of:
//! 1. A countdown with an audible cue
//! 2. Reading frames and estimating landmarks for each sequence
//! 3. Flattening the landmarks into a 1662 value keypoint vector
//! 4. Saving each frame under `<data_path>/<action>/<sequence>/<frame>.<ext>`
//!
//! # Examples
//!
//! ## Extracting keypoints
//!
//! ```
//! use landmark_collector::keypoints::{extract_keypoints, HolisticLandmarks, Landmark};
//!
//! let landmarks = HolisticLandmarks {
//!     right_hand: Some(vec![Landmark::new(0.5, 0.5, 0.0); 21]),
//!     ..Default::default()
//! };
//! let keypoints = extract_keypoints(&landmarks);
//! assert_eq!(keypoints.len(), 1662);
//! ```
//!
//! ## Recording a session
//!
//! ```no_run
//! use landmark_collector::{config::Config, cue::SilentCue, worker::{DefaultBackend, Worker, WorkerEvent}};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_file("config.json")?;
//! let (worker, events) = Worker::spawn(config, Box::new(DefaultBackend), Box::new(SilentCue))?;
//!
//! worker.start("hello");
//! for event in &events {
//!     if let WorkerEvent::CollectionFinished { buffered, .. } = event {
//!         println!("{buffered} frames recorded");
//!         break;
//!     }
//! }
//! worker.save();
//! # Ok(())
//! # }
//! ```

/// Landmark estimation with ONNX pose, face and hand models
pub mod holistic;

/// Landmark types and keypoint vector extraction
pub mod keypoints;

/// Landmark overlays and collection captions
pub mod overlay;

/// Webcam and video file frame sources
pub mod capture;

/// Dataset folder layout and keypoint persistence
pub mod dataset;

/// Countdown cue playback
pub mod cue;

/// Background collection worker
pub mod worker;

/// Utility functions for image processing and coordinate transformations
pub mod utils;

/// Error types and result handling
pub mod error;

/// Interactive window and headless runner
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
