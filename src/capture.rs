//! Frame sources for the collection loop.

use crate::config::Config;
use crate::{Error, Result};
use log::{debug, info};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE},
};
use std::path::PathBuf;

/// Video source type
#[derive(Debug, Clone, PartialEq)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(PathBuf),
}

impl VideoSource {
    /// Source selected by the configuration; a video file wins over the camera
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        match &config.video_file {
            Some(path) => Self::File(path.clone()),
            None => Self::Camera(config.camera_index),
        }
    }
}

/// A source of BGR frames
pub trait FrameSource: Send {
    /// Read the next frame; `Ok(None)` means this read failed and should be skipped
    fn read(&mut self) -> Result<Option<Mat>>;

    /// Release the underlying device
    fn release(&mut self) -> Result<()>;

    /// Whether the device is open
    fn is_opened(&self) -> bool;
}

/// `OpenCV` capture device for a webcam or a video file
pub struct CaptureDevice {
    capture: VideoCapture,
    source: VideoSource,
}

impl CaptureDevice {
    /// Open a capture device
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened
    pub fn open(source: VideoSource) -> Result<Self> {
        let capture = match &source {
            VideoSource::Camera(index) => {
                info!("Opening camera {index}");
                let mut cap = VideoCapture::new(*index, videoio::CAP_ANY)?;
                // Keep latency low: the loop only wants the newest frame
                cap.set(CAP_PROP_BUFFERSIZE, 1.0)?;
                cap
            }
            VideoSource::File(path) => {
                info!("Opening video file: {}", path.display());
                VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)?
            }
        };

        if !capture.is_opened()? {
            return Err(Error::Capture(format!("Failed to open {source:?}")));
        }

        Ok(Self { capture, source })
    }
}

impl FrameSource for CaptureDevice {
    fn read(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            debug!("Frame read failed on {:?}", self.source);
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn release(&mut self) -> Result<()> {
        if self.capture.is_opened()? {
            info!("Releasing {:?}", self.source);
            self.capture.release()?;
        }
        Ok(())
    }

    fn is_opened(&self) -> bool {
        self.capture.is_opened().unwrap_or(false)
    }
}

impl Drop for CaptureDevice {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
