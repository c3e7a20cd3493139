//! On-disk dataset layout: `<data_path>/<action>/<sequence>/<frame>.<ext>`.

use crate::config::{Config, FileFormat};
use crate::{Error, Result};
use log::{debug, info, warn};
use ndarray::Array1;
use opencv::{core::Mat, core::Vector, imgcodecs};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Outcome of writing a frame buffer to disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// Keypoint files written
    pub written: usize,
    /// Frames beyond the configured sequence range
    pub dropped: usize,
    /// Raw images written
    pub images: usize,
}

/// Existing state of one action folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFolder {
    /// Action label
    pub action: String,
    /// Highest numeric sequence folder already present, if any
    pub highest_sequence: Option<usize>,
    /// Sequence folders in the configured range that already hold files
    pub occupied: Vec<usize>,
}

/// Maps buffered frames onto the sequence folders of one dataset
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    data_path: PathBuf,
    start_folder: usize,
    no_sequences: usize,
    sequence_length: usize,
    file_format: FileFormat,
    save_images: bool,
}

impl DatasetLayout {
    /// Layout described by the configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            data_path: config.data_path.clone(),
            start_folder: config.start_folder,
            no_sequences: config.no_sequences,
            sequence_length: config.sequence_length,
            file_format: config.file_format,
            save_images: config.save_images,
        }
    }

    /// Folder holding one sequence
    #[must_use]
    pub fn sequence_dir(&self, action: &str, sequence: usize) -> PathBuf {
        self.data_path.join(action).join(sequence.to_string())
    }

    /// Sequence folder and frame index for the `index`-th buffered frame,
    /// or `None` once the configured sequence range is exhausted
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<(usize, usize)> {
        if self.sequence_length == 0 {
            return None;
        }
        let offset = index / self.sequence_length;
        if offset >= self.no_sequences {
            return None;
        }
        Some((self.start_folder.checked_add(offset)?, index % self.sequence_length))
    }

    /// Keypoint file path for a frame
    #[must_use]
    pub fn frame_path(&self, action: &str, sequence: usize, frame: usize) -> PathBuf {
        self.sequence_dir(action, sequence)
            .join(format!("{frame}.{}", self.file_format.extension()))
    }

    /// Raw image path for a frame
    #[must_use]
    pub fn image_path(&self, action: &str, sequence: usize, frame: usize) -> PathBuf {
        self.sequence_dir(action, sequence).join(format!("{frame}.jpg"))
    }

    /// Create the sequence folders of every action and report what is already there
    ///
    /// Sequence folders that already hold files are reported and logged; a
    /// new session writing into them overwrites frame files with the same index.
    pub fn prepare<S: AsRef<str>>(&self, actions: &[S]) -> Result<Vec<ActionFolder>> {
        fs::create_dir_all(&self.data_path)?;

        let mut folders = Vec::with_capacity(actions.len());
        for action in actions {
            let action = action.as_ref();
            let action_path = self.data_path.join(action);
            fs::create_dir_all(&action_path)?;

            let highest_sequence = highest_sequence_folder(&action_path)?;

            let mut occupied = Vec::new();
            for sequence in self.start_folder..self.start_folder.saturating_add(self.no_sequences) {
                let dir = self.sequence_dir(action, sequence);
                fs::create_dir_all(&dir)?;
                if fs::read_dir(&dir)?.next().is_some() {
                    occupied.push(sequence);
                }
            }

            if !occupied.is_empty() {
                warn!(
                    "{} sequence folder(s) of '{action}' already hold data and will be overwritten (first: {})",
                    occupied.len(),
                    occupied[0]
                );
            }
            debug!("Prepared '{action}', highest existing sequence {highest_sequence:?}");

            folders.push(ActionFolder {
                action: action.to_string(),
                highest_sequence,
                occupied,
            });
        }

        Ok(folders)
    }

    /// Write buffered keypoints (and images, when enabled) into sequence folders
    ///
    /// Frame `i` goes to folder `start_folder + i / sequence_length` as file
    /// `i % sequence_length`; frames past the last configured sequence are dropped.
    pub fn save(&self, action: &str, frames: &[Array1<f32>], images: &[Mat]) -> Result<SaveSummary> {
        crate::config::validate_action_label(action)?;

        let mut summary = SaveSummary::default();
        for (index, keypoints) in frames.iter().enumerate() {
            let Some((sequence, frame)) = self.slot(index) else {
                summary.dropped = frames.len() - index;
                break;
            };

            fs::create_dir_all(self.sequence_dir(action, sequence))?;

            if self.save_images {
                if let Some(image) = images.get(index) {
                    let path = self.image_path(action, sequence, frame);
                    if !imgcodecs::imwrite(&path.to_string_lossy(), image, &Vector::new())? {
                        return Err(Error::Dataset(format!("Failed to write image {}", path.display())));
                    }
                    summary.images += 1;
                }
            }

            let path = self.frame_path(action, sequence, frame);
            write_keypoints(&path, keypoints, self.file_format)?;
            summary.written += 1;
        }

        if summary.dropped > 0 {
            warn!("Dropped {} frame(s) beyond the configured sequence range", summary.dropped);
        }
        info!(
            "Saved {} keypoint file(s) and {} image(s) for '{action}' under {}",
            summary.written,
            summary.images,
            self.data_path.display()
        );

        Ok(summary)
    }
}

/// Write one keypoint vector in the requested format
pub fn write_keypoints(path: &Path, keypoints: &Array1<f32>, format: FileFormat) -> Result<()> {
    match format {
        FileFormat::Npy => ndarray_npy::write_npy(path, keypoints)?,
        FileFormat::Pickle => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_pickle::to_writer(&mut writer, &keypoints.to_vec(), serde_pickle::SerOptions::new())?;
        }
    }
    Ok(())
}

/// Highest folder name under `action_path` that parses as a sequence index
fn highest_sequence_folder(action_path: &Path) -> Result<Option<usize>> {
    let mut highest = None;
    for entry in fs::read_dir(action_path)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(index) = entry.file_name().to_str().and_then(|name| name.parse::<usize>().ok()) {
            highest = highest.max(Some(index));
        }
    }
    Ok(highest)
}
