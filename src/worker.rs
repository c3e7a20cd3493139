//! Background collection worker.
//!
//! A single thread owns the capture device, the landmark detector and the
//! frame buffers. The [`Worker`] handle sends it commands over a task queue
//! and flips shared control flags; the thread reports back through a stream
//! of [`WorkerEvent`]s.

use crate::{
    capture::{CaptureDevice, FrameSource, VideoSource},
    config::Config,
    constants::status,
    cue::CountdownCue,
    dataset::{DatasetLayout, SaveSummary},
    holistic::{HolisticDetector, LandmarkDetector},
    keypoints::{extract_keypoints, HolisticLandmarks},
    overlay::{draw_collection_banner, draw_styled_landmarks},
    Error, Result,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, warn};
use ndarray::Array1;
use opencv::{core::Mat, prelude::*};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Opens the devices a collection session needs
pub trait CaptureBackend: Send {
    /// Open a fresh frame source for one session
    fn open_source(&mut self, config: &Config) -> Result<Box<dyn FrameSource>>;

    /// Create the landmark detector; called once and kept across sessions
    fn open_detector(&mut self, config: &Config) -> Result<Box<dyn LandmarkDetector>>;
}

/// `OpenCV` capture plus the ONNX holistic detector
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBackend;

impl CaptureBackend for DefaultBackend {
    fn open_source(&mut self, config: &Config) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(CaptureDevice::open(VideoSource::from_config(config))?))
    }

    fn open_detector(&mut self, config: &Config) -> Result<Box<dyn LandmarkDetector>> {
        Ok(Box::new(HolisticDetector::from_config(config)?))
    }
}

/// Notifications sent from the worker thread
#[derive(Debug)]
pub enum WorkerEvent {
    /// Human readable status line
    Status(String),
    /// Annotated preview frame; `None` clears the preview
    Frame(Option<Mat>),
    /// The capture loop ended and `buffered` frames await saving
    CollectionFinished {
        /// Frames in the buffer
        buffered: usize,
        /// Whether the loop ended early
        interrupted: bool,
    },
    /// The buffer was written to disk
    Saved(SaveSummary),
}

/// Commands consumed by the worker thread
#[derive(Debug)]
enum Task {
    Start { action: String, generation: u64 },
    Stop { save: bool },
    Save,
    Reset,
    Shutdown,
}

/// Control flags shared between the handle and the capture loop
///
/// Every accepted start gets a fresh generation. `active` holds the
/// generation of the session the handle considers running (0 when idle) and
/// `cancelled` the newest generation a stop or reset has ended, so a start
/// issued right after a stop cannot revive the session being stopped.
#[derive(Debug, Default)]
struct Flags {
    shutdown: AtomicBool,
    paused: AtomicBool,
    next_generation: AtomicU64,
    active: AtomicU64,
    cancelled: AtomicU64,
}

impl Flags {
    /// Mark the running session as ended, returning whether there was one
    fn cancel_active(&self) -> bool {
        let generation = self.active.swap(0, Ordering::SeqCst);
        self.cancelled.fetch_max(generation, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        generation != 0
    }

    /// Clear `active` only if it still belongs to `generation`
    fn finish(&self, generation: u64) -> bool {
        let current = self
            .active
            .compare_exchange(generation, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if current {
            self.paused.store(false, Ordering::SeqCst);
        }
        current
    }

    fn is_cancelled(&self, generation: u64) -> bool {
        self.shutdown.load(Ordering::SeqCst) || self.cancelled.load(Ordering::SeqCst) >= generation
    }
}

/// How the capture loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopEnd {
    Completed,
    Interrupted,
}

/// Handle to the collection thread
///
/// Dropping the handle shuts the thread down.
pub struct Worker {
    tasks: Sender<Task>,
    events: Sender<WorkerEvent>,
    flags: Arc<Flags>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn the worker thread
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned
    pub fn spawn(
        config: Config,
        backend: Box<dyn CaptureBackend>,
        cue: Box<dyn CountdownCue>,
    ) -> Result<(Self, Receiver<WorkerEvent>)> {
        let (task_tx, task_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let flags = Arc::new(Flags::default());

        let mut session = Session {
            layout: DatasetLayout::from_config(&config),
            config,
            backend,
            cue,
            flags: Arc::clone(&flags),
            events: event_tx.clone(),
            action: None,
            generation: 0,
            source: None,
            detector: None,
            frames: Vec::new(),
            images: Vec::new(),
        };

        let handle = thread::Builder::new()
            .name("collector".to_string())
            .spawn(move || session.run(&task_rx))
            .map_err(|e| Error::Worker(format!("Failed to spawn worker thread: {e}")))?;

        Ok((
            Self {
                tasks: task_tx,
                events: event_tx,
                flags,
                handle: Some(handle),
            },
            event_rx,
        ))
    }

    /// Begin a collection session for `action`
    pub fn start(&self, action: &str) {
        if action.trim().is_empty() {
            self.status(status::SELECT_ACTION);
            return;
        }
        let generation = self.flags.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self
            .flags
            .active
            .compare_exchange(0, generation, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Start ignored: a collection is already running");
            return;
        }
        self.flags.paused.store(false, Ordering::SeqCst);
        self.send(Task::Start {
            action: action.to_string(),
            generation,
        });
    }

    /// Hold the capture loop before its next frame
    pub fn pause(&self) {
        if self.is_collecting() && !self.flags.paused.swap(true, Ordering::SeqCst) {
            info!("Collection paused");
            self.status(status::PAUSED);
        }
    }

    /// Continue a paused capture loop from the frame it stopped at
    pub fn resume(&self) {
        if self.is_collecting() && self.flags.paused.swap(false, Ordering::SeqCst) {
            info!("Collection resumed");
            self.status(status::RESUMED);
        }
    }

    /// End the session and save whatever was collected
    pub fn stop(&self) {
        let was_collecting = self.flags.cancel_active();
        self.send(Task::Stop { save: was_collecting });
    }

    /// Write the buffered frames to disk
    pub fn save(&self) {
        self.send(Task::Save);
    }

    /// Abort the session, release the camera and drop every buffered frame
    pub fn reset(&self) {
        self.flags.cancel_active();
        self.send(Task::Reset);
    }

    /// Whether a session is running
    #[must_use]
    pub fn is_collecting(&self) -> bool {
        self.flags.active.load(Ordering::SeqCst) != 0
    }

    /// Whether the running session is paused
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.flags.paused.load(Ordering::SeqCst)
    }

    /// Stop the thread and wait for it to exit
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.flags.shutdown.store(true, Ordering::SeqCst);
        self.flags.cancel_active();
        let _ = self.tasks.send(Task::Shutdown);
        if handle.join().is_err() {
            error!("Worker thread panicked");
        }
    }

    fn send(&self, task: Task) {
        if self.tasks.send(task).is_err() {
            error!("Worker thread is no longer running");
        }
    }

    fn status(&self, message: &str) {
        let _ = self.events.send(WorkerEvent::Status(message.to_string()));
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// State owned by the worker thread
struct Session {
    config: Config,
    layout: DatasetLayout,
    backend: Box<dyn CaptureBackend>,
    cue: Box<dyn CountdownCue>,
    flags: Arc<Flags>,
    events: Sender<WorkerEvent>,
    action: Option<String>,
    generation: u64,
    source: Option<Box<dyn FrameSource>>,
    detector: Option<Box<dyn LandmarkDetector>>,
    frames: Vec<Array1<f32>>,
    images: Vec<Mat>,
}

impl Session {
    fn run(&mut self, tasks: &Receiver<Task>) {
        debug!("Worker thread started");
        for task in tasks {
            debug!("Worker task: {task:?}");
            match task {
                Task::Start { action, generation } => self.start(action, generation),
                Task::Stop { save } => {
                    if save || !self.frames.is_empty() {
                        self.save();
                    }
                    self.status(status::STOPPED);
                }
                Task::Save => self.save(),
                Task::Reset => self.reset(),
                Task::Shutdown => break,
            }
        }
        self.release_source();
        debug!("Worker thread exiting");
    }

    fn start(&mut self, action: String, generation: u64) {
        info!("Starting collection for '{action}'");
        self.generation = generation;
        self.action = Some(action);
        self.frames.clear();
        self.images.clear();

        if let Err(e) = self.open_devices() {
            error!("Failed to initialize collection: {e}");
            self.flags.finish(generation);
            self.status(&format!("Error initializing collection: {e}"));
            return;
        }

        let end = match self.collect() {
            Ok(end) => end,
            Err(e) => {
                error!("Collection failed: {e}");
                self.status(&format!("Error during collection: {e}"));
                LoopEnd::Interrupted
            }
        };

        self.release_source();
        if !self.flags.finish(generation) {
            debug!("Session {generation} was ended from the handle");
        }
        self.emit(WorkerEvent::Frame(None));
        let message = match end {
            LoopEnd::Completed => status::COMPLETED,
            LoopEnd::Interrupted => status::INTERRUPTED,
        };
        info!(
            "{message}: {} of {} frame(s) buffered",
            self.frames.len(),
            self.config.frames_per_session()
        );
        self.status(message);
        self.emit(WorkerEvent::CollectionFinished {
            buffered: self.frames.len(),
            interrupted: end == LoopEnd::Interrupted,
        });
    }

    fn open_devices(&mut self) -> Result<()> {
        self.release_source();
        self.source = Some(self.backend.open_source(&self.config)?);
        match self.detector.as_mut() {
            Some(detector) => detector.reset(),
            None => self.detector = Some(self.backend.open_detector(&self.config)?),
        }
        Ok(())
    }

    /// Countdown, then the per-sequence, per-frame capture loop
    fn collect(&mut self) -> Result<LoopEnd> {
        let (Some(mut source), Some(mut detector)) = (self.source.take(), self.detector.take()) else {
            self.status(status::NOT_STARTED);
            return Ok(LoopEnd::Interrupted);
        };
        let result = self.capture_loop(source.as_mut(), detector.as_mut());
        self.source = Some(source);
        self.detector = Some(detector);
        result
    }

    fn capture_loop(&mut self, source: &mut dyn FrameSource, detector: &mut dyn LandmarkDetector) -> Result<LoopEnd> {
        let timing = self.config.timing.clone();
        let action = self.action.clone().unwrap_or_default();

        for remaining in (1..=timing.countdown_seconds).rev() {
            if self.stopped() {
                return Ok(LoopEnd::Interrupted);
            }
            self.status(&format!("Starting in {remaining}..."));
            if !self.sleep_unless_stopped(Duration::from_secs(1)) {
                return Ok(LoopEnd::Interrupted);
            }
            if let Err(e) = self.cue.tick(remaining) {
                warn!("Countdown cue failed: {e}");
            }
        }

        for sequence in self.config.sequence_range() {
            for frame_num in 0..self.config.sequence_length {
                if self.stopped() {
                    return Ok(LoopEnd::Interrupted);
                }

                while self.flags.paused.load(Ordering::SeqCst) && !self.stopped() {
                    thread::sleep(timing.pause_poll());
                }
                if self.stopped() {
                    return Ok(LoopEnd::Interrupted);
                }

                let frame = match source.read() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("Skipping frame {frame_num} of sequence {sequence}: {e}");
                        continue;
                    }
                };

                let landmarks = detector.detect(&frame).unwrap_or_else(|e| {
                    warn!("Landmark detection failed: {e}");
                    HolisticLandmarks::default()
                });
                if landmarks.is_empty() {
                    debug!("No landmarks in frame {frame_num} of sequence {sequence}");
                }

                let mut image = frame.try_clone()?;
                draw_styled_landmarks(&mut image, &landmarks)?;
                let first_frame = frame_num == 0;
                draw_collection_banner(&mut image, &action, sequence, first_frame)?;
                self.emit(WorkerEvent::Frame(Some(image)));
                if first_frame && !self.sleep_unless_stopped(timing.sequence_start_delay()) {
                    return Ok(LoopEnd::Interrupted);
                }

                self.frames.push(extract_keypoints(&landmarks));
                self.images.push(frame);

                if !timing.frame_delay().is_zero() {
                    thread::sleep(timing.frame_delay());
                }
            }
            debug!("Sequence {sequence} of '{action}' captured");
        }

        Ok(LoopEnd::Completed)
    }

    fn save(&mut self) {
        let Some(action) = self.action.clone() else {
            self.status(status::NO_ACTION);
            return;
        };

        match self.layout.save(&action, &self.frames, &self.images) {
            Ok(summary) => {
                self.frames.clear();
                self.images.clear();
                self.emit(WorkerEvent::Saved(summary));
                self.status(status::SAVED);
            }
            Err(e) => {
                error!("Failed to save data: {e}");
                self.status(&format!("Error saving data: {e}"));
            }
        }
    }

    fn reset(&mut self) {
        self.release_source();
        self.source = None;
        if let Some(detector) = self.detector.as_mut() {
            detector.reset();
        }
        self.frames.clear();
        self.images.clear();
        self.action = None;
        info!("Worker reset");
        self.emit(WorkerEvent::Frame(None));
        self.status(status::RESET);
    }

    fn release_source(&mut self) {
        if let Some(source) = self.source.as_mut() {
            if let Err(e) = source.release() {
                warn!("Failed to release capture device: {e}");
            }
        }
    }

    fn stopped(&self) -> bool {
        self.flags.is_cancelled(self.generation)
    }

    /// Sleep for `duration`, waking early on stop; returns false when stopped
    fn sleep_unless_stopped(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let step = self.config.timing.pause_poll();
        loop {
            if self.stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(step.min(deadline - now));
        }
    }

    fn status(&self, message: &str) {
        self.emit(WorkerEvent::Status(message.to_string()));
    }

    fn emit(&self, event: WorkerEvent) {
        // The receiver going away only means nobody is watching
        let _ = self.events.send(event);
    }
}
