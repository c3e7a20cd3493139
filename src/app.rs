//! Presentation layer: an `OpenCV` window relaying worker events and key commands.

use crate::{
    config::Config,
    constants::status,
    cue::CountdownCue,
    dataset::{DatasetLayout, SaveSummary},
    worker::{CaptureBackend, Worker, WorkerEvent},
    Error, Result,
};
use crossbeam_channel::{Receiver, TryRecvError};
use log::{info, warn};
use opencv::{
    core::{self, Mat, Point, Scalar, CV_8UC3},
    highgui::{self, WINDOW_AUTOSIZE},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};

const WINDOW_NAME: &str = "Landmark Collector";
const PREVIEW_WIDTH: i32 = 640;
const PREVIEW_HEIGHT: i32 = 480;
const PANEL_HEIGHT: i32 = 96;
const KEY_ESCAPE: i32 = 27;

/// A user command issued from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start collecting the selected action
    Start,
    /// Save the buffered frames
    Save,
    /// Stop and save
    Stop,
    /// Drop everything and release the camera
    Reset,
    /// Pause the capture loop
    Pause,
    /// Resume the capture loop
    Resume,
    /// Quit the application
    Exit,
    /// Select the previous action
    PreviousAction,
    /// Select the next action
    NextAction,
    /// Select the action at a zero-based index
    SelectAction(usize),
}

impl Command {
    /// Command bound to a `highgui::wait_key` code
    #[must_use]
    pub fn from_key(key: i32) -> Option<Self> {
        if key == KEY_ESCAPE {
            return Some(Self::Exit);
        }
        let ch = char::from_u32(u32::try_from(key & 0xFF).ok()?)?;
        match ch {
            's' => Some(Self::Start),
            'v' => Some(Self::Save),
            'x' => Some(Self::Stop),
            'r' => Some(Self::Reset),
            'p' => Some(Self::Pause),
            'u' => Some(Self::Resume),
            'q' => Some(Self::Exit),
            '[' => Some(Self::PreviousAction),
            ']' => Some(Self::NextAction),
            '1'..='9' => ch.to_digit(10).map(|d| Self::SelectAction(d as usize - 1)),
            _ => None,
        }
    }
}

/// Which controls are enabled for the current worker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    /// Start button
    pub start: bool,
    /// Pause button
    pub pause: bool,
    /// Resume button
    pub resume: bool,
    /// Save button
    pub save: bool,
    /// Stop button
    pub stop: bool,
}

impl ControlState {
    /// Controls for the given worker flags
    #[must_use]
    pub fn from_flags(collecting: bool, paused: bool) -> Self {
        if collecting {
            Self {
                start: false,
                pause: !paused,
                resume: paused,
                save: false,
                stop: true,
            }
        } else {
            Self {
                start: true,
                pause: false,
                resume: false,
                save: true,
                stop: false,
            }
        }
    }

    /// Whether a command may be issued; reset, exit and selection are always allowed
    #[must_use]
    pub fn allows(&self, command: Command) -> bool {
        match command {
            Command::Start => self.start,
            Command::Save => self.save,
            Command::Stop => self.stop,
            Command::Pause => self.pause,
            Command::Resume => self.resume,
            Command::PreviousAction | Command::NextAction | Command::SelectAction(_) => self.start,
            Command::Reset | Command::Exit => true,
        }
    }
}

/// Step an optional selection through `len` entries
#[must_use]
pub fn cycle_selection(current: Option<usize>, len: usize, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match (current, forward) {
        (None, true) => 0,
        (None, false) => len - 1,
        (Some(i), true) => (i + 1) % len,
        (Some(i), false) => (i + len - 1) % len,
    })
}

/// The collector application
pub struct CollectorApp {
    config: Config,
    worker: Worker,
    events: Receiver<WorkerEvent>,
    selected: Option<usize>,
    status: String,
    preview: Option<Mat>,
    last_summary: Option<SaveSummary>,
}

impl CollectorApp {
    /// Prepare the dataset folders and spawn the worker
    pub fn new(
        config: Config,
        backend: Box<dyn CaptureBackend>,
        cue: Box<dyn CountdownCue>,
        initial_action: Option<&str>,
    ) -> Result<Self> {
        info!("Initializing landmark collector");
        config.validate()?;

        let folders = DatasetLayout::from_config(&config).prepare(&config.actions)?;
        for folder in &folders {
            info!(
                "Action '{}': highest existing sequence {}",
                folder.action,
                folder.highest_sequence.map_or_else(|| "none".to_string(), |s| s.to_string())
            );
        }

        let selected = match initial_action {
            Some(action) => Some(
                config
                    .actions
                    .iter()
                    .position(|a| a == action)
                    .ok_or_else(|| Error::ConfigError(format!("Unknown action: {action}")))?,
            ),
            None => None,
        };

        let (worker, events) = Worker::spawn(config.clone(), backend, cue)?;

        Ok(Self {
            config,
            worker,
            events,
            selected,
            status: status::IDLE.to_string(),
            preview: None,
            last_summary: None,
        })
    }

    /// Currently selected action label
    #[must_use]
    pub fn selected_action(&self) -> Option<&str> {
        self.selected.and_then(|i| self.config.actions.get(i)).map(String::as_str)
    }

    /// Latest status line
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Controls for the current worker state
    #[must_use]
    pub fn controls(&self) -> ControlState {
        ControlState::from_flags(self.worker.is_collecting(), self.worker.is_paused())
    }

    /// Run the interactive window until the user exits
    pub fn run(&mut self) -> Result<()> {
        highgui::named_window(WINDOW_NAME, WINDOW_AUTOSIZE)?;
        info!("Entering main loop");

        loop {
            self.drain_events()?;

            let canvas = self.render()?;
            highgui::imshow(WINDOW_NAME, &canvas)?;

            let key = highgui::wait_key(15)?;
            if key < 0 {
                continue;
            }
            if let Some(command) = Command::from_key(key) {
                if command == Command::Exit {
                    info!("Exit requested by user");
                    break;
                }
                self.apply(command);
            }
        }

        self.worker.shutdown();
        highgui::destroy_all_windows()?;
        info!("Application shutting down");
        Ok(())
    }

    /// Record one session of `action` without a window, then save it
    pub fn run_headless(&mut self, action: &str) -> Result<SaveSummary> {
        info!("Headless collection for '{action}'");
        self.selected = self.config.actions.iter().position(|a| a == action);
        self.worker.start(action);

        loop {
            match self.next_event()? {
                WorkerEvent::CollectionFinished { buffered, interrupted } => {
                    if interrupted {
                        warn!("Collection ended early with {buffered} frame(s)");
                    }
                    break;
                }
                event => {
                    if self.handle_event(event) {
                        return Err(Error::Worker(self.status.clone()));
                    }
                }
            }
        }

        self.worker.save();
        loop {
            match self.next_event()? {
                WorkerEvent::Saved(summary) => return Ok(summary),
                WorkerEvent::Status(message) if message == status::NO_ACTION || message.starts_with("Error") => {
                    return Err(Error::Worker(message));
                }
                event => {
                    self.handle_event(event);
                }
            }
        }
    }

    fn apply(&mut self, command: Command) {
        let controls = self.controls();
        if !controls.allows(command) {
            info!("{command:?} is not available right now");
            return;
        }

        match command {
            Command::Start => match self.selected_action() {
                Some(action) => self.worker.start(action),
                None => self.status = status::SELECT_ACTION.to_string(),
            },
            Command::Save => self.worker.save(),
            Command::Stop => self.worker.stop(),
            Command::Reset => self.worker.reset(),
            Command::Pause => self.worker.pause(),
            Command::Resume => self.worker.resume(),
            Command::PreviousAction | Command::NextAction => {
                self.selected = cycle_selection(
                    self.selected,
                    self.config.actions.len(),
                    command == Command::NextAction,
                );
            }
            Command::SelectAction(index) => {
                if index < self.config.actions.len() {
                    self.selected = Some(index);
                }
            }
            Command::Exit => {}
        }
    }

    fn next_event(&self) -> Result<WorkerEvent> {
        self.events
            .recv()
            .map_err(|_| Error::Worker("Worker thread stopped unexpectedly".to_string()))
    }

    fn drain_events(&mut self) -> Result<()> {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                }
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => {
                    return Err(Error::Worker("Worker thread stopped unexpectedly".to_string()))
                }
            }
        }
    }

    /// Apply an event to the view; returns true when a session failed to start
    fn handle_event(&mut self, event: WorkerEvent) -> bool {
        match event {
            WorkerEvent::Status(message) => {
                info!("Status: {message}");
                let failed = message.starts_with("Error initializing") || message == status::NOT_STARTED;
                self.status = message;
                return failed;
            }
            WorkerEvent::Frame(frame) => self.preview = frame,
            WorkerEvent::CollectionFinished { buffered, .. } => {
                info!("{buffered} frame(s) ready to save");
            }
            WorkerEvent::Saved(summary) => {
                info!(
                    "Wrote {} keypoint file(s), {} image(s), dropped {}",
                    summary.written, summary.images, summary.dropped
                );
                self.last_summary = Some(summary);
            }
        }
        false
    }

    /// Preview (or a blank frame) stacked over the status and control panel
    fn render(&self) -> Result<Mat> {
        let preview = match &self.preview {
            Some(frame) => frame.try_clone()?,
            None => Mat::new_rows_cols_with_default(PREVIEW_HEIGHT, PREVIEW_WIDTH, CV_8UC3, Scalar::all(0.0))?,
        };

        let mut panel = Mat::new_rows_cols_with_default(PANEL_HEIGHT, preview.cols(), CV_8UC3, Scalar::all(32.0))?;
        let white = Scalar::new(255.0, 255.0, 255.0, 0.0);
        let grey = Scalar::new(110.0, 110.0, 110.0, 0.0);

        put_line(&mut panel, &format!("Status: {}", self.status), 20, white)?;
        let action = self.selected_action().unwrap_or("-");
        let mut action_line = format!("Action: {action}   ([ ] or 1-9 to select)");
        if let Some(summary) = &self.last_summary {
            action_line.push_str(&format!("   Last save: {} file(s)", summary.written));
        }
        put_line(&mut panel, &action_line, 42, white)?;

        let controls = self.controls();
        let legend = [
            ("s:start", controls.start),
            ("v:save", controls.save),
            ("x:stop", controls.stop),
            ("r:reset", true),
            ("p:pause", controls.pause),
            ("u:resume", controls.resume),
            ("q:exit", true),
        ];
        let mut x = 10;
        for (label, enabled) in legend {
            imgproc::put_text(
                &mut panel,
                label,
                Point::new(x, 70),
                FONT_HERSHEY_SIMPLEX,
                0.5,
                if enabled { white } else { grey },
                1,
                LINE_8,
                false,
            )?;
            x += 85;
        }

        let mut canvas = Mat::default();
        core::vconcat2(&preview, &panel, &mut canvas)?;
        Ok(canvas)
    }
}

fn put_line(image: &mut Mat, text: &str, y: i32, color: Scalar) -> Result<()> {
    imgproc::put_text(image, text, Point::new(10, y), FONT_HERSHEY_SIMPLEX, 0.5, color, 1, LINE_8, false)?;
    Ok(())
}
