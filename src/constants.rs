//! Constants used throughout the collector

/// Number of body pose landmarks
pub const NUM_POSE_LANDMARKS: usize = 33;

/// Values stored per pose landmark (x, y, z, visibility)
pub const POSE_VALUES_PER_LANDMARK: usize = 4;

/// Number of face mesh landmarks kept in the keypoint vector
pub const NUM_FACE_LANDMARKS: usize = 468;

/// Number of landmarks per hand
pub const NUM_HAND_LANDMARKS: usize = 21;

/// Values stored per face or hand landmark (x, y, z)
pub const COORDS_PER_LANDMARK: usize = 3;

/// Length of the pose sub-vector (33 × 4)
pub const POSE_VECTOR_LEN: usize = NUM_POSE_LANDMARKS * POSE_VALUES_PER_LANDMARK;

/// Length of the face sub-vector (468 × 3)
pub const FACE_VECTOR_LEN: usize = NUM_FACE_LANDMARKS * COORDS_PER_LANDMARK;

/// Length of one hand sub-vector (21 × 3)
pub const HAND_VECTOR_LEN: usize = NUM_HAND_LANDMARKS * COORDS_PER_LANDMARK;

/// Total keypoint vector length: 132 + 1404 + 63 + 63
pub const KEYPOINT_VECTOR_LEN: usize = POSE_VECTOR_LEN + FACE_VECTOR_LEN + 2 * HAND_VECTOR_LEN;

/// Default countdown before recording starts
pub const DEFAULT_COUNTDOWN_SECONDS: u32 = 3;

/// Hold on the first frame of each sequence so the subject can get ready
pub const DEFAULT_SEQUENCE_START_DELAY_MS: u64 = 500;

/// Delay between frames, gives the control thread a window to interrupt
pub const DEFAULT_FRAME_DELAY_MS: u64 = 10;

/// Poll interval while collection is paused
pub const DEFAULT_PAUSE_POLL_MS: u64 = 100;

/// Frequency of the synthesized countdown beep
pub const CUE_TONE_HZ: f32 = 880.0;

/// Duration of the synthesized countdown beep
pub const CUE_TONE_MS: u64 = 150;

/// Status strings reported by the worker
pub mod status {
    pub const IDLE: &str = "Idle";
    pub const NOT_STARTED: &str = "Error: Collection has not started properly.";
    pub const PAUSED: &str = "Collection paused.";
    pub const RESUMED: &str = "Collection resumed.";
    pub const COMPLETED: &str = "Collection Completed";
    pub const INTERRUPTED: &str = "Collection interrupted";
    pub const STOPPED: &str = "Collection Stopped";
    pub const SAVED: &str = "Data Saved";
    pub const NO_ACTION: &str = "No action selected.";
    pub const RESET: &str = "Reset Completed";
    pub const SELECT_ACTION: &str = "Please select an action.";
}
