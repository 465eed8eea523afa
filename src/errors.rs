use thiserror::Error;

/// Error taxonomy for the tracking core.
///
/// `NoFaceDetected` is deliberately absent: a frame without a face is the
/// `Ok(None)` arm of `FrameSource::next_frame`, not an error.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The camera (or other frame source) could not be opened. Fatal to the
    /// capture worker; surfaced to the shell, never auto-retried.
    #[error("frame source unavailable (camera index {camera_index}): {reason}")]
    DeviceUnavailable { camera_index: u32, reason: String },

    /// A calibration-dependent operation was requested before its
    /// prerequisite step completed.
    #[error("'{operation}' requires {missing}")]
    Uncalibrated {
        operation: &'static str,
        missing: &'static str,
    },

    /// A persisted profile is missing or malformed.
    #[error("failed to load profile '{name}': {source}")]
    ProfileLoad {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// A profile could not be written out.
    #[error("failed to save profile '{name}': {source}")]
    ProfileSave {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
