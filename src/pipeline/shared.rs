use crate::modules::blink::{CapturePhase, EarThresholds, EyeActivity};
use crate::modules::eye_model::EyeCalibration;
use crate::modules::screen_map::{MonitorPlane, ScreenMapping};
use crate::profile::profile::CalibrationProfile;
use std::sync::{Arc, Mutex};

/// GazeSample is one smoothed screen-space reading published by the worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeSample {
    pub screen_x: f64,
    pub screen_y: f64,
    pub raw_yaw: f64,
    pub raw_pitch: f64,
    /// Agreement of the two eyes' instantaneous rays, in [0, 1]. 1.0 means
    /// parallel rays; divergent eyes (poor lock, occlusion) push it down.
    pub confidence: f64,
}

/// CalibrationSnapshot is everything needed to persist or restore a full
/// calibration in one piece.
#[derive(Debug, Clone)]
pub struct CalibrationSnapshot {
    pub left: EyeCalibration,
    pub right: EyeCalibration,
    pub mapping: ScreenMapping,
    pub plane: MonitorPlane,
    pub thresholds: EarThresholds,
}

#[derive(Debug, Default)]
struct Inner {
    gaze: Option<GazeSample>,
    activity: EyeActivity,
    face_detected: bool,
    lock_requested: bool,
    fixation_requested: bool,
    open_capture_requested: bool,
    capture_phase: Option<CapturePhase>,
    pending_profile: Option<CalibrationProfile>,
    snapshot: Option<CalibrationSnapshot>,
}

/// SharedState is the single handoff point between the camera worker thread
/// and the controller. Every accessor copies data out under the lock and
/// releases it before returning, so no caller ever holds the guard across
/// other tracker calls.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<Inner>>,
}

impl SharedState {
    pub fn new() -> Self {
        SharedState::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut guard = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    pub fn publish_sample(&self, sample: GazeSample, activity: EyeActivity) {
        self.with(|s| {
            s.gaze = Some(sample);
            s.activity = activity;
            s.face_detected = true;
        });
    }

    /// publish_activity reports eyelid state for frames where a face is
    /// present but no gaze can be solved yet.
    pub fn publish_activity(&self, activity: EyeActivity) {
        self.with(|s| {
            s.activity = activity;
            s.face_detected = true;
        });
    }

    /// publish_no_face keeps the last gaze sample in place so consumers see
    /// stale-but-valid coordinates rather than a jump to the origin.
    pub fn publish_no_face(&self) {
        self.with(|s| {
            s.face_detected = false;
            s.activity = EyeActivity::Open;
        });
    }

    pub fn latest_sample(&self) -> Option<GazeSample> {
        self.with(|s| s.gaze)
    }

    pub fn activity(&self) -> EyeActivity {
        self.with(|s| s.activity)
    }

    pub fn face_detected(&self) -> bool {
        self.with(|s| s.face_detected)
    }

    pub fn request_lock(&self) {
        self.with(|s| s.lock_requested = true);
    }

    pub fn request_fixation(&self) {
        self.with(|s| s.fixation_requested = true);
    }

    pub fn request_open_capture(&self) {
        self.with(|s| s.open_capture_requested = true);
    }

    pub fn set_capture_phase(&self, phase: CapturePhase) {
        self.with(|s| s.capture_phase = Some(phase));
    }

    pub fn queue_profile(&self, profile: CalibrationProfile) {
        self.with(|s| s.pending_profile = Some(profile));
    }

    /// take_requests drains the one-shot flags posted since the last frame.
    pub(crate) fn take_requests(&self) -> FrameRequests {
        self.with(|s| FrameRequests {
            lock: std::mem::take(&mut s.lock_requested),
            fixation: std::mem::take(&mut s.fixation_requested),
            open_capture: std::mem::take(&mut s.open_capture_requested),
            capture_phase: s.capture_phase.take(),
            profile: s.pending_profile.take(),
        })
    }

    pub(crate) fn store_snapshot(&self, snapshot: CalibrationSnapshot) {
        self.with(|s| s.snapshot = Some(snapshot));
    }

    pub fn snapshot(&self) -> Option<CalibrationSnapshot> {
        self.with(|s| s.snapshot.clone())
    }
}

/// FrameRequests is the per-frame drain of operator commands.
#[derive(Debug, Default)]
pub(crate) struct FrameRequests {
    pub lock: bool,
    pub fixation: bool,
    pub open_capture: bool,
    pub capture_phase: Option<CapturePhase>,
    pub profile: Option<CalibrationProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_are_one_shot() {
        let shared = SharedState::new();
        shared.request_lock();
        shared.request_fixation();
        let first = shared.take_requests();
        assert!(first.lock);
        assert!(first.fixation);
        let second = shared.take_requests();
        assert!(!second.lock);
        assert!(!second.fixation);
    }

    #[test]
    fn no_face_keeps_last_sample() {
        let shared = SharedState::new();
        let sample = GazeSample {
            screen_x: 100.0,
            screen_y: 200.0,
            raw_yaw: 1.0,
            raw_pitch: -0.5,
            confidence: 1.0,
        };
        shared.publish_sample(sample, EyeActivity::Open);
        shared.publish_no_face();
        assert!(!shared.face_detected());
        assert_eq!(shared.latest_sample(), Some(sample));
    }
}
