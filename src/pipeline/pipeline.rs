use crate::config::config::{BlinkConfig, EyeModelConfig, ScreenMapConfig, TrackerConfig};
use crate::errors::TrackerError;
use crate::helper::landmark_source::{
    FrameLandmarks, FrameSource, LEFT_IRIS_INDICES, NOSE_INDICES, RIGHT_IRIS_INDICES,
};
use crate::modules::blink::EarClassifier;
use crate::modules::eye_model::GazeSolver;
use crate::modules::head_pose::HeadPoseEstimator;
use crate::modules::screen_map::{raw_yaw_pitch, MonitorPlane, ScreenMapping};
use crate::pipeline::shared::{CalibrationSnapshot, GazeSample, SharedState};
use crate::profile::profile::{
    CalibrationOffsets, CalibrationProfile, EarThresholdFields, ProfileStore,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// All estimation tuning for one tracker instance.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub tracker: TrackerConfig,
    pub eye: EyeModelConfig,
    pub blink: BlinkConfig,
    pub screen: ScreenMapConfig,
}

/// GazeWorker runs the full per-frame estimation chain: eyelid
/// classification, head pose, eyeball lock, gaze solve and pixel mapping.
/// It owns every estimator; the only thing it shares is `SharedState`.
pub struct GazeWorker {
    settings: PipelineSettings,
    shared: SharedState,
    head_pose: HeadPoseEstimator,
    solver: GazeSolver,
    classifier: EarClassifier,
    plane: Option<MonitorPlane>,
    mapping: Option<ScreenMapping>,
}

impl GazeWorker {
    pub fn new(settings: PipelineSettings, shared: SharedState) -> Self {
        GazeWorker {
            head_pose: HeadPoseEstimator::new(),
            solver: GazeSolver::new(settings.eye.clone()),
            classifier: EarClassifier::new(settings.blink.clone()),
            plane: None,
            mapping: None,
            settings,
            shared,
        }
    }

    /// process_frame ingests one capture result and publishes its outcome.
    ///
    /// # Arguments
    /// * `frame` - `Some` landmarks when a face was detected, `None` otherwise
    pub fn process_frame(&mut self, frame: Option<FrameLandmarks>) {
        let requests = self.shared.take_requests();

        if let Some(profile) = requests.profile {
            self.apply_profile(&profile);
        }

        // Capture-phase controls operate on EAR history, not landmarks, so
        // they apply even when this frame carries no face.
        if let Some(phase) = requests.capture_phase {
            self.classifier.set_phase(phase);
            self.publish_snapshot();
        }
        if requests.open_capture {
            self.classifier.capture_open();
        }

        let Some(landmarks) = frame else {
            if requests.lock || requests.fixation {
                warn!("calibration step requested on a frame with no face, ignored");
            }
            self.shared.publish_no_face();
            return;
        };

        let activity = self.classifier.observe(&landmarks);

        let (Some(nose), Some(iris_left), Some(iris_right)) = (
            landmarks.subset(&NOSE_INDICES),
            landmarks.iris_center(&LEFT_IRIS_INDICES),
            landmarks.iris_center(&RIGHT_IRIS_INDICES),
        ) else {
            debug!("frame is missing nose or iris landmarks, skipped");
            self.shared.publish_activity(activity);
            return;
        };

        let head = self.head_pose.estimate(&nose);
        let nose_scale = crate::utils::geometry::point_set_scale(&nose);

        if requests.lock {
            self.solver.lock(&head, iris_left, iris_right, nose_scale);
            self.mapping = None;
            info!("eyeball spheres locked, awaiting center fixation");
        }

        let Some(solution) = self.solver.solve(&head, iris_left, iris_right, nose_scale) else {
            if requests.fixation {
                warn!("center fixation requested before the lock step, ignored");
            }
            self.shared.publish_activity(activity);
            return;
        };

        if requests.lock {
            // Plane anchoring uses the instantaneous left-eye ray from the
            // very frame the lock was taken on.
            self.plane = Some(MonitorPlane::build(
                &head,
                &landmarks,
                &self.settings.screen,
                Some((solution.left_sphere, solution.left_dir)),
            ));
        }

        if requests.fixation {
            self.mapping = Some(ScreenMapping::from_fixation(solution.combined));
            info!("center fixation captured, screen mapping active");
            self.publish_snapshot();
        }

        let Some(mapping) = self.mapping else {
            self.shared.publish_activity(activity);
            return;
        };

        let (screen_x, screen_y) = mapping.to_screen(
            solution.smoothed,
            &self.settings.screen,
            self.settings.tracker.monitor_width,
            self.settings.tracker.monitor_height,
        );
        let (raw_yaw, raw_pitch) = raw_yaw_pitch(solution.smoothed);
        let confidence = ((1.0 + solution.left_dir.dot(&solution.right_dir)) / 2.0).clamp(0.0, 1.0);
        self.shared.publish_sample(
            GazeSample {
                screen_x,
                screen_y,
                raw_yaw,
                raw_pitch,
                confidence,
            },
            activity,
        );
    }

    fn apply_profile(&mut self, profile: &CalibrationProfile) {
        let (left, right) = profile.eye_calibrations();
        self.solver.restore(left, right);
        self.classifier.set_thresholds(profile.ear_thresholds());
        self.mapping = Some(profile.screen_mapping());
        self.plane = Some(profile.monitor_plane.clone());
        self.head_pose.reset();
        info!("calibration profile applied");
        self.publish_snapshot();
    }

    /// publish_snapshot mirrors the current calibration into shared state
    /// whenever it is complete, so the foreground can persist it.
    fn publish_snapshot(&self) {
        if let (Some((left, right)), Some(mapping), Some(plane)) =
            (self.solver.calibrations(), self.mapping, self.plane.clone())
        {
            self.shared.store_snapshot(CalibrationSnapshot {
                left,
                right,
                mapping,
                plane,
                thresholds: self.classifier.thresholds(),
            });
        }
    }
}

/// GazeTracker is the foreground handle: it owns the capture thread and
/// exposes calibration triggers, the latest sample and profile persistence.
pub struct GazeTracker {
    settings: PipelineSettings,
    shared: SharedState,
    store: ProfileStore,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<(), TrackerError>>>,
}

impl GazeTracker {
    pub fn new(settings: PipelineSettings, store: ProfileStore) -> Self {
        GazeTracker {
            settings,
            shared: SharedState::new(),
            store,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn shared(&self) -> SharedState {
        self.shared.clone()
    }

    /// start spawns the capture worker over the given frame source. The
    /// thread runs until `stop` or a device failure.
    ///
    /// # Arguments
    /// * `source` - frame acquisition boundary; dropped when the worker exits
    pub fn start(&mut self, mut source: Box<dyn FrameSource>) {
        if self.handle.is_some() {
            warn!("tracker already running, start ignored");
            return;
        }
        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let mut worker = GazeWorker::new(self.settings.clone(), self.shared.clone());
        self.handle = Some(std::thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                match source.next_frame() {
                    Ok(frame) => worker.process_frame(frame),
                    Err(e) => {
                        error!(error = %e, "frame source failed, capture worker exiting");
                        return Err(e);
                    }
                }
            }
            Ok(())
        }));
    }

    /// stop shuts the capture thread down and reports a device failure that
    /// ended it early, if any.
    pub fn stop(&mut self) -> Result<(), TrackerError> {
        self.running.store(false, Ordering::SeqCst);
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!("capture worker panicked");
                    Ok(())
                }
            },
            None => Ok(()),
        }
    }

    pub fn trigger_lock(&self) {
        self.shared.request_lock();
    }

    pub fn trigger_fixation(&self) {
        self.shared.request_fixation();
    }

    pub fn capture_open_baseline(&self) {
        self.shared.request_open_capture();
    }

    pub fn set_capture_phase(&self, phase: crate::modules::blink::CapturePhase) {
        self.shared.set_capture_phase(phase);
    }

    /// save_profile persists the current calibration under a name. Fails
    /// with `Uncalibrated` until both calibration steps have completed.
    ///
    /// # Arguments
    /// * `profile_name` - user-facing name; sanitized into the file stem
    ///
    /// # Returns
    /// * `Result<PathBuf, TrackerError>` - path of the written document
    pub fn save_profile(&self, profile_name: &str) -> Result<PathBuf, TrackerError> {
        let snapshot = self
            .shared
            .snapshot()
            .ok_or(TrackerError::Uncalibrated {
                operation: "save_profile",
                missing: "completed lock and fixation steps",
            })?;
        let profile = CalibrationProfile {
            calibration_date: Some(chrono::Utc::now()),
            camera_index: self.settings.tracker.camera_index,
            monitor_index: self.settings.tracker.monitor_index,
            calibration_offsets: CalibrationOffsets {
                yaw: snapshot.mapping.offset_yaw,
                pitch: snapshot.mapping.offset_pitch,
            },
            ear_thresholds: EarThresholdFields {
                left: snapshot.thresholds.left,
                right: snapshot.thresholds.right,
            },
            monitor_plane: snapshot.plane,
            left_sphere_local_offset: snapshot.left.sphere_local_offset,
            right_sphere_local_offset: snapshot.right.sphere_local_offset,
            left_calibration_nose_scale: snapshot.left.calibration_nose_scale,
            right_calibration_nose_scale: snapshot.right.calibration_nose_scale,
        };
        self.store.save(profile_name, &profile)
    }

    /// load_profile reads a stored profile and hands it to the capture
    /// worker, which applies it on its next frame.
    pub fn load_profile(&self, profile_name: &str) -> Result<(), TrackerError> {
        let profile = self.store.load(profile_name)?;
        self.shared.queue_profile(profile);
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        self.store.list()
    }
}

impl Drop for GazeTracker {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
