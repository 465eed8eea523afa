use crate::config::config::BlinkConfig;
use crate::helper::landmark_source::{
    FrameLandmarks, LEFT_EYE_OUTLINE_INDICES, RIGHT_EYE_OUTLINE_INDICES,
};
use std::collections::VecDeque;
use tracing::{info, warn};

/// Per-frame eyelid classification. Variants are mutually exclusive by
/// construction: `Blink` is bilateral closure, `Boost` right-only,
/// `Escape` left-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EyeActivity {
    #[default]
    Open,
    Blink,
    Boost,
    Escape,
}

impl EyeActivity {
    /// classify maps per-eye closure flags onto the activity variants.
    pub fn classify(left_closed: bool, right_closed: bool) -> Self {
        match (left_closed, right_closed) {
            (true, true) => EyeActivity::Blink,
            (false, true) => EyeActivity::Boost,
            (true, false) => EyeActivity::Escape,
            (false, false) => EyeActivity::Open,
        }
    }
}

/// Which EAR calibration capture is currently running, if any. Driven by the
/// foreground control surface, observed by the capture worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapturePhase {
    #[default]
    Idle,
    /// Both eyes held shut; records per-eye EAR minima.
    Blink,
    /// Right eye only held shut; records the right-eye EAR minimum.
    Boost,
}

/// Derived per-user thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarThresholds {
    pub left: f64,
    pub right: f64,
}

/// EAR-based blink/wink classifier with three-step user calibration.
#[derive(Debug)]
pub struct EarClassifier {
    config: BlinkConfig,
    threshold_left: f64,
    threshold_right: f64,
    history_left: VecDeque<f64>,
    history_right: VecDeque<f64>,
    open_left: f64,
    open_right: f64,
    min_blink_left: f64,
    min_blink_right: f64,
    min_boost_right: f64,
    phase: CapturePhase,
}

impl EarClassifier {
    pub fn new(config: BlinkConfig) -> Self {
        let history_len = config.history_len;
        let default = config.default_threshold;
        EarClassifier {
            config,
            threshold_left: default,
            threshold_right: default,
            history_left: VecDeque::with_capacity(history_len),
            history_right: VecDeque::with_capacity(history_len),
            open_left: 0.35,
            open_right: 0.35,
            min_blink_left: 1.0,
            min_blink_right: 1.0,
            min_boost_right: 1.0,
            phase: CapturePhase::Idle,
        }
    }

    pub fn thresholds(&self) -> EarThresholds {
        EarThresholds {
            left: self.threshold_left,
            right: self.threshold_right,
        }
    }

    /// set_thresholds installs values restored from a persisted profile.
    pub fn set_thresholds(&mut self, thresholds: EarThresholds) {
        self.threshold_left = thresholds.left;
        self.threshold_right = thresholds.right;
    }

    /// ear computes the eye aspect ratio over one six-point eyelid contour:
    /// vertical openings (p1-p5, p2-p4) against the horizontal width (p0-p3).
    /// Missing landmarks yield the neutral default instead of an error.
    pub fn ear(&self, landmarks: &FrameLandmarks, outline: &[usize; 6]) -> f64 {
        let Some(pts) = landmarks.subset_2d(outline) else {
            return self.config.neutral_ear;
        };
        let a = (pts[1] - pts[5]).norm();
        let b = (pts[2] - pts[4]).norm();
        let c = (pts[0] - pts[3]).norm();
        if c < 1e-9 {
            return self.config.neutral_ear;
        }
        (a + b) / (2.0 * c)
    }

    /// observe ingests one frame's landmarks: updates the rolling baseline,
    /// feeds any running capture, and classifies the frame.
    pub fn observe(&mut self, landmarks: &FrameLandmarks) -> EyeActivity {
        let left = self.ear(landmarks, &LEFT_EYE_OUTLINE_INDICES);
        let right = self.ear(landmarks, &RIGHT_EYE_OUTLINE_INDICES);

        if self.history_left.len() == self.config.history_len {
            self.history_left.pop_front();
        }
        if self.history_right.len() == self.config.history_len {
            self.history_right.pop_front();
        }
        self.history_left.push_back(left);
        self.history_right.push_back(right);

        match self.phase {
            CapturePhase::Blink => {
                self.min_blink_left = self.min_blink_left.min(left);
                self.min_blink_right = self.min_blink_right.min(right);
            }
            CapturePhase::Boost => {
                self.min_boost_right = self.min_boost_right.min(right);
            }
            CapturePhase::Idle => {}
        }

        let left_closed = left < self.threshold_left;
        let right_closed = right < self.threshold_right;
        EyeActivity::classify(left_closed, right_closed)
    }

    /// capture_open records the open-eyes baseline as the average of the
    /// recent history. Returns false when no frames have been seen yet.
    pub fn capture_open(&mut self) -> bool {
        if self.history_left.is_empty() {
            warn!("open-eye capture requested before any frame was observed");
            return false;
        }
        self.open_left =
            self.history_left.iter().sum::<f64>() / self.history_left.len() as f64;
        self.open_right =
            self.history_right.iter().sum::<f64>() / self.history_right.len() as f64;
        info!(
            left = self.open_left,
            right = self.open_right,
            "open-eye EAR baseline captured"
        );
        true
    }

    /// set_phase switches the running capture. Entering a capture resets its
    /// minima; leaving the boost capture finalizes the thresholds.
    pub fn set_phase(&mut self, phase: CapturePhase) {
        if phase == self.phase {
            return;
        }
        match phase {
            CapturePhase::Blink => {
                self.min_blink_left = 1.0;
                self.min_blink_right = 1.0;
            }
            CapturePhase::Boost => {
                self.min_boost_right = 1.0;
            }
            CapturePhase::Idle => {
                if self.phase == CapturePhase::Boost {
                    self.finalize_thresholds();
                } else {
                    info!(
                        left = self.min_blink_left,
                        right = self.min_blink_right,
                        "blink capture finished"
                    );
                }
            }
        }
        self.phase = phase;
    }

    /// finalize_thresholds derives per-eye thresholds from the three
    /// captures. Each threshold is the midpoint between the open baseline
    /// and the worst (lowest) closed value seen for that eye; the right eye
    /// closes in both the blink and boost captures, so its worst case is the
    /// minimum across both. Clamped to a usable range.
    fn finalize_thresholds(&mut self) {
        let worst_right = self.min_blink_right.min(self.min_boost_right);
        let raw_left = (self.open_left + self.min_blink_left) / 2.0;
        let raw_right = (self.open_right + worst_right) / 2.0;

        self.threshold_left = raw_left.clamp(self.config.clamp_min, self.config.clamp_max);
        self.threshold_right = raw_right.clamp(self.config.clamp_min, self.config.clamp_max);
        info!(
            left = self.threshold_left,
            right = self.threshold_right,
            "EAR thresholds finalized"
        );
    }
}
