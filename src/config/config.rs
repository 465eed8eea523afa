use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerConfig {
    pub camera_index: u32,
    pub monitor_index: u32,
    pub monitor_width: u32,
    pub monitor_height: u32,
}

impl TrackerConfig {
    pub fn new(
        camera_index: u32,
        monitor_index: u32,
        monitor_width: u32,
        monitor_height: u32,
    ) -> Self {
        TrackerConfig {
            camera_index,
            monitor_index,
            monitor_width,
            monitor_height,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig::new(0, 0, 1920, 1080)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EyeModelConfig {
    /// Assumed eyeball radius in landmark units, anchoring the sphere center
    /// behind the iris along the camera axis at lock time.
    pub base_radius: f64,
    /// Length of the combined-direction smoothing FIFO.
    pub smoothing_len: usize,
}

impl Default for EyeModelConfig {
    fn default() -> Self {
        EyeModelConfig {
            base_radius: 20.0,
            smoothing_len: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlinkConfig {
    /// Threshold used for both eyes before the user calibrates.
    pub default_threshold: f64,
    /// Derived thresholds are clamped to [clamp_min, clamp_max].
    pub clamp_min: f64,
    pub clamp_max: f64,
    /// EAR reported when the eyelid landmarks are missing from a frame.
    pub neutral_ear: f64,
    /// Rolling open-baseline history length, in frames.
    pub history_len: usize,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        BlinkConfig {
            default_threshold: 0.30,
            clamp_min: 0.12,
            clamp_max: 0.40,
            neutral_ear: 0.4,
            history_len: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenMapConfig {
    /// Assumed usable head-yaw range, degrees to either side of center.
    pub yaw_half_range_deg: f64,
    /// Assumed usable head-pitch range, degrees above/below center.
    pub pitch_half_range_deg: f64,
    /// Mapped coordinates never reach closer than this to a screen edge.
    pub edge_margin_px: f64,
    /// Assumed physical monitor size used for the visualization plane.
    pub monitor_width_cm: f64,
    pub monitor_height_cm: f64,
    /// Plane distance from the head along head-forward, in centimeters.
    pub plane_distance_cm: f64,
    /// Assumed chin-to-forehead face height, the physical scale anchor.
    pub face_height_cm: f64,
}

impl Default for ScreenMapConfig {
    fn default() -> Self {
        ScreenMapConfig {
            yaw_half_range_deg: 15.0,
            pitch_half_range_deg: 5.0,
            edge_margin_px: 10.0,
            monitor_width_cm: 60.0,
            monitor_height_cm: 40.0,
            plane_distance_cm: 50.0,
            face_height_cm: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Foreground tick period.
    pub tick_interval: Duration,
    /// Pointer snaps to a target whose center is within this radius.
    pub snap_radius_px: f64,
    /// Free-move fires only after gaze drift stays under this tolerance...
    pub stability_tolerance_px: f64,
    /// ...for at least this long.
    pub stability_dwell: Duration,
    /// Bilateral blink held this long confirms a dashboard click.
    pub click_confirm: Duration,
    /// Motion freeze after a click fires.
    pub post_click_cooldown: Duration,
    /// Scan-mode highlight advancement period.
    pub scan_interval: Duration,
    /// Advancement period while boost is active.
    pub boost_scan_interval: Duration,
    /// Blink must persist this long before scan dwell-clicking starts.
    pub scan_pre_dwell: Duration,
    /// Blink held this much longer fires the highlighted target.
    pub scan_click_confirm: Duration,
    /// Sustained right-wink duration that toggles boost.
    pub boost_hold: Duration,
    /// Sustained left-wink duration that exits scan mode.
    pub escape_hold: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            tick_interval: Duration::from_millis(50),
            snap_radius_px: 150.0,
            stability_tolerance_px: 30.0,
            stability_dwell: Duration::from_millis(300),
            click_confirm: Duration::from_millis(800),
            post_click_cooldown: Duration::from_millis(400),
            scan_interval: Duration::from_millis(1000),
            boost_scan_interval: Duration::from_millis(500),
            scan_pre_dwell: Duration::from_millis(300),
            scan_click_confirm: Duration::from_millis(500),
            boost_hold: Duration::from_millis(700),
            escape_hold: Duration::from_millis(900),
        }
    }
}
