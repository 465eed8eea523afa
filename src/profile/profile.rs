use crate::errors::TrackerError;
use crate::modules::blink::EarThresholds;
use crate::modules::eye_model::EyeCalibration;
use crate::modules::screen_map::{MonitorPlane, ScreenMapping};
use anyhow::anyhow;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

fn default_ear_threshold() -> f64 {
    0.30
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOffsets {
    pub yaw: f64,
    pub pitch: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarThresholdFields {
    #[serde(default = "default_ear_threshold")]
    pub left: f64,
    #[serde(default = "default_ear_threshold")]
    pub right: f64,
}

impl Default for EarThresholdFields {
    fn default() -> Self {
        EarThresholdFields {
            left: default_ear_threshold(),
            right: default_ear_threshold(),
        }
    }
}

/// One named profile's full calibration document. Plain nested numeric
/// structures; JSON on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    #[serde(default)]
    pub calibration_date: Option<chrono::DateTime<chrono::Utc>>,
    pub camera_index: u32,
    #[serde(default)]
    pub monitor_index: u32,
    pub calibration_offsets: CalibrationOffsets,
    /// Older profiles predate EAR calibration; absent fields fall back to
    /// the documented defaults instead of failing the load.
    #[serde(default)]
    pub ear_thresholds: EarThresholdFields,
    pub monitor_plane: MonitorPlane,
    pub left_sphere_local_offset: Vector3<f64>,
    pub right_sphere_local_offset: Vector3<f64>,
    pub left_calibration_nose_scale: f64,
    pub right_calibration_nose_scale: f64,
}

impl CalibrationProfile {
    pub fn eye_calibrations(&self) -> (EyeCalibration, EyeCalibration) {
        (
            EyeCalibration {
                sphere_local_offset: self.left_sphere_local_offset,
                calibration_nose_scale: self.left_calibration_nose_scale,
            },
            EyeCalibration {
                sphere_local_offset: self.right_sphere_local_offset,
                calibration_nose_scale: self.right_calibration_nose_scale,
            },
        )
    }

    pub fn screen_mapping(&self) -> ScreenMapping {
        ScreenMapping {
            offset_yaw: self.calibration_offsets.yaw,
            offset_pitch: self.calibration_offsets.pitch,
        }
    }

    pub fn ear_thresholds(&self) -> EarThresholds {
        EarThresholds {
            left: self.ear_thresholds.left,
            right: self.ear_thresholds.right,
        }
    }
}

/// Named-profile file store under a single directory.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ProfileStore { dir: dir.into() }
    }

    fn path_for(&self, profile_name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_name(profile_name)))
    }

    /// save writes the profile document, creating the directory on demand.
    pub fn save(
        &self,
        profile_name: &str,
        profile: &CalibrationProfile,
    ) -> Result<PathBuf, TrackerError> {
        let wrap = |source: std::io::Error| TrackerError::ProfileSave {
            name: profile_name.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(wrap)?;
        let path = self.path_for(profile_name);
        let body = serde_json::to_string_pretty(profile).map_err(|e| TrackerError::ProfileSave {
            name: profile_name.to_string(),
            source: std::io::Error::other(e),
        })?;
        fs::write(&path, body).map_err(wrap)?;
        info!(profile = profile_name, path = %path.display(), "profile saved");
        Ok(path)
    }

    /// load reads a named profile back. Missing or malformed documents are
    /// returned as `ProfileLoad` failures, never panics.
    pub fn load(&self, profile_name: &str) -> Result<CalibrationProfile, TrackerError> {
        let path = self.path_for(profile_name);
        let wrap = |source: anyhow::Error| TrackerError::ProfileLoad {
            name: profile_name.to_string(),
            source,
        };
        if !path.exists() {
            return Err(wrap(anyhow!("no such profile at {}", path.display())));
        }
        let body = fs::read_to_string(&path).map_err(|e| wrap(e.into()))?;
        let profile = serde_json::from_str(&body).map_err(|e| wrap(e.into()))?;
        info!(profile = profile_name, "profile loaded");
        Ok(profile)
    }

    /// list returns the names of every stored profile.
    pub fn list(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let path = e.path();
                if path.extension().and_then(|s| s.to_str()) == Some("json") {
                    path.file_stem()
                        .and_then(|s| s.to_str())
                        .map(|s| s.to_string())
                } else {
                    None
                }
            })
            .collect();
        names.sort();
        names
    }
}

impl Default for ProfileStore {
    fn default() -> Self {
        ProfileStore::new(Path::new("profiles"))
    }
}

/// sanitize_name keeps alphanumerics, spaces, hyphens and underscores so a
/// user-entered profile name is always a valid file stem.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn sample_profile() -> CalibrationProfile {
        CalibrationProfile {
            calibration_date: Some(chrono::Utc::now()),
            camera_index: 0,
            monitor_index: 1,
            calibration_offsets: CalibrationOffsets {
                yaw: -12.0,
                pitch: 3.0,
            },
            ear_thresholds: EarThresholdFields {
                left: 0.27,
                right: 0.24,
            },
            monitor_plane: MonitorPlane {
                corners: [
                    Point3::new(-300.0, 200.0, -500.0),
                    Point3::new(300.0, 200.0, -500.0),
                    Point3::new(300.0, -200.0, -500.0),
                    Point3::new(-300.0, -200.0, -500.0),
                ],
                center: Point3::new(0.0, 0.0, -500.0),
                normal: Vector3::new(0.0, 0.0, -1.0),
                units_per_cm: 10.0,
            },
            left_sphere_local_offset: Vector3::new(-25.0, 5.0, 20.0),
            right_sphere_local_offset: Vector3::new(25.0, 5.0, 20.0),
            left_calibration_nose_scale: 42.0,
            right_calibration_nose_scale: 42.0,
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        let profile = sample_profile();
        store.save("Home Desk", &profile).unwrap();
        let loaded = store.load("Home Desk").unwrap();
        assert_eq!(loaded, profile);
        assert_eq!(store.list(), vec!["Home Desk".to_string()]);
    }

    #[test]
    fn missing_ear_thresholds_fall_back_to_defaults() {
        let body = serde_json::json!({
            "camera_index": 0,
            "calibration_offsets": {"yaw": -5.0, "pitch": 1.5},
            "monitor_plane": {
                "corners": [[0.0,0.0,0.0],[1.0,0.0,0.0],[1.0,1.0,0.0],[0.0,1.0,0.0]],
                "center": [0.5,0.5,0.0],
                "normal": [0.0,0.0,-1.0],
                "units_per_cm": 5.0
            },
            "left_sphere_local_offset": [0.0,0.0,20.0],
            "right_sphere_local_offset": [0.0,0.0,20.0],
            "left_calibration_nose_scale": 10.0,
            "right_calibration_nose_scale": 10.0
        });
        let profile: CalibrationProfile = serde_json::from_value(body).unwrap();
        assert_eq!(profile.ear_thresholds.left, 0.30);
        assert_eq!(profile.ear_thresholds.right, 0.30);
    }

    #[test]
    fn load_of_missing_profile_is_an_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        let err = store.load("nobody").unwrap_err();
        assert!(matches!(err, TrackerError::ProfileLoad { .. }));
    }

    #[test]
    fn malformed_profile_is_an_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        assert!(matches!(
            store.load("broken"),
            Err(TrackerError::ProfileLoad { .. })
        ));
    }

    #[test]
    fn profile_names_are_sanitized() {
        assert_eq!(sanitize_name("Ana / Office: #2 "), "Ana  Office 2");
    }
}
