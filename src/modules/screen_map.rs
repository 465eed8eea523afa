use crate::config::config::ScreenMapConfig;
use crate::helper::landmark_source::{FrameLandmarks, CHIN_INDEX, FOREHEAD_INDEX};
use crate::modules::head_pose::HeadFrame;
use crate::utils::geometry::normalize_safe;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Head-relative physical monitor plane built during the fixate-center step.
/// Used for visualization and marker placement; the pixel mapping itself
/// goes through yaw/pitch angles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorPlane {
    pub corners: [Point3<f64>; 4],
    pub center: Point3<f64>,
    pub normal: Vector3<f64>,
    pub units_per_cm: f64,
}

impl MonitorPlane {
    /// build places an assumed-size monitor plane along the head-forward
    /// axis. Physical scale comes from the chin-to-forehead distance; when a
    /// gaze ray is supplied and is not parallel to the plane, the plane is
    /// re-centered at the ray's intersection.
    pub fn build(
        head: &HeadFrame,
        landmarks: &FrameLandmarks,
        config: &ScreenMapConfig,
        gaze_ray: Option<(Point3<f64>, Vector3<f64>)>,
    ) -> Self {
        let units_per_cm = match (landmarks.point(CHIN_INDEX), landmarks.point(FOREHEAD_INDEX)) {
            (Some(chin), Some(forehead)) => {
                let face_height = (forehead - chin).norm();
                if face_height > 1e-9 {
                    face_height / config.face_height_cm
                } else {
                    5.0
                }
            }
            _ => 5.0,
        };

        let head_forward = normalize_safe(-head.orientation.column(2).into_owned());
        let plane_point = head.center + head_forward * (config.plane_distance_cm * units_per_cm);

        let center = match gaze_ray {
            Some((origin, dir)) => {
                let dir = normalize_safe(dir);
                let denom = head_forward.dot(&dir);
                if denom.abs() > 1e-6 {
                    let t = head_forward.dot(&(plane_point - origin)) / denom;
                    origin + t * dir
                } else {
                    plane_point
                }
            }
            None => plane_point,
        };

        // Image coordinates grow downward, so world-up is negative y.
        let world_up = Vector3::new(0.0, -1.0, 0.0);
        let right = normalize_safe(world_up.cross(&head_forward));
        let up = normalize_safe(head_forward.cross(&right));

        let half_w = config.monitor_width_cm * 0.5 * units_per_cm;
        let half_h = config.monitor_height_cm * 0.5 * units_per_cm;

        MonitorPlane {
            corners: [
                center - right * half_w - up * half_h,
                center + right * half_w - up * half_h,
                center + right * half_w + up * half_h,
                center - right * half_w + up * half_h,
            ],
            center,
            normal: head_forward,
            units_per_cm,
        }
    }
}

/// Yaw/pitch offsets (degrees) fixed in the confirm-center step so that the
/// fixation direction at that moment maps to the screen center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ScreenMapping {
    pub offset_yaw: f64,
    pub offset_pitch: f64,
}

impl ScreenMapping {
    /// from_fixation stores the negated raw angles of the current gaze so
    /// the same direction later resolves to zero adjusted yaw/pitch.
    pub fn from_fixation(dir: Vector3<f64>) -> Self {
        let (raw_yaw, raw_pitch) = raw_yaw_pitch(dir);
        ScreenMapping {
            offset_yaw: -raw_yaw,
            offset_pitch: -raw_pitch,
        }
    }

    /// to_screen maps a gaze direction onto pixel coordinates using the
    /// fixed head-rotation half-ranges, clamped to the edge margin.
    pub fn to_screen(
        &self,
        dir: Vector3<f64>,
        config: &ScreenMapConfig,
        monitor_width: u32,
        monitor_height: u32,
    ) -> (f64, f64) {
        let (raw_yaw, raw_pitch) = raw_yaw_pitch(dir);
        let yaw = raw_yaw + self.offset_yaw;
        let pitch = raw_pitch + self.offset_pitch;

        let half_yaw = config.yaw_half_range_deg;
        let half_pitch = config.pitch_half_range_deg;
        let x = ((yaw + half_yaw) / (2.0 * half_yaw)) * monitor_width as f64;
        let y = ((half_pitch - pitch) / (2.0 * half_pitch)) * monitor_height as f64;

        let margin = config.edge_margin_px;
        (
            x.clamp(margin, monitor_width as f64 - margin),
            y.clamp(margin, monitor_height as f64 - margin),
        )
    }
}

/// raw_yaw_pitch decomposes a gaze direction into signed degrees against the
/// camera-facing forward axis: yaw from the XZ projection (sign from x),
/// pitch from the YZ projection (sign from y, positive looking up).
pub fn raw_yaw_pitch(dir: Vector3<f64>) -> (f64, f64) {
    let d = normalize_safe(dir);
    let forward = Vector3::new(0.0, 0.0, -1.0);

    let xz = normalize_safe(Vector3::new(d.x, 0.0, d.z));
    let mut yaw = forward.dot(&xz).clamp(-1.0, 1.0).acos();
    if d.x < 0.0 {
        yaw = -yaw;
    }

    let yz = normalize_safe(Vector3::new(0.0, d.y, d.z));
    let mut pitch = forward.dot(&yz).clamp(-1.0, 1.0).acos();
    if d.y > 0.0 {
        pitch = -pitch;
    }

    (-yaw.to_degrees(), pitch.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::landmark_source::{CHIN_INDEX, FOREHEAD_INDEX};
    use nalgebra::Matrix3;

    fn identity_head() -> HeadFrame {
        HeadFrame {
            center: Point3::origin(),
            orientation: Matrix3::identity(),
        }
    }

    fn face_frame() -> FrameLandmarks {
        let mut points = vec![Point3::origin(); 478];
        // 150 landmark units chin-to-forehead: units_per_cm = 10.
        points[CHIN_INDEX] = Point3::new(0.0, 100.0, 0.0);
        points[FOREHEAD_INDEX] = Point3::new(0.0, -50.0, 0.0);
        FrameLandmarks::new(points)
    }

    #[test]
    fn forward_gaze_has_zero_angles() {
        let (yaw, pitch) = raw_yaw_pitch(Vector3::new(0.0, 0.0, -1.0));
        assert!(yaw.abs() < 1e-9);
        assert!(pitch.abs() < 1e-9);
    }

    #[test]
    fn pitch_sign_follows_image_axes() {
        // Negative image-y is up, which reads as positive pitch.
        let (_, pitch_up) = raw_yaw_pitch(Vector3::new(0.0, -0.2, -1.0));
        let (_, pitch_down) = raw_yaw_pitch(Vector3::new(0.0, 0.2, -1.0));
        assert!(pitch_up > 0.0);
        assert!(pitch_down < 0.0);
    }

    #[test]
    fn fixation_offsets_negate_raw_angles() {
        // Build a direction whose raw yaw/pitch are roughly (12, -3) degrees
        // and verify the negation plus round trip to screen center.
        let yaw_rad = (12.0f64).to_radians();
        let pitch_rad = (3.0f64).to_radians();
        // raw yaw is the negated signed XZ angle, so positive raw yaw needs
        // a negative x component.
        let dir = Vector3::new(
            -yaw_rad.sin(),
            pitch_rad.sin(),
            -(1.0f64 - yaw_rad.sin().powi(2) - pitch_rad.sin().powi(2)).sqrt(),
        );
        let (raw_yaw, raw_pitch) = raw_yaw_pitch(dir);
        assert!((raw_yaw - 12.0).abs() < 0.2, "raw yaw {raw_yaw}");
        assert!((raw_pitch + 3.0).abs() < 0.2, "raw pitch {raw_pitch}");

        let mapping = ScreenMapping::from_fixation(dir);
        assert!((mapping.offset_yaw + raw_yaw).abs() < 1e-9);
        assert!((mapping.offset_pitch + raw_pitch).abs() < 1e-9);

        let config = ScreenMapConfig::default();
        let (x, y) = mapping.to_screen(dir, &config, 1920, 1080);
        assert!((x - 960.0).abs() <= 1.0);
        assert!((y - 540.0).abs() <= 1.0);
    }

    #[test]
    fn mapping_clamps_to_edge_margin() {
        let mapping = ScreenMapping::default();
        let config = ScreenMapConfig::default();
        // Gaze far outside the yaw half-range saturates at the margins.
        let (x, _) = mapping.to_screen(Vector3::new(-0.9, 0.0, -0.4), &config, 1920, 1080);
        assert_eq!(x, 1920.0 - config.edge_margin_px);
        let (x, _) = mapping.to_screen(Vector3::new(0.9, 0.0, -0.4), &config, 1920, 1080);
        assert_eq!(x, config.edge_margin_px);
        // Steep pitch saturates vertically.
        let (_, y) = mapping.to_screen(Vector3::new(0.0, -0.5, -0.5), &config, 1920, 1080);
        assert_eq!(y, config.edge_margin_px);
    }

    #[test]
    fn plane_scale_comes_from_face_height() {
        let plane = MonitorPlane::build(
            &identity_head(),
            &face_frame(),
            &ScreenMapConfig::default(),
            None,
        );
        assert!((plane.units_per_cm - 10.0).abs() < 1e-9);
        // 60 cm wide at 10 units/cm: corners span 600 units horizontally.
        let width = (plane.corners[1] - plane.corners[0]).norm();
        assert!((width - 600.0).abs() < 1e-6);
        assert!((plane.normal.norm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn gaze_ray_recenters_plane() {
        let head = identity_head();
        let config = ScreenMapConfig::default();
        let baseline = MonitorPlane::build(&head, &face_frame(), &config, None);
        // A ray from slightly left of center, aimed forward along the plane
        // normal, must intersect the plane off its default center.
        let origin = Point3::new(-30.0, 0.0, 0.0);
        let shifted = MonitorPlane::build(
            &head,
            &face_frame(),
            &config,
            Some((origin, baseline.normal)),
        );
        assert!((shifted.center.x - -30.0).abs() < 1e-6);
        assert!((shifted.center.z - baseline.center.z).abs() < 1e-6);
    }

    #[test]
    fn degenerate_gaze_ray_falls_back_to_forward_placement() {
        let head = identity_head();
        let config = ScreenMapConfig::default();
        let baseline = MonitorPlane::build(&head, &face_frame(), &config, None);
        // Ray parallel to the plane can never intersect it.
        let parallel = Vector3::new(1.0, 0.0, 0.0);
        let plane = MonitorPlane::build(
            &head,
            &face_frame(),
            &config,
            Some((Point3::origin(), parallel)),
        );
        assert_eq!(plane.center, baseline.center);
    }
}
