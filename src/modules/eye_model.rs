use crate::config::config::EyeModelConfig;
use crate::modules::head_pose::HeadFrame;
use crate::utils::geometry::normalize_safe;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Per-eye calibration created once at lock time. The world sphere position
/// each frame is `head_center + R·(offset · nose_scale/calibration_scale)`,
/// which compensates head-to-camera distance changes without recalibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeCalibration {
    pub sphere_local_offset: Vector3<f64>,
    pub calibration_nose_scale: f64,
}

impl EyeCalibration {
    /// lock anchors an assumed eyeball-sphere center `base_radius` units
    /// behind the iris along the camera axis, expressed head-locally.
    pub fn lock(head: &HeadFrame, iris: Point3<f64>, nose_scale: f64, base_radius: f64) -> Self {
        let rt = head.orientation.transpose();
        let camera_dir_local = rt * Vector3::new(0.0, 0.0, 1.0);
        EyeCalibration {
            sphere_local_offset: rt * (iris - head.center) + base_radius * camera_dir_local,
            calibration_nose_scale: nose_scale,
        }
    }

    pub fn sphere_world(&self, head: &HeadFrame, current_nose_scale: f64) -> Point3<f64> {
        let ratio = current_nose_scale / self.calibration_nose_scale;
        head.center + head.orientation * (self.sphere_local_offset * ratio)
    }

    pub fn gaze_direction(
        &self,
        head: &HeadFrame,
        iris: Point3<f64>,
        current_nose_scale: f64,
    ) -> Vector3<f64> {
        normalize_safe(iris - self.sphere_world(head, current_nose_scale))
    }
}

/// One frame's solved gaze: per-eye rays, their instantaneous combination,
/// and the FIFO-smoothed combined direction.
#[derive(Debug, Clone, Copy)]
pub struct GazeSolution {
    pub left_dir: Vector3<f64>,
    pub right_dir: Vector3<f64>,
    pub combined: Vector3<f64>,
    pub smoothed: Vector3<f64>,
    pub left_sphere: Point3<f64>,
}

/// Holds both eyes' calibrations and the smoothing buffer for the combined
/// direction.
#[derive(Debug)]
pub struct GazeSolver {
    config: EyeModelConfig,
    left: Option<EyeCalibration>,
    right: Option<EyeCalibration>,
    smoothing: VecDeque<Vector3<f64>>,
}

impl GazeSolver {
    pub fn new(config: EyeModelConfig) -> Self {
        let len = config.smoothing_len;
        GazeSolver {
            config,
            left: None,
            right: None,
            smoothing: VecDeque::with_capacity(len),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    pub fn calibrations(&self) -> Option<(EyeCalibration, EyeCalibration)> {
        Some((self.left?, self.right?))
    }

    /// reset clears both calibrations and the smoothing buffer; re-running
    /// the lock step starts from a clean state.
    pub fn reset(&mut self) {
        self.left = None;
        self.right = None;
        self.smoothing.clear();
    }

    /// lock calibrates both eyes against the current frame.
    pub fn lock(
        &mut self,
        head: &HeadFrame,
        iris_left: Point3<f64>,
        iris_right: Point3<f64>,
        nose_scale: f64,
    ) {
        self.smoothing.clear();
        self.left = Some(EyeCalibration::lock(
            head,
            iris_left,
            nose_scale,
            self.config.base_radius,
        ));
        self.right = Some(EyeCalibration::lock(
            head,
            iris_right,
            nose_scale,
            self.config.base_radius,
        ));
    }

    /// restore installs calibrations read back from a persisted profile.
    pub fn restore(&mut self, left: EyeCalibration, right: EyeCalibration) {
        self.smoothing.clear();
        self.left = Some(left);
        self.right = Some(right);
    }

    /// solve computes the frame's gaze rays. Returns None until both eyes
    /// are locked.
    pub fn solve(
        &mut self,
        head: &HeadFrame,
        iris_left: Point3<f64>,
        iris_right: Point3<f64>,
        nose_scale: f64,
    ) -> Option<GazeSolution> {
        let left = self.left.as_ref()?;
        let right = self.right.as_ref()?;

        let left_sphere = left.sphere_world(head, nose_scale);
        let left_dir = left.gaze_direction(head, iris_left, nose_scale);
        let right_dir = right.gaze_direction(head, iris_right, nose_scale);
        let combined = normalize_safe((left_dir + right_dir) / 2.0);

        if self.smoothing.len() == self.config.smoothing_len {
            self.smoothing.pop_front();
        }
        self.smoothing.push_back(combined);
        let mean = self
            .smoothing
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v)
            / self.smoothing.len() as f64;

        Some(GazeSolution {
            left_dir,
            right_dir,
            combined,
            smoothed: normalize_safe(mean),
            left_sphere,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;

    fn identity_head(center: Point3<f64>) -> HeadFrame {
        HeadFrame {
            center,
            orientation: Matrix3::identity(),
        }
    }

    #[test]
    fn axis_aligned_gaze_resolves_to_forward() {
        // Offset (0,0,20) head-local at nose scale 10; iris 25 units ahead of
        // the head center puts the iris 5 units in front of the sphere.
        let calib = EyeCalibration {
            sphere_local_offset: Vector3::new(0.0, 0.0, 20.0),
            calibration_nose_scale: 10.0,
        };
        let head = identity_head(Point3::origin());
        let dir = calib.gaze_direction(&head, Point3::new(0.0, 0.0, 25.0), 10.0);
        assert!((dir - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn gaze_direction_is_scale_invariant() {
        let head = identity_head(Point3::new(10.0, -4.0, 30.0));
        let iris = Point3::new(12.0, -3.0, 55.0);
        let nose_scale = 8.0;
        let calib = EyeCalibration::lock(&head, iris, nose_scale, 20.0);
        let reference = calib.gaze_direction(&head, iris, nose_scale);

        // Halve every landmark coordinate, simulating a doubled camera
        // distance; the nose scale halves with them.
        let half_head = identity_head(Point3::from(head.center.coords * 0.5));
        let half_iris = Point3::from(iris.coords * 0.5);
        let halved = calib.gaze_direction(&half_head, half_iris, nose_scale * 0.5);

        assert!((reference - halved).norm() < 1e-9);
    }

    #[test]
    fn solve_requires_both_locks() {
        let mut solver = GazeSolver::new(EyeModelConfig::default());
        let head = identity_head(Point3::origin());
        assert!(solver
            .solve(&head, Point3::origin(), Point3::origin(), 1.0)
            .is_none());
    }

    #[test]
    fn smoothing_averages_recent_directions() {
        let mut solver = GazeSolver::new(EyeModelConfig::default());
        let head = identity_head(Point3::origin());
        solver.lock(
            &head,
            Point3::new(-15.0, 0.0, 25.0),
            Point3::new(15.0, 0.0, 25.0),
            10.0,
        );
        let mut last = None;
        for _ in 0..12 {
            last = solver.solve(
                &head,
                Point3::new(-15.0, 0.0, 25.0),
                Point3::new(15.0, 0.0, 25.0),
                10.0,
            );
        }
        let sol = last.unwrap();
        // A static fixation smooths to the instantaneous direction.
        assert!((sol.smoothed - sol.combined).norm() < 1e-9);
        assert!((sol.smoothed.norm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reset_clears_lock_state() {
        let mut solver = GazeSolver::new(EyeModelConfig::default());
        let head = identity_head(Point3::origin());
        solver.lock(&head, Point3::origin(), Point3::origin(), 1.0);
        assert!(solver.is_locked());
        solver.reset();
        assert!(!solver.is_locked());
    }
}
