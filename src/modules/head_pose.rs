use crate::utils::geometry::centroid;
use nalgebra::{Matrix3, Point3};
use std::cmp::Ordering;

/// Per-frame rigid head frame: centroid of the tracked subset plus a PCA
/// orientation whose columns are the principal axes in descending variance
/// order.
#[derive(Debug, Clone, Copy)]
pub struct HeadFrame {
    pub center: Point3<f64>,
    pub orientation: Matrix3<f64>,
}

/// Estimates head orientation from the nose/cheek landmark subset.
///
/// Eigendecomposition leaves eigenvector signs arbitrary, so consecutive
/// frames can flip axes even for a still head. The estimator keeps the
/// previous frame's corrected orientation as a reference and flips any axis
/// whose dot product against the reference is negative.
#[derive(Debug, Default)]
pub struct HeadPoseEstimator {
    reference: Option<Matrix3<f64>>,
}

impl HeadPoseEstimator {
    pub fn new() -> Self {
        HeadPoseEstimator { reference: None }
    }

    /// Drops the temporal reference; the next frame is accepted as-is.
    pub fn reset(&mut self) {
        self.reference = None;
    }

    /// estimate computes the head frame for one landmark subset.
    ///
    /// A zero-variance point set degenerates to the identity orientation
    /// rather than propagating a numerical error.
    pub fn estimate(&mut self, points: &[Point3<f64>]) -> HeadFrame {
        let center = if points.is_empty() {
            Point3::origin()
        } else {
            centroid(points)
        };

        let mut cov = Matrix3::zeros();
        for p in points {
            let c = p - center;
            cov += c * c.transpose();
        }
        if points.len() > 1 {
            cov /= (points.len() - 1) as f64;
        }

        let mut orientation = if cov.norm() > 1e-12 {
            let eig = cov.symmetric_eigen();
            let mut order = [0usize, 1, 2];
            order.sort_by(|&a, &b| {
                eig.eigenvalues[b]
                    .partial_cmp(&eig.eigenvalues[a])
                    .unwrap_or(Ordering::Equal)
            });
            let mut r = Matrix3::zeros();
            for (col, &src) in order.iter().enumerate() {
                r.set_column(col, &eig.eigenvectors.column(src).into_owned());
            }
            r
        } else {
            Matrix3::identity()
        };

        // Proper rotation: flip the lowest-variance axis if the basis is
        // left-handed.
        if orientation.determinant() < 0.0 {
            let flipped = -orientation.column(2).into_owned();
            orientation.set_column(2, &flipped);
        }

        if let Some(reference) = &self.reference {
            for i in 0..3 {
                if orientation.column(i).dot(&reference.column(i)) < 0.0 {
                    let flipped = -orientation.column(i).into_owned();
                    orientation.set_column(i, &flipped);
                }
            }
        }
        self.reference = Some(orientation);

        HeadFrame {
            center,
            orientation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Rotation3, Vector3};

    /// An asymmetric rigid cloud with distinct variances along each axis.
    fn base_cloud() -> Vec<Point3<f64>> {
        let raw: [(f64, f64, f64); 8] = [
            (3.0, 0.5, 0.1),
            (-2.8, -0.4, 0.2),
            (2.5, 1.1, -0.3),
            (-3.1, 0.9, 0.0),
            (1.9, -1.2, 0.4),
            (-1.7, 1.3, -0.2),
            (2.2, -0.8, -0.1),
            (-2.0, -1.0, 0.3),
        ];
        raw.iter().map(|&(x, y, z)| Point3::new(x, y, z)).collect()
    }

    fn rotated_cloud(angle: f64) -> Vec<Point3<f64>> {
        let rot = Rotation3::from_axis_angle(&Vector3::y_axis(), angle);
        base_cloud().iter().map(|p| rot * p).collect()
    }

    #[test]
    fn orientation_is_proper_rotation() {
        let mut est = HeadPoseEstimator::new();
        let frame = est.estimate(&base_cloud());
        assert!((frame.orientation.determinant() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn axes_never_flip_across_smooth_rotation() {
        let mut est = HeadPoseEstimator::new();
        let mut prev = est.estimate(&rotated_cloud(0.0)).orientation;
        for step in 1..60 {
            let angle = step as f64 * 0.02;
            let cur = est.estimate(&rotated_cloud(angle)).orientation;
            for i in 0..3 {
                assert!(
                    cur.column(i).dot(&prev.column(i)) >= 0.0,
                    "axis {i} flipped at step {step}"
                );
            }
            prev = cur;
        }
    }

    #[test]
    fn zero_variance_set_falls_back_to_identity() {
        let mut est = HeadPoseEstimator::new();
        let frame = est.estimate(&vec![Point3::new(1.0, 2.0, 3.0); 14]);
        assert_eq!(frame.orientation, Matrix3::identity());
        assert_eq!(frame.center, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn reset_drops_temporal_reference() {
        let mut est = HeadPoseEstimator::new();
        est.estimate(&base_cloud());
        est.reset();
        assert!(est.reference.is_none());
    }
}
