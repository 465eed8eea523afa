use crate::errors::TrackerError;
use nalgebra::{Point2, Point3};

/// Face-mesh index subsets consumed by the estimators. Numbering follows the
/// 478-point refined mesh the landmark provider emits.
pub const NOSE_INDICES: [usize; 24] = [
    4, 45, 275, 220, 440, 1, 5, 51, 281, 44, 274, 241, 461, 125, 354, 218, 438, 195, 167, 393,
    165, 391, 3, 248,
];
pub const LEFT_IRIS_INDICES: [usize; 4] = [474, 475, 476, 477];
pub const RIGHT_IRIS_INDICES: [usize; 4] = [469, 470, 471, 472];
pub const LEFT_EYE_OUTLINE_INDICES: [usize; 6] = [362, 385, 387, 263, 390, 373];
pub const RIGHT_EYE_OUTLINE_INDICES: [usize; 6] = [133, 160, 158, 33, 153, 144];
pub const CHIN_INDEX: usize = 152;
pub const FOREHEAD_INDEX: usize = 10;

/// One frame's labeled 3D landmark set in camera-pixel units. Lives for a
/// single frame; nothing downstream retains it.
#[derive(Debug, Clone)]
pub struct FrameLandmarks {
    points: Vec<Point3<f64>>,
}

impl FrameLandmarks {
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        FrameLandmarks { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, index: usize) -> Option<Point3<f64>> {
        self.points.get(index).copied()
    }

    /// subset collects the 3D points at the given indices, or None when any
    /// index is out of range for this frame.
    pub fn subset(&self, indices: &[usize]) -> Option<Vec<Point3<f64>>> {
        indices.iter().map(|&i| self.point(i)).collect()
    }

    /// subset_2d collects the image-plane projections at the given indices.
    pub fn subset_2d(&self, indices: &[usize]) -> Option<Vec<Point2<f64>>> {
        indices
            .iter()
            .map(|&i| self.point(i).map(|p| Point2::new(p.x, p.y)))
            .collect()
    }

    /// iris_center averages an iris landmark ring into a single 3D centroid.
    pub fn iris_center(&self, indices: &[usize]) -> Option<Point3<f64>> {
        let pts = self.subset(indices)?;
        if pts.is_empty() {
            return None;
        }
        Some(crate::utils::geometry::centroid(&pts))
    }
}

/// FrameSource is the single capability boundary toward the camera and the
/// external landmark provider: every call acquires one frame and runs the
/// provider on it.
///
/// `Ok(Some(_))`: a face was detected and its landmarks are returned.
/// `Ok(None)`: the frame carried no detectable face; callers skip dependent
/// computation and keep their previous values.
/// `Err(_)`: the device failed; fatal to the capture worker.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<FrameLandmarks>, TrackerError>;
}

/// ScriptedSource replays a prepared frame sequence, letting the estimation
/// core run against synthetic fixtures without a camera or ML model.
pub struct ScriptedSource {
    frames: std::vec::IntoIter<Option<FrameLandmarks>>,
}

impl ScriptedSource {
    pub fn new(frames: Vec<Option<FrameLandmarks>>) -> Self {
        ScriptedSource {
            frames: frames.into_iter(),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<FrameLandmarks>, TrackerError> {
        Ok(self.frames.next().unwrap_or(None))
    }
}
