use nalgebra::{Point3, Vector3};

/// normalize_safe returns the unit vector, or the input unchanged when its
/// norm is too small to divide by.
pub fn normalize_safe(v: Vector3<f64>) -> Vector3<f64> {
    let n = v.norm();
    if n > 1e-9 {
        v / n
    } else {
        v
    }
}

/// point_set_scale computes the average pairwise distance of a point set, a
/// robust size measure used to compensate calibration offsets when the head
/// moves toward or away from the camera.
pub fn point_set_scale(points: &[Point3<f64>]) -> f64 {
    let n = points.len();
    let mut total = 0.0;
    let mut count = 0u32;
    for i in 0..n {
        for j in (i + 1)..n {
            total += (points[i] - points[j]).norm();
            count += 1;
        }
    }
    if count == 0 {
        return 1.0;
    }
    let mean = total / count as f64;
    // A coincident set has no usable size; report the neutral scale instead
    // of zero so downstream ratios stay finite.
    if mean > 1e-9 {
        mean
    } else {
        1.0
    }
}

/// centroid of a point set. Callers guarantee the slice is non-empty.
pub fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_safe_unit_length() {
        let v = normalize_safe(Vector3::new(3.0, 0.0, 4.0));
        assert!((v.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normalize_safe_near_zero_is_identity() {
        let tiny = Vector3::new(1e-12, -1e-12, 0.0);
        assert_eq!(normalize_safe(tiny), tiny);
    }

    #[test]
    fn point_set_scale_pair() {
        let pts = [Point3::origin(), Point3::new(0.0, 0.0, 2.0)];
        assert!((point_set_scale(&pts) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn point_set_scale_degenerate_set_is_one() {
        assert_eq!(point_set_scale(&[Point3::origin()]), 1.0);
        assert_eq!(point_set_scale(&[Point3::new(2.0, 2.0, 2.0); 5]), 1.0);
    }
}
