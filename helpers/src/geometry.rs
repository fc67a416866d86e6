//! Planar angle helpers.
//!
//! Headings are compass bearings in degrees: 0° points along +y, angles grow clockwise, so a
//! heading of 90° points along +x. Signed angles are wrapped into (-180°, 180°], negative
//! meaning "to the left".

use nalgebra::Vector2;

/// wrap_angle_deg wraps an angle into (-180°, 180°].
pub fn wrap_angle_deg(angle: f64) -> f64 {
    let mut wrapped = angle % 360.0;
    if wrapped > 180.0 {
        wrapped -= 360.0;
    } else if wrapped <= -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// heading_to_vector returns the unit direction vector of a heading.
pub fn heading_to_vector(heading_deg: f64) -> Vector2<f64> {
    let rad = heading_deg.to_radians();
    Vector2::new(rad.sin(), rad.cos())
}

/// bearing_deg returns the heading that points along `dir` (0.0 for a zero vector).
pub fn bearing_deg(dir: &Vector2<f64>) -> f64 {
    if dir.x == 0.0 && dir.y == 0.0 {
        return 0.0;
    }
    dir.x.atan2(dir.y).to_degrees()
}

/// signed_angle_deg returns the signed angle from `heading_deg` to the direction `dir`.
pub fn signed_angle_deg(heading_deg: f64, dir: &Vector2<f64>) -> f64 {
    if dir.x == 0.0 && dir.y == 0.0 {
        return 0.0;
    }
    wrap_angle_deg(bearing_deg(dir) - heading_deg)
}

/// unsigned_angle_deg returns the angle between two vectors in [0°, 180°]. Zero-length vectors
/// have no direction, 0.0 is returned for them.
pub fn unsigned_angle_deg(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    let norm_a = a.norm();
    let norm_b = b.norm();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let cos_theta = (a.dot(b) / (norm_a * norm_b)).clamp(-1.0, 1.0);
    cos_theta.acos().to_degrees()
}

/// left_normal returns the unit vector perpendicular to `dir`, pointing to its left.
pub fn left_normal(dir: &Vector2<f64>) -> Vector2<f64> {
    let n = Vector2::new(-dir.y, dir.x);
    let norm = n.norm();
    if norm == 0.0 {
        n
    } else {
        n / norm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn wraps_into_half_open_range() {
        assert_abs_diff_eq!(wrap_angle_deg(190.0), -170.0);
        assert_abs_diff_eq!(wrap_angle_deg(-190.0), 170.0);
        assert_abs_diff_eq!(wrap_angle_deg(180.0), 180.0);
        assert_abs_diff_eq!(wrap_angle_deg(-180.0), 180.0);
        assert_abs_diff_eq!(wrap_angle_deg(720.0 + 45.0), 45.0);
    }

    #[test]
    fn compass_convention() {
        let east = heading_to_vector(90.0);
        assert_abs_diff_eq!(east.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(east.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bearing_deg(&Vector2::new(0.0, 1.0)), 0.0);
        assert_abs_diff_eq!(bearing_deg(&Vector2::new(-1.0, 0.0)), -90.0);
    }

    #[test]
    fn left_is_negative() {
        // facing north, a target to the west lies to the left
        assert_abs_diff_eq!(signed_angle_deg(0.0, &Vector2::new(-1.0, 0.0)), -90.0);
        assert_abs_diff_eq!(signed_angle_deg(0.0, &Vector2::new(1.0, 1.0)), 45.0, epsilon = 1e-9);
        assert_abs_diff_eq!(signed_angle_deg(170.0, &Vector2::new(0.0, 1.0)), -170.0, epsilon = 1e-9);
    }

    #[test]
    fn unsigned_angle() {
        let a = Vector2::new(1.0, 0.0);
        assert_abs_diff_eq!(unsigned_angle_deg(&a, &Vector2::new(0.0, 3.0)), 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(unsigned_angle_deg(&a, &Vector2::new(-2.0, 0.0)), 180.0, epsilon = 1e-9);
        assert_abs_diff_eq!(unsigned_angle_deg(&a, &Vector2::zeros()), 0.0);
        let n = left_normal(&Vector2::new(0.0, 2.0));
        assert_abs_diff_eq!(n.x, -1.0);
    }
}
