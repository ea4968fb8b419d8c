use glam::Mat4;

/// Default spin rate of the plane.
pub const DEGREES_PER_SECOND: f32 = 90.0;

/// Spin of the plane about the depth axis.
///
/// Only the angle is stored. The matrix is rebuilt from it every frame, so no
/// error accumulates however long the loop runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    angle_degrees: f32,
    degrees_per_second: f32,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::new(DEGREES_PER_SECOND)
    }
}

impl Rotation {
    /// Angle 0, spinning at `degrees_per_second`.
    pub fn new(degrees_per_second: f32) -> Self {
        Self {
            angle_degrees: 0.0,
            degrees_per_second,
        }
    }

    /// Current angle, always in `[0, 360)`.
    pub fn angle_degrees(&self) -> f32 {
        self.angle_degrees
    }

    pub fn degrees_per_second(&self) -> f32 {
        self.degrees_per_second
    }

    pub fn radians(&self) -> f32 {
        self.angle_degrees.to_radians()
    }

    /// Advance by `dt` seconds of wall time.
    pub fn advance(&mut self, dt: f32) {
        let mut angle = (self.angle_degrees + self.degrees_per_second * dt).rem_euclid(360.0);
        // rem_euclid can round up to the modulus for tiny negative inputs
        if angle >= 360.0 {
            angle = 0.0;
        }
        self.angle_degrees = angle;
    }

    /// Rotation about z by the current angle: `cos`/`sin` in the upper-left
    /// 2×2 block, identity elsewhere.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_z(self.radians())
    }

    /// [`Self::matrix`] laid out row by row.
    pub fn row_major(&self) -> [f32; 16] {
        self.matrix().transpose().to_cols_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn circular_distance(a: f32, b: f32) -> f32 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    #[test]
    fn starts_at_zero_with_identity_matrix() {
        let r = Rotation::default();
        assert_eq!(r.angle_degrees(), 0.0);
        assert_eq!(r.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn quarter_turn_maps_x_to_y() {
        let mut r = Rotation::default();
        r.advance(1.0);
        assert!((r.angle_degrees() - 90.0).abs() < 1e-4);
        let p = r.matrix().transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn row_major_layout() {
        let mut r = Rotation::default();
        r.advance(1.0 / 3.0); // 30 degrees
        let (s, c) = r.radians().sin_cos();
        let m = r.row_major();
        let expected = [
            c, -s, 0.0, 0.0, //
            s, c, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        for (a, b) in m.iter().zip(expected) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn angle_stays_in_range() {
        let mut r = Rotation::default();
        for dt in [0.0, 0.016, 3.9, 4.0, 0.5, 1000.25, 1e-7, 7.999_999] {
            r.advance(dt);
            let a = r.angle_degrees();
            assert!((0.0..360.0).contains(&a), "angle {a} out of range");
        }
    }

    #[test]
    fn exact_full_turn_wraps_to_zero() {
        let mut r = Rotation::default();
        r.advance(4.0);
        assert_eq!(r.angle_degrees(), 0.0);
    }

    #[test]
    fn constant_rate_matches_closed_form() {
        let dt = 1.0 / 60.0;
        let mut r = Rotation::default();
        for step in 1..=2000u32 {
            r.advance(dt);
            if step % 97 == 0 {
                let t = step as f64 * dt as f64;
                let expected = (90.0 * t).rem_euclid(360.0) as f32;
                assert!(
                    circular_distance(r.angle_degrees(), expected) < 0.05,
                    "step {step}: {} vs {expected}",
                    r.angle_degrees()
                );
            }
        }
    }

    #[test]
    fn long_stall_wraps_fully() {
        let mut r = Rotation::default();
        r.advance(10.0); // 900 degrees
        assert!((r.angle_degrees() - 180.0).abs() < 1e-3);
    }

    #[test]
    fn reverse_spin_stays_in_range() {
        let mut r = Rotation::new(-90.0);
        r.advance(0.5);
        assert!((r.angle_degrees() - 315.0).abs() < 1e-3);
    }
}
