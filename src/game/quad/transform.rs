use glam::{Mat4, Vec2, Vec3};

/// Model matrix for the quad: translate by `offset`, spin about z by `time`
/// radians, then shrink uniformly by `scale`. Applied to a vertex the scale
/// acts first and the translation last.
pub fn compose_transform(offset: Vec2, time: f32, scale: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(offset.x, offset.y, 0.0))
        * Mat4::from_rotation_z(time)
        * Mat4::from_scale(Vec3::splat(scale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn rest_pose_is_pure_scale() {
        let m = compose_transform(Vec2::ZERO, 0.0, 0.5);
        assert!(m.abs_diff_eq(Mat4::from_scale(Vec3::splat(0.5)), 1e-6));
    }

    #[test]
    fn matches_reference_product() {
        let offset = Vec2::new(0.3, -0.2);
        let time: f32 = 1.25;
        let t = Mat4::from_cols_array(&[
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.3, -0.2, 0.0, 1.0,
        ]);
        let (s, c) = time.sin_cos();
        let r = Mat4::from_cols_array(&[
            c, s, 0.0, 0.0,
            -s, c, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]);
        let sc = Mat4::from_diagonal(Vec4::new(0.5, 0.5, 0.5, 1.0));

        let m = compose_transform(offset, time, 0.5);
        assert!(m.abs_diff_eq(t * r * sc, 1e-6));
    }

    #[test]
    fn order_matters() {
        let offset = Vec2::new(0.4, 0.1);
        let time = 0.7;
        let translate = Mat4::from_translation(Vec3::new(offset.x, offset.y, 0.0));
        let rotate = Mat4::from_rotation_z(time);
        let scale = Mat4::from_scale(Vec3::splat(0.5));

        let ours = compose_transform(offset, time, 0.5);
        let swapped = rotate * translate * scale;
        assert!(!ours.abs_diff_eq(swapped, 1e-3));

        let v = Vec4::new(0.5, 0.5, 0.0, 1.0);
        assert!(!(ours * v).abs_diff_eq(swapped * v, 1e-3));
    }

    #[test]
    fn corner_follows_scale_rotate_translate() {
        let m = compose_transform(Vec2::new(1.0, 0.0), std::f32::consts::FRAC_PI_2, 0.5);
        // (0.5, 0) -> scaled (0.25, 0) -> rotated (0, 0.25) -> translated (1, 0.25)
        let p = m.transform_point3(Vec3::new(0.5, 0.0, 0.0));
        assert!(p.abs_diff_eq(Vec3::new(1.0, 0.25, 0.0), 1e-6));
    }
}
