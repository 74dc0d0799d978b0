use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::vector::Vec3;

/// A 4x4 affine transformation matrix stored in column-major order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Column-major 4x4 matrix entries.
    pub m: [f64; 16],
}

impl Transform {
    pub fn identity() -> Self {
        #[rustfmt::skip]
        let m = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self { m }
    }

    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        #[rustfmt::skip]
        let m = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            dx,  dy,  dz,  1.0,
        ];
        Self { m }
    }

    pub fn scaling(sx: f64, sy: f64, sz: f64) -> Self {
        #[rustfmt::skip]
        let m = [
            sx,  0.0, 0.0, 0.0,
            0.0, sy,  0.0, 0.0,
            0.0, 0.0, sz,  0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self { m }
    }

    /// Scale about the origin by per-axis factors, then translate to `center`.
    /// Maps the unit sphere onto an ellipsoid with the given semi-axes.
    pub fn ellipsoid(center: Point3d, semi_axes: Vec3) -> Self {
        Self::translation(center.x, center.y, center.z)
            .compose(&Self::scaling(semi_axes.x, semi_axes.y, semi_axes.z))
    }

    /// `self * other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &Self) -> Self {
        let mut m = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += self.m[k * 4 + row] * other.m[col * 4 + k];
                }
                m[col * 4 + row] = sum;
            }
        }
        Self { m }
    }

    pub fn apply_point(&self, p: &Point3d) -> Point3d {
        let m = &self.m;
        Point3d::new(
            m[0] * p.x + m[4] * p.y + m[8] * p.z + m[12],
            m[1] * p.x + m[5] * p.y + m[9] * p.z + m[13],
            m[2] * p.x + m[6] * p.y + m[10] * p.z + m[14],
        )
    }

    pub fn apply_vector(&self, v: &Vec3) -> Vec3 {
        let m = &self.m;
        Vec3::new(
            m[0] * v.x + m[4] * v.y + m[8] * v.z,
            m[1] * v.x + m[5] * v.y + m[9] * v.z,
            m[2] * v.x + m[6] * v.y + m[10] * v.z,
        )
    }

    pub fn apply_points(&self, points: &mut [Point3d]) {
        for p in points.iter_mut() {
            *p = self.apply_point(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ellipsoid_maps_unit_sphere_poles() {
        let t = Transform::ellipsoid(Point3d::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0));
        let px = t.apply_point(&Point3d::new(1.0, 0.0, 0.0));
        assert_relative_eq!(px.x, 5.0);
        assert_relative_eq!(px.y, 2.0);
        let pz = t.apply_point(&Point3d::new(0.0, 0.0, -1.0));
        assert_relative_eq!(pz.z, -3.0);
    }

    #[test]
    fn compose_applies_right_operand_first() {
        let s = Transform::scaling(2.0, 2.0, 2.0);
        let t = Transform::translation(1.0, 0.0, 0.0);
        let p = Point3d::new(1.0, 1.0, 1.0);
        let ts = t.compose(&s).apply_point(&p);
        assert_relative_eq!(ts.x, 3.0);
        let st = s.compose(&t).apply_point(&p);
        assert_relative_eq!(st.x, 4.0);
    }
}
