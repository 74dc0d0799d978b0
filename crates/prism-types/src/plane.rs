use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::vector::Vec3;

/// An oriented plane given by a unit normal and an origin point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub origin: Point3d,
    pub normal: Vec3,
}

impl Plane {
    pub fn new(origin: Point3d, normal: Vec3) -> Option<Self> {
        Some(Self {
            origin,
            normal: normal.normalized()?,
        })
    }

    /// The plane y = y0 with normal +j, used as the symmetry plane.
    pub fn y_plane(y0: f64) -> Self {
        Self {
            origin: Point3d::new(0.0, y0, 0.0),
            normal: Vec3::Y,
        }
    }

    pub fn signed_distance(&self, p: &Point3d) -> f64 {
        (*p - self.origin).dot(&self.normal)
    }

    pub fn project_point(&self, p: &Point3d) -> Point3d {
        *p - self.normal * self.signed_distance(p)
    }

    /// Remove the normal component of a vector, leaving its in-plane part.
    pub fn project_vector(&self, v: &Vec3) -> Vec3 {
        v.reject_from_unit(&self.normal)
    }
}
