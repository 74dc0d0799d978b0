use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::vector::Vec3;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub lo: Point3d,
    pub hi: Point3d,
}

impl Aabb {
    /// An empty box that any `expand` call will overwrite.
    pub fn empty() -> Self {
        Self {
            lo: Point3d::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            hi: Point3d::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3d>) -> Self {
        let mut b = Self::empty();
        for p in points {
            b.expand(p);
        }
        b
    }

    pub fn expand(&mut self, p: &Point3d) {
        self.lo = Point3d::from_vec3(self.lo.to_vec3().min_components(&p.to_vec3()));
        self.hi = Point3d::from_vec3(self.hi.to_vec3().max_components(&p.to_vec3()));
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            lo: Point3d::from_vec3(self.lo.to_vec3().min_components(&other.lo.to_vec3())),
            hi: Point3d::from_vec3(self.hi.to_vec3().max_components(&other.hi.to_vec3())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lo.x > self.hi.x || self.lo.y > self.hi.y || self.lo.z > self.hi.z
    }

    pub fn center(&self) -> Point3d {
        self.lo.midpoint(&self.hi)
    }

    pub fn extent(&self) -> Vec3 {
        self.hi - self.lo
    }

    pub fn diagonal(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.extent().length()
        }
    }

    /// Grow the box by `margin` on every side.
    pub fn inflated(&self, margin: f64) -> Self {
        let m = Vec3::new(margin, margin, margin);
        Self {
            lo: self.lo - m,
            hi: self.hi + m,
        }
    }

    pub fn contains(&self, p: &Point3d) -> bool {
        p.x >= self.lo.x
            && p.x <= self.hi.x
            && p.y >= self.lo.y
            && p.y <= self.hi.y
            && p.z >= self.lo.z
            && p.z <= self.hi.z
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.lo.x <= other.hi.x
            && self.hi.x >= other.lo.x
            && self.lo.y <= other.hi.y
            && self.hi.y >= other.lo.y
            && self.lo.z <= other.hi.z
            && self.hi.z >= other.lo.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_box_absorbs_first_point() {
        let mut b = Aabb::empty();
        assert!(b.is_empty());
        b.expand(&Point3d::new(1.0, 2.0, 3.0));
        assert!(!b.is_empty());
        assert_eq!(b.lo, b.hi);
    }

    #[test]
    fn overlap_is_symmetric_and_tight() {
        let a = Aabb::from_points([&Point3d::ORIGIN, &Point3d::new(1.0, 1.0, 1.0)]);
        let b = Aabb::from_points([&Point3d::new(1.0, 0.0, 0.0), &Point3d::new(2.0, 1.0, 1.0)]);
        let c = Aabb::from_points([&Point3d::new(1.1, 0.0, 0.0), &Point3d::new(2.0, 1.0, 1.0)]);
        assert!(a.overlaps(&b) && b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }
}
