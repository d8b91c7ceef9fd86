//! Math utilities and types
//!
//! Provides fundamental math types for the scene API and the reference
//! tracer.

pub use nalgebra::{Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Axis-Aligned Bounding Box for world bounds queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub lower: Vec3,
    /// Maximum corner of the bounding box
    pub upper: Vec3,
}

impl Aabb {
    /// Create a new Aabb from lower and upper corners
    pub fn new(lower: Vec3, upper: Vec3) -> Self {
        Self { lower, upper }
    }

    /// Create an empty Aabb that grows to fit the first point added
    pub fn empty() -> Self {
        Self {
            lower: Vec3::repeat(f32::INFINITY),
            upper: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// Whether no point has been added yet
    pub fn is_empty(&self) -> bool {
        self.lower.x > self.upper.x
    }

    /// Grow the box to include a point
    pub fn extend(&mut self, point: Vec3) {
        self.lower = self.lower.inf(&point);
        self.upper = self.upper.sup(&point);
    }

    /// The union of two boxes
    pub fn union(&self, other: &Self) -> Self {
        Self {
            lower: self.lower.inf(&other.lower),
            upper: self.upper.sup(&other.upper),
        }
    }

    /// Get the center of the box
    pub fn center(&self) -> Vec3 {
        (self.lower + self.upper) * 0.5
    }

    /// Check if this box contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.lower.x
            && point.x <= self.upper.x
            && point.y >= self.lower.y
            && point.y <= self.upper.y
            && point.z >= self.lower.z
            && point.z <= self.upper.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_aabb_extend_orders_corners() {
        let mut aabb = Aabb::empty();
        assert!(aabb.is_empty());

        aabb.extend(Vec3::new(1.0, -1.0, 3.0));
        aabb.extend(Vec3::new(-1.0, 1.0, 0.3));

        assert!(!aabb.is_empty());
        assert!(aabb.lower.x <= aabb.upper.x);
        assert!(aabb.lower.y <= aabb.upper.y);
        assert!(aabb.lower.z <= aabb.upper.z);
        assert_relative_eq!(aabb.lower.z, 0.3);
        assert_relative_eq!(aabb.upper.z, 3.0);
    }

    #[test]
    fn test_aabb_contains_its_defining_points() {
        let mut aabb = Aabb::empty();
        let points = [
            Vec3::new(-1.0, -1.0, 3.0),
            Vec3::new(-1.0, 1.0, 3.0),
            Vec3::new(1.0, -1.0, 3.0),
            Vec3::new(0.1, 0.1, 0.3),
        ];
        for p in points {
            aabb.extend(p);
        }
        for p in points {
            assert!(aabb.contains_point(p));
        }
        assert!(!aabb.contains_point(Vec3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn test_aabb_union() {
        let a = Aabb::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 1.0));
        let b = Aabb::new(Vec3::new(0.5, -2.0, 0.0), Vec3::new(2.0, 0.5, 0.5));
        let u = a.union(&b);
        assert_relative_eq!(u.lower.y, -2.0);
        assert_relative_eq!(u.upper.x, 2.0);
        assert_relative_eq!(u.center().z, 0.5);
    }
}
