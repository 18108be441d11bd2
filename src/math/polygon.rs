use crate::math::{Aabb, Vector2, EPSILON};

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// A convex or concave simple polygon used as a rigid body shape
///
/// Vertices are stored in the body frame, re-centred so that the centroid sits
/// at the origin. The world-frame vertices are recomputed whenever the owning
/// body's pose changes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Polygon {
    /// The vertices in the body frame, centred on the centroid
    local: Vec<Vector2>,

    /// The vertices in the world frame, updated on every pose write
    world: Vec<Vector2>,

    /// The enclosed area of the polygon
    area: f32,

    /// The second moment of area per unit mass, about the centroid
    unit_inertia: f32,
}

impl Polygon {
    /// Creates a new polygon from an ordered vertex list
    ///
    /// Returns `None` when the polygon is degenerate: fewer than three
    /// vertices, near-zero area, or a self-intersecting boundary.
    pub fn new(vertices: Vec<Vector2>) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        if !is_simple(&vertices) {
            return None;
        }

        let signed = signed_area(&vertices);
        if signed.abs() < EPSILON {
            return None;
        }

        let centroid = centroid(&vertices, signed);
        let mut local: Vec<Vector2> = vertices.into_iter().map(|v| v - centroid).collect();

        // Keep a counter-clockwise winding so the area terms stay positive.
        if signed < 0.0 {
            local.reverse();
        }

        let area = signed.abs();
        let unit_inertia = polar_moment(&local) / area;

        let world = local.clone();
        Some(Self {
            local,
            world,
            area,
            unit_inertia,
        })
    }

    /// Returns the number of vertices
    #[inline]
    pub fn len(&self) -> usize {
        self.local.len()
    }

    /// Returns true if the polygon has no vertices
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }

    /// Returns the enclosed area
    #[inline]
    pub fn area(&self) -> f32 {
        self.area
    }

    /// Returns the second moment of area per unit mass about the centroid
    #[inline]
    pub fn unit_inertia(&self) -> f32 {
        self.unit_inertia
    }

    /// Returns the vertices in the body frame
    #[inline]
    pub fn vertices(&self) -> &[Vector2] {
        &self.local
    }

    /// Returns the vertices in the world frame
    #[inline]
    pub fn world_vertices(&self) -> &[Vector2] {
        &self.world
    }

    /// Recomputes the world-frame vertices for the given pose
    pub fn transform(&mut self, position: Vector2, angle: f32) {
        let (sin, cos) = angle.sin_cos();
        for (world, local) in self.world.iter_mut().zip(self.local.iter()) {
            world.x = local.x * cos - local.y * sin + position.x;
            world.y = local.x * sin + local.y * cos + position.y;
        }
    }

    /// Returns the bounding box of the world-frame vertices
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(&self.world).expect("polygon has at least three vertices")
    }
}

/// Returns the signed area of the polygon (positive for counter-clockwise winding)
fn signed_area(vertices: &[Vector2]) -> f32 {
    let mut sum = 0.0;
    for (i, v) in vertices.iter().enumerate() {
        let w = &vertices[(i + 1) % vertices.len()];
        sum += v.cross(w);
    }
    0.5 * sum
}

/// Returns the centroid of the polygon given its signed area
fn centroid(vertices: &[Vector2], signed: f32) -> Vector2 {
    let mut sum = Vector2::zero();
    for (i, v) in vertices.iter().enumerate() {
        let w = vertices[(i + 1) % vertices.len()];
        sum += (*v + w) * v.cross(&w);
    }
    sum / (6.0 * signed)
}

/// Returns the polar second moment of area about the origin
///
/// Vertices must already be centred on the centroid and wound counter-clockwise.
fn polar_moment(vertices: &[Vector2]) -> f32 {
    let mut sum = 0.0;
    for (i, v) in vertices.iter().enumerate() {
        let w = vertices[(i + 1) % vertices.len()];
        sum += v.cross(&w) * (v.dot(v) + v.dot(&w) + w.dot(&w));
    }
    sum / 12.0
}

/// Returns true if no two non-adjacent edges of the polygon intersect
fn is_simple(vertices: &[Vector2]) -> bool {
    let n = vertices.len();
    for i in 0..n {
        let a1 = vertices[i];
        let a2 = vertices[(i + 1) % n];
        for j in (i + 1)..n {
            // Edges sharing a vertex are allowed to touch.
            if j == i || (j + 1) % n == i || (i + 1) % n == j {
                continue;
            }
            let b1 = vertices[j];
            let b2 = vertices[(j + 1) % n];
            if segments_intersect(a1, a2, b1, b2) {
                return false;
            }
        }
    }
    true
}

/// Returns true if the closed segments [a1, a2] and [b1, b2] intersect
fn segments_intersect(a1: Vector2, a2: Vector2, b1: Vector2, b2: Vector2) -> bool {
    let d1 = (b2 - b1).cross(&(a1 - b1));
    let d2 = (b2 - b1).cross(&(a2 - b1));
    let d3 = (a2 - a1).cross(&(b1 - a1));
    let d4 = (a2 - a1).cross(&(b2 - a1));

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    on_segment(b1, b2, a1, d1)
        || on_segment(b1, b2, a2, d2)
        || on_segment(a1, a2, b1, d3)
        || on_segment(a1, a2, b2, d4)
}

/// Returns true if the collinear point p lies within the segment [s1, s2]
fn on_segment(s1: Vector2, s2: Vector2, p: Vector2, cross: f32) -> bool {
    if cross.abs() >= EPSILON {
        return false;
    }
    p.x >= s1.x.min(s2.x) && p.x <= s1.x.max(s2.x) && p.y >= s1.y.min(s2.y) && p.y <= s1.y.max(s2.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> Vec<Vector2> {
        vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_square_mass_properties() {
        let poly = Polygon::new(unit_square()).unwrap();

        assert_relative_eq!(poly.area(), 1.0, epsilon = 1e-5);
        // Unit square about its centroid: (w^2 + h^2) / 12
        assert_relative_eq!(poly.unit_inertia(), 1.0 / 6.0, epsilon = 1e-5);

        // Vertices are re-centred on the centroid
        let sum: Vector2 = poly.vertices().iter().fold(Vector2::zero(), |acc, v| acc + *v);
        assert!(sum.is_zero());
    }

    #[test]
    fn test_clockwise_winding_is_normalized() {
        let mut vertices = unit_square();
        vertices.reverse();
        let poly = Polygon::new(vertices).unwrap();
        assert_relative_eq!(poly.area(), 1.0, epsilon = 1e-5);
        assert!(poly.unit_inertia() > 0.0);
    }

    #[test]
    fn test_degenerate_polygons_rejected() {
        assert!(Polygon::new(vec![Vector2::zero(), Vector2::one()]).is_none());

        // Collinear vertices enclose no area
        assert!(Polygon::new(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(2.0, 0.0),
        ])
        .is_none());

        // Bowtie: edges cross
        assert!(Polygon::new(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 1.0),
        ])
        .is_none());
    }

    #[test]
    fn test_transform_rotates_and_translates() {
        let mut poly = Polygon::new(unit_square()).unwrap();
        poly.transform(Vector2::new(10.0, 5.0), std::f32::consts::FRAC_PI_2);

        let bb = poly.bounding_box();
        assert_relative_eq!(bb.center().x, 10.0, epsilon = 1e-5);
        assert_relative_eq!(bb.center().y, 5.0, epsilon = 1e-5);
        assert_relative_eq!(bb.half_extents().x, 0.5, epsilon = 1e-5);
    }
}
