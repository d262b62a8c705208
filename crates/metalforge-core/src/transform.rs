//! Rotation and translation of shapes.
//!
//! Angles are in degrees, counter-clockwise positive, with +x at 0°.
//! Every operation returns a new value and leaves its input untouched.

use serde::{Deserialize, Serialize};

use crate::geometry::{LineString, Point, Polygon, Shape};

/// Rotate `p` about `origin` by `angle_deg`.
pub fn rotate_point(p: &Point, angle_deg: f64, origin: &Point) -> Point {
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let dx = p.x - origin.x;
    let dy = p.y - origin.y;
    Point::new(origin.x + dx * cos - dy * sin, origin.y + dx * sin + dy * cos)
}

/// Something that can be rotated and translated without mutation.
pub trait Transformable: Sized {
    fn rotated(&self, angle_deg: f64, origin: &Point) -> Self;
    fn translated(&self, dx: f64, dy: f64) -> Self;
}

impl Transformable for Point {
    fn rotated(&self, angle_deg: f64, origin: &Point) -> Self {
        rotate_point(self, angle_deg, origin)
    }

    fn translated(&self, dx: f64, dy: f64) -> Self {
        Point::new(self.x + dx, self.y + dy)
    }
}

impl Transformable for Vec<Point> {
    fn rotated(&self, angle_deg: f64, origin: &Point) -> Self {
        self.iter().map(|p| p.rotated(angle_deg, origin)).collect()
    }

    fn translated(&self, dx: f64, dy: f64) -> Self {
        self.iter().map(|p| p.translated(dx, dy)).collect()
    }
}

impl Transformable for Polygon {
    fn rotated(&self, angle_deg: f64, origin: &Point) -> Self {
        Polygon::new(self.vertices.rotated(angle_deg, origin))
    }

    fn translated(&self, dx: f64, dy: f64) -> Self {
        Polygon::new(self.vertices.translated(dx, dy))
    }
}

impl Transformable for LineString {
    fn rotated(&self, angle_deg: f64, origin: &Point) -> Self {
        LineString::new(self.points.rotated(angle_deg, origin))
    }

    fn translated(&self, dx: f64, dy: f64) -> Self {
        LineString::new(self.points.translated(dx, dy))
    }
}

impl Transformable for Shape {
    fn rotated(&self, angle_deg: f64, origin: &Point) -> Self {
        match self {
            Shape::Polygon(p) => Shape::Polygon(p.rotated(angle_deg, origin)),
            Shape::LineString(l) => Shape::LineString(l.rotated(angle_deg, origin)),
        }
    }

    fn translated(&self, dx: f64, dy: f64) -> Self {
        match self {
            Shape::Polygon(p) => Shape::Polygon(p.translated(dx, dy)),
            Shape::LineString(l) => Shape::LineString(l.translated(dx, dy)),
        }
    }
}

pub fn rotate<T: Transformable>(shape: &T, angle_deg: f64, origin: Point) -> T {
    shape.rotated(angle_deg, &origin)
}

pub fn translate<T: Transformable>(shape: &T, dx: f64, dy: f64) -> T {
    shape.translated(dx, dy)
}

/// Local-to-design placement of a component: rotation about the local
/// origin followed by a translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Rotation in degrees.
    pub rotation: f64,
    /// Translation applied after the rotation.
    pub offset: Point,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            rotation: 0.0,
            offset: Point::origin(),
        }
    }
}

impl Placement {
    pub fn new(rotation: f64, dx: f64, dy: f64) -> Self {
        Self {
            rotation,
            offset: Point::new(dx, dy),
        }
    }

    pub fn apply<T: Transformable>(&self, shape: &T) -> T {
        shape
            .rotated(self.rotation, &Point::origin())
            .translated(self.offset.x, self.offset.y)
    }
}

/// Rotate about the origin, then translate.
pub fn place<T: Transformable>(shape: &T, angle_deg: f64, dx: f64, dy: f64) -> T {
    Placement::new(angle_deg, dx, dy).apply(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{line, rectangle};

    const EPS: f64 = 1e-9;

    fn assert_points_close(a: &[Point], b: &[Point]) {
        assert_eq!(a.len(), b.len());
        for (p, q) in a.iter().zip(b) {
            assert!(p.approx_eq(q, EPS), "{p:?} != {q:?}");
        }
    }

    #[test]
    fn test_rotate_quarter_turn_is_ccw() {
        let p = rotate_point(&Point::new(1.0, 0.0), 90.0, &Point::origin());
        assert!(p.approx_eq(&Point::new(0.0, 1.0), EPS));
    }

    #[test]
    fn test_rotate_about_other_origin() {
        let p = Point::new(2.0, 1.0).rotated(180.0, &Point::new(1.0, 1.0));
        assert!(p.approx_eq(&Point::new(0.0, 1.0), EPS));
    }

    #[test]
    fn test_rotate_round_trip() {
        let rect = rectangle(30.0, 12.0, 7.0, -3.0).unwrap();
        for angle in [0.0, 13.0, 90.0, 217.5, -45.0] {
            let origin = Point::new(4.0, 9.0);
            let back = rotate(&rotate(&rect, angle, origin), -angle, origin);
            assert_points_close(&back.vertices, &rect.vertices);
        }
    }

    #[test]
    fn test_translate_round_trip() {
        let l = line(Point::new(0.0, -5.0), Point::new(0.0, 5.0)).unwrap();
        let back = translate(&translate(&l, 12.5, -7.25), -12.5, 7.25);
        assert_points_close(&back.points, &l.points);
    }

    #[test]
    fn test_input_not_mutated() {
        let rect = rectangle(2.0, 2.0, 0.0, 0.0).unwrap();
        let copy = rect.clone();
        let _ = place(&rect, 45.0, 10.0, 10.0);
        assert_eq!(rect, copy);
    }

    #[test]
    fn test_place_order_is_rotate_then_translate() {
        let p = place(&Point::new(1.0, 0.0), 90.0, 10.0, 0.0);
        // Rotating first keeps the offset axis-aligned.
        assert!(p.approx_eq(&Point::new(10.0, 1.0), EPS));
        let shape: Shape = rectangle(2.0, 2.0, 0.0, 0.0).unwrap().into();
        let placed = Placement::new(0.0, 3.0, 4.0).apply(&shape);
        assert!(placed.bbox().unwrap().center().approx_eq(&Point::new(3.0, 4.0), EPS));
    }
}
