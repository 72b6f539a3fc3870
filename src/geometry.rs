//! Geometry primitives shared by the feature store, hit testing and workers
//!
//! Coordinates are image pixels. Everything here is pure and allocation-light.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 2D point in image pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        self.distance_2(other).sqrt()
    }

    pub fn distance_2(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn sub(&self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn dot(&self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn midpoint(&self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl From<[f64; 2]> for Point {
    fn from(p: [f64; 2]) -> Self {
        Point::new(p[0], p[1])
    }
}

/// Integer rectangle, used for connector bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl IntRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Edges are inclusive on all four sides
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x as f64
            && p.x <= (self.x + self.width) as f64
            && p.y >= self.y as f64
            && p.y <= (self.y + self.height) as f64
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }
}

/// Copper side of the board. Traces call this their layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    #[default]
    Front,
    Back,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Front => write!(f, "front"),
            Side::Back => write!(f, "back"),
        }
    }
}

/// Point-to-segment minimum distance, returning the closest point on the segment.
/// Zero-length segments degrade to point-to-endpoint distance.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> (f64, Point) {
    let ab = b.sub(a);
    let ap = p.sub(a);
    let ab_len2 = ab.dot(ab);

    if ab_len2 < 1e-12 {
        return (p.distance(a), a);
    }

    let t = (ap.dot(ab) / ab_len2).clamp(0.0, 1.0);
    let closest = Point::new(a.x + t * ab.x, a.y + t * ab.y);
    (p.distance(closest), closest)
}

/// Evenly spaced points on a circle, starting at angle zero
pub fn generate_circle_points(center: Point, radius: f64, n: usize) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / n as f64;
            Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect()
}

/// Largest circle centered at the midpoint of two pads that fits inside both.
///
/// Used to derive a confirmed via's hole from its front and back detections.
/// The radius never drops below one pixel.
pub fn pad_intersection_circle(a: Point, ra: f64, b: Point, rb: f64) -> (Point, f64) {
    let center = a.midpoint(b);
    let half_offset = a.distance(b) / 2.0;
    let radius = (ra.min(rb) - half_offset).max(1.0);
    (center, radius)
}

/// Douglas-Peucker polyline simplification.
/// Endpoints are always kept; interior points survive only if they deviate
/// more than `epsilon` from the chord.
pub fn simplify(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = points[0];
    let last = points[points.len() - 1];
    let mut dmax = 0.0;
    let mut index = 0;

    for (i, p) in points.iter().enumerate().take(points.len() - 1).skip(1) {
        let (d, _) = point_segment_distance(*p, first, last);
        if d > dmax {
            dmax = d;
            index = i;
        }
    }

    if dmax > epsilon {
        let mut left = simplify(&points[..=index], epsilon);
        let right = simplify(&points[index..], epsilon);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_segment_distance() {
        let (d, _) = point_segment_distance(
            Point::new(0.0, 1.0),
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
        );
        assert!((d - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_segment_distance_clamps_to_endpoint() {
        let (d, closest) = point_segment_distance(
            Point::new(5.0, 4.0),
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
        );
        assert_eq!(closest, Point::new(2.0, 0.0));
        assert!((d - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_length_segment() {
        let a = Point::new(3.0, 3.0);
        let (d, closest) = point_segment_distance(Point::new(6.0, 7.0), a, a);
        assert_eq!(closest, a);
        assert!((d - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_rect_contains_edges() {
        let r = IntRect::new(10, 10, 20, 5);
        assert!(r.contains(Point::new(10.0, 10.0)));
        assert!(r.contains(Point::new(30.0, 15.0)));
        assert!(!r.contains(Point::new(30.5, 15.0)));
        assert_eq!(r.center(), Point::new(20.0, 12.5));
    }

    #[test]
    fn test_simplify_drops_collinear_points() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.1),
            Point::new(2.0, 0.0),
            Point::new(2.0, 10.0),
        ];
        let out = simplify(&pts, 0.5);
        assert_eq!(out, vec![Point::new(0.0, 0.0), Point::new(2.0, 0.0), Point::new(2.0, 10.0)]);
    }

    #[test]
    fn test_circle_points() {
        let pts = generate_circle_points(Point::new(10.0, 10.0), 2.0, 4);
        assert_eq!(pts.len(), 4);
        assert!((pts[0].x - 12.0).abs() < 1e-9);
        assert!((pts[1].y - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_pad_intersection_circle() {
        let (c, r) = pad_intersection_circle(Point::new(0.0, 0.0), 10.0, Point::new(4.0, 0.0), 12.0);
        assert_eq!(c, Point::new(2.0, 0.0));
        assert!((r - 8.0).abs() < 1e-9);
    }
}
