//! Spatial hit testing: resolves a pointer position to a graph element
//!
//! The tester borrows the store and holds no state of its own. Trace queries
//! are restricted to the active layer and answered from the store's R-tree.
//! Tolerances scale with scan resolution so they stay roughly constant in
//! physical size.

use crate::features::{Connector, ConfirmedVia, FeatureStore};
use crate::geometry::{Point, Side};
use serde::Serialize;
use std::cmp::Ordering;

pub const MIN_VERTEX_TOLERANCE_PX: f64 = 5.0;
pub const VERTEX_TOLERANCE_PER_DPI: f64 = 0.008;
pub const MIN_SEGMENT_TOLERANCE_PX: f64 = 10.0;
pub const SEGMENT_TOLERANCE_PER_DPI: f64 = 0.015;

pub fn vertex_tolerance(dpi: f64) -> f64 {
    (VERTEX_TOLERANCE_PER_DPI * dpi).max(MIN_VERTEX_TOLERANCE_PX)
}

pub fn segment_tolerance(dpi: f64) -> f64 {
    (SEGMENT_TOLERANCE_PER_DPI * dpi).max(MIN_SEGMENT_TOLERANCE_PX)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VertexHit {
    pub trace_id: String,
    pub point_index: usize,
    pub point: Point,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentHit {
    pub trace_id: String,
    pub segment_index: usize,
    pub distance: f64,
}

/// Result of a combined hit test, in precedence order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Hit {
    ConfirmedVia { id: String },
    Connector { id: String },
    Vertex { trace_id: String, point_index: usize },
    Segment { trace_id: String, segment_index: usize },
    Empty,
}

/// Orders candidates by distance, then by id and index so equal distances
/// resolve the same way every time.
fn closer(a: (f64, &str, usize), b: (f64, &str, usize)) -> Ordering {
    a.0.partial_cmp(&b.0)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.1.cmp(b.1))
        .then_with(|| a.2.cmp(&b.2))
}

pub struct HitTester<'a> {
    store: &'a FeatureStore,
    dpi: f64,
    active_side: Side,
}

impl<'a> HitTester<'a> {
    pub fn new(store: &'a FeatureStore, dpi: f64, active_side: Side) -> Self {
        Self { store, dpi, active_side }
    }

    pub fn vertex_tolerance(&self) -> f64 {
        vertex_tolerance(self.dpi)
    }

    pub fn segment_tolerance(&self) -> f64 {
        segment_tolerance(self.dpi)
    }

    /// Via whose own circle contains the point; no extra margin
    pub fn hit_test_confirmed_via(&self, x: f64, y: f64) -> Option<&'a ConfirmedVia> {
        let p = Point::new(x, y);
        self.store
            .confirmed_vias()
            .filter(|v| v.contains(p))
            .min_by(|a, b| {
                closer(
                    (a.center.distance(p), a.id.as_str(), 0),
                    (b.center.distance(p), b.id.as_str(), 0),
                )
            })
    }

    pub fn hit_test_connector_on_side(&self, x: f64, y: f64, side: Side) -> Option<&'a Connector> {
        let p = Point::new(x, y);
        self.store
            .connectors()
            .find(|c| c.side == side && c.bounds.contains(p))
    }

    /// Nearest vertex on the active layer strictly within the vertex tolerance
    pub fn hit_test_vertex(&self, x: f64, y: f64) -> Option<VertexHit> {
        let p = Point::new(x, y);
        let tolerance = self.vertex_tolerance();
        self.store
            .trace_index()
            .vertices_near(p, tolerance)
            .filter(|e| e.layer == self.active_side)
            .map(|e| (e, e.point.distance(p)))
            .filter(|(_, d)| *d < tolerance)
            .min_by(|(a, da), (b, db)| {
                closer(
                    (*da, a.trace_id.as_str(), a.point_index),
                    (*db, b.trace_id.as_str(), b.point_index),
                )
            })
            .map(|(e, d)| VertexHit {
                trace_id: e.trace_id.clone(),
                point_index: e.point_index,
                point: e.point,
                distance: d,
            })
    }

    /// Nearest segment on the active layer strictly within the segment tolerance
    pub fn hit_test_trace_segment(&self, x: f64, y: f64) -> Option<SegmentHit> {
        let p = Point::new(x, y);
        let tolerance = self.segment_tolerance();
        self.store
            .trace_index()
            .segments_near(p, tolerance)
            .filter(|e| e.layer == self.active_side)
            .map(|e| {
                let (d, _) = crate::geometry::point_segment_distance(p, e.a, e.b);
                (e, d)
            })
            .filter(|(_, d)| *d < tolerance)
            .min_by(|(a, da), (b, db)| {
                closer(
                    (*da, a.trace_id.as_str(), a.segment_index),
                    (*db, b.trace_id.as_str(), b.segment_index),
                )
            })
            .map(|(e, d)| SegmentHit {
                trace_id: e.trace_id.clone(),
                segment_index: e.segment_index,
                distance: d,
            })
    }

    /// Confirmed via > connector > trace vertex > trace segment > empty
    pub fn hit_test(&self, x: f64, y: f64) -> Hit {
        if let Some(via) = self.hit_test_confirmed_via(x, y) {
            return Hit::ConfirmedVia { id: via.id.clone() };
        }
        if let Some(conn) = self.hit_test_connector_on_side(x, y, self.active_side) {
            return Hit::Connector { id: conn.id.clone() };
        }
        if let Some(v) = self.hit_test_vertex(x, y) {
            return Hit::Vertex {
                trace_id: v.trace_id,
                point_index: v.point_index,
            };
        }
        if let Some(s) = self.hit_test_trace_segment(x, y) {
            return Hit::Segment {
                trace_id: s.trace_id,
                segment_index: s.segment_index,
            };
        }
        Hit::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Trace, TraceSource};
    use crate::geometry::IntRect;

    fn store_with_trace(layer: Side) -> FeatureStore {
        let mut store = FeatureStore::new();
        store
            .add_trace(Trace {
                id: "trace-001".into(),
                number: 1,
                layer,
                points: vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(100.0, 100.0)],
                source: TraceSource::Manual,
            })
            .unwrap();
        store
    }

    #[test]
    fn test_tolerances_scale_with_dpi() {
        assert_eq!(vertex_tolerance(300.0), 5.0);
        assert!((vertex_tolerance(1250.0) - 10.0).abs() < 1e-9);
        assert_eq!(segment_tolerance(300.0), 10.0);
        assert!((segment_tolerance(2000.0) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_tolerance_boundary_is_exclusive() {
        let store = store_with_trace(Side::Front);
        let tester = HitTester::new(&store, 300.0, Side::Front);
        assert!(tester.hit_test_trace_segment(50.0, 10.0).is_none());
        let hit = tester.hit_test_trace_segment(50.0, 9.999).unwrap();
        assert_eq!(hit.trace_id, "trace-001");
        assert_eq!(hit.segment_index, 0);
    }

    #[test]
    fn test_vertex_picks_closest() {
        let store = store_with_trace(Side::Front);
        let tester = HitTester::new(&store, 300.0, Side::Front);
        let hit = tester.hit_test_vertex(98.0, 1.0).unwrap();
        assert_eq!(hit.point_index, 1);
        assert!(tester.hit_test_vertex(50.0, 0.0).is_none());
    }

    #[test]
    fn test_trace_queries_respect_layer() {
        let store = store_with_trace(Side::Back);
        let tester = HitTester::new(&store, 300.0, Side::Front);
        assert!(tester.hit_test_vertex(100.0, 0.0).is_none());
        assert!(tester.hit_test_trace_segment(50.0, 1.0).is_none());
        assert_eq!(tester.hit_test(50.0, 1.0), Hit::Empty);
    }

    #[test]
    fn test_precedence_via_over_vertex() {
        let mut store = store_with_trace(Side::Front);
        store
            .add_confirmed_via(crate::features::ConfirmedVia {
                id: "cvia-001".into(),
                number: 1,
                front_via_id: "via-001".into(),
                back_via_id: "via-002".into(),
                center: Point::new(0.0, 0.0),
                radius: 10.0,
                intersection_boundary: vec![],
                component_id: None,
                pin_number: None,
            })
            .unwrap();
        store
            .add_connector(crate::features::Connector {
                id: "conn-001".into(),
                number: 1,
                side: Side::Front,
                bounds: IntRect::new(90, -5, 20, 10),
                center: Point::new(100.0, 0.0),
                pin_number: 1,
                signal_name: None,
            })
            .unwrap();
        let tester = HitTester::new(&store, 300.0, Side::Front);
        assert_eq!(tester.hit_test(1.0, 1.0), Hit::ConfirmedVia { id: "cvia-001".into() });
        assert_eq!(tester.hit_test(100.0, 1.0), Hit::Connector { id: "conn-001".into() });
        assert_eq!(
            tester.hit_test(100.0, 50.0),
            Hit::Segment { trace_id: "trace-001".into(), segment_index: 1 }
        );
        assert_eq!(
            tester.hit_test(100.0, 98.0),
            Hit::Vertex { trace_id: "trace-001".into(), point_index: 2 }
        );

        let back = HitTester::new(&store, 300.0, Side::Back);
        assert!(back.hit_test_connector_on_side(100.0, 1.0, Side::Back).is_none());
    }
}
