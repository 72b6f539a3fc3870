//! Spatial indexing for trace hit testing
//!
//! Every trace contributes one R-tree entry per vertex and one per segment.
//! The store keeps the index in sync on every trace mutation, so hit tests
//! only touch nearby candidates.

use crate::features::types::Trace;
use crate::geometry::{point_segment_distance, Point, Side};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// One trace segment in the index
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentEntry {
    pub trace_id: String,
    pub segment_index: usize,
    pub layer: Side,
    pub a: Point,
    pub b: Point,
}

impl RTreeObject for SegmentEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.a.to_array(), self.b.to_array())
    }
}

impl PointDistance for SegmentEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let (d, _) = point_segment_distance(Point::from(*point), self.a, self.b);
        d * d
    }
}

/// One trace vertex in the index
#[derive(Clone, Debug, PartialEq)]
pub struct VertexEntry {
    pub trace_id: String,
    pub point_index: usize,
    pub layer: Side,
    pub point: Point,
}

impl RTreeObject for VertexEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point.to_array())
    }
}

impl PointDistance for VertexEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.point.distance_2(Point::from(*point))
    }
}

fn segment_entries(trace: &Trace) -> Vec<SegmentEntry> {
    trace
        .points
        .windows(2)
        .enumerate()
        .map(|(i, w)| SegmentEntry {
            trace_id: trace.id.clone(),
            segment_index: i,
            layer: trace.layer,
            a: w[0],
            b: w[1],
        })
        .collect()
}

fn vertex_entries(trace: &Trace) -> Vec<VertexEntry> {
    trace
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| VertexEntry {
            trace_id: trace.id.clone(),
            point_index: i,
            layer: trace.layer,
            point: *p,
        })
        .collect()
}

/// R-tree pair covering every trace in the store
pub struct TraceIndex {
    segments: RTree<SegmentEntry>,
    vertices: RTree<VertexEntry>,
}

impl Default for TraceIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceIndex {
    pub fn new() -> Self {
        Self {
            segments: RTree::new(),
            vertices: RTree::new(),
        }
    }

    pub fn bulk_load<'a>(traces: impl IntoIterator<Item = &'a Trace>) -> Self {
        let mut segments = Vec::new();
        let mut vertices = Vec::new();
        for trace in traces {
            segments.extend(segment_entries(trace));
            vertices.extend(vertex_entries(trace));
        }
        Self {
            segments: RTree::bulk_load(segments),
            vertices: RTree::bulk_load(vertices),
        }
    }

    pub fn insert(&mut self, trace: &Trace) {
        for entry in segment_entries(trace) {
            self.segments.insert(entry);
        }
        for entry in vertex_entries(trace) {
            self.vertices.insert(entry);
        }
    }

    /// `trace` must be the exact value that was inserted
    pub fn remove(&mut self, trace: &Trace) {
        for entry in segment_entries(trace) {
            self.segments.remove(&entry);
        }
        for entry in vertex_entries(trace) {
            self.vertices.remove(&entry);
        }
    }

    pub fn segments_near(&self, p: Point, radius: f64) -> impl Iterator<Item = &SegmentEntry> {
        self.segments.locate_within_distance(p.to_array(), radius * radius)
    }

    pub fn vertices_near(&self, p: Point, radius: f64) -> impl Iterator<Item = &VertexEntry> {
        self.vertices.locate_within_distance(p.to_array(), radius * radius)
    }

    pub fn segment_count(&self) -> usize {
        self.segments.size()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.size()
    }
}
