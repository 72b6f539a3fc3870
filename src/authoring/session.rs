//! Trace authoring state machine
//!
//! Turns discrete pointer events into committed traces and vertex moves.
//! States are `Idle`, `Drawing` and `VertexDragging`; at most one gesture is
//! open at a time. Every transition is synchronous and a cancel never leaves
//! a partial write behind.

use crate::config::EngineConfig;
use crate::edit::place_manual_via;
use crate::endpoint::Endpoint;
use crate::error::NetlistError;
use crate::features::{format_trace_id, FeatureStore, Trace, TraceSource};
use crate::geometry::{Point, Side};
use crate::hit_test::{Hit, HitTester};
use crate::netlist::{ConsolidationOutcome, NetConsolidator};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state")]
pub enum SessionState {
    #[default]
    Idle,
    Drawing {
        start: Endpoint,
        layer: Side,
        waypoints: Vec<Point>,
    },
    VertexDragging {
        trace_id: String,
        point_index: usize,
        original: Point,
    },
}

/// What a pointer or keyboard event did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome")]
pub enum SessionOutcome {
    Ignored,
    DrawingStarted { start: Endpoint },
    WaypointAdded { waypoints: usize },
    TraceCommitted { trace_id: String, end: Endpoint, net: ConsolidationOutcome },
    Cancelled,
    DragStarted { trace_id: String, point_index: usize },
    VertexMoved { trace_id: String, point_index: usize },
    SegmentSelected { trace_id: String, segment_index: usize },
    ViaPlaced { id: String },
    Failed { message: String },
}

/// Live guide geometry for the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "preview")]
pub enum Preview {
    None,
    RubberBand { from: Point, to: Point },
    VertexDrag { before: Option<Point>, vertex: Point, after: Option<Point> },
}

pub struct TraceAuthoringSession {
    state: SessionState,
    active_side: Side,
    config: EngineConfig,
}

impl TraceAuthoringSession {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            state: SessionState::Idle,
            active_side: Side::Front,
            config,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SessionState::Idle)
    }

    pub fn active_side(&self) -> Side {
        self.active_side
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Switching sides abandons any open gesture
    pub fn set_active_side(&mut self, side: Side) {
        if side != self.active_side {
            self.cancel();
            self.active_side = side;
        }
    }

    pub fn set_dpi(&mut self, dpi: f64) {
        if dpi > 0.0 {
            self.config.dpi = dpi;
        }
    }

    pub fn cancel(&mut self) -> SessionOutcome {
        match std::mem::take(&mut self.state) {
            SessionState::Idle => SessionOutcome::Ignored,
            SessionState::Drawing { waypoints, .. } => {
                tracing::debug!("[Authoring] Drawing cancelled ({} waypoints discarded)", waypoints.len());
                SessionOutcome::Cancelled
            }
            SessionState::VertexDragging { trace_id, point_index, .. } => {
                tracing::debug!("[Authoring] Drag of {}[{}] cancelled", trace_id, point_index);
                SessionOutcome::Cancelled
            }
        }
    }

    /// Cancels the open gesture if it refers to `element_id`. Called after
    /// a delete or a segment removal so a later click cannot commit against
    /// an element that is gone or has been renumbered.
    pub fn forget(&mut self, element_id: &str) -> bool {
        let stale = match &self.state {
            SessionState::Idle => false,
            SessionState::Drawing { start, .. } => start.references(element_id),
            SessionState::VertexDragging { trace_id, .. } => trace_id == element_id,
        };
        if stale {
            tracing::debug!("[Authoring] {} removed, abandoning gesture", element_id);
            self.cancel();
        }
        stale
    }

    /// Opens a drawing gesture from an explicit endpoint, cancelling any
    /// gesture already in progress.
    pub fn begin_drawing(&mut self, start: Endpoint, anchor: Point) -> SessionOutcome {
        if !self.is_idle() {
            self.cancel();
        }
        tracing::debug!("[Authoring] Drawing from {:?} on {}", start, self.active_side);
        self.state = SessionState::Drawing {
            start: start.clone(),
            layer: self.active_side,
            waypoints: vec![anchor],
        };
        SessionOutcome::DrawingStarted { start }
    }

    pub fn click(&mut self, store: &mut FeatureStore, p: Point) -> SessionOutcome {
        match std::mem::take(&mut self.state) {
            SessionState::Idle => self.click_idle(store, p),
            SessionState::Drawing { start, layer, waypoints } => {
                self.click_drawing(store, p, start, layer, waypoints)
            }
            SessionState::VertexDragging { trace_id, point_index, .. } => {
                self.finish_drag(store, p, trace_id, point_index)
            }
        }
    }

    pub fn pointer_moved(&self, store: &FeatureStore, p: Point) -> Preview {
        match &self.state {
            SessionState::Idle => Preview::None,
            SessionState::Drawing { waypoints, .. } => match waypoints.last() {
                Some(last) => Preview::RubberBand { from: *last, to: p },
                None => Preview::None,
            },
            SessionState::VertexDragging { trace_id, point_index, .. } => {
                let Some(trace) = store.trace(trace_id) else {
                    return Preview::None;
                };
                Preview::VertexDrag {
                    before: point_index
                        .checked_sub(1)
                        .and_then(|i| trace.points.get(i).copied()),
                    vertex: p,
                    after: trace.points.get(point_index + 1).copied(),
                }
            }
        }
    }

    fn click_idle(&mut self, store: &mut FeatureStore, p: Point) -> SessionOutcome {
        let hit = HitTester::new(store, self.config.dpi, self.active_side).hit_test(p.x, p.y);
        match hit {
            Hit::ConfirmedVia { id } => {
                let Some(center) = store.confirmed_via(&id).map(|v| v.center) else {
                    return SessionOutcome::Ignored;
                };
                self.begin_drawing(Endpoint::via(id), center)
            }
            Hit::Connector { id } => self.begin_drawing(Endpoint::connector(id), p),
            Hit::Vertex { trace_id, point_index } => {
                let Some(original) = store
                    .trace(&trace_id)
                    .and_then(|t| t.points.get(point_index).copied())
                else {
                    return SessionOutcome::Ignored;
                };
                tracing::debug!("[Authoring] Dragging {}[{}]", trace_id, point_index);
                self.state = SessionState::VertexDragging {
                    trace_id: trace_id.clone(),
                    point_index,
                    original,
                };
                SessionOutcome::DragStarted { trace_id, point_index }
            }
            Hit::Segment { trace_id, segment_index } => {
                SessionOutcome::SegmentSelected { trace_id, segment_index }
            }
            Hit::Empty => match place_manual_via(store, p, self.config.manual_via_radius()) {
                Ok(id) => SessionOutcome::ViaPlaced { id },
                Err(e) => SessionOutcome::Failed { message: e.to_string() },
            },
        }
    }

    fn click_drawing(
        &mut self,
        store: &mut FeatureStore,
        p: Point,
        start: Endpoint,
        layer: Side,
        mut waypoints: Vec<Point>,
    ) -> SessionOutcome {
        let tester = HitTester::new(store, self.config.dpi, layer);
        let end = if let Some(via) = tester.hit_test_confirmed_via(p.x, p.y) {
            Some((Endpoint::via(via.id.clone()), via.center))
        } else if let Some(conn) = tester.hit_test_connector_on_side(p.x, p.y, layer) {
            Some((Endpoint::connector(conn.id.clone()), p))
        } else {
            tester
                .hit_test_vertex(p.x, p.y)
                .map(|v| (Endpoint::junction(v.trace_id, v.point_index), v.point))
        };

        match end {
            Some((end, _)) if end == start => {
                // Back on the starting element; keep drawing
                self.state = SessionState::Drawing { start, layer, waypoints };
                SessionOutcome::Ignored
            }
            Some((end, anchor)) => {
                waypoints.push(anchor);
                self.commit(store, start, end, layer, waypoints)
            }
            None => {
                waypoints.push(p);
                let count = waypoints.len();
                self.state = SessionState::Drawing { start, layer, waypoints };
                SessionOutcome::WaypointAdded { waypoints: count }
            }
        }
    }

    fn commit(
        &mut self,
        store: &mut FeatureStore,
        start: Endpoint,
        end: Endpoint,
        layer: Side,
        points: Vec<Point>,
    ) -> SessionOutcome {
        for endpoint in [&start, &end] {
            if let Err(e) = endpoint.validate(store) {
                tracing::warn!("[Authoring] Dropping trace: {}", e);
                return SessionOutcome::Failed { message: e.to_string() };
            }
        }

        let number = store.next_trace_number();
        let trace_id = format_trace_id(number);
        let point_count = points.len();
        if let Err(e) = store.add_trace(Trace {
            id: trace_id.clone(),
            number,
            layer,
            points,
            source: TraceSource::Manual,
        }) {
            tracing::warn!("[Authoring] Could not commit trace: {}", e);
            return SessionOutcome::Failed { message: e.to_string() };
        }

        let junctions: Vec<String> = [&start, &end]
            .iter()
            .filter_map(|e| e.junction_trace_id().map(String::from))
            .collect();
        let net = match NetConsolidator::new(store, self.config.junction_tolerance_px)
            .consolidate(&start, &end, &trace_id, &junctions)
        {
            Ok(net) => net,
            Err(e) => {
                store.remove_trace(&trace_id);
                return SessionOutcome::Failed { message: e.to_string() };
            }
        };
        tracing::info!(
            "[Authoring] Committed {} ({} points) on {}",
            trace_id,
            point_count,
            layer
        );
        SessionOutcome::TraceCommitted { trace_id, end, net }
    }

    fn finish_drag(
        &mut self,
        store: &mut FeatureStore,
        p: Point,
        trace_id: String,
        point_index: usize,
    ) -> SessionOutcome {
        let Some(mut points) = store.trace(&trace_id).map(|t| t.points.clone()) else {
            return SessionOutcome::Failed {
                message: NetlistError::TraceNotFound(trace_id).to_string(),
            };
        };
        let len = points.len();
        let Some(slot) = points.get_mut(point_index) else {
            let err = NetlistError::PointIndexOutOfRange { id: trace_id, index: point_index, len };
            return SessionOutcome::Failed { message: err.to_string() };
        };
        *slot = p;
        match store.update_trace_points(&trace_id, points) {
            Ok(()) => {
                tracing::info!("[Authoring] Moved {}[{}] to ({:.1}, {:.1})", trace_id, point_index, p.x, p.y);
                SessionOutcome::VertexMoved { trace_id, point_index }
            }
            Err(e) => SessionOutcome::Failed { message: e.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig { dpi: 300.0, ..Default::default() }
    }

    #[test]
    fn test_empty_click_places_via() {
        let mut store = FeatureStore::new();
        let mut session = TraceAuthoringSession::new(config());
        let outcome = session.click(&mut store, Point::new(10.0, 10.0));
        assert_eq!(outcome, SessionOutcome::ViaPlaced { id: "cvia-001".into() });
        assert!(session.is_idle());
    }

    #[test]
    fn test_cancel_discards_waypoints() {
        let mut store = FeatureStore::new();
        let via = place_manual_via(&mut store, Point::new(100.0, 100.0), 10.0).unwrap();
        let mut session = TraceAuthoringSession::new(config());

        assert_eq!(
            session.click(&mut store, Point::new(102.0, 101.0)),
            SessionOutcome::DrawingStarted { start: Endpoint::via(&via) }
        );
        match session.state() {
            SessionState::Drawing { waypoints, .. } => {
                assert_eq!(waypoints, &vec![Point::new(100.0, 100.0)])
            }
            other => panic!("unexpected state {:?}", other),
        }
        session.click(&mut store, Point::new(200.0, 150.0));
        assert_eq!(session.cancel(), SessionOutcome::Cancelled);
        assert!(session.is_idle());
        assert_eq!(store.trace_count(), 0);
        assert_eq!(store.net_count(), 0);
    }

    #[test]
    fn test_rubber_band_follows_last_waypoint() {
        let mut store = FeatureStore::new();
        place_manual_via(&mut store, Point::new(100.0, 100.0), 10.0).unwrap();
        let mut session = TraceAuthoringSession::new(config());
        session.click(&mut store, Point::new(100.0, 100.0));
        session.click(&mut store, Point::new(200.0, 100.0));
        assert_eq!(
            session.pointer_moved(&store, Point::new(250.0, 130.0)),
            Preview::RubberBand {
                from: Point::new(200.0, 100.0),
                to: Point::new(250.0, 130.0)
            }
        );
    }

    #[test]
    fn test_clicking_start_via_again_is_ignored() {
        let mut store = FeatureStore::new();
        place_manual_via(&mut store, Point::new(100.0, 100.0), 10.0).unwrap();
        let mut session = TraceAuthoringSession::new(config());
        session.click(&mut store, Point::new(100.0, 100.0));
        assert_eq!(session.click(&mut store, Point::new(101.0, 100.0)), SessionOutcome::Ignored);
        assert!(matches!(session.state(), SessionState::Drawing { .. }));
    }

    #[test]
    fn test_side_switch_cancels_gesture() {
        let mut store = FeatureStore::new();
        place_manual_via(&mut store, Point::new(100.0, 100.0), 10.0).unwrap();
        let mut session = TraceAuthoringSession::new(config());
        session.click(&mut store, Point::new(100.0, 100.0));
        session.set_active_side(Side::Back);
        assert!(session.is_idle());
        assert_eq!(session.active_side(), Side::Back);
    }

    #[test]
    fn test_begin_drawing_replaces_open_gesture() {
        let mut session = TraceAuthoringSession::new(config());
        session.begin_drawing(Endpoint::via("cvia-001"), Point::new(0.0, 0.0));
        session.begin_drawing(Endpoint::connector("conn-001"), Point::new(5.0, 5.0));
        match session.state() {
            SessionState::Drawing { start, waypoints, .. } => {
                assert_eq!(start, &Endpoint::connector("conn-001"));
                assert_eq!(waypoints.len(), 1);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_deleted_start_via_does_not_commit() {
        let mut store = FeatureStore::new();
        let a = place_manual_via(&mut store, Point::new(100.0, 100.0), 10.0).unwrap();
        place_manual_via(&mut store, Point::new(300.0, 100.0), 10.0).unwrap();
        let mut session = TraceAuthoringSession::new(config());
        session.click(&mut store, Point::new(100.0, 100.0));

        crate::edit::delete_confirmed_via(&mut store, &a).unwrap();
        let outcome = session.click(&mut store, Point::new(300.0, 100.0));
        assert_eq!(
            outcome,
            SessionOutcome::Failed { message: format!("confirmed via not found: {}", a) }
        );
        assert!(session.is_idle());
        assert_eq!(store.trace_count(), 0);
        assert!(store.net_for_element(&a).is_none());
        assert_eq!(store.net_count(), 0);
    }

    #[test]
    fn test_forget_cancels_only_matching_gesture() {
        let mut store = FeatureStore::new();
        let a = place_manual_via(&mut store, Point::new(100.0, 100.0), 10.0).unwrap();
        let mut session = TraceAuthoringSession::new(config());
        session.click(&mut store, Point::new(100.0, 100.0));

        assert!(!session.forget("cvia-999"));
        assert!(matches!(session.state(), SessionState::Drawing { .. }));
        assert!(session.forget(&a));
        assert!(session.is_idle());
        assert!(!session.forget(&a));
    }
}
