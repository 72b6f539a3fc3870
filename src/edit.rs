//! Edit operations: manual vias, cascading deletes, segment removal, labels
//!
//! These sit on top of the store primitives and keep net membership in step
//! with the features they touch.

use crate::error::NetlistError;
use crate::features::{
    format_confirmed_via_id, format_connector_id, format_via_id, Connector, ConfirmedVia,
    DetectionMethod, FeatureEvent, FeatureStore, Via,
};
use crate::geometry::{generate_circle_points, pad_intersection_circle, IntRect, Point, Side};
use serde::Serialize;

const BOUNDARY_POINTS: usize = 32;

/// Removes an element from whatever net holds it. A net left with no
/// elements is deleted. Returns the id of the net it was removed from.
pub fn detach_from_net(store: &mut FeatureStore, element_id: &str) -> Option<String> {
    let net_id = store.net_for_element(element_id)?.id.clone();
    let nets = store.nets_mut();
    let emptied = match nets.get_mut(&net_id) {
        Some(net) => {
            net.remove(element_id);
            net.is_empty()
        }
        None => false,
    };
    if emptied {
        nets.shift_remove(&net_id);
        tracing::info!("[Edit] Removed empty net {}", net_id);
    }
    store.notify(FeatureEvent::NetlistModified);
    Some(net_id)
}

/// Places a confirmed via with a synthetic front/back pair at `center`
pub fn place_manual_via(store: &mut FeatureStore, center: Point, radius: f64) -> Result<String, NetlistError> {
    let front_number = store.next_via_number();
    let back_number = store.next_via_number();
    let front_id = format_via_id(front_number);
    let back_id = format_via_id(back_number);
    let boundary = generate_circle_points(center, radius, BOUNDARY_POINTS);

    for (number, id, side, matched) in [
        (front_number, &front_id, Side::Front, &back_id),
        (back_number, &back_id, Side::Back, &front_id),
    ] {
        store.add_via(Via {
            id: id.clone(),
            number,
            center,
            radius,
            side,
            pad_boundary: boundary.clone(),
            confidence: 1.0,
            method: DetectionMethod::Manual,
            matched_via_id: Some(matched.clone()),
        })?;
    }

    let number = store.next_confirmed_via_number();
    let id = format_confirmed_via_id(number);
    store.add_confirmed_via(ConfirmedVia {
        id: id.clone(),
        number,
        front_via_id: front_id,
        back_via_id: back_id,
        center,
        radius,
        intersection_boundary: boundary,
        component_id: None,
        pin_number: None,
    })?;
    tracing::info!("[Edit] Placed {} at ({:.1}, {:.1})", id, center.x, center.y);
    Ok(id)
}

/// Builds a confirmed via from an existing front and back detection
pub fn confirm_via_pair(store: &mut FeatureStore, front_id: &str, back_id: &str) -> Result<String, NetlistError> {
    let mut front = store
        .via(front_id)
        .cloned()
        .ok_or_else(|| NetlistError::ViaNotFound(front_id.to_string()))?;
    let mut back = store
        .via(back_id)
        .cloned()
        .ok_or_else(|| NetlistError::ViaNotFound(back_id.to_string()))?;

    let (center, radius) = pad_intersection_circle(front.center, front.radius, back.center, back.radius);
    let number = store.next_confirmed_via_number();
    let id = format_confirmed_via_id(number);
    store.add_confirmed_via(ConfirmedVia {
        id: id.clone(),
        number,
        front_via_id: front.id.clone(),
        back_via_id: back.id.clone(),
        center,
        radius,
        intersection_boundary: generate_circle_points(center, radius, BOUNDARY_POINTS),
        component_id: None,
        pin_number: None,
    })?;

    front.matched_via_id = Some(back.id.clone());
    back.matched_via_id = Some(front.id.clone());
    store.update_via(front)?;
    store.update_via(back)?;
    Ok(id)
}

/// Deletes a confirmed via together with both of its side detections
pub fn delete_confirmed_via(store: &mut FeatureStore, id: &str) -> Result<ConfirmedVia, NetlistError> {
    let via = store
        .remove_confirmed_via(id)
        .ok_or_else(|| NetlistError::ConfirmedViaNotFound(id.to_string()))?;
    store.remove_via(&via.front_via_id);
    store.remove_via(&via.back_via_id);
    detach_from_net(store, id);
    tracing::info!("[Edit] Deleted {} (+ {}, {})", id, via.front_via_id, via.back_via_id);
    Ok(via)
}

pub fn delete_connector(store: &mut FeatureStore, id: &str) -> Result<(), NetlistError> {
    store
        .remove_connector(id)
        .ok_or_else(|| NetlistError::ConnectorNotFound(id.to_string()))?;
    detach_from_net(store, id);
    tracing::info!("[Edit] Deleted connector {}", id);
    Ok(())
}

pub fn delete_trace(store: &mut FeatureStore, id: &str) -> Result<(), NetlistError> {
    store
        .remove_trace(id)
        .ok_or_else(|| NetlistError::TraceNotFound(id.to_string()))?;
    detach_from_net(store, id);
    tracing::info!("[Edit] Deleted trace {}", id);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result")]
pub enum SegmentRemoval {
    /// The trace had a single segment and is gone
    TraceDeleted,
    /// The trace kept its id with one vertex fewer
    Shortened { removed_point: usize, points: usize },
}

/// Removes one segment by collapsing it onto its neighbour.
///
/// The segment's first vertex is dropped when it is a waypoint, otherwise its
/// second vertex is. Both endpoints of the trace always survive, so its net
/// membership stays valid.
pub fn remove_trace_segment(
    store: &mut FeatureStore,
    trace_id: &str,
    segment_index: usize,
) -> Result<SegmentRemoval, NetlistError> {
    let (segments, mut points) = store
        .trace(trace_id)
        .map(|t| (t.segment_count(), t.points.clone()))
        .ok_or_else(|| NetlistError::TraceNotFound(trace_id.to_string()))?;
    if segment_index >= segments {
        return Err(NetlistError::SegmentIndexOutOfRange {
            id: trace_id.to_string(),
            index: segment_index,
            len: segments,
        });
    }

    if segments == 1 {
        delete_trace(store, trace_id)?;
        return Ok(SegmentRemoval::TraceDeleted);
    }

    let drop_index = if segment_index == 0 { 1 } else { segment_index };
    points.remove(drop_index);
    let remaining = points.len();
    store.update_trace_points(trace_id, points)?;
    tracing::info!(
        "[Edit] Removed segment {} of {} ({} points left)",
        segment_index,
        trace_id,
        remaining
    );
    Ok(SegmentRemoval::Shortened {
        removed_point: drop_index,
        points: remaining,
    })
}

/// Sets or clears a via's component and pin labels. Empty strings clear.
pub fn assign_pin(
    store: &mut FeatureStore,
    via_id: &str,
    component_id: Option<&str>,
    pin_number: Option<&str>,
) -> Result<(), NetlistError> {
    let mut via = store
        .confirmed_via(via_id)
        .cloned()
        .ok_or_else(|| NetlistError::ConfirmedViaNotFound(via_id.to_string()))?;
    let clean = |s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(String::from);
    via.component_id = clean(component_id);
    via.pin_number = clean(pin_number);
    store.update_confirmed_via(via)
}

/// Changes a net's operator-facing name; its id stays the same
pub fn rename_net(store: &mut FeatureStore, net_id: &str, name: &str) -> Result<(), NetlistError> {
    let net = store
        .nets_mut()
        .get_mut(net_id)
        .ok_or_else(|| NetlistError::NetNotFound(net_id.to_string()))?;
    net.name = name.trim().to_string();
    store.notify(FeatureEvent::NetlistModified);
    Ok(())
}

/// Registers a single-side via detection, numbered from the store's counter
pub fn add_detected_via(
    store: &mut FeatureStore,
    side: Side,
    center: Point,
    radius: f64,
    confidence: f64,
    method: DetectionMethod,
) -> Result<String, NetlistError> {
    let number = store.next_via_number();
    let id = format_via_id(number);
    store.add_via(Via {
        id: id.clone(),
        number,
        center,
        radius,
        side,
        pad_boundary: generate_circle_points(center, radius, BOUNDARY_POINTS),
        confidence,
        method,
        matched_via_id: None,
    })?;
    Ok(id)
}

/// Registers a board-edge contact. Its center is the middle of `bounds`.
pub fn add_connector(
    store: &mut FeatureStore,
    side: Side,
    bounds: IntRect,
    pin_number: u32,
    signal_name: Option<&str>,
) -> Result<String, NetlistError> {
    let number = store.next_connector_number();
    let id = format_connector_id(number);
    store.add_connector(Connector {
        id: id.clone(),
        number,
        side,
        bounds,
        center: bounds.center(),
        pin_number,
        signal_name: signal_name.map(str::trim).filter(|s| !s.is_empty()).map(String::from),
    })?;
    tracing::info!("[Edit] Added {} (pin {}) on {}", id, pin_number, side);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{ElectricalNet, ElementRef, Trace, TraceSource};

    fn four_point_trace(store: &mut FeatureStore) {
        store
            .add_trace(Trace {
                id: "trace-001".into(),
                number: 1,
                layer: Side::Front,
                points: vec![
                    Point::new(0.0, 0.0),
                    Point::new(10.0, 0.0),
                    Point::new(20.0, 0.0),
                    Point::new(30.0, 0.0),
                ],
                source: TraceSource::Manual,
            })
            .unwrap();
    }

    #[test]
    fn test_manual_via_has_synthetic_pair() {
        let mut store = FeatureStore::new();
        let id = place_manual_via(&mut store, Point::new(50.0, 60.0), 8.0).unwrap();
        assert_eq!(id, "cvia-001");
        let via = store.confirmed_via(&id).unwrap();
        assert_eq!(via.front_via_id, "via-001");
        assert_eq!(via.back_via_id, "via-002");
        assert_eq!(store.vias_by_side(Side::Front).len(), 1);
        assert_eq!(store.vias_by_side(Side::Back).len(), 1);
        assert_eq!(
            store.via("via-001").unwrap().matched_via_id.as_deref(),
            Some("via-002")
        );
    }

    #[test]
    fn test_delete_confirmed_via_cascades() {
        let mut store = FeatureStore::new();
        let id = place_manual_via(&mut store, Point::new(0.0, 0.0), 8.0).unwrap();
        let mut net = ElectricalNet::new("net-001", "net-001");
        net.add(ElementRef::via(&id));
        store.add_net(net).unwrap();

        delete_confirmed_via(&mut store, &id).unwrap();
        assert!(store.confirmed_via(&id).is_none());
        assert_eq!(store.vias().count(), 0);
        assert_eq!(store.net_count(), 0);
        assert!(delete_confirmed_via(&mut store, &id).is_err());
    }

    #[test]
    fn test_remove_middle_segment_keeps_endpoints() {
        let mut store = FeatureStore::new();
        four_point_trace(&mut store);
        let mut net = ElectricalNet::new("net-001", "net-001");
        net.add(ElementRef::trace("trace-001"));
        net.add(ElementRef::via("cvia-001"));
        store.add_net(net).unwrap();

        let result = remove_trace_segment(&mut store, "trace-001", 1).unwrap();
        assert_eq!(result, SegmentRemoval::Shortened { removed_point: 1, points: 3 });
        let trace = store.trace("trace-001").unwrap();
        assert_eq!(
            trace.points,
            vec![Point::new(0.0, 0.0), Point::new(20.0, 0.0), Point::new(30.0, 0.0)]
        );
        assert!(store.net("net-001").unwrap().contains("trace-001"));
    }

    #[test]
    fn test_remove_first_segment_drops_waypoint() {
        let mut store = FeatureStore::new();
        four_point_trace(&mut store);
        remove_trace_segment(&mut store, "trace-001", 0).unwrap();
        let trace = store.trace("trace-001").unwrap();
        assert_eq!(trace.points[0], Point::new(0.0, 0.0));
        assert_eq!(trace.points[1], Point::new(20.0, 0.0));
    }

    #[test]
    fn test_remove_only_segment_deletes_trace() {
        let mut store = FeatureStore::new();
        store
            .add_trace(Trace {
                id: "trace-001".into(),
                number: 1,
                layer: Side::Front,
                points: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
                source: TraceSource::Manual,
            })
            .unwrap();
        let result = remove_trace_segment(&mut store, "trace-001", 0).unwrap();
        assert_eq!(result, SegmentRemoval::TraceDeleted);
        assert!(store.trace("trace-001").is_none());
        assert!(matches!(
            remove_trace_segment(&mut store, "trace-001", 0),
            Err(NetlistError::TraceNotFound(_))
        ));
    }

    #[test]
    fn test_segment_index_out_of_range() {
        let mut store = FeatureStore::new();
        four_point_trace(&mut store);
        assert!(matches!(
            remove_trace_segment(&mut store, "trace-001", 3),
            Err(NetlistError::SegmentIndexOutOfRange { len: 3, .. })
        ));
    }

    #[test]
    fn test_assign_pin_and_rename() {
        let mut store = FeatureStore::new();
        let id = place_manual_via(&mut store, Point::new(0.0, 0.0), 8.0).unwrap();
        assign_pin(&mut store, &id, Some("U1"), Some(" 3 ")).unwrap();
        assert_eq!(store.confirmed_via(&id).unwrap().pin_label().as_deref(), Some("U1.3"));
        assign_pin(&mut store, &id, Some("U1"), Some("")).unwrap();
        assert_eq!(store.confirmed_via(&id).unwrap().pin_number, None);

        store.add_net(ElectricalNet::new("net-001", "net-001")).unwrap();
        rename_net(&mut store, "net-001", "VBUS").unwrap();
        assert_eq!(store.net("net-001").unwrap().name, "VBUS");
        assert!(rename_net(&mut store, "net-404", "X").is_err());
    }

    #[test]
    fn test_add_connector_and_detected_via() {
        let mut store = FeatureStore::new();
        let bounds = IntRect { x: 0, y: 0, width: 20, height: 40 };
        let id = add_connector(&mut store, Side::Back, bounds, 7, Some(" GND ")).unwrap();
        let conn = store.connector(&id).unwrap();
        assert_eq!(id, "conn-001");
        assert_eq!(conn.center, Point::new(10.0, 20.0));
        assert_eq!(conn.signal_name.as_deref(), Some("GND"));

        let via = add_detected_via(&mut store, Side::Front, Point::new(5.0, 5.0), 6.0, 0.8, DetectionMethod::Hough).unwrap();
        assert_eq!(via, "via-001");
        assert!(store.via(&via).unwrap().matched_via_id.is_none());
    }
}
