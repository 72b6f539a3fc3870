//! Feature edits: labels, renames, deletes, segment removal, additions

use crate::edit::{
    add_connector, add_detected_via, assign_pin, delete_confirmed_via, delete_connector,
    delete_trace, remove_trace_segment, rename_net,
};
use crate::features::DetectionMethod;
use crate::geometry::{IntRect, Point, Side};
use crate::server::protocol::Response;
use crate::server::state::ServerState;
use crate::server::util::{netlist_error, parse_params, to_response};
use serde::Deserialize;

#[derive(Deserialize)]
struct IdParams {
    id: String,
}

fn ok(id: Option<serde_json::Value>) -> Response {
    Response::success(id, serde_json::json!({ "status": "ok" }))
}

/// Handle AssignPin request - sets or clears the component and pin labels of a via
pub fn handle_assign_pin(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize)]
    struct AssignPinParams {
        via_id: String,
        #[serde(default)]
        component_id: Option<String>,
        #[serde(default)]
        pin_number: Option<String>,
    }

    let params: AssignPinParams = match parse_params(
        &id,
        params,
        "{via_id: string, component_id?: string, pin_number?: string}",
    ) {
        Ok(p) => p,
        Err(response) => return response,
    };
    match assign_pin(
        &mut state.store,
        &params.via_id,
        params.component_id.as_deref(),
        params.pin_number.as_deref(),
    ) {
        Ok(()) => ok(id),
        Err(e) => netlist_error(id, e),
    }
}

pub fn handle_rename_net(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize)]
    struct RenameParams {
        net_id: String,
        name: String,
    }

    let params: RenameParams = match parse_params(&id, params, "{net_id: string, name: string}") {
        Ok(p) => p,
        Err(response) => return response,
    };
    match rename_net(&mut state.store, &params.net_id, &params.name) {
        Ok(()) => ok(id),
        Err(e) => netlist_error(id, e),
    }
}

/// Handle DeleteConfirmedVia request - also removes both side detections
pub fn handle_delete_confirmed_via(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    let params: IdParams = match parse_params(&id, params, "{id: string}") {
        Ok(p) => p,
        Err(response) => return response,
    };
    match delete_confirmed_via(&mut state.store, &params.id) {
        Ok(_) => {
            state.session.forget(&params.id);
            ok(id)
        }
        Err(e) => netlist_error(id, e),
    }
}

pub fn handle_delete_connector(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    let params: IdParams = match parse_params(&id, params, "{id: string}") {
        Ok(p) => p,
        Err(response) => return response,
    };
    match delete_connector(&mut state.store, &params.id) {
        Ok(()) => {
            state.session.forget(&params.id);
            ok(id)
        }
        Err(e) => netlist_error(id, e),
    }
}

pub fn handle_delete_trace(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    let params: IdParams = match parse_params(&id, params, "{id: string}") {
        Ok(p) => p,
        Err(response) => return response,
    };
    match delete_trace(&mut state.store, &params.id) {
        Ok(()) => {
            state.session.forget(&params.id);
            ok(id)
        }
        Err(e) => netlist_error(id, e),
    }
}

pub fn handle_remove_trace_segment(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize)]
    struct SegmentParams {
        trace_id: String,
        segment_index: usize,
    }

    let params: SegmentParams =
        match parse_params(&id, params, "{trace_id: string, segment_index: number}") {
            Ok(p) => p,
            Err(response) => return response,
        };
    match remove_trace_segment(&mut state.store, &params.trace_id, params.segment_index) {
        Ok(removal) => {
            // Vertex indices shift, so a drag or junction start on this trace is stale
            state.session.forget(&params.trace_id);
            to_response(id, &removal)
        }
        Err(e) => netlist_error(id, e),
    }
}

pub fn handle_add_connector(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize)]
    struct ConnectorParams {
        side: Side,
        bounds: IntRect,
        pin_number: u32,
        #[serde(default)]
        signal_name: Option<String>,
    }

    let params: ConnectorParams = match parse_params(
        &id,
        params,
        "{side, bounds: {x, y, width, height}, pin_number, signal_name?}",
    ) {
        Ok(p) => p,
        Err(response) => return response,
    };
    match add_connector(
        &mut state.store,
        params.side,
        params.bounds,
        params.pin_number,
        params.signal_name.as_deref(),
    ) {
        Ok(conn_id) => Response::success(id, serde_json::json!({ "id": conn_id })),
        Err(e) => netlist_error(id, e),
    }
}

/// Handle AddVias request - imports single-side detections from an external detector
pub fn handle_add_vias(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize)]
    struct ViaParams {
        side: Side,
        x: f64,
        y: f64,
        radius: f64,
        #[serde(default = "default_confidence")]
        confidence: f64,
        #[serde(default = "default_method")]
        method: DetectionMethod,
    }

    #[derive(Deserialize)]
    struct AddViasParams {
        vias: Vec<ViaParams>,
    }

    fn default_confidence() -> f64 {
        1.0
    }

    fn default_method() -> DetectionMethod {
        DetectionMethod::Imported
    }

    let params: AddViasParams = match parse_params(&id, params, "{vias: [{side, x, y, radius}]}") {
        Ok(p) => p,
        Err(response) => return response,
    };

    let mut ids = Vec::with_capacity(params.vias.len());
    for v in params.vias {
        match add_detected_via(
            &mut state.store,
            v.side,
            Point::new(v.x, v.y),
            v.radius,
            v.confidence,
            v.method,
        ) {
            Ok(via_id) => ids.push(via_id),
            Err(e) => return netlist_error(id, e),
        }
    }
    tracing::info!("[Server] Added {} vias", ids.len());
    Response::success(id, serde_json::json!({ "ids": ids }))
}
