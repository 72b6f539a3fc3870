//! Pointer and mode events: Click, PointerMove, Cancel, SetActiveSide, SetDpi

use crate::geometry::Side;
use crate::server::handlers::query::point_params;
use crate::server::protocol::{error_codes, Response};
use crate::server::state::ServerState;
use crate::server::util::{parse_params, to_response};
use serde::Deserialize;

/// Handle Click request - feeds a click into the authoring session
pub fn handle_click(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    let p = match point_params(&id, params) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let outcome = state.session.click(&mut state.store, p);
    tracing::debug!("[Server] Click ({:.1}, {:.1}) -> {:?}", p.x, p.y, outcome);
    to_response(id, &outcome)
}

/// Handle PointerMove request - returns the live preview for the open gesture
pub fn handle_pointer_move(
    state: &ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    let p = match point_params(&id, params) {
        Ok(p) => p,
        Err(response) => return response,
    };
    to_response(id, &state.session.pointer_moved(&state.store, p))
}

pub fn handle_cancel(state: &mut ServerState, id: Option<serde_json::Value>) -> Response {
    to_response(id, &state.session.cancel())
}

pub fn handle_set_active_side(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize)]
    struct SideParams {
        side: Side,
    }

    let params: SideParams = match parse_params(&id, params, "{side: \"Front\" | \"Back\"}") {
        Ok(p) => p,
        Err(response) => return response,
    };
    state.session.set_active_side(params.side);
    tracing::info!("[Server] Active side: {}", params.side);
    Response::success(id, serde_json::json!({ "status": "ok", "side": params.side }))
}

/// Handle SetDpi request - rescales every DPI-derived tolerance
pub fn handle_set_dpi(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize)]
    struct DpiParams {
        dpi: f64,
    }

    let params: DpiParams = match parse_params(&id, params, "{dpi: number}") {
        Ok(p) => p,
        Err(response) => return response,
    };
    if params.dpi <= 0.0 {
        return Response::error(
            id,
            error_codes::INVALID_PARAMS,
            format!("dpi must be positive, got {}", params.dpi),
        );
    }
    state.session.set_dpi(params.dpi);
    Response::success(id, serde_json::json!({ "status": "ok", "dpi": params.dpi }))
}
