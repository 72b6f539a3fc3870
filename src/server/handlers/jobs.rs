//! Background jobs: MatchVias, AutoTrace
//!
//! Both return immediately with `{"status": "started"}`. The result arrives
//! later as a `jobComplete` notification.

use crate::endpoint::Endpoint;
use crate::geometry::{Point, Side};
use crate::server::protocol::{error_codes, Response};
use crate::server::state::ServerState;
use crate::server::util::{netlist_error, parse_params};
use crate::worker::AutoTraceRequest;
use serde::Deserialize;

/// Handle MatchVias request - pairs front and back detections off-thread
pub fn handle_match_vias_async(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize, Default)]
    struct MatchParams {
        #[serde(default)]
        tolerance_px: Option<f64>,
    }

    let params: MatchParams = params
        .and_then(|p| serde_json::from_value(p).ok())
        .unwrap_or_default();
    let tolerance = params
        .tolerance_px
        .unwrap_or_else(|| state.config().side_match_tolerance());

    let unmatched = |side| {
        state
            .store
            .vias_by_side(side)
            .into_iter()
            .filter(|v| v.matched_via_id.is_none())
            .cloned()
            .collect::<Vec<_>>()
    };
    let front = unmatched(Side::Front);
    let back = unmatched(Side::Back);
    let (front_count, back_count) = (front.len(), back.len());

    state.jobs.spawn_side_match(
        state.store.generation(),
        state.matcher.clone(),
        front,
        back,
        tolerance,
    );

    Response::success(
        id,
        serde_json::json!({
            "status": "started",
            "front": front_count,
            "back": back_count,
            "tolerance_px": tolerance,
        }),
    )
}

/// Handle AutoTrace request - follows copper between two endpoints off-thread
pub fn handle_auto_trace_async(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize)]
    struct AutoTraceParams {
        #[serde(default)]
        layer: Option<Side>,
        #[serde(default)]
        start: Endpoint,
        #[serde(default)]
        end: Endpoint,
        #[serde(default)]
        from: Option<Point>,
        #[serde(default)]
        to: Option<Point>,
    }

    let Some(pathfinder) = state.pathfinder.clone() else {
        return Response::error(
            id,
            error_codes::NO_PATHFINDER,
            "No copper pathfinder available".to_string(),
        );
    };

    let params: AutoTraceParams =
        match parse_params(&id, params, "{start: Endpoint, end: Endpoint, from?: Point, to?: Point}") {
            Ok(p) => p,
            Err(response) => return response,
        };

    if let Err(e) = params
        .start
        .validate(&state.store)
        .and_then(|()| params.end.validate(&state.store))
    {
        return netlist_error(id, e);
    }

    let from = params.from.or_else(|| params.start.anchor(&state.store));
    let to = params.to.or_else(|| params.end.anchor(&state.store));
    let (Some(from), Some(to)) = (from, to) else {
        return Response::error(
            id,
            error_codes::INVALID_PARAMS,
            "Both ends need a position: give from/to or endpoints that resolve".to_string(),
        );
    };

    let request = AutoTraceRequest {
        layer: params.layer.unwrap_or_else(|| state.session.active_side()),
        start: params.start,
        end: params.end,
        from,
        to,
    };
    let search_radius = state.config().path_search_radius();
    let epsilon = state.config().simplify_epsilon_px;
    state.jobs.spawn_auto_trace(
        state.store.generation(),
        pathfinder,
        request,
        search_radius,
        epsilon,
    );

    Response::success(id, serde_json::json!({ "status": "started" }))
}
