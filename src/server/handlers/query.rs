//! Read-only queries: GetFeatures, GetNets, HitTest, GuessPin

use crate::geometry::Point;
use crate::hit_test::HitTester;
use crate::netlist::guess_pin;
use crate::server::protocol::{error_codes, Response};
use crate::server::state::ServerState;
use crate::server::util::{parse_params, to_response};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct PointParams {
    x: f64,
    y: f64,
}

pub(crate) fn point_params(
    id: &Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Result<Point, Response> {
    parse_params::<PointParams>(id, params, "{x: number, y: number}").map(|p| Point::new(p.x, p.y))
}

/// Handle GetFeatures request - returns the whole feature set in document form
pub fn handle_get_features(state: &ServerState, id: Option<serde_json::Value>) -> Response {
    #[derive(Serialize)]
    struct Features {
        generation: u64,
        #[serde(flatten)]
        document: crate::document::ProjectDocument,
    }

    to_response(
        id,
        &Features {
            generation: state.store.generation(),
            document: state.store.to_document(),
        },
    )
}

/// Handle GetNets request - nets with their typed member lists and display labels
pub fn handle_get_nets(state: &ServerState, id: Option<serde_json::Value>) -> Response {
    #[derive(Serialize)]
    struct NetSummary<'a> {
        id: &'a str,
        name: &'a str,
        via_ids: Vec<&'a str>,
        connector_ids: Vec<&'a str>,
        trace_ids: Vec<&'a str>,
        pad_ids: Vec<&'a str>,
        pin_labels: Vec<String>,
    }

    let nets: Vec<NetSummary> = state
        .store
        .nets()
        .map(|net| NetSummary {
            id: &net.id,
            name: &net.name,
            via_ids: net.via_ids(),
            connector_ids: net.connector_ids(),
            trace_ids: net.trace_ids(),
            pad_ids: net.pad_ids(),
            pin_labels: net
                .via_ids()
                .into_iter()
                .filter_map(|v| state.store.confirmed_via(v).and_then(|v| v.pin_label()))
                .collect(),
        })
        .collect();
    to_response(id, &nets)
}

/// Handle HitTest request - reports what a click at (x, y) would land on
pub fn handle_hit_test(
    state: &ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    let p = match point_params(&id, params) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let hit = HitTester::new(&state.store, state.config().dpi, state.session.active_side()).hit_test(p.x, p.y);
    to_response(id, &hit)
}

/// Handle GuessPin request - proposes a pin number for a via of a component
pub fn handle_guess_pin(
    state: &ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize)]
    struct GuessPinParams {
        via_id: String,
        component_id: String,
    }

    let params: GuessPinParams = match parse_params(&id, params, "{via_id: string, component_id: string}") {
        Ok(p) => p,
        Err(response) => return response,
    };
    let Some(via) = state.store.confirmed_via(&params.via_id) else {
        return Response::error(
            id,
            error_codes::NOT_FOUND,
            format!("confirmed via not found: {}", params.via_id),
        );
    };
    let pin = guess_pin(&state.store, via, &params.component_id, state.config().dpi);
    Response::success(id, serde_json::json!({ "pin_number": pin }))
}

