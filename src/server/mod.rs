//! JSON-RPC server over the netlist engine
//!
//! Requests arrive one per line on stdin and are answered one per line on
//! stdout. Store events and finished background jobs are pushed to the client
//! as notifications with a null id.
//!
//! # Module Structure
//! - `protocol` - JSON-RPC request/response types
//! - `state` - Server state (store, authoring session, job queue)
//! - `util` - Param parsing and error mapping
//! - `handlers` - Request handlers organized by functionality

pub mod handlers;
pub mod protocol;
pub mod state;
pub mod util;

pub use protocol::{error_codes, ErrorResponse, Notification, Request, Response};
pub use state::ServerState;

use handlers::*;

/// Routes one request to its handler
pub fn dispatch(state: &mut ServerState, request: Request) -> Response {
    let Request { id, method, params } = request;
    match method.as_str() {
        "Load" => handle_load(state, id, params),
        "Save" => handle_save(state, id, params),
        "Clear" => handle_clear(state, id),
        "GetFeatures" => handle_get_features(state, id),
        "GetNets" => handle_get_nets(state, id),
        "SetActiveSide" => handle_set_active_side(state, id, params),
        "SetDpi" => handle_set_dpi(state, id, params),
        "Click" => handle_click(state, id, params),
        "PointerMove" => handle_pointer_move(state, id, params),
        "Cancel" => handle_cancel(state, id),
        "HitTest" => handle_hit_test(state, id, params),
        "GuessPin" => handle_guess_pin(state, id, params),
        "AssignPin" => handle_assign_pin(state, id, params),
        "RenameNet" => handle_rename_net(state, id, params),
        "DeleteConfirmedVia" => handle_delete_confirmed_via(state, id, params),
        "DeleteConnector" => handle_delete_connector(state, id, params),
        "DeleteTrace" => handle_delete_trace(state, id, params),
        "RemoveTraceSegment" => handle_remove_trace_segment(state, id, params),
        "AddConnector" => handle_add_connector(state, id, params),
        "AddVias" => handle_add_vias(state, id, params),
        "MatchVias" => handle_match_vias_async(state, id, params),
        "AutoTrace" => handle_auto_trace_async(state, id, params),
        _ => Response::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        ),
    }
}

/// Parses one input line and dispatches it. Blank lines yield nothing.
pub fn handle_line(state: &mut ServerState, line: &str) -> Option<Response> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<Request>(line) {
        Ok(request) => Some(dispatch(state, request)),
        Err(e) => {
            tracing::warn!("[Server] Failed to parse request: {}", e);
            Some(Response::error(
                None,
                error_codes::PARSE_ERROR,
                format!("Parse error: {}", e),
            ))
        }
    }
}
