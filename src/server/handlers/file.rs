//! Document operations: Load, Save, Clear

use crate::document::{load_document, save_document};
use crate::server::protocol::{error_codes, Response};
use crate::server::state::ServerState;
use crate::server::util::parse_params;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Instant;

/// Handle Load request - replaces the store with a saved project
pub fn handle_load(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize)]
    struct LoadParams {
        file_path: String,
    }

    let params: LoadParams = match parse_params(&id, params, "{file_path: string}") {
        Ok(p) => p,
        Err(response) => return response,
    };

    let start = Instant::now();
    let doc = match load_document(&params.file_path) {
        Ok(doc) => doc,
        Err(e) => return Response::error(id, error_codes::LOAD_FAILED, format!("{:#}", e)),
    };

    state.session.cancel();
    state.store.replace_with(doc);
    state.document_path = Some(PathBuf::from(&params.file_path));
    tracing::info!(
        "[Server] Loaded {} in {:.2?} (generation {})",
        params.file_path,
        start.elapsed(),
        state.store.generation()
    );

    Response::success(
        id,
        serde_json::json!({
            "status": "ok",
            "vias": state.store.vias().count(),
            "confirmed_vias": state.store.confirmed_via_count(),
            "connectors": state.store.connectors().count(),
            "traces": state.store.trace_count(),
            "nets": state.store.net_count(),
        }),
    )
}

/// Handle Save request - writes the project to `file_path` or the path it was loaded from
pub fn handle_save(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize, Default)]
    struct SaveParams {
        #[serde(default)]
        file_path: Option<String>,
    }

    let params: SaveParams = params
        .and_then(|p| serde_json::from_value(p).ok())
        .unwrap_or_default();

    let path = match params.file_path.map(PathBuf::from).or_else(|| state.document_path.clone()) {
        Some(path) => path,
        None => {
            return Response::error(
                id,
                error_codes::NO_DOCUMENT_PATH,
                "No file path given and no document loaded".to_string(),
            )
        }
    };

    if let Err(e) = save_document(&path, &state.store.to_document()) {
        return Response::error(id, error_codes::SAVE_FAILED, format!("{:#}", e));
    }
    let file_path = path.display().to_string();
    state.document_path = Some(path);
    Response::success(id, serde_json::json!({ "status": "ok", "file_path": file_path }))
}

/// Handle Clear request - empties the store and abandons any gesture
pub fn handle_clear(state: &mut ServerState, id: Option<serde_json::Value>) -> Response {
    state.session.cancel();
    state.store.clear();
    state.document_path = None;
    Response::success(
        id,
        serde_json::json!({ "status": "ok", "generation": state.store.generation() }),
    )
}
