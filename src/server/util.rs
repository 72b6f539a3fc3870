//! Helpers shared by the request handlers

use crate::error::NetlistError;
use crate::server::protocol::{error_codes, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Deserializes request params, or builds the INVALID_PARAMS response
pub fn parse_params<T: DeserializeOwned>(
    id: &Option<serde_json::Value>,
    params: Option<serde_json::Value>,
    expected: &str,
) -> Result<T, Response> {
    params
        .and_then(|p| serde_json::from_value(p).ok())
        .ok_or_else(|| {
            Response::error(
                id.clone(),
                error_codes::INVALID_PARAMS,
                format!("Invalid params: expected {}", expected),
            )
        })
}

pub fn to_response<T: Serialize>(id: Option<serde_json::Value>, value: &T) -> Response {
    match serde_json::to_value(value) {
        Ok(v) => Response::success(id, v),
        Err(e) => Response::error(id, error_codes::INTERNAL_ERROR, format!("Serialization failed: {}", e)),
    }
}

pub fn netlist_error(id: Option<serde_json::Value>, err: NetlistError) -> Response {
    let code = match err {
        NetlistError::DuplicateId(_) => error_codes::DUPLICATE_ID,
        NetlistError::ViaNotFound(_)
        | NetlistError::ConfirmedViaNotFound(_)
        | NetlistError::ConnectorNotFound(_)
        | NetlistError::TraceNotFound(_)
        | NetlistError::NetNotFound(_) => error_codes::NOT_FOUND,
        NetlistError::DegenerateTrace { .. }
        | NetlistError::PointIndexOutOfRange { .. }
        | NetlistError::SegmentIndexOutOfRange { .. } => error_codes::INVALID_EDIT,
    };
    Response::error(id, code, err.to_string())
}
