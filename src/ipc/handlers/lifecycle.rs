use crate::ipc::error::{calc_err, ok};
use crate::ipc::helpers::required_instant;
use crate::ipc::types::{AppState, Request};
use crate::lifecycle;
use serde_json::json;

fn handle_classify(state: &mut AppState, req: &Request) -> serde_json::Value {
    let now = match required_instant(req, "now") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let start = match required_instant(req, "startTime") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let end = match required_instant(req, "endTime") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let window_valid = lifecycle::validate_window(start, end).is_ok();
    let status = if state.config.strict_time_windows {
        match lifecycle::classify_strict(now, start, end) {
            Ok(v) => v,
            Err(e) => return calc_err(&req.id, e),
        }
    } else {
        if !window_valid {
            tracing::warn!(
                start = %start.to_rfc3339(),
                end = %end.to_rfc3339(),
                "inverted exam window; classified as tolerated"
            );
        }
        lifecycle::classify(now, start, end)
    };

    ok(
        &req.id,
        json!({
            "phase": status.phase,
            "remainingSeconds": status.remaining_seconds,
            "windowValid": window_valid,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "lifecycle.classify" => Some(handle_classify(state, req)),
        _ => None,
    }
}
