use crate::grades::{GradeBand, GradeScale};
use crate::ipc::error::{calc_err, ok};
use crate::ipc::helpers::required_param;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_health(_state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "gradeScale": state.grade_scale,
            "topPerformersLimit": state.config.top_performers_limit,
            "strictTimeWindows": state.config.strict_time_windows,
            "configPath": state
                .config
                .source
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
        }),
    )
}

fn handle_scale_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let bands: Vec<GradeBand> = match required_param(req, "gradeScale") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match GradeScale::new(bands) {
        Ok(scale) => {
            tracing::info!(bands = scale.bands().len(), "grade scale replaced");
            state.grade_scale = scale;
            ok(&req.id, json!({ "gradeScale": state.grade_scale }))
        }
        Err(e) => {
            tracing::warn!(code = %e.code, message = %e.message, "rejected grade scale update");
            calc_err(&req.id, e)
        }
    }
}

fn handle_scale_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.grade_scale = state.config.grade_scale.clone();
    tracing::info!("grade scale reset to configured default");
    ok(&req.id, json!({ "gradeScale": state.grade_scale }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "config.get" => Some(handle_config_get(state, req)),
        "grading.scale.update" => Some(handle_scale_update(state, req)),
        "grading.scale.reset" => Some(handle_scale_reset(state, req)),
        _ => None,
    }
}
