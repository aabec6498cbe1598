use crate::catalog::{self, Eligibility, Level, SchoolClass};
use crate::ipc::error::ok;
use crate::ipc::helpers::{optional_param, required_param, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn parse_state(req: &Request) -> Result<Eligibility, serde_json::Value> {
    required_param(req, "state")
}

fn parse_classes(req: &Request) -> Result<Vec<SchoolClass>, serde_json::Value> {
    required_param(req, "classes")
}

fn handle_level_change(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let level: Level = match required_param(req, "level") {
        Ok(v) => v,
        Err(e) => return e,
    };
    // A subject being created has no prior state or selection yet.
    let (prev, classes) = match optional_param::<Eligibility>(req, "state") {
        Ok(Some(prev)) => match parse_classes(req) {
            Ok(classes) => (prev, classes),
            Err(e) => return e,
        },
        Ok(None) => (Eligibility::for_level(level), Vec::new()),
        Err(e) => return e,
    };
    let next = catalog::on_level_change(&prev, level, &classes);
    if next.classes.len() != prev.classes.len() {
        tracing::debug!(
            before = prev.classes.len(),
            kept = next.classes.len(),
            "level change dropped selected classes"
        );
    }
    ok(&req.id, json!(next))
}

fn handle_class_toggle(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let prev = match parse_state(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let selected: Vec<String> = match required_param(req, "selectedClassIds") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let classes = match parse_classes(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let next = catalog::on_class_toggle(&selected, &classes, &prev);
    if next.classes.len() != selected.len() {
        tracing::debug!(
            requested = selected.len(),
            kept = next.classes.len(),
            "dropped unknown or duplicate class ids"
        );
    }
    ok(&req.id, json!(next))
}

fn handle_toggle_class(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let prev = match parse_state(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let classes = match parse_classes(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, json!(catalog::toggle_class(&prev, &class_id, &classes)))
}

fn handle_reconcile(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let stored = match parse_state(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let classes = match parse_classes(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let consistency = catalog::check_consistency(&stored, &classes);
    if let Err(e) = &consistency {
        tracing::warn!(code = %e.code, "{}", e.message);
    }
    ok(
        &req.id,
        json!({
            "state": catalog::reconcile(&stored, &classes),
            "wasConsistent": consistency.is_ok(),
            "problem": consistency.err(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.levelChange" => Some(handle_level_change(state, req)),
        "subjects.classToggle" => Some(handle_class_toggle(state, req)),
        "subjects.toggleClass" => Some(handle_toggle_class(state, req)),
        "subjects.reconcile" => Some(handle_reconcile(state, req)),
        _ => None,
    }
}
