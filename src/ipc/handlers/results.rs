use crate::calc::{self, Attempt, ExamInstance};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_param, required_instant, required_param};
use crate::ipc::types::{AppState, Request};
use crate::lifecycle::{self, Phase};
use serde_json::json;

fn log_issues(exam: &ExamInstance, issues: &[calc::DataIssue]) {
    for issue in issues {
        tracing::warn!(
            exam_id = %exam.id,
            attempt_id = issue.attempt_id.as_deref().unwrap_or("-"),
            code = %issue.code,
            "{}",
            issue.message
        );
    }
}

fn parse_exam(req: &Request) -> Result<ExamInstance, serde_json::Value> {
    required_param(req, "exam")
}

fn parse_exams(req: &Request) -> Result<Vec<ExamInstance>, serde_json::Value> {
    required_param(req, "exams")
}

fn handle_exam_stats(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let exam = match parse_exam(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let issues = calc::validate_exam(&exam);
    log_issues(&exam, &issues);
    let stats = calc::exam_stats(&exam);
    ok(
        &req.id,
        json!({
            "examId": exam.id,
            "stats": stats,
            "badge": calc::exam_status_badge(&stats),
            "issues": issues,
        }),
    )
}

fn handle_exams_aggregate(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let exams = match parse_exams(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, json!(calc::aggregate(&exams)))
}

fn handle_exams_overview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let now = match required_instant(req, "now") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let exams = match parse_exams(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let phase: Option<Phase> = match optional_param(req, "phase") {
        Ok(v) => v,
        Err(e) => return e,
    };

    for exam in &exams {
        if let Err(e) = lifecycle::validate_window(exam.start_time, exam.end_time) {
            if state.config.strict_time_windows {
                return err(&req.id, &e.code, e.message, Some(json!({ "examId": exam.id })));
            }
            tracing::warn!(exam_id = %exam.id, "inverted exam window; shown as ended");
        }
    }

    ok(&req.id, json!(calc::exam_overview(now, &exams, phase)))
}

fn handle_exam_validate(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let exam = match parse_exam(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let issues = calc::validate_exam(&exam);
    ok(
        &req.id,
        json!({
            "examId": exam.id,
            "valid": issues.is_empty(),
            "issues": issues,
        }),
    )
}

fn handle_results_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let exam = match parse_exam(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    log_issues(&exam, &calc::validate_exam(&exam));
    ok(&req.id, json!(calc::results_summary(&exam, &state.grade_scale)))
}

fn handle_top_performers(state: &mut AppState, req: &Request) -> serde_json::Value {
    let exams = match parse_exams(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let limit = match optional_param::<usize>(req, "limit") {
        Ok(Some(0)) => return err(&req.id, "bad_params", "limit must be at least 1", None),
        Ok(v) => v.unwrap_or(state.config.top_performers_limit),
        Err(e) => return e,
    };
    let performers = calc::top_performers(&exams, limit, &state.grade_scale);
    ok(&req.id, json!({ "performers": performers }))
}

fn handle_display_score(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let attempt: Attempt = match required_param(req, "attempt") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let total_marks: u32 = match optional_param(req, "totalMarks") {
        Ok(v) => v.unwrap_or(0),
        Err(e) => return e,
    };
    ok(&req.id, json!(calc::display_score(&attempt, total_marks)))
}

fn handle_grade_lookup(state: &mut AppState, req: &Request) -> serde_json::Value {
    let percentage = match req.params.get("percentage") {
        None => None,
        Some(v) if v.is_null() => None,
        Some(v) => match v.as_f64() {
            Some(n) => Some(n),
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "percentage must be a number or null",
                    None,
                )
            }
        },
    };
    ok(&req.id, json!(state.grade_scale.grade_for(percentage)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exams.stats" => Some(handle_exam_stats(state, req)),
        "exams.aggregate" => Some(handle_exams_aggregate(state, req)),
        "exams.overview" => Some(handle_exams_overview(state, req)),
        "exams.validate" => Some(handle_exam_validate(state, req)),
        "results.summary" => Some(handle_results_summary(state, req)),
        "results.topPerformers" => Some(handle_top_performers(state, req)),
        "results.displayScore" => Some(handle_display_score(state, req)),
        "grades.lookup" => Some(handle_grade_lookup(state, req)),
        _ => None,
    }
}
