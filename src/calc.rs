use crate::grades::{normalize_percentage, GradeResult, GradeScale};
use crate::lifecycle::{self, LifecycleStatus, Phase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub struct CalcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CalcError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CalcError {}

/// One-decimal rounding used for every displayed average:
/// `floor(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradingStatus {
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "partial")]
    Partial,
    #[serde(alias = "completed")]
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub grading_status: Option<GradingStatus>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Attempt {
    /// A completed attempt whose grading status was never filled in is still
    /// waiting on a marker, so it counts as pending.
    fn is_pending(&self) -> bool {
        self.is_completed && self.grading_status != Some(GradingStatus::Completed)
    }

    fn is_graded(&self) -> bool {
        self.is_completed && self.grading_status == Some(GradingStatus::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamInstance {
    pub id: String,
    #[serde(default)]
    pub subject_id: String,
    #[serde(default)]
    pub class_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_marks: u32,
    #[serde(default)]
    pub attempts: Vec<Attempt>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamStats {
    pub total_submissions: usize,
    pub pending_grading: usize,
    pub graded: usize,
}

pub fn exam_stats(exam: &ExamInstance) -> ExamStats {
    let mut stats = ExamStats::default();
    for a in exam.attempts.iter().filter(|a| a.is_completed) {
        stats.total_submissions += 1;
        if a.is_pending() {
            stats.pending_grading += 1;
        } else if a.is_graded() {
            stats.graded += 1;
        }
    }
    stats
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BadgeKind {
    AllGraded,
    Pending,
    NoSubmissions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBadge {
    pub kind: BadgeKind,
    pub label: String,
}

pub fn exam_status_badge(stats: &ExamStats) -> StatusBadge {
    if stats.pending_grading == 0 && stats.graded > 0 {
        StatusBadge {
            kind: BadgeKind::AllGraded,
            label: "All Graded".to_string(),
        }
    } else if stats.pending_grading > 0 {
        StatusBadge {
            kind: BadgeKind::Pending,
            label: format!("{} Pending", stats.pending_grading),
        }
    } else {
        StatusBadge {
            kind: BadgeKind::NoSubmissions,
            label: "No Submissions".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingTotals {
    pub total_exams: usize,
    pub total_submissions: usize,
    pub pending_grading: usize,
    pub graded: usize,
    pub grading_progress_pct: u32,
}

pub fn aggregate<'a, I>(exams: I) -> GradingTotals
where
    I: IntoIterator<Item = &'a ExamInstance>,
{
    let mut totals = GradingTotals::default();
    for exam in exams {
        let s = exam_stats(exam);
        totals.total_exams += 1;
        totals.total_submissions += s.total_submissions;
        totals.pending_grading += s.pending_grading;
        totals.graded += s.graded;
    }
    let denom = totals.total_submissions.max(1) as f64;
    totals.grading_progress_pct = ((totals.graded as f64 / denom) * 100.0).round() as u32;
    totals
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayScore {
    pub score_text: String,
    pub percentage: f64,
}

/// The stored percentage wins only when it carries information (present,
/// finite, non-zero). Otherwise it is derived from the raw score.
pub fn display_score(attempt: &Attempt, total_marks: u32) -> DisplayScore {
    let percentage = match attempt.percentage {
        Some(p) if p.is_finite() && p != 0.0 => p,
        _ if total_marks > 0 => 100.0 * attempt.score / f64::from(total_marks),
        _ => 0.0,
    };
    let score_text = if total_marks > 0 {
        format!("{}/{}", attempt.score, total_marks)
    } else {
        format!("{}", attempt.score)
    };
    DisplayScore {
        score_text,
        percentage,
    }
}

/// Percentage fed into ranking and summaries. Out-of-range stored values are
/// clamped to 0..=100 here; `validate_exam` still reports them.
fn analytics_percentage(attempt: &Attempt, total_marks: u32) -> f64 {
    normalize_percentage(Some(display_score(attempt, total_marks).percentage))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformerRow {
    pub rank: usize,
    pub student_id: String,
    pub average_percent: f64,
    pub graded_attempts: usize,
    pub grade: GradeResult,
}

/// Rank students by their mean percentage over completed, fully graded
/// attempts. Students with nothing graded are left out rather than ranked at
/// zero. Ties go to the lower student id.
pub fn top_performers(exams: &[ExamInstance], limit: usize, scale: &GradeScale) -> Vec<PerformerRow> {
    let mut per_student: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for exam in exams {
        for a in exam.attempts.iter().filter(|a| a.is_graded()) {
            let pct = analytics_percentage(a, exam.total_marks);
            let entry = per_student.entry(a.student_id.as_str()).or_insert((0.0, 0));
            entry.0 += pct;
            entry.1 += 1;
        }
    }

    let mut ranked: Vec<(&str, f64, usize)> = per_student
        .into_iter()
        .map(|(id, (sum, count))| (id, sum / count as f64, count))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(idx, (id, avg, count))| PerformerRow {
            rank: idx + 1,
            student_id: id.to_string(),
            average_percent: round_off_1_decimal(avg),
            graded_attempts: count,
            grade: scale.grade_for(Some(avg)),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeCount {
    pub letter: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSummary {
    pub exam_id: String,
    pub graded_count: usize,
    pub average_percent: f64,
    pub highest_percent: f64,
    pub lowest_percent: f64,
    pub pass_count: usize,
    pub fail_count: usize,
    pub pass_rate_pct: u32,
    pub grade_distribution: Vec<GradeCount>,
}

pub fn results_summary(exam: &ExamInstance, scale: &GradeScale) -> ResultsSummary {
    let percents: Vec<f64> = exam
        .attempts
        .iter()
        .filter(|a| a.is_graded())
        .map(|a| analytics_percentage(a, exam.total_marks))
        .collect();

    let mut grade_distribution: Vec<GradeCount> = scale
        .bands()
        .iter()
        .map(|b| GradeCount {
            letter: b.letter.clone(),
            count: 0,
        })
        .collect();
    let mut pass_count = 0_usize;
    for &pct in &percents {
        if scale.grade_for(Some(pct)).passing {
            pass_count += 1;
        }
        let letter = scale.score_to_grade(Some(pct));
        if let Some(slot) = grade_distribution.iter_mut().find(|g| g.letter == letter) {
            slot.count += 1;
        }
    }

    let graded_count = percents.len();
    let (average_percent, highest_percent, lowest_percent) = if graded_count > 0 {
        let sum: f64 = percents.iter().sum();
        let hi = percents.iter().copied().fold(f64::MIN, f64::max);
        let lo = percents.iter().copied().fold(f64::MAX, f64::min);
        (
            round_off_1_decimal(sum / graded_count as f64),
            round_off_1_decimal(hi),
            round_off_1_decimal(lo),
        )
    } else {
        (0.0, 0.0, 0.0)
    };
    let pass_rate_pct = ((pass_count as f64 / graded_count.max(1) as f64) * 100.0).round() as u32;

    ResultsSummary {
        exam_id: exam.id.clone(),
        graded_count,
        average_percent,
        highest_percent,
        lowest_percent,
        pass_count,
        fail_count: graded_count - pass_count,
        pass_rate_pct,
        grade_distribution,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewRow {
    pub exam_id: String,
    pub subject_id: String,
    pub class_id: String,
    #[serde(flatten)]
    pub lifecycle: LifecycleStatus,
    pub stats: ExamStats,
    pub badge: StatusBadge,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamOverview {
    pub rows: Vec<OverviewRow>,
    pub totals: GradingTotals,
}

/// Dashboard view: lifecycle plus grading state per exam, in input order.
/// `phase` narrows the rows; totals always describe the rows returned.
pub fn exam_overview(now: DateTime<Utc>, exams: &[ExamInstance], phase: Option<Phase>) -> ExamOverview {
    let mut selected: Vec<&ExamInstance> = Vec::new();
    let mut rows: Vec<OverviewRow> = Vec::new();
    for exam in exams {
        let status = lifecycle::classify(now, exam.start_time, exam.end_time);
        if phase.map(|p| p != status.phase).unwrap_or(false) {
            continue;
        }
        let stats = exam_stats(exam);
        rows.push(OverviewRow {
            exam_id: exam.id.clone(),
            subject_id: exam.subject_id.clone(),
            class_id: exam.class_id.clone(),
            lifecycle: status,
            stats,
            badge: exam_status_badge(&stats),
        });
        selected.push(exam);
    }
    ExamOverview {
        rows,
        totals: aggregate(selected),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataIssue {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<String>,
    pub message: String,
}

impl DataIssue {
    fn exam(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            attempt_id: None,
            message: message.into(),
        }
    }

    fn attempt(code: &str, attempt: &Attempt, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            attempt_id: Some(attempt.id.clone()),
            message: message.into(),
        }
    }
}

/// Report record-level problems without rejecting the exam. Every
/// computation above still produces a displayable result for these inputs.
pub fn validate_exam(exam: &ExamInstance) -> Vec<DataIssue> {
    let mut issues = Vec::new();
    if let Err(e) = lifecycle::validate_window(exam.start_time, exam.end_time) {
        issues.push(DataIssue::exam(&e.code, e.message));
    }
    if exam.total_marks == 0 {
        issues.push(DataIssue::exam("invalid_data", "totalMarks must be positive"));
    }

    for a in &exam.attempts {
        if a.is_completed && a.grading_status.is_none() {
            issues.push(DataIssue::attempt(
                "missing_grading_status",
                a,
                "completed attempt has no gradingStatus; counted as pending",
            ));
        }
        if !a.is_completed && a.submitted_at.is_some() {
            issues.push(DataIssue::attempt(
                "invalid_data",
                a,
                "submittedAt set on an incomplete attempt",
            ));
        }
        if a.score < 0.0 || a.score.is_nan() {
            issues.push(DataIssue::attempt("invalid_data", a, "score must be >= 0"));
        }
        if exam.total_marks == 0 && a.score > 0.0 {
            issues.push(DataIssue::attempt(
                "invalid_data",
                a,
                "nonzero score on an exam with no marks; shown as 0%",
            ));
        }
        if let Some(p) = a.percentage {
            if !(0.0..=100.0).contains(&p) {
                issues.push(DataIssue::attempt(
                    "invalid_data",
                    a,
                    "percentage must be within 0..100",
                ));
            }
        }
    }
    issues
}
