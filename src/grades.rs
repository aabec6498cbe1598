use crate::calc::CalcError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;

/// Display/severity tag attached to a grade band. Everything except `Fail`
/// counts as a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GradeTone {
    Excellent,
    Good,
    Credit,
    Pass,
    Fail,
}

impl GradeTone {
    pub fn passing(self) -> bool {
        !matches!(self, GradeTone::Fail)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBand {
    pub min_percent: f64,
    pub letter: String,
    pub tone: GradeTone,
}

impl GradeBand {
    fn new(min_percent: f64, letter: &str, tone: GradeTone) -> Self {
        Self {
            min_percent,
            letter: letter.to_string(),
            tone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    pub letter: String,
    pub tone: GradeTone,
    pub passing: bool,
}

/// Ordered band table, highest band first. Construction guarantees the table
/// is total over [0,100], so lookups never miss.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GradeScale {
    bands: Vec<GradeBand>,
}

impl Default for GradeScale {
    fn default() -> Self {
        Self {
            bands: vec![
                GradeBand::new(80.0, "A", GradeTone::Excellent),
                GradeBand::new(70.0, "B", GradeTone::Good),
                GradeBand::new(60.0, "C", GradeTone::Credit),
                GradeBand::new(50.0, "D", GradeTone::Pass),
                GradeBand::new(0.0, "F", GradeTone::Fail),
            ],
        }
    }
}

impl GradeScale {
    pub fn new(bands: Vec<GradeBand>) -> Result<Self, CalcError> {
        validate_bands(&bands)?;
        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    fn band_for(&self, percentage: Option<f64>) -> &GradeBand {
        let pct = normalize_percentage(percentage);
        // The last band starts at 0, so the fallback is only hit for an
        // empty table, which `new` rejects.
        self.bands
            .iter()
            .find(|b| pct >= b.min_percent)
            .unwrap_or_else(|| &self.bands[self.bands.len() - 1])
    }

    pub fn score_to_grade(&self, percentage: Option<f64>) -> &str {
        &self.band_for(percentage).letter
    }

    pub fn grade_for(&self, percentage: Option<f64>) -> GradeResult {
        let band = self.band_for(percentage);
        GradeResult {
            letter: band.letter.clone(),
            tone: band.tone,
            passing: band.tone.passing(),
        }
    }
}

/// Missing or NaN percentages read as 0; everything else is clamped into
/// [0,100].
pub fn normalize_percentage(percentage: Option<f64>) -> f64 {
    match percentage {
        Some(p) if !p.is_nan() => p.clamp(0.0, 100.0),
        _ => 0.0,
    }
}

fn validate_bands(bands: &[GradeBand]) -> Result<(), CalcError> {
    if bands.is_empty() {
        return Err(CalcError::new(
            "invalid_grade_scale",
            "grade scale must contain at least one band",
        ));
    }

    let mut seen_letters: HashSet<&str> = HashSet::new();
    let mut prev_min: Option<f64> = None;
    for (idx, band) in bands.iter().enumerate() {
        if !band.min_percent.is_finite() || !(0.0..=100.0).contains(&band.min_percent) {
            return Err(CalcError::new(
                "invalid_grade_scale",
                format!("band {} minPercent must be within 0..100", idx),
            )
            .with_details(json!({ "index": idx, "minPercent": band.min_percent })));
        }
        let letter = band.letter.trim();
        if letter.is_empty() {
            return Err(CalcError::new(
                "invalid_grade_scale",
                format!("band {} letter must not be empty", idx),
            ));
        }
        if !seen_letters.insert(letter) {
            return Err(CalcError::new(
                "invalid_grade_scale",
                format!("duplicate grade letter: {}", letter),
            ));
        }
        if let Some(prev) = prev_min {
            if band.min_percent >= prev {
                return Err(CalcError::new(
                    "invalid_grade_scale",
                    "bands must be ordered by strictly descending minPercent",
                )
                .with_details(json!({ "index": idx })));
            }
        }
        prev_min = Some(band.min_percent);
    }

    if prev_min != Some(0.0) {
        return Err(CalcError::new(
            "invalid_grade_scale",
            "lowest band must start at 0",
        ));
    }
    Ok(())
}
