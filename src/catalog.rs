use crate::calc::CalcError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClassName {
    #[serde(rename = "JSS1")]
    Jss1,
    #[serde(rename = "JSS2")]
    Jss2,
    #[serde(rename = "JSS3")]
    Jss3,
    #[serde(rename = "SS1")]
    Ss1,
    #[serde(rename = "SS2")]
    Ss2,
    #[serde(rename = "SS3")]
    Ss3,
}

impl ClassName {
    pub const JUNIOR: [ClassName; 3] = [ClassName::Jss1, ClassName::Jss2, ClassName::Jss3];
    pub const SENIOR: [ClassName; 3] = [ClassName::Ss1, ClassName::Ss2, ClassName::Ss3];

    pub fn tier(self) -> Tier {
        match self {
            ClassName::Jss1 | ClassName::Jss2 | ClassName::Jss3 => Tier::Junior,
            ClassName::Ss1 | ClassName::Ss2 | ClassName::Ss3 => Tier::Senior,
        }
    }
}

/// The tier a single class belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Junior,
    Senior,
}

/// The level a subject is offered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Junior,
    Senior,
    Both,
}

impl Level {
    fn from_tiers(junior: bool, senior: bool) -> Option<Level> {
        match (junior, senior) {
            (true, true) => Some(Level::Both),
            (true, false) => Some(Level::Junior),
            (false, true) => Some(Level::Senior),
            (false, false) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Department {
    All,
    Science,
    Commercial,
    Arts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClass {
    pub id: String,
    pub name: ClassName,
}

impl SchoolClass {
    pub fn tier(&self) -> Tier {
        self.name.tier()
    }
}

/// The eligibility fields of a subject. `level`, `applicable_levels` and
/// `departments` must agree with each other; `classes` holds class ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub level: Level,
    #[serde(default)]
    pub departments: BTreeSet<Department>,
    #[serde(default)]
    pub applicable_levels: BTreeSet<ClassName>,
    #[serde(default)]
    pub classes: Vec<String>,
}

impl Eligibility {
    pub fn for_level(level: Level) -> Self {
        let (applicable_levels, departments) = derive_fields(level, &BTreeSet::new());
        Self {
            level,
            departments,
            applicable_levels,
            classes: Vec::new(),
        }
    }
}

fn all_departments() -> BTreeSet<Department> {
    BTreeSet::from([Department::All])
}

/// The single rule table shared by the level-driven and class-driven paths.
fn derive_fields(
    level: Level,
    prev_departments: &BTreeSet<Department>,
) -> (BTreeSet<ClassName>, BTreeSet<Department>) {
    match level {
        Level::Junior => (ClassName::JUNIOR.into_iter().collect(), all_departments()),
        Level::Senior => {
            let departments = if prev_departments.is_empty() {
                all_departments()
            } else {
                prev_departments.clone()
            };
            (ClassName::SENIOR.into_iter().collect(), departments)
        }
        Level::Both => (
            ClassName::JUNIOR
                .into_iter()
                .chain(ClassName::SENIOR)
                .collect(),
            all_departments(),
        ),
    }
}

fn level_allows(level: Level, tier: Tier) -> bool {
    match level {
        Level::Junior => tier == Tier::Junior,
        Level::Senior => tier == Tier::Senior,
        Level::Both => true,
    }
}

/// Apply an explicit level choice. Selected classes the new level rules out
/// are dropped along with unknown and duplicate ids. A Both subject keeps its
/// selection only while it still spans both tiers; otherwise the selection
/// is cleared so the chosen level stands.
pub fn on_level_change(prev: &Eligibility, new_level: Level, all_classes: &[SchoolClass]) -> Eligibility {
    let by_id: HashMap<&str, &SchoolClass> =
        all_classes.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut classes: Vec<String> = Vec::new();
    let mut has_junior = false;
    let mut has_senior = false;
    for id in &prev.classes {
        let Some(class) = by_id.get(id.as_str()) else {
            continue;
        };
        if !level_allows(new_level, class.tier()) || !seen.insert(id.as_str()) {
            continue;
        }
        match class.tier() {
            Tier::Junior => has_junior = true,
            Tier::Senior => has_senior = true,
        }
        classes.push(id.clone());
    }
    if Level::from_tiers(has_junior, has_senior).is_some_and(|l| l != new_level) {
        classes.clear();
    }

    let (applicable_levels, departments) = derive_fields(new_level, &prev.departments);
    Eligibility {
        level: new_level,
        departments,
        applicable_levels,
        classes,
    }
}

/// Re-derive the subject from an explicit class selection. Unknown ids are
/// dropped, duplicates collapse to their first occurrence. An empty
/// selection falls back to the previous level.
pub fn on_class_toggle(
    selected_class_ids: &[String],
    all_classes: &[SchoolClass],
    prev: &Eligibility,
) -> Eligibility {
    let by_id: HashMap<&str, &SchoolClass> =
        all_classes.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut classes: Vec<String> = Vec::new();
    let mut has_junior = false;
    let mut has_senior = false;
    for id in selected_class_ids {
        let Some(class) = by_id.get(id.as_str()) else {
            continue;
        };
        if !seen.insert(id.as_str()) {
            continue;
        }
        match class.tier() {
            Tier::Junior => has_junior = true,
            Tier::Senior => has_senior = true,
        }
        classes.push(id.clone());
    }

    let level = Level::from_tiers(has_junior, has_senior).unwrap_or(prev.level);
    let (applicable_levels, departments) = derive_fields(level, &prev.departments);
    Eligibility {
        level,
        departments,
        applicable_levels,
        classes,
    }
}

/// Flip one class in or out of the current selection.
pub fn toggle_class(prev: &Eligibility, class_id: &str, all_classes: &[SchoolClass]) -> Eligibility {
    let mut selected = prev.classes.clone();
    if let Some(pos) = selected.iter().position(|c| c == class_id) {
        selected.remove(pos);
    } else {
        selected.push(class_id.to_string());
    }
    on_class_toggle(&selected, all_classes, prev)
}

/// Rebuild consistent eligibility from stored state. Class membership is
/// authoritative when any known class is selected; otherwise the level is.
pub fn reconcile(state: &Eligibility, all_classes: &[SchoolClass]) -> Eligibility {
    on_class_toggle(&state.classes, all_classes, state)
}

pub fn check_consistency(state: &Eligibility, all_classes: &[SchoolClass]) -> Result<(), CalcError> {
    let expected = reconcile(state, all_classes);
    let mut mismatched: Vec<&str> = Vec::new();
    if expected.level != state.level {
        mismatched.push("level");
    }
    if expected.applicable_levels != state.applicable_levels {
        mismatched.push("applicableLevels");
    }
    if expected.departments != state.departments {
        mismatched.push("departments");
    }
    if expected.classes != state.classes {
        mismatched.push("classes");
    }
    if mismatched.is_empty() {
        return Ok(());
    }
    Err(CalcError::new(
        "inconsistent_catalog_state",
        format!("subject fields disagree: {}", mismatched.join(", ")),
    )
    .with_details(json!({
        "fields": mismatched,
        "expected": expected,
    })))
}
