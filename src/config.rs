use crate::grades::{GradeBand, GradeScale};
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const LOG_ENV: &str = "EXAMD_LOG";
pub const CONFIG_ENV: &str = "EXAMD_CONFIG";

const DEFAULT_LOG_FILTER: &str = "warn";
const DEFAULT_TOP_PERFORMERS_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_filter: String,
    pub grade_scale: GradeScale,
    pub top_performers_limit: usize,
    pub strict_time_windows: bool,
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            grade_scale: GradeScale::default(),
            top_performers_limit: DEFAULT_TOP_PERFORMERS_LIMIT,
            strict_time_windows: false,
            source: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ConfigFile {
    grade_scale: Option<Vec<GradeBand>>,
    top_performers_limit: Option<usize>,
    strict_time_windows: Option<bool>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let log_filter = std::env::var(LOG_ENV).ok().filter(|v| !v.trim().is_empty());
        Self::load(path.as_deref(), log_filter)
    }

    pub fn load(path: Option<&Path>, log_filter: Option<String>) -> anyhow::Result<Self> {
        let mut cfg = Config::default();
        if let Some(filter) = log_filter {
            cfg.log_filter = filter;
        }
        let Some(path) = path else {
            return Ok(cfg);
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let file: ConfigFile = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        if let Some(bands) = file.grade_scale {
            cfg.grade_scale = GradeScale::new(bands)
                .with_context(|| format!("invalid gradeScale in {}", path.display()))?;
        }
        if let Some(limit) = file.top_performers_limit {
            if limit == 0 {
                anyhow::bail!("topPerformersLimit must be at least 1");
            }
            cfg.top_performers_limit = limit;
        }
        if let Some(strict) = file.strict_time_windows {
            cfg.strict_time_windows = strict;
        }
        cfg.source = Some(path.to_path_buf());
        Ok(cfg)
    }
}
