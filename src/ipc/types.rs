use crate::config::Config;
use crate::grades::GradeScale;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    /// Active scale; starts from config and can be replaced at runtime.
    pub grade_scale: GradeScale,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let grade_scale = config.grade_scale.clone();
        Self {
            config,
            grade_scale,
        }
    }
}
