use crate::ipc::error::err;
use crate::ipc::types::Request;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

/// Deserialize `params[key]` into a typed record, reporting shape problems as
/// `bad_params`.
pub fn required_param<T: DeserializeOwned>(req: &Request, key: &str) -> Result<T, serde_json::Value> {
    let Some(raw) = req.params.get(key).filter(|v| !v.is_null()) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| err(&req.id, "bad_params", format!("invalid {}: {}", key, e), None))
}

pub fn optional_param<T: DeserializeOwned>(
    req: &Request,
    key: &str,
) -> Result<Option<T>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(_) => required_param(req, key).map(Some),
    }
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Instants travel as RFC 3339 strings and are normalised to UTC.
pub fn required_instant(req: &Request, key: &str) -> Result<DateTime<Utc>, serde_json::Value> {
    let raw = required_str(req, key)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be an RFC 3339 timestamp: {}", key, e),
                None,
            )
        })
}
