use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

pub fn to_json<T: Serialize>(value: &T, field: &str) -> Result<String> {
    serde_json::to_string(value).with_context(|| format!("failed to serialize {field}"))
}

/// `None` for a NULL column.
pub fn from_json<T: DeserializeOwned>(value: Option<String>, field: &str) -> Result<Option<T>> {
    match value {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .with_context(|| format!("failed to parse {field}")),
        None => Ok(None),
    }
}
