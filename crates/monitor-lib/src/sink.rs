//! Persistent sinks
//!
//! The core hands insights, trends and alerts to a sink so they survive a
//! restart. The core keeps working in memory when the sink is a no-op or
//! fails.

use crate::error::SinkError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Records JSON values under a key
#[async_trait]
pub trait PersistentSink: Send + Sync {
    async fn persist(&self, key: &str, value: Value) -> Result<(), SinkError>;
}

/// Serialize `value` and hand it to `sink`
pub async fn persist_json<T: serde::Serialize + ?Sized>(
    sink: &dyn PersistentSink,
    key: &str,
    value: &T,
) -> Result<(), SinkError> {
    let value = serde_json::to_value(value).map_err(|source| SinkError::Serialize {
        key: key.to_string(),
        source,
    })?;
    sink.persist(key, value).await
}

/// Sink that discards everything
#[derive(Debug, Default, Clone)]
pub struct NoopSink;

#[async_trait]
impl PersistentSink for NoopSink {
    async fn persist(&self, _key: &str, _value: Value) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes each key to `<dir>/<key>.json`
///
/// Files are replaced atomically: the value is written to a temporary file in
/// the same directory and renamed over the target.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, SinkError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

fn validate_key(key: &str) -> Result<(), SinkError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(SinkError::InvalidKey(key.to_string()))
    }
}

#[async_trait]
impl PersistentSink for JsonFileSink {
    async fn persist(&self, key: &str, value: Value) -> Result<(), SinkError> {
        let target = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        let io_err = |source| SinkError::Io {
            key: key.to_string(),
            source,
        };

        let bytes = serde_json::to_vec_pretty(&value).map_err(|source| SinkError::Serialize {
            key: key.to_string(),
            source,
        })?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        tokio::fs::write(&tmp, &bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &target).await.map_err(io_err)?;

        debug!(key = %key, path = %target.display(), bytes = bytes.len(), "Persisted value");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_noop_sink() {
        NoopSink.persist("insights", json!([])).await.unwrap();
    }

    #[tokio::test]
    async fn test_json_file_sink_writes_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());

        sink.persist("insights", json!([{"title": "first"}])).await.unwrap();
        sink.persist("insights", json!([{"title": "second"}])).await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("insights.json")).unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value, json!([{"title": "second"}]));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_json_file_sink_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("state").join("monitor");
        let sink = JsonFileSink::new(&nested);

        sink.persist("trends", json!([])).await.unwrap();
        assert!(nested.join("trends.json").exists());
    }

    #[tokio::test]
    async fn test_json_file_sink_rejects_bad_keys() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());

        for key in ["", "../escape", "a/b", "with space"] {
            let err = sink.persist(key, json!(null)).await.unwrap_err();
            assert!(matches!(err, SinkError::InvalidKey(_)), "key {:?}", key);
        }
    }

    #[tokio::test]
    async fn test_persist_json_helper() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());

        persist_json(&sink, "alerts", &vec!["a", "b"]).await.unwrap();
        let content = std::fs::read_to_string(dir.path().join("alerts.json")).unwrap();
        assert!(content.contains("\"a\""));
    }
}
