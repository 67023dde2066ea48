//! Typed metric paths
//!
//! Dotted paths (`load_average.one`) are parsed once at configuration time so
//! typos surface as startup errors instead of silently never matching.

use crate::error::PathError;
use crate::models::{MetricFields, MetricValue};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A validated path into nested metric fields
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricPath {
    segments: Vec<String>,
}

impl MetricPath {
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let err = |reason| PathError {
            path: path.to_string(),
            reason,
        };

        if path.is_empty() {
            return Err(err("path is empty"));
        }

        let mut segments = Vec::new();
        for segment in path.split('.') {
            if segment.is_empty() {
                return Err(err("empty path segment"));
            }
            if !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(err("segments may only contain ASCII letters, digits and `_`"));
            }
            segments.push(segment.to_string());
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolve the path to a numeric leaf
    ///
    /// Returns `None` when any segment is missing or the leaf is not a number.
    pub fn resolve(&self, fields: &MetricFields) -> Option<f64> {
        let (last, parents) = self.segments.split_last()?;

        let mut current = fields;
        for segment in parents {
            current = current.get(segment)?.as_nested()?;
        }

        current.get(last).and_then(MetricValue::as_f64)
    }

    /// Whether a set of declared paths contains this one
    pub fn is_declared_in(&self, schema: &[MetricPath]) -> bool {
        schema.iter().any(|p| p == self)
    }
}

impl fmt::Display for MetricPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for MetricPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for MetricPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MetricPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        MetricPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A metric reference that may be pinned to a collector (`system:cpu_utilization`)
/// or left open (`cpu_utilization`), in which case the most recent snapshot of
/// any collector exposing the path wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricRef {
    pub collector: Option<String>,
    pub path: MetricPath,
}

impl MetricRef {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        match raw.split_once(':') {
            Some((collector, path)) => {
                if collector.is_empty() {
                    return Err(PathError {
                        path: raw.to_string(),
                        reason: "collector prefix is empty",
                    });
                }
                Ok(Self {
                    collector: Some(collector.to_string()),
                    path: MetricPath::parse(path)?,
                })
            }
            None => Ok(Self {
                collector: None,
                path: MetricPath::parse(raw)?,
            }),
        }
    }
}

impl fmt::Display for MetricRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.collector {
            Some(collector) => write!(f, "{}:{}", collector, self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> MetricFields {
        serde_json::from_value(serde_json::json!({
            "cpu_utilization": 42.5,
            "load_average": { "one": 1.25, "five": 0.75 },
            "memory": { "detail": { "cached_bytes": 1024.0 } }
        }))
        .unwrap()
    }

    #[test]
    fn test_resolve_top_level_and_nested() {
        let fields = sample_fields();

        assert_eq!(MetricPath::parse("cpu_utilization").unwrap().resolve(&fields), Some(42.5));
        assert_eq!(MetricPath::parse("load_average.one").unwrap().resolve(&fields), Some(1.25));
        assert_eq!(
            MetricPath::parse("memory.detail.cached_bytes").unwrap().resolve(&fields),
            Some(1024.0)
        );
    }

    #[test]
    fn test_missing_or_non_numeric_resolves_to_none() {
        let fields = sample_fields();

        assert_eq!(MetricPath::parse("queue_size").unwrap().resolve(&fields), None);
        assert_eq!(MetricPath::parse("load_average").unwrap().resolve(&fields), None);
        assert_eq!(MetricPath::parse("cpu_utilization.one").unwrap().resolve(&fields), None);
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        assert!(MetricPath::parse("").is_err());
        assert!(MetricPath::parse("load_average.").is_err());
        assert!(MetricPath::parse(".one").is_err());
        assert!(MetricPath::parse("cpu-utilization").is_err());
        assert!(MetricPath::parse("cpu utilization").is_err());
    }

    #[test]
    fn test_display_roundtrips() {
        let path = MetricPath::parse("load_average.fifteen").unwrap();
        assert_eq!(path.to_string(), "load_average.fifteen");
    }

    #[test]
    fn test_metric_ref_parsing() {
        let pinned = MetricRef::parse("system:load_average.one").unwrap();
        assert_eq!(pinned.collector.as_deref(), Some("system"));
        assert_eq!(pinned.path.to_string(), "load_average.one");
        assert_eq!(pinned.to_string(), "system:load_average.one");

        let open = MetricRef::parse("queue_size").unwrap();
        assert!(open.collector.is_none());

        assert!(MetricRef::parse(":queue_size").is_err());
        assert!(MetricRef::parse("system:").is_err());
    }
}
