//! Artifact value object: one classified indicator with provenance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classify::{classify, DataType};

/// A single indicator discovered from a source.
///
/// Two artifacts are duplicates iff their `data` strings are equal; no
/// normalization is applied. An artifact lives for one pipeline pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// The raw indicator value.
    pub data: String,
    /// Derived type tag. `None` when the value fits no category.
    pub data_type: Option<DataType>,
    /// Name of the analyzer that produced this artifact.
    pub source: String,
    /// Opaque provenance metadata, augmented by enrichers.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Artifact {
    /// Build an artifact, deriving its type tag from the data.
    pub fn new(data: impl Into<String>, source: impl Into<String>) -> Self {
        let data = data.into();
        let data_type = classify(&data);
        Self {
            data,
            data_type,
            source: source.into(),
            metadata: Map::new(),
        }
    }

    /// Build an artifact carrying source-provided metadata.
    pub fn with_metadata(
        data: impl Into<String>,
        source: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> Self {
        let mut artifact = Self::new(data, source);
        artifact.metadata = metadata;
        artifact
    }

    /// Structural validity: the data string must be non-empty.
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_type_on_construction() {
        let artifact = Artifact::new("example.com", "feed");
        assert_eq!(artifact.data_type, Some(DataType::Domain));
        assert_eq!(artifact.source, "feed");
    }

    #[test]
    fn unclassifiable_data_has_no_type() {
        let artifact = Artifact::new("###notanything", "feed");
        assert_eq!(artifact.data_type, None);
        assert!(artifact.is_valid());
    }

    #[test]
    fn empty_data_is_invalid() {
        assert!(!Artifact::new("", "feed").is_valid());
    }

    #[test]
    fn metadata_survives_construction() {
        let mut meta = Map::new();
        meta.insert("country".to_string(), Value::String("NL".to_string()));
        let artifact = Artifact::with_metadata("1.1.1.1", "feed", meta);
        assert_eq!(artifact.metadata["country"], "NL");
    }
}
