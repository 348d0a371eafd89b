//! Validated metadata schema boundary
//!
//! The LLM-based extractor hands the pipeline a JSON blob. That blob is
//! parsed and validated exactly once, here, into a closed struct; nothing
//! downstream re-inspects raw JSON fields.

use podium_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Metadata extracted from an uploaded score, validated at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedMetadata {
    /// Work title as printed on the score
    pub title: String,

    /// Composer credit, if the extractor found one
    #[serde(default)]
    pub composer: Option<String>,

    /// Extractor's belief that the document bundles multiple parts
    #[serde(default)]
    pub is_multi_part: bool,

    /// Per-part guesses, in document order
    #[serde(default)]
    pub parts: Vec<PartHint>,
}

/// One instrument-part guess from the extractor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartHint {
    /// Canonical instrument name ("Trumpet", "Clarinet")
    pub instrument_name: String,

    /// Printed part label ("Trumpet 1", "Solo Cornet")
    #[serde(default)]
    pub part_name: Option<String>,

    /// Chair/desk designation, distinct from "no chair"
    #[serde(default)]
    pub chair: Option<String>,
}

impl ExtractedMetadata {
    /// Parse and validate the extractor's JSON output.
    ///
    /// Unknown fields are ignored (the extractor's schema may grow);
    /// structural violations fail fast with `Error::Validation`.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let metadata: ExtractedMetadata = serde_json::from_value(value.clone())
            .map_err(|e| Error::Validation(format!("Malformed extracted metadata: {}", e)))?;
        metadata.validate()?;
        Ok(metadata)
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation(
                "Extracted metadata is missing a title".to_string(),
            ));
        }

        for (i, part) in self.parts.iter().enumerate() {
            if part.instrument_name.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "Part hint {} has a blank instrument name",
                    i + 1
                )));
            }
        }

        Ok(())
    }

    /// Whether the hint asserts a usable multi-part layout
    pub fn asserts_multi_part(&self) -> bool {
        self.is_multi_part && !self.parts.is_empty()
    }
}
