//! Structural analysis result types

use serde::{Deserialize, Serialize};

/// One estimated instrument part within a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartInfo {
    /// Inclusive 0-indexed [start, end] page range
    pub page_range: [usize; 2],
    /// Canonical instrument name ("Trumpet"), or a placeholder for
    /// heuristic-only estimates
    pub instrument_name: String,
    /// Printed part label ("Trumpet 1")
    pub part_name: String,
    /// 1-indexed ordinal among parts in the same session
    pub estimated_part_number: usize,
}

/// Result of PDF structural analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartAnalysis {
    pub is_multi_part: bool,
    pub total_pages: usize,
    pub estimated_parts: Vec<PartInfo>,
    /// 0-100; low values mean "needs human verification"
    pub confidence: u8,
    /// Provenance of the estimate (hint-derived, heuristic, inconclusive,
    /// unreadable) for downstream audit
    pub notes: String,
}

impl PartAnalysis {
    /// Well-formed degraded result for a document that could not be read.
    /// The pipeline routes these to manual review instead of failing.
    pub fn unreadable(confidence: u8, summary: &str) -> Self {
        Self {
            is_multi_part: false,
            total_pages: 0,
            estimated_parts: Vec::new(),
            confidence,
            notes: format!("unreadable: {}", summary),
        }
    }
}
