//! PDF structural analysis
//!
//! Estimates whether an uploaded document bundles multiple instrument
//! parts and where the page boundaries likely fall. The document is
//! opened solely to read its page count; the parse runs on the blocking
//! pool and the decoded document is dropped before the result is
//! returned, on every path.
//!
//! Analysis never fails the caller: a corrupt or unreadable document
//! degrades to a well-formed confidence-0 result so the pipeline routes
//! the upload to manual review instead of crashing the ingestion job.
//!
//! Only structural facts (page counts, confidence, booleans) are logged,
//! never raw bytes or extracted text.

use crate::models::{ExtractedMetadata, PartAnalysis, PartInfo};
use podium_common::config::AnalyzerOverrides;

/// Tuning values for the structural heuristics.
///
/// The confidences and the pages-per-part divisor are empirical; they
/// are named configuration rather than inline literals so deployments
/// can adjust them without a rebuild.
#[derive(Debug, Clone)]
pub struct AnalyzerTuning {
    /// Confidence when boundaries come from an extractor hint
    /// (moderate: boundaries are an estimate, not verified in-page)
    pub confidence_hint: u8,
    /// Confidence for very short documents (essentially never multi-part)
    pub confidence_short_doc: u8,
    /// Confidence for page-count-only multi-part estimates
    /// (explicitly low: page count alone is a weak signal)
    pub confidence_heuristic: u8,
    /// Confidence when the heuristic cannot decide
    pub confidence_inconclusive: u8,
    /// Confidence reported for unreadable documents
    pub confidence_unreadable: u8,
    /// Heuristic divisor: assumed pages per instrument part
    pub pages_per_part: usize,
    /// Documents at or below this page count are treated as single-part
    pub short_doc_max_pages: usize,
}

impl Default for AnalyzerTuning {
    fn default() -> Self {
        Self {
            confidence_hint: 60,
            confidence_short_doc: 90,
            confidence_heuristic: 30,
            confidence_inconclusive: 50,
            confidence_unreadable: 0,
            pages_per_part: 4,
            short_doc_max_pages: 2,
        }
    }
}

impl AnalyzerTuning {
    /// Apply config-file overrides on top of the compiled defaults.
    pub fn with_overrides(overrides: &AnalyzerOverrides) -> Self {
        let defaults = Self::default();
        Self {
            confidence_hint: overrides.confidence_hint.unwrap_or(defaults.confidence_hint),
            confidence_short_doc: overrides
                .confidence_short_doc
                .unwrap_or(defaults.confidence_short_doc),
            confidence_heuristic: overrides
                .confidence_heuristic
                .unwrap_or(defaults.confidence_heuristic),
            confidence_inconclusive: overrides
                .confidence_inconclusive
                .unwrap_or(defaults.confidence_inconclusive),
            confidence_unreadable: overrides
                .confidence_unreadable
                .unwrap_or(defaults.confidence_unreadable),
            pages_per_part: overrides.pages_per_part.unwrap_or(defaults.pages_per_part),
            short_doc_max_pages: overrides
                .short_doc_max_pages
                .unwrap_or(defaults.short_doc_max_pages),
        }
    }
}

/// Structural analyzer for uploaded PDF documents
#[derive(Debug, Clone, Default)]
pub struct PdfAnalyzer {
    tuning: AnalyzerTuning,
}

impl PdfAnalyzer {
    pub fn new(tuning: AnalyzerTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &AnalyzerTuning {
        &self.tuning
    }

    /// Analyze a document's part structure.
    ///
    /// The blocking parse runs off the async path via `spawn_blocking`.
    /// Never returns an error: unreadable input degrades to a
    /// confidence-0 result.
    pub async fn analyze(
        &self,
        bytes: Vec<u8>,
        hint: Option<&ExtractedMetadata>,
    ) -> PartAnalysis {
        let parsed = tokio::task::spawn_blocking(move || count_pages(&bytes)).await;

        let total_pages = match parsed {
            Ok(Ok(pages)) => pages,
            Ok(Err(summary)) => {
                tracing::warn!(error = %summary, "Document unreadable, degrading to confidence 0");
                return PartAnalysis::unreadable(self.tuning.confidence_unreadable, &summary);
            }
            Err(join_err) => {
                tracing::warn!(error = %join_err, "Structural analysis task failed");
                return PartAnalysis::unreadable(
                    self.tuning.confidence_unreadable,
                    "analysis task failed",
                );
            }
        };

        let analysis = self.evaluate(total_pages, hint);
        tracing::debug!(
            total_pages,
            is_multi_part = analysis.is_multi_part,
            parts = analysis.estimated_parts.len(),
            confidence = analysis.confidence,
            "Structural analysis complete"
        );
        analysis
    }

    /// Pure estimation from a known page count. Split out from
    /// [`analyze`] so the heuristics are testable without documents.
    pub fn evaluate(
        &self,
        total_pages: usize,
        hint: Option<&ExtractedMetadata>,
    ) -> PartAnalysis {
        if total_pages == 0 {
            return PartAnalysis::unreadable(
                self.tuning.confidence_unreadable,
                "document has no pages",
            );
        }

        // Hint path: extractor asserts a multi-part layout
        if let Some(metadata) = hint.filter(|m| m.asserts_multi_part()) {
            let parts = self.partition_with_hint(total_pages, metadata);
            let part_count = parts.len();
            return PartAnalysis {
                is_multi_part: part_count > 1,
                total_pages,
                estimated_parts: parts,
                confidence: self.tuning.confidence_hint,
                notes: format!(
                    "hint-derived: {} parts over {} pages, equal-width boundaries",
                    part_count, total_pages
                ),
            };
        }

        // Heuristic path: page count is the only signal
        if total_pages <= self.tuning.short_doc_max_pages {
            return PartAnalysis {
                is_multi_part: false,
                total_pages,
                estimated_parts: vec![single_part(total_pages)],
                confidence: self.tuning.confidence_short_doc,
                notes: format!("heuristic: {} pages, too short to be multi-part", total_pages),
            };
        }

        let candidate_parts =
            total_pages.div_ceil(self.tuning.pages_per_part).min(total_pages);

        if candidate_parts > 1 && total_pages >= self.tuning.pages_per_part {
            let ranges = partition_pages(total_pages, candidate_parts);
            let parts = ranges
                .into_iter()
                .enumerate()
                .map(|(i, page_range)| PartInfo {
                    page_range,
                    instrument_name: "Unknown".to_string(),
                    part_name: format!("Part {}", i + 1),
                    estimated_part_number: i + 1,
                })
                .collect::<Vec<_>>();

            return PartAnalysis {
                is_multi_part: true,
                total_pages,
                estimated_parts: parts,
                confidence: self.tuning.confidence_heuristic,
                notes: format!(
                    "heuristic: {} pages / {} pages-per-part suggests {} parts",
                    total_pages, self.tuning.pages_per_part, candidate_parts
                ),
            };
        }

        PartAnalysis {
            is_multi_part: false,
            total_pages,
            estimated_parts: vec![single_part(total_pages)],
            confidence: self.tuning.confidence_inconclusive,
            notes: format!("heuristic inconclusive for {} pages", total_pages),
        }
    }

    fn partition_with_hint(
        &self,
        total_pages: usize,
        metadata: &ExtractedMetadata,
    ) -> Vec<PartInfo> {
        // More hinted parts than pages: the surplus hints get no pages,
        // so partition over the first `total_pages` hints only
        let usable = metadata.parts.len().min(total_pages);
        let ranges = partition_pages(total_pages, usable);

        ranges
            .into_iter()
            .zip(metadata.parts.iter())
            .enumerate()
            .map(|(i, (page_range, hint_part))| PartInfo {
                page_range,
                instrument_name: hint_part.instrument_name.clone(),
                part_name: hint_part
                    .part_name
                    .clone()
                    .unwrap_or_else(|| hint_part.instrument_name.clone()),
                estimated_part_number: i + 1,
            })
            .collect()
    }
}

/// Partition `total_pages` into `part_count` contiguous inclusive ranges.
///
/// Width is `ceil(total/count)` per part in order; the final part absorbs
/// the remainder. The ranges always cover all pages with no gaps or
/// overlaps.
fn partition_pages(total_pages: usize, part_count: usize) -> Vec<[usize; 2]> {
    if part_count == 0 {
        return Vec::new();
    }
    let width = total_pages.div_ceil(part_count);
    let mut ranges = Vec::with_capacity(part_count);
    let mut start = 0;
    while start < total_pages {
        let end = (start + width).min(total_pages) - 1;
        ranges.push([start, end]);
        start = end + 1;
    }
    ranges
}

fn single_part(total_pages: usize) -> PartInfo {
    PartInfo {
        page_range: [0, total_pages - 1],
        instrument_name: "Unknown".to_string(),
        part_name: "Full document".to_string(),
        estimated_part_number: 1,
    }
}

/// Count pages by loading the document structure. The decoded document
/// is dropped before this returns. Error strings are sanitized summaries
/// (no document content).
fn count_pages(bytes: &[u8]) -> std::result::Result<usize, String> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| format!("failed to parse document: {}", e))?;
    let pages = document.get_pages().len();
    drop(document);
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PartHint;
    use lopdf::{dictionary, Document, Object};

    fn analyzer() -> PdfAnalyzer {
        PdfAnalyzer::new(AnalyzerTuning::default())
    }

    fn hint(parts: &[&str]) -> ExtractedMetadata {
        ExtractedMetadata {
            title: "Test Suite".to_string(),
            composer: None,
            is_multi_part: true,
            parts: parts
                .iter()
                .map(|name| PartHint {
                    instrument_name: name.to_string(),
                    part_name: None,
                    chair: None,
                })
                .collect(),
        }
    }

    /// Build a real n-page PDF in memory.
    fn pdf_with_pages(n: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let kids: Vec<Object> = (0..n)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                })
                .into()
            })
            .collect();

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => n as i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[tokio::test]
    async fn one_page_document_is_single_part_confidence_90() {
        let analysis = analyzer().analyze(pdf_with_pages(1), None).await;
        assert!(!analysis.is_multi_part);
        assert_eq!(analysis.total_pages, 1);
        assert_eq!(analysis.confidence, 90);
        assert_eq!(analysis.estimated_parts.len(), 1);
        assert_eq!(analysis.estimated_parts[0].page_range, [0, 0]);
    }

    #[tokio::test]
    async fn eight_page_document_splits_into_two_parts_confidence_30() {
        let analysis = analyzer().analyze(pdf_with_pages(8), None).await;
        assert!(analysis.is_multi_part);
        assert_eq!(analysis.estimated_parts.len(), 2);
        assert_eq!(analysis.confidence, 30);
        assert_eq!(analysis.estimated_parts[0].page_range, [0, 3]);
        assert_eq!(analysis.estimated_parts[1].page_range, [4, 7]);
    }

    #[tokio::test]
    async fn corrupt_buffer_never_panics_and_reports_confidence_0() {
        let analysis = analyzer()
            .analyze(b"%PDF-not really a document".to_vec(), None)
            .await;
        assert!(!analysis.is_multi_part);
        assert_eq!(analysis.total_pages, 0);
        assert_eq!(analysis.confidence, 0);
        assert!(analysis.estimated_parts.is_empty());
        assert!(analysis.notes.starts_with("unreadable"));
    }

    #[test]
    fn three_page_document_is_inconclusive_confidence_50() {
        let analysis = analyzer().evaluate(3, None);
        assert!(!analysis.is_multi_part);
        assert_eq!(analysis.confidence, 50);
        assert_eq!(analysis.estimated_parts.len(), 1);
        assert_eq!(analysis.estimated_parts[0].page_range, [0, 2]);
    }

    #[test]
    fn hint_distributes_pages_with_final_part_absorbing_remainder() {
        let metadata = hint(&["Flute", "Clarinet", "Trumpet"]);
        let analysis = analyzer().evaluate(10, Some(&metadata));

        assert!(analysis.is_multi_part);
        assert_eq!(analysis.confidence, 60);
        assert_eq!(analysis.estimated_parts.len(), 3);
        // ceil(10/3) = 4 pages per part, last part takes the remaining 2
        assert_eq!(analysis.estimated_parts[0].page_range, [0, 3]);
        assert_eq!(analysis.estimated_parts[1].page_range, [4, 7]);
        assert_eq!(analysis.estimated_parts[2].page_range, [8, 9]);
        assert_eq!(analysis.estimated_parts[0].instrument_name, "Flute");
        assert_eq!(analysis.estimated_parts[2].estimated_part_number, 3);
    }

    #[test]
    fn hint_partition_has_no_gaps_or_overlaps() {
        for total in 1..=24usize {
            for parts in 1..=6usize {
                let names: Vec<String> = (0..parts).map(|i| format!("Inst{}", i)).collect();
                let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
                let analysis = analyzer().evaluate(total, Some(&hint(&name_refs)));

                let mut covered = 0usize;
                let mut next_expected = 0usize;
                for part in &analysis.estimated_parts {
                    assert_eq!(part.page_range[0], next_expected);
                    assert!(part.page_range[1] >= part.page_range[0]);
                    covered += part.page_range[1] - part.page_range[0] + 1;
                    next_expected = part.page_range[1] + 1;
                }
                assert_eq!(covered, total, "total={} parts={}", total, parts);
            }
        }
    }

    #[test]
    fn hint_without_multi_part_assertion_falls_back_to_heuristic() {
        let metadata = ExtractedMetadata {
            title: "Solo".to_string(),
            composer: None,
            is_multi_part: false,
            parts: Vec::new(),
        };
        let analysis = analyzer().evaluate(2, Some(&metadata));
        assert_eq!(analysis.confidence, 90);
        assert!(!analysis.is_multi_part);
    }

    #[test]
    fn zero_pages_reports_unreadable() {
        let analysis = analyzer().evaluate(0, None);
        assert_eq!(analysis.confidence, 0);
        assert_eq!(analysis.total_pages, 0);
    }

    #[test]
    fn overrides_replace_only_named_values() {
        let overrides = AnalyzerOverrides {
            pages_per_part: Some(6),
            confidence_heuristic: Some(35),
            ..Default::default()
        };
        let tuned = PdfAnalyzer::new(AnalyzerTuning::with_overrides(&overrides));

        // 8 pages with a 6-page divisor: ceil(8/6) = 2 parts
        let analysis = tuned.evaluate(8, None);
        assert!(analysis.is_multi_part);
        assert_eq!(analysis.confidence, 35);
        assert_eq!(analysis.estimated_parts.len(), 2);

        // Untouched values keep their defaults
        assert_eq!(tuned.tuning().confidence_short_doc, 90);
    }
}
