//! Fingerprint engine
//!
//! Three identity hashes drive the ingestion decision:
//! - source hash: SHA-256 of raw bytes, detects byte-identical re-uploads
//! - work fingerprint: normalized title+composer, detects probable
//!   duplicate works independent of file encoding
//! - part fingerprint: one instrument part within a session, makes
//!   part-record creation idempotent under job retries
//!
//! All functions are pure and deterministic: identical inputs always
//! yield identical hashes.

use podium_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Work fingerprint hash length in hex chars. Truncated for compact
/// indexed lookup; collision-safe at library scale (thousands of works).
const SHORT_HASH_LEN: usize = 16;

/// Sentinel standing in for "no chair" in part fingerprints. Must stay
/// distinguishable from an actual empty-string chair value.
const CHAIR_NONE: &str = "<none>";

/// Normalized work identity and its lookup hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkFingerprint {
    pub normalized_title: String,
    pub normalized_composer: String,
    /// 16 lowercase hex chars over `normalized_title::normalized_composer`
    pub hash: String,
}

/// SHA-256 content hash of raw file bytes, 64 lowercase hex chars.
pub fn compute_sha256(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Compute the normalized work fingerprint for a title/composer pair.
///
/// Normalization lowercases, strips punctuation entirely (so
/// "Sousa's March" and "Sousas March" normalize identically), collapses
/// whitespace runs, and trims. A missing composer normalizes to the
/// empty string. A title that is blank after normalization fails with
/// `Error::Validation`.
pub fn compute_work_fingerprint(
    title: &str,
    composer: Option<&str>,
) -> Result<WorkFingerprint> {
    let normalized_title = normalize_identity(title);
    if normalized_title.is_empty() {
        return Err(Error::Validation(
            "Work title is empty after normalization".to_string(),
        ));
    }

    let normalized_composer = composer.map(normalize_identity).unwrap_or_default();

    let digest = Sha256::digest(
        format!("{}::{}", normalized_title, normalized_composer).as_bytes(),
    );
    let hash = format!("{:x}", digest)[..SHORT_HASH_LEN].to_string();

    Ok(WorkFingerprint {
        normalized_title,
        normalized_composer,
        hash,
    })
}

/// Stable identity for a single instrument part within one upload session.
///
/// Any change to session, instrument, chair, or page range yields a
/// different fingerprint. `chair = None` maps to a fixed sentinel so that
/// "no chair" is distinguishable from an actual empty-string chair.
pub fn compute_part_fingerprint(
    session_id: Uuid,
    canonical_instrument: &str,
    chair: Option<&str>,
    page_start: usize,
    page_end: usize,
) -> Result<String> {
    if canonical_instrument.trim().is_empty() {
        return Err(Error::Validation(
            "Part fingerprint requires an instrument name".to_string(),
        ));
    }
    if page_start > page_end {
        return Err(Error::Validation(format!(
            "Part page range is inverted: {}..{}",
            page_start, page_end
        )));
    }

    let digest = Sha256::digest(
        format!(
            "{}|{}|{}|{}|{}",
            session_id,
            canonical_instrument,
            chair.unwrap_or(CHAIR_NONE),
            page_start,
            page_end
        )
        .as_bytes(),
    );

    Ok(format!("{:x}", digest)[..SHORT_HASH_LEN].to_string())
}

/// Lowercase, strip punctuation, collapse whitespace, trim.
fn normalize_identity(s: &str) -> String {
    let lowered = s.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_deterministic_64_hex() {
        let hash = compute_sha256(b"score bytes");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hash, compute_sha256(b"score bytes"));
        assert_ne!(hash, compute_sha256(b"score bytes2"));
    }

    #[test]
    fn empty_input_still_hashes() {
        assert_eq!(compute_sha256(b"").len(), 64);
    }

    #[test]
    fn work_fingerprint_is_case_insensitive() {
        let a = compute_work_fingerprint("Title", Some("SOUSA")).unwrap();
        let b = compute_work_fingerprint("Title", Some("sousa")).unwrap();
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn work_fingerprint_is_punctuation_insensitive() {
        let a = compute_work_fingerprint("Sousa's March", Some("J. P. Sousa")).unwrap();
        let b = compute_work_fingerprint("Sousas March", Some("J P Sousa")).unwrap();
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.normalized_title, "sousas march");
        assert_eq!(a.normalized_composer, "j p sousa");
    }

    #[test]
    fn work_fingerprint_collapses_whitespace() {
        let a = compute_work_fingerprint("  First   Suite  ", Some("Holst")).unwrap();
        let b = compute_work_fingerprint("First Suite", Some("Holst")).unwrap();
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn work_fingerprint_is_16_hex() {
        let fp = compute_work_fingerprint("March", Some("Sousa")).unwrap();
        assert_eq!(fp.hash.len(), 16);
        assert!(fp.hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn missing_composer_normalizes_to_empty() {
        let fp = compute_work_fingerprint("March", None).unwrap();
        assert_eq!(fp.normalized_composer, "");
        // Distinct from a work with a composer
        let with = compute_work_fingerprint("March", Some("Sousa")).unwrap();
        assert_ne!(fp.hash, with.hash);
    }

    #[test]
    fn different_titles_yield_different_hashes() {
        let a = compute_work_fingerprint("First Suite in E-flat", Some("Holst")).unwrap();
        let b = compute_work_fingerprint("Second Suite in F", Some("Holst")).unwrap();
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn punctuation_only_title_is_rejected() {
        let err = compute_work_fingerprint("!!!", None).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn part_fingerprint_is_stable_and_input_sensitive() {
        let session = Uuid::new_v4();
        let base = compute_part_fingerprint(session, "Trumpet", Some("1st"), 0, 3).unwrap();
        assert_eq!(base.len(), 16);
        assert_eq!(
            base,
            compute_part_fingerprint(session, "Trumpet", Some("1st"), 0, 3).unwrap()
        );

        // Each input perturbation changes the identity
        assert_ne!(
            base,
            compute_part_fingerprint(Uuid::new_v4(), "Trumpet", Some("1st"), 0, 3).unwrap()
        );
        assert_ne!(
            base,
            compute_part_fingerprint(session, "Cornet", Some("1st"), 0, 3).unwrap()
        );
        assert_ne!(
            base,
            compute_part_fingerprint(session, "Trumpet", Some("2nd"), 0, 3).unwrap()
        );
        assert_ne!(
            base,
            compute_part_fingerprint(session, "Trumpet", Some("1st"), 0, 4).unwrap()
        );
    }

    #[test]
    fn no_chair_differs_from_empty_string_chair() {
        let session = Uuid::new_v4();
        let none = compute_part_fingerprint(session, "Tuba", None, 0, 1).unwrap();
        let empty = compute_part_fingerprint(session, "Tuba", Some(""), 0, 1).unwrap();
        assert_ne!(none, empty);
    }

    #[test]
    fn inverted_page_range_is_rejected() {
        let err = compute_part_fingerprint(Uuid::new_v4(), "Tuba", None, 5, 2).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn blank_instrument_is_rejected() {
        let err = compute_part_fingerprint(Uuid::new_v4(), "  ", None, 0, 1).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
