// src/analyze/dedup.rs
//! Duplicate detection against persisted history and the current run's session memory.
//!
//! 1. Exact canonical-link match against history.
//! 2. Near-duplicate title: ratio >= threshold against any title already surfaced in
//!    this run, then against any history title.

use crate::analyze::similarity::SimilarityMetric;
use crate::analyze::Candidate;
use crate::history::HistoryRecord;
use crate::ingest::match_key;
use crate::session::SessionMemory;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.65;

#[derive(Debug, Clone, PartialEq)]
pub enum DuplicateReason {
    Link,
    History { ratio: f64, title: String },
    Session { ratio: f64, title: String },
}

#[derive(Debug, Clone)]
pub struct Deduplicator {
    threshold: f64,
    metric: SimilarityMetric,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD, SimilarityMetric::default())
    }
}

impl Deduplicator {
    /// `threshold` is clamped to [0.0, 1.0]; NaN falls back to the default.
    pub fn new(threshold: f64, metric: SimilarityMetric) -> Self {
        let threshold = if threshold.is_nan() {
            DEFAULT_SIMILARITY_THRESHOLD
        } else {
            threshold.clamp(0.0, 1.0)
        };
        Self { threshold, metric }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    pub fn is_duplicate(
        &self,
        candidate: &Candidate,
        history: &[HistoryRecord],
        session: &SessionMemory,
    ) -> bool {
        self.check(candidate, history, session).is_some()
    }

    /// Why `candidate` is a duplicate, or `None` if it is new.
    pub fn check(
        &self,
        candidate: &Candidate,
        history: &[HistoryRecord],
        session: &SessionMemory,
    ) -> Option<DuplicateReason> {
        let link = candidate.canonical_link.as_str();
        if !link.is_empty() && history.iter().any(|r| r.canonical_link == link) {
            return Some(DuplicateReason::Link);
        }

        let key = match_key(&candidate.title);
        if key.is_empty() {
            return None;
        }

        for seen in session.title_keys() {
            let ratio = self.metric.ratio(&key, seen);
            if ratio >= self.threshold {
                return Some(DuplicateReason::Session {
                    ratio,
                    title: seen.to_string(),
                });
            }
        }

        for r in history {
            let ratio = self.metric.ratio(&key, &match_key(&r.title));
            if ratio >= self.threshold {
                return Some(DuplicateReason::History {
                    ratio,
                    title: r.title.clone(),
                });
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cand(title: &str, link: &str) -> Candidate {
        Candidate {
            title: title.into(),
            canonical_link: link.into(),
            raw_body: String::new(),
            source_name: "Test".into(),
            image_url: None,
        }
    }

    fn rec(title: &str, link: &str) -> HistoryRecord {
        HistoryRecord {
            title: title.into(),
            canonical_link: link.into(),
            surfaced_at: Utc::now(),
        }
    }

    #[test]
    fn link_match_wins_even_for_different_titles() {
        let d = Deduplicator::default();
        let h = vec![rec("Totally different", "https://x/1")];
        let s = SessionMemory::new();
        assert_eq!(
            d.check(&cand("Something else", "https://x/1"), &h, &s),
            Some(DuplicateReason::Link)
        );
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        // ratio("abcd", "abce") == 0.75
        let h = vec![rec("abcd", "L1")];
        let s = SessionMemory::new();
        let c = cand("abce", "L2");
        let eps = 1e-6;
        assert!(Deduplicator::new(0.75 - eps, SimilarityMetric::Sequence).is_duplicate(&c, &h, &s));
        assert!(Deduplicator::new(0.75, SimilarityMetric::Sequence).is_duplicate(&c, &h, &s));
        assert!(!Deduplicator::new(0.75 + eps, SimilarityMetric::Sequence).is_duplicate(&c, &h, &s));
    }

    #[test]
    fn comparison_ignores_case_and_spacing() {
        let d = Deduplicator::new(0.99, SimilarityMetric::Sequence);
        let h = vec![rec("Quake Hits Coast", "A")];
        assert!(d.is_duplicate(&cand("quake  hits coast", "B"), &h, &SessionMemory::new()));
    }

    #[test]
    fn empty_title_never_collides_but_link_still_does() {
        let d = Deduplicator::new(0.0, SimilarityMetric::Sequence);
        let h = vec![rec("", "A"), rec("Quake", "B")];
        let s = SessionMemory::new();
        assert!(!d.is_duplicate(&cand("", "C"), &h, &s));
        assert!(d.is_duplicate(&cand("", "A"), &h, &s));
    }

    #[test]
    fn session_memory_is_consulted() {
        let d = Deduplicator::new(0.7, SimilarityMetric::Sequence);
        let mut s = SessionMemory::new();
        s.remember("Quake hits coast", "alert");
        let r = d.check(&cand("Quake hits the coast", "B"), &[], &s);
        assert!(matches!(r, Some(DuplicateReason::Session { .. })));
    }

    #[test]
    fn same_run_match_reports_session_before_history() {
        let d = Deduplicator::default();
        let h = vec![rec("Quake hits coast", "A")];
        let mut s = SessionMemory::new();
        s.remember("Quake hits coast", "🌊 alert");
        let r = d.check(&cand("Quake hits coast", "B"), &h, &s);
        assert!(matches!(r, Some(DuplicateReason::Session { ratio, .. }) if ratio == 1.0));
    }

    #[test]
    fn nan_threshold_uses_default() {
        let d = Deduplicator::new(f64::NAN, SimilarityMetric::Sequence);
        assert_eq!(d.threshold(), DEFAULT_SIMILARITY_THRESHOLD);
    }
}
