//! Selecting the expectation that answers a received request.
//!
//! Exact matching picks the first zero-difference expectation that still
//! has uses left, in registration order. When nothing matches, closest
//! matching ranks every expectation to build a "did you mean" diagnostic.

use crate::expectation::Expectation;
use crate::request::Request;

/// Result of the exact-match scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExactMatch {
    /// Index of the first usable zero-difference expectation.
    Found(usize),
    /// Zero-difference expectations exist but all are spent. Holds the
    /// index of the last one seen.
    Exhausted(usize),
    NotFound,
}

/// Scan `expectations` in order for one that matches `received` exactly.
pub fn find_expected(expectations: &[Expectation], received: &mut Request) -> ExactMatch {
    let mut exhausted = None;
    for (index, expectation) in expectations.iter().enumerate() {
        if !expectation.diff(received).is_match() {
            continue;
        }
        if !expectation.repeatability().is_exhausted() {
            return ExactMatch::Found(index);
        }
        exhausted = Some(index);
    }
    exhausted.map_or(ExactMatch::NotFound, ExactMatch::Exhausted)
}

/// An expectation ranked against a received request.
#[derive(Debug, Clone, Default)]
pub struct MatchCandidate<'a> {
    pub expectation: Option<&'a Expectation>,
    pub report: String,
    pub differences: usize,
}

impl MatchCandidate<'_> {
    /// Total order used by closest matching:
    ///
    /// 1. a candidate without an expectation never wins, and always loses
    ///    to one with an expectation;
    /// 2. fewer differences win;
    /// 3. on a tie, an expectation that still owes uses wins over one that
    ///    does not;
    /// 4. otherwise the existing candidate is kept.
    pub fn is_better_match_than(&self, other: &MatchCandidate<'_>) -> bool {
        let Some(mine) = self.expectation else {
            return false;
        };
        let Some(theirs) = other.expectation else {
            return true;
        };

        if self.differences != other.differences {
            return self.differences < other.differences;
        }

        mine.repeatability().remaining() > 0 && theirs.repeatability().remaining() <= 0
    }
}

/// Find the expectation closest to `received` along with its diff report.
/// Returns `None` when nothing is registered.
pub fn find_closest<'a>(
    expectations: &'a [Expectation],
    received: &mut Request,
) -> Option<(&'a Expectation, String)> {
    let mut best = MatchCandidate::default();

    for expectation in expectations {
        let diff = expectation.diff(received);
        let candidate = MatchCandidate {
            expectation: Some(expectation),
            report: diff.report,
            differences: diff.differences,
        };
        if candidate.is_better_match_than(&best) {
            best = candidate;
        }
    }

    best.expectation.map(|e| (e, best.report))
}
