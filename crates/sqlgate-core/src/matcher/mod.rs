use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod automaton;
pub mod dictionary;
pub mod kmp;
pub mod rabin_karp;

/// Byte span within the scanned text `(start, end)` where `start <= end`.
pub type Span = (usize, usize);

/// Weight assigned to dictionary entries that do not specify one.
pub const DEFAULT_WEIGHT: u32 = 10;

/// A single attack-signature substring plus its severity weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub text: String,
    pub weight: u32,
}

/// Immutable, ordered collection of signature patterns.
///
/// Pattern identifiers handed out by matchers are indices into this set.
/// Duplicate pattern strings collapse to a single entry keeping the first
/// position and the last supplied weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Build a set from `(pattern, weight)` pairs, validating every entry.
    pub fn from_entries<I>(entries: I) -> Result<Self, PatternSetError>
    where
        I: IntoIterator<Item = (String, u32)>,
    {
        let mut patterns: Vec<Pattern> = Vec::new();
        let mut index_of: HashMap<String, usize> = HashMap::new();
        for (index, (text, weight)) in entries.into_iter().enumerate() {
            if text.is_empty() {
                return Err(PatternSetError::EmptyPattern { index });
            }
            if weight == 0 {
                return Err(PatternSetError::ZeroWeight {
                    index,
                    pattern: text,
                });
            }
            match index_of.get(&text) {
                Some(&id) => patterns[id].weight = weight,
                None => {
                    index_of.insert(text.clone(), patterns.len());
                    patterns.push(Pattern { text, weight });
                }
            }
        }
        Ok(Self { patterns })
    }

    /// Build a set of bare patterns carrying [`DEFAULT_WEIGHT`].
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, PatternSetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_entries(
            patterns
                .into_iter()
                .map(|text| (text.into(), DEFAULT_WEIGHT)),
        )
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Pattern> {
        self.patterns.get(id)
    }

    /// Iterate `(pattern_id, pattern)` in set order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Pattern)> {
        self.patterns.iter().enumerate()
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
}

/// Errors emitted while validating pattern entries.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternSetError {
    #[error("pattern at index {index} is empty")]
    EmptyPattern { index: usize },
    #[error("pattern `{pattern}` at index {index} has zero weight")]
    ZeroWeight { index: usize, pattern: String },
}

/// Errors emitted while constructing a matcher from a pattern set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("pattern set contains no patterns")]
    EmptySet,
    #[error(transparent)]
    InvalidPattern(#[from] PatternSetError),
}

/// Construction knobs that are configuration choices rather than contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Reject an empty pattern set instead of building a matcher that
    /// matches nothing.
    pub reject_empty: bool,
}

/// Ordered upper bounds mapping a risk score to a [`RiskLabel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: 30,
            medium: 70,
            high: 90,
        }
    }
}

/// Classification buckets for aggregated risk scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLabel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLabel {
    /// Map a score into a label using the default threshold table.
    pub fn from_score(score: u32) -> Self {
        Self::from_score_with_thresholds(score, &RiskThresholds::default())
    }

    /// Map a score using caller-provided thresholds.
    pub fn from_score_with_thresholds(score: u32, thresholds: &RiskThresholds) -> Self {
        if score <= thresholds.low {
            Self::Low
        } else if score <= thresholds.medium {
            Self::Medium
        } else if score <= thresholds.high {
            Self::High
        } else {
            Self::Critical
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(label)
    }
}

impl FromStr for RiskLabel {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(ParseLabelError {
                label: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown risk label `{label}`")]
pub struct ParseLabelError {
    pub label: String,
}

/// A distinct pattern observed during one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternHit {
    pub pattern_id: usize,
    pub pattern: String,
    pub weight: u32,
    /// Span of the first occurrence that surfaced the pattern.
    pub span: Span,
}

/// Aggregated outcome of scanning one input.
///
/// Each pattern is reported at most once per scan regardless of how many
/// times it recurs in the text; `score` is the sum of the distinct matched
/// weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub score: u32,
    pub label: RiskLabel,
    pub matches: Vec<PatternHit>,
    pub scanned_len: usize,
}

impl MatchReport {
    /// Construct a report, deriving score and label from the hits.
    pub fn from_hits(matches: Vec<PatternHit>, scanned_len: usize, thresholds: &RiskThresholds) -> Self {
        let score = matches
            .iter()
            .fold(0u32, |total, hit| total.saturating_add(hit.weight));
        Self {
            label: RiskLabel::from_score_with_thresholds(score, thresholds),
            score,
            matches,
            scanned_len,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Common contract for the automaton and the baseline matchers, so the
/// surrounding layers can drive any of them interchangeably.
pub trait SignatureMatcher {
    /// Scan the full input and aggregate every distinct match.
    fn scan_with_thresholds(&self, text: &str, thresholds: &RiskThresholds) -> MatchReport;

    /// Short-circuiting verdict: `false` as soon as any pattern matches.
    ///
    /// Must agree with `scan(text).is_clean()` for every input.
    fn is_safe(&self, text: &str) -> bool;

    /// Scan with the default threshold table.
    fn scan(&self, text: &str) -> MatchReport {
        self.scan_with_thresholds(text, &RiskThresholds::default())
    }
}
