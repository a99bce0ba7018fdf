use tracing::debug;

use super::{
    BuildError, BuildOptions, MatchReport, PatternHit, PatternSet, RiskThresholds,
    SignatureMatcher,
};

/// One pattern compiled for Knuth-Morris-Pratt search.
#[derive(Debug, Clone)]
pub struct KmpPattern {
    text: String,
    lps: Vec<usize>,
}

impl KmpPattern {
    fn compile(text: &str) -> Self {
        Self {
            lps: longest_prefix_suffix(text.as_bytes()),
            text: text.to_string(),
        }
    }

    /// Byte offset of the first occurrence of the pattern in `text`.
    pub fn find(&self, text: &str) -> Option<usize> {
        let text = text.as_bytes();
        let pattern = self.text.as_bytes();
        let mut i = 0;
        let mut j = 0;
        while i < text.len() {
            if pattern[j] == text[i] {
                i += 1;
                j += 1;
                if j == pattern.len() {
                    return Some(i - j);
                }
            } else if j != 0 {
                j = self.lps[j - 1];
            } else {
                i += 1;
            }
        }
        None
    }
}

/// Longest-proper-prefix-which-is-also-suffix table.
fn longest_prefix_suffix(pattern: &[u8]) -> Vec<usize> {
    let mut lps = vec![0; pattern.len()];
    let mut length = 0;
    let mut i = 1;
    while i < pattern.len() {
        if pattern[i] == pattern[length] {
            length += 1;
            lps[i] = length;
            i += 1;
        } else if length != 0 {
            length = lps[length - 1];
        } else {
            lps[i] = 0;
            i += 1;
        }
    }
    lps
}

/// Baseline gate that runs one KMP search per dictionary pattern.
///
/// O(patterns × text) per scan, the cost profile the automaton exists to
/// avoid; kept as the comparison matcher for evaluation and benchmarking.
#[derive(Debug)]
pub struct KmpGate {
    patterns: Vec<KmpPattern>,
    set: PatternSet,
}

impl KmpGate {
    pub fn build(set: PatternSet) -> Result<Self, BuildError> {
        Self::build_with(set, &BuildOptions::default())
    }

    pub fn build_with(set: PatternSet, options: &BuildOptions) -> Result<Self, BuildError> {
        if options.reject_empty && set.is_empty() {
            return Err(BuildError::EmptySet);
        }
        let patterns = set
            .patterns()
            .iter()
            .map(|pattern| KmpPattern::compile(&pattern.text))
            .collect::<Vec<_>>();
        debug!(patterns = patterns.len(), "kmp gate compiled");
        Ok(Self { patterns, set })
    }
}

impl SignatureMatcher for KmpGate {
    fn scan_with_thresholds(&self, text: &str, thresholds: &RiskThresholds) -> MatchReport {
        let mut hits = Vec::new();
        for (id, compiled) in self.patterns.iter().enumerate() {
            if let Some(start) = compiled.find(text) {
                let pattern = &self.set.patterns()[id];
                hits.push(PatternHit {
                    pattern_id: id,
                    pattern: pattern.text.clone(),
                    weight: pattern.weight,
                    span: (start, start + pattern.text.len()),
                });
            }
        }
        hits.sort_by_key(|hit| (hit.span.0, hit.pattern_id));
        MatchReport::from_hits(hits, text.len(), thresholds)
    }

    fn is_safe(&self, text: &str) -> bool {
        self.patterns
            .iter()
            .all(|compiled| compiled.find(text).is_none())
    }
}
