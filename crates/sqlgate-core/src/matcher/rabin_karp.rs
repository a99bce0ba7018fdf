use tracing::debug;

use super::{
    BuildError, BuildOptions, MatchReport, PatternHit, PatternSet, RiskThresholds,
    SignatureMatcher,
};

/// Alphabet radix for the rolling hash.
const RADIX: u64 = 256;
/// Prime modulus keeping hash values small.
const MODULUS: u64 = 101;

/// One pattern compiled for Rabin-Karp search.
#[derive(Debug, Clone)]
pub struct RkPattern {
    text: String,
    hash: u64,
    /// `RADIX^(len-1) % MODULUS`, the weight of the window's leading byte.
    lead: u64,
}

impl RkPattern {
    fn compile(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut lead = 1;
        for _ in 0..bytes.len().saturating_sub(1) {
            lead = (lead * RADIX) % MODULUS;
        }
        Self {
            hash: hash_window(bytes),
            lead,
            text: text.to_string(),
        }
    }

    /// Byte offset of the first occurrence of the pattern in `text`.
    ///
    /// Hash hits are verified by byte comparison before being reported.
    pub fn find(&self, text: &str) -> Option<usize> {
        let text = text.as_bytes();
        let pattern = self.text.as_bytes();
        if text.len() < pattern.len() {
            return None;
        }

        let mut window_hash = hash_window(&text[..pattern.len()]);
        for start in 0..=text.len() - pattern.len() {
            if window_hash == self.hash && &text[start..start + pattern.len()] == pattern {
                return Some(start);
            }
            if start + pattern.len() < text.len() {
                let outgoing = (text[start] as u64 * self.lead) % MODULUS;
                let incoming = text[start + pattern.len()] as u64;
                window_hash =
                    (RADIX * (window_hash + MODULUS - outgoing) + incoming) % MODULUS;
            }
        }
        None
    }
}

fn hash_window(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0, |hash, &byte| (RADIX * hash + byte as u64) % MODULUS)
}

/// Baseline gate that runs one rolling-hash search per dictionary pattern.
#[derive(Debug)]
pub struct RabinKarpGate {
    patterns: Vec<RkPattern>,
    set: PatternSet,
}

impl RabinKarpGate {
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
            .map(|pattern| RkPattern::compile(&pattern.text))
            .collect::<Vec<_>>();
        debug!(patterns = patterns.len(), "rabin-karp gate compiled");
        Ok(Self { patterns, set })
    }
}

impl SignatureMatcher for RabinKarpGate {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_returns_first_occurrence() {
        let pattern = RkPattern::compile("aba");
        assert_eq!(pattern.find("bababanaparaver"), Some(1));
        assert_eq!(pattern.find("zzz"), None);
    }

    #[test]
    fn pattern_longer_than_text_never_matches() {
        let pattern = RkPattern::compile("union select");
        assert_eq!(pattern.find("union"), None);
        assert_eq!(pattern.find(""), None);
    }

    #[test]
    fn colliding_hashes_are_verified_by_bytes() {
        // With modulus 101 distinct windows collide constantly over long
        // inputs; matching must still only report byte-exact occurrences.
        let pattern = RkPattern::compile("drop");
        let text = "a".repeat(500) + "drop" + &"b".repeat(500);
        assert_eq!(pattern.find(&text), Some(500));
    }

    #[test]
    fn gate_agrees_on_scan_and_verdict() {
        let set = PatternSet::from_entries(vec![
            ("' or".to_string(), 10),
            ("; drop".to_string(), 100),
        ])
        .unwrap();
        let gate = RabinKarpGate::build(set).unwrap();

        let report = gate.scan("1' or '1'='1; drop table users");
        assert_eq!(report.matches.len(), 2);
        assert!(!gate.is_safe("1' or '1'='1; drop table users"));
        assert!(gate.is_safe("plain text"));
    }
}
