use serde::{Deserialize, Serialize};

/// Caller-side text normalization applied before scanning.
///
/// The matchers themselves never normalize; they assume patterns and query
/// text already share one policy. This type is that policy: obfuscation
/// tokens are stripped first, then the text is lower-cased.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Normalizer {
    pub lowercase: bool,
    pub strip_tokens: Vec<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            lowercase: true,
            strip_tokens: vec!["/**/".to_string()],
        }
    }
}

impl Normalizer {
    pub fn apply(&self, input: &str) -> String {
        let mut result = input.to_string();
        for token in &self.strip_tokens {
            if token.is_empty() {
                continue;
            }
            result = result.replace(token.as_str(), "");
        }
        if self.lowercase {
            result = result.to_lowercase();
        }
        result
    }
}
