use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use tracing::debug;

use super::PatternSet;

/// Loads a signature dictionary from a `weight|pattern` line file.
///
/// The pattern is everything after the first `|`, untrimmed: several
/// shipped signatures (`' ||`, ` >=`, ` %`) carry significant leading
/// spaces or pipe characters. Blank lines and lines starting with `#`
/// are skipped.
pub struct FileDictionary {
    path: PathBuf,
    cache: OnceCell<PatternSet>,
}

impl FileDictionary {
    /// Create a dictionary backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: OnceCell::new(),
        }
    }

    /// Load and cache the pattern set.
    pub fn load(&self) -> Result<PatternSet> {
        let set = self.cache.get_or_try_init(|| self.parse())?;
        Ok(set.clone())
    }

    fn parse(&self) -> Result<PatternSet> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read dictionary at {}", self.path.display()))?;

        let mut entries = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (weight_field, pattern) = line.split_once('|').ok_or_else(|| {
                anyhow::anyhow!(
                    "invalid dictionary line at {}:{} (expected weight|pattern)",
                    self.path.display(),
                    idx + 1
                )
            })?;
            let weight: u32 = weight_field.trim().parse().with_context(|| {
                format!(
                    "invalid weight `{}` at {}:{}",
                    weight_field.trim(),
                    self.path.display(),
                    idx + 1
                )
            })?;
            entries.push((pattern.to_string(), weight));
        }

        let set = PatternSet::from_entries(entries)
            .with_context(|| format!("invalid pattern entries in {}", self.path.display()))?;
        debug!(
            patterns = set.len(),
            path = %self.path.display(),
            "dictionary loaded"
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::Path;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn loads_weights_and_preserves_pattern_spacing() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("sqli.txt");
        write(
            &path,
            "# SQLi signatures\n\n100|; drop\n10| >=\n10|' ||\n",
        );

        let dict = FileDictionary::new(&path);
        let set = dict.load().unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(0).unwrap().text, "; drop");
        assert_eq!(set.get(0).unwrap().weight, 100);
        assert_eq!(set.get(1).unwrap().text, " >=");
        assert_eq!(set.get(2).unwrap().text, "' ||");
    }

    #[test]
    fn missing_file_error_names_the_path() {
        let dict = FileDictionary::new("/nonexistent/sqli.txt");
        let err = dict.load().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/sqli.txt"));
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("bad.txt");
        write(&path, "10|union\nno-delimiter-here\n");
        let err = FileDictionary::new(&path).load().unwrap_err();
        assert!(err.to_string().contains(":2"));
    }

    #[test]
    fn non_numeric_weight_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("bad.txt");
        write(&path, "heavy|union\n");
        let err = FileDictionary::new(&path).load().unwrap_err();
        assert!(format!("{err:#}").contains("invalid weight `heavy`"));
    }

    #[test]
    fn duplicate_patterns_collapse_with_last_weight() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("dup.txt");
        write(&path, "10|union\n40|union\n");
        let set = FileDictionary::new(&path).load().unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(0).unwrap().weight, 40);
    }

    #[test]
    fn load_is_cached() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("sqli.txt");
        write(&path, "10|union\n");
        let dict = FileDictionary::new(&path);
        let first = dict.load().unwrap();
        fs::remove_file(&path).unwrap();
        let second = dict.load().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn loads_shipped_sqli_dictionary() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../dictionaries/sqli.txt")
            .canonicalize()
            .expect("dictionaries directory should exist");
        let set = FileDictionary::new(path).load().expect("shipped dictionary should parse");
        assert!(set.iter().any(|(_, p)| p.text == "union select"));
        assert!(set.iter().any(|(_, p)| p.text == "</script>"));
        assert!(set.iter().any(|(_, p)| p.text == "xp_cmdshell" && p.weight == 100));
    }

    fn pattern_text() -> impl Strategy<Value = String> {
        proptest::string::string_regex("[a-z0-9 '=;%<>|]{1,24}")
            .unwrap()
            .prop_filter("pattern must not be all whitespace", |s| {
                !s.trim().is_empty()
            })
    }

    proptest! {
        #[test]
        fn dictionary_lines_round_trip(
            entries in proptest::collection::vec((1u32..200, pattern_text()), 1..12)
        ) {
            let temp = tempfile::tempdir().unwrap();
            let path = temp.path().join("roundtrip.txt");
            let mut buffer = String::new();
            for (weight, pattern) in &entries {
                buffer.push_str(&format!("{weight}|{pattern}\n"));
            }
            write(&path, &buffer);

            let set = FileDictionary::new(&path).load().expect("entries should parse");
            // Duplicates collapse, so compare against the deduplicated input.
            let expected = PatternSet::from_entries(
                entries.iter().map(|(w, p)| (p.clone(), *w)),
            )
            .unwrap();
            prop_assert_eq!(set, expected);
        }
    }
}
