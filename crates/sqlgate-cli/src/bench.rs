use std::hint::black_box;
use std::time::{Duration, Instant};
use std::{fs, path::Path};

use anyhow::{Context, Result};
use sqlgate_core::SignatureMatcher;

/// Timing results for one matcher over a corpus.
#[derive(Debug, Clone)]
pub struct BenchOutcome {
    pub name: &'static str,
    pub inputs: usize,
    pub flagged: usize,
    pub avg_scan: Duration,
    pub total: Duration,
}

/// Load a benchmark corpus, one input per line; blank lines skipped.
pub fn load_corpus(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus at {}", path.display()))?;
    Ok(content
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Time `iterations` full passes of the matcher over the corpus.
pub fn run(
    name: &'static str,
    matcher: &dyn SignatureMatcher,
    corpus: &[String],
    iterations: usize,
) -> BenchOutcome {
    let iterations = iterations.max(1);

    let flagged = corpus
        .iter()
        .filter(|input| !matcher.is_safe(input))
        .count();

    let start = Instant::now();
    for _ in 0..iterations {
        for input in corpus {
            black_box(matcher.scan(black_box(input)));
        }
    }
    let total = start.elapsed();

    let scans = iterations * corpus.len();
    let avg_scan = if scans == 0 {
        Duration::ZERO
    } else {
        total / scans as u32
    };

    BenchOutcome {
        name,
        inputs: corpus.len(),
        flagged,
        avg_scan,
        total,
    }
}
