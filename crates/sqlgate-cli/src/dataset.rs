use std::{fs, path::Path};

use anyhow::{Context, Result};
use sqlgate_core::{Normalizer, RiskLabel, RiskThresholds, SignatureMatcher};

/// One labelled dataset row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRecord {
    pub query: String,
    pub expected_label: RiskLabel,
    pub expected_score: Option<u32>,
}

/// Load a `query,expected_label[,expected_score]` CSV dataset.
///
/// Fields are split from the right so queries may contain commas in the
/// three-field form. A first line that does not parse is treated as a
/// header and skipped.
pub fn load_dataset(path: &Path) -> Result<Vec<DatasetRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset at {}", path.display()))?;

    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        match parse_record(line) {
            Ok(record) => records.push(record),
            Err(_) if idx == 0 => continue,
            Err(err) => {
                return Err(err.context(format!(
                    "invalid dataset record at {}:{}",
                    path.display(),
                    idx + 1
                )))
            }
        }
    }
    Ok(records)
}

fn parse_record(line: &str) -> Result<DatasetRecord> {
    let mut fields = line.rsplitn(3, ',');
    let last = fields.next().context("empty record")?;
    let middle = fields.next();
    let rest = fields.next();

    match (rest, middle) {
        (Some(query), Some(label)) => Ok(DatasetRecord {
            query: query.to_string(),
            expected_label: label.parse()?,
            expected_score: Some(
                last.trim()
                    .parse::<u32>()
                    .with_context(|| format!("invalid expected score `{}`", last.trim()))?,
            ),
        }),
        (None, Some(query)) => Ok(DatasetRecord {
            query: query.to_string(),
            expected_label: last.parse()?,
            expected_score: None,
        }),
        _ => anyhow::bail!("expected `query,label[,score]`"),
    }
}

/// Outcome for one evaluated record.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub query: String,
    pub expected: RiskLabel,
    pub computed: RiskLabel,
    pub score: u32,
    pub matched: bool,
}

/// Aggregated evaluation results.
#[derive(Debug, Clone)]
pub struct EvalSummary {
    pub outcomes: Vec<RecordOutcome>,
}

impl EvalSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn correct(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.matched).count()
    }

    pub fn accuracy(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        100.0 * self.correct() as f64 / self.total() as f64
    }
}

/// Run every record through the matcher and compare labels.
pub fn evaluate(
    matcher: &dyn SignatureMatcher,
    records: &[DatasetRecord],
    thresholds: &RiskThresholds,
    normalizer: &Normalizer,
) -> EvalSummary {
    let outcomes = records
        .iter()
        .map(|record| {
            let normalized = normalizer.apply(&record.query);
            let report = matcher.scan_with_thresholds(&normalized, thresholds);
            RecordOutcome {
                query: record.query.clone(),
                expected: record.expected_label,
                computed: report.label,
                score: report.score,
                matched: report.label == record.expected_label,
            }
        })
        .collect();
    EvalSummary { outcomes }
}
