use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use sqlgate_core::{
    report::{render_report, OutputFormat},
    FileDictionary, KmpGate, MatchAutomaton, Normalizer, PatternSet, RabinKarpGate,
    RiskThresholds, SignatureMatcher,
};
use tracing_subscriber::EnvFilter;

mod bench;
mod dataset;

#[derive(Parser, Debug)]
#[command(
    name = "sqlgate",
    author,
    version,
    about = "Injection Signature Gate CLI"
)]
struct Cli {
    /// Signature dictionary file (weight|pattern lines)
    #[arg(
        long = "dictionary",
        value_name = "FILE",
        default_value = "./dictionaries/sqli.txt",
        global = true
    )]
    dictionary: PathBuf,

    /// Optional config file overriding thresholds and normalization
    #[arg(long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan input text and print the aggregated match report
    Scan {
        /// Text to scan; read from stdin when omitted
        text: Option<String>,
        /// Emit the report as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
        /// Pass the input through without normalization
        #[arg(long)]
        raw: bool,
        #[arg(long, value_enum, default_value = "aho")]
        matcher: MatcherKind,
    },
    /// Binary safe/unsafe verdict; exits with code 1 when unsafe
    Check {
        /// Text to check; read from stdin when omitted
        text: Option<String>,
        #[arg(long)]
        raw: bool,
        #[arg(long, value_enum, default_value = "aho")]
        matcher: MatcherKind,
    },
    /// List the loaded signature dictionary
    ListPatterns {
        /// Emit patterns as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
    /// Evaluate classification accuracy against a labelled CSV dataset
    Eval {
        /// Dataset file: `query,expected_label[,expected_score]` per line
        #[arg(long, value_name = "FILE")]
        dataset: PathBuf,
        /// Print one line per record instead of just the summary
        #[arg(long)]
        verbose: bool,
        #[arg(long, value_enum, default_value = "aho")]
        matcher: MatcherKind,
    },
    /// Compare matcher wall-clock performance over a corpus file
    Bench {
        /// Corpus file, one input per line
        #[arg(long, value_name = "FILE")]
        corpus: PathBuf,
        /// Timed passes over the corpus per matcher
        #[arg(long, default_value_t = 5)]
        iterations: usize,
    },
}

/// Which matcher implementation drives the scan.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum MatcherKind {
    Aho,
    Kmp,
    RabinKarp,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
struct CliConfig {
    thresholds: RiskThresholds,
    normalizer: Normalizer,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    match cli
        .command
        .unwrap_or(Commands::ListPatterns { json: false })
    {
        Commands::Scan {
            text,
            json,
            raw,
            matcher,
        } => scan(&cli.dictionary, &config, text, json, raw, matcher),
        Commands::Check { text, raw, matcher } => {
            check(&cli.dictionary, &config, text, raw, matcher)
        }
        Commands::ListPatterns { json } => list_patterns(&cli.dictionary, json),
        Commands::Eval {
            dataset,
            verbose,
            matcher,
        } => eval(&cli.dictionary, &config, &dataset, verbose, matcher),
        Commands::Bench { corpus, iterations } => {
            run_bench(&cli.dictionary, &config, &corpus, iterations)
        }
    }
}

fn scan(
    dictionary: &Path,
    config: &CliConfig,
    text: Option<String>,
    json: bool,
    raw: bool,
    kind: MatcherKind,
) -> Result<()> {
    let matcher = build_matcher(kind, load_dictionary(dictionary)?)?;
    let input = prepare_input(text, raw, &config.normalizer)?;
    let report = matcher.scan_with_thresholds(&input, &config.thresholds);
    let format = if json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    println!("{}", render_report(&report, format)?);
    Ok(())
}

fn check(
    dictionary: &Path,
    config: &CliConfig,
    text: Option<String>,
    raw: bool,
    kind: MatcherKind,
) -> Result<()> {
    let matcher = build_matcher(kind, load_dictionary(dictionary)?)?;
    let input = prepare_input(text, raw, &config.normalizer)?;
    if matcher.is_safe(&input) {
        println!("{}", "Input is safe.".green());
        Ok(())
    } else {
        println!("{}", "Potential injection detected.".red().bold());
        std::process::exit(1);
    }
}

fn list_patterns(dictionary: &Path, json: bool) -> Result<()> {
    let set = load_dictionary(dictionary)?;
    if json {
        println!("{}", serde_json::to_string_pretty(set.patterns())?);
        return Ok(());
    }

    println!(
        "{} pattern(s) loaded from {}",
        set.len(),
        dictionary.display()
    );
    for (id, pattern) in set.iter() {
        println!(
            "- {id:>3} [weight {weight:>3}] {text:?}",
            id = id,
            weight = pattern.weight,
            text = pattern.text
        );
    }
    Ok(())
}

fn eval(
    dictionary: &Path,
    config: &CliConfig,
    dataset_path: &Path,
    verbose: bool,
    kind: MatcherKind,
) -> Result<()> {
    let matcher = build_matcher(kind, load_dictionary(dictionary)?)?;
    let records = dataset::load_dataset(dataset_path)?;
    let summary = dataset::evaluate(
        matcher.as_ref(),
        &records,
        &config.thresholds,
        &config.normalizer,
    );

    if verbose {
        for outcome in &summary.outcomes {
            println!(
                "{mark} {query:?}: score {score}, computed {computed}, expected {expected}",
                mark = if outcome.matched { "Match   " } else { "Mismatch" },
                query = outcome.query,
                score = outcome.score,
                computed = outcome.computed,
                expected = outcome.expected,
            );
        }
        println!();
    }

    println!("Total Queries Processed: {}", summary.total());
    println!("Matching Classifications: {}", summary.correct());
    println!("Accuracy: {:.1}%", summary.accuracy());
    Ok(())
}

fn run_bench(
    dictionary: &Path,
    config: &CliConfig,
    corpus_path: &Path,
    iterations: usize,
) -> Result<()> {
    let set = load_dictionary(dictionary)?;
    let corpus: Vec<String> = bench::load_corpus(corpus_path)?
        .iter()
        .map(|line| config.normalizer.apply(line))
        .collect();

    let automaton = MatchAutomaton::build(set.clone())?;
    let kmp = KmpGate::build(set.clone())?;
    let rabin_karp = RabinKarpGate::build(set)?;

    let outcomes = [
        bench::run("aho-corasick", &automaton, &corpus, iterations),
        bench::run("kmp", &kmp, &corpus, iterations),
        bench::run("rabin-karp", &rabin_karp, &corpus, iterations),
    ];

    println!(
        "Benchmarked {} matcher(s) over {} input(s), {} iteration(s) each",
        outcomes.len(),
        corpus.len(),
        iterations.max(1)
    );
    for outcome in &outcomes {
        println!(
            "- {name:<14} avg {avg:?}/scan, total {total:?}, flagged {flagged}/{inputs}",
            name = outcome.name,
            avg = outcome.avg_scan,
            total = outcome.total,
            flagged = outcome.flagged,
            inputs = outcome.inputs,
        );
    }
    Ok(())
}

fn load_dictionary(path: &Path) -> Result<PatternSet> {
    FileDictionary::new(path)
        .load()
        .with_context(|| format!("failed to load dictionary from {}", path.display()))
}

fn build_matcher(kind: MatcherKind, set: PatternSet) -> Result<Box<dyn SignatureMatcher>> {
    Ok(match kind {
        MatcherKind::Aho => Box::new(MatchAutomaton::build(set)?),
        MatcherKind::Kmp => Box::new(KmpGate::build(set)?),
        MatcherKind::RabinKarp => Box::new(RabinKarpGate::build(set)?),
    })
}

fn prepare_input(text: Option<String>, raw: bool, normalizer: &Normalizer) -> Result<String> {
    let input = match text {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read input from stdin")?;
            buffer.trim_end_matches(['\n', '\r']).to_string()
        }
    };
    if raw {
        Ok(input)
    } else {
        Ok(normalizer.apply(&input))
    }
}

fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };
    let settings = config::Config::builder()
        .add_source(config::File::from(path.to_path_buf()))
        .build()
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    settings
        .try_deserialize()
        .with_context(|| format!("invalid config structure in {}", path.display()))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}
