pub mod matcher;
pub mod normalize;
pub mod report;

pub use matcher::{
    automaton::MatchAutomaton, dictionary::FileDictionary, kmp::KmpGate,
    rabin_karp::RabinKarpGate, BuildError, BuildOptions, MatchReport, Pattern, PatternHit,
    PatternSet, PatternSetError, RiskLabel, RiskThresholds, SignatureMatcher, Span,
    DEFAULT_WEIGHT,
};
pub use normalize::Normalizer;
