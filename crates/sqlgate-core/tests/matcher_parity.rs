use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use sqlgate_core::{
    FileDictionary, KmpGate, MatchAutomaton, Normalizer, PatternSet, RabinKarpGate,
    SignatureMatcher,
};

fn shipped_dictionary() -> PatternSet {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../dictionaries/sqli.txt");
    FileDictionary::new(path)
        .load()
        .expect("shipped dictionary should load")
}

fn sample_inputs() -> Vec<String> {
    let normalizer = Normalizer::default();
    [
        "1' OR '1'='1",
        "admin'--",
        "1; DROP TABLE users",
        "1 UNION/**/SELECT password FROM users",
        "<script>alert(1)</script>",
        "EXEC xp_cmdshell 'dir'",
        "hello world",
        "ordinary search phrase",
        "user@example.com",
        "",
    ]
    .iter()
    .map(|input| normalizer.apply(input))
    .collect()
}

fn matched_ids(matcher: &dyn SignatureMatcher, text: &str) -> Vec<usize> {
    let mut ids: Vec<usize> = matcher
        .scan(text)
        .matches
        .into_iter()
        .map(|hit| hit.pattern_id)
        .collect();
    ids.sort_unstable();
    ids
}

#[test]
fn all_matchers_agree_on_verdicts_and_match_sets() {
    let set = shipped_dictionary();
    let automaton = MatchAutomaton::build(set.clone()).unwrap();
    let kmp = KmpGate::build(set.clone()).unwrap();
    let rabin_karp = RabinKarpGate::build(set).unwrap();

    for input in sample_inputs() {
        let reference = matched_ids(&automaton, &input);
        assert_eq!(
            matched_ids(&kmp, &input),
            reference,
            "kmp disagreed on {input:?}"
        );
        assert_eq!(
            matched_ids(&rabin_karp, &input),
            reference,
            "rabin-karp disagreed on {input:?}"
        );

        let verdict = automaton.is_safe(&input);
        assert_eq!(verdict, reference.is_empty());
        assert_eq!(kmp.is_safe(&input), verdict);
        assert_eq!(rabin_karp.is_safe(&input), verdict);
    }
}

#[test]
fn shipped_dictionary_flags_classic_injections() {
    let automaton = MatchAutomaton::build(shipped_dictionary()).unwrap();
    let normalizer = Normalizer::default();

    assert!(!automaton.is_safe(&normalizer.apply("1' OR '1'='1")));
    assert!(!automaton.is_safe(&normalizer.apply("x'; DROP TABLE students;--")));
    assert!(!automaton.is_safe(&normalizer.apply("<script>alert('xss')</script>")));
    assert!(automaton.is_safe(&normalizer.apply("good morning")));
}

#[test]
fn every_dictionary_pattern_matches_itself() {
    let set = shipped_dictionary();
    let automaton = MatchAutomaton::build(set.clone()).unwrap();
    for (id, pattern) in set.iter() {
        let report = automaton.scan(&pattern.text);
        assert!(
            report.matches.iter().any(|hit| hit.pattern_id == id),
            "pattern {:?} did not match itself",
            pattern.text
        );
    }
}

#[test]
fn one_automaton_serves_concurrent_scans() {
    let automaton = Arc::new(MatchAutomaton::build(shipped_dictionary()).unwrap());
    let inputs = sample_inputs();

    let expected: Vec<bool> = inputs.iter().map(|input| automaton.is_safe(input)).collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let automaton = Arc::clone(&automaton);
            let inputs = inputs.clone();
            thread::spawn(move || {
                inputs
                    .iter()
                    .map(|input| automaton.is_safe(input))
                    .collect::<Vec<bool>>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
