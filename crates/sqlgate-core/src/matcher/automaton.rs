use std::collections::{HashMap, VecDeque};

use tracing::{debug, trace};

use super::{
    BuildError, BuildOptions, MatchReport, PatternHit, PatternSet, RiskThresholds,
    SignatureMatcher,
};

type NodeId = u32;

const ROOT: NodeId = 0;

/// One trie node in the automaton arena.
///
/// `failure` is a non-owning arena index: it points at the node spelled by
/// the longest proper suffix of this node's path that is also a path from
/// the root. `outputs` holds every pattern id that terminates here or at
/// any node reachable by following failure links, so the scan never has to
/// walk the failure chain to collect matches.
#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<u8, NodeId>,
    failure: NodeId,
    outputs: Vec<u32>,
}

/// Multi-pattern matching automaton built once from a [`PatternSet`].
///
/// Immutable after construction; scanning takes `&self` and keeps its
/// cursor on the stack, so one automaton can serve concurrent scans.
#[derive(Debug)]
pub struct MatchAutomaton {
    nodes: Vec<TrieNode>,
    set: PatternSet,
}

impl MatchAutomaton {
    /// Build an automaton with the default policy: an empty pattern set
    /// yields a degenerate automaton that matches nothing.
    pub fn build(set: PatternSet) -> Result<Self, BuildError> {
        Self::build_with(set, &BuildOptions::default())
    }

    /// Build an automaton with explicit construction options.
    pub fn build_with(set: PatternSet, options: &BuildOptions) -> Result<Self, BuildError> {
        if options.reject_empty && set.is_empty() {
            return Err(BuildError::EmptySet);
        }

        let mut nodes = vec![TrieNode::default()];
        for (id, pattern) in set.iter() {
            let terminal = insert_path(&mut nodes, pattern.text.as_bytes());
            nodes[terminal as usize].outputs.push(id as u32);
        }
        link_failures(&mut nodes);

        debug!(
            patterns = set.len(),
            nodes = nodes.len(),
            "match automaton built"
        );
        Ok(Self { nodes, set })
    }

    /// Number of distinct patterns the automaton recognizes.
    pub fn pattern_count(&self) -> usize {
        self.set.len()
    }

    /// Advance the cursor by one input byte, following failure links until
    /// a transition exists or the root terminates the chain.
    fn step(&self, mut current: NodeId, byte: u8) -> NodeId {
        while current != ROOT && !self.nodes[current as usize].children.contains_key(&byte) {
            current = self.nodes[current as usize].failure;
        }
        match self.nodes[current as usize].children.get(&byte) {
            Some(&next) => next,
            None => current,
        }
    }
}

/// Walk `path` from the root, creating missing nodes, returning the final node.
fn insert_path(nodes: &mut Vec<TrieNode>, path: &[u8]) -> NodeId {
    let mut current = ROOT;
    for &byte in path {
        current = match nodes[current as usize].children.get(&byte) {
            Some(&next) => next,
            None => {
                let next = nodes.len() as NodeId;
                nodes.push(TrieNode::default());
                nodes[current as usize].children.insert(byte, next);
                next
            }
        };
    }
    current
}

/// Breadth-first failure-link computation.
///
/// Invariant on completion: the root's failure link is itself, and every
/// other node's failure link is the node spelled by the longest proper
/// suffix of its path that is also a root path. Nodes are enqueued only
/// after their own failure link is assigned, so each node's failure target
/// is fully resolved (including its output set) before being referenced.
fn link_failures(nodes: &mut Vec<TrieNode>) {
    let mut queue = VecDeque::new();

    let depth_one: Vec<NodeId> = nodes[ROOT as usize].children.values().copied().collect();
    for node in depth_one {
        nodes[node as usize].failure = ROOT;
        queue.push_back(node);
    }

    while let Some(current) = queue.pop_front() {
        let edges: Vec<(u8, NodeId)> = nodes[current as usize]
            .children
            .iter()
            .map(|(&byte, &child)| (byte, child))
            .collect();

        for (byte, child) in edges {
            let mut candidate = nodes[current as usize].failure;
            while candidate != ROOT && !nodes[candidate as usize].children.contains_key(&byte) {
                candidate = nodes[candidate as usize].failure;
            }
            let failure = match nodes[candidate as usize].children.get(&byte) {
                Some(&target) if target != child => target,
                _ => ROOT,
            };
            nodes[child as usize].failure = failure;

            let inherited = nodes[failure as usize].outputs.clone();
            nodes[child as usize].outputs.extend(inherited);
            queue.push_back(child);
        }
    }
}

impl SignatureMatcher for MatchAutomaton {
    fn scan_with_thresholds(&self, text: &str, thresholds: &RiskThresholds) -> MatchReport {
        let mut current = ROOT;
        let mut seen = vec![false; self.set.len()];
        let mut hits = Vec::new();

        for (position, byte) in text.bytes().enumerate() {
            current = self.step(current, byte);
            for &id in &self.nodes[current as usize].outputs {
                let id = id as usize;
                if seen[id] {
                    continue;
                }
                seen[id] = true;
                let pattern = &self.set.patterns()[id];
                let end = position + 1;
                trace!(pattern = %pattern.text, end, "pattern surfaced");
                hits.push(PatternHit {
                    pattern_id: id,
                    pattern: pattern.text.clone(),
                    weight: pattern.weight,
                    span: (end - pattern.text.len(), end),
                });
            }
        }

        MatchReport::from_hits(hits, text.len(), thresholds)
    }

    fn is_safe(&self, text: &str) -> bool {
        let mut current = ROOT;
        for byte in text.bytes() {
            current = self.step(current, byte);
            if !self.nodes[current as usize].outputs.is_empty() {
                return false;
            }
        }
        true
    }
}
