//! Perfect discrimination tree for demodulator left-hand sides.
//!
//! Terms are flattened into preorder key sequences. Variables are numbered
//! by first occurrence, so `f(x, x)` and `f(y, y)` share a path while
//! `f(x, y)` does not. Retrieval walks the trie against the query term with
//! an explicit stack and checks repeated variables for identity against the
//! shared query subterms, so every entry it reports really matches.
//!
//! Each node also remembers the smallest standard weight of the rules below
//! it. An instance is never lighter than its pattern, so subtrees heavier
//! than the query are skipped.

use crate::error::{Result, TermIndexError};
use crate::logic::{Clause, ClauseId, ClausePos, Head, Side, SymbolId, TermBank, TermId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, trace};

/// Key type for a single node in the flattened preorder traversal of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PdKey {
    Sym(SymbolId),
    /// Variable, numbered by first occurrence in the indexed term
    Var(u32),
}

/// Rewrite rule reference stored in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DemodEntry {
    pub clause: ClauseId,
    pub literal: usize,
    pub side: Side,
}

/// Trie node. Nesting is as deep as the longest stored key, so drop, clone
/// and debug output work on explicit stacks.
struct PdNode {
    children: BTreeMap<PdKey, PdNode>,
    entries: Vec<DemodEntry>,
    min_weight: u64,
}

impl Default for PdNode {
    fn default() -> Self {
        PdNode {
            children: BTreeMap::new(),
            entries: Vec::new(),
            min_weight: u64::MAX,
        }
    }
}

impl Drop for PdNode {
    fn drop(&mut self) {
        let mut stack: Vec<PdNode> = std::mem::take(&mut self.children).into_values().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(std::mem::take(&mut node.children).into_values());
        }
    }
}

impl Clone for PdNode {
    fn clone(&self) -> Self {
        // Breadth-first list of nodes with the positions of their children,
        // then rebuilt from the back so every child is finished before its
        // parent.
        let mut order: Vec<&PdNode> = vec![self];
        let mut links: Vec<Vec<(PdKey, usize)>> = Vec::new();
        let mut i = 0;
        while i < order.len() {
            let node = order[i];
            let mut own = Vec::with_capacity(node.children.len());
            for (&key, child) in &node.children {
                own.push((key, order.len()));
                order.push(child);
            }
            links.push(own);
            i += 1;
        }

        let mut built: Vec<Option<PdNode>> = Vec::with_capacity(order.len());
        built.resize_with(order.len(), || None);
        for i in (0..order.len()).rev() {
            let mut node = PdNode {
                children: BTreeMap::new(),
                entries: order[i].entries.clone(),
                min_weight: order[i].min_weight,
            };
            for &(key, c) in &links[i] {
                if let Some(child) = built[c].take() {
                    node.children.insert(key, child);
                }
            }
            built[i] = Some(node);
        }
        built[0].take().unwrap_or_default()
    }
}

impl fmt::Debug for PdNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdNode")
            .field("children", &self.children.len())
            .field("entries", &self.entries)
            .field("min_weight", &self.min_weight)
            .finish()
    }
}

/// Flatten a term in preorder, numbering variables by first occurrence
pub fn flatten(bank: &TermBank, t: TermId) -> Vec<PdKey> {
    let mut keys = Vec::new();
    let mut vars = Vec::new();
    let mut stack = vec![t];
    while let Some(u) = stack.pop() {
        match bank.head(u) {
            Head::Var(x) => {
                let n = match vars.iter().position(|&y| y == x) {
                    Some(n) => n,
                    None => {
                        vars.push(x);
                        vars.len() - 1
                    }
                };
                keys.push(PdKey::Var(n as u32));
            }
            Head::Sym(f) => {
                keys.push(PdKey::Sym(f));
                stack.extend(bank.args(u).iter().rev().copied());
            }
        }
    }
    keys
}

/// Demodulator index
#[derive(Clone, Default)]
pub struct PdTree {
    root: PdNode,
    keys: HashMap<ClauseId, Vec<(DemodEntry, Vec<PdKey>)>>,
    entries: usize,
}

impl PdTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the side of an equation addressed by `pos` as a rewrite rule.
    ///
    /// `pos` must name the root of a side; deeper positions are rejected.
    pub fn insert(&mut self, bank: &TermBank, clause: &Clause, pos: &ClausePos) -> Result<()> {
        if !pos.path.is_empty() || pos.clause != clause.id {
            return Err(TermIndexError::InvalidPosition(format!(
                "{} does not address a side of clause {}",
                pos, clause.id
            )));
        }
        let lhs = pos.subterm(bank, clause)?;
        let weight = bank.standard_weight(lhs);
        let keys = flatten(bank, lhs);
        let entry = DemodEntry {
            clause: clause.id,
            literal: pos.literal,
            side: pos.side,
        };

        let mut node = &mut self.root;
        node.min_weight = node.min_weight.min(weight);
        for key in &keys {
            node = node.children.entry(*key).or_default();
            node.min_weight = node.min_weight.min(weight);
        }
        node.entries.push(entry);

        self.entries += 1;
        debug!(clause = %clause.id, literal = pos.literal, side = ?pos.side, weight, "demodulator insert");
        self.keys.entry(clause.id).or_default().push((entry, keys));
        Ok(())
    }

    /// Remove every entry contributed by a clause. Returns the number of
    /// entries removed.
    pub fn delete(&mut self, id: ClauseId) -> usize {
        let Some(list) = self.keys.remove(&id) else {
            return 0;
        };
        let mut removed = 0;
        for (entry, keys) in &list {
            removed += Self::remove_path(&mut self.root, keys, entry);
        }
        self.entries -= removed;
        debug!(clause = %id, removed, "demodulator delete");
        removed
    }

    /// Remove one entry and prune the branch it leaves empty. Minimal
    /// weights are left as they are.
    fn remove_path(root: &mut PdNode, keys: &[PdKey], entry: &DemodEntry) -> usize {
        let mut cut = 0;
        let mut node: &PdNode = root;
        for (depth, k) in keys.iter().enumerate() {
            if node.children.len() > 1 || !node.entries.is_empty() {
                cut = depth;
            }
            match node.children.get(k) {
                Some(child) => node = child,
                None => return 0,
            }
        }

        let mut leaf: &mut PdNode = root;
        for k in keys {
            match leaf.children.get_mut(k) {
                Some(child) => leaf = child,
                None => return 0,
            }
        }
        let Some(i) = leaf.entries.iter().position(|e| e == entry) else {
            return 0;
        };
        leaf.entries.swap_remove(i);
        if keys.is_empty() || !leaf.entries.is_empty() || !leaf.children.is_empty() {
            return 1;
        }

        let mut anchor: &mut PdNode = root;
        for k in &keys[..cut] {
            match anchor.children.get_mut(k) {
                Some(child) => anchor = child,
                None => return 1,
            }
        }
        anchor.children.remove(&keys[cut]);
        1
    }

    pub fn contains(&self, id: ClauseId) -> bool {
        self.keys.contains_key(&id)
    }

    /// Number of stored rules
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub(crate) fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.values());
        }
        count
    }

    /// Rules whose left side matches `term`.
    ///
    /// Computing the matcher and checking the ordering condition is up to
    /// the caller.
    pub fn query<'a>(&'a self, bank: &'a TermBank, term: TermId) -> DemodCandidates<'a> {
        let weight = bank.standard_weight(term);
        trace!(term = %bank.display(term), weight, "demodulator query");
        DemodCandidates {
            bank,
            weight,
            stack: vec![Frame {
                node: &self.root,
                todo: vec![term],
                bound: Vec::new(),
            }],
            pending: [].iter(),
        }
    }
}

impl fmt::Debug for PdTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdTree")
            .field("entries", &self.entries)
            .field("clauses", &self.keys.len())
            .field("nodes", &self.node_count())
            .finish()
    }
}

#[derive(Debug, Clone)]
struct Frame<'a> {
    node: &'a PdNode,
    /// Query subterms still to match, next on top
    todo: Vec<TermId>,
    /// Query subterms bound to the normalized pattern variables so far
    bound: Vec<Option<TermId>>,
}

/// Lazy result of `PdTree::query`
#[derive(Debug)]
pub struct DemodCandidates<'a> {
    bank: &'a TermBank,
    weight: u64,
    stack: Vec<Frame<'a>>,
    pending: std::slice::Iter<'a, DemodEntry>,
}

impl<'a> Iterator for DemodCandidates<'a> {
    type Item = DemodEntry;

    fn next(&mut self) -> Option<DemodEntry> {
        loop {
            if let Some(&entry) = self.pending.next() {
                return Some(entry);
            }
            let mut frame = self.stack.pop()?;
            let node = frame.node;
            if node.min_weight > self.weight {
                continue;
            }
            let Some(t) = frame.todo.pop() else {
                self.pending = node.entries.iter();
                continue;
            };

            for (key, child) in node.children.range(PdKey::Var(0)..) {
                let PdKey::Var(n) = *key else { continue };
                let n = n as usize;
                match frame.bound.get(n).copied().flatten() {
                    Some(u) if u != t => continue,
                    Some(_) => self.stack.push(Frame {
                        node: child,
                        todo: frame.todo.clone(),
                        bound: frame.bound.clone(),
                    }),
                    None => {
                        let mut bound = frame.bound.clone();
                        if n >= bound.len() {
                            bound.resize(n + 1, None);
                        }
                        bound[n] = Some(t);
                        self.stack.push(Frame {
                            node: child,
                            todo: frame.todo.clone(),
                            bound,
                        });
                    }
                }
            }

            if let Head::Sym(f) = self.bank.head(t) {
                if let Some(child) = node.children.get(&PdKey::Sym(f)) {
                    frame.todo.extend(self.bank.args(t).iter().rev().copied());
                    self.stack.push(Frame {
                        node: child,
                        todo: frame.todo,
                        bound: frame.bound,
                    });
                }
            }
        }
    }
}
