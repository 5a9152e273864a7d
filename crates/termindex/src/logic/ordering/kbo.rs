//! Linear Knuth-Bendix ordering
//!
//! `compare` decides `s ? t` in one pass over both terms. A signed weight
//! balance and a per-variable occurrence balance are accumulated while the
//! terms are walked (left side added, right side subtracted). Two counters
//! track how many variables currently have a positive and a negative
//! balance, which makes the variable condition an O(1) test:
//! `s > t` needs no negative variable, `s < t` needs no positive one.
//!
//! Pairs with equal heads are compared lexicographically on an explicit frame
//! stack. Once the first non-equal argument pair is decided, the remaining
//! arguments are only walked to finish the balances. Arguments before it
//! are equal and cancel out, so at every frame the balances describe exactly
//! the pair that frame compares.

use super::{CompareResult, Ocb};
use crate::logic::core::term::{Bindings, DerefMode, Head, TermBank, TermId};
use crate::logic::interner::VariableId;
use std::collections::HashMap;
use tracing::error;

/// One lexicographic comparison in progress
#[derive(Debug, Clone, Copy)]
struct LexFrame {
    s: TermId,
    t: TermId,
    /// Deref modes for the arguments
    ds: DerefMode,
    dt: DerefMode,
    /// Next argument index to open
    arg: usize,
    /// First non-equal argument result, `Equal` so far otherwise
    lex: CompareResult,
}

enum Step {
    Done(CompareResult),
    Descend(LexFrame),
}

/// Comparison workspace, neutral between calls
#[derive(Debug, Default)]
struct Scratch {
    weight_balance: i64,
    /// Non-zero variable balances only
    var_balance: HashMap<VariableId, i64>,
    pos_bal: usize,
    neg_bal: usize,
    frames: Vec<LexFrame>,
    walk: Vec<(TermId, DerefMode)>,
}

impl Scratch {
    fn add(&mut self, x: VariableId, delta: i64) {
        let before = self.var_balance.get(&x).copied().unwrap_or(0);
        let after = before + delta;
        match before.cmp(&0) {
            std::cmp::Ordering::Greater => self.pos_bal -= 1,
            std::cmp::Ordering::Less => self.neg_bal -= 1,
            std::cmp::Ordering::Equal => {}
        }
        match after.cmp(&0) {
            std::cmp::Ordering::Greater => self.pos_bal += 1,
            std::cmp::Ordering::Less => self.neg_bal += 1,
            std::cmp::Ordering::Equal => {}
        }
        if after == 0 {
            self.var_balance.remove(&x);
        } else {
            self.var_balance.insert(x, after);
        }
    }

    fn inc(&mut self, x: VariableId) {
        self.add(x, 1);
    }

    fn dec(&mut self, x: VariableId) {
        self.add(x, -1);
    }

    fn is_neutral(&self) -> bool {
        self.weight_balance == 0 && self.pos_bal == 0 && self.neg_bal == 0
    }

    fn reset(&mut self) {
        self.var_balance.clear();
        self.weight_balance = 0;
        self.pos_bal = 0;
        self.neg_bal = 0;
        self.frames.clear();
        self.walk.clear();
    }
}

#[cold]
fn fatal(msg: &str) -> ! {
    error!(msg, "inconsistent KBO state");
    panic!("inconsistent KBO state: {}", msg);
}

/// Knuth-Bendix ordering over a fixed `Ocb`
#[derive(Debug)]
pub struct Kbo {
    ocb: Ocb,
    scratch: Scratch,
}

impl Kbo {
    pub fn new(ocb: Ocb) -> Self {
        Kbo {
            ocb,
            scratch: Scratch::default(),
        }
    }

    pub fn ocb(&self) -> &Ocb {
        &self.ocb
    }

    /// Compare two terms without bindings
    pub fn compare(&mut self, bank: &TermBank, s: TermId, t: TermId) -> CompareResult {
        self.compare_bound(bank, &Bindings::new(), s, t, DerefMode::Never, DerefMode::Never)
    }

    /// Compare `s` and `t` read through `bindings`
    pub fn compare_bound(
        &mut self,
        bank: &TermBank,
        bindings: &Bindings,
        s: TermId,
        t: TermId,
        ds: DerefMode,
        dt: DerefMode,
    ) -> CompareResult {
        let mut step = self.open_pair(bank, bindings, s, t, ds, dt);
        let result = loop {
            match step {
                Step::Descend(frame) => self.scratch.frames.push(frame),
                Step::Done(r) => match self.scratch.frames.last_mut() {
                    None => break r,
                    Some(frame) => {
                        if frame.lex == CompareResult::Equal {
                            frame.lex = r;
                        }
                    }
                },
            }
            step = self.advance(bank, bindings);
        };

        if result == CompareResult::Equal && !self.scratch.is_neutral() {
            fatal("equal terms left a non-zero balance");
        }
        self.scratch.reset();
        result
    }

    /// `compare(s, t) == Greater` without bindings
    pub fn greater(&mut self, bank: &TermBank, s: TermId, t: TermId) -> bool {
        self.greater_bound(bank, &Bindings::new(), s, t, DerefMode::Never, DerefMode::Never)
    }

    /// Fast check for `s > t` read through `bindings`.
    ///
    /// Walks `s` positively and then `t` negatively, giving up as soon as
    /// the weight balance or a variable balance turns negative.
    pub fn greater_bound(
        &mut self,
        bank: &TermBank,
        bindings: &Bindings,
        s: TermId,
        t: TermId,
        ds: DerefMode,
        dt: DerefMode,
    ) -> bool {
        let (s, ds) = bank.deref(s, bindings, ds);
        let (t, dt) = bank.deref(t, bindings, dt);
        if s == t && (ds == dt || bank.is_ground(s)) {
            return false;
        }
        match (bank.head(s), bank.head(t)) {
            (Head::Var(_), _) => return false,
            (Head::Sym(_), Head::Var(y)) => return bank.occurs_bound(y, s, bindings, ds),
            _ => {}
        }

        self.walk(bank, bindings, s, ds, true, None, false);
        let greater = match self.walk(bank, bindings, t, dt, false, None, true) {
            None => false,
            Some(_) if self.scratch.weight_balance > 0 => true,
            Some(_) => {
                // Equal weight and the variable condition holds
                self.scratch.reset();
                match (bank.head(s), bank.head(t)) {
                    (Head::Sym(f), Head::Sym(g)) if f != g => {
                        self.ocb.precedence(f, g) == CompareResult::Greater
                    }
                    _ => {
                        let mut res = CompareResult::Equal;
                        for (&si, &ti) in bank.args(s).iter().zip(bank.args(t)) {
                            res = self.compare_bound(bank, bindings, si, ti, ds, dt);
                            if res != CompareResult::Equal {
                                break;
                            }
                        }
                        res == CompareResult::Greater
                    }
                }
            }
        };
        self.scratch.reset();
        greater
    }

    /// Start comparing one pair: decide it outright or open a lex frame
    fn open_pair(
        &mut self,
        bank: &TermBank,
        bindings: &Bindings,
        s: TermId,
        t: TermId,
        ds: DerefMode,
        dt: DerefMode,
    ) -> Step {
        let (s, ds) = bank.deref(s, bindings, ds);
        let (t, dt) = bank.deref(t, bindings, dt);
        if s == t && (ds == dt || bank.is_ground(s)) {
            return Step::Done(CompareResult::Equal);
        }

        let vw = self.ocb.var_weight();
        match (bank.head(s), bank.head(t)) {
            (Head::Var(x), Head::Var(y)) => {
                if x == y {
                    return Step::Done(CompareResult::Equal);
                }
                self.scratch.inc(x);
                self.scratch.dec(y);
                Step::Done(CompareResult::Uncomparable)
            }
            (Head::Var(x), Head::Sym(_)) => {
                self.scratch.inc(x);
                self.scratch.weight_balance += vw;
                let occurs = self.walk(bank, bindings, t, dt, false, Some(x), false);
                Step::Done(if occurs == Some(true) {
                    CompareResult::Lesser
                } else {
                    CompareResult::Uncomparable
                })
            }
            (Head::Sym(_), Head::Var(y)) => {
                self.scratch.dec(y);
                self.scratch.weight_balance -= vw;
                let occurs = self.walk(bank, bindings, s, ds, true, Some(y), false);
                Step::Done(if occurs == Some(true) {
                    CompareResult::Greater
                } else {
                    CompareResult::Uncomparable
                })
            }
            (Head::Sym(f), Head::Sym(g)) if f == g => {
                if bank.args(s).is_empty() {
                    return Step::Done(CompareResult::Equal);
                }
                Step::Descend(LexFrame {
                    s,
                    t,
                    ds,
                    dt,
                    arg: 0,
                    lex: CompareResult::Equal,
                })
            }
            (Head::Sym(f), Head::Sym(g)) => {
                self.walk(bank, bindings, s, ds, true, None, false);
                self.walk(bank, bindings, t, dt, false, None, false);
                Step::Done(self.decide(self.ocb.precedence(f, g)))
            }
        }
    }

    /// Continue the innermost lex frame
    fn advance(&mut self, bank: &TermBank, bindings: &Bindings) -> Step {
        let frame = match self.scratch.frames.last_mut() {
            Some(frame) => frame,
            None => fatal("advance without an open frame"),
        };
        let args_s = bank.args(frame.s);
        let args_t = bank.args(frame.t);
        if args_s.len() != args_t.len() {
            fatal("lex frame over different arities");
        }

        if frame.lex == CompareResult::Equal && frame.arg < args_s.len() {
            let i = frame.arg;
            frame.arg += 1;
            let (ds, dt) = (frame.ds, frame.dt);
            return self.open_pair(bank, bindings, args_s[i], args_t[i], ds, dt);
        }

        let frame = *frame;
        self.scratch.frames.pop();
        for i in frame.arg..args_s.len() {
            self.walk(bank, bindings, args_s[i], frame.ds, true, None, false);
            self.walk(bank, bindings, args_t[i], frame.dt, false, None, false);
        }
        Step::Done(self.decide(frame.lex))
    }

    /// Final verdict for a pair from the balances and a tiebreak for the
    /// equal-weight case
    fn decide(&self, tiebreak: CompareResult) -> CompareResult {
        let sc = &self.scratch;
        let greater_ok = sc.neg_bal == 0;
        let lesser_ok = sc.pos_bal == 0;
        match sc.weight_balance.cmp(&0) {
            std::cmp::Ordering::Greater if greater_ok => CompareResult::Greater,
            std::cmp::Ordering::Less if lesser_ok => CompareResult::Lesser,
            std::cmp::Ordering::Equal => match tiebreak {
                CompareResult::Greater if greater_ok => CompareResult::Greater,
                CompareResult::Lesser if lesser_ok => CompareResult::Lesser,
                CompareResult::Equal => CompareResult::Equal,
                _ => CompareResult::Uncomparable,
            },
            _ => CompareResult::Uncomparable,
        }
    }

    /// Add (`positive`) or subtract the weight and variables of `t`.
    ///
    /// Returns whether `watch` was met, or `None` if `bounded` and a balance
    /// went negative.
    #[allow(clippy::too_many_arguments)]
    fn walk(
        &mut self,
        bank: &TermBank,
        bindings: &Bindings,
        t: TermId,
        mode: DerefMode,
        positive: bool,
        watch: Option<VariableId>,
        bounded: bool,
    ) -> Option<bool> {
        let vw = self.ocb.var_weight();
        let mut watched = false;
        let sc = &mut self.scratch;
        sc.walk.clear();
        sc.walk.push((t, mode));
        while let Some((u, m)) = sc.walk.pop() {
            let (u, m) = bank.deref(u, bindings, m);
            match bank.head(u) {
                Head::Var(x) => {
                    if positive {
                        sc.inc(x);
                        sc.weight_balance += vw;
                    } else {
                        sc.dec(x);
                        sc.weight_balance -= vw;
                    }
                    watched |= watch == Some(x);
                }
                Head::Sym(f) => {
                    let w = self.ocb.weight(f);
                    sc.weight_balance += if positive { w } else { -w };
                    sc.walk.extend(bank.args(u).iter().rev().map(|&a| (a, m)));
                }
            }
            if bounded && (sc.neg_bal > 0 || sc.weight_balance < 0) {
                sc.walk.clear();
                return None;
            }
        }
        Some(watched)
    }
}
