//! Maximally shared terms
//!
//! Every term lives in a `TermBank` arena and is identified by a copyable
//! `TermId`. Cells are hash-consed on `(head, argument ids)`, so two terms
//! are syntactically equal iff their ids are equal. Unreachable cells are
//! reclaimed by `collect_garbage`, an epoch-based mark/sweep over the
//! clauses the caller still holds.

use crate::config::StandardWeights;
use crate::error::{Result, TermIndexError};
use crate::logic::core::clause::Clause;
use crate::logic::interner::{Signature, SymbolId, VariableId};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Handle of a term cell in a `TermBank`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(pub(crate) u32);

impl TermId {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Top symbol of a term
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Head {
    Var(VariableId),
    Sym(SymbolId),
}

/// How far to follow variable bindings when reading a term.
///
/// `Once` follows a single binding and then continues below it without
/// dereferencing, which is what rewriting with a matcher needs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DerefMode {
    Never,
    Once,
    Always,
}

#[derive(Debug, Clone)]
struct TermCell {
    head: Head,
    args: Box<[TermId]>,
    weight: u64,
    ground: bool,
    epoch: u32,
    live: bool,
}

/// Variable bindings consulted by `TermBank::deref`
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    map: HashMap<VariableId, TermId>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, var: VariableId, term: TermId) {
        self.map.insert(var, term);
    }

    pub fn unbind(&mut self, var: VariableId) {
        self.map.remove(&var);
    }

    pub fn get(&self, var: VariableId) -> Option<TermId> {
        self.map.get(&var).copied()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Arena of shared term cells plus the signature they are built over
#[derive(Debug, Clone)]
pub struct TermBank {
    signature: Signature,
    weights: StandardWeights,
    cells: Vec<TermCell>,
    table: HashMap<(Head, Box<[TermId]>), TermId>,
    free: Vec<TermId>,
    epoch: u32,
    true_term: TermId,
}

impl TermBank {
    /// Create an empty bank. Fails if `weights` would make an instance
    /// lighter than its pattern.
    pub fn new(signature: Signature, weights: StandardWeights) -> Result<Self> {
        weights.validate()?;
        let mut bank = TermBank {
            signature,
            weights,
            cells: Vec::new(),
            table: HashMap::new(),
            free: Vec::new(),
            epoch: 0,
            true_term: TermId(0),
        };
        bank.true_term = bank.intern(Head::Sym(SymbolId::TRUE), Vec::new());
        Ok(bank)
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Mutable access for declaring symbols after the bank exists.
    ///
    /// An `Ocb` only knows the symbols declared when it was built; comparing
    /// a term over a later symbol is fatal. Rebuild the ordering first.
    pub fn signature_mut(&mut self) -> &mut Signature {
        &mut self.signature
    }

    pub fn standard_weights(&self) -> StandardWeights {
        self.weights
    }

    /// The `$true` constant
    pub fn true_term(&self) -> TermId {
        self.true_term
    }

    // === Construction ===

    pub fn var(&mut self, n: u32) -> TermId {
        self.intern(Head::Var(VariableId(n)), Vec::new())
    }

    /// Build `f(args)`, checking the arity of `f`
    pub fn app(&mut self, f: SymbolId, args: &[TermId]) -> Result<TermId> {
        let arity = self.signature.arity(f);
        if arity != args.len() {
            return Err(TermIndexError::ArityMismatch {
                symbol: self.signature.name(f).to_string(),
                expected: arity,
                found: args.len(),
            });
        }
        Ok(self.intern(Head::Sym(f), args.to_vec()))
    }

    pub fn constant(&mut self, c: SymbolId) -> Result<TermId> {
        self.app(c, &[])
    }

    fn intern(&mut self, head: Head, args: Vec<TermId>) -> TermId {
        let key = (head, args.into_boxed_slice());
        if let Some(&id) = self.table.get(&key) {
            return id;
        }
        let (weight, ground) = match head {
            Head::Var(_) => (self.weights.variable, false),
            Head::Sym(_) => key.1.iter().fold((self.weights.function, true), |(w, g), &a| {
                let cell = &self.cells[a.index()];
                (w + cell.weight, g && cell.ground)
            }),
        };
        let cell = TermCell {
            head,
            args: key.1.clone(),
            weight,
            ground,
            epoch: self.epoch,
            live: true,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.cells[id.index()] = cell;
                id
            }
            None => {
                self.cells.push(cell);
                TermId((self.cells.len() - 1) as u32)
            }
        };
        self.table.insert(key, id);
        id
    }

    // === Accessors ===

    fn cell(&self, t: TermId) -> &TermCell {
        &self.cells[t.index()]
    }

    pub fn head(&self, t: TermId) -> Head {
        self.cell(t).head
    }

    pub fn args(&self, t: TermId) -> &[TermId] {
        &self.cell(t).args
    }

    pub fn symbol(&self, t: TermId) -> Option<SymbolId> {
        match self.cell(t).head {
            Head::Sym(f) => Some(f),
            Head::Var(_) => None,
        }
    }

    pub fn var_id(&self, t: TermId) -> Option<VariableId> {
        match self.cell(t).head {
            Head::Var(x) => Some(x),
            Head::Sym(_) => None,
        }
    }

    pub fn is_var(&self, t: TermId) -> bool {
        matches!(self.cell(t).head, Head::Var(_))
    }

    /// Addressing weight: function units plus variable units
    pub fn standard_weight(&self, t: TermId) -> u64 {
        self.cell(t).weight
    }

    pub fn is_ground(&self, t: TermId) -> bool {
        self.cell(t).ground
    }

    /// Follow a path of argument indices
    pub fn subterm(&self, t: TermId, path: &[usize]) -> Option<TermId> {
        let mut cur = t;
        for &i in path {
            cur = *self.args(cur).get(i)?;
        }
        Some(cur)
    }

    /// Check whether variable `x` occurs in `t`
    pub fn occurs(&self, x: VariableId, t: TermId) -> bool {
        let mut stack = vec![t];
        while let Some(u) = stack.pop() {
            let cell = self.cell(u);
            if cell.ground {
                continue;
            }
            match cell.head {
                Head::Var(y) if y == x => return true,
                Head::Var(_) => {}
                Head::Sym(_) => stack.extend(cell.args.iter().copied()),
            }
        }
        false
    }

    /// Check whether variable `x` occurs in `t` read through `bindings`
    pub fn occurs_bound(
        &self,
        x: VariableId,
        t: TermId,
        bindings: &Bindings,
        mode: DerefMode,
    ) -> bool {
        let mut stack = vec![(t, mode)];
        while let Some((u, m)) = stack.pop() {
            let (u, m) = self.deref(u, bindings, m);
            let cell = self.cell(u);
            if cell.ground {
                continue;
            }
            match cell.head {
                Head::Var(y) if y == x => return true,
                Head::Var(_) => {}
                Head::Sym(_) => stack.extend(cell.args.iter().map(|&a| (a, m))),
            }
        }
        false
    }

    /// Resolve `t` through `bindings` as far as `mode` allows.
    ///
    /// Returns the term reached and the mode that applies to its arguments.
    pub fn deref(&self, t: TermId, bindings: &Bindings, mode: DerefMode) -> (TermId, DerefMode) {
        match mode {
            DerefMode::Never => (t, DerefMode::Never),
            DerefMode::Once => match self.var_id(t).and_then(|x| bindings.get(x)) {
                Some(u) => (u, DerefMode::Never),
                None => (t, DerefMode::Once),
            },
            DerefMode::Always => {
                let mut cur = t;
                while let Some(u) = self.var_id(cur).and_then(|x| bindings.get(x)) {
                    cur = u;
                }
                (cur, DerefMode::Always)
            }
        }
    }

    /// Apply `bindings` exhaustively, building the instance in the bank
    pub fn instantiate(&mut self, t: TermId, bindings: &Bindings) -> TermId {
        enum Step {
            Enter(TermId),
            Build(SymbolId, usize),
        }

        let mut work = vec![Step::Enter(t)];
        let mut built: Vec<TermId> = Vec::new();
        while let Some(step) = work.pop() {
            match step {
                Step::Enter(u) => {
                    let (u, _) = self.deref(u, bindings, DerefMode::Always);
                    let cell = self.cell(u);
                    match cell.head {
                        Head::Sym(f) if !cell.ground => {
                            work.push(Step::Build(f, cell.args.len()));
                            for &a in cell.args.iter().rev() {
                                work.push(Step::Enter(a));
                            }
                        }
                        _ => built.push(u),
                    }
                }
                Step::Build(f, n) => {
                    let args = built.split_off(built.len() - n);
                    let id = self.intern(Head::Sym(f), args);
                    built.push(id);
                }
            }
        }
        built.pop().unwrap_or(t)
    }

    // === Garbage collection ===

    /// Number of live cells
    pub fn len(&self) -> usize {
        self.cells.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free every cell not reachable from `live` clauses.
    ///
    /// All `TermId`s not reachable from those clauses become dangling and
    /// may be reused by later constructions. Returns the number of cells freed.
    pub fn collect_garbage<'a, I>(&mut self, live: I) -> usize
    where
        I: IntoIterator<Item = &'a Clause>,
    {
        self.epoch = self.epoch.wrapping_add(1);
        let epoch = self.epoch;

        let mut stack: Vec<TermId> = vec![self.true_term];
        for clause in live {
            stack.extend(clause.term_roots());
        }
        while let Some(t) = stack.pop() {
            let cell = &mut self.cells[t.index()];
            if cell.epoch == epoch {
                continue;
            }
            cell.epoch = epoch;
            stack.extend(cell.args.iter().copied());
        }

        let mut freed = 0;
        for i in 0..self.cells.len() {
            let cell = &mut self.cells[i];
            if cell.live && cell.epoch != epoch {
                cell.live = false;
                let key = (cell.head, std::mem::take(&mut cell.args));
                self.table.remove(&key);
                self.free.push(TermId(i as u32));
                freed += 1;
            }
        }
        debug!(freed, live = self.len(), "term bank collected");
        freed
    }

    /// Format a term with symbol names
    pub fn display(&self, t: TermId) -> TermDisplay<'_> {
        TermDisplay { bank: self, term: t }
    }
}

/// Display wrapper for a term that resolves symbol names
pub struct TermDisplay<'a> {
    bank: &'a TermBank,
    term: TermId,
}

enum Piece {
    Term(TermId),
    Text(&'static str),
}

impl<'a> fmt::Display for TermDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bank = self.bank;
        let mut stack = vec![Piece::Term(self.term)];
        while let Some(piece) = stack.pop() {
            let t = match piece {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Piece::Term(t) => t,
            };
            match bank.head(t) {
                Head::Var(x) => write!(f, "{}", x)?,
                Head::Sym(s) => {
                    f.write_str(bank.signature.name(s))?;
                    let args = bank.args(t);
                    if !args.is_empty() {
                        f.write_str("(")?;
                        stack.push(Piece::Text(")"));
                        for (i, &arg) in args.iter().enumerate().rev() {
                            stack.push(Piece::Term(arg));
                            if i > 0 {
                                stack.push(Piece::Text(","));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::core::clause::ClauseId;
    use crate::logic::core::literal::Literal;

    struct TestCtx {
        bank: TermBank,
    }

    impl TestCtx {
        fn new() -> Self {
            let mut sig = Signature::new();
            sig.add_symbol("a", 0).unwrap();
            sig.add_symbol("b", 0).unwrap();
            sig.add_symbol("f", 2).unwrap();
            sig.add_symbol("g", 1).unwrap();
            TestCtx {
                bank: TermBank::new(sig, StandardWeights::default()).unwrap(),
            }
        }

        fn sym(&self, name: &str) -> SymbolId {
            self.bank.signature().get(name).unwrap()
        }

        fn c(&mut self, name: &str) -> TermId {
            let s = self.sym(name);
            self.bank.constant(s).unwrap()
        }

        fn f(&mut self, name: &str, args: &[TermId]) -> TermId {
            let s = self.sym(name);
            self.bank.app(s, args).unwrap()
        }
    }

    #[test]
    fn test_hash_consing() {
        let mut ctx = TestCtx::new();
        let a = ctx.c("a");
        let x = ctx.bank.var(0);
        let t1 = ctx.f("f", &[a, x]);
        let t2 = ctx.f("f", &[a, x]);
        let t3 = ctx.f("f", &[x, a]);
        assert_eq!(t1, t2);
        assert_ne!(t1, t3);
        assert_eq!(ctx.bank.var(0), x);
    }

    #[test]
    fn test_arity_checked() {
        let mut ctx = TestCtx::new();
        let a = ctx.c("a");
        let f = ctx.sym("f");
        assert!(matches!(
            ctx.bank.app(f, &[a]),
            Err(TermIndexError::ArityMismatch { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn test_weight_and_ground() {
        let mut ctx = TestCtx::new();
        let a = ctx.c("a");
        let x = ctx.bank.var(3);
        let gx = ctx.f("g", &[x]);
        let t = ctx.f("f", &[a, gx]);
        // f, a, g are function units (2 each), x is a variable unit (1)
        assert_eq!(ctx.bank.standard_weight(t), 7);
        assert!(ctx.bank.is_ground(a));
        assert!(!ctx.bank.is_ground(t));
        assert_eq!(ctx.bank.subterm(t, &[1, 0]), Some(x));
        assert_eq!(ctx.bank.subterm(t, &[2]), None);
        assert!(ctx.bank.occurs(VariableId(3), t));
        assert!(!ctx.bank.occurs(VariableId(4), t));
    }

    #[test]
    fn test_deref_modes() {
        let mut ctx = TestCtx::new();
        let a = ctx.c("a");
        let x = ctx.bank.var(0);
        let y = ctx.bank.var(1);
        let mut b = Bindings::new();
        b.bind(VariableId(0), y);
        b.bind(VariableId(1), a);

        assert_eq!(ctx.bank.deref(x, &b, DerefMode::Never), (x, DerefMode::Never));
        assert_eq!(ctx.bank.deref(x, &b, DerefMode::Once), (y, DerefMode::Never));
        assert_eq!(ctx.bank.deref(x, &b, DerefMode::Always), (a, DerefMode::Always));
        assert_eq!(ctx.bank.deref(a, &b, DerefMode::Once), (a, DerefMode::Once));
    }

    #[test]
    fn test_instantiate() {
        let mut ctx = TestCtx::new();
        let a = ctx.c("a");
        let x = ctx.bank.var(0);
        let y = ctx.bank.var(1);
        let gy = ctx.f("g", &[y]);
        let t = ctx.f("f", &[x, gy]);
        let mut b = Bindings::new();
        b.bind(VariableId(0), gy);
        b.bind(VariableId(1), a);

        let inst = ctx.bank.instantiate(t, &b);
        let ga = ctx.f("g", &[a]);
        let expected = ctx.f("f", &[ga, ga]);
        assert_eq!(inst, expected);
        assert!(ctx.bank.is_ground(inst));
        assert!(ctx.bank.occurs_bound(VariableId(1), t, &Bindings::new(), DerefMode::Always));
        assert!(!ctx.bank.occurs_bound(VariableId(1), t, &b, DerefMode::Always));
    }

    #[test]
    fn test_collect_garbage() {
        let mut ctx = TestCtx::new();
        let a = ctx.c("a");
        let b = ctx.c("b");
        let ga = ctx.f("g", &[a]);
        let gb = ctx.f("g", &[b]);
        let kept = ctx.f("f", &[ga, a]);
        ctx.f("f", &[gb, gb]);

        let clause = Clause::new(
            ClauseId(0),
            vec![Literal::equation(true, kept, a)],
            &ctx.bank,
        );
        let before = ctx.bank.len();
        let freed = ctx.bank.collect_garbage([&clause]);
        // b, g(b) and f(g(b),g(b)) are unreachable
        assert_eq!(freed, 3);
        assert_eq!(ctx.bank.len(), before - 3);
        assert_eq!(ctx.bank.display(kept).to_string(), "f(g(a),a)");

        // Rebuilding reuses freed slots and yields a consistent term
        let b2 = ctx.c("b");
        let gb2 = ctx.f("g", &[b2]);
        assert_eq!(ctx.bank.args(gb2), &[b2]);
        assert_eq!(ctx.bank.len(), before - 1);
    }

    #[test]
    fn test_display_of_deep_term() {
        let mut ctx = TestCtx::new();
        let a = ctx.c("a");
        let x = ctx.bank.var(2);
        let t = ctx.f("f", &[x, a]);
        assert_eq!(ctx.bank.display(t).to_string(), format!("f({},a)", VariableId(2)));

        let mut deep = a;
        for _ in 0..200_000 {
            deep = ctx.f("g", &[deep]);
        }
        let text = ctx.bank.display(deep).to_string();
        assert_eq!(text.len(), 200_000 * 3 + 1);
        assert!(text.starts_with("g(g("));
        assert!(text.ends_with("a))"));
    }

    #[test]
    fn test_bindings_are_sparse() {
        let mut ctx = TestCtx::new();
        let a = ctx.c("a");
        let far = VariableId(u32::MAX);
        let mut b = Bindings::new();
        b.bind(far, a);
        assert_eq!(b.get(far), Some(a));
        assert_eq!(b.get(VariableId(0)), None);
        let x = ctx.bank.var(u32::MAX);
        assert_eq!(ctx.bank.deref(x, &b, DerefMode::Always), (a, DerefMode::Always));
        b.unbind(far);
        assert!(b.is_empty());
    }

    #[test]
    fn test_rejects_invalid_standard_weights() {
        let zero = StandardWeights { function: 0, variable: 0 };
        assert!(matches!(
            TermBank::new(Signature::new(), zero),
            Err(TermIndexError::InvalidConfig(_))
        ));
        let heavy_vars = StandardWeights { function: 1, variable: 2 };
        assert!(TermBank::new(Signature::new(), heavy_vars).is_err());
    }
}
