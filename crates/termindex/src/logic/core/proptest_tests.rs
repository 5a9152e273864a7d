//! Property-based tests for compact positions.

use super::clause::{Clause, ClauseId};
use super::literal::Literal;
use super::position::{decode, encode, positions};
use super::term::{TermBank, TermId};
use crate::config::StandardWeights;
use crate::logic::interner::Signature;
use proptest::prelude::*;

/// Term description before building it in a bank
#[derive(Debug, Clone)]
enum TermDesc {
    Var(u8),
    Const(u8),
    Func(u8, Vec<TermDesc>),
}

fn arb_term_desc(max_depth: u32) -> BoxedStrategy<TermDesc> {
    let leaf = prop_oneof![
        (0..3u8).prop_map(TermDesc::Var),
        (0..3u8).prop_map(TermDesc::Const),
    ];
    if max_depth == 0 {
        leaf.boxed()
    } else {
        prop_oneof![
            2 => leaf,
            2 => (0..2u8, proptest::collection::vec(arb_term_desc(max_depth - 1), 1..=2))
                .prop_map(|(f, args)| TermDesc::Func(f, args)),
        ]
        .boxed()
    }
}

fn build(desc: &TermDesc, bank: &mut TermBank) -> TermId {
    match desc {
        TermDesc::Var(i) => bank.var(*i as u32),
        TermDesc::Const(i) => {
            let c = bank.signature_mut().add_symbol(&format!("c{}", i), 0).unwrap();
            bank.constant(c).unwrap()
        }
        TermDesc::Func(f, args) => {
            let built: Vec<TermId> = args.iter().map(|a| build(a, bank)).collect();
            let name = format!("f{}_{}", f, built.len());
            let s = bank.signature_mut().add_symbol(&name, built.len()).unwrap();
            bank.app(s, &built).unwrap()
        }
    }
}

fn arb_literals() -> impl Strategy<Value = Vec<(bool, TermDesc, TermDesc)>> {
    proptest::collection::vec(
        (any::<bool>(), arb_term_desc(3), arb_term_desc(3)),
        1..=3,
    )
}

fn arb_weights() -> impl Strategy<Value = StandardWeights> {
    (1..4u64, 0..3u64).prop_map(|(variable, extra)| StandardWeights {
        function: variable + extra,
        variable,
    })
}

proptest! {
    /// Every enumerated position encodes to its own value and decodes back
    #[test]
    fn position_round_trip(lits in arb_literals(), weights in arb_weights()) {
        let mut bank = TermBank::new(Signature::new(), weights).unwrap();
        let literals: Vec<Literal> = lits
            .iter()
            .map(|(pos, l, r)| {
                let l = build(l, &mut bank);
                let r = build(r, &mut bank);
                Literal::equation(*pos, l, r)
            })
            .collect();
        let clause = Clause::new(ClauseId(0), literals, &bank);

        let mut last = None;
        for (pos, cpos) in positions(&bank, &clause) {
            prop_assert!(last.map_or(true, |l| l < cpos));
            last = Some(cpos);
            prop_assert_eq!(encode(&bank, &clause, &pos).unwrap(), cpos);
            let back = decode(&bank, &clause, cpos).unwrap();
            prop_assert_eq!(
                back.subterm(&bank, &clause).unwrap(),
                pos.subterm(&bank, &clause).unwrap()
            );
            prop_assert_eq!(back, pos);
        }
    }

    /// Offsets that no position owns are rejected
    #[test]
    fn decode_rejects_foreign_offsets(lits in arb_literals(), weights in arb_weights()) {
        let mut bank = TermBank::new(Signature::new(), weights).unwrap();
        let literals: Vec<Literal> = lits
            .iter()
            .map(|(pos, l, r)| {
                let l = build(l, &mut bank);
                let r = build(r, &mut bank);
                Literal::equation(*pos, l, r)
            })
            .collect();
        let clause = Clause::new(ClauseId(0), literals, &bank);

        let issued: std::collections::HashSet<u64> =
            positions(&bank, &clause).map(|(_, c)| c.0).collect();
        for offset in 0..clause.weight() + 2 {
            let decoded = decode(&bank, &clause, super::position::CompactPos(offset));
            prop_assert_eq!(decoded.is_ok(), issued.contains(&offset));
        }
    }
}
