//! Small end-to-end scenarios for the ordering, the position codec and the
//! unit index

use termindex::index::{FpMode, UnitClauseIndex};
use termindex::{
    decode, encode, Clause, ClauseId, ClausePos, CompareResult, FingerprintSpec, Kbo, Literal, Ocb,
    Side, Signature, StandardWeights, TermBank,
};

#[test]
fn test_precedence_breaks_weight_ties() {
    let mut sig = Signature::new();
    let a = sig.add_symbol("a", 0).unwrap();
    let b = sig.add_symbol("b", 0).unwrap();
    // b < a, every weight 1
    let ocb = Ocb::from_parts(&sig, &[b, a], vec![1, 1, 1], 1).unwrap();
    let mut bank = TermBank::new(sig, StandardWeights::default()).unwrap();
    let ta = bank.constant(a).unwrap();
    let tb = bank.constant(b).unwrap();

    let mut kbo = Kbo::new(ocb);
    assert_eq!(kbo.compare(&bank, ta, tb), CompareResult::Greater);
    assert_eq!(kbo.compare(&bank, tb, ta), CompareResult::Lesser);
}

#[test]
fn test_zero_weight_unary_dominates_its_argument() {
    let mut sig = Signature::new();
    let a = sig.add_symbol("a", 0).unwrap();
    let f = sig.add_symbol("f", 1).unwrap();
    let ocb = Ocb::from_parts(&sig, &[a, f], vec![1, 1, 0], 1).unwrap();
    let mut bank = TermBank::new(sig, StandardWeights::default()).unwrap();
    let x = bank.var(0);
    let fx = bank.app(f, &[x]).unwrap();
    let ffx = bank.app(f, &[fx]).unwrap();

    let mut kbo = Kbo::new(ocb);
    assert_eq!(kbo.compare(&bank, fx, x), CompareResult::Greater);
    assert_eq!(kbo.compare(&bank, ffx, fx), CompareResult::Greater);
    assert!(kbo.greater(&bank, ffx, x));
}

#[test]
fn test_compact_position_of_nested_argument() {
    let mut sig = Signature::new();
    let a = sig.add_symbol("a", 0).unwrap();
    let b = sig.add_symbol("b", 0).unwrap();
    let f = sig.add_symbol("f", 2).unwrap();
    let p = sig.add_predicate("P", 1).unwrap();
    let q = sig.add_predicate("Q", 1).unwrap();
    let mut bank = TermBank::new(sig, StandardWeights::default()).unwrap();

    let ta = bank.constant(a).unwrap();
    let tb = bank.constant(b).unwrap();
    let fab = bank.app(f, &[ta, tb]).unwrap();
    let pa = bank.app(p, &[ta]).unwrap();
    let qf = bank.app(q, &[fab]).unwrap();
    let clause = Clause::new(
        ClauseId(1),
        vec![Literal::atom(&bank, true, pa), Literal::atom(&bank, true, qf)],
        &bank,
    );

    let pos = ClausePos {
        clause: clause.id,
        literal: 1,
        side: Side::Left,
        path: vec![0, 1],
    };
    assert_eq!(pos.subterm(&bank, &clause).unwrap(), tb);

    let cpos = encode(&bank, &clause, &pos).unwrap();
    let back = decode(&bank, &clause, cpos).unwrap();
    assert_eq!(back.literal, 1);
    assert_eq!(back.path.last(), Some(&1));
    assert_eq!(back, pos);
    assert_eq!(back.subterm(&bank, &clause).unwrap(), tb);
}

#[test]
fn test_unoriented_unit_found_by_swapped_query() {
    let mut sig = Signature::new();
    let a = sig.add_symbol("a", 0).unwrap();
    let b = sig.add_symbol("b", 0).unwrap();
    let mut bank = TermBank::new(sig, StandardWeights::default()).unwrap();
    let ta = bank.constant(a).unwrap();
    let tb = bank.constant(b).unwrap();

    let unit = Clause::new(ClauseId(7), vec![Literal::equation(true, ta, tb)], &bank);
    let mut index = UnitClauseIndex::new(FingerprintSpec::default());
    index.insert(&bank, &unit);

    let query = Literal::equation(true, tb, ta);
    let found: Vec<ClauseId> = index.query(&bank, &query, FpMode::Generalizations).collect();
    assert_eq!(found, vec![unit.id]);
}
