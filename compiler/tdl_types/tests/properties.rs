//! Property-based tests for chain normalization and unification.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]
#![allow(
    clippy::redundant_closure_for_method_calls,
    reason = "Proptest macros generate code with these patterns"
)]

use proptest::prelude::*;
use tdl_ir::{DerivedFunc, TvRef, TypeSet, TypeSetBuilder, TypeVarPool, ValueType, VarFlags, VarPool};
use tdl_types::{normalize_tv, unify, TypeEnv};

// -- Strategies --

fn derived_func_strategy() -> impl Strategy<Value = DerivedFunc> {
    prop::sample::select(vec![
        DerivedFunc::HalfWidth,
        DerivedFunc::DoubleWidth,
        DerivedFunc::HalfVector,
        DerivedFunc::DoubleVector,
    ])
}

fn chain_strategy() -> impl Strategy<Value = Vec<DerivedFunc>> {
    prop::collection::vec(derived_func_strategy(), 0..6)
}

/// A non-empty set of scalar int types.
fn int_typeset_strategy() -> impl Strategy<Value = TypeSet> {
    prop::collection::btree_set(prop::sample::select(vec![8u16, 16, 32, 64]), 1..=4).prop_map(
        |bits| TypeSet::of(bits.into_iter().map(|b| ValueType::int(b).unwrap())),
    )
}

fn wrap(pool: &mut TypeVarPool, base: TvRef, chain: &[DerivedFunc]) -> TvRef {
    chain.iter().fold(base, |tv, &f| pool.derived(f, tv))
}

proptest! {
    /// Normalizing a normalized chain changes nothing.
    #[test]
    fn normalize_tv_is_idempotent(chain in chain_strategy()) {
        let mut pool = TypeVarPool::new();
        let ts = TypeSetBuilder::new().ints(8..=64).lanes(1..=256).build();
        let base = pool.free("typeof_x", ts);
        let tv = wrap(&mut pool, base, &chain);

        let once = normalize_tv(&mut pool, tv);
        let twice = normalize_tv(&mut pool, once);
        prop_assert_eq!(once, twice);
    }

    /// Wrapping any chain in a function and its inverse normalizes to
    /// the chain itself.
    #[test]
    fn inverse_pairs_cancel(chain in chain_strategy(), f in derived_func_strategy()) {
        let mut pool = TypeVarPool::new();
        let ts = TypeSetBuilder::new().ints(8..=64).lanes(1..=256).build();
        let base = pool.free("typeof_x", ts);
        let tv = wrap(&mut pool, base, &chain);

        let inner = pool.derived(f.inverse(), tv);
        let outer = pool.derived(f, inner);
        prop_assert_eq!(
            normalize_tv(&mut pool, outer),
            normalize_tv(&mut pool, tv)
        );
    }

    /// Rank, not argument order, decides which side becomes canonical:
    /// unifying an input variable with an output variable links the same
    /// direction either way.
    #[test]
    fn unify_orientation_ignores_argument_order(
        ts_in in int_typeset_strategy(),
        ts_out in int_typeset_strategy(),
    ) {
        let mut meet = ts_in.clone();
        meet.constrain(&ts_out);
        prop_assume!(!meet.is_empty());

        let run = |first_input: bool| {
            let mut pool = TypeVarPool::new();
            let mut vars = VarPool::new();
            let mut env = TypeEnv::new();

            let vi = vars.var("i", &mut pool);
            let vo = vars.var("o", &mut pool);
            vars.add_flags(vo, VarFlags::SRC_DEF | VarFlags::DST_DEF);
            env.register(vi, &vars);
            env.register(vo, &vars);

            let ti = vars.typevar(vi);
            let to = vars.typevar(vo);
            pool.constrain_to(ti, &ts_in);
            pool.constrain_to(to, &ts_out);

            let (a, b) = if first_input { (ti, to) } else { (to, ti) };
            unify(&mut pool, &mut env, a, b).unwrap();

            // The input-ranked side stays canonical.
            (
                env.canonical(to, &mut pool) == ti,
                pool.typeset(ti).to_string(),
            )
        };

        prop_assert_eq!(run(true), run(false));
        let (input_is_canonical, ts) = run(true);
        prop_assert!(input_is_canonical);
        prop_assert_eq!(ts, meet.to_string());
    }
}
