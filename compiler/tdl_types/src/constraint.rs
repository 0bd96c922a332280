//! Deferred type constraints.
//!
//! Constraints record predicates unification could not decide on the
//! spot. They are evaluated only once every referenced type variable has
//! resolved to a singleton, during concrete-typing enumeration.
//!
//! A closed union of two kinds:
//! - `TypesEqual` — two derived type variables must resolve to the same
//!   concrete type. This is the only kind the inference driver produces
//!   (from non-invertible derivations, of which there are currently
//!   none).
//! - `InTypeSet` — a free type variable must lie within a target typeset.
//!   An extension point carried from the original design; nothing
//!   produces it today.

use rustc_hash::FxHashMap;
use tdl_ir::{TvRef, TypeSet, TypeVarPool};

use crate::env::TypeEnv;

/// A deferred predicate over type variables.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Constraint {
    /// Two derived type variables resolve to the same concrete type.
    /// The pair is stored in display order so construction order does not
    /// affect equality or deduplication.
    TypesEqual(TvRef, TvRef),

    /// A free type variable lies within the target typeset.
    InTypeSet(TvRef, TypeSet),
}

impl Constraint {
    /// Build an equality constraint between two derived type variables,
    /// canonicalizing the pair order.
    pub fn types_equal(pool: &TypeVarPool, a: TvRef, b: TvRef) -> Self {
        assert!(
            pool.is_derived(a) && pool.is_derived(b),
            "equality constraints apply to derived type variables"
        );
        if pool.display(a) <= pool.display(b) {
            Constraint::TypesEqual(a, b)
        } else {
            Constraint::TypesEqual(b, a)
        }
    }

    /// Build a typeset-membership constraint on a free type variable.
    pub fn in_typeset(pool: &TypeVarPool, tv: TvRef, ts: TypeSet) -> Self {
        assert!(
            !pool.is_derived(tv),
            "membership constraints apply to free type variables"
        );
        Constraint::InTypeSet(tv, ts)
    }

    /// Rewrite every referenced type variable to its canonical
    /// representative in `env`.
    pub fn translate_env(&self, env: &TypeEnv, pool: &mut TypeVarPool) -> Constraint {
        match self {
            Constraint::TypesEqual(a, b) => {
                let a = env.canonical(*a, pool);
                let b = env.canonical(*b, pool);
                Constraint::types_equal(pool, a, b)
            }
            Constraint::InTypeSet(tv, ts) => {
                let tv = env.canonical(*tv, pool);
                Constraint::in_typeset(pool, tv, ts.clone())
            }
        }
    }

    /// Rewrite every referenced type variable through a substitution map.
    pub fn translate_map(&self, map: &FxHashMap<TvRef, TvRef>, pool: &mut TypeVarPool) -> Constraint {
        match self {
            Constraint::TypesEqual(a, b) => {
                let a = pool.subst(*a, map);
                let b = pool.subst(*b, map);
                Constraint::types_equal(pool, a, b)
            }
            Constraint::InTypeSet(tv, ts) => {
                let tv = pool.subst(*tv, map);
                Constraint::in_typeset(pool, tv, ts.clone())
            }
        }
    }

    /// Is this constraint statically decidable (to either outcome)?
    pub fn is_trivial(&self, pool: &TypeVarPool) -> bool {
        match self {
            Constraint::TypesEqual(a, b) => {
                a == b
                    || (pool.typeset(*a).get_singleton().is_some()
                        && pool.typeset(*b).get_singleton().is_some())
            }
            Constraint::InTypeSet(tv, ts) => {
                let tv_ts = pool.typeset(*tv);
                if tv_ts.is_subset(ts) {
                    return true;
                }
                let mut meet = tv_ts;
                meet.constrain(ts);
                meet.is_empty()
            }
        }
    }

    /// Evaluate the constraint. Valid only once every referenced type
    /// variable has a singleton typeset.
    pub fn eval(&self, pool: &TypeVarPool) -> bool {
        match self {
            Constraint::TypesEqual(a, b) => {
                let (Some(ta), Some(tb)) = (
                    pool.typeset(*a).get_singleton(),
                    pool.typeset(*b).get_singleton(),
                ) else {
                    panic!("eval of an equality constraint before both sides are concrete")
                };
                ta == tb
            }
            Constraint::InTypeSet(tv, ts) => {
                assert!(
                    pool.typeset(*tv).get_singleton().is_some(),
                    "eval of a membership constraint before the variable is concrete"
                );
                pool.typeset(*tv).is_subset(ts)
            }
        }
    }
}
