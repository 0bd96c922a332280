//! Unification over derivation chains.
//!
//! Merges two type variables' equivalence classes inside a `TypeEnv`,
//! normalizing derivation chains to a canonical form and propagating
//! typeset restrictions to a fixpoint. Failure (an emptied typeset) is a
//! domain error the caller reports against the rule; everything else
//! asserted here is an engine invariant.

use tdl_ir::{TvRef, TypeVarPool};
use tracing::trace;

use crate::env::TypeEnv;
use crate::error::UnifyError;

/// Rewrite a derivation chain to canonical form.
///
/// Two rules, applied recursively to fixpoint:
/// - width derivations commute outward past vector derivations (the
///   arbitrary but consistent order: width outermost, vector closer
///   to the base);
/// - adjacent inverse pairs cancel.
///
/// Idempotent: normalizing a normalized chain is the identity.
pub fn normalize_tv(pool: &mut TypeVarPool, tv: TvRef) -> TvRef {
    let Some((func, base)) = pool.derived_parts(tv) else {
        return tv;
    };

    if let Some((base_func, base_base)) = pool.derived_parts(base) {
        // Commute: vector(width(x)) -> width(vector(x)).
        if func.is_vector() && base_func.is_width() {
            let inner = pool.derived(func, base_base);
            let swapped = pool.derived(base_func, inner);
            return normalize_tv(pool, swapped);
        }
        // Cancel: half/double pairs collapse. Safe because every node in
        // a chain was validated at construction and base typesets only
        // shrink.
        if base_func == func.inverse() {
            return normalize_tv(pool, base_base);
        }
    }

    let new_base = normalize_tv(pool, base);
    if new_base == base {
        tv
    } else {
        // The rewritten base may expose new commute/cancel pairs.
        let rewrapped = pool.derived(func, new_base);
        normalize_tv(pool, rewrapped)
    }
}

/// Mutually restrict two type variables' typesets to their intersection.
///
/// When the two share a free root through derivation chains, one
/// restriction can re-enable another, so restrict `b` from `a` until
/// `a`'s typeset stops changing, then restrict `a` from `b` once and
/// check it was already stable.
pub fn constrain_fixpoint(pool: &mut TypeVarPool, a: TvRef, b: TvRef) {
    loop {
        let old_a = pool.typeset(a);
        pool.constrain(b, a);
        if pool.typeset(a) == old_a {
            break;
        }
    }

    let old_b = pool.typeset(b);
    pool.constrain(a, b);
    assert_eq!(
        pool.typeset(b),
        old_b,
        "typeset still shrinking after constrain fixpoint"
    );
}

/// Unify `a` and `b` in `env`.
///
/// On success the environment records the merged equivalence class (or a
/// deferred constraint). On failure the environment is partially mutated
/// and must be discarded by the caller.
pub fn unify(
    pool: &mut TypeVarPool,
    env: &mut TypeEnv,
    a: TvRef,
    b: TvRef,
) -> Result<(), UnifyError> {
    let ca = env.canonical(a, pool);
    let a = normalize_tv(pool, ca);
    let cb = env.canonical(b, pool);
    let b = normalize_tv(pool, cb);

    // Already unified.
    if a == b {
        return Ok(());
    }

    // Orient by rank: express the lower-priority side in terms of the
    // higher-priority one.
    if env.rank(b, pool) < env.rank(a, pool) {
        return unify(pool, env, b, a);
    }

    trace!(
        a = %pool.display(a),
        b = %pool.display(b),
        "unify"
    );

    constrain_fixpoint(pool, a, b);

    if pool.typeset(a).is_empty() || pool.typeset(b).is_empty() {
        return Err(UnifyError::EmptyTypeSet {
            left: pool.display(a),
            right: pool.display(b),
        });
    }

    // Free -> (possibly derived) representative.
    if !pool.is_derived(a) {
        env.equivalent(a, b, pool);
        return Ok(());
    }

    // Rank order: a derived implies b derived, else b would have swapped
    // in front.
    let Some((func, base)) = pool.derived_parts(a) else {
        unreachable!("checked derived above")
    };
    assert!(pool.is_derived(b), "rank order puts derived after free");

    if func.is_bijection() {
        // half_width(x) == b  becomes  x == double_width(b).
        let inverted = pool.derived(func.inverse(), b);
        let inverted = normalize_tv(pool, inverted);
        return unify(pool, env, base, inverted);
    }

    // Non-invertible derivation: defer.
    env.add_constraint(pool, a, b);
    Ok(())
}
