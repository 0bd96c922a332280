//! Rule-level type inference.
//!
//! Walks a rewrite rule definition by definition, instantiating each
//! instruction's formal type variables fresh, unifying them with the
//! program variables' type variables, and accumulating the result in a
//! `TypeEnv`. Source pattern first, then destination; the extracted
//! environment mentions only the rule's program variables.

use rustc_hash::FxHashMap;
use tdl_ir::{Def, InstSet, PatternSide, Rule, TvRef, TypeVarPool, VarPool, VarRef};
use tracing::trace;

use crate::env::TypeEnv;
use crate::error::{TypeError, UnifyError};
use crate::unify::unify;

/// Instantiate the formal type variables of `def`'s instruction.
///
/// Each free formal gets a fresh copy named with an environment-local
/// uid; explicit type bindings override positionally (controlling type
/// variable first) with a singleton to constrain against. Singleton
/// signature roots (monomorphic operand types) are copied per definition
/// too: unification restricts typesets in place and must never touch the
/// signature's own nodes. The returned map is keyed by formal root.
fn instantiate_formals(
    pool: &mut TypeVarPool,
    env: &mut TypeEnv,
    insts: &InstSet,
    def: &Def,
) -> FxHashMap<TvRef, TvRef> {
    let inst = insts.get(def.inst);
    assert!(
        def.bound_types.len() <= inst.typevars.len(),
        "more explicit type bindings than free formal type variables on `{}`",
        inst.name
    );

    let mut map = FxHashMap::default();
    for (i, &formal) in inst.typevars.iter().enumerate() {
        let fresh = match def.bound_types.get(i) {
            Some(&ty) => {
                assert!(
                    pool.typeset(formal).contains(ty),
                    "explicit binding `{ty}` outside formal typeset on `{}`",
                    inst.name
                );
                pool.singleton(ty)
            }
            None => {
                let uid = env.get_uid();
                pool.fresh_copy(formal, uid)
            }
        };
        map.insert(formal, fresh);
    }

    // Any root not collected in `typevars` is a singleton constant.
    for op in inst.outs.iter().chain(inst.ins.iter()) {
        let Some(tv) = op.typevar() else { continue };
        let (root, _) = pool.chain(tv);
        if map.contains_key(&root) {
            continue;
        }
        let ty = pool.typeset(root).get_singleton().unwrap_or_else(|| {
            panic!("non-singleton signature root missing from `{}`", inst.name)
        });
        let fresh = pool.singleton(ty);
        map.insert(root, fresh);
    }
    map
}

/// Infer types for a single definition, mutating `env`.
///
/// Unifies each result and argument variable's type variable with the
/// corresponding instantiated formal, results first. On `Ok` all of the
/// definition's variables are registered in `env`.
pub fn ti_def(
    pool: &mut TypeVarPool,
    env: &mut TypeEnv,
    insts: &InstSet,
    vars: &VarPool,
    def: &Def,
    side: PatternSide,
    def_index: usize,
) -> Result<(), TypeError> {
    let inst = insts.get(def.inst);
    assert_eq!(
        def.defined.len(),
        inst.outs.len(),
        "result count mismatch on `{}`",
        inst.name
    );
    assert_eq!(
        def.args.len(),
        inst.ins.len(),
        "argument count mismatch on `{}`",
        inst.name
    );

    // A destination-side argument that is defined on neither side and
    // never appeared in the source pattern has no binding to infer from.
    if side == PatternSide::Destination {
        for &opnum in &inst.value_opnums {
            let Some(v) = def.args[opnum].as_var() else {
                continue;
            };
            if vars.flags(v).is_empty() && !env.is_registered(v) {
                return Err(TypeError {
                    side: None,
                    def_index,
                    actual: vars.name(v).to_string(),
                    formal: inst.name.to_string(),
                    source: UnifyError::Unbound {
                        var: vars.name(v).to_string(),
                    },
                });
            }
        }
    }

    let fresh = instantiate_formals(pool, env, insts, def);

    // (actual, formal) pairs: results first, then value arguments.
    let mut pairs: Vec<(VarRef, TvRef)> = Vec::new();
    for &resnum in &inst.value_results {
        let formal = inst.outs[resnum]
            .typevar()
            .unwrap_or_else(|| panic!("value result without type variable"));
        pairs.push((def.defined[resnum], formal));
    }
    for &opnum in &inst.value_opnums {
        let formal = inst.ins[opnum]
            .typevar()
            .unwrap_or_else(|| panic!("value operand without type variable"));
        let v = def.args[opnum]
            .as_var()
            .unwrap_or_else(|| panic!("immediate at value operand position on `{}`", inst.name));
        pairs.push((v, formal));
    }

    trace!(inst = %inst.name, %side, def_index, "ti_def");

    for (v, formal) in pairs {
        env.register(v, vars);
        let actual = vars.typevar(v);
        let formal = pool.subst(formal, &fresh);
        unify(pool, env, actual, formal).map_err(|source| TypeError {
            side: None,
            def_index,
            actual: pool.display(actual),
            formal: pool.display(formal),
            source,
        })?;
    }
    Ok(())
}

/// Infer types for one side of a rule, definition by definition.
pub fn ti_pattern(
    pool: &mut TypeVarPool,
    env: &mut TypeEnv,
    insts: &InstSet,
    vars: &VarPool,
    rule: &Rule,
    side: PatternSide,
) -> Result<(), TypeError> {
    for (i, def) in rule.pattern(side).defs.iter().enumerate() {
        ti_def(pool, env, insts, vars, def, side, i).map_err(|e| e.on_side(side))?;
    }
    Ok(())
}

/// Infer types for a whole rule.
///
/// Returns the extracted environment: normalized, closed over the rule's
/// program variables, deferred constraints attached. On `Err` the
/// partially built environment is dropped.
#[tracing::instrument(skip_all, fields(rule = %rule.name))]
pub fn ti_rule(
    pool: &mut TypeVarPool,
    insts: &InstSet,
    vars: &VarPool,
    rule: &Rule,
) -> Result<TypeEnv, TypeError> {
    let mut env = TypeEnv::new();
    ti_pattern(pool, &mut env, insts, vars, rule, PatternSide::Source)?;
    ti_pattern(pool, &mut env, insts, vars, rule, PatternSide::Destination)?;
    env.normalize(pool, vars);
    Ok(env.extract(pool, vars))
}
