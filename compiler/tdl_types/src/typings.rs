//! Lazy enumeration of concrete typings.
//!
//! A concrete typing assigns every registered program variable one
//! concrete machine type, consistent with the environment's equivalences
//! and deferred constraints. The enumeration walks the cross product of
//! each free type variable's typeset members with an odometer — nothing
//! is materialized up front, and dropping the iterator is cancellation.
//!
//! Construction snapshots everything it needs (member lists, per-variable
//! derivation skeletons, translated constraints), so iteration borrows
//! neither the environment nor the pools.

use rustc_hash::FxHashMap;
use tdl_ir::{Chain, TvRef, TypeSet, TypeVarPool, ValueType, VarPool, VarRef};

use crate::constraint::Constraint;
use crate::env::TypeEnv;

/// One concrete typing: program variable to concrete type.
pub type ConcreteTyping = FxHashMap<VarRef, ValueType>;

/// Where a derivation skeleton bottoms out.
#[derive(Copy, Clone, Debug)]
enum Base {
    /// The i-th enumerated free type variable.
    Free(usize),
    /// A singleton constant.
    Fixed(ValueType),
}

/// A canonical type variable flattened to (root, derivation chain).
#[derive(Clone, Debug)]
struct Skeleton {
    base: Base,
    /// Derivation functions above the root, outermost first.
    chain: Chain,
}

/// A deferred constraint flattened for pool-free evaluation.
enum ConstraintSkeleton {
    Equal(Skeleton, Skeleton),
    InSet(Skeleton, TypeSet),
}

/// Lazy iterator over the concrete typings an environment permits.
pub struct ConcreteTypings {
    /// Member list per enumerated free type variable.
    members: Vec<Vec<ValueType>>,
    /// Skeleton per registered program variable.
    vars: Vec<(VarRef, Skeleton)>,
    constraints: Vec<ConstraintSkeleton>,
    /// Odometer over `members`; `None` once exhausted.
    odometer: Option<Vec<usize>>,
}

impl ConcreteTypings {
    pub(crate) fn new(env: &TypeEnv, pool: &mut TypeVarPool, vars: &VarPool) -> Self {
        let mut free = env.free_typevars(pool);

        // Roots reached only through registered variables (a variable that
        // is itself the representative never appears as a mapping key).
        for &v in env.registered_vars() {
            let canon = env.canonical(vars.typevar(v), pool);
            let (root, _) = pool.chain(canon);
            if let Some(root) = pool.free_base(root) {
                if !free.contains(&root) {
                    free.push(root);
                }
            }
        }
        free.sort_by(|a, b| pool.display(*a).cmp(&pool.display(*b)));

        let skeleton = |pool: &TypeVarPool, tv: TvRef, free: &[TvRef]| -> Option<Skeleton> {
            let (root, chain) = pool.chain(tv);
            let base = match free.iter().position(|&f| f == root) {
                Some(i) => Base::Free(i),
                // Not enumerated: must be a constant root.
                None => Base::Fixed(pool.typeset(root).get_singleton()?),
            };
            Some(Skeleton { base, chain })
        };

        // A root that is neither enumerable nor a constant (an emptied
        // singleton, say) has no consistent assignment at all.
        let mut poisoned = false;

        let mut var_skels = Vec::with_capacity(env.registered_vars().len());
        for &v in env.registered_vars() {
            let canon = env.canonical(vars.typevar(v), pool);
            match skeleton(pool, canon, &free) {
                Some(skel) => var_skels.push((v, skel)),
                None => poisoned = true,
            }
        }

        let mut constraints = Vec::with_capacity(env.constraints().len());
        for constr in env.constraints() {
            let skels = match constr.translate_env(env, pool) {
                Constraint::TypesEqual(a, b) => skeleton(pool, a, &free)
                    .zip(skeleton(pool, b, &free))
                    .map(|(a, b)| ConstraintSkeleton::Equal(a, b)),
                Constraint::InTypeSet(tv, ts) => {
                    skeleton(pool, tv, &free).map(|s| ConstraintSkeleton::InSet(s, ts))
                }
            };
            match skels {
                Some(c) => constraints.push(c),
                None => poisoned = true,
            }
        }

        let members: Vec<Vec<ValueType>> = free
            .iter()
            .map(|&tv| pool.typeset(tv).iter().collect())
            .collect();

        let odometer = if poisoned || members.iter().any(Vec::is_empty) {
            None
        } else {
            Some(vec![0; members.len()])
        };

        ConcreteTypings {
            members,
            vars: var_skels,
            constraints,
            odometer,
        }
    }

    /// Evaluate a skeleton under the current odometer position.
    fn eval(&self, skel: &Skeleton, odometer: &[usize]) -> Option<ValueType> {
        let root = match skel.base {
            Base::Free(i) => *self.members.get(i)?.get(*odometer.get(i)?)?,
            Base::Fixed(ty) => ty,
        };
        TypeVarPool::eval_chain(root, &skel.chain)
    }

    /// Do all deferred constraints hold at the current position?
    fn constraints_hold(&self, odometer: &[usize]) -> bool {
        self.constraints.iter().all(|c| match c {
            ConstraintSkeleton::Equal(a, b) => {
                match (self.eval(a, odometer), self.eval(b, odometer)) {
                    (Some(ta), Some(tb)) => ta == tb,
                    _ => false,
                }
            }
            ConstraintSkeleton::InSet(skel, ts) => self
                .eval(skel, odometer)
                .is_some_and(|ty| ts.contains(ty)),
        })
    }

    /// Advance the odometer; `false` once the product is exhausted.
    fn advance(&mut self) -> bool {
        let Some(odometer) = &mut self.odometer else {
            return false;
        };
        for i in (0..odometer.len()).rev() {
            odometer[i] += 1;
            if odometer[i] < self.members[i].len() {
                return true;
            }
            odometer[i] = 0;
        }
        // Wrapped all digits: done (also handles the zero-variable
        // product, whose single combination was already yielded).
        self.odometer = None;
        false
    }
}

impl Iterator for ConcreteTypings {
    type Item = ConcreteTyping;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let odometer = self.odometer.as_ref()?.clone();

            let ok = self.constraints_hold(&odometer);
            let typing = if ok {
                let mut typing = ConcreteTyping::default();
                let mut complete = true;
                for (v, skel) in &self.vars {
                    match self.eval(skel, &odometer) {
                        Some(ty) => {
                            typing.insert(*v, ty);
                        }
                        // Chain falls off the grid for this combination.
                        None => {
                            complete = false;
                            break;
                        }
                    }
                }
                complete.then_some(typing)
            } else {
                None
            };

            self.advance();
            if typing.is_some() {
                return typing;
            }
            if self.odometer.is_none() {
                return None;
            }
        }
    }
}
