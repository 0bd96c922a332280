//! Per-rule type environment.
//!
//! `TypeEnv` is the bookkeeping for one rule's inference: the equivalence
//! mapping between type variables (with a canonical representative per
//! class), the rank partial order that decides which representative wins,
//! the deferred constraints, and the registered program variables. One
//! environment per rule; on failure the caller discards it.

use rustc_hash::{FxHashMap, FxHashSet};
use tdl_ir::{TvRef, TypeVarPool, VarPool, VarRef, VarRole};

use crate::constraint::Constraint;
use crate::typings::ConcreteTypings;

/// Priority of a type variable when choosing canonical representatives.
///
/// Lower rank merges into higher: user-visible roles dominate
/// temporaries, and a derived expression always outranks a free
/// variable.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(transparent)]
pub struct Rank(u8);

impl Rank {
    /// Internally generated free type variables (fresh signature copies).
    pub const INTERNAL: Self = Rank(0);
    /// Type variables of temporary program variables.
    pub const TEMP: Self = Rank(1);
    /// Type variables of output program variables.
    pub const OUTPUT: Self = Rank(2);
    /// Type variables of intermediate program variables.
    pub const INTERMEDIATE: Self = Rank(3);
    /// Type variables of input program variables.
    pub const INPUT: Self = Rank(4);
    /// Derived type variables.
    pub const DERIVED: Self = Rank(5);

    /// The rank assigned to a program variable of the given role.
    pub fn of_role(role: VarRole) -> Self {
        match role {
            VarRole::Input => Rank::INPUT,
            VarRole::Output => Rank::OUTPUT,
            VarRole::Intermediate => Rank::INTERMEDIATE,
            VarRole::Temp => Rank::TEMP,
        }
    }

    /// The raw ordinal.
    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

/// Type environment for one rule's inference.
#[derive(Default, Debug)]
pub struct TypeEnv {
    /// Directed equivalence links; chains end at the canonical
    /// representative. Acyclic by construction.
    type_map: FxHashMap<TvRef, TvRef>,
    /// Deferred constraints, deduplicated.
    constraints: Vec<Constraint>,
    /// Ranks of registered type variables.
    ranks: FxHashMap<TvRef, Rank>,
    /// Registered program variables, in registration order.
    vars: Vec<VarRef>,
    var_set: FxHashSet<VarRef>,
    /// Fresh-name counter, environment-local.
    next_uid: u32,
}

impl TypeEnv {
    /// Create an empty environment.
    pub fn new() -> Self {
        TypeEnv::default()
    }

    /// Resolve the canonical representative of `tv`.
    ///
    /// Chases the mapping to its fixed point; a derived input resolves
    /// its base recursively and rewraps with the same derivation, so
    /// canonicalization distributes over derivation.
    pub fn canonical(&self, tv: TvRef, pool: &mut TypeVarPool) -> TvRef {
        let mut cur = tv;
        while let Some(&next) = self.type_map.get(&cur) {
            cur = next;
        }
        if let Some((func, base)) = pool.derived_parts(cur) {
            let base = self.canonical(base, pool);
            pool.derived(func, base)
        } else {
            cur
        }
    }

    /// Record that the free variable `tv1` joins `tv2`'s equivalence
    /// class, with `tv2`'s representative as canonical.
    ///
    /// `tv1` must be free and its own representative; linking must not
    /// create a cycle. Violations are engine bugs.
    pub fn equivalent(&mut self, tv1: TvRef, tv2: TvRef, pool: &mut TypeVarPool) {
        assert!(!pool.is_derived(tv1), "equivalent() takes a free variable");
        assert_eq!(
            self.canonical(tv1, pool),
            tv1,
            "equivalent() takes a canonical representative"
        );
        if let Some((_, base)) = pool.derived_parts(tv2) {
            assert!(
                self.canonical(base, pool) != tv1,
                "equivalence link would create a cycle"
            );
        }
        self.type_map.insert(tv1, tv2);
    }

    /// Append a deferred equality constraint between two derived type
    /// variables, ignoring duplicates.
    pub fn add_constraint(&mut self, pool: &TypeVarPool, a: TvRef, b: TvRef) {
        let constr = Constraint::types_equal(pool, a, b);
        if !self.constraints.contains(&constr) {
            self.constraints.push(constr);
        }
    }

    /// The deferred constraints.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The rank of a type variable: its registered rank if any, else
    /// DERIVED for derived nodes and INTERNAL for free ones.
    pub fn rank(&self, tv: TvRef, pool: &TypeVarPool) -> Rank {
        let default = if pool.is_derived(tv) {
            Rank::DERIVED
        } else {
            Rank::INTERNAL
        };
        self.ranks.get(&tv).copied().unwrap_or(default)
    }

    /// Register a program variable, ranking its type variable by role.
    pub fn register(&mut self, v: VarRef, vars: &VarPool) {
        if self.var_set.insert(v) {
            self.vars.push(v);
        }
        self.ranks
            .insert(vars.typevar(v), Rank::of_role(vars.role(v)));
    }

    /// Has this variable been registered?
    pub fn is_registered(&self, v: VarRef) -> bool {
        self.var_set.contains(&v)
    }

    /// Registered program variables, in registration order.
    pub fn registered_vars(&self) -> &[VarRef] {
        &self.vars
    }

    /// Next fresh-name uid.
    pub fn get_uid(&mut self) -> u32 {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    /// The free (non-singleton) canonical roots of the mapping, sorted by
    /// name for deterministic enumeration.
    pub fn free_typevars(&self, pool: &mut TypeVarPool) -> Vec<TvRef> {
        let keys: Vec<TvRef> = self.type_map.keys().copied().collect();
        let mut seen = FxHashSet::default();
        let mut free = Vec::new();
        for tv in keys {
            let canon = self.canonical(tv, pool);
            if let Some(root) = pool.free_base(canon) {
                if seen.insert(root) {
                    free.push(root);
                }
            }
        }
        free.sort_by(|a, b| pool.display(*a).cmp(&pool.display(*b)));
        free
    }

    /// Collapse straight-line bookkeeping chains.
    ///
    /// A canonical root that is not tied to a registered variable and has
    /// exactly one child across the combined derivation/mapping graph is
    /// elided, promoting the child.
    pub fn normalize(&mut self, pool: &mut TypeVarPool, vars: &VarPool) {
        let source_tvs: FxHashSet<TvRef> = self.vars.iter().map(|&v| vars.typevar(v)).collect();

        // Children across both edge kinds: derivation (free root <- each
        // derived node above it) and mapping (target <- source).
        let mut children: FxHashMap<TvRef, FxHashSet<TvRef>> = FxHashMap::default();
        for &v in self.type_map.values() {
            if !pool.is_derived(v) {
                continue;
            }
            if let Some(root) = pool.free_base(v) {
                children.entry(root).or_default().insert(v);
            }
        }
        for (&a, &b) in &self.type_map {
            children.entry(b).or_default().insert(a);
        }

        for mut r in self.free_typevars(pool) {
            loop {
                if source_tvs.contains(&r) {
                    break;
                }
                let Some(kids) = children.get(&r) else { break };
                if kids.len() != 1 {
                    break;
                }
                let child = kids.iter().copied().next().unwrap_or(r);
                if let Some(&target) = self.type_map.get(&child) {
                    assert_eq!(target, r, "chain link out of line during normalize");
                    self.type_map.remove(&child);
                }
                r = child;
            }
        }
    }

    /// Extract a closed environment mentioning only type variables of
    /// registered program variables, dropping trivial and duplicate
    /// constraints.
    pub fn extract(&self, pool: &mut TypeVarPool, vars: &VarPool) -> TypeEnv {
        let var_tvs: FxHashSet<TvRef> = self.vars.iter().map(|&v| vars.typevar(v)).collect();

        let mut type_map = FxHashMap::default();
        for &tv in &var_tvs {
            let canon = self.canonical(tv, pool);
            if canon != tv {
                type_map.insert(tv, canon);
            }
        }

        let mut constraints: Vec<Constraint> = Vec::new();
        for constr in &self.constraints {
            let constr = constr.translate_env(self, pool);
            if constr.is_trivial(pool) || constraints.contains(&constr) {
                continue;
            }
            // Translated constraints must close over real variables.
            if let Constraint::TypesEqual(a, b) = &constr {
                for side in [*a, *b] {
                    if let Some(root) = pool.free_base(side) {
                        assert!(
                            var_tvs.contains(&root),
                            "extracted constraint mentions a non-variable root"
                        );
                    }
                }
            }
            constraints.push(constr);
        }

        for (k, v) in &type_map {
            assert!(var_tvs.contains(k));
            if let Some(root) = pool.free_base(*v) {
                assert!(
                    var_tvs.contains(&root),
                    "extracted mapping targets a non-variable root"
                );
            }
        }

        TypeEnv {
            type_map,
            constraints,
            ranks: self.ranks.clone(),
            vars: self.vars.clone(),
            var_set: self.var_set.clone(),
            next_uid: 0,
        }
    }

    /// Lazily enumerate all concrete typings this environment permits:
    /// the cross product of each free type variable's typeset members,
    /// filtered by the deferred constraints. Nothing is materialized;
    /// dropping the iterator is cancellation.
    pub fn concrete_typings(&self, pool: &mut TypeVarPool, vars: &VarPool) -> ConcreteTypings {
        ConcreteTypings::new(self, pool, vars)
    }

    /// Raw access to the equivalence mapping (read-only).
    pub fn type_map(&self) -> &FxHashMap<TvRef, TvRef> {
        &self.type_map
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "tests can panic")]

    use super::*;
    use pretty_assertions::assert_eq;
    use tdl_ir::{DerivedFunc, TypeSet, TypeSetBuilder, ValueType};

    fn ints(range: std::ops::RangeInclusive<u16>) -> TypeSet {
        TypeSetBuilder::new().ints(range).build()
    }

    #[test]
    fn rank_scale() {
        assert!(Rank::INTERNAL < Rank::TEMP);
        assert!(Rank::TEMP < Rank::OUTPUT);
        assert!(Rank::OUTPUT < Rank::INTERMEDIATE);
        assert!(Rank::INTERMEDIATE < Rank::INPUT);
        assert!(Rank::INPUT < Rank::DERIVED);
    }

    #[test]
    fn canonical_chases_chains_and_rewraps() {
        let mut pool = TypeVarPool::new();
        let mut env = TypeEnv::new();
        let a = pool.free("typeof_a", ints(8..=64));
        let b = pool.free("typeof_b", ints(8..=64));
        let c = pool.free("typeof_c", ints(8..=64));
        env.equivalent(a, b, &mut pool);
        env.equivalent(b, c, &mut pool);
        assert_eq!(env.canonical(a, &mut pool), c);

        // Derived input: base canonicalizes, wrapper survives.
        let da = pool.derived(DerivedFunc::HalfWidth, a);
        let dc = pool.derived(DerivedFunc::HalfWidth, c);
        assert_eq!(env.canonical(da, &mut pool), dc);
    }

    #[test]
    #[should_panic(expected = "canonical representative")]
    fn equivalent_rejects_non_representatives() {
        let mut pool = TypeVarPool::new();
        let mut env = TypeEnv::new();
        let a = pool.free("typeof_a", ints(8..=64));
        let b = pool.free("typeof_b", ints(8..=64));
        env.equivalent(a, b, &mut pool);
        // `a` already points at `b`.
        env.equivalent(a, b, &mut pool);
    }

    #[test]
    #[should_panic(expected = "cycle")]
    fn equivalent_rejects_cycles() {
        let mut pool = TypeVarPool::new();
        let mut env = TypeEnv::new();
        let a = pool.free("typeof_a", ints(8..=64));
        let da = pool.derived(DerivedFunc::HalfWidth, a);
        env.equivalent(a, da, &mut pool);
    }

    #[test]
    fn constraints_deduplicate() {
        let mut pool = TypeVarPool::new();
        let mut env = TypeEnv::new();
        let a = pool.free("typeof_a", ints(8..=64));
        let b = pool.free("typeof_b", ints(8..=64));
        let da = pool.derived(DerivedFunc::HalfWidth, a);
        let db = pool.derived(DerivedFunc::HalfWidth, b);
        env.add_constraint(&pool, da, db);
        env.add_constraint(&pool, db, da);
        assert_eq!(env.constraints().len(), 1);
    }

    #[test]
    fn normalize_elides_single_child_internal_roots() {
        let mut pool = TypeVarPool::new();
        let mut vars = VarPool::new();
        let mut env = TypeEnv::new();

        let x = vars.var("x", &mut pool);
        env.register(x, &vars);
        let tx = vars.typevar(x);

        // x expressed through an internal root: typeof_x -> half_width(T.0),
        // with T.0 reachable only through that chain.
        let t0 = pool.free("T.0", ints(16..=64));
        let hw = pool.derived(DerivedFunc::HalfWidth, t0);
        env.equivalent(tx, hw, &mut pool);

        env.normalize(&mut pool, &vars);
        assert!(env.type_map().is_empty());
        assert_eq!(env.canonical(tx, &mut pool), tx);
    }

    #[test]
    fn extract_closes_over_registered_variables() {
        let mut pool = TypeVarPool::new();
        let mut vars = VarPool::new();
        let mut env = TypeEnv::new();

        let x = vars.var("x", &mut pool);
        env.register(x, &vars);
        let tx = vars.typevar(x);

        // Internal fresh copies link into x's class; extract drops them.
        let internal = pool.free("T.0", ints(8..=32));
        env.equivalent(internal, tx, &mut pool);

        // A constraint whose sides are already singletons is trivial.
        let s1 = pool.singleton(ValueType::int(32).unwrap());
        let s2 = pool.singleton(ValueType::int(32).unwrap());
        let d1 = pool.derived(DerivedFunc::DoubleWidth, s1);
        let d2 = pool.derived(DerivedFunc::DoubleWidth, s2);
        env.add_constraint(&pool, d1, d2);

        let closed = env.extract(&mut pool, &vars);
        assert!(closed.constraints().is_empty());
        assert!(closed.type_map().is_empty());
        assert_eq!(closed.registered_vars(), [x]);
    }

    #[test]
    fn free_typevars_are_canonical_roots_sorted_by_name() {
        let mut pool = TypeVarPool::new();
        let mut env = TypeEnv::new();
        let a = pool.free("typeof_a", ints(8..=64));
        let b = pool.free("typeof_b", ints(8..=64));
        let z = pool.free("typeof_z", ints(8..=64));
        env.equivalent(a, z, &mut pool);
        let dz = pool.derived(DerivedFunc::HalfWidth, z);
        env.equivalent(b, dz, &mut pool);

        let free = env.free_typevars(&mut pool);
        assert_eq!(free, vec![z]);
    }
}
