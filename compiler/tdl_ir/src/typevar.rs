//! Type variables and their arena.
//!
//! A type variable is either *free* (named, owning a typeset) or *derived*
//! (an invertible function applied to a base type variable). All nodes
//! live in a `TypeVarPool` and are addressed by 32-bit `TvRef` handles:
//! handles are `Copy + Eq + Hash`, derived nodes are interned by
//! `(func, base)` so structurally equal derivation chains compare equal by
//! handle, and there is no recursive ownership to fight the borrow
//! checker over.
//!
//! Free nodes are the only place typesets are stored; a derived node's
//! typeset is computed on demand as the image of its base's typeset along
//! the chain. Restricting a derived node pulls the restriction back
//! through the chain to the free root, which only ever shrinks.

use std::fmt;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::typeset::TypeSet;
use crate::value_type::ValueType;

/// An invertible derivation step applied to a base type variable.
///
/// All four functions are bijections between their domain and image, so
/// each has exactly one inverse. Non-invertible derivations would take the
/// deferred-constraint path in unification instead; none exist today.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DerivedFunc {
    /// Same lanes, half the lane width.
    HalfWidth,
    /// Same lanes, double the lane width.
    DoubleWidth,
    /// Same lane type, half the lane count.
    HalfVector,
    /// Same lane type, double the lane count.
    DoubleVector,
}

impl DerivedFunc {
    /// Apply this derivation to a concrete type. `None` when the result
    /// falls off the valid type grid.
    pub fn apply(self, ty: ValueType) -> Option<ValueType> {
        match self {
            DerivedFunc::HalfWidth => ty.half_width(),
            DerivedFunc::DoubleWidth => ty.double_width(),
            DerivedFunc::HalfVector => ty.half_vector(),
            DerivedFunc::DoubleVector => ty.double_vector(),
        }
    }

    /// The unique inverse of this derivation.
    pub fn inverse(self) -> DerivedFunc {
        match self {
            DerivedFunc::HalfWidth => DerivedFunc::DoubleWidth,
            DerivedFunc::DoubleWidth => DerivedFunc::HalfWidth,
            DerivedFunc::HalfVector => DerivedFunc::DoubleVector,
            DerivedFunc::DoubleVector => DerivedFunc::HalfVector,
        }
    }

    /// Whether this derivation is invertible. Always true for the current
    /// set; unification falls back to a deferred constraint otherwise.
    pub fn is_bijection(self) -> bool {
        true
    }

    /// Is this a lane-width derivation (as opposed to a lane-count one)?
    pub fn is_width(self) -> bool {
        matches!(self, DerivedFunc::HalfWidth | DerivedFunc::DoubleWidth)
    }

    /// Is this a lane-count derivation?
    pub fn is_vector(self) -> bool {
        !self.is_width()
    }
}

impl fmt::Display for DerivedFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DerivedFunc::HalfWidth => "half_width",
            DerivedFunc::DoubleWidth => "double_width",
            DerivedFunc::HalfVector => "half_vector",
            DerivedFunc::DoubleVector => "double_vector",
        };
        f.write_str(name)
    }
}

/// Handle to a type variable in a `TypeVarPool`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(transparent)]
pub struct TvRef(u32);

impl TvRef {
    /// Create a handle from a raw index. Only meaningful for indices
    /// handed out by a pool.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        TvRef(raw)
    }

    /// The raw index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// A derivation chain, outermost function first.
pub type Chain = SmallVec<[DerivedFunc; 4]>;

enum TypeVarData {
    Free {
        name: Box<str>,
        ts: TypeSet,
        /// Singleton constants (`TypeVarPool::singleton`) are not
        /// enumerable free variables: `free_base` skips them.
        singleton: bool,
    },
    Derived {
        func: DerivedFunc,
        base: TvRef,
    },
}

/// Arena of type variable nodes.
#[derive(Default)]
pub struct TypeVarPool {
    nodes: Vec<TypeVarData>,
    /// Intern table for derived nodes: equal chains, equal handles.
    derived: FxHashMap<(DerivedFunc, TvRef), TvRef>,
}

impl TypeVarPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        TypeVarPool::default()
    }

    fn push(&mut self, data: TypeVarData) -> TvRef {
        let r = TvRef(u32::try_from(self.nodes.len()).unwrap_or_else(|_| {
            // 4 billion type variables means something upstream looped.
            panic!("type variable pool overflow")
        }));
        self.nodes.push(data);
        r
    }

    fn data(&self, tv: TvRef) -> &TypeVarData {
        &self.nodes[tv.0 as usize]
    }

    /// Create a named free type variable owning `ts`.
    pub fn free(&mut self, name: impl Into<Box<str>>, ts: TypeSet) -> TvRef {
        self.push(TypeVarData::Free {
            name: name.into(),
            ts,
            singleton: false,
        })
    }

    /// Create a singleton type variable fixed to one concrete type.
    ///
    /// Each call makes a fresh node: singleton typesets are still
    /// restricted in place during unification and must not be shared.
    pub fn singleton(&mut self, ty: ValueType) -> TvRef {
        self.push(TypeVarData::Free {
            name: ty.to_string().into_boxed_str(),
            ts: TypeSet::single(ty),
            singleton: true,
        })
    }

    /// Intern the derived type variable `func(base)`.
    pub fn derived(&mut self, func: DerivedFunc, base: TvRef) -> TvRef {
        if let Some(&r) = self.derived.get(&(func, base)) {
            return r;
        }
        let r = self.push(TypeVarData::Derived { func, base });
        self.derived.insert((func, base), r);
        r
    }

    /// Is this a derived node?
    pub fn is_derived(&self, tv: TvRef) -> bool {
        matches!(self.data(tv), TypeVarData::Derived { .. })
    }

    /// The `(func, base)` of a derived node, `None` for free nodes.
    pub fn derived_parts(&self, tv: TvRef) -> Option<(DerivedFunc, TvRef)> {
        match *self.data(tv) {
            TypeVarData::Derived { func, base } => Some((func, base)),
            TypeVarData::Free { .. } => None,
        }
    }

    /// The name of a free node (a singleton's name is its type).
    pub fn name(&self, tv: TvRef) -> Option<&str> {
        match self.data(tv) {
            TypeVarData::Free { name, .. } => Some(name),
            TypeVarData::Derived { .. } => None,
        }
    }

    /// Walk to the free root of a derivation chain. `None` when the root
    /// is a singleton constant rather than a proper free variable.
    pub fn free_base(&self, tv: TvRef) -> Option<TvRef> {
        let (root, _) = self.chain(tv);
        match self.data(root) {
            TypeVarData::Free {
                singleton: false, ..
            } => Some(root),
            _ => None,
        }
    }

    /// Decompose a node into its free-or-singleton root and the chain of
    /// derivation functions above it, outermost first.
    pub fn chain(&self, tv: TvRef) -> (TvRef, Chain) {
        let mut funcs = Chain::new();
        let mut cur = tv;
        while let TypeVarData::Derived { func, base } = *self.data(cur) {
            funcs.push(func);
            cur = base;
        }
        (cur, funcs)
    }

    /// Evaluate a derivation chain (outermost first, as produced by
    /// `chain`) at a concrete root type.
    pub fn eval_chain(ty: ValueType, funcs: &[DerivedFunc]) -> Option<ValueType> {
        funcs.iter().rev().try_fold(ty, |t, f| f.apply(t))
    }

    /// The current typeset of a node: the stored set for free nodes, the
    /// image along the chain for derived ones.
    pub fn typeset(&self, tv: TvRef) -> TypeSet {
        let (root, funcs) = self.chain(tv);
        let mut ts = match self.data(root) {
            TypeVarData::Free { ts, .. } => ts.clone(),
            TypeVarData::Derived { .. } => unreachable!("chain ends at a free node"),
        };
        for func in funcs.iter().rev() {
            ts = ts.image(*func);
        }
        ts
    }

    /// Restrict `tv`'s typeset to (at most) `other`'s, in place.
    pub fn constrain(&mut self, tv: TvRef, other: TvRef) {
        let ts = self.typeset(other);
        self.constrain_to(tv, &ts);
    }

    /// Restrict `tv`'s typeset to (at most) `ts`, in place.
    ///
    /// The restriction is pulled back through `tv`'s derivation chain and
    /// applied to the free root's stored typeset, which only shrinks.
    pub fn constrain_to(&mut self, tv: TvRef, ts: &TypeSet) {
        let mut ts = ts.clone();
        let (root, funcs) = self.chain(tv);
        for func in &funcs {
            ts = ts.preimage(*func);
        }
        match &mut self.nodes[root.0 as usize] {
            TypeVarData::Free { ts: root_ts, .. } => root_ts.constrain(&ts),
            TypeVarData::Derived { .. } => unreachable!("chain ends at a free node"),
        }
    }

    /// Clone a free variable under a uniquified name (`{name}.{uid}`).
    ///
    /// Used to instantiate instruction signatures per definition so that
    /// inference never mutates the formal typesets.
    pub fn fresh_copy(&mut self, tv: TvRef, uid: u32) -> TvRef {
        match self.data(tv) {
            TypeVarData::Free {
                name,
                ts,
                singleton: false,
            } => {
                let copy_name = format!("{name}.{uid}").into_boxed_str();
                let ts = ts.clone();
                self.push(TypeVarData::Free {
                    name: copy_name,
                    ts,
                    singleton: false,
                })
            }
            _ => panic!("fresh_copy of a non-free type variable"),
        }
    }

    /// Substitute free leaves of `tv` by `map`, rebuilding derivation
    /// wrapping above any replaced leaf.
    pub fn subst(&mut self, tv: TvRef, map: &FxHashMap<TvRef, TvRef>) -> TvRef {
        if let Some(&r) = map.get(&tv) {
            return r;
        }
        match self.data(tv) {
            TypeVarData::Derived { func, base } => {
                let (func, base) = (*func, *base);
                let new_base = self.subst(base, map);
                self.derived(func, new_base)
            }
            TypeVarData::Free { .. } => tv,
        }
    }

    /// Render a type variable: `typeof_x`, `half_width(typeof_x.3)`, `i32`.
    pub fn display(&self, tv: TvRef) -> String {
        match self.data(tv) {
            TypeVarData::Free { name, .. } => name.to_string(),
            TypeVarData::Derived { func, base } => {
                format!("{func}({})", self.display(*base))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "tests can panic")]

    use super::*;
    use crate::typeset::TypeSetBuilder;
    use pretty_assertions::assert_eq;

    fn int_ts(range: std::ops::RangeInclusive<u16>) -> TypeSet {
        TypeSetBuilder::new().ints(range).build()
    }

    #[test]
    fn derived_nodes_are_interned() {
        let mut pool = TypeVarPool::new();
        let t = pool.free("typeof_t", int_ts(8..=64));
        let a = pool.derived(DerivedFunc::HalfWidth, t);
        let b = pool.derived(DerivedFunc::HalfWidth, t);
        assert_eq!(a, b);
        let c = pool.derived(DerivedFunc::DoubleWidth, t);
        assert!(a != c);
    }

    #[test]
    fn derived_typeset_is_chain_image() {
        let mut pool = TypeVarPool::new();
        let t = pool.free("typeof_t", int_ts(16..=64));
        let h = pool.derived(DerivedFunc::HalfWidth, t);
        assert_eq!(pool.typeset(h).to_string(), "{i8, i16, i32}");
        let hh = pool.derived(DerivedFunc::HalfWidth, h);
        assert_eq!(pool.typeset(hh).to_string(), "{i8, i16}");
    }

    #[test]
    fn constrain_pulls_back_to_root() {
        let mut pool = TypeVarPool::new();
        let t = pool.free("typeof_t", int_ts(16..=64));
        let h = pool.derived(DerivedFunc::HalfWidth, t);
        let out = pool.free("typeof_out", int_ts(8..=8));
        pool.constrain(h, out);
        // half_width(t) in {i8}  =>  t in {i16}.
        assert_eq!(pool.typeset(t).to_string(), "{i16}");
        assert_eq!(pool.typeset(h).to_string(), "{i8}");
    }

    #[test]
    fn free_base_skips_singletons() {
        let mut pool = TypeVarPool::new();
        let t = pool.free("typeof_t", int_ts(8..=64));
        let h = pool.derived(DerivedFunc::HalfVector, t);
        assert_eq!(pool.free_base(h), Some(t));

        let s = pool.singleton(crate::ValueType::int(32).unwrap());
        assert_eq!(pool.free_base(s), None);
        let hs = pool.derived(DerivedFunc::DoubleWidth, s);
        assert_eq!(pool.free_base(hs), None);
    }

    #[test]
    fn subst_distributes_over_derivation() {
        let mut pool = TypeVarPool::new();
        let t = pool.free("typeof_t", int_ts(8..=64));
        let u = pool.free("typeof_t.0", int_ts(8..=64));
        let h = pool.derived(DerivedFunc::HalfWidth, t);

        let mut map = FxHashMap::default();
        map.insert(t, u);
        let hu = pool.subst(h, &map);
        assert_eq!(pool.display(hu), "half_width(typeof_t.0)");
        assert_eq!(pool.derived_parts(hu), Some((DerivedFunc::HalfWidth, u)));
    }

    #[test]
    fn fresh_copy_uniquifies_name_and_keeps_typeset() {
        let mut pool = TypeVarPool::new();
        let t = pool.free("typeof_t", int_ts(8..=16));
        let c = pool.fresh_copy(t, 7);
        assert_eq!(pool.display(c), "typeof_t.7");
        assert_eq!(pool.typeset(c), pool.typeset(t));
        assert!(c != t);
    }

    #[test]
    fn eval_chain_applies_innermost_first() {
        let i32s = crate::ValueType::int(32).unwrap();
        // chain as produced by `chain`: outermost first.
        let funcs = [DerivedFunc::DoubleWidth, DerivedFunc::HalfWidth];
        // half_width(i32) = i16, then double_width(i16) = i32.
        assert_eq!(TypeVarPool::eval_chain(i32s, &funcs), Some(i32s));
    }
}
