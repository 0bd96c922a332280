//! Finite sets of concrete machine types.
//!
//! A `TypeSet` records which concrete types a type variable may still
//! assume. Inference only ever *shrinks* typesets (in-place intersection);
//! growth would invalidate decisions already taken against earlier
//! contents. Backed by a `BTreeSet` so member enumeration — and therefore
//! concrete-typing enumeration downstream — is deterministic.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;

use crate::value_type::{LaneClass, ValueType, MAX_LANES};
use crate::DerivedFunc;

/// The set of concrete types a type variable can currently assume.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct TypeSet {
    members: BTreeSet<ValueType>,
}

impl TypeSet {
    /// The empty typeset.
    pub fn empty() -> Self {
        TypeSet::default()
    }

    /// The full grid: every valid scalar and vector type.
    pub fn all() -> Self {
        TypeSetBuilder::new()
            .ints(8..=64)
            .floats(32..=64)
            .bools(1..=64)
            .lanes(1..=MAX_LANES)
            .build()
    }

    /// Typeset containing exactly one type.
    pub fn single(ty: ValueType) -> Self {
        let mut members = BTreeSet::new();
        members.insert(ty);
        TypeSet { members }
    }

    /// Build from an iterator of members.
    pub fn of(iter: impl IntoIterator<Item = ValueType>) -> Self {
        TypeSet {
            members: iter.into_iter().collect(),
        }
    }

    /// Number of member types.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Is the set empty?
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Membership test.
    pub fn contains(&self, ty: ValueType) -> bool {
        self.members.contains(&ty)
    }

    /// Is every member of `self` also in `other`?
    pub fn is_subset(&self, other: &TypeSet) -> bool {
        self.members.is_subset(&other.members)
    }

    /// If the set has exactly one member, return it.
    pub fn get_singleton(&self) -> Option<ValueType> {
        if self.members.len() == 1 {
            self.members.iter().next().copied()
        } else {
            None
        }
    }

    /// Restrict `self` to its intersection with `other`, in place.
    ///
    /// This is the only mutation a typeset supports after construction.
    pub fn constrain(&mut self, other: &TypeSet) {
        self.members.retain(|ty| other.members.contains(ty));
    }

    /// Iterate over the members in ascending `ValueType` order.
    pub fn iter(&self) -> impl Iterator<Item = ValueType> + '_ {
        self.members.iter().copied()
    }

    /// The image of this set under a derivation function.
    ///
    /// Members the function cannot be applied to (off-grid results) are
    /// dropped, so the image of a non-empty set can be empty.
    pub fn image(&self, func: DerivedFunc) -> TypeSet {
        TypeSet {
            members: self.iter().filter_map(|ty| func.apply(ty)).collect(),
        }
    }

    /// The preimage of this set under a derivation function.
    ///
    /// Every derivation function is a bijection between its domain and
    /// image, so the preimage is the image under the inverse.
    pub fn preimage(&self, func: DerivedFunc) -> TypeSet {
        self.image(func.inverse())
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, ty) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ty}")?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<ValueType> for TypeSet {
    fn from_iter<I: IntoIterator<Item = ValueType>>(iter: I) -> Self {
        TypeSet::of(iter)
    }
}

/// Builder for the common rectangular typesets (a lane-count range crossed
/// with per-class width ranges).
///
/// Width ranges are inclusive and snapped to the valid grid, so
/// `.ints(8..=64)` yields `{i8, i16, i32, i64}` lanes.
#[derive(Clone, Debug, Default)]
pub struct TypeSetBuilder {
    lanes: Option<RangeInclusive<u16>>,
    ints: Option<RangeInclusive<u16>>,
    floats: Option<RangeInclusive<u16>>,
    bools: Option<RangeInclusive<u16>>,
}

impl TypeSetBuilder {
    /// Start an empty builder. With no width ranges the result is empty.
    pub fn new() -> Self {
        TypeSetBuilder::default()
    }

    /// Include vector forms with lane counts in `range` (scalars are
    /// `1..=1`, the default when this is never called).
    #[must_use]
    pub fn lanes(mut self, range: RangeInclusive<u16>) -> Self {
        self.lanes = Some(range);
        self
    }

    /// Include integer lanes with widths in `range`.
    #[must_use]
    pub fn ints(mut self, range: RangeInclusive<u16>) -> Self {
        self.ints = Some(range);
        self
    }

    /// Include float lanes with widths in `range`.
    #[must_use]
    pub fn floats(mut self, range: RangeInclusive<u16>) -> Self {
        self.floats = Some(range);
        self
    }

    /// Include boolean lanes with widths in `range`.
    #[must_use]
    pub fn bools(mut self, range: RangeInclusive<u16>) -> Self {
        self.bools = Some(range);
        self
    }

    /// Produce the cross product of the configured ranges.
    pub fn build(self) -> TypeSet {
        let lanes = self.lanes.unwrap_or(1..=1);
        let mut members = BTreeSet::new();

        let classes = [
            (LaneClass::Int, self.ints),
            (LaneClass::Float, self.floats),
            (LaneClass::Bool, self.bools),
        ];
        for (class, widths) in classes {
            let Some(widths) = widths else { continue };
            let mut bits = class.min_bits();
            while bits <= class.max_bits() {
                if widths.contains(&bits) && class.valid_bits(bits) {
                    let mut n = 1u16;
                    while n <= MAX_LANES {
                        if lanes.contains(&n) {
                            if let Some(ty) = ValueType::new(class, bits, n) {
                                members.insert(ty);
                            }
                        }
                        n *= 2;
                    }
                }
                // b1 -> b8 is the one non-doubling step on the width ladder.
                bits = if bits == 1 { 8 } else { bits * 2 };
            }
        }

        TypeSet { members }
    }
}
