//! Program variables appearing in rewrite-rule patterns.
//!
//! Each variable owns exactly one free type variable (`typeof_<name>`,
//! full typeset). Which side(s) of a rule define the variable determines
//! its role, and the role determines the rank used to orient unification.

use bitflags::bitflags;

use crate::typeset::TypeSet;
use crate::typevar::{TvRef, TypeVarPool};

bitflags! {
    /// Where a variable is defined within its rule.
    #[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
    pub struct VarFlags: u8 {
        /// Defined (appears as a result) in the source pattern.
        const SRC_DEF = 1 << 0;
        /// Defined in the destination pattern.
        const DST_DEF = 1 << 1;
    }
}

/// Role of a program variable, derived from its definition sites.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum VarRole {
    /// Never defined: flows into the rule from outside.
    Input,
    /// Defined by both sides: a result the rewrite must preserve.
    Output,
    /// Defined only in the source pattern: consumed within it.
    Intermediate,
    /// Defined only in the destination pattern: a helper value of the
    /// expansion.
    Temp,
}

/// Handle to a program variable in a `VarPool`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(transparent)]
pub struct VarRef(u32);

impl VarRef {
    /// Create a handle from a raw index.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        VarRef(raw)
    }

    /// The raw index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

struct Var {
    name: Box<str>,
    tv: TvRef,
    flags: VarFlags,
}

/// Arena of program variables.
#[derive(Default)]
pub struct VarPool {
    vars: Vec<Var>,
}

impl VarPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        VarPool::default()
    }

    /// Create a variable named `name`, giving it a fresh free type
    /// variable `typeof_<name>` over the full type grid.
    pub fn var(&mut self, name: impl Into<Box<str>>, tvs: &mut TypeVarPool) -> VarRef {
        let name = name.into();
        let tv = tvs.free(format!("typeof_{name}"), TypeSet::all());
        let r = VarRef(u32::try_from(self.vars.len()).unwrap_or_else(|_| {
            panic!("program variable pool overflow")
        }));
        self.vars.push(Var {
            name,
            tv,
            flags: VarFlags::empty(),
        });
        r
    }

    /// The variable's name.
    pub fn name(&self, v: VarRef) -> &str {
        &self.vars[v.0 as usize].name
    }

    /// The variable's type variable.
    pub fn typevar(&self, v: VarRef) -> TvRef {
        self.vars[v.0 as usize].tv
    }

    /// The variable's definition-site flags.
    pub fn flags(&self, v: VarRef) -> VarFlags {
        self.vars[v.0 as usize].flags
    }

    /// Record definition sites (called during rule construction).
    pub fn add_flags(&mut self, v: VarRef, flags: VarFlags) {
        self.vars[v.0 as usize].flags |= flags;
    }

    /// The variable's role, from its definition sites.
    pub fn role(&self, v: VarRef) -> VarRole {
        let flags = self.flags(v);
        match (
            flags.contains(VarFlags::SRC_DEF),
            flags.contains(VarFlags::DST_DEF),
        ) {
            (false, false) => VarRole::Input,
            (true, true) => VarRole::Output,
            (true, false) => VarRole::Intermediate,
            (false, true) => VarRole::Temp,
        }
    }

    /// Number of variables in the pool.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Is the pool empty?
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
