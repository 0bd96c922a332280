//! Definitions, patterns, and rewrite rules.
//!
//! A *definition* is one instruction application: result variables on the
//! left, the instruction (with optional explicit type bindings) and its
//! arguments on the right. An ordered sequence of definitions is a
//! *pattern*; a rewrite rule pairs a source pattern with the destination
//! pattern it legalizes into.

use std::fmt;

use crate::instr::InstRef;
use crate::value_type::ValueType;
use crate::var::{VarFlags, VarPool, VarRef};

/// Which side of a rewrite rule a pattern is.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PatternSide {
    /// The pattern being matched.
    Source,
    /// The replacement pattern.
    Destination,
}

impl fmt::Display for PatternSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternSide::Source => f.write_str("source"),
            PatternSide::Destination => f.write_str("destination"),
        }
    }
}

/// One argument of a definition.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DefArg {
    /// A program variable. Required at value-operand positions.
    Var(VarRef),
    /// An immediate literal.
    Imm(i64),
}

impl DefArg {
    /// The variable, if this argument is one.
    pub fn as_var(self) -> Option<VarRef> {
        match self {
            DefArg::Var(v) => Some(v),
            DefArg::Imm(_) => None,
        }
    }
}

/// One instruction application within a pattern.
#[derive(Clone, Debug)]
pub struct Def {
    /// The applied instruction.
    pub inst: InstRef,
    /// Explicit type bindings, positional against the instruction's free
    /// formal type variables (controlling first). May bind a prefix only.
    pub bound_types: Vec<ValueType>,
    /// Arguments, aligned with the instruction's input operands.
    pub args: Vec<DefArg>,
    /// Result variables, aligned with the instruction's output operands.
    pub defined: Vec<VarRef>,
}

impl Def {
    /// A definition with no explicit type bindings.
    pub fn new(inst: InstRef, defined: Vec<VarRef>, args: Vec<DefArg>) -> Self {
        Def {
            inst,
            bound_types: Vec::new(),
            args,
            defined,
        }
    }

    /// A definition with explicit type bindings (`inst.i32` style).
    pub fn with_types(
        inst: InstRef,
        bound_types: Vec<ValueType>,
        defined: Vec<VarRef>,
        args: Vec<DefArg>,
    ) -> Self {
        Def {
            inst,
            bound_types,
            args,
            defined,
        }
    }
}

/// One ordered side of a rewrite rule.
#[derive(Clone, Debug, Default)]
pub struct Pattern {
    /// Definitions, in execution order.
    pub defs: Vec<Def>,
}

impl Pattern {
    /// Build a pattern from definitions.
    pub fn new(defs: Vec<Def>) -> Self {
        Pattern { defs }
    }
}

/// A rewrite rule: replace matches of `src` with `dst`.
pub struct Rule {
    /// Rule name, for diagnostics.
    pub name: Box<str>,
    /// Pattern being matched.
    pub src: Pattern,
    /// Replacement pattern.
    pub dst: Pattern,
}

impl Rule {
    /// Build a rule, recording on every variable which side(s) define it.
    /// Definition-site flags drive role classification and thereby the
    /// rank order used during inference.
    pub fn new(name: impl Into<Box<str>>, src: Pattern, dst: Pattern, vars: &mut VarPool) -> Self {
        for def in &src.defs {
            for &v in &def.defined {
                vars.add_flags(v, VarFlags::SRC_DEF);
            }
        }
        for def in &dst.defs {
            for &v in &def.defined {
                vars.add_flags(v, VarFlags::DST_DEF);
            }
        }
        Rule {
            name: name.into(),
            src,
            dst,
        }
    }

    /// The pattern on the given side.
    pub fn pattern(&self, side: PatternSide) -> &Pattern {
        match side {
            PatternSide::Source => &self.src,
            PatternSide::Destination => &self.dst,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::{InstSet, Instruction, Operand};
    use crate::typeset::TypeSetBuilder;
    use crate::typevar::TypeVarPool;
    use crate::var::VarRole;
    use pretty_assertions::assert_eq;

    #[test]
    fn rule_construction_sets_roles() {
        let mut tvs = TypeVarPool::new();
        let mut vars = VarPool::new();
        let mut insts = InstSet::new();

        let t = tvs.free("T", TypeSetBuilder::new().ints(8..=64).build());
        let iadd = insts.add(Instruction::new(
            "iadd",
            vec![Operand::value("x", t), Operand::value("y", t)],
            vec![Operand::value("r", t)],
            &tvs,
        ));

        let (a, b, mid, out) = (
            vars.var("a", &mut tvs),
            vars.var("b", &mut tvs),
            vars.var("mid", &mut tvs),
            vars.var("out", &mut tvs),
        );

        // src:  mid = iadd(a, b); out = iadd(mid, b)
        // dst:  out = iadd(a, b)        (mid disappears)
        let src = Pattern::new(vec![
            Def::new(iadd, vec![mid], vec![DefArg::Var(a), DefArg::Var(b)]),
            Def::new(iadd, vec![out], vec![DefArg::Var(mid), DefArg::Var(b)]),
        ]);
        let dst = Pattern::new(vec![Def::new(
            iadd,
            vec![out],
            vec![DefArg::Var(a), DefArg::Var(b)],
        )]);

        let rule = Rule::new("fold_add", src, dst, &mut vars);
        assert_eq!(vars.role(a), VarRole::Input);
        assert_eq!(vars.role(b), VarRole::Input);
        assert_eq!(vars.role(mid), VarRole::Intermediate);
        assert_eq!(vars.role(out), VarRole::Output);
        assert_eq!(rule.pattern(PatternSide::Source).defs.len(), 2);
        assert_eq!(rule.pattern(PatternSide::Destination).defs.len(), 1);
    }
}
