//! Instruction signatures.
//!
//! An instruction declares its input and output operands; operands either
//! carry a value type (a type variable, possibly derived) or are
//! immediates. A signature's *formal* type variables are templates: the
//! inference driver instantiates a fresh copy of each free formal per
//! definition, so the typesets stored here are never mutated.

use smallvec::SmallVec;

use crate::typevar::{TvRef, TypeVarPool};

/// What an operand position carries.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum OperandKind {
    /// A runtime value whose type is described by a type variable.
    Value(TvRef),
    /// An immediate; no value type to infer.
    Imm,
}

/// One operand position of an instruction signature.
#[derive(Clone, Debug)]
pub struct Operand {
    /// Operand name, for diagnostics.
    pub name: Box<str>,
    /// Value type variable or immediate.
    pub kind: OperandKind,
}

impl Operand {
    /// A value operand typed by `tv`.
    pub fn value(name: impl Into<Box<str>>, tv: TvRef) -> Self {
        Operand {
            name: name.into(),
            kind: OperandKind::Value(tv),
        }
    }

    /// An immediate operand.
    pub fn imm(name: impl Into<Box<str>>) -> Self {
        Operand {
            name: name.into(),
            kind: OperandKind::Imm,
        }
    }

    /// The operand's type variable, if it carries a value.
    pub fn typevar(&self) -> Option<TvRef> {
        match self.kind {
            OperandKind::Value(tv) => Some(tv),
            OperandKind::Imm => None,
        }
    }
}

/// Handle to an instruction in an `InstSet`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct InstRef(u32);

impl InstRef {
    /// Create a handle from a raw index.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        InstRef(raw)
    }

    /// The raw index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// An instruction signature.
///
/// `value_opnums` / `value_results` list the operand positions that carry
/// value types; `typevars` lists the distinct free formal type variables
/// in binding order — the controlling type variable (free root of the
/// first value result, else of the first value operand) first, then the
/// rest in signature order. Explicit type bindings on a definition bind
/// positionally against this list.
pub struct Instruction {
    /// Instruction name.
    pub name: Box<str>,
    /// Input operands.
    pub ins: Vec<Operand>,
    /// Output operands.
    pub outs: Vec<Operand>,
    /// Indices into `ins` that carry value types.
    pub value_opnums: SmallVec<[usize; 4]>,
    /// Indices into `outs` that carry value types.
    pub value_results: SmallVec<[usize; 4]>,
    /// Distinct free formal type variables, controlling first.
    pub typevars: SmallVec<[TvRef; 4]>,
}

impl Instruction {
    /// Build a signature, computing value positions and the free formal
    /// type variable list.
    pub fn new(
        name: impl Into<Box<str>>,
        ins: Vec<Operand>,
        outs: Vec<Operand>,
        tvs: &TypeVarPool,
    ) -> Self {
        let value_opnums = ins
            .iter()
            .enumerate()
            .filter_map(|(i, op)| op.typevar().map(|_| i))
            .collect();
        let value_results = outs
            .iter()
            .enumerate()
            .filter_map(|(i, op)| op.typevar().map(|_| i))
            .collect();

        // Free roots in binding order: results first (the controlling
        // type variable comes from the first value result), then inputs.
        let mut typevars = SmallVec::new();
        let formal_tvs = outs.iter().chain(ins.iter()).filter_map(Operand::typevar);
        for tv in formal_tvs {
            if let Some(root) = tvs.free_base(tv) {
                if !typevars.contains(&root) {
                    typevars.push(root);
                }
            }
        }

        Instruction {
            name: name.into(),
            ins,
            outs,
            value_opnums,
            value_results,
            typevars,
        }
    }

    /// Does this instruction have free formal type variables?
    pub fn is_polymorphic(&self) -> bool {
        !self.typevars.is_empty()
    }

    /// The controlling type variable, if polymorphic.
    pub fn ctrl_typevar(&self) -> Option<TvRef> {
        self.typevars.first().copied()
    }
}

/// Arena of instruction signatures.
#[derive(Default)]
pub struct InstSet {
    insts: Vec<Instruction>,
}

impl InstSet {
    /// Create an empty set.
    pub fn new() -> Self {
        InstSet::default()
    }

    /// Add an instruction, returning its handle.
    pub fn add(&mut self, inst: Instruction) -> InstRef {
        let r = InstRef(u32::try_from(self.insts.len()).unwrap_or_else(|_| {
            panic!("instruction set overflow")
        }));
        self.insts.push(inst);
        r
    }

    /// Look up an instruction.
    pub fn get(&self, r: InstRef) -> &Instruction {
        &self.insts[r.0 as usize]
    }
}
