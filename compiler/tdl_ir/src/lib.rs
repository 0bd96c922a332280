//! Core data model for the TDL rewrite-rule compiler.
//!
//! This crate is the primitive layer consumed by the type-inference
//! engine (`tdl_types`): concrete machine types and typesets, type
//! variables (free or derived, in a handle-addressed arena), program
//! variables, instruction signatures, and rewrite-rule structures.
//!
//! Everything is addressed by 32-bit `Copy` handles (`TvRef`, `VarRef`,
//! `InstRef`) into pools, giving O(1) equality/hashing and no recursive
//! ownership.

mod instr;
mod typeset;
mod typevar;
mod value_type;
mod var;
mod xform;

pub use instr::{InstRef, InstSet, Instruction, Operand, OperandKind};
pub use typeset::{TypeSet, TypeSetBuilder};
pub use typevar::{Chain, DerivedFunc, TvRef, TypeVarPool};
pub use value_type::{LaneClass, ValueType, MAX_LANES};
pub use var::{VarFlags, VarPool, VarRef, VarRole};
pub use xform::{Def, DefArg, Pattern, PatternSide, Rule};
