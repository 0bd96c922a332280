//! Type inference for rewrite rules.
//!
//! Given a rewrite rule over polymorphic instruction signatures, infer
//! the most general typing of its program variables: a [`TypeEnv`]
//! mapping each variable's type variable to a canonical representative
//! (possibly derived from another variable's), plus deferred constraints
//! unification could not discharge. The environment can then enumerate
//! every concrete typing lazily.
//!
//! Entry point: [`ti_rule`]. The building blocks ([`unify`],
//! [`normalize_tv`], [`TypeEnv`]) are public for tests and tooling.

mod constraint;
mod dot;
mod env;
mod error;
mod infer;
mod typings;
mod unify;

pub use constraint::Constraint;
pub use env::{Rank, TypeEnv};
pub use error::{TypeError, UnifyError};
pub use infer::{ti_def, ti_pattern, ti_rule};
pub use typings::{ConcreteTyping, ConcreteTypings};
pub use unify::{constrain_fixpoint, normalize_tv, unify};
