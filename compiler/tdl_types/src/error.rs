//! Structured inference errors.
//!
//! Two layers: `UnifyError` describes why a single unification failed;
//! `TypeError` wraps it with the rule-level position (pattern side,
//! definition index, operand pair). All fields are public so tests and
//! downstream tooling can assert on structure instead of scraping
//! messages.
//!
//! Invariant violations (engine bugs, malformed input) are *not* errors:
//! they are asserts and panic.

use tdl_ir::PatternSide;
use thiserror::Error;

/// Why two type variables failed to unify.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum UnifyError {
    /// Restricting both operands to their intersection left one empty.
    #[error("empty typeset created when unifying `{left}` and `{right}`")]
    EmptyTypeSet {
        /// Display form of the higher-priority operand.
        left: String,
        /// Display form of the other operand.
        right: String,
    },

    /// A destination-side argument variable is defined on neither side
    /// and never appeared in the source pattern.
    #[error("variable `{var}` is used but bound on neither side of the rule")]
    Unbound {
        /// The variable's name.
        var: String,
    },
}

/// An inference failure located within a rule.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub struct TypeError {
    /// Which side of the rule failed (`None` before rule-level tagging).
    pub side: Option<PatternSide>,
    /// Zero-based index of the failing definition within its pattern.
    pub def_index: usize,
    /// Display form of the actual (program-variable) type variable.
    pub actual: String,
    /// Display form of the formal (signature) type variable.
    pub formal: String,
    /// The underlying unification failure.
    #[source]
    pub source: UnifyError,
}

impl TypeError {
    /// Tag this error with the pattern side it occurred on.
    #[must_use]
    pub fn on_side(mut self, side: PatternSide) -> Self {
        self.side = Some(side);
        self
    }
}

impl std::fmt::Display for TypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(side) = self.side {
            write!(f, "in {side} pattern, ")?;
        }
        write!(
            f,
            "definition {}: cannot unify `{}` with `{}`: {}",
            self.def_index, self.actual, self.formal, self.source
        )
    }
}
