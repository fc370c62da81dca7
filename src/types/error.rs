use thiserror::Error;

use super::string_condition::StringOp;

/// Errors raised while assembling conditions and dispatch cases.
///
/// Every variant is a configuration-time failure: a dispatcher is never
/// built from a partially valid rule. Variants produced by the expression
/// builder carry the infix trace accumulated so far, so the message points
/// at the exact spot in the fluent chain that went wrong.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("condition slot already occupied at{trace}")]
    OccupiedSlot { trace: String },

    #[error("operator is missing a left operand at{trace}")]
    MissingOperand { trace: String },

    #[error("unmatched group delimiter at{trace}")]
    UnmatchedGroup { trace: String },

    #[error("incomplete condition expression at{trace}")]
    Incomplete { trace: String },

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("string operation '{op}' requires a parameter")]
    MissingParam { op: StringOp },

    #[error("case {index} has no condition")]
    MissingCondition { index: usize },

    #[error("case {index} has no action")]
    MissingAction { index: usize },
}

/// Errors raised by an action while producing a response.
///
/// Unlike extraction failures (which degrade inside the leaf), an action
/// failure aborts the current dispatch and propagates to the caller.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unsupported resource scheme in '{locator}'")]
    UnsupportedScheme { locator: String },
}
