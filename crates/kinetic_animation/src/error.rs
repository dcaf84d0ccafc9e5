//! Animation errors

use crate::value::ValueKind;
use thiserror::Error;

/// Errors raised while building an interpolator or stepping a spring.
///
/// All of them are caller mistakes (a value that cannot be animated, or a
/// target whose shape does not match the current value) and are returned
/// before any state changes.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum AnimationError {
    #[error("cannot animate {kind} values")]
    Unsupported { kind: ValueKind },

    #[error("cannot interpolate values of different kind ({from} to {to})")]
    KindMismatch { from: ValueKind, to: ValueKind },

    #[error("cannot interpolate a null operand")]
    NullOperand,

    #[error("value shapes do not match: {detail}")]
    ShapeMismatch { detail: String },
}

pub type Result<T> = std::result::Result<T, AnimationError>;
