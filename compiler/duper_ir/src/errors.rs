//! Error taxonomy for plan construction, compilation and invocation.
//!
//! Every fallible operation in the workspace returns `DupResult`. The
//! constructor functions below are the canonical way to build errors, so
//! message wording stays in one place.

use thiserror::Error;

/// Result alias used throughout the duper crates.
pub type DupResult<T> = Result<T, DupError>;

/// Errors raised while building, compiling or invoking a copy plan.
#[derive(Debug, Error)]
pub enum DupError {
    /// The value offers no usable decomposition.
    #[error("cannot duplicate value of type `{type_name}`: no usable decomposition")]
    NotDuplicable { type_name: String },

    /// A decomposition hook returned a tuple with an unrecognized number of
    /// trailing components.
    #[error("unsupported decomposition shape: {len} components (at most 5 are recognized)")]
    UnsupportedShape { len: usize },

    /// An in-progress identity was revisited before its owning node finished
    /// constructing. True self-referential cycles are unimplemented by design.
    #[error("cannot duplicate `{type_name}`: value references itself before its construction finishes")]
    UnsupportedCycle { type_name: String },

    /// The compiled procedure raised when sanity-invoked.
    #[error("compiled procedure failed its sanity invocation")]
    Validation {
        #[source]
        cause: Box<DupError>,
    },

    /// A caller supplied an alias table to a one-shot duplication call.
    #[error("caller-provided alias tables are not supported")]
    MemoUnsupported,

    /// A reduction named a constructor that cannot be called.
    #[error("value of type `{type_name}` is not callable")]
    NotCallable { type_name: String },

    /// A class without a `construct` hook was called with arguments.
    #[error("class `{class}` takes no constructor arguments ({count} given)")]
    CtorArgs { class: String, count: usize },

    /// Reconstruction state was applied to a value that has no attribute
    /// storage.
    #[error("cannot apply reconstruction state to value of type `{type_name}`")]
    StateNotApplicable { type_name: String },

    /// Sequence items were applied to a value without append support.
    #[error("value of type `{type_name}` does not accept appended items")]
    AppendNotSupported { type_name: String },

    /// Mapping items were applied to a value without keyed assignment.
    #[error("value of type `{type_name}` does not accept keyed items")]
    SetItemNotSupported { type_name: String },

    /// A user-supplied hook failed or returned a malformed result.
    #[error("{0}")]
    Hook(String),
}

pub fn not_duplicable(type_name: &str) -> DupError {
    DupError::NotDuplicable {
        type_name: type_name.to_string(),
    }
}

pub fn unsupported_shape(len: usize) -> DupError {
    DupError::UnsupportedShape { len }
}

pub fn unsupported_cycle(type_name: &str) -> DupError {
    DupError::UnsupportedCycle {
        type_name: type_name.to_string(),
    }
}

pub fn not_callable(type_name: &str) -> DupError {
    DupError::NotCallable {
        type_name: type_name.to_string(),
    }
}

pub fn ctor_args(class: &str, count: usize) -> DupError {
    DupError::CtorArgs {
        class: class.to_string(),
        count,
    }
}

pub fn state_not_applicable(type_name: &str) -> DupError {
    DupError::StateNotApplicable {
        type_name: type_name.to_string(),
    }
}

pub fn append_not_supported(type_name: &str) -> DupError {
    DupError::AppendNotSupported {
        type_name: type_name.to_string(),
    }
}

pub fn set_item_not_supported(type_name: &str) -> DupError {
    DupError::SetItemNotSupported {
        type_name: type_name.to_string(),
    }
}

pub fn hook_error(message: impl Into<String>) -> DupError {
    DupError::Hook(message.into())
}
