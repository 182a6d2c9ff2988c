//! Error types for registry operations.
//!
//! Every registry operation returns a [`ParamResult`]. Nothing is retried and
//! nothing unwinds: a failure leaves the target field or aggregate in its last
//! known-good state, except that a failed regeneration leaves the owner dirty.

use thiserror::Error;

use crate::kind::OwnerKind;

/// Result type for registry operations.
pub type ParamResult<T> = Result<T, ParamError>;

/// Broad family an error belongs to.
///
/// Callers that read configuration units (parameter files, scripts) stop on
/// any error; the class only helps them word the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Unknown or disabled field, shape mismatch, bad index or text.
    Configuration,
    /// The accessor refused a structurally valid value.
    ValueRejected,
    /// Allocation failure or an owner already borrowed.
    Resource,
    /// Regeneration found a dependent aggregate inconsistent.
    Consistency,
}

/// Errors raised while defining, resolving, writing, regenerating or rendering fields.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    /// No field with this name is reachable from the searched list.
    #[error("unknown parameter '{0}'")]
    UnknownField(String),

    /// Field index past the end of the list.
    #[error("no field at index {index} (list has {len})")]
    NoSuchIndex {
        /// Requested index.
        index: usize,
        /// Number of slots in the list.
        len: usize,
    },

    /// The slot exists but was never populated with [`define`](crate::FieldList::define).
    #[error("field slot {0} has not been defined")]
    Undefined(usize),

    /// The slot was already populated.
    #[error("field slot {index} is already defined as '{name}'")]
    AlreadyDefined {
        /// Slot index.
        index: usize,
        /// Name of the existing field.
        name: &'static str,
    },

    /// The field is currently inactive.
    #[error("parameter '{0}' is disabled")]
    Disabled(String),

    /// The (owner kind, field kind) pair has no entry in the dispatch table.
    #[error("parameter '{field}': {kind} fields are not allowed on a {owner} list")]
    KindNotAllowed {
        /// Field name.
        field: &'static str,
        /// Field kind name.
        kind: &'static str,
        /// Owner kind of the list.
        owner: OwnerKind,
    },

    /// The supplied storage or setter has the wrong shape for the field kind.
    #[error("parameter '{field}': {kind} fields need a {expected} accessor, got {found}")]
    ShapeMismatch {
        /// Field name.
        field: &'static str,
        /// Field kind name.
        kind: &'static str,
        /// Shape required by the dispatch table.
        expected: &'static str,
        /// Shape that was supplied.
        found: &'static str,
    },

    /// Handle-kind fields expose nested lists and take no value themselves.
    #[error("parameter '{0}' does not take a value")]
    NotSettable(String),

    /// Array index at or past the current element count of a fixed array.
    #[error("parameter '{field}': index {index} out of range (0..{len})")]
    IndexOutOfRange {
        /// Field name.
        field: String,
        /// Offending index.
        index: usize,
        /// Current element count.
        len: usize,
    },

    /// Leading array index text is not a non-negative integer.
    #[error("parameter '{field}': malformed array index in '{text}'")]
    MalformedIndex {
        /// Field name.
        field: String,
        /// Text that failed to parse.
        text: String,
    },

    /// Opening quote without a closing quote, or text after the closing quote.
    #[error("parameter '{field}': malformed quoted string {text}")]
    MalformedQuote {
        /// Field name.
        field: String,
        /// Text that failed to parse.
        text: String,
    },

    /// Value text cannot be read as the field's primitive type.
    #[error("parameter '{field}': cannot read '{value}' as {expected}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// Text that failed to parse.
        value: String,
        /// Expected primitive.
        expected: &'static str,
    },

    /// Value is not one of the enumerated names.
    #[error("parameter '{field}': '{value}' is not one of {choices}")]
    InvalidName {
        /// Field name.
        field: String,
        /// Rejected text.
        value: String,
        /// Accepted names, `|`-separated.
        choices: String,
    },

    /// The accessor refused the value.
    #[error("parameter '{field}': {reason}")]
    Rejected {
        /// Field name; empty until the dispatcher attaches it.
        field: String,
        /// Accessor's explanation.
        reason: String,
    },

    /// Allocation failed while creating a list or growing an array.
    #[error("could not allocate {requested} elements")]
    Allocation {
        /// Number of elements requested.
        requested: usize,
    },

    /// A list or owner is already borrowed by an outer registry call.
    #[error("{0} is already in use")]
    Busy(&'static str),

    /// Regeneration or a consistency check failed.
    #[error("{owner}: {reason}")]
    Inconsistent {
        /// Owner kind whose state is inconsistent.
        owner: OwnerKind,
        /// What is wrong.
        reason: String,
    },

    /// A handle field that must point at an aggregate is empty.
    #[error("parameter '{0}' has no collection attached")]
    MissingHandle(String),

    /// The output sink refused rendered text.
    #[error("failed to write rendered parameters")]
    Render,
}

impl ParamError {
    /// Value rejection raised by an accessor; the dispatcher fills in the field name.
    pub fn rejected(reason: impl Into<String>) -> Self {
        ParamError::Rejected {
            field: String::new(),
            reason: reason.into(),
        }
    }

    /// Consistency failure raised by a regeneration or check.
    pub fn inconsistent(owner: OwnerKind, reason: impl Into<String>) -> Self {
        ParamError::Inconsistent {
            owner,
            reason: reason.into(),
        }
    }

    /// Attach a field name to an accessor rejection that does not carry one yet.
    pub fn in_field(self, name: &str) -> Self {
        match self {
            ParamError::Rejected { field, reason } if field.is_empty() => ParamError::Rejected {
                field: name.to_string(),
                reason,
            },
            other => other,
        }
    }

    /// Family this error belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            ParamError::Rejected { .. } => ErrorClass::ValueRejected,
            ParamError::Allocation { .. } | ParamError::Busy(_) | ParamError::Render => {
                ErrorClass::Resource
            }
            ParamError::Inconsistent { .. } | ParamError::MissingHandle(_) => {
                ErrorClass::Consistency
            }
            _ => ErrorClass::Configuration,
        }
    }
}
