//! Conditions raised by the value core.
//!
//! Every failure surfaces as a [`CoreError`]. Each variant maps to a stable
//! [`ErrorCode`] so embedders can render a diagnostic header without
//! matching on the enum themselves.

use thiserror::Error;

use crate::runtime::cell::Kind;

/// Registry entry describing one class of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    pub code: &'static str,
    pub title: &'static str,
    pub message: &'static str,
    pub hint: Option<&'static str>,
}

pub const TYPE_MISMATCH: ErrorCode = ErrorCode {
    code: "E2000",
    title: "TYPE MISMATCH",
    message: "A cell was read through the wrong type.",
    hint: None,
};

pub const ARGUMENT_TYPE: ErrorCode = ErrorCode {
    code: "E2001",
    title: "ARGUMENT TYPE",
    message: "A parameter does not accept the supplied value.",
    hint: Some("Check the type block that follows the parameter in the spec."),
};

pub const PROTECTED_FIELD: ErrorCode = ErrorCode {
    code: "E2002",
    title: "PROTECTED FIELD",
    message: "Cannot write to a protected variable.",
    hint: Some("Unprotect the slot before assigning to it."),
};

pub const HIDDEN_FIELD: ErrorCode = ErrorCode {
    code: "E2003",
    title: "HIDDEN FIELD",
    message: "Cannot append through a hidden key.",
    hint: Some("Hidden keys can only be written by exact name."),
};

pub const BAD_CONSTRUCTION: ErrorCode = ErrorCode {
    code: "E2004",
    title: "BAD CONSTRUCTION",
    message: "Malformed input to a constructor.",
    hint: None,
};

pub const BINDING_MISMATCH: ErrorCode = ErrorCode {
    code: "E2005",
    title: "BINDING MISMATCH",
    message: "A relative value was resolved against a frame of another action.",
    hint: None,
};

pub const NOT_BOUND: ErrorCode = ErrorCode {
    code: "E2006",
    title: "NOT BOUND",
    message: "The word has no binding.",
    hint: Some("Bind the block to a context before looking up its words."),
};

pub const FRAME_EXPIRED: ErrorCode = ErrorCode {
    code: "E2007",
    title: "FRAME EXPIRED",
    message: "The frame's invocation has already completed.",
    hint: None,
};

pub const INACCESSIBLE: ErrorCode = ErrorCode {
    code: "E2008",
    title: "INACCESSIBLE",
    message: "The handle refers to a reclaimed object.",
    hint: Some("Root values that must survive garbage collection."),
};

pub const QUOTE_UNDERFLOW: ErrorCode = ErrorCode {
    code: "E2009",
    title: "QUOTE UNDERFLOW",
    message: "Cannot remove more quote levels than the value has.",
    hint: None,
};

pub const MISSING_ARGUMENT: ErrorCode = ErrorCode {
    code: "E2010",
    title: "MISSING ARGUMENT",
    message: "A required parameter was not supplied.",
    hint: None,
};

pub const TOO_MANY_ARGUMENTS: ErrorCode = ErrorCode {
    code: "E2011",
    title: "TOO MANY ARGUMENTS",
    message: "More arguments were supplied than the action accepts.",
    hint: None,
};

pub const ILLEGAL_ACTION: ErrorCode = ErrorCode {
    code: "E2012",
    title: "ILLEGAL ACTION",
    message: "The operation is not supported for this type.",
    hint: None,
};

/// All registered codes, in code order.
pub const ALL_CODES: [ErrorCode; 13] = [
    TYPE_MISMATCH,
    ARGUMENT_TYPE,
    PROTECTED_FIELD,
    HIDDEN_FIELD,
    BAD_CONSTRUCTION,
    BINDING_MISMATCH,
    NOT_BOUND,
    FRAME_EXPIRED,
    INACCESSIBLE,
    QUOTE_UNDERFLOW,
    MISSING_ARGUMENT,
    TOO_MANY_ARGUMENTS,
    ILLEGAL_ACTION,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: Kind, found: Kind },

    #[error("`{param}` does not allow {found}")]
    ArgumentType { param: String, found: Kind },

    #[error("`{name}` is protected from modification")]
    ProtectedField { name: String },

    #[error("`{name}` is hidden")]
    HiddenField { name: String },

    #[error("bad construction: {reason}")]
    BadConstruction { reason: String },

    #[error("`{name}` is not relative to the frame's action")]
    BindingMismatch { name: String },

    #[error("`{name}` is not bound")]
    NotBound { name: String },

    #[error("frame is no longer running")]
    FrameExpired,

    #[error("{what} #{index} has been reclaimed")]
    Inaccessible { what: &'static str, index: u32 },

    #[error("cannot unquote {requested} levels from a value quoted {depth} times")]
    QuoteUnderflow { depth: u32, requested: u32 },

    #[error("`{param}` is missing its argument")]
    MissingArgument { param: String },

    #[error("action takes {expected} arguments")]
    TooManyArguments { expected: usize },

    #[error("{verb} does not support {kind}")]
    IllegalAction { verb: &'static str, kind: Kind },
}

impl CoreError {
    pub fn bad_construction(reason: impl Into<String>) -> Self {
        CoreError::BadConstruction {
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::TypeMismatch { .. } => TYPE_MISMATCH,
            CoreError::ArgumentType { .. } => ARGUMENT_TYPE,
            CoreError::ProtectedField { .. } => PROTECTED_FIELD,
            CoreError::HiddenField { .. } => HIDDEN_FIELD,
            CoreError::BadConstruction { .. } => BAD_CONSTRUCTION,
            CoreError::BindingMismatch { .. } => BINDING_MISMATCH,
            CoreError::NotBound { .. } => NOT_BOUND,
            CoreError::FrameExpired => FRAME_EXPIRED,
            CoreError::Inaccessible { .. } => INACCESSIBLE,
            CoreError::QuoteUnderflow { .. } => QUOTE_UNDERFLOW,
            CoreError::MissingArgument { .. } => MISSING_ARGUMENT,
            CoreError::TooManyArguments { .. } => TOO_MANY_ARGUMENTS,
            CoreError::IllegalAction { .. } => ILLEGAL_ACTION,
        }
    }

    /// Renders a diagnostic block: header, detail line, optional hint.
    pub fn render(&self) -> String {
        let code = self.code();
        let mut out = format!("-- {} [{}] --\n{}\n", code.title, code.code, self);
        if let Some(hint) = code.hint {
            out.push_str("\nHint:\n  ");
            out.push_str(hint);
            out.push('\n');
        }
        out
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
