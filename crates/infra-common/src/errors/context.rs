use crate::errors::types::{Error, Result};
use std::fmt;

/// Where an error surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorContext {
    pub component: &'static str,
    pub operation: &'static str,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.component, self.operation)
    }
}

/// Tag errors with the component and operation that produced them.
///
/// The variant is kept so callers still map it to the same outcome (a
/// tagged `Validation` stays a validation failure). `Io` errors become
/// `ExternalService` since their source can no longer be carried.
pub trait ErrorExt: Sized {
    fn with_context(self, component: &'static str, operation: &'static str) -> Self;
}

impl ErrorExt for Error {
    fn with_context(self, component: &'static str, operation: &'static str) -> Self {
        let ctx = ErrorContext { component, operation };
        let tag = |msg: String| format!("{} [{}]", msg, ctx);
        match self {
            Error::Io(e) => Error::ExternalService(tag(e.to_string())),
            Error::Config(msg) => Error::Config(tag(msg)),
            Error::Validation(msg) => Error::Validation(tag(msg)),
            Error::NotFound(msg) => Error::NotFound(tag(msg)),
            Error::ExternalService(msg) => Error::ExternalService(tag(msg)),
            Error::Internal(msg) => Error::Internal(tag(msg)),
            Error::Custom(msg) => Error::Custom(tag(msg)),
        }
    }
}

impl<T> ErrorExt for Result<T> {
    fn with_context(self, component: &'static str, operation: &'static str) -> Self {
        self.map_err(|e| e.with_context(component, operation))
    }
}
