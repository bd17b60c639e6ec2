use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    NotFound,
    Empty,
    TooSmall,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    handle: Option<i32>,
    needed: Option<usize>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            handle: None,
            needed: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Raw value of the handle the failing operation was called with.
    pub fn handle(&self) -> Option<i32> {
        self.handle
    }

    /// Buffer length a `TooSmall` pop would have needed.
    pub fn needed(&self) -> Option<usize> {
        self.needed
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_handle(mut self, handle: i32) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn with_needed(mut self, needed: usize) -> Self {
        self.needed = Some(needed);
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(handle) = self.handle {
            write!(f, " (handle: {handle})")?;
        }
        if let Some(needed) = self.needed {
            write!(f, " (needed: {needed} bytes)")?;
        }
        Ok(())
    }
}

impl StdError for Error {}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Empty => 4,
        ErrorKind::TooSmall => 5,
        ErrorKind::Exhausted => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_exit_code};

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::NotFound, 3),
            (ErrorKind::Empty, 4),
            (ErrorKind::TooSmall, 5),
            (ErrorKind::Exhausted, 6),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn display_includes_context() {
        let err = Error::new(ErrorKind::TooSmall)
            .with_message("buffer too small")
            .with_handle(7)
            .with_needed(12);
        assert_eq!(
            err.to_string(),
            "TooSmall: buffer too small (handle: 7) (needed: 12 bytes)"
        );
        assert_eq!(err.handle(), Some(7));
        assert_eq!(err.needed(), Some(12));
    }

    #[test]
    fn display_without_context_is_kind_only() {
        assert_eq!(Error::new(ErrorKind::Empty).to_string(), "Empty");
    }
}
