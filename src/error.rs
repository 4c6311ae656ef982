use std::{error::Error, fmt};

use backtrace::Backtrace;

/// The five error categories named by the engine's error-handling design:
/// deadlock/explicit abort, generic engine failures, I/O failures, iterator
/// exhaustion, and argument/schema violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TransactionAborted,
    DbException,
    IoError,
    NoSuchElement,
    IllegalArgument,
}

pub struct SmallError {
    kind: ErrorKind,
    message: String,
    backtrace: Backtrace,
}

impl SmallError {
    pub fn new(kind: ErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
            backtrace: Backtrace::new(),
        }
    }

    pub fn transaction_aborted(message: &str) -> Self {
        Self::new(ErrorKind::TransactionAborted, message)
    }

    pub fn db_exception(message: &str) -> Self {
        Self::new(ErrorKind::DbException, message)
    }

    pub fn io_error(message: &str) -> Self {
        Self::new(ErrorKind::IoError, message)
    }

    pub fn no_such_element(message: &str) -> Self {
        Self::new(ErrorKind::NoSuchElement, message)
    }

    pub fn illegal_argument(message: &str) -> Self {
        Self::new(ErrorKind::IllegalArgument, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Dump the captured backtrace to the debug log. Call sites that want a
    /// stack trace alongside the message (deadlock, I/O failure) use this
    /// instead of printing it unconditionally.
    pub fn show_backtrace(&self) {
        ::log::debug!("{}\n{:?}", self.message, self.backtrace);
    }
}

impl fmt::Display for SmallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl fmt::Debug for SmallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Error for SmallError {}

impl From<std::io::Error> for SmallError {
    fn from(e: std::io::Error) -> Self {
        SmallError::io_error(&e.to_string())
    }
}

/// Mirrors the teacher's `SmallResult` alias for fallible operations with no
/// meaningful success value (lock acquisition, log writes, commits).
pub type SmallResult = Result<(), SmallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let e = SmallError::transaction_aborted("deadlock on page 3");
        let s = format!("{}", e);
        assert!(s.contains("TransactionAborted"));
        assert!(s.contains("deadlock on page 3"));
    }

    #[test]
    fn io_error_converts_from_std_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: SmallError = io_err.into();
        assert_eq!(e.kind(), ErrorKind::IoError);
    }
}
