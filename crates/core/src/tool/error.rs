use std::borrow::Cow;
use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The input provided to the tool was invalid.
    InvalidInput,
    /// The requested tool does not exist.
    UnknownTool,
    /// The supplied path could not be safely resolved.
    InvalidPath,
    /// The requested file does not exist.
    NotFound,
    /// The file could not be read or decoded.
    ReadError,
    /// The file could not be written.
    WriteError,
    /// The command exceeded its time budget.
    Timeout,
    /// Error occurred while executing the tool.
    ExecutionError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidInput => write!(f, "Invalid input"),
            ErrorKind::UnknownTool => write!(f, "Unknown tool"),
            ErrorKind::InvalidPath => write!(f, "Invalid path"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::ReadError => write!(f, "Read error"),
            ErrorKind::WriteError => write!(f, "Write error"),
            ErrorKind::Timeout => write!(f, "Timed out"),
            ErrorKind::ExecutionError => write!(f, "Execution error"),
        }
    }
}

/// Describes a tool call error.
///
/// Tool errors are never fatal to a run: they are captured into the
/// result payload and fed back to the model as a failed tool outcome.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    reason: Option<String>,
}

impl Error {
    /// Creates a new error with the `InvalidInput` kind.
    #[inline]
    pub fn invalid_input() -> Self {
        Self::with_kind(ErrorKind::InvalidInput)
    }

    /// Creates a new error with the `UnknownTool` kind.
    #[inline]
    pub fn unknown_tool() -> Self {
        Self::with_kind(ErrorKind::UnknownTool)
    }

    /// Creates a new error with the `InvalidPath` kind.
    #[inline]
    pub fn invalid_path() -> Self {
        Self::with_kind(ErrorKind::InvalidPath)
    }

    /// Creates a new error with the `NotFound` kind.
    #[inline]
    pub fn not_found() -> Self {
        Self::with_kind(ErrorKind::NotFound)
    }

    /// Creates a new error with the `ReadError` kind.
    #[inline]
    pub fn read_error() -> Self {
        Self::with_kind(ErrorKind::ReadError)
    }

    /// Creates a new error with the `WriteError` kind.
    #[inline]
    pub fn write_error() -> Self {
        Self::with_kind(ErrorKind::WriteError)
    }

    /// Creates a new error with the `Timeout` kind.
    #[inline]
    pub fn timeout() -> Self {
        Self::with_kind(ErrorKind::Timeout)
    }

    /// Creates a new error with the `ExecutionError` kind.
    #[inline]
    pub fn execution_error() -> Self {
        Self::with_kind(ErrorKind::ExecutionError)
    }

    #[inline]
    fn with_kind(kind: ErrorKind) -> Self {
        Self { kind, reason: None }
    }

    /// Attaches a reason to the error.
    #[inline]
    pub fn with_reason<S: Into<String>>(self, reason: S) -> Self {
        Self {
            kind: self.kind,
            reason: Some(reason.into()),
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the reason for the error.
    #[inline]
    pub fn reason(&self) -> Cow<'_, str> {
        match self.reason.as_deref() {
            Some(reason) => Cow::Borrowed(reason),
            None => Cow::Owned(format!("{}", self.kind)),
        }
    }
}
