use std::{error, fmt, io};

pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by a [`RawTerminal`](crate::RawTerminal).
///
/// "No input available" is not an error and never shows up here.
#[derive(Debug)]
pub enum Error {
    /// Standard input is not an interactive terminal, or its configuration
    /// could not be read or changed. The terminal is left as it was.
    TerminalUnavailable(io::Error),

    /// The input source reported an error. It should be treated as gone.
    ReadFailed(io::Error),

    /// The saved configuration could not be put back.
    RestoreFailed(io::Error),
}

impl Error {
    /// The underlying I/O error.
    pub fn io_error(&self) -> &io::Error {
        match self {
            Error::TerminalUnavailable(e) | Error::ReadFailed(e) | Error::RestoreFailed(e) => e,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::TerminalUnavailable(e) => write!(f, "terminal unavailable: {}", e),
            Error::ReadFailed(e) => write!(f, "failed to read input: {}", e),
            Error::RestoreFailed(e) => write!(f, "failed to restore terminal mode: {}", e),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(self.io_error())
    }
}
