//! Platform terminal backends.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use self::unix::PosixTerminal;
#[cfg(windows)]
pub use self::windows::ConsoleTerminal;

/// The backend for the process's standard input on this platform.
#[cfg(unix)]
pub type Native = PosixTerminal<std::io::Stdin>;
#[cfg(windows)]
pub type Native = ConsoleTerminal;

pub fn native() -> Native {
    #[cfg(unix)]
    {
        PosixTerminal::stdin()
    }

    #[cfg(windows)]
    {
        ConsoleTerminal::new()
    }
}
