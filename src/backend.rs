use std::io;

/// A terminal whose input can be switched in and out of raw mode.
///
/// Each platform has its own implementation in [`crate::os`]; an in-memory
/// one lives in [`crate::memory`].
pub trait Backend: Send + 'static {
    /// Configuration snapshot taken before raw mode was entered.
    type Saved: Send + 'static;

    /// Capture the current configuration, then switch to raw mode.
    ///
    /// The returned snapshot is the configuration exactly as it was before
    /// anything was changed.
    fn enter_raw_mode(&mut self) -> io::Result<Self::Saved>;

    /// Reapply a captured configuration verbatim.
    fn restore_mode(&mut self, saved: &Self::Saved) -> io::Result<()>;

    /// Consume at most one pending input byte without waiting for more to
    /// arrive. `Ok(None)` means nothing is available right now.
    fn poll_byte(&mut self) -> io::Result<Option<u8>>;
}
