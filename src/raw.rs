use crate::{
    backend::Backend,
    error::{Error, Result},
    exit::{self, Restore},
    os,
};
use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, TryLockError,
    },
};

/// Owns a terminal's input mode for as long as raw mode is active.
///
/// Raw mode is entered with [`initialize`](Self::initialize) and left with
/// [`close`](Self::close). It is also left when the value is dropped, and as
/// a last resort by the process exit hook.
pub struct RawTerminal<B: Backend> {
    shared: Arc<Shared<B>>,
    hook_registered: AtomicBool,
}

struct Shared<B: Backend> {
    state: Mutex<State<B>>,
}

struct State<B: Backend> {
    backend: B,
    /// Present exactly while raw mode is active.
    saved: Option<B::Saved>,
    /// Raw mode was taken away by the exit hook rather than closed.
    released_at_exit: bool,
}

impl RawTerminal<os::Native> {
    /// Raw-mode controller for the process's standard input.
    pub fn stdio() -> Self {
        Self::new(os::native())
    }
}

impl<B: Backend> RawTerminal<B> {
    pub fn new(backend: B) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    backend,
                    saved: None,
                    released_at_exit: false,
                }),
            }),
            hook_registered: AtomicBool::new(false),
        }
    }

    /// Switch the terminal into raw mode.
    ///
    /// Calling this while raw mode is already active does nothing, so the
    /// configuration saved by the first call is never overwritten with a raw
    /// one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TerminalUnavailable`] if the input is not a terminal
    /// or its mode could not be changed. The terminal is left untouched.
    pub fn initialize(&self) -> Result<()> {
        if self
            .hook_registered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let shared: Arc<dyn Restore> = self.shared.clone();
            exit::register(Arc::downgrade(&shared));
        }

        let mut state = self.state();

        if state.saved.is_some() {
            log::debug!("raw mode already active");
            return Ok(());
        }

        let saved = state
            .backend
            .enter_raw_mode()
            .map_err(Error::TerminalUnavailable)?;
        state.saved = Some(saved);
        state.released_at_exit = false;

        log::debug!("raw mode enabled");
        Ok(())
    }

    /// Put back the configuration saved by [`initialize`](Self::initialize).
    ///
    /// Does nothing if raw mode is not active, so it is safe to call any
    /// number of times.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RestoreFailed`] if the terminal rejected the saved
    /// configuration. Raw mode stays active in that case and a later call
    /// (or the exit hook) will try again.
    pub fn close(&self) -> Result<()> {
        if self.state().restore()? {
            log::debug!("raw mode disabled");
        }

        Ok(())
    }

    /// Whether raw mode is currently active.
    pub fn is_active(&self) -> bool {
        self.state().saved.is_some()
    }

    /// Read one byte of input if one is available, without waiting.
    ///
    /// Returns `Ok(None)` when nothing is pending, and also when raw mode was
    /// never entered or was closed, since a canonical terminal would block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadFailed`] if the input source itself failed, or if
    /// the exit hook has already handed the terminal back.
    pub fn read_byte(&self) -> Result<Option<u8>> {
        let mut state = self.state();

        if state.saved.is_none() {
            if state.released_at_exit {
                return Err(Error::ReadFailed(io::Error::new(
                    io::ErrorKind::Other,
                    "terminal released at exit",
                )));
            }

            return Ok(None);
        }

        state.backend.poll_byte().map_err(Error::ReadFailed)
    }

    fn state(&self) -> MutexGuard<'_, State<B>> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle the exit hook holds for this terminal.
    #[cfg(test)]
    fn downgrade(&self) -> std::sync::Weak<Shared<B>> {
        Arc::downgrade(&self.shared)
    }
}

impl<B: Backend> State<B> {
    /// Reapply the saved configuration, if any. Returns whether anything was
    /// restored.
    fn restore(&mut self) -> Result<bool> {
        let saved = match self.saved.take() {
            Some(saved) => saved,
            None => return Ok(false),
        };

        if let Err(e) = self.backend.restore_mode(&saved) {
            self.saved = Some(saved);
            return Err(Error::RestoreFailed(e));
        }

        Ok(true)
    }
}

impl<B: Backend> Restore for Shared<B> {
    fn restore(&self) {
        // The exiting thread may already hold the lock, e.g. when a backend
        // panics mid-call.
        let mut state = match self.state.try_lock() {
            Ok(state) => state,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => {
                log::warn!("terminal busy at exit, leaving its mode as is");
                return;
            }
        };

        match state.restore() {
            Ok(true) => {
                state.released_at_exit = true;
                log::debug!("raw mode disabled by exit hook");
            }
            Ok(false) => {}
            Err(e) => log::warn!("{}", e),
        }
    }
}

impl<B: Backend> Drop for RawTerminal<B> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTerminal;

    #[test]
    fn drop_restores_the_saved_configuration() {
        let handle = MemoryTerminal::new();
        let original = handle.attributes();

        let terminal = RawTerminal::new(handle.clone());
        terminal.initialize().unwrap();
        assert_ne!(handle.attributes(), original);

        drop(terminal);

        assert_eq!(handle.attributes(), original);
        assert_eq!(handle.restores(), 1);
    }

    #[test]
    fn failed_restore_keeps_raw_mode_for_a_retry() {
        let handle = MemoryTerminal::new();
        let terminal = RawTerminal::new(handle.clone());
        terminal.initialize().unwrap();

        handle.detach();
        assert!(matches!(terminal.close(), Err(Error::RestoreFailed(_))));
        assert!(terminal.is_active());

        handle.reattach();
        terminal.close().unwrap();
        assert!(!terminal.is_active());
    }

    #[test]
    fn exit_hook_is_only_held_weakly() {
        let terminal = RawTerminal::new(MemoryTerminal::new());
        terminal.initialize().unwrap();

        let weak = terminal.downgrade();
        assert!(weak.upgrade().is_some());

        drop(terminal);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn reads_fail_once_the_exit_hook_has_run() {
        let handle = MemoryTerminal::new();
        let original = handle.attributes();
        let terminal = RawTerminal::new(handle.clone());
        terminal.initialize().unwrap();
        handle.push_input(b"x");

        Restore::restore(&*terminal.shared);

        assert_eq!(handle.attributes(), original);
        assert!(matches!(terminal.read_byte(), Err(Error::ReadFailed(_))));

        // Entering raw mode again starts over.
        terminal.initialize().unwrap();
        assert_eq!(terminal.read_byte().unwrap(), Some(b'x'));
    }

    #[test]
    fn closing_does_not_turn_reads_into_failures() {
        let handle = MemoryTerminal::new();
        let terminal = RawTerminal::new(handle.clone());
        terminal.initialize().unwrap();
        terminal.close().unwrap();

        assert_eq!(terminal.read_byte().unwrap(), None);
    }

    #[test]
    fn can_be_reinitialized_after_close() {
        let handle = MemoryTerminal::new();
        let terminal = RawTerminal::new(handle.clone());

        terminal.initialize().unwrap();
        terminal.close().unwrap();
        terminal.initialize().unwrap();

        assert!(terminal.is_active());
        assert_eq!(handle.captures(), 2);
    }
}
