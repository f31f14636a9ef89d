//! Process-wide exit hooks that put terminals back the way they were found.
//!
//! A terminal mode outlives the process that set it, which makes this one of
//! the few places where global state is the only practical option. Every
//! [`RawTerminal`](crate::RawTerminal) that enters raw mode registers itself
//! here. The first registration installs a C runtime `atexit` callback that
//! calls [`run`]. It covers a normal return from `main`, `std::process::exit`
//! and a panic that unwinds out of `main`.
//!
//! When panics abort, a panic hook calls [`run`] as well. Under unwinding no
//! panic hook is installed: a panic that is caught, or that only ends a
//! worker thread, leaves raw mode in place.

use std::{
    panic,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, PoisonError, TryLockError, Weak,
    },
};

/// Something that can put a terminal back into its saved mode.
///
/// Implementations must not block and must not panic.
pub trait Restore: Send + Sync {
    fn restore(&self);
}

static INSTALLED: AtomicBool = AtomicBool::new(false);
static HOOKS: Mutex<Vec<Weak<dyn Restore>>> = Mutex::new(Vec::new());

/// Add a restorer to be run when the process exits.
///
/// Only a weak reference is kept, so a restorer that has been dropped is
/// skipped.
pub fn register(hook: Weak<dyn Restore>) {
    install();

    let mut hooks = HOOKS.lock().unwrap_or_else(PoisonError::into_inner);
    hooks.retain(|hook| hook.strong_count() > 0);
    hooks.push(hook);
}

/// Run every live registered restorer now.
///
/// This is what the process exit and panic hooks do. Restorers are
/// idempotent, so running this more than once is harmless.
pub fn run() {
    let hooks: Vec<_> = match HOOKS.try_lock() {
        Ok(hooks) => hooks.iter().filter_map(Weak::upgrade).collect(),
        Err(TryLockError::Poisoned(e)) => e.into_inner().iter().filter_map(Weak::upgrade).collect(),
        Err(TryLockError::WouldBlock) => {
            log::warn!("exit hooks busy, terminal modes not restored");
            return;
        }
    };

    for hook in hooks {
        hook.restore();
    }
}

fn install() {
    if INSTALLED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return;
    }

    if unsafe { libc::atexit(run_at_exit) } != 0 {
        log::warn!("could not register exit hook, terminal mode may persist after exit");
    }

    #[cfg(panic = "abort")]
    {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            run();
            previous(info);
        }));
    }

    log::debug!("exit hooks installed");
}

extern "C" fn run_at_exit() {
    // Unwinding into the C runtime is undefined behavior.
    if panic::catch_unwind(run).is_err() {
        log::error!("exit hook panicked");
    }
}
