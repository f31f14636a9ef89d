//! Raw-mode control for the process's standard input.
//!
//! A [`RawTerminal`] switches the terminal into non-canonical, non-echoing
//! mode where reads return immediately, hands out input one byte at a time
//! without ever waiting, and puts the original configuration back when it is
//! closed, dropped, or the process exits.
//!
//! ```no_run
//! let terminal = termpoll::RawTerminal::stdio();
//! terminal.initialize()?;
//!
//! loop {
//!     match terminal.read_byte()? {
//!         Some(b'q') => break,
//!         Some(byte) => println!("{:#04x}", byte),
//!         None => std::thread::sleep(std::time::Duration::from_millis(10)),
//!     }
//! }
//! # Ok::<(), termpoll::Error>(())
//! ```

mod backend;
mod error;
mod raw;

pub mod exit;
pub mod logger;
pub mod memory;
pub mod os;

pub use crate::{
    backend::Backend,
    error::{Error, Result},
    raw::RawTerminal,
};
