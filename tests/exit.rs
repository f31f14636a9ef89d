//! Kept in its own test binary: running the exit hooks restores every
//! terminal in the process.

use termpoll::{exit, memory::MemoryTerminal, Error, RawTerminal};

#[test]
fn exit_hook_restores_terminals_that_were_never_closed() {
    let first = MemoryTerminal::new();
    let second = MemoryTerminal::new();
    let original = first.attributes();

    let a = RawTerminal::new(first.clone());
    let b = RawTerminal::new(second.clone());
    a.initialize().unwrap();
    b.initialize().unwrap();

    // A dropped terminal restores itself and is skipped by the hook.
    drop(b);
    assert_eq!(second.restores(), 1);

    exit::run();

    assert_eq!(first.attributes(), original);
    assert!(!a.is_active());
    assert!(matches!(a.read_byte(), Err(Error::ReadFailed(_))));

    // Running the hook again, or closing afterwards, restores nothing more.
    exit::run();
    a.close().unwrap();
    assert_eq!(first.restores(), 1);
    assert_eq!(second.restores(), 1);
}
