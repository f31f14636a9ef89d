use crate::backend::Backend;
use std::{collections::VecDeque, io};
use winapi::{
    shared::minwindef::DWORD,
    um::{
        consoleapi::{GetConsoleMode, GetNumberOfConsoleInputEvents, ReadConsoleInputW, SetConsoleMode},
        handleapi::INVALID_HANDLE_VALUE,
        processenv::GetStdHandle,
        winbase::STD_INPUT_HANDLE,
        wincon::{ENABLE_ECHO_INPUT, ENABLE_LINE_INPUT},
        wincontypes::{INPUT_RECORD, KEY_EVENT},
        winnt::HANDLE,
    },
};

/// Console input controlled through the console mode word.
///
/// Key presses are taken from the console input record queue, so nothing is
/// ever waited for.
#[derive(Debug, Default)]
pub struct ConsoleTerminal {
    /// UTF-8 bytes of a key press that have not been handed out yet.
    pending: VecDeque<u8>,
}

impl ConsoleTerminal {
    pub fn new() -> Self {
        Self::default()
    }
}

fn stdin_handle() -> io::Result<HANDLE> {
    let handle = unsafe { GetStdHandle(STD_INPUT_HANDLE) };

    if handle.is_null() || handle == INVALID_HANDLE_VALUE {
        return Err(io::Error::last_os_error());
    }

    Ok(handle)
}

fn console_mode(handle: HANDLE) -> io::Result<DWORD> {
    let mut mode = 0;

    if unsafe { GetConsoleMode(handle, &mut mode) } == 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(mode)
}

fn set_console_mode(handle: HANDLE, mode: DWORD) -> io::Result<()> {
    if unsafe { SetConsoleMode(handle, mode) } == 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

impl Backend for ConsoleTerminal {
    type Saved = DWORD;

    fn enter_raw_mode(&mut self) -> io::Result<DWORD> {
        let handle = stdin_handle()?;
        let normal_mode = console_mode(handle)?;

        // Processed input stays on so Ctrl-C still interrupts.
        set_console_mode(handle, normal_mode & !(ENABLE_LINE_INPUT | ENABLE_ECHO_INPUT))?;

        Ok(normal_mode)
    }

    fn restore_mode(&mut self, saved: &DWORD) -> io::Result<()> {
        set_console_mode(stdin_handle()?, *saved)
    }

    fn poll_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(byte) = self.pending.pop_front() {
            return Ok(Some(byte));
        }

        let handle = stdin_handle()?;

        loop {
            let mut available = 0;
            if unsafe { GetNumberOfConsoleInputEvents(handle, &mut available) } == 0 {
                return Err(io::Error::last_os_error());
            }

            if available == 0 {
                return Ok(None);
            }

            let mut record: INPUT_RECORD = unsafe { std::mem::zeroed() };
            let mut read = 0;
            if unsafe { ReadConsoleInputW(handle, &mut record, 1, &mut read) } == 0 {
                return Err(io::Error::last_os_error());
            }

            // Mouse, focus and resize records, key releases and bare modifier
            // presses are skipped.
            if read == 0 || record.EventType != KEY_EVENT {
                continue;
            }

            let key = unsafe { record.Event.KeyEvent() };
            let unit = unsafe { *key.uChar.UnicodeChar() };
            if key.bKeyDown == 0 || unit == 0 {
                continue;
            }

            // Lone surrogate halves are dropped rather than paired up.
            if let Some(c) = char::from_u32(u32::from(unit)) {
                let mut buf = [0; 4];
                self.pending.extend(c.encode_utf8(&mut buf).as_bytes());
                return Ok(self.pending.pop_front());
            }
        }
    }
}
