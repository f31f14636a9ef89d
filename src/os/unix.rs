use crate::backend::Backend;
use std::{
    io::{self, Stdin},
    os::unix::io::{AsRawFd, RawFd},
};
use termios::{Termios, ECHO, ICANON, TCSADRAIN, VMIN, VTIME};

/// Terminal input controlled through termios attributes.
///
/// Input is read straight from the file descriptor one byte at a time, so
/// anything not yet polled stays queued in the terminal. For standard input
/// this bypasses the buffer behind [`std::io::stdin`], which should not be
/// read from while raw mode is active.
pub struct PosixTerminal<I> {
    stdin: I,
}

impl PosixTerminal<Stdin> {
    pub fn stdin() -> Self {
        Self::new(io::stdin())
    }
}

impl<I: AsRawFd> PosixTerminal<I> {
    pub fn new(stdin: I) -> Self {
        Self { stdin }
    }
}

/// Turn off echo and line buffering, and make reads return immediately with
/// whatever is available.
fn make_raw(termios: &mut Termios) {
    termios.c_lflag &= !(ECHO | ICANON);
    termios.c_cc[VMIN] = 0;
    termios.c_cc[VTIME] = 0;
}

fn hung_up() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "terminal hung up")
}

fn transient(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted)
}

/// Check the descriptor without waiting. Returns whether input is readable
/// and whether the other end has gone away.
fn poll_input(fd: RawFd) -> io::Result<(bool, bool)> {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    match unsafe { libc::poll(&mut pollfd, 1, 0) } {
        -1 => {
            let e = io::Error::last_os_error();
            if transient(&e) {
                Ok((false, false))
            } else {
                Err(e)
            }
        }
        0 => Ok((false, false)),
        _ if pollfd.revents & libc::POLLNVAL != 0 => Err(io::Error::from_raw_os_error(libc::EBADF)),
        _ => Ok((
            pollfd.revents & libc::POLLIN != 0,
            pollfd.revents & (libc::POLLHUP | libc::POLLERR) != 0,
        )),
    }
}

impl<I: AsRawFd + Send + 'static> Backend for PosixTerminal<I> {
    type Saved = Termios;

    fn enter_raw_mode(&mut self) -> io::Result<Termios> {
        let fd = self.stdin.as_raw_fd();
        let normal_termios = Termios::from_fd(fd)?;
        let mut raw_termios = normal_termios;
        make_raw(&mut raw_termios);

        // Drain rather than flush so that input typed before now is kept.
        termios::tcsetattr(fd, TCSADRAIN, &raw_termios)?;

        Ok(normal_termios)
    }

    fn restore_mode(&mut self, saved: &Termios) -> io::Result<()> {
        termios::tcsetattr(self.stdin.as_raw_fd(), TCSADRAIN, saved)
    }

    fn poll_byte(&mut self) -> io::Result<Option<u8>> {
        let fd = self.stdin.as_raw_fd();
        let (readable, closed) = poll_input(fd)?;

        if !readable {
            return if closed { Err(hung_up()) } else { Ok(None) };
        }

        let mut byte = 0u8;

        match unsafe { libc::read(fd, (&mut byte as *mut u8).cast(), 1) } {
            1 => Ok(Some(byte)),
            // With VMIN and VTIME at zero an empty read only means "nothing
            // yet" while the other end is still there.
            0 if closed => Err(hung_up()),
            0 => Ok(None),
            _ => {
                let e = io::Error::last_os_error();
                if transient(&e) {
                    Ok(None)
                } else {
                    Err(e)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, RawTerminal};
    use nix::pty::openpty;
    use std::{
        fs::File,
        io::Write,
        sync::mpsc,
        thread,
        time::{Duration, Instant},
    };

    fn pty() -> (File, File) {
        let pty = openpty(None, None).unwrap();
        (File::from(pty.master), File::from(pty.slave))
    }

    /// Poll until a byte shows up; pty input is delivered asynchronously.
    fn next_byte(terminal: &mut PosixTerminal<File>) -> Option<u8> {
        let deadline = Instant::now() + Duration::from_secs(2);

        while Instant::now() < deadline {
            if let Some(byte) = terminal.poll_byte().unwrap() {
                return Some(byte);
            }
            thread::sleep(Duration::from_millis(5));
        }

        None
    }

    #[test]
    fn raw_mode_clears_echo_and_canonical() {
        let (_master, slave) = pty();
        let fd = slave.as_raw_fd();
        let before = Termios::from_fd(fd).unwrap();

        let mut terminal = PosixTerminal::new(slave);
        let saved = terminal.enter_raw_mode().unwrap();
        assert_eq!(saved.c_lflag, before.c_lflag);

        let raw = Termios::from_fd(fd).unwrap();
        assert_eq!(raw.c_lflag & (ECHO | ICANON), 0);
        assert_eq!(raw.c_lflag & !(ECHO | ICANON), before.c_lflag & !(ECHO | ICANON));
        assert_eq!(raw.c_cc[VMIN], 0);
        assert_eq!(raw.c_cc[VTIME], 0);
    }

    #[test]
    fn restore_puts_back_the_original_attributes() {
        let (_master, slave) = pty();
        let fd = slave.as_raw_fd();
        let before = Termios::from_fd(fd).unwrap();

        let terminal = RawTerminal::new(PosixTerminal::new(slave));
        terminal.initialize().unwrap();
        terminal.close().unwrap();

        let after = Termios::from_fd(fd).unwrap();
        assert_eq!(after.c_lflag, before.c_lflag);
        assert_eq!(after.c_cc[VMIN], before.c_cc[VMIN]);
        assert_eq!(after.c_cc[VTIME], before.c_cc[VTIME]);
    }

    #[test]
    fn reads_bytes_one_at_a_time() {
        let (mut master, slave) = pty();
        let mut terminal = PosixTerminal::new(slave);
        terminal.enter_raw_mode().unwrap();

        master.write_all(b"Hi").unwrap();

        assert_eq!(next_byte(&mut terminal), Some(b'H'));
        assert_eq!(next_byte(&mut terminal), Some(b'i'));
        assert_eq!(terminal.poll_byte().unwrap(), None);
    }

    #[test]
    fn does_not_wait_for_input() {
        let (master, slave) = pty();
        let mut terminal = PosixTerminal::new(slave);
        terminal.enter_raw_mode().unwrap();

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            tx.send(terminal.poll_byte().unwrap()).ok();
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok(None));
        drop(master);
    }

    #[test]
    fn non_terminal_input_is_unavailable() {
        let terminal = RawTerminal::new(PosixTerminal::new(File::open("/dev/null").unwrap()));

        assert!(matches!(terminal.initialize(), Err(Error::TerminalUnavailable(_))));
        assert!(!terminal.is_active());
        assert_eq!(terminal.read_byte().unwrap(), None);
    }

    #[test]
    fn takes_only_one_byte_from_the_descriptor() {
        let (mut master, slave) = pty();
        let fd = slave.as_raw_fd();
        let mut terminal = PosixTerminal::new(slave);
        terminal.enter_raw_mode().unwrap();

        master.write_all(b"Hi").unwrap();
        assert_eq!(next_byte(&mut terminal), Some(b'H'));

        // The second byte is still queued in the terminal, not in a buffer
        // on our side.
        let mut byte = 0u8;
        let read = unsafe { libc::read(fd, (&mut byte as *mut u8).cast(), 1) };
        assert_eq!(read, 1);
        assert_eq!(byte, b'i');
    }

    #[test]
    fn hang_up_is_a_read_failure() {
        let (master, slave) = pty();
        let terminal = RawTerminal::new(PosixTerminal::new(slave));
        terminal.initialize().unwrap();

        drop(master);

        for _ in 0..3 {
            assert!(matches!(terminal.read_byte(), Err(Error::ReadFailed(_))));
        }
    }
}
