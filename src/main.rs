use clap::{ArgAction, Parser};
use std::{
    io::{self, Write},
    process, thread,
    time::{Duration, Instant},
};
use scopeguard::ScopeGuard;
use termpoll::{logger, Backend, RawTerminal};

/// Print every key pressed on the terminal as soon as it arrives.
#[derive(Debug, Parser)]
#[command(name = "termpoll", version)]
struct Options {
    /// Milliseconds to sleep between polls while no input is pending
    #[arg(long, default_value_t = 10, value_name = "MS")]
    interval: u64,

    /// Key that ends the session
    #[arg(long, default_value_t = 'q')]
    quit: char,

    /// End the session after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Log more; repeat for even more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Do not log anything
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() {
    let options = Options::parse();

    if let Err(e) = logger::init() {
        eprintln!("error: {}", e);
    }
    log_panics::init();

    if options.quiet {
        logger::quiet();
    } else {
        logger::verbose(options.verbose.into());
    }

    // Everything holding the terminal is dropped inside `run`, before exit.
    process::exit(run(&options));
}

fn run(options: &Options) -> exitcode::ExitCode {
    if !options.quit.is_ascii() {
        log::error!("quit key must be a single ASCII character, got {:?}", options.quit);
        return exitcode::USAGE;
    }

    let terminal = RawTerminal::stdio();

    if let Err(e) = terminal.initialize() {
        log::error!("{}", e);
        return exitcode::NOINPUT;
    }

    // Only reached if the loop unwinds; the normal path closes below.
    let terminal = scopeguard::guard(terminal, |terminal| {
        if let Err(e) = terminal.close() {
            log::error!("{}", e);
        }
    });

    let code = poll_loop(&*terminal, options);
    let terminal = ScopeGuard::into_inner(terminal);

    finish(code, terminal.close())
}

fn poll_loop<B: Backend>(terminal: &RawTerminal<B>, options: &Options) -> exitcode::ExitCode {
    let quit = options.quit as u8;
    let interval = Duration::from_millis(options.interval);
    let deadline = options.timeout.map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut stdout = io::stdout();

    log::info!("press {:?} to quit", options.quit);

    loop {
        match terminal.read_byte() {
            Ok(Some(byte)) => {
                if let Err(e) = writeln!(stdout, "{:#04x} {}", byte, std::ascii::escape_default(byte)) {
                    log::error!("could not write to stdout: {}", e);
                    return exitcode::IOERR;
                }

                if byte == quit {
                    return exitcode::OK;
                }
            }
            Ok(None) => {
                if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
                    log::info!("timed out");
                    return exitcode::OK;
                }

                thread::sleep(interval);
            }
            Err(e) => {
                log::error!("{}", e);
                return exitcode::IOERR;
            }
        }
    }
}

/// Fold the result of leaving raw mode into the session's exit code. An
/// earlier failure wins over a failed restore.
fn finish(code: exitcode::ExitCode, closed: termpoll::Result<()>) -> exitcode::ExitCode {
    match closed {
        Ok(()) => code,
        Err(e) => {
            log::error!("{}", e);

            if exitcode::is_success(code) {
                exitcode::IOERR
            } else {
                code
            }
        }
    }
}
