//! Stderr logger used by the `termpoll` binary.

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

struct Logger {
    out: StandardStream,
    pretty: bool,
}

impl Log for Logger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        write_record(&mut self.out.lock(), self.pretty, record).ok();
    }

    fn flush(&self) {
        self.out.lock().flush().ok();
    }
}

fn write_record(out: &mut impl WriteColor, pretty: bool, record: &Record) -> io::Result<()> {
    let (name, color) = match record.metadata().level() {
        Level::Error => ("error", Color::Red),
        Level::Warn => ("warn", Color::Magenta),
        Level::Info => ("info", Color::Yellow),
        Level::Debug => ("debug", Color::Cyan),
        Level::Trace => ("trace", Color::Blue),
    };

    if pretty {
        out.set_color(ColorSpec::new().set_bold(true).set_fg(Some(color)))?;
    }

    write!(out, "{}", name)?;

    if pretty {
        out.reset()?;
    }

    // Raw mode leaves output processing alone, so a plain newline still
    // returns the carriage.
    writeln!(out, ": {}", record.args())
}

/// Install the logger at the `Warn` level.
///
/// # Errors
///
/// Fails if a logger has already been installed.
pub fn init() -> Result<(), SetLoggerError> {
    let pretty = atty::is(atty::Stream::Stderr);
    let logger = Logger {
        out: StandardStream::stderr(if pretty { ColorChoice::Auto } else { ColorChoice::Never }),
        pretty,
    };

    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(LevelFilter::Warn);

    if pretty {
        log::debug!("tty detected, pretty logging is enabled");
    } else {
        log::debug!("stderr is not a tty, pretty logging is disabled");
    }

    Ok(())
}

pub fn verbose(verbosity: usize) {
    log::set_max_level(level_for(verbosity));
}

pub fn quiet() {
    log::set_max_level(LevelFilter::Off);
}

fn level_for(verbosity: usize) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
