use log::*;
use std::cell::Cell;
use std::io::Write;
use termcolor::*;

thread_local! {
    static LOGGER_ACTIVE: Cell<bool> = const { Cell::new(true) };
    static LOGGER_TIME: Cell<Option<f64>> = const { Cell::new(None) };
}

/// A logger instance for internal logs.
pub(crate) static LOGGER: StandardLogger = StandardLogger();

const PARENS_COLOR: Color = Color::Rgb(0x7f, 0x8c, 0x8d);

///
/// The logging implementation for simulations.
///
/// Records are prefixed with the virtual time of the runtime that is
/// currently dispatching on this thread.
///
#[derive(Debug)]
pub struct StandardLogger();

impl StandardLogger {
    ///
    /// Registers the logger with the logging interface.
    ///
    /// # Errors
    ///
    /// Fails if a logger was already registered for this process.
    ///
    pub fn setup() -> Result<(), SetLoggerError> {
        set_logger(&LOGGER)?;
        set_max_level(LevelFilter::Trace);
        Ok(())
    }

    ///
    /// Manually overwrites the logger
    ///
    pub fn active(value: bool) {
        LOGGER_ACTIVE.with(|v| v.set(value))
    }

    pub(crate) fn set_time(time: Option<f64>) {
        LOGGER_TIME.with(|v| v.set(time))
    }

    fn get_level_color(level: Level) -> Color {
        match level {
            Level::Debug => Color::Magenta,
            Level::Trace => Color::Cyan,
            Level::Info => Color::Green,
            Level::Warn => Color::Yellow,
            Level::Error => Color::Red,
        }
    }

    fn write_record(record: &Record, out: &mut StandardStream) -> std::io::Result<()> {
        out.set_color(ColorSpec::new().set_fg(Some(PARENS_COLOR)))?;
        write!(out, "[ ")?;
        match LOGGER_TIME.with(Cell::get) {
            Some(time) => write!(out, "{time:^5}")?,
            None => write!(out, "{:^5}", "-")?,
        }
        write!(out, " ] ")?;

        out.set_color(
            ColorSpec::new()
                .set_fg(Some(Self::get_level_color(record.level())))
                .set_bold(true),
        )?;
        write!(out, "{}: ", record.target())?;

        out.reset()?;
        writeln!(out, "{}", record.args())
    }
}

impl Log for StandardLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Trace && LOGGER_ACTIVE.with(Cell::get)
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let mut stream = match record.level() {
                Level::Error => StandardStream::stderr(ColorChoice::Auto),
                _ => StandardStream::stdout(ColorChoice::Auto),
            };

            // A broken stdout must not take the simulation down.
            let _ = Self::write_record(record, &mut stream);
        }
    }

    fn flush(&self) {}
}
