use std::io::{self, Write};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use env_logger::filter::Filter;
use log::{Metadata, Record, SetLoggerError};

use crate::formatter::JsonFormatter;

/// Where rendered lines are written. Defaults to stderr, the stream
/// serverless platforms collect into their log store.
pub enum Output {
    Stderr,
    Stdout,
    /// An arbitrary sink, flushed after every line. Mainly useful for
    /// capturing output in tests.
    Pipe(Box<dyn Write + Send>),
}

impl Output {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        match self {
            Output::Stderr => writeln!(io::stderr(), "{}", line),
            Output::Stdout => writeln!(io::stdout(), "{}", line),
            Output::Pipe(sink) => {
                writeln!(sink, "{}", line)?;
                sink.flush()
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stderr => io::stderr().flush(),
            Output::Stdout => io::stdout().flush(),
            Output::Pipe(sink) => sink.flush(),
        }
    }
}

/// The reconfigurable part of the installed logger. `setup` swaps the
/// whole thing on every call; `Handle::add_field` reaches into the
/// formatter's template.
pub(crate) struct Inner {
    pub formatter: JsonFormatter,
    pub filter: Filter,
    pub output: Output,
}

pub(crate) type Shared = Arc<RwLock<Inner>>;

static SHARED: OnceLock<Shared> = OnceLock::new();

/// Put `inner` behind the process-wide logger. The `log` facade only
/// accepts one logger per process, so the first call installs and every
/// later call reconfigures the installed one in place. `Err` means a
/// foreign logger already owns the facade.
pub(crate) fn install(inner: Inner) -> Result<Shared, SetLoggerError> {
    let max_level = inner.filter.filter();
    let shared = match SHARED.get() {
        Some(shared) => {
            *write(shared) = inner;
            shared.clone()
        }
        None => {
            let shared = Arc::new(RwLock::new(inner));
            log::set_boxed_logger(Box::new(JsonLogger {
                shared: shared.clone(),
            }))?;
            let _ = SHARED.set(shared.clone());
            shared
        }
    };
    log::set_max_level(max_level);
    Ok(shared)
}

// A poisoned lock still guards a consistent value; recover instead of
// propagating the poison.
pub(crate) fn write(shared: &RwLock<Inner>) -> RwLockWriteGuard<'_, Inner> {
    shared.write().unwrap_or_else(PoisonError::into_inner)
}

fn read(shared: &RwLock<Inner>) -> RwLockReadGuard<'_, Inner> {
    shared.read().unwrap_or_else(PoisonError::into_inner)
}

struct JsonLogger {
    shared: Shared,
}

impl log::Log for JsonLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        read(&self.shared).filter.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        let mut inner = write(&self.shared);
        if !inner.filter.matches(record) {
            return;
        }
        let line = inner.formatter.format_record(record);
        let _ = inner.output.write_line(&line);
    }

    fn flush(&self) {
        let _ = write(&self.shared).output.flush();
    }
}
