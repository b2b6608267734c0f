//! `json_lambda_logger` renders log records as single-line JSON documents
//! and injects request-scoped metadata, for use inside short-lived
//! serverless function invocations.
//!
//! It plugs into the [`log`](https://docs.rs/log) facade: [`setup`] installs
//! a process-wide JSON logger and hands back a [`Handle`] for attaching
//! further fields mid-invocation.
//!
//! ```no_run
//! let handle = json_lambda_logger::setup("INFO")
//!     .field("aws_request_id", "6f327f70")
//!     .install();
//!
//! log::info!("processing");
//! handle.add_field("user", "42");
//! log::info!("resolved user");
//! ```
//!
//! Messages that are already JSON are embedded structurally rather than
//! re-encoded as strings, so `log::info!("{}", payload)` with a JSON
//! payload nests cleanly. Structured fields logged through the `log`
//! crate's key-value support are merged into the entry; the reserved
//! `exception` key carries error chains.
//!
//! ## features
//!
//! * `iso-timestamps`
//!
//! By default the `timestamp` field holds the current unix epoch timestamp
//! in milliseconds. You can replace this with RFC 3339 timestamps by
//! enabling the `iso-timestamps` feature. Note, this will add the `chrono`
//! crate to your dependency tree.
//!
//! ```toml
//! [dependencies]
//! json_lambda_logger = { version = "0.1", features = ["iso-timestamps"] }
//! ```
//! * `backtrace`
//!
//! When registering a panic hook with `panic_hook` by default backtraces
//! are omitted. You can annotate panics with them by enabling the
//! `backtrace` feature.
//!
//! ```toml
//! [dependencies]
//! json_lambda_logger = { version = "0.1", features = ["backtrace"] }
//! ```

pub mod env;
pub mod lambda;

mod formatter;
mod levels;
mod logger;
mod record;
mod setup;

pub use crate::formatter::{FieldSource, FieldTemplate, JsonFormatter, Preset, EXCEPTION_KEY};
pub use crate::levels::{parse as parse_level, InvalidLevel};
pub use crate::logger::Output;
pub use crate::record::{ErrorCapture, LogRecord, Message};
pub use crate::setup::{setup, Handle, Setup, DEFAULT_QUIET_TARGETS};

use std::{panic, thread};

/// Install the JSON logger configured from the environment: severity from
/// `log_level` (default `DEBUG`), dependency-namespace severity from
/// `boto_level` (default `WARN`).
///
/// # Panics
///
/// Panics if a logger has already been configured
pub fn init() -> Handle {
    try_init().unwrap()
}

/// Install the JSON logger configured from the environment.
///
/// Will yield a `log::SetLoggerError` when a foreign logger has already
/// been configured
pub fn try_init() -> Result<Handle, log::SetLoggerError> {
    Setup::from_env().try_install()
}

/// Register a panic hook that reports panics as error-level records, so
/// they land in the JSON stream with everything else
pub fn panic_hook() {
    panic::set_hook(Box::new(|info| {
        let thread = thread::current();
        let thread = thread.name().unwrap_or("unnamed");

        let msg = match info.payload().downcast_ref::<&'static str>() {
            Some(s) => *s,
            None => match info.payload().downcast_ref::<String>() {
                Some(s) => &**s,
                None => "Box<Any>",
            },
        };

        match info.location() {
            Some(location) => {
                let location = format!("{}:{}", location.file(), location.line());

                #[cfg(not(feature = "backtrace"))]
                kv_log_macro::error!(
                    "panicked at '{}'", msg,
                    {
                        thread: thread,
                        location: location
                    }
                );

                #[cfg(feature = "backtrace")]
                kv_log_macro::error!(
                    "panicked at '{}'", msg,
                    {
                        thread: thread,
                        location: location,
                        backtrace: format!("{:?}", backtrace::Backtrace::new())
                    }
                );
            }
            None => {
                #[cfg(not(feature = "backtrace"))]
                kv_log_macro::error!("panicked at '{}'", msg, { thread: thread });

                #[cfg(feature = "backtrace")]
                kv_log_macro::error!(
                    "panicked at '{}'", msg,
                    {
                        thread: thread,
                        backtrace: format!("{:?}", backtrace::Backtrace::new())
                    }
                );
            }
        }
    }));
}
