use env_logger::filter;
use log::kv;
use log::{LevelFilter, SetLoggerError};
use serde_json::Value;

use crate::env::{env_or, DEFAULT_LOG_LEVEL, DEFAULT_QUIET_LEVEL, LOG_LEVEL_ENV, QUIET_LEVEL_ENV};
use crate::formatter::{FieldSource, FieldTemplate, JsonFormatter, Preset};
use crate::levels::{self, InvalidLevel};
use crate::logger::{self, Inner, Output, Shared};

/// Dependency namespaces quieted by default, the usual suspects below an
/// AWS SDK call stack. Replace the set with [`Setup::quiet_targets`].
pub const DEFAULT_QUIET_TARGETS: &[&str] = &[
    "aws_config",
    "aws_smithy_runtime",
    "hyper",
    "rustls",
];

/// Start configuring the process-wide JSON logger at the given minimum
/// severity. Finish with [`Setup::try_install`] or [`Setup::install`].
pub fn setup(level: &str) -> Setup {
    Setup::new(level)
}

/// Builder for the process-wide JSON logger.
pub struct Setup {
    level: String,
    quiet_level: Option<String>,
    quiet_targets: Vec<String>,
    preset: Preset,
    fields: Vec<(String, Value)>,
    json_default: Option<Box<dyn Fn(&kv::Value) -> Value + Send + Sync>>,
    output: Output,
}

impl Setup {
    pub fn new(level: &str) -> Self {
        Setup {
            level: level.to_owned(),
            quiet_level: None,
            quiet_targets: DEFAULT_QUIET_TARGETS
                .iter()
                .map(|target| (*target).to_owned())
                .collect(),
            preset: Preset::Full,
            fields: Vec::new(),
            json_default: None,
            output: Output::Stderr,
        }
    }

    /// Severity from `log_level` (default `DEBUG`) and quiet severity
    /// from `boto_level` (default `WARN`).
    pub fn from_env() -> Self {
        setup(&env_or(LOG_LEVEL_ENV, DEFAULT_LOG_LEVEL))
            .quiet_level(&env_or(QUIET_LEVEL_ENV, DEFAULT_QUIET_LEVEL))
    }

    /// Choose the built-in field set the template starts from.
    pub fn preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self
    }

    /// Seed the template with a constant field, overriding a built-in
    /// entry of the same name.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn fields<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in pairs {
            self.fields.push((name.into(), value.into()));
        }
        self
    }

    /// Minimum severity for the quieted namespaces. Defaults to the
    /// primary level when not set.
    pub fn quiet_level(mut self, level: &str) -> Self {
        self.quiet_level = Some(level.to_owned());
        self
    }

    /// Replace the quieted namespace set.
    pub fn quiet_targets<S>(mut self, targets: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<String>,
    {
        self.quiet_targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Fallback serializer for structured values with no native JSON
    /// representation, see [`JsonFormatter::json_default`].
    pub fn json_default(
        mut self,
        fallback: impl Fn(&kv::Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.json_default = Some(Box::new(fallback));
        self
    }

    pub fn output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    /// Install the logger, or reconfigure it when an earlier `setup`
    /// already installed it.
    ///
    /// An unrecognized severity name never fails the caller: the level
    /// falls back to `INFO` (the quiet level falls back to the primary
    /// level) and an error line naming the offending input is emitted
    /// through the installed logger. `Err` only when a foreign logger
    /// already owns the `log` facade.
    pub fn try_install(self) -> Result<Handle, SetLoggerError> {
        let (level, level_err) = or_fallback(levels::parse(&self.level), LevelFilter::Info);
        let (quiet, quiet_err) = match &self.quiet_level {
            None => (level, None),
            Some(raw) => or_fallback(levels::parse(raw), level),
        };

        let mut filter = filter::Builder::new();
        filter.filter_level(level);
        for target in &self.quiet_targets {
            filter.filter_module(target, quiet);
        }

        let mut formatter = JsonFormatter::with_template(FieldTemplate::preset(self.preset));
        for (name, value) in self.fields {
            formatter.add_field(name, FieldSource::Literal(value));
        }
        if let Some(fallback) = self.json_default {
            formatter = formatter.json_default_boxed(fallback);
        }

        let shared = logger::install(Inner {
            formatter,
            filter: filter.build(),
            output: self.output,
        })?;

        if let Some(err) = &level_err {
            log::error!("{}", err);
        }
        if let Some(err) = &quiet_err {
            log::error!("{}", err);
        }

        Ok(Handle { shared })
    }

    /// Install the logger.
    ///
    /// # Panics
    ///
    /// Panics when a foreign logger has already been configured. Use
    /// [`Setup::try_install`] to handle that case.
    pub fn install(self) -> Handle {
        self.try_install().unwrap()
    }
}

fn or_fallback(
    parsed: Result<LevelFilter, InvalidLevel>,
    default: LevelFilter,
) -> (LevelFilter, Option<InvalidLevel>) {
    match parsed {
        Ok(level) => (level, None),
        Err(err) => (default, Some(err)),
    }
}

/// Remote control for the installed logger, returned by
/// [`Setup::try_install`]. Clone it freely; all clones reach the same
/// live template.
#[derive(Clone)]
pub struct Handle {
    shared: Shared,
}

impl Handle {
    /// Merge a constant field into the live template; log calls made
    /// after this see the new field. There is no removal operation.
    pub fn add_field(&self, name: impl Into<String>, value: impl Into<Value>) {
        logger::write(&self.shared)
            .formatter
            .add_field(name, FieldSource::Literal(value.into()));
    }

    /// Merge several constant fields at once.
    pub fn add_fields<K, V>(&self, pairs: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut inner = logger::write(&self.shared);
        for (name, value) in pairs {
            inner
                .formatter
                .add_field(name, FieldSource::Literal(value.into()));
        }
    }
}
