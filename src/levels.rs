use log::LevelFilter;
use thiserror::Error;

/// A severity name that matched none of the accepted spellings.
///
/// Recovered by [`crate::Setup::try_install`], which falls back to `INFO`
/// and reports the offending input on the freshly installed logger.
#[derive(Debug, Error, PartialEq)]
#[error("invalid log level: {0}")]
pub struct InvalidLevel(pub String);

/// Parse a severity name, case-insensitively.
///
/// Accepts the `log` crate spellings plus the aliases common in logging
/// configuration shipped from other runtimes: `WARNING` for `WARN`, and
/// `CRITICAL`/`FATAL` for `ERROR` (the `log` facade has no level above
/// error).
pub fn parse(name: &str) -> Result<LevelFilter, InvalidLevel> {
    match name.to_ascii_uppercase().as_str() {
        "OFF" => Ok(LevelFilter::Off),
        "TRACE" => Ok(LevelFilter::Trace),
        "DEBUG" => Ok(LevelFilter::Debug),
        "INFO" => Ok(LevelFilter::Info),
        "WARN" | "WARNING" => Ok(LevelFilter::Warn),
        "ERROR" | "CRITICAL" | "FATAL" => Ok(LevelFilter::Error),
        _ => Err(InvalidLevel(name.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_names() {
        assert_eq!(parse("TRACE"), Ok(LevelFilter::Trace));
        assert_eq!(parse("DEBUG"), Ok(LevelFilter::Debug));
        assert_eq!(parse("INFO"), Ok(LevelFilter::Info));
        assert_eq!(parse("WARN"), Ok(LevelFilter::Warn));
        assert_eq!(parse("ERROR"), Ok(LevelFilter::Error));
        assert_eq!(parse("OFF"), Ok(LevelFilter::Off));
    }

    #[test]
    fn parses_aliases_and_mixed_case() {
        assert_eq!(parse("warning"), Ok(LevelFilter::Warn));
        assert_eq!(parse("Critical"), Ok(LevelFilter::Error));
        assert_eq!(parse("fatal"), Ok(LevelFilter::Error));
        assert_eq!(parse("debug"), Ok(LevelFilter::Debug));
    }

    #[test]
    fn rejects_unknown_names() {
        let err = parse("not a valid log level").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid log level: not a valid log level"
        );
    }
}
