use std::error::Error;
use std::sync::OnceLock;

use log::Level;
use serde_json::Value;

/// The payload of a log call, resolved once before rendering.
///
/// Callers log either free-form text or something already structured.
/// Text that happens to be valid JSON is promoted to its parsed form so
/// the final entry nests it instead of double-encoding it.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A value embedded verbatim in the entry's `message` field.
    Structured(Value),
    /// Text that did not parse as JSON.
    PlainText(String),
}

impl Message {
    /// Promote `raw` to [`Message::Structured`] if it parses as JSON,
    /// otherwise keep it as plain text. A non-JSON string is a normal,
    /// expected case, not an error.
    pub fn resolve(raw: &str) -> Message {
        match serde_json::from_str(raw) {
            Ok(value) => Message::Structured(value),
            Err(_) => Message::PlainText(raw.to_owned()),
        }
    }
}

/// An error attached to a log record.
///
/// The rendered cause-chain text is computed the first time it is needed
/// and reused if the same record is formatted again.
#[derive(Debug)]
pub struct ErrorCapture<'a> {
    source: Option<&'a (dyn Error + 'static)>,
    text: OnceLock<String>,
}

impl<'a> ErrorCapture<'a> {
    /// Capture a borrowed error whose chain is rendered lazily.
    pub fn new(source: &'a (dyn Error + 'static)) -> Self {
        ErrorCapture {
            source: Some(source),
            text: OnceLock::new(),
        }
    }

    /// Wrap text that was already rendered elsewhere.
    pub fn from_text(text: impl Into<String>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(text.into());
        ErrorCapture {
            source: None,
            text: cell,
        }
    }

    /// The rendered cause chain, one `caused by:` line per source.
    pub fn text(&self) -> &str {
        self.text.get_or_init(|| match self.source {
            Some(error) => render_chain(error),
            None => String::new(),
        })
    }
}

pub(crate) fn render_chain(error: &(dyn Error + 'static)) -> String {
    let mut out = error.to_string();
    let mut cause = error.source();
    while let Some(err) = cause {
        out.push_str("\ncaused by: ");
        out.push_str(&err.to_string());
        cause = err.source();
    }
    out
}

/// One logging event, borrowed from the call site.
///
/// [`crate::JsonFormatter::format_record`] builds one of these from a
/// `log::Record` per log call; it can also be assembled by hand when
/// rendering outside the `log` facade.
#[derive(Debug)]
pub struct LogRecord<'a> {
    pub level: Level,
    pub target: &'a str,
    pub file: Option<&'a str>,
    pub line: Option<u32>,
    pub message: Message,
    pub error: Option<ErrorCapture<'a>>,
    /// Per-call structured fields, already coerced to JSON values.
    pub extra: Vec<(String, Value)>,
}

impl<'a> LogRecord<'a> {
    pub fn new(level: Level, message: Message) -> Self {
        LogRecord {
            level,
            target: "",
            file: None,
            line: None,
            message,
            error: None,
            extra: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Outer;

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("outer failed")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&Inner)
        }
    }

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("inner cause")
        }
    }

    impl Error for Inner {}

    #[test]
    fn resolves_json_text_to_structured() {
        assert_eq!(
            Message::resolve(r#"{"a":1}"#),
            Message::Structured(serde_json::json!({"a": 1}))
        );
    }

    #[test]
    fn keeps_non_json_text_plain() {
        assert_eq!(
            Message::resolve("hello"),
            Message::PlainText("hello".to_owned())
        );
    }

    #[test]
    fn keeps_truncated_json_plain() {
        assert_eq!(
            Message::resolve(r#"{"a":"#),
            Message::PlainText(r#"{"a":"#.to_owned())
        );
    }

    #[test]
    fn renders_full_cause_chain() {
        let err = Outer;
        let capture = ErrorCapture::new(&err);
        assert_eq!(capture.text(), "outer failed\ncaused by: inner cause");
    }

    #[test]
    fn pre_rendered_text_wins() {
        let capture = ErrorCapture::from_text("Traceback: boom");
        assert_eq!(capture.text(), "Traceback: boom");
    }
}
