use log::kv;
use serde_json::{Map, Value};

use crate::record::{render_chain, ErrorCapture, LogRecord, Message};

/// Key the resolved message is rendered under.
const MESSAGE: &str = "message";

/// Key the rendered error text is rendered under. A structured field
/// logged under this name is treated as an attached error rather than an
/// ordinary extra field.
pub const EXCEPTION_KEY: &str = "exception";

/// How a template entry obtains its value from a record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSource {
    /// Epoch milliseconds, or an RFC 3339 string with the
    /// `iso-timestamps` feature.
    Timestamp,
    /// Upper-case level name.
    Level,
    /// Source file of the call site.
    File,
    /// The `log` target, usually the calling module path.
    Target,
    /// Call-site line number.
    Line,
    /// `file:line` in one field.
    Location,
    /// A caller-supplied constant.
    Literal(Value),
}

/// The built-in field sets.
///
/// `Full` spells the call site out across separate fields; `Compact`
/// collapses it into a single `location` field. Both carry `timestamp`
/// and `level`, and every entry additionally carries `message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Full,
    Compact,
}

/// Ordered mapping of output field name to [`FieldSource`].
#[derive(Debug, Clone)]
pub struct FieldTemplate {
    entries: Vec<(String, FieldSource)>,
}

impl FieldTemplate {
    pub fn preset(preset: Preset) -> Self {
        let entries = match preset {
            Preset::Full => vec![
                ("timestamp".to_owned(), FieldSource::Timestamp),
                ("level".to_owned(), FieldSource::Level),
                ("filename".to_owned(), FieldSource::File),
                ("target".to_owned(), FieldSource::Target),
                ("line".to_owned(), FieldSource::Line),
            ],
            Preset::Compact => vec![
                ("timestamp".to_owned(), FieldSource::Timestamp),
                ("level".to_owned(), FieldSource::Level),
                ("location".to_owned(), FieldSource::Location),
            ],
        };
        FieldTemplate { entries }
    }

    /// Add a field, replacing any existing entry of the same name.
    pub fn set(&mut self, name: impl Into<String>, source: FieldSource) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = source,
            None => self.entries.push((name, source)),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &(String, FieldSource)> {
        self.entries.iter()
    }
}

impl Default for FieldTemplate {
    fn default() -> Self {
        FieldTemplate::preset(Preset::Full)
    }
}

/// Renders log records as single-line JSON.
///
/// Formatting is best-effort by contract: it never panics and never
/// returns an error. Values that cannot be represented natively go
/// through the configured fallback serializer, which coerces them to
/// their display string unless replaced via [`JsonFormatter::json_default`].
pub struct JsonFormatter {
    template: FieldTemplate,
    json_default: Box<dyn Fn(&kv::Value) -> Value + Send + Sync>,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        JsonFormatter::new()
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        JsonFormatter::with_template(FieldTemplate::default())
    }

    pub fn with_template(template: FieldTemplate) -> Self {
        JsonFormatter {
            template,
            json_default: Box::new(|value| Value::String(value.to_string())),
        }
    }

    /// Replace the fallback serializer for structured values that have no
    /// native JSON representation. The replacement must not panic.
    pub fn json_default(
        mut self,
        fallback: impl Fn(&kv::Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.json_default = Box::new(fallback);
        self
    }

    pub(crate) fn json_default_boxed(
        mut self,
        fallback: Box<dyn Fn(&kv::Value) -> Value + Send + Sync>,
    ) -> Self {
        self.json_default = fallback;
        self
    }

    /// Merge one field into the live template; later entries of the same
    /// name replace earlier ones. There is no removal operation.
    pub fn add_field(&mut self, name: impl Into<String>, source: FieldSource) {
        self.template.set(name, source);
    }

    /// Render a record through the `log` facade's view of a log call.
    pub fn format_record(&self, record: &log::Record) -> String {
        let mut collector = KvCollector {
            formatter: self,
            extra: Vec::new(),
            error: None,
        };
        let _ = record.key_values().visit(&mut collector);

        let view = LogRecord {
            level: record.level(),
            target: record.target(),
            file: record.file(),
            line: record.line(),
            message: Message::resolve(&record.args().to_string()),
            error: collector.error,
            extra: collector.extra,
        };
        self.format(&view)
    }

    /// Render one record as a JSON line.
    pub fn format(&self, record: &LogRecord) -> String {
        let mut entry = Map::new();
        for (name, source) in self.template.entries() {
            if let Some(value) = self.resolve(source, record) {
                entry.insert(name.clone(), value);
            }
        }

        for (key, value) in &record.extra {
            entry.insert(key.clone(), value.clone());
        }

        let message = match &record.message {
            Message::Structured(value) => value.clone(),
            Message::PlainText(text) => Value::String(text.clone()),
        };
        entry.insert(MESSAGE.to_owned(), message);

        if let Some(error) = &record.error {
            let text = error.text();
            if !text.is_empty() {
                entry.insert(EXCEPTION_KEY.to_owned(), Value::String(text.to_owned()));
            }
        }

        serde_json::to_string(&entry).unwrap_or_else(|_| "{}".to_owned())
    }

    fn resolve(&self, source: &FieldSource, record: &LogRecord) -> Option<Value> {
        let value = match source {
            FieldSource::Timestamp => timestamp(),
            FieldSource::Level => Value::String(record.level.to_string()),
            FieldSource::File => Value::String(record.file?.to_owned()),
            FieldSource::Target => Value::String(record.target.to_owned()),
            FieldSource::Line => Value::from(record.line?),
            FieldSource::Location => {
                let file = record.file?;
                match record.line {
                    Some(line) => Value::String(format!("{}:{}", file, line)),
                    None => Value::String(file.to_owned()),
                }
            }
            FieldSource::Literal(value) => value.clone(),
        };
        if is_empty(&value) {
            None
        } else {
            Some(value)
        }
    }

    pub(crate) fn coerce(&self, value: &kv::Value) -> Value {
        if let Some(text) = value.to_borrowed_str() {
            return Value::String(text.to_owned());
        }
        if let Some(flag) = value.to_bool() {
            return Value::Bool(flag);
        }
        if let Some(number) = value.to_u64() {
            return Value::from(number);
        }
        if let Some(number) = value.to_i64() {
            return Value::from(number);
        }
        if let Some(number) = value.to_f64() {
            if let Some(number) = serde_json::Number::from_f64(number) {
                return Value::Number(number);
            }
        }
        (self.json_default)(value)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

#[cfg(feature = "iso-timestamps")]
fn timestamp() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}

#[cfg(not(feature = "iso-timestamps"))]
fn timestamp() -> Value {
    let millis = std::time::UNIX_EPOCH
        .elapsed()
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default();
    Value::from(millis)
}

/// Collects the structured pairs of a `log::Record`, splitting out the
/// reserved `exception` key.
struct KvCollector<'f> {
    formatter: &'f JsonFormatter,
    extra: Vec<(String, Value)>,
    error: Option<ErrorCapture<'static>>,
}

impl<'f, 'kvs> kv::Visitor<'kvs> for KvCollector<'f> {
    fn visit_pair(
        &mut self,
        key: kv::Key<'kvs>,
        value: kv::Value<'kvs>,
    ) -> Result<(), kv::Error> {
        if key.as_str() == EXCEPTION_KEY {
            self.error = Some(match value.to_borrowed_error() {
                Some(error) => ErrorCapture::from_text(render_chain(error)),
                None => ErrorCapture::from_text(value.to_string()),
            });
        } else {
            let coerced = self.formatter.coerce(&value);
            self.extra.push((key.as_str().to_owned(), coerced));
        }
        Ok(())
    }
}
