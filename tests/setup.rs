use std::io::{self, Write};
use std::sync::Mutex;

use lazy_static::lazy_static;
use serde_json::{json, Value};
use serial_test::serial;

use json_lambda_logger::lambda::{with_setup, InvocationContext};
use json_lambda_logger::{setup, Output, Setup};

lazy_static! {
    static ref CAPTURED: Mutex<Vec<u8>> = Mutex::new(Vec::new());
}

struct Capture;

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        CAPTURED.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture() -> Output {
    CAPTURED.lock().unwrap().clear();
    Output::Pipe(Box::new(Capture))
}

fn drain() -> Vec<Value> {
    let mut captured = CAPTURED.lock().unwrap();
    let text = String::from_utf8(captured.split_off(0)).unwrap();
    text.lines()
        .map(|line| serde_json::from_str(line).expect("every log line must parse as JSON"))
        .collect()
}

fn check_base_fields(entry: &Value) {
    assert!(entry.get("timestamp").is_some());
    assert!(entry.get("level").is_some());
    assert!(entry.get("filename").is_some());
    assert!(entry.get("message").is_some());
}

#[test]
#[serial]
fn setup_with_valid_log_levels() {
    for level in &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"] {
        let _handle = setup(level)
            .field("request_id", "request id!")
            .field("another", "value")
            .output(capture())
            .try_install()
            .unwrap();

        log::error!("This is a test");

        let entries = drain();
        assert_eq!(entries.len(), 1, "level {}", level);
        check_base_fields(&entries[0]);
        assert_eq!(entries[0]["level"], "ERROR");
        assert_eq!(entries[0]["message"], "This is a test");
        assert_eq!(entries[0]["request_id"], "request id!");
        assert_eq!(entries[0]["another"], "value");
    }
}

#[test]
#[serial]
fn setup_with_invalid_log_level_falls_back_to_info() {
    let _handle = setup("not a valid log level")
        .field("request_id", "request id!")
        .output(capture())
        .try_install()
        .unwrap();

    log::debug!("hidden");
    log::info!("visible");

    let entries = drain();
    assert_eq!(entries.len(), 2);

    check_base_fields(&entries[0]);
    assert_eq!(entries[0]["level"], "ERROR");
    assert_eq!(
        entries[0]["message"],
        "invalid log level: not a valid log level"
    );

    check_base_fields(&entries[1]);
    assert_eq!(entries[1]["level"], "INFO");
    assert_eq!(entries[1]["message"], "visible");
    assert_eq!(entries[1]["request_id"], "request id!");
}

#[test]
#[serial]
fn invalid_quiet_level_falls_back_to_primary() {
    let _handle = setup("DEBUG")
        .quiet_level("not a level either")
        .output(capture())
        .try_install()
        .unwrap();

    let entries = drain();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["level"], "ERROR");
    assert_eq!(
        entries[0]["message"],
        "invalid log level: not a level either"
    );

    // fell back to the primary level, so dependency debug noise passes
    log::log!(target: "hyper", log::Level::Debug, "handshake");
    assert_eq!(drain().len(), 1);
}

#[test]
#[serial]
fn quiet_targets_are_filtered_separately() {
    let _handle = setup("DEBUG")
        .quiet_level("WARN")
        .output(capture())
        .try_install()
        .unwrap();

    log::log!(target: "hyper", log::Level::Debug, "connection noise");
    log::log!(target: "hyper", log::Level::Warn, "slow response");
    log::debug!("application detail");

    let entries = drain();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["message"], "slow response");
    assert_eq!(entries[1]["message"], "application detail");
}

#[test]
#[serial]
fn add_field_applies_to_later_records() {
    let handle = setup("INFO").output(capture()).try_install().unwrap();

    log::info!("before");
    handle.add_field("user", "42");
    log::info!("hello");

    let entries = drain();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].get("user").is_none());
    assert_eq!(entries[1]["message"], "hello");
    assert_eq!(entries[1]["user"], "42");
}

#[test]
#[serial]
fn json_text_message_is_embedded_structurally() {
    let _handle = setup("INFO").output(capture()).try_install().unwrap();

    log::info!("{}", r#"{"a":1}"#);

    let entries = drain();
    assert_eq!(entries[0]["message"], json!({"a": 1}));
}

#[test]
#[serial]
fn structured_pairs_and_exception_key() {
    let _handle = setup("INFO").output(capture()).try_install().unwrap();

    kv_log_macro::info!("lookup", { user: "42", attempt: 3 });
    kv_log_macro::error!("request failed", {
        exception: "upstream timed out\ncaused by: connection reset"
    });

    let entries = drain();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["user"], "42");
    assert_eq!(entries[0]["attempt"], 3);
    assert_eq!(
        entries[1]["exception"],
        "upstream timed out\ncaused by: connection reset"
    );
    assert_eq!(entries[1]["message"], "request failed");
}

#[test]
#[serial]
fn arbitrary_messages_round_trip_as_json() {
    let _handle = setup("DEBUG").output(capture()).try_install().unwrap();

    let nasty = [
        "plain",
        r#"quo"tes and back\slashes"#,
        "{not json",
        "key=value & <tags>",
        "42",
        "[1,2]",
    ];
    for text in &nasty {
        log::debug!("{}", text);
    }

    // drain() parses every line or panics
    assert_eq!(drain().len(), nasty.len());
}

#[test]
#[serial]
fn middleware_seeds_request_scoped_fields() {
    let event = json!({"requestContext": {"requestId": "evt-1"}});
    let context = InvocationContext {
        request_id: Some("ctx-9".to_owned()),
        function_name: Some("resize-image".to_owned()),
        function_version: Some("7".to_owned()),
        ..InvocationContext::default()
    };

    let status = with_setup(
        Setup::new("INFO").output(capture()),
        &event,
        &context,
        |_event, _context| {
            log::info!("inside");
            200
        },
    );

    assert_eq!(status, 200);
    let entries = drain();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["aws_request_id"], "evt-1");
    assert_eq!(entries[0]["function_name"], "resize-image");
    assert_eq!(entries[0]["function_version"], "7");
    assert!(entries[0].get("invoked_function_arn").is_none());
}

#[test]
#[serial]
fn middleware_falls_back_to_context_request_id() {
    let event = json!({"body": "{}"});
    let context = InvocationContext {
        request_id: Some("ctx-9".to_owned()),
        ..InvocationContext::default()
    };

    with_setup(
        Setup::new("INFO").output(capture()),
        &event,
        &context,
        |_event, _context| log::info!("inside"),
    );

    let entries = drain();
    assert_eq!(entries[0]["aws_request_id"], "ctx-9");
}

#[test]
#[serial]
fn try_init_reads_the_environment() {
    std::env::set_var("log_level", "WARNING");
    std::env::remove_var("boto_level");

    let _handle = json_lambda_logger::try_init().unwrap();
    assert_eq!(log::max_level(), log::LevelFilter::Warn);

    std::env::remove_var("log_level");
}
