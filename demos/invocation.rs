//! an example running a handler under the invocation middleware, the way
//! a lambda entry point would

use json_lambda_logger::lambda::{with_request_logging, InvocationContext};
use serde_json::json;

fn main() {
    let event = json!({
        "requestContext": { "requestId": "b2d9e9d7" },
        "body": r#"{"width": 200}"#
    });
    let context = InvocationContext {
        function_name: Some("resize-image".to_owned()),
        function_version: Some("7".to_owned()),
        ..InvocationContext::default()
    };

    let status = with_request_logging(&event, &context, |event, _context| {
        // the body is JSON text, so it lands in the entry structurally
        log::info!("{}", event["body"].as_str().unwrap_or(""));
        log::info!("resized");
        200
    });

    log::info!("handler returned {}", status);
}
