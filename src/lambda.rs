//! Invocation middleware: configure request-scoped JSON logging around a
//! handler with ordinary function composition.

use serde_json::Value;

use crate::setup::Setup;

/// Request-scoped metadata for one function invocation. Absent values
/// simply never show up in the rendered entries.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    pub request_id: Option<String>,
    pub function_name: Option<String>,
    pub function_version: Option<String>,
    pub invoked_function_arn: Option<String>,
}

/// Run `handler` with the process logger configured for this invocation,
/// returning whatever the handler returns.
///
/// The request id is taken from the event payload
/// (`requestContext.requestId`) when present, falling back to the
/// invocation context. Severity comes from the environment, see
/// [`Setup::from_env`].
pub fn with_request_logging<F, T>(event: &Value, context: &InvocationContext, handler: F) -> T
where
    F: FnOnce(&Value, &InvocationContext) -> T,
{
    with_setup(Setup::from_env(), event, context, handler)
}

/// [`with_request_logging`] with an explicit base configuration instead
/// of the environment-derived one.
pub fn with_setup<F, T>(
    configured: Setup,
    event: &Value,
    context: &InvocationContext,
    handler: F,
) -> T
where
    F: FnOnce(&Value, &InvocationContext) -> T,
{
    let request_id = event
        .pointer("/requestContext/requestId")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| context.request_id.clone());

    let configured = configured
        .field("aws_request_id", request_id)
        .field("function_name", context.function_name.clone())
        .field("function_version", context.function_version.clone())
        .field("invoked_function_arn", context.invoked_function_arn.clone());

    if configured.try_install().is_err() {
        log::error!("json logger not installed: another logger owns the logging facade");
    }

    handler(event, context)
}
