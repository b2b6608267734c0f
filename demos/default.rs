//! an example demonstrating some common features for json_lambda_logger
//! To lower the log level set the `log_level` env variable, e.g. log_level=WARN

// note the use of kv_log_macro. structured fields are not quite
// baked in the log crate yet. until then kv_log_macro exposes them
// in log-compatible macros
use kv_log_macro::{debug, error, info, warn};

fn main() {
    let handle = json_lambda_logger::setup("DEBUG")
        .field("function_name", "resize-image")
        .install();

    debug!("I am a debug", { attempt: 1 });
    info!("I am an info");

    handle.add_field("user", "42");
    warn!("I am a warning");
    error!("I am an error", { exception: "upstream timed out" });
}
