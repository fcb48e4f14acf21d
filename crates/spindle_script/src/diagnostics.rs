//! Turning script exceptions into bridge errors, and reporting them.

use crate::error::ScriptError;
use crate::output::SharedRedirector;
use rquickjs::{Ctx, Value};
use tracing::error;

/// Describe `error`, taking (and so clearing) the pending exception if the
/// error came from script code.
pub(crate) fn describe_error(ctx: &Ctx<'_>, error: rquickjs::Error) -> String {
    match error {
        rquickjs::Error::Exception => describe_exception(&ctx.catch()),
        other => other.to_string(),
    }
}

/// Wrap a failed script call as [`ScriptError::Invocation`].
pub(crate) fn invocation(ctx: &Ctx<'_>, during: impl Into<String>, error: rquickjs::Error) -> ScriptError {
    ScriptError::Invocation {
        during: during.into(),
        message: describe_error(ctx, error),
    }
}

/// `Name: message` followed by the stack, when the value carries one.
pub(crate) fn describe_exception(exception: &Value<'_>) -> String {
    if let Some(object) = exception.as_object() {
        let text = |key: &str| {
            object
                .get::<_, Option<String>>(key)
                .ok()
                .flatten()
                .filter(|s| !s.is_empty())
        };
        let name = text("name").unwrap_or_else(|| "Error".to_owned());
        let mut output = match text("message") {
            Some(message) => format!("{name}: {message}"),
            None => name,
        };
        if let Some(stack) = text("stack") {
            output.push('\n');
            output.push_str(stack.trim_end());
        }
        return output;
    }
    if let Some(text) = exception.as_string().and_then(|s| s.to_string().ok()) {
        return text;
    }
    if let Some(number) = exception.as_number() {
        return number.to_string();
    }
    format!("uncaught {:?}", exception.type_of())
}

/// Sends bridge failures to the script's error stream and the log.
#[derive(Clone)]
pub struct Reporter {
    stderr: SharedRedirector,
}

impl Reporter {
    pub fn new(stderr: SharedRedirector) -> Self {
        Self { stderr }
    }

    pub fn report(&self, failure: &ScriptError) {
        error!(kind = ?failure.kind(), "{failure}");
        if let Ok(mut stream) = self.stderr.try_borrow_mut() {
            stream.write(&format!("{failure}\n"));
        }
    }
}
