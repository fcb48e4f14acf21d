//! Line-buffered redirection of script output.
//!
//! Scripts write to the `stdout` and `stderr` globals (and `console`), which
//! feed an [`OutputRedirector`] each. Text is forwarded one complete line at a
//! time; a partial line waits for its terminator, an explicit flush, or the
//! redirector being dropped.

use rquickjs::class::Trace;
use rquickjs::{Class, Ctx, JsLifetime};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::warn;

/// Destination for forwarded lines.
pub type LineSink = Rc<dyn Fn(&str)>;

/// Redirector shared between the bridge and the script-visible logger.
pub type SharedRedirector = Rc<RefCell<OutputRedirector>>;

pub struct OutputRedirector {
    sink: LineSink,
    line: String,
}

impl OutputRedirector {
    pub fn new(sink: impl Fn(&str) + 'static) -> Self {
        Self::with_sink(Rc::new(sink))
    }

    pub fn with_sink(sink: LineSink) -> Self {
        Self {
            sink,
            line: String::new(),
        }
    }

    pub fn shared(self) -> SharedRedirector {
        Rc::new(RefCell::new(self))
    }

    /// Append `text`, forwarding every line it completes.
    pub fn write(&mut self, text: &str) {
        self.line.push_str(text);
        self.forward(false);
    }

    /// Forward whatever is buffered, even without a terminator.
    pub fn flush(&mut self) {
        self.forward(true);
    }

    /// Replace the sink. Buffered text goes to the new sink.
    pub fn set_sink(&mut self, sink: LineSink) {
        self.sink = sink;
    }

    /// The partial line still waiting for a terminator.
    pub fn pending(&self) -> &str {
        &self.line
    }

    fn forward(&mut self, force: bool) {
        while let Some(end) = self.line.find('\n') {
            let mut text: String = self.line.drain(..=end).collect();
            text.pop();
            if text.ends_with('\r') {
                text.pop();
            }
            (self.sink)(&text);
        }
        if force && !self.line.is_empty() {
            let text = std::mem::take(&mut self.line);
            (self.sink)(&text);
        }
    }
}

impl Drop for OutputRedirector {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Stock sinks.
pub mod sinks {
    use super::LineSink;
    use std::rc::Rc;

    pub const STDOUT_PREFIX: &str = "script stdout: ";
    pub const STDERR_PREFIX: &str = "script stderr: ";

    /// Print to the process's stdout behind `prefix`.
    pub fn stdout(prefix: impl Into<String>) -> LineSink {
        let prefix = prefix.into();
        Rc::new(move |line| println!("{prefix}{line}"))
    }

    /// Print to the process's stderr behind `prefix`.
    pub fn stderr(prefix: impl Into<String>) -> LineSink {
        let prefix = prefix.into();
        Rc::new(move |line| eprintln!("{prefix}{line}"))
    }

    pub fn tracing_stdout() -> LineSink {
        Rc::new(|line| tracing::info!(target: "spindle_script::output", stream = "stdout", "{line}"))
    }

    pub fn tracing_stderr() -> LineSink {
        Rc::new(|line| tracing::warn!(target: "spindle_script::output", stream = "stderr", "{line}"))
    }

    /// Collect lines into a shared vector.
    pub fn capture(lines: Rc<std::cell::RefCell<Vec<String>>>) -> LineSink {
        Rc::new(move |line| lines.borrow_mut().push(line.to_owned()))
    }
}

/// Script-visible stream writer.
#[rquickjs::class(rename = "Logger")]
#[derive(Trace, JsLifetime)]
pub struct LoggerJs {
    #[qjs(skip_trace)]
    redirector: SharedRedirector,
}

#[rquickjs::methods]
impl LoggerJs {
    /// Returns `false` when the text was refused because the stream is busy
    /// forwarding a line, as when a sink writes back into its own stream.
    pub fn write(&self, text: String) -> bool {
        match self.redirector.try_borrow_mut() {
            Ok(mut redirector) => {
                redirector.write(&text);
                true
            }
            Err(_) => {
                warn!(bytes = text.len(), "script output dropped: stream is busy");
                false
            }
        }
    }

    pub fn flush(&self) -> bool {
        match self.redirector.try_borrow_mut() {
            Ok(mut redirector) => {
                redirector.flush();
                true
            }
            Err(_) => {
                warn!("script output flush skipped: stream is busy");
                false
            }
        }
    }
}

/// Routes `console` through the `stdout`/`stderr` globals, looked up per call
/// so reinstalled streams take effect immediately.
const CONSOLE_GLUE: &str = r#"
(() => {
  const render = (value) => {
    if (typeof value === "string") return value;
    if (value instanceof Error) return value.stack ? `${value}\n${value.stack}` : String(value);
    try {
      const json = JSON.stringify(value);
      return json === undefined ? String(value) : json;
    } catch (_) {
      return String(value);
    }
  };
  const to = (stream) => (...values) => {
    globalThis[stream].write(values.map(render).join(" ") + "\n");
  };
  globalThis.console = {
    log: to("stdout"),
    info: to("stdout"),
    debug: to("stdout"),
    warn: to("stderr"),
    error: to("stderr"),
  };
})();
"#;

pub(crate) fn install_console(ctx: &Ctx<'_>) -> rquickjs::Result<()> {
    ctx.eval::<(), _>(CONSOLE_GLUE)
}

/// Publish `stdout` and `stderr` as the script's standard streams.
pub(crate) fn install_streams(
    ctx: &Ctx<'_>,
    stdout: &SharedRedirector,
    stderr: &SharedRedirector,
) -> rquickjs::Result<()> {
    let globals = ctx.globals();
    for (name, redirector) in [("stdout", stdout), ("stderr", stderr)] {
        let logger = Class::instance(
            ctx.clone(),
            LoggerJs {
                redirector: redirector.clone(),
            },
        )?;
        globals.set(name, logger)?;
    }
    Ok(())
}
