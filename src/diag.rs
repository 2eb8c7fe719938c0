use std::sync::Mutex;

/// Sink for diagnostic traces emitted while compiling a grammar and while
/// parsing with `verbose` enabled.
///
/// Injecting the sink keeps trace output out of stdout and lets tests assert
/// on what was emitted.
pub trait Diagnostics: Send + Sync {
    fn emit(&self, message: &str);
}

/// Forwards every diagnostic to [`log::trace!`]. The default sink.
#[derive(Debug, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn emit(&self, message: &str) {
        log::trace!("{}", message);
    }
}

/// Collects diagnostics in memory so they can be inspected afterwards.
#[derive(Debug, Default)]
pub struct BufferDiagnostics {
    messages: Mutex<Vec<String>>,
}

impl BufferDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of everything emitted so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .expect("diagnostics mutex poisoned")
            .clone()
    }
}

impl Diagnostics for BufferDiagnostics {
    fn emit(&self, message: &str) {
        self.messages
            .lock()
            .expect("diagnostics mutex poisoned")
            .push(message.to_owned());
    }
}
