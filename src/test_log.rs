//! Test logger: `env_logger` output plus a record of every line, so tests can
//! check which diagnostics a pass emitted.

use log::{LevelFilter, Log, Metadata, Record};
use std::sync::{Mutex, OnceLock};

struct Capture {
    inner: env_logger::Logger,
    lines: Mutex<Vec<String>>,
}

impl Log for Capture {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(format!("{} {}", record.target(), record.args()));
        }
        if self.inner.enabled(record.metadata()) {
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

static CAPTURE: OnceLock<Capture> = OnceLock::new();

pub(crate) fn init() {
    let capture = CAPTURE.get_or_init(|| Capture {
        inner: env_logger::Builder::from_default_env().is_test(true).build(),
        lines: Mutex::new(Vec::new()),
    });
    let _ = log::set_logger(capture);
    log::set_max_level(LevelFilter::Trace);
}

/// Whether any captured line on `target` contains `needle`. Tests run in
/// parallel, so needles should be unique to the calling test.
pub(crate) fn logged(target: &str, needle: &str) -> bool {
    CAPTURE
        .get()
        .and_then(|c| c.lines.lock().ok())
        .is_some_and(|lines| lines.iter().any(|l| l.starts_with(target) && l.contains(needle)))
}
