use kernel_bug::{LOG_TARGET, bug, bug_on};
use log::{LevelFilter, Log, Metadata, Record};
use std::panic;
use std::sync::{Mutex, Once};

/// Collects every record logged under the `bug` target.
struct CaptureLogger {
    records: Mutex<Vec<(log::Level, String)>>,
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};
static INIT: Once = Once::new();

impl Log for CaptureLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target() == LOG_TARGET
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.records
                .lock()
                .unwrap()
                .push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

fn install_logger() {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
}

#[test]
fn bug_reports_location_then_panics() {
    install_logger();

    let res = panic::catch_unwind(|| {
        bug!("lock {} released while not held", "queue");
    });
    let payload = res.expect_err("bug! must not return");
    let msg = payload
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_default();
    assert!(msg.starts_with("kernel BUG at "), "{msg}");
    assert!(msg.contains("bug.rs"), "{msg}");
    assert!(msg.ends_with("lock queue released while not held"), "{msg}");

    let records = LOGGER.records.lock().unwrap();
    assert!(
        records
            .iter()
            .any(|(level, text)| *level == log::Level::Error
                && text.contains("lock queue released while not held")),
        "bug must be reported before halting: {records:?}"
    );
}

#[test]
fn bug_on_only_fires_when_condition_holds() {
    install_logger();

    let quiet = panic::catch_unwind(|| bug_on!(3 < 2, "inverted"));
    assert!(quiet.is_ok());

    let loud = panic::catch_unwind(|| bug_on!(3 > 2, "ring over-consumed by {}", 1));
    assert!(loud.is_err());
}
