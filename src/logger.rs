//! Logger bootstrap. Kept deliberately thin: callers embedding this crate
//! are free to install their own `log` backend; this just offers a
//! convenience default in line with how the reference runtime's logger
//! module is feature-gated on `flexi_logger`.

use cfg_if::cfg_if;
use core::sync::atomic::{AtomicBool, Ordering};

static INIT: AtomicBool = AtomicBool::new(false);

/// Initializes the logger with debug-level verbosity (§10.1).
pub fn init_logger_debug() {
    if !INIT.swap(true, Ordering::SeqCst) {
        init(true);
    }
}

/// Initializes the logger at the default, error-and-above verbosity.
pub fn init_logger() {
    if !INIT.swap(true, Ordering::SeqCst) {
        init(false);
    }
}

cfg_if! {
    if #[cfg(feature = "flexi_logger")] {
        fn init(debug: bool) {
            let env = if debug {
                "arduino_interpreter_core=trace"
            } else {
                "arduino_interpreter_core=error"
            };
            flexi_logger::Logger::try_with_env_or_str(env)
                .expect("failed to initialize logger")
                .start()
                .expect("failed to start logger");
        }
    } else {
        fn init(debug: bool) {
            let level = if debug { log::LevelFilter::Trace } else { log::LevelFilter::Error };
            let _ = log::set_boxed_logger(Box::new(NullLogger)).map(|()| log::set_max_level(level));
        }

        struct NullLogger;
        impl log::Log for NullLogger {
            fn enabled(&self, _metadata: &log::Metadata) -> bool {
                false
            }
            fn log(&self, _record: &log::Record) {}
            fn flush(&self) {}
        }
    }
}
