// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Logging and Diagnostics
//!
//! Logging goes through the `log` facade so the kernel image decides
//! where records end up (serial port, framebuffer, test capture). The
//! crate macros tag each record with the emitting module path.
//!
//! Contract violations inside the thread core are not errors that a
//! caller can handle. They are reported with [`kassert!`] or
//! [`kernel_fatal!`], which log the diagnostic and then panic; the
//! kernel's panic handler halts the machine.
//!
//! # Usage
//!
//! ```rust,ignore
//! log_debug!("created thread {} '{}'", tid, name);
//!
//! kassert!(t.status() == ThreadStatus::Blocked, "thread {} is not blocked", t.tid());
//! ```

use core::fmt;

/// Log levels
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Trace-level logging (very verbose)
    Trace = 0,

    /// Debug-level logging (verbose)
    Debug = 1,

    /// Informational logging
    Info = 2,

    /// Warning-level logging
    Warning = 3,

    /// Error-level logging
    Error = 4,

    /// Fatal errors (will halt the system)
    Fatal = 5,
}

impl LogLevel {
    /// Get the log level name as a string
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Parse a level name as written on the kernel command line
    ///
    /// `off` parses to `Some(None)`; unknown names to `None`.
    pub fn from_name(name: &str) -> Option<Option<LogLevel>> {
        let level = match name {
            "off" => return Some(None),
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" => LogLevel::Warning,
            "error" => LogLevel::Error,
            _ => return None,
        };
        Some(Some(level))
    }
}

#[cfg(feature = "log")]
impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::Level::Trace,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error | LogLevel::Fatal => log::Level::Error,
        }
    }
}

/// Set the minimum log level
///
/// `None` silences the kernel. Without the `log` feature this is a no-op.
pub fn log_set_min_level(level: Option<LogLevel>) {
    #[cfg(feature = "log")]
    log::set_max_level(match level {
        None => log::LevelFilter::Off,
        Some(LogLevel::Trace) => log::LevelFilter::Trace,
        Some(LogLevel::Debug) => log::LevelFilter::Debug,
        Some(LogLevel::Info) => log::LevelFilter::Info,
        Some(LogLevel::Warning) => log::LevelFilter::Warn,
        Some(LogLevel::Error) | Some(LogLevel::Fatal) => log::LevelFilter::Error,
    });

    #[cfg(not(feature = "log"))]
    let _ = level;
}

/// Print a formatted message at a specific log level
///
/// # Arguments
///
/// * `level` - Log level for this message
/// * `target` - Module path of the emitting code
/// * `args` - Format arguments
#[inline]
pub fn log_print(level: LogLevel, target: &str, args: fmt::Arguments) {
    #[cfg(feature = "log")]
    log::log!(target: target, log::Level::from(level), "{}", args);

    #[cfg(not(feature = "log"))]
    let _ = (level, target, args);
}

/// Log a trace message
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_print(
            $crate::kernel::debug::LogLevel::Trace,
            module_path!(),
            format_args!($($arg)*),
        )
    };
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_print(
            $crate::kernel::debug::LogLevel::Debug,
            module_path!(),
            format_args!($($arg)*),
        )
    };
}

/// Log an info message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_print(
            $crate::kernel::debug::LogLevel::Info,
            module_path!(),
            format_args!($($arg)*),
        )
    };
}

/// Log a warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_print(
            $crate::kernel::debug::LogLevel::Warning,
            module_path!(),
            format_args!($($arg)*),
        )
    };
}

/// Log an error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_print(
            $crate::kernel::debug::LogLevel::Error,
            module_path!(),
            format_args!($($arg)*),
        )
    };
}

/// Log a fatal error message and halt
///
/// Used for unrecoverable kernel errors only.
#[cold]
#[inline(never)]
pub fn log_fatal(file: &str, line: u32, args: fmt::Arguments) -> ! {
    log_print(LogLevel::Fatal, "rustux::fatal", format_args!("{}:{}: {}", file, line, args));
    panic!("kernel fatal: {}", args);
}

/// Assert handler
///
/// Called when a [`kassert!`] condition does not hold.
#[cold]
#[inline(never)]
pub fn assert_handler(cond: &str, file: &str, line: u32, message: Option<fmt::Arguments>) -> ! {
    match message {
        Some(message) => {
            log_print(
                LogLevel::Fatal,
                "rustux::fatal",
                format_args!("ASSERTION FAILED at {}:{}: {}: {}", file, line, cond, message),
            );
            panic!("assertion failed: {}: {}", cond, message);
        }
        None => {
            log_print(
                LogLevel::Fatal,
                "rustux::fatal",
                format_args!("ASSERTION FAILED at {}:{}: {}", file, line, cond),
            );
            panic!("assertion failed: {}", cond);
        }
    }
}

/// Halt with a diagnostic
#[macro_export]
macro_rules! kernel_fatal {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_fatal(file!(), line!(), format_args!($($arg)*))
    };
}

/// Assert macro (always enabled in kernel)
#[macro_export]
macro_rules! kassert {
    ($cond:expr $(,)?) => {
        if !$cond {
            $crate::kernel::debug::assert_handler(stringify!($cond), file!(), line!(), None);
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::kernel::debug::assert_handler(
                stringify!($cond),
                file!(),
                line!(),
                Some(format_args!($($arg)+)),
            );
        }
    };
}
