//! Logging macros
//!
//! Arguments are converted to owned [`LogArg`](crate::LogArg) values so the
//! formatter thread can render them. Templates use `format!` placeholders.
//!
//! # Examples
//!
//! ```
//! use device_utils::prelude::*;
//! use device_utils::{log_inf, log_print};
//!
//! let logger = Logger::new(LogConfig::default()).unwrap();
//!
//! // Raw line, caller supplies the trailing newline
//! log_print!(logger, "Free heap {} bytes\n", 81234u32);
//!
//! // Prefixed with time, level, module and line
//! let ssid = "office";
//! log_inf!(logger, "WiFi Station connection to {}, channel {}", ssid, 6);
//! ```

/// Send a raw, unprefixed line through the logger.
///
/// # Examples
///
/// ```
/// # use device_utils::prelude::*;
/// # let logger = Logger::new(LogConfig::default()).unwrap();
/// use device_utils::log_print;
/// log_print!(logger, "plain line\n");
/// log_print!(logger, "{} of {}\n", 1, 2);
/// ```
#[macro_export]
macro_rules! log_print {
    ($logger:expr, $template:expr $(, $arg:expr)* $(,)?) => {
        $logger.log_print($template, &[$($crate::LogArg::from($arg)),*])
    };
}

/// Log at an explicit level with location prefix.
///
/// # Examples
///
/// ```
/// # use device_utils::prelude::*;
/// # let logger = Logger::new(LogConfig::default()).unwrap();
/// use device_utils::log_at;
/// log_at!(logger, LogLevel::Warn, "Retry {} of {}", 2, 5);
/// ```
#[macro_export]
macro_rules! log_at {
    ($logger:expr, $level:expr, $template:expr $(, $arg:expr)* $(,)?) => {
        $logger.log_at(
            $level,
            module_path!(),
            line!(),
            $template,
            &[$($crate::LogArg::from($arg)),*],
        )
    };
}

/// Log a verbose message, shown only when the minimum level is `Verbose`.
#[macro_export]
macro_rules! log_vrb {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::LogLevel::Verbose, $($arg)+)
    };
}

/// Log a debug message.
#[macro_export]
macro_rules! log_dbg {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info message.
///
/// # Examples
///
/// ```
/// # use device_utils::prelude::*;
/// # let logger = Logger::new(LogConfig::default()).unwrap();
/// use device_utils::log_inf;
/// log_inf!(logger, "mDNS service: http://{}.local", "camera");
/// ```
#[macro_export]
macro_rules! log_inf {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning.
#[macro_export]
macro_rules! log_wrn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error.
#[macro_export]
macro_rules! log_err {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}
