use chrono::Local;

pub enum Level {
    Info,
    Warn,
    Error,
    Debug,
}

/// 统一日志输出
/// 格式: [MM-DD HH:MM:SS] [LEVEL] [Target] Message
pub fn print(level: Level, target: &str, args: std::fmt::Arguments) {
    let now = Local::now().format("%m-%d %H:%M:%S");

    let gray = "\x1b[90m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    let (color, tag) = match level {
        Level::Info => ("\x1b[32m", "INFO "),
        Level::Warn => ("\x1b[33m", "WARN "),
        Level::Error => ("\x1b[31m", "ERROR"),
        Level::Debug => ("\x1b[34m", "DEBUG"),
    };

    println!(
        "{}[{}]{} {}{}{} {}[{}]{} {}",
        gray, now, reset, color, tag, reset, cyan, target, reset, args
    );
}

#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Info, $target, format_args!($($arg)+))
    );
    ($($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Info, "System", format_args!($($arg)+))
    );
}

#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Warn, $target, format_args!($($arg)+))
    );
    ($($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Warn, "System", format_args!($($arg)+))
    );
}

#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Error, $target, format_args!($($arg)+))
    );
    ($($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Error, "System", format_args!($($arg)+))
    );
}

#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Debug, $target, format_args!($($arg)+))
    );
    ($($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Debug, "System", format_args!($($arg)+))
    );
}
