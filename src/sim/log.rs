use std::sync::atomic::{AtomicU64, Ordering};

use crate::timeq::Cycle;

#[derive(PartialEq, PartialOrd, Debug, Default, Clone, Copy)]
pub enum LogLevel {
    #[default]
    NONE,
    INFO,
    DEBUG,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::NONE => "NONE",
            LogLevel::INFO => "INFO",
            LogLevel::DEBUG => "DEBUG",
        }
    }
}

pub fn to_loglevel(ulevel: u64) -> LogLevel {
    match ulevel {
        0 => LogLevel::NONE,
        1 => LogLevel::INFO,
        _ => LogLevel::DEBUG,
    }
}

/// Verbosity-gated printer for simulator diagnostics. Every line carries the current cycle,
/// which the engine publishes once per tick.
#[derive(Debug)]
pub struct Logger {
    level: LogLevel,
    cycle: AtomicU64,
}

impl Logger {
    pub fn new(ulevel: u64) -> Self {
        Logger {
            level: to_loglevel(ulevel),
            cycle: AtomicU64::new(0),
        }
    }

    pub fn silent() -> Self {
        Logger::new(0)
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::NONE && level <= self.level
    }

    pub fn set_cycle(&self, cycle: Cycle) {
        self.cycle.store(cycle, Ordering::Relaxed);
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle.load(Ordering::Relaxed)
    }

    pub fn log(&self, level: LogLevel, args: std::fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        println!("[{}][{:>8}] {}", level.as_str(), self.cycle(), args);
    }
}

#[macro_export]
macro_rules! vlog {
    // usage: vlog!(logger, LogLevel::INFO, "a {} event", "clock")
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        $logger.log($level, format_args!($($arg)+));
    }};
}
#[macro_export]
macro_rules! vinfo {
    ($logger:expr, $($arg:tt)+) => ( $crate::vlog!($logger, $crate::sim::log::LogLevel::INFO, $($arg)+); )
}
#[macro_export]
macro_rules! vdebug {
    ($logger:expr, $($arg:tt)+) => ( $crate::vlog!($logger, $crate::sim::log::LogLevel::DEBUG, $($arg)+); )
}
