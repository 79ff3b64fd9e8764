//! Leveled kernel logging over serial and the VGA console.
//!
//! The `kfatal!`..`ktrace!` macros funnel into [`log`]. Every line gets a
//! TSC-derived boot timestamp, an ANSI color on serial and a colored level
//! badge on VGA. The runtime filter defaults to `Info` and can be changed
//! from the kernel command line with `loglevel=<fatal|error|warn|info|debug|trace>`.

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::serial;
use crate::vga_buffer::{self, Color};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Fatal => "FATAL",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    pub const fn priority(self) -> u8 {
        match self {
            LogLevel::Fatal => 0,
            LogLevel::Error => 1,
            LogLevel::Warn => 2,
            LogLevel::Info => 3,
            LogLevel::Debug => 4,
            LogLevel::Trace => 5,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fatal" => Some(LogLevel::Fatal),
            "error" => Some(LogLevel::Error),
            "warn" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn serial_color(self) -> &'static str {
        match self {
            LogLevel::Fatal => "\x1b[1;37;41m",
            LogLevel::Error => "\x1b[1;31m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Trace => "\x1b[90m",
        }
    }

    fn badge_colors(self) -> (Color, Color) {
        match self {
            LogLevel::Fatal => (Color::White, Color::Red),
            LogLevel::Error => (Color::LightRed, Color::Black),
            LogLevel::Warn => (Color::Yellow, Color::Black),
            LogLevel::Info => (Color::LightGreen, Color::Black),
            LogLevel::Debug => (Color::LightCyan, Color::Black),
            LogLevel::Trace => (Color::LightGray, Color::Black),
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info.priority());
static BOOT_TSC: AtomicU64 = AtomicU64::new(0);

// No calibration this early; a fixed rate keeps timestamps monotonic and
// roughly proportional, which is all the boot log needs.
const ASSUMED_TSC_FREQUENCY_HZ: u64 = 1_000_000_000;

fn rdtsc() -> u64 {
    unsafe { core::arch::x86_64::_rdtsc() }
}

pub fn init() {
    BOOT_TSC.store(rdtsc(), Ordering::SeqCst);
    serial::init();
}

/// Microseconds since [`init`], assuming the fixed TSC rate.
pub fn boot_time_us() -> u64 {
    let delta = rdtsc().wrapping_sub(BOOT_TSC.load(Ordering::Relaxed));
    delta / (ASSUMED_TSC_FREQUENCY_HZ / 1_000_000)
}

pub fn set_level(level: LogLevel) {
    LOG_LEVEL.store(level.priority(), Ordering::Relaxed);
}

pub fn level_enabled(level: LogLevel) -> bool {
    level.priority() <= LOG_LEVEL.load(Ordering::Relaxed)
}

/// Picks up `loglevel=<name>` from the kernel command line.
pub fn apply_cmdline(cmdline: &str) {
    if let Some(level) = parse_loglevel(cmdline) {
        set_level(level);
        crate::kinfo!("log level set to {} from cmdline", level.as_str());
    }
}

pub fn parse_loglevel(cmdline: &str) -> Option<LogLevel> {
    cmdline
        .split_whitespace()
        .find_map(|arg| arg.strip_prefix("loglevel="))
        .and_then(LogLevel::from_name)
}

pub fn log(level: LogLevel, args: fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }

    let us = boot_time_us();
    let secs = us / 1_000_000;
    let millis = (us / 1_000) % 1_000;

    serial::_print(format_args!(
        "[{:5}.{:03}] {}{:<5}\x1b[0m ",
        secs,
        millis,
        level.serial_color(),
        level.as_str()
    ));
    serial::_print(args);
    serial::_print(format_args!("\n"));

    let (foreground, background) = level.badge_colors();
    vga_buffer::with_writer(|writer| {
        write!(writer, "[{:5}.{:03}] ", secs, millis).ok();
        writer.set_color(foreground, background);
        write!(writer, "{:<5}", level.as_str()).ok();
        writer.reset_color();
        writer.write_char(' ').ok();
        writer.write_fmt(args).ok();
        writer.write_char('\n').ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_from_fatal_to_trace() {
        assert!(LogLevel::Fatal.priority() < LogLevel::Error.priority());
        assert!(LogLevel::Error.priority() < LogLevel::Warn.priority());
        assert!(LogLevel::Warn.priority() < LogLevel::Info.priority());
        assert!(LogLevel::Info.priority() < LogLevel::Debug.priority());
        assert!(LogLevel::Debug.priority() < LogLevel::Trace.priority());
    }

    #[test]
    fn level_names_roundtrip() {
        for level in [
            LogLevel::Fatal,
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            let name = level.as_str().to_ascii_lowercase();
            assert_eq!(LogLevel::from_name(&name), Some(level));
        }
        assert_eq!(LogLevel::from_name("verbose"), None);
    }

    #[test]
    fn cmdline_loglevel_parsing() {
        assert_eq!(
            parse_loglevel("root=/dev/ram0 loglevel=debug quiet"),
            Some(LogLevel::Debug)
        );
        assert_eq!(parse_loglevel("loglevel=trace"), Some(LogLevel::Trace));
        assert_eq!(parse_loglevel("loglevel=bogus"), None);
        assert_eq!(parse_loglevel(""), None);
        assert_eq!(parse_loglevel("log=debug"), None);
    }
}
