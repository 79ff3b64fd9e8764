//! CinderOS: a Multiboot2 x86_64 hobby kernel.
//!
//! The crate is organized around two low-level pieces and the minimal kernel
//! that exercises them:
//!
//! - `boot`: the Multiboot2 header and the 32-bit -> long-mode trampoline
//!   (`src/boot.S`), entered by the bootloader at `entry`.
//! - `interrupts`: the 256-entry interrupt vector table, the register
//!   save/restore trampoline and the uniform Rust-side dispatcher.
//! - `gdt`, `logger`, `serial`, `vga_buffer`, `memory`, `memory_layout`:
//!   runtime descriptor tables, consoles and layout bookkeeping.
//!
//! Unit tests build against the host `std`; everything that needs the
//! freestanding target (inline assembly referencing linker-script symbols)
//! is compiled for `target_os = "none"` only.
#![cfg_attr(not(test), no_std)]

pub mod boot;
pub mod gdt;
pub mod interrupts;
pub mod logger;
pub mod memory;
pub mod memory_layout;
pub mod serial;
pub mod vga_buffer;

use core::panic::PanicInfo;

#[cfg(target_os = "none")]
use multiboot2::{BootInformation, BootInformationHeader};

/// Kernel entry proper; the boot trampoline hands over here (through the
/// `kernel_main` wrapper in `main.rs`) with paging on, interrupts off and
/// the boot information already relocated to its high-half alias.
#[cfg(target_os = "none")]
pub fn kmain(boot_info_vaddr: u64) -> ! {
    // Bring up the consoles first so a panic during bring-up is visible.
    logger::init();
    vga_buffer::init();

    kinfo!("cinderos kernel bootstrap start");
    kdebug!("multiboot2 info struct at {:#x}", boot_info_vaddr);

    let boot_info = unsafe {
        BootInformation::load(boot_info_vaddr as *const BootInformationHeader)
            .expect("valid multiboot2 info structure")
    };

    if let Some(tag) = boot_info.command_line_tag() {
        if let Ok(cmdline) = tag.cmdline() {
            kdebug!("kernel cmdline: {:?}", cmdline);
            logger::apply_cmdline(cmdline);
        }
    }

    memory::log_memory_overview(&boot_info);
    boot::log_long_mode_state();

    // Descriptor tables before interrupts, interrupts before sti.
    gdt::init();
    interrupts::init_interrupts();
    x86_64::instructions::interrupts::enable();
    kinfo!("CPU interrupts enabled");

    // Drive one software interrupt through the full save/dispatch/restore
    // path before declaring the boot good.
    x86_64::instructions::interrupts::int3();
    kinfo!("breakpoint dispatch smoke test returned");

    kinfo!(
        "boot complete in {}.{:03} ms; idling",
        logger::boot_time_us() / 1_000,
        logger::boot_time_us() % 1_000
    );
    halt_loop()
}

pub fn panic(info: &PanicInfo) -> ! {
    x86_64::instructions::interrupts::disable();
    kfatal!("KERNEL PANIC: {}", info);
    halt_loop()
}

pub fn halt_loop() -> ! {
    loop {
        x86_64::instructions::hlt();
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::vga_buffer::_print(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! println {
    () => { $crate::print!("\n") };
    ($($arg:tt)*) => {{
        $crate::vga_buffer::_print(format_args!($($arg)*));
        $crate::vga_buffer::_print(format_args!("\n"));
    }};
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::serial::_print(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! serial_println {
    () => { $crate::serial_print!("\n") };
    ($($arg:tt)*) => {{
        $crate::serial::_print(format_args!($($arg)*));
        $crate::serial::_print(format_args!("\n"));
    }};
}

#[macro_export]
macro_rules! klog {
    ($level:expr, $($arg:tt)*) => {{
        $crate::logger::log($level, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kfatal {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::Fatal, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::Error, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::Warn, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::Info, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::Debug, $($arg)*);
    }};
}

#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::Trace, $($arg)*);
    }};
}
