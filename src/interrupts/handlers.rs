//! The uniform interrupt handler.
//!
//! Every vector funnels through the assembly trampoline into
//! [`rust_interrupt_handler_for_all_state`], which dispatches on the saved
//! vector number: CPU exceptions are logged (and are fatal unless they are
//! explicitly resumable), PIC interrupts get acknowledged, and anything else
//! is reported as unexpected.

use core::sync::atomic::{AtomicU64, Ordering};

use pic8259::ChainedPics;
use x86_64::instructions::port::Port;
use x86_64::registers::control::Cr2;
use x86_64::structures::idt::PageFaultErrorCode;

use crate::interrupts::vectors::{has_error_code, InterruptFrame};
use crate::{kerror, kfatal, kinfo, ktrace, kwarn};

/// The legacy PICs are remapped above the CPU exception range.
pub const PIC_1_OFFSET: u8 = 32;
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

pub static PICS: spin::Mutex<ChainedPics> =
    spin::Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

static TIMER_TICKS: AtomicU64 = AtomicU64::new(0);

pub fn timer_ticks() -> u64 {
    TIMER_TICKS.load(Ordering::Relaxed)
}

const EXCEPTION_NAMES: [&str; 32] = [
    "Divide Error",
    "Debug",
    "Non-Maskable Interrupt",
    "Breakpoint",
    "Overflow",
    "BOUND Range Exceeded",
    "Invalid Opcode",
    "Device Not Available",
    "Double Fault",
    "Coprocessor Segment Overrun",
    "Invalid TSS",
    "Segment Not Present",
    "Stack-Segment Fault",
    "General Protection Fault",
    "Page Fault",
    "Reserved (15)",
    "x87 Floating-Point Error",
    "Alignment Check",
    "Machine Check",
    "SIMD Floating-Point Exception",
    "Virtualization Exception",
    "Control Protection Exception",
    "Reserved (22)",
    "Reserved (23)",
    "Reserved (24)",
    "Reserved (25)",
    "Reserved (26)",
    "Reserved (27)",
    "Hypervisor Injection Exception",
    "VMM Communication Exception",
    "Security Exception",
    "Reserved (31)",
];

pub fn exception_name(vector: u8) -> &'static str {
    EXCEPTION_NAMES.get(vector as usize).copied().unwrap_or("Not an exception")
}

/// Single entry point for all 256 vectors; called by the assembly
/// trampoline with the frame address in RDI. Mutations of the frame are
/// restored into the interrupted context.
#[no_mangle]
pub extern "C" fn rust_interrupt_handler_for_all_state(frame: &mut InterruptFrame) {
    let vector = frame.vector as u8;
    match vector {
        3 => breakpoint(frame),
        8 => double_fault(frame),
        14 => page_fault(frame),
        0..=31 => fatal_exception(frame),
        32..=47 => pic_interrupt(frame),
        _ => kwarn!(
            "Unexpected interrupt vector {} at rip={:#x}",
            vector,
            frame.rip
        ),
    }
}

fn breakpoint(frame: &mut InterruptFrame) {
    kinfo!("BREAKPOINT at {:#x}; resuming", frame.rip);
}

fn double_fault(frame: &mut InterruptFrame) -> ! {
    // Running on the dedicated IST stack; the interrupted stack may be gone.
    kfatal!("DOUBLE FAULT at {:#x}", frame.rip);
    log_frame(frame);
    crate::halt_loop()
}

fn page_fault(frame: &mut InterruptFrame) {
    // CR2 is not part of the saved frame and must be read before anything
    // here can fault again.
    let fault_addr = Cr2::read().map(|addr| addr.as_u64()).unwrap_or(0);
    kerror!(
        "PAGE FAULT at {:#x} accessing {:#x} ({:?})",
        frame.rip,
        fault_addr,
        PageFaultErrorCode::from_bits_truncate(frame.error_code)
    );
    log_frame(frame);
    panic!("unhandled page fault at {:#x}", fault_addr);
}

fn fatal_exception(frame: &mut InterruptFrame) {
    let vector = frame.vector as u8;
    if has_error_code(vector) {
        kerror!(
            "EXCEPTION {} ({}) error_code={:#x} at {:#x}",
            vector,
            exception_name(vector),
            frame.error_code,
            frame.rip
        );
    } else {
        kerror!(
            "EXCEPTION {} ({}) at {:#x}",
            vector,
            exception_name(vector),
            frame.rip
        );
    }
    log_frame(frame);
    panic!("unhandled CPU exception {}", vector);
}

fn pic_interrupt(frame: &mut InterruptFrame) {
    let vector = frame.vector as u8;
    match vector {
        v if v == PIC_1_OFFSET => {
            TIMER_TICKS.fetch_add(1, Ordering::Relaxed);
        }
        v if v == PIC_1_OFFSET + 1 => {
            // Drain the controller so the keyboard keeps interrupting.
            let scancode: u8 = unsafe { Port::new(0x60).read() };
            ktrace!("keyboard scancode {:#04x}", scancode);
        }
        _ => ktrace!("IRQ vector {}", vector),
    }

    unsafe {
        PICS.lock().notify_end_of_interrupt(vector);
    }
}

fn log_frame(frame: &InterruptFrame) {
    kerror!(
        "  rax={:#018x} rbx={:#018x} rcx={:#018x} rdx={:#018x}",
        frame.rax,
        frame.rbx,
        frame.rcx,
        frame.rdx
    );
    kerror!(
        "  rsi={:#018x} rdi={:#018x} rbp={:#018x} rsp={:#018x}",
        frame.rsi,
        frame.rdi,
        frame.rbp,
        frame.rsp
    );
    kerror!(
        "  r8 ={:#018x} r9 ={:#018x} r10={:#018x} r11={:#018x}",
        frame.r8,
        frame.r9,
        frame.r10,
        frame.r11
    );
    kerror!(
        "  r12={:#018x} r13={:#018x} r14={:#018x} r15={:#018x}",
        frame.r12,
        frame.r13,
        frame.r14,
        frame.r15
    );
    kerror!(
        "  rip={:#018x} rflags={:#010x} cs={:#x} ss={:#x} ds={:#x} es={:#x} fs={:#x} gs={:#x}",
        frame.rip,
        frame.rflags,
        frame.cs,
        frame.ss,
        frame.ds,
        frame.es,
        frame.fs,
        frame.gs
    );
    kerror!(
        "  dr0={:#x} dr1={:#x} dr2={:#x} dr3={:#x} dr6={:#x} dr7={:#x}",
        frame.dr0,
        frame.dr1,
        frame.dr2,
        frame.dr3,
        frame.dr6,
        frame.dr7
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_names_cover_the_architectural_range() {
        assert_eq!(exception_name(0), "Divide Error");
        assert_eq!(exception_name(8), "Double Fault");
        assert_eq!(exception_name(14), "Page Fault");
        assert_eq!(exception_name(31), "Reserved (31)");
        assert_eq!(exception_name(32), "Not an exception");
        assert_eq!(exception_name(255), "Not an exception");
    }

    #[test]
    fn pic_vectors_sit_above_the_exceptions() {
        assert_eq!(PIC_1_OFFSET, 32);
        assert_eq!(PIC_2_OFFSET, 40);
        assert!(PIC_1_OFFSET >= 32);
    }
}
