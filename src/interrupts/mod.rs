//! Interrupt infrastructure.
//!
//! - `vectors`: the 256 per-vector assembly stubs, the shared register
//!   save/restore trampoline and the exported `interrupt_vector_table`.
//! - `handlers`: the single Rust-side dispatcher every vector lands in,
//!   plus the legacy PIC state.
//!
//! This module owns the IDT itself: 256 interrupt gates, each pointing at
//! the corresponding vector-table stub, loaded once during boot.

pub mod handlers;
pub mod vectors;

pub use handlers::{timer_ticks, PICS, PIC_1_OFFSET, PIC_2_OFFSET};
pub use vectors::InterruptFrame;

use core::cell::UnsafeCell;

/// Interrupt gate, present, DPL 0. Interrupts are re-enabled only by an
/// explicit `sti` in the handler, never implicitly.
const GATE_INTERRUPT_DPL0: u8 = 0x8E;

/// One IDT gate descriptor. Field order and widths are architectural.
#[derive(Clone, Copy)]
#[repr(C)]
struct IdtEntry {
    offset_low: u16,
    selector: u16,
    ist: u8,
    type_attributes: u8,
    offset_mid: u16,
    offset_high: u32,
    reserved: u32,
}

impl IdtEntry {
    const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            ist: 0,
            type_attributes: 0,
            offset_mid: 0,
            offset_high: 0,
            reserved: 0,
        }
    }

    fn set_handler(&mut self, handler: u64, selector: u16, ist: u8) {
        self.offset_low = handler as u16;
        self.selector = selector;
        self.ist = ist;
        self.type_attributes = GATE_INTERRUPT_DPL0;
        self.offset_mid = (handler >> 16) as u16;
        self.offset_high = (handler >> 32) as u32;
        self.reserved = 0;
    }
}

#[repr(align(16))]
struct IdtHolder(UnsafeCell<[IdtEntry; 256]>);

// Written once during init_interrupts with interrupts disabled, read only
// by the CPU afterwards.
unsafe impl Sync for IdtHolder {}

static IDT: IdtHolder = IdtHolder(UnsafeCell::new([IdtEntry::missing(); 256]));

#[cfg(target_os = "none")]
static IDT_INITIALIZED: core::sync::atomic::AtomicBool =
    core::sync::atomic::AtomicBool::new(false);

/// Builds the IDT from `interrupt_vector_table`, programs the PICs and
/// loads the table. Must run after [`crate::gdt::init`]; leaves interrupts
/// disabled for the caller to enable.
#[cfg(target_os = "none")]
pub fn init_interrupts() {
    use core::mem::size_of;
    use core::sync::atomic::Ordering;

    use x86_64::instructions::port::Port;
    use x86_64::structures::DescriptorTablePointer;
    use x86_64::VirtAddr;

    x86_64::instructions::interrupts::disable();

    if IDT_INITIALIZED.swap(true, Ordering::SeqCst) {
        crate::kwarn!("init_interrupts: already initialized, skipping");
        return;
    }

    // Mask everything while the PICs are reprogrammed.
    unsafe {
        Port::<u8>::new(0x21).write(0xFFu8);
        Port::<u8>::new(0xA1).write(0xFFu8);
        PICS.lock().initialize();
    }

    let code_selector = crate::gdt::selectors().code_selector;
    let double_fault_ist = crate::gdt::DOUBLE_FAULT_IST_INDEX as u8 + 1;

    let idt = unsafe { &mut *IDT.0.get() };
    for (vector, &stub) in vectors::vector_table().iter().enumerate() {
        // A double fault must run on a known-good stack.
        let ist = if vector == 8 { double_fault_ist } else { 0 };
        idt[vector].set_handler(stub, code_selector.0, ist);
    }

    let pointer = DescriptorTablePointer {
        limit: (size_of::<[IdtEntry; 256]>() - 1) as u16,
        base: VirtAddr::new(IDT.0.get() as u64),
    };
    unsafe {
        x86_64::instructions::tables::lidt(&pointer);
    }

    // Unmask the timer and keyboard lines; everything else stays masked
    // until a driver asks for it.
    unsafe {
        PICS.lock().write_masks(0b1111_1100, 0b1111_1111);
    }

    crate::kinfo!(
        "IDT loaded: 256 gates -> interrupt_vector_table, selector {:#x}",
        code_selector.0
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::size_of;

    #[test]
    fn gate_descriptor_is_16_bytes() {
        assert_eq!(size_of::<IdtEntry>(), 16);
        assert_eq!(size_of::<[IdtEntry; 256]>() - 1, 4095);
    }

    #[test]
    fn gate_encoding_splits_the_handler_address() {
        let mut entry = IdtEntry::missing();
        entry.set_handler(0xFFFF_FFFF_8012_3456, 0x08, 1);
        assert_eq!(entry.offset_low, 0x3456);
        assert_eq!(entry.offset_mid, 0x8012);
        assert_eq!(entry.offset_high, 0xFFFF_FFFF);
        assert_eq!(entry.selector, 0x08);
        assert_eq!(entry.ist, 1);
        assert_eq!(entry.type_attributes, 0x8E);
    }

    #[test]
    fn missing_gate_is_not_present() {
        let entry = IdtEntry::missing();
        assert_eq!(entry.type_attributes & 0x80, 0);
    }
}
