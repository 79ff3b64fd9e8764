//! Runtime Global Descriptor Table.
//!
//! The boot trampoline runs on a throwaway three-entry GDT that exists only
//! to reach 64-bit mode. This module installs the kernel's real GDT: kernel
//! code and data segments plus a TSS whose interrupt stack table gives the
//! double-fault handler a known-good stack.

use lazy_static::lazy_static;
use x86_64::instructions::segmentation::{Segment, CS, DS, ES, SS};
use x86_64::instructions::tables::load_tss;
use x86_64::structures::gdt::{Descriptor, GlobalDescriptorTable, SegmentSelector};
use x86_64::structures::tss::TaskStateSegment;
use x86_64::VirtAddr;

/// IST slot used by the double-fault gate.
pub const DOUBLE_FAULT_IST_INDEX: u16 = 0;

const IST_STACK_SIZE: usize = 4096 * 5;

pub struct Selectors {
    pub code_selector: SegmentSelector,
    pub data_selector: SegmentSelector,
    pub tss_selector: SegmentSelector,
}

lazy_static! {
    static ref TSS: TaskStateSegment = {
        let mut tss = TaskStateSegment::new();
        tss.interrupt_stack_table[DOUBLE_FAULT_IST_INDEX as usize] = {
            #[repr(align(16))]
            struct IstStack([u8; IST_STACK_SIZE]);
            static mut STACK: IstStack = IstStack([0; IST_STACK_SIZE]);
            let base = VirtAddr::from_ptr(unsafe { &raw const STACK });
            base + IST_STACK_SIZE as u64
        };
        tss
    };
    static ref GDT: (GlobalDescriptorTable, Selectors) = {
        let mut gdt = GlobalDescriptorTable::new();
        let code_selector = gdt.append(Descriptor::kernel_code_segment());
        let data_selector = gdt.append(Descriptor::kernel_data_segment());
        let tss_selector = gdt.append(Descriptor::tss_segment(&TSS));
        (
            gdt,
            Selectors {
                code_selector,
                data_selector,
                tss_selector,
            },
        )
    };
}

pub fn selectors() -> &'static Selectors {
    &GDT.1
}

/// Loads the GDT and reloads every segment register plus the task register.
/// Must run before the IDT is installed so the double-fault IST is valid.
pub fn init() {
    GDT.0.load();
    unsafe {
        CS::set_reg(GDT.1.code_selector);
        DS::set_reg(GDT.1.data_selector);
        ES::set_reg(GDT.1.data_selector);
        SS::set_reg(GDT.1.data_selector);
        load_tss(GDT.1.tss_selector);
    }
    crate::kinfo!(
        "GDT loaded: code={:#x} data={:#x} tss={:#x}",
        GDT.1.code_selector.0,
        GDT.1.data_selector.0,
        GDT.1.tss_selector.0
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_follow_descriptor_order() {
        // Null descriptor first, then code, data, and the 16-byte TSS.
        let s = selectors();
        assert_eq!(s.code_selector.0, 0x08);
        assert_eq!(s.data_selector.0, 0x10);
        assert_eq!(s.tss_selector.0, 0x18);
    }

    #[test]
    fn double_fault_stack_is_installed() {
        let ist = TSS.interrupt_stack_table[DOUBLE_FAULT_IST_INDEX as usize];
        assert_ne!(ist, VirtAddr::zero());
        assert_eq!(ist.as_u64() % 16, 0);
    }
}
