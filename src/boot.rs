//! Boot entry: Multiboot2 header and the long-mode trampoline.
//!
//! The real work lives in `boot.S`: the Multiboot2 header the bootloader
//! scans for, the 32-bit `entry` code that validates the handoff and checks
//! for PAE + long mode, the four-frame boot page-table build (identity and
//! high-half views share one PDT), the CR3/CR4.PAE/EFER.LME/CR0.PG
//! activation sequence, and the far jump into 64-bit code that sets up the
//! boot stack and jumps to `kernel_main`.
//!
//! Bootloader failures are reported from 32-bit code straight into the VGA
//! text buffer, since neither paging nor any console driver exists yet.

#[cfg(target_os = "none")]
core::arch::global_asm!(include_str!("boot.S"), options(att_syntax));

/// Logs and sanity-checks the machine state the trampoline is contracted
/// to leave behind: paging on with PAE and long mode, CR3 pointing at the
/// boot PML4, and the identity/high-half alias in place.
#[cfg(target_os = "none")]
pub fn log_long_mode_state() {
    use x86_64::registers::control::{Cr0, Cr0Flags, Cr3, Cr4, Cr4Flags};
    use x86_64::registers::model_specific::{Efer, EferFlags};

    use crate::memory_layout::{
        boot_page_tables_phys, physical2virtual, stack_range, VGA_BUFFER_PHYS,
    };
    use crate::{kdebug, kinfo, kwarn};

    let paging = Cr0::read().contains(Cr0Flags::PAGING);
    let pae = Cr4::read().contains(Cr4Flags::PHYSICAL_ADDRESS_EXTENSION);
    let long_mode = Efer::read().contains(EferFlags::LONG_MODE_ENABLE);
    kinfo!(
        "[boot] CR0.PG={} CR4.PAE={} EFER.LME={}",
        paging as u8,
        pae as u8,
        long_mode as u8
    );
    if !(paging && pae && long_mode) {
        kwarn!("[boot] unexpected long-mode state left by the trampoline");
    }

    let cr3 = Cr3::read().0.start_address().as_u64();
    let expected = boot_page_tables_phys();
    if cr3 == expected {
        kdebug!("[boot] CR3 -> boot page tables at {:#x}", cr3);
    } else {
        kwarn!(
            "[boot] CR3 is {:#x}, expected boot page tables at {:#x}",
            cr3,
            expected
        );
    }

    // Both views of the boot mapping must alias the same physical bytes.
    let identity = unsafe { core::ptr::read_volatile(VGA_BUFFER_PHYS as usize as *const u8) };
    let high_half = unsafe {
        core::ptr::read_volatile(physical2virtual(VGA_BUFFER_PHYS) as usize as *const u8)
    };
    if identity == high_half {
        kdebug!("[boot] identity/high-half alias verified");
    } else {
        kwarn!("[boot] identity and high-half mappings disagree");
    }

    let (stack_base, stack_end) = stack_range();
    kdebug!("[boot] boot stack {:#x}..{:#x}", stack_base, stack_end);
}
