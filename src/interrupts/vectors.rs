//! Per-vector interrupt stubs, the shared save/restore trampoline and the
//! exported vector table.
//!
//! Every one of the 256 vectors gets its own 16-byte-aligned stub. The CPU
//! pushes an error code for vectors 8, 10-14 and 17; every other stub pushes
//! a literal 0 so the stack shape is uniform. Each stub then pushes its
//! vector number and jumps to `interrupt_vector_common`, which completes the
//! [`InterruptFrame`] by saving all general-purpose registers, the debug
//! registers and the segment selectors, and calls
//! `rust_interrupt_handler_for_all_state` with the frame address in RDI.
//!
//! The restore path is the strict mirror image of the save path, so a
//! handler that leaves the frame alone resumes the interrupted context
//! bit-identically. The trampoline only ever touches the current stack,
//! which is what makes nested interrupts safe without any bookkeeping here.
//!
//! `interrupt_vector_table` lives in `.rodata`: 256 quadwords, one stub
//! address per vector, consumed by the IDT build in `init_interrupts`.

#[cfg(target_os = "none")]
core::arch::global_asm!(
    r#"
    .intel_syntax noprefix
    .text
    .code64

interrupt_vector_common:
    push r15
    push r14
    push r13
    push r12
    push r11
    push r10
    push r9
    push r8
    push rbp
    push rdi
    push rsi
    push rdx
    push rcx
    push rbx
    push rax

    // Debug registers move through RAX; DR4/DR5 are aliases and are left
    // alone on purpose.
    mov rax, dr7
    push rax
    mov rax, dr6
    push rax
    mov rax, dr3
    push rax
    mov rax, dr2
    push rax
    mov rax, dr1
    push rax
    mov rax, dr0
    push rax

    // Segment selectors, zero-extended to 64 bits.
    mov rax, gs
    push rax
    mov rax, fs
    push rax
    mov rax, es
    push rax
    mov rax, ds
    push rax

    mov rdi, rsp
    call rust_interrupt_handler_for_all_state

    pop rax
    mov ds, ax
    pop rax
    mov es, ax
    pop rax
    mov fs, ax
    pop rax
    mov gs, ax

    pop rax
    mov dr0, rax
    pop rax
    mov dr1, rax
    pop rax
    mov dr2, rax
    pop rax
    mov dr3, rax
    pop rax
    mov dr6, rax
    pop rax
    mov dr7, rax

    pop rax
    pop rbx
    pop rcx
    pop rdx
    pop rsi
    pop rdi
    pop rbp
    pop r8
    pop r9
    pop r10
    pop r11
    pop r12
    pop r13
    pop r14
    pop r15

    // Drop the vector number and error code.
    add rsp, 16
    iretq

    // One stub per vector. Vectors with a CPU-supplied error code must not
    // push a synthetic one.
    .macro define_interrupt_vector num
    .align 16
interrupt_vector_\num:
    .if \num == 8
    .elseif \num == 10
    .elseif \num == 11
    .elseif \num == 12
    .elseif \num == 13
    .elseif \num == 14
    .elseif \num == 17
    .else
    push 0
    .endif
    push \num
    jmp interrupt_vector_common
    .endm

    .altmacro
    .set vector_number, 0
    .rept 256
    define_interrupt_vector %vector_number
    .set vector_number, vector_number + 1
    .endr
    .noaltmacro

    .section .rodata
    .macro vector_table_entry num
    .quad interrupt_vector_\num
    .endm

    .global interrupt_vector_table
    .align 8
interrupt_vector_table:
    .altmacro
    .set vector_number, 0
    .rept 256
    vector_table_entry %vector_number
    .set vector_number, vector_number + 1
    .endr
    .noaltmacro
    .text
"#
);

/// Vectors for which the CPU itself pushes an error code.
pub const ERROR_CODE_VECTORS: [u8; 7] = [8, 10, 11, 12, 13, 14, 17];

pub fn has_error_code(vector: u8) -> bool {
    ERROR_CODE_VECTORS.contains(&vector)
}

/// The stub addresses, in vector order, for IDT population.
#[cfg(target_os = "none")]
pub fn vector_table() -> &'static [u64; 256] {
    extern "C" {
        static interrupt_vector_table: [u64; 256];
    }
    unsafe { &interrupt_vector_table }
}

/// The complete register snapshot every interrupt path presents to
/// `rust_interrupt_handler_for_all_state`, lowest address first. The layout
/// mirrors the push sequence above exactly: segment selectors, debug
/// registers, general-purpose registers, then the vector number, error code
/// and hardware-pushed interrupt frame.
///
/// Handlers may mutate any slot; the trampoline restores whatever is in the
/// frame, so a write to `rax` (or even `rip`) is visible in the resumed
/// context. CR2 is intentionally not part of the frame; a page-fault
/// handler reads it directly before it can fault again.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct InterruptFrame {
    pub ds: u64,
    pub es: u64,
    pub fs: u64,
    pub gs: u64,
    pub dr0: u64,
    pub dr1: u64,
    pub dr2: u64,
    pub dr3: u64,
    pub dr6: u64,
    pub dr7: u64,
    pub rax: u64,
    pub rbx: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rsi: u64,
    pub rdi: u64,
    pub rbp: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub vector: u64,
    pub error_code: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{offset_of, size_of};

    #[test]
    fn frame_is_31_saved_slots_plus_ss() {
        // 4 segments + 6 debug + 15 GPRs + vector + error code + 5 hardware.
        assert_eq!(size_of::<InterruptFrame>(), 32 * 8);
    }

    #[test]
    fn frame_offsets_match_push_order() {
        assert_eq!(offset_of!(InterruptFrame, ds), 0);
        assert_eq!(offset_of!(InterruptFrame, gs), 24);
        assert_eq!(offset_of!(InterruptFrame, dr0), 32);
        assert_eq!(offset_of!(InterruptFrame, dr7), 72);
        assert_eq!(offset_of!(InterruptFrame, rax), 80);
        assert_eq!(offset_of!(InterruptFrame, rbp), 128);
        assert_eq!(offset_of!(InterruptFrame, r8), 136);
        assert_eq!(offset_of!(InterruptFrame, r15), 192);
        assert_eq!(offset_of!(InterruptFrame, vector), 200);
        assert_eq!(offset_of!(InterruptFrame, error_code), 208);
        assert_eq!(offset_of!(InterruptFrame, rip), 216);
        assert_eq!(offset_of!(InterruptFrame, ss), 248);
    }

    #[test]
    fn saved_state_keeps_call_alignment() {
        // The hardware frame plus error code and vector is 56 bytes; the
        // trampoline pushes 25 more quadwords. RSP is 16-byte aligned at
        // interrupt delivery, so it must be aligned again at the call.
        let pushed = 56 + 25 * 8;
        assert_eq!(size_of::<InterruptFrame>(), pushed);
        assert_eq!(pushed % 16, 0);
    }

    #[test]
    fn error_code_vectors_match_hardware() {
        for vector in 0..=255u8 {
            let expected = matches!(vector, 8 | 10 | 11 | 12 | 13 | 14 | 17);
            assert_eq!(has_error_code(vector), expected, "vector {vector}");
        }
    }
}
