//! Boot-time memory reporting.
//!
//! Nothing here claims memory; the kernel runs entirely inside the 128 MiB
//! the boot trampoline mapped. This module just narrates what the
//! bootloader handed over so a physical allocator has something to start
//! from later.

use multiboot2::{BootInformation, MemoryAreaType};

pub fn log_memory_overview(boot_info: &BootInformation<'_>) {
    if let Some(memmap) = boot_info.memory_map_tag() {
        let areas = memmap.memory_areas();
        crate::kinfo!("[mem] Detected {} memory regions", areas.len());

        for area in areas.iter() {
            let start = area.start_address();
            let end = area.end_address();
            let size_kib = (area.size() / 1024).max(1);

            crate::kinfo!(
                "  - {:#012x} .. {:#012x} ({} KiB, {})",
                start,
                end,
                size_kib,
                classify_area(MemoryAreaType::from(area.typ()))
            );
        }
    } else {
        crate::kwarn!("[mem] No memory map provided by bootloader.");
    }

    let mut any_module = false;
    for module in boot_info.module_tags() {
        if !any_module {
            crate::kinfo!("[mem] Boot modules:");
            any_module = true;
        }

        let name = module.cmdline().unwrap_or("<invalid utf-8>");

        crate::kinfo!(
            "  - {:#010x} .. {:#010x} ({} bytes): {}",
            module.start_address(),
            module.end_address(),
            module.module_size(),
            name
        );
    }

    if !any_module {
        crate::kinfo!("[mem] No boot modules supplied.");
    }
}

fn classify_area(area_type: MemoryAreaType) -> &'static str {
    match area_type {
        MemoryAreaType::Available => "Usable",
        MemoryAreaType::Reserved => "Reserved",
        MemoryAreaType::AcpiAvailable => "ACPI",
        MemoryAreaType::ReservedHibernate => "ACPI NVS",
        MemoryAreaType::Defective => "Defective",
        MemoryAreaType::Custom(_) => "Custom",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_classification_names() {
        assert_eq!(classify_area(MemoryAreaType::Available), "Usable");
        assert_eq!(classify_area(MemoryAreaType::Reserved), "Reserved");
        assert_eq!(classify_area(MemoryAreaType::Custom(42)), "Custom");
    }
}
