use std::env;

fn main() {
    println!("cargo:rerun-if-changed=src/boot.S");
    println!("cargo:rerun-if-changed=linker.ld");

    // The linker script shapes the freestanding kernel image only; host
    // builds (unit tests) must link normally.
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "none" {
        let manifest_dir =
            env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
        println!("cargo:rustc-link-arg=-T{}/linker.ld", manifest_dir);
    }
}
