/*
 * This build script links the small assembly stubs (multiboot entry, context
 * switch trampoline, interrupt entry thunks) into the kernel and points the
 * linker at the bare-metal linker script.
 */

fn main() {
    println!("cargo:rerun-if-changed=arch/x86/boot.s");
    println!("cargo:rerun-if-changed=arch/x86/context.s");
    println!("cargo:rerun-if-changed=arch/x86/interrupt.s");
    println!("cargo:rerun-if-changed=arch/x86/link.ld");
    cc::Build::new()
        .file("arch/x86/boot.s")
        .file("arch/x86/context.s")
        .file("arch/x86/interrupt.s")
        .compile("boot");
    println!("cargo:rustc-link-arg=-Tarch/x86/link.ld");
    println!("cargo:rustc-link-arg=-nostartfiles");
}
