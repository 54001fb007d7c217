//! 生成构建日期和时间（写入 KIP），并为 ARM 目标指定链接脚本

use chrono::Local;

fn main() {
    let now = Local::now();
    // 与 C 预处理器的 __DATE__/__TIME__ 格式一致
    println!("cargo:rustc-env=KERNEL_BUILD_DATE={}", now.format("%b %e %Y"));
    println!("cargo:rustc-env=KERNEL_BUILD_TIME={}", now.format("%H:%M:%S"));

    let target = std::env::var("TARGET").unwrap_or_default();
    if target.starts_with("arm") {
        let manifest = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_default();
        println!("cargo:rustc-link-arg=-T{manifest}/src/arch/arm/linker.ld");
    }
    // 源码有任何改动都重新生成构建时间
    println!("cargo:rerun-if-changed=src");
}
