//! Codezero-rs 内核镜像
//!
//! ARMv5（ARM926EJ-S，Versatile PB 平台）上的微内核入口。启动逻辑在 `boot` crate 中，
//! 这里提供硬件相关的部分：
//!
//! - `arch`：CP15 操作、异常向量、系统调用页、架构钩子
//! - `console` / `log`：PL011 串口与 `log` 后端
//! - `mm`：init 页表、KIP、内核堆
//! - `kernel`：平台、资源和调度器这几个启动协作者

#![no_std]
#![no_main]

extern crate alloc;

mod arch;
mod config;
#[macro_use]
mod console;
mod kernel;
mod log;
mod mm;

use core::panic::PanicInfo;

use boot::{BootContext, BootTables, BuildInfo};

/// 构建信息，日期和时间由构建脚本生成
const BUILD: BuildInfo = BuildInfo {
    name: "codezero",
    version: 0,
    subversion: 3,
    date: env!("KERNEL_BUILD_DATE"),
    time: env!("KERNEL_BUILD_TIME"),
};

/// Rust 内核主入口点
///
/// 由 `entry.S` 在物理地址上调用：此时 MMU 关闭，只有栈和显式转换成物理地址的指针可用。
///
/// # Safety
///
/// 此函数标记为 `#[unsafe(no_mangle)]` 以确保链接器可以找到它。
/// 它必须从正确初始化的汇编入口点调用，且只调用一次。
#[unsafe(no_mangle)]
pub extern "C" fn rust_main() -> ! {
    let layout = arch::kernel_layout();
    let tables = BootTables {
        pgd: mm::init_pgd_phys(&layout),
        kip: mm::kip_virt(),
    };

    // SAFETY: init 页表和 KIP 只在这里交给启动上下文；pgd 是物理地址，MMU 尚未开启
    let ctx = unsafe {
        BootContext::new(
            arch::ArmMmu,
            layout,
            BUILD,
            tables,
            kernel::Pb926::new(),
            kernel::BootResources::new(),
            kernel::Idle::new(),
        )
    };
    ctx.start_kernel()
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    if let Some(location) = info.location() {
        earlyprintln!(
            "Panicked at {}:{} {}",
            location.file(),
            location.line(),
            info.message()
        );
    } else {
        earlyprintln!("Panicked: {}", info.message());
    }

    arch::halt()
}
