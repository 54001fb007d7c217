//! 体系结构相关的模块
//!
//! 内核只支持 ARMv5（ARM926EJ-S）。`arch/` 外部代码通过这里导出的接口访问硬件，
//! 不直接使用 CP15 寄存器或内联汇编。

#[cfg(not(target_arch = "arm"))]
compile_error!("os 只能为 ARM 目标构建");

#[cfg(target_arch = "arm")]
mod arm;

#[cfg(target_arch = "arm")]
pub use arm::{halt, kernel_layout, mm, ArmMmu};

/// sync crate 的 ArchOps 实现
struct SyncArchOps;

impl sync::ArchOps for SyncArchOps {
    unsafe fn read_and_disable_interrupts(&self) -> usize {
        unsafe { arm::intr::read_and_disable_interrupts() }
    }

    unsafe fn restore_interrupts(&self, flags: usize) {
        unsafe { arm::intr::restore_interrupts(flags) }
    }

    fn interrupts_enabled_in(&self, flags: usize) -> bool {
        arm::intr::irq_enabled_in(flags)
    }
}

/// 全局 ArchOps 实例
static SYNC_ARCH_OPS: SyncArchOps = SyncArchOps;

/// 注册 sync 与 mm 的架构钩子
///
/// # Safety
/// 必须在进入虚拟地址之后、单线程环境下调用
pub unsafe fn init_arch_ops() {
    unsafe {
        sync::register_arch_ops(&SYNC_ARCH_OPS);
        ::mm::register_arch_ops(&arm::mm::ARM_MM_OPS);
    }
}
