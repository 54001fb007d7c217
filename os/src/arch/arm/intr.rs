//! CPSR 中断控制

use core::arch::asm;

/// CPSR 中的 IRQ 屏蔽位
const PSR_I_BIT: usize = 1 << 7;
/// CPSR 中的 FIQ 屏蔽位
const PSR_F_BIT: usize = 1 << 6;

/// 读取 CPSR 并屏蔽 IRQ/FIQ，返回原值
///
/// # Safety
/// 返回值必须交给 [`restore_interrupts`]
#[inline]
pub unsafe fn read_and_disable_interrupts() -> usize {
    let cpsr: usize;
    unsafe {
        asm!(
            "mrs {0}, cpsr",
            "orr {1}, {0}, #{mask}",
            "msr cpsr_c, {1}",
            out(reg) cpsr,
            out(reg) _,
            mask = const PSR_I_BIT | PSR_F_BIT,
            options(nostack),
        );
    }
    cpsr
}

/// 恢复 CPSR 控制域
///
/// # Safety
/// `flags` 必须来自 [`read_and_disable_interrupts`]
#[inline]
pub unsafe fn restore_interrupts(flags: usize) {
    unsafe { asm!("msr cpsr_c, {0}", in(reg) flags, options(nostack)) };
}

/// 保存的 CPSR 中 IRQ 是否开启
#[inline]
pub fn irq_enabled_in(flags: usize) -> bool {
    flags & PSR_I_BIT == 0
}
