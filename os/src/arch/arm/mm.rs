//! ARMv5 内存管理钩子
//!
//! 内核镜像与堆位于线性映射区：虚拟地址 = 物理地址 + [`KERNEL_OFFSET`]。

use core::arch::asm;

use mm::ArchMmOps;

use crate::config::KERNEL_OFFSET;

/// 内核线性区的虚拟地址转物理地址
///
/// # Safety
/// `vaddr` 必须位于内核线性映射区
#[inline]
pub const unsafe fn vaddr_to_paddr(vaddr: usize) -> usize {
    vaddr.wrapping_sub(KERNEL_OFFSET)
}

/// 物理地址转内核线性区虚拟地址
#[inline]
pub const fn paddr_to_vaddr(paddr: usize) -> usize {
    paddr.wrapping_add(KERNEL_OFFSET)
}

/// ARMv5 的内存管理操作实现
pub struct ArmMmOps;

impl ArchMmOps for ArmMmOps {
    unsafe fn vaddr_to_paddr(&self, vaddr: usize) -> usize {
        unsafe { vaddr_to_paddr(vaddr) }
    }

    fn paddr_to_vaddr(&self, paddr: usize) -> usize {
        paddr_to_vaddr(paddr)
    }

    fn invalidate_tlb_entry(&self, vaddr: usize) {
        // SAFETY: 失效单个 TLB 项不影响其他状态
        unsafe { asm!("mcr p15, 0, {0}, c8, c7, 1", in(reg) vaddr, options(nostack)) };
    }

    fn invalidate_tlb(&self) {
        // SAFETY: 同上
        unsafe { asm!("mcr p15, 0, {0}, c8, c7, 0", in(reg) 0usize, options(nostack)) };
    }
}

/// 全局实例
pub static ARM_MM_OPS: ArmMmOps = ArmMmOps;
