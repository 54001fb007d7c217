//! CP15 上的 MMU 启用序列

use core::arch::asm;

use ::mm::config::PGD_ALIGN;
use ::mm::{Paddr, Vaddr};
use bitflags::bitflags;
use boot::MmuActivation;

bitflags! {
    /// CP15 c1 控制寄存器
    #[derive(Debug, Clone, Copy)]
    struct Control: usize {
        /// MMU 使能
        const MMU = 1 << 0;
        /// 数据 cache
        const DCACHE = 1 << 2;
        /// 写缓冲
        const WBUF = 1 << 3;
        /// 指令 cache
        const ICACHE = 1 << 12;
        /// 高地址异常向量
        const HIGH_VECTORS = 1 << 13;
    }
}

#[inline]
fn read_control() -> Control {
    let val: usize;
    // SAFETY: 读取控制寄存器没有副作用
    unsafe { asm!("mrc p15, 0, {0}, c1, c0, 0", out(reg) val, options(nostack, nomem)) };
    Control::from_bits_retain(val)
}

#[inline]
fn set_control_bits(bits: Control) {
    let val = read_control() | bits;
    // SAFETY: 只置位调用者指定的位
    unsafe { asm!("mcr p15, 0, {0}, c1, c0, 0", in(reg) val.bits(), options(nostack)) };
}

/// ARM926EJ-S 的 MMU 操作
#[derive(Debug, Clone, Copy)]
pub struct ArmMmu;

impl MmuActivation for ArmMmu {
    fn set_ttb(&self, ttb: Paddr) {
        debug_assert_eq!(ttb.as_usize() & (PGD_ALIGN - 1), 0);
        // SAFETY: ttb 是 16KB 对齐的一级页表物理地址
        unsafe { asm!("mcr p15, 0, {0}, c2, c0, 0", in(reg) ttb.as_usize(), options(nostack)) };
    }

    fn set_domain(&self, value: u32) {
        // SAFETY: 域访问控制只影响之后的访问检查
        unsafe { asm!("mcr p15, 0, {0}, c3, c0, 0", in(reg) value, options(nostack)) };
    }

    fn enable_caches(&self) {
        set_control_bits(Control::ICACHE | Control::DCACHE);
    }

    fn enable_write_buffer(&self) {
        set_control_bits(Control::WBUF);
    }

    fn invalidate_cache(&self) {
        // SAFETY: 启动期 cache 中没有需要写回的数据
        unsafe { asm!("mcr p15, 0, {0}, c7, c7, 0", in(reg) 0usize, options(nostack)) };
    }

    fn drain_write_buffer(&self) {
        // SAFETY: 等待写缓冲排空
        unsafe { asm!("mcr p15, 0, {0}, c7, c10, 4", in(reg) 0usize, options(nostack)) };
    }

    fn invalidate_tlb(&self) {
        // SAFETY: 失效全部 TLB 项
        unsafe { asm!("mcr p15, 0, {0}, c8, c7, 0", in(reg) 0usize, options(nostack)) };
    }

    fn enable_mmu(&self) {
        let val = (read_control() | Control::MMU).bits();
        // SAFETY: 调用者已装入页表并建立恒等映射；开启后流水线中的两条指令仍按旧地址取指
        unsafe {
            asm!(
                "mcr p15, 0, {0}, c1, c0, 0",
                "nop",
                "nop",
                in(reg) val,
                options(nostack),
            )
        };
    }

    unsafe fn enter_virtual(
        &self,
        offset: usize,
        entry: extern "C" fn(usize, usize) -> !,
        arg: usize,
    ) -> ! {
        // entry 是链接地址，已经是虚拟地址；栈和帧指针平移后旧的物理栈帧仍然可读
        unsafe {
            asm!(
                "add sp, sp, r1",
                "add r11, r11, r1",
                "bx r2",
                in("r0") arg,
                in("r1") offset,
                in("r2") entry as usize,
                options(noreturn),
            )
        }
    }

    fn enable_high_vectors(&self) {
        set_control_bits(Control::HIGH_VECTORS);
    }

    unsafe fn switch_stack(&self, top: Vaddr, entry: extern "C" fn(usize) -> !, arg: usize) -> ! {
        unsafe {
            asm!(
                "mov sp, r1",
                "mov r11, #0",
                "bx r2",
                in("r0") arg,
                in("r1") top.as_usize(),
                in("r2") entry as usize,
                options(noreturn),
            )
        }
    }

    fn halt(&self) -> ! {
        super::halt()
    }
}
