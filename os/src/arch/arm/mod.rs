//! ARMv5 相关实现

use core::arch::{asm, global_asm};
use core::ptr::addr_of;

use ::mm::Vaddr;
use boot::KernelLayout;

use crate::config::KERNEL_OFFSET;

pub mod intr;
pub mod mm;
mod mmu;
mod trap;

pub use mmu::ArmMmu;

global_asm!(include_str!("entry.S"));

unsafe extern "C" {
    // 链接脚本中定义的符号，均为链接时的虚拟地址
    static _start_kernel: u8;
    static _end_kernel: u8;
    static _start_vectors: u8;
    static _end_vectors: u8;
    static _start_init: u8;
    static _end_init: u8;
}

fn symbol(sym: *const u8) -> Vaddr {
    Vaddr::new(sym as usize)
}

/// 由链接符号构造镜像布局
///
/// 只读取符号的地址（字面量池中的常量），在 MMU 开启前调用也是安全的。
pub fn kernel_layout() -> KernelLayout {
    // SAFETY: 只取地址，不访问内容
    unsafe {
        KernelLayout {
            kernel_offset: KERNEL_OFFSET,
            start_kernel: symbol(addr_of!(_start_kernel)),
            end_kernel: symbol(addr_of!(_end_kernel)),
            vectors_start: symbol(addr_of!(_start_vectors)),
            vectors_end: symbol(addr_of!(_end_vectors)),
            init_start: symbol(addr_of!(_start_init)),
            init_end: symbol(addr_of!(_end_init)),
        }
    }
}

/// 关中断并等待，不再返回
pub fn halt() -> ! {
    // SAFETY: 停机前不再需要恢复中断状态
    unsafe {
        intr::read_and_disable_interrupts();
    }
    loop {
        // ARM926 的 wait-for-interrupt
        unsafe { asm!("mcr p15, 0, {0}, c7, c0, 4", in(reg) 0usize, options(nostack)) };
    }
}
