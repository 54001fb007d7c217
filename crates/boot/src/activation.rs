//! MMU 启用接口
//!
//! 启用顺序与具体指令集无关，必须保持：
//!
//! - cache 与写缓冲在开启地址转换之前打开
//! - 开启地址转换之前无条件失效 I/D cache、排空写缓冲、失效 TLB
//! - 跳转到虚拟地址是一次不返回的调用，其下的栈帧中保存的返回地址仍是物理地址

use mm::config::DOMAIN_ACCESS_KERNEL_ONLY;
use mm::{Paddr, Vaddr};

/// 架构相关的 MMU 启用与执行环境切换操作
///
/// os crate 为目标架构实现此 trait，测试使用记录顺序的 Mock。
pub trait MmuActivation {
    /// 写入一级页表的物理基址
    fn set_ttb(&self, ttb: Paddr);

    /// 写入域访问控制寄存器
    fn set_domain(&self, value: u32);

    /// 打开指令与数据 cache
    fn enable_caches(&self);

    /// 打开写缓冲
    fn enable_write_buffer(&self);

    /// 失效整个 I/D cache
    fn invalidate_cache(&self);

    /// 排空写缓冲
    fn drain_write_buffer(&self);

    /// 失效整个 TLB
    fn invalidate_tlb(&self);

    /// 开启地址转换
    fn enable_mmu(&self);

    /// 将 sp/fp/pc 平移 `offset` 后调用 `entry(arg, displacement)`
    ///
    /// `displacement` 是此后访问原先物理地址上的数据需要加上的偏移；
    /// 在真实硬件上等于 `offset`。
    ///
    /// # Safety
    /// 必须已开启地址转换，且内核镜像（包括当前栈）在 `offset` 处有映射
    unsafe fn enter_virtual(
        &self,
        offset: usize,
        entry: extern "C" fn(usize, usize) -> !,
        arg: usize,
    ) -> !;

    /// 启用高地址异常向量
    fn enable_high_vectors(&self);

    /// 把栈指针切换到 `top` 后调用 `entry(arg)`
    ///
    /// # Safety
    /// `top` 必须指向已映射、足够容纳 `entry` 执行的内存；
    /// 调用后旧栈上的任何引用都不再可用
    unsafe fn switch_stack(&self, top: Vaddr, entry: extern "C" fn(usize) -> !, arg: usize) -> !;

    /// 停机
    fn halt(&self) -> !;
}

/// 启用 MMU 的第 1 至 5 步
///
/// 调用者随后必须立即调用 [`MmuActivation::enter_virtual`]。
pub fn enable_translation<A: MmuActivation + ?Sized>(arch: &A, ttb: Paddr) {
    arch.set_ttb(ttb);
    // 只有内核域按页表权限检查，其余域一律拒绝
    arch.set_domain(DOMAIN_ACCESS_KERNEL_ONLY);

    arch.enable_caches();
    arch.enable_write_buffer();

    arch.invalidate_cache();
    arch.drain_write_buffer();
    arch.invalidate_tlb();
    arch.enable_mmu();
}
