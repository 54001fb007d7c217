//! 内存管理相关操作的 Mock 实现
//!
//! 默认实现采用“恒等映射”（vaddr == paddr），TLB 维护只计数。

use core::sync::atomic::{AtomicUsize, Ordering};

/// Mock 的内存管理架构操作
pub struct MockMmOps {
    tlb_entry_flushes: AtomicUsize,
    tlb_full_flushes: AtomicUsize,
}

impl MockMmOps {
    pub const fn new() -> Self {
        Self {
            tlb_entry_flushes: AtomicUsize::new(0),
            tlb_full_flushes: AtomicUsize::new(0),
        }
    }

    /// # Safety
    /// 仅用于测试环境的可控输入。
    pub unsafe fn vaddr_to_paddr(&self, vaddr: usize) -> usize {
        vaddr
    }

    pub fn paddr_to_vaddr(&self, paddr: usize) -> usize {
        paddr
    }

    pub fn invalidate_tlb_entry(&self, _vaddr: usize) {
        self.tlb_entry_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn invalidate_tlb(&self) {
        self.tlb_full_flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// 单条 TLB 失效次数（全局累计，测试只应比较增量）
    pub fn tlb_entry_flushes(&self) -> usize {
        self.tlb_entry_flushes.load(Ordering::Relaxed)
    }

    pub fn tlb_full_flushes(&self) -> usize {
        self.tlb_full_flushes.load(Ordering::Relaxed)
    }
}

/// 全局 Mock 实例
pub static MOCK_MM_OPS: MockMmOps = MockMmOps::new();
