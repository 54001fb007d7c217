//! 中断控制的 Mock 实现

use core::hint;
use core::sync::atomic::{AtomicBool, Ordering};

/// Mock 架构操作
pub struct MockArchOps {
    interrupt_state: AtomicBool,
    busy: AtomicBool,
}

impl MockArchOps {
    pub const fn new() -> Self {
        Self {
            interrupt_state: AtomicBool::new(true),
            busy: AtomicBool::new(false),
        }
    }

    pub unsafe fn read_and_disable_interrupts(&self) -> usize {
        self.interrupt_state.swap(false, Ordering::SeqCst) as usize
    }

    pub unsafe fn restore_interrupts(&self, flags: usize) {
        self.interrupt_state.store(flags != 0, Ordering::SeqCst);
    }

    pub fn interrupts_enabled_in(&self, flags: usize) -> bool {
        flags != 0
    }

    /// 当前（模拟的）中断状态
    pub fn interrupts_on(&self) -> bool {
        self.interrupt_state.load(Ordering::SeqCst)
    }

    pub fn set_interrupts(&self, on: bool) {
        self.interrupt_state.store(on, Ordering::SeqCst);
    }

    /// 串行化观察全局中断状态的测试
    pub fn serialize(&self) -> SerialGuard<'_> {
        while self
            .busy
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            hint::spin_loop();
        }
        SerialGuard { owner: self }
    }
}

/// [`MockArchOps::serialize`] 返回的守卫
pub struct SerialGuard<'a> {
    owner: &'a MockArchOps,
}

impl Drop for SerialGuard<'_> {
    fn drop(&mut self) {
        self.owner.busy.store(false, Ordering::Release);
    }
}

/// 全局 Mock 实例
pub static MOCK_ARCH_OPS: MockArchOps = MockArchOps::new();
