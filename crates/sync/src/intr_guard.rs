//! 中断保护器
//!
//! 基于 RAII 实现中断保护，在创建时禁用中断，销毁时恢复。

use crate::arch_ops;

/// 读取并关闭本地中断；未注册架构实现时返回 0
#[inline]
pub(crate) fn save_and_disable() -> usize {
    match arch_ops() {
        // SAFETY: 返回值只会交给配对的 restore 使用
        Some(ops) => unsafe { ops.read_and_disable_interrupts() },
        None => 0,
    }
}

/// 恢复 [`save_and_disable`] 保存的中断状态
#[inline]
pub(crate) fn restore(flags: usize) {
    if let Some(ops) = arch_ops() {
        // SAFETY: flags 来自配对的 save_and_disable
        unsafe { ops.restore_interrupts(flags) }
    }
}

/// 中断保护器
///
/// 在创建时禁用中断并保存之前的状态；在销毁时自动恢复之前的中断状态。
///
/// # 示例
/// ```ignore
/// {
///     let _guard = IntrGuard::new(); // 禁用中断
///     // 临界区代码
/// } // 离开作用域，自动恢复中断状态
/// ```
pub struct IntrGuard {
    flags: usize,
}

impl IntrGuard {
    /// 禁用中断并返回保护器
    pub fn new() -> Self {
        IntrGuard {
            flags: save_and_disable(),
        }
    }

    /// 进入临界区前中断是否处于开启状态
    pub fn was_enabled(&self) -> bool {
        arch_ops().is_some_and(|ops| ops.interrupts_enabled_in(self.flags))
    }
}

impl Default for IntrGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IntrGuard {
    fn drop(&mut self) {
        restore(self.flags);
    }
}
