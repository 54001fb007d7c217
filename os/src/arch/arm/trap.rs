//! 异常入口
//!
//! 异常处理不在启动路径上；这里只报告未处理的异常并停机。

use log::error;

const VECTOR_NAMES: [&str; 8] = [
    "reset",
    "undefined instruction",
    "swi",
    "prefetch abort",
    "data abort",
    "reserved",
    "irq",
    "fiq",
];

/// 由 `entry.S` 中的向量桩调用
#[unsafe(no_mangle)]
extern "C" fn arm_unhandled_exception(vector: usize, lr: usize) -> ! {
    let name = VECTOR_NAMES.get(vector).copied().unwrap_or("unknown");
    error!("unhandled {} exception, lr={:#x}", name, lr);
    super::halt()
}
