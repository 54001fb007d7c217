//! 自旋锁封装
//!
//! 提供对数据的互斥访问。SpinLock 不可重入，持锁期间本地中断关闭，
//! 因此持锁时应避免长时间运行的操作。

use crate::raw_spin_lock::RawSpinLock;

/// 提供对数据的互斥访问的自旋锁
///
/// # 示例
/// ```ignore
/// let lock = SpinLock::new(0);
/// {
///     let mut guard = lock.lock();
///     *guard += 1;
/// }
/// ```
pub type SpinLock<T> = lock_api::Mutex<RawSpinLock, T>;

/// SpinLock 的 RAII 保护器
pub type SpinLockGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;
