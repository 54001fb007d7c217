//! 映射相关的 ABI 类型

use bitflags::bitflags;

/// 任务标识
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u32);

impl TaskId {
    /// 内核自身（init 页表）的标识
    pub const KERNEL: TaskId = TaskId(0);
}

bitflags! {
    /// 页映射属性
    ///
    /// 与硬件描述符中的 C/B/AP 位一一对应，由映射引擎翻译为具体的页表项。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MapFlags: u32 {
        /// 可缓存
        const CACHEABLE = 1 << 0;
        /// 写缓冲
        const BUFFERABLE = 1 << 1;
        /// 可写
        const WRITE = 1 << 2;
        /// 用户态可访问
        const USER = 1 << 3;

        /// 用户读写
        const USR_RW = Self::CACHEABLE.bits() | Self::BUFFERABLE.bits()
            | Self::WRITE.bits() | Self::USER.bits();
        /// 用户只读
        const USR_RO = Self::CACHEABLE.bits() | Self::BUFFERABLE.bits() | Self::USER.bits();
        /// 内核读写
        const SVC_RW = Self::CACHEABLE.bits() | Self::BUFFERABLE.bits() | Self::WRITE.bits();
        /// 设备内存：内核读写，不缓存
        const IO_DEFAULT = Self::WRITE.bits();
    }
}

bitflags! {
    /// 用户区间校验时请求的访问权限
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VmFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXEC = 1 << 2;
    }
}
