//! 固定的用户可见虚拟地址

/// KIP 在每个用户地址空间中的只读映射地址
pub const USER_KIP_PAGE: usize = 0xFF00_0000;

/// KIP 内指向 UTCB 段起始地址的字段偏移
pub const UTCB_KIP_OFFSET: usize = 0xFF0;

/// ARM 高端异常向量页
pub const ARM_HIGH_VECTOR: usize = 0xFFFF_0000;

/// 系统调用入口页
pub const ARM_SYSCALL_PAGE: usize = 0xFFFF_F000;

/// 系统调用入口之间的间隔（每个入口一条指令）
pub const SYSCALL_ENTRY_STRIDE: u32 = 4;
