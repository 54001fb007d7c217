//! 内存管理配置常量
//!
//! 对应 ARMv5 两级页表：一级表 4096 项，每项覆盖 1MB（段）；
//! 二级粗页表 256 项，每项覆盖 4KB（小页）。

/// 页大小的位移
pub const PAGE_SHIFT: usize = 12;
/// 页大小（4KB）
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
/// 页内偏移掩码
pub const PAGE_MASK: usize = PAGE_SIZE - 1;

/// 段大小的位移
pub const SECTION_SHIFT: usize = 20;
/// 段大小（1MB）
pub const SECTION_SIZE: usize = 1 << SECTION_SHIFT;
/// 段内偏移掩码
pub const SECTION_MASK: usize = SECTION_SIZE - 1;

/// 一级页表项数
pub const PGD_ENTRIES: usize = 4096;
/// 二级（粗）页表项数
pub const PMD_ENTRIES: usize = 256;

/// 一级页表的硬件对齐要求（16KB）
pub const PGD_ALIGN: usize = 16 * 1024;
/// 二级页表的硬件对齐要求（1KB）
pub const PMD_ALIGN: usize = 1024;

/// 栈指针对齐
pub const STACK_ALIGNMENT: usize = 8;

/// 内核使用的访问域编号
pub const KERNEL_DOMAIN: usize = 0;
/// 域访问控制寄存器的值：仅内核域为 client（按页表权限检查），其余域无访问权
pub const DOMAIN_ACCESS_KERNEL_ONLY: u32 = 0b01 << (2 * KERNEL_DOMAIN);
