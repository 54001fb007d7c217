//! 平台与镜像配置

/// 内核虚拟地址减物理地址
pub const KERNEL_OFFSET: usize = 0xF000_0000;

/// PL011 UART0 物理地址
pub const UART0_PHYS: usize = 0x101F_1000;
/// UART0 在内核地址空间中的虚拟地址
pub const UART0_VIRT: usize = 0xF900_0000;

/// 内核堆大小
pub const KERNEL_HEAP_SIZE: usize = 256 * 1024;

/// 第一个任务的 UTCB 段起始地址
pub const UTCB_AREA_START: usize = 0xF800_0000;

/// 启动日志级别
#[cfg(feature = "verbose-boot")]
pub const BOOT_LOG_LEVEL: ::log::LevelFilter = ::log::LevelFilter::Debug;
/// 启动日志级别
#[cfg(not(feature = "verbose-boot"))]
pub const BOOT_LOG_LEVEL: ::log::LevelFilter = ::log::LevelFilter::Info;
