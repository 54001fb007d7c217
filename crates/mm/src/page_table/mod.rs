//! 页表模块
//!
//! 本模块实现 ARMv5 的两级页表：一级表（4096 项，每项 1MB）中的表项可以是
//! 段描述符，也可以指向一张粗页表（256 项，每项 4KB 小页）。
//!
//! 段粒度只在启动阶段使用；启动完成前所有段映射都会被
//! [`TranslationTable::remap_as_pages`] 替换为等价的小页映射。
mod entry;
mod table;

use core::fmt;

pub use entry::{L1Entry, L1Kind, L2Entry};
pub use table::TranslationTable;

use crate::address::Paddr;
use uapi::MapFlags;

/// 映射粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// 1MB 段
    Section,
    /// 4KB 小页
    Page,
}

/// 页表遍历的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    /// 虚拟地址对应的物理地址（含页内/段内偏移）
    pub paddr: Paddr,
    /// 映射属性
    pub flags: MapFlags,
    /// 命中的粒度
    pub granularity: Granularity,
}

/// 分页操作中可能发生的错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingError {
    /// 虚拟地址未被映射
    NotMapped,
    /// 虚拟地址已被映射
    AlreadyMapped,
    /// 提供了无效的地址（虚拟地址超出 32 位地址空间）
    InvalidAddress,
    /// 地址未按所需粒度对齐
    Unaligned,
    /// 与同一 1MB 区间内另一粒度的映射冲突
    SectionConflict,
    /// 二级页表分配失败
    OutOfMemory,
    /// 操作目标不是调用者指定任务的地址空间
    WrongSpace,
}

impl fmt::Display for PagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            PagingError::NotMapped => "address is not mapped",
            PagingError::AlreadyMapped => "address is already mapped",
            PagingError::InvalidAddress => "address out of range",
            PagingError::Unaligned => "address is not aligned",
            PagingError::SectionConflict => "conflicts with a mapping of another granularity",
            PagingError::OutOfMemory => "out of memory for page tables",
            PagingError::WrongSpace => "address space belongs to another task",
        };
        f.write_str(msg)
    }
}

/// 分页操作的结果类型
pub type PagingResult<T> = Result<T, PagingError>;
