//! 启动错误

use core::fmt;

use mm::{Paddr, PagingError, Vaddr};

/// 启动期错误
///
/// 全部不可恢复，由 [`BootContext`](crate::BootContext) 记录后停机。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// 一级页表物理地址不满足 16KB 对齐
    MisalignedTable(Paddr),
    /// 建立启动映射失败
    MapFailed(PagingError),
    /// 第一个容器中没有任务
    NoFirstTask,
    /// KIP 中的 UTCB 地址已经公布过
    UtcbAlreadyPublished,
    /// UTCB 地址放不进 KIP 的 32 位字段
    UtcbOutOfRange(Vaddr),
}

impl From<PagingError> for BootError {
    fn from(e: PagingError) -> Self {
        BootError::MapFailed(e)
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::MisalignedTable(pa) => {
                write!(f, "kspace not properly aligned for ttb: {:#x}", pa)
            }
            BootError::MapFailed(e) => write!(f, "boot mapping failed: {}", e),
            BootError::NoFirstTask => write!(f, "no task in the first container"),
            BootError::UtcbAlreadyPublished => write!(f, "kip utcb already published"),
            BootError::UtcbOutOfRange(va) => write!(f, "utcb {:#x} does not fit the kip", va),
        }
    }
}

/// 启动操作的结果类型
pub type BootResult<T> = Result<T, BootError>;
