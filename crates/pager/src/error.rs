//! Pager 错误

use core::fmt;

use crate::file::FileError;
use crate::task::PermissionDenied;
use mm::{PagingError, PoolError};
use uapi::errno::{EFAULT, EINVAL, EIO, ENOMEM, EPERM};

/// Pager 映射请求的错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerError {
    /// 读取文件页失败
    Io,
    /// 页偏移超出文件范围，或请求的页数为零
    OutOfRange,
    /// 虚拟地址池耗尽
    NoMemory,
    /// 读取成功后页缓存中仍找不到该页（内部不变量被破坏）
    PageNotFound,
    /// 用户任务不拥有该区间或权限不足
    Permission,
    /// 映射引擎报告的错误
    Map(PagingError),
    /// 归还虚拟地址失败
    Pool(PoolError),
}

impl PagerError {
    /// 返回给用户的负 errno
    pub fn errno(&self) -> isize {
        let e = match self {
            PagerError::Io => EIO,
            PagerError::OutOfRange => EINVAL,
            PagerError::NoMemory => ENOMEM,
            PagerError::PageNotFound => EFAULT,
            PagerError::Permission => EPERM,
            PagerError::Map(PagingError::OutOfMemory) => ENOMEM,
            PagerError::Map(PagingError::WrongSpace) => EPERM,
            PagerError::Map(PagingError::NotMapped) => EFAULT,
            PagerError::Map(_) | PagerError::Pool(_) => EINVAL,
        };
        -(e as isize)
    }
}

impl From<PagingError> for PagerError {
    fn from(e: PagingError) -> Self {
        PagerError::Map(e)
    }
}

impl From<PoolError> for PagerError {
    fn from(e: PoolError) -> Self {
        PagerError::Pool(e)
    }
}

impl From<FileError> for PagerError {
    fn from(e: FileError) -> Self {
        match e {
            FileError::Io => PagerError::Io,
            FileError::OutOfRange => PagerError::OutOfRange,
        }
    }
}

impl From<PermissionDenied> for PagerError {
    fn from(_: PermissionDenied) -> Self {
        PagerError::Permission
    }
}

impl fmt::Display for PagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagerError::Io => write!(f, "file page read failed"),
            PagerError::OutOfRange => write!(f, "page range out of file bounds"),
            PagerError::NoMemory => write!(f, "pager address pool exhausted"),
            PagerError::PageNotFound => write!(f, "page missing from cache after read"),
            PagerError::Permission => write!(f, "user range not owned by task"),
            PagerError::Map(e) => write!(f, "mapping failed: {}", e),
            PagerError::Pool(e) => write!(f, "address release failed: {}", e),
        }
    }
}

/// Pager 操作的结果类型
pub type PagerResult<T> = Result<T, PagerError>;
