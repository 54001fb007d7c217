//! Pager 地址空间管理
//!
//! Pager 在自己的地址空间里维护一个虚拟地址池，用来临时映射：
//!
//! - 文件页缓存中的页（按页偏移或字节区间）
//! - 其他任务的用户缓冲区（先校验所有权，再逐页解析物理页）
//!
//! 所有多页映射都是原子的：任何一步失败都会撤销本次调用已装入的映射并归还整段虚拟地址，
//! 地址池中不会残留没有映射的已分配位，也不会留下没有地址池预留的映射。
//!
//! 映射操作通过 [`MapService`] 完成，默认实现直接作用于 [`mm::AddressSpace`]。

#![no_std]

mod error;
mod file;
mod service;
mod space;
mod task;

pub use error::{PagerError, PagerResult};
pub use file::{FileError, VmFile};
pub use service::MapService;
pub use space::{PagerSpace, PAGER_POOL_LIMIT};
pub use task::{PermissionDenied, UserTask};
